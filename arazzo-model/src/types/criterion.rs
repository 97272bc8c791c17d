use crate::types::{Extensions, RuntimeExpression};

/// The condition language a [`Criterion`] is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    #[default]
    Simple,
    Regex,
    JsonPath,
    XPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionExpressionLanguage {
    Jsonpath,
    Xpath,
}

/// The object form of a criterion type, e.g.
/// `{ type: jsonpath, version: draft-goessner-dispatch-jsonpath-00 }`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CriterionExpressionType {
    pub r#type: CriterionExpressionLanguage,
    pub version: String,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum CriterionType {
    Known(CriterionKind),
    Expression(CriterionExpressionType),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Criterion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RuntimeExpression>,

    pub condition: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<CriterionType>,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

impl Criterion {
    pub fn simple(condition: impl Into<String>) -> Self {
        Self {
            context: None,
            condition: condition.into(),
            r#type: None,
            extensions: Extensions::new(),
        }
    }

    pub fn typed(
        kind: CriterionKind,
        context: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            context: Some(context.into()),
            condition: condition.into(),
            r#type: Some(CriterionType::Known(kind)),
            extensions: Extensions::new(),
        }
    }

    /// Untyped criteria are simple conditions.
    pub fn kind(&self) -> CriterionKind {
        match &self.r#type {
            None => CriterionKind::Simple,
            Some(CriterionType::Known(kind)) => *kind,
            Some(CriterionType::Expression(e)) => match e.r#type {
                CriterionExpressionLanguage::Jsonpath => CriterionKind::JsonPath,
                CriterionExpressionLanguage::Xpath => CriterionKind::XPath,
            },
        }
    }
}
