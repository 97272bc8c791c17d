use crate::types::{AnyValue, Extensions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#in: Option<ParameterLocation>,

    /// A literal, a runtime expression, or a template with embedded `{$...}` expressions.
    pub value: AnyValue,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

impl Parameter {
    /// Parameters are identified by name and location; step parameters
    /// replace workflow parameters with the same identity.
    pub fn same_identity(&self, other: &Parameter) -> bool {
        self.name == other.name && self.r#in == other.r#in
    }
}
