//! Criterion evaluation: simple comparisons, regex, JSONPath and XPath.

mod jsonpath;
mod simple;

use arazzo_model::{Criterion, CriterionKind};
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::resolver::{ResolveError, Resolver};
use crate::snapshot::TransactionSnapshot;
use crate::xml::{self, XmlError};

pub use simple::{compare, Operand, Operator};

pub fn evaluate_criterion(
    criterion: &Criterion,
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<bool, EvalError> {
    let kind = criterion.kind();
    let holds = match kind {
        CriterionKind::Simple => simple::evaluate(&criterion.condition, resolver, snapshot)?,
        CriterionKind::Regex => {
            let text = context_text(criterion, resolver, snapshot)?;
            let anchored = Regex::new(&format!("^(?:{})$", criterion.condition.trim()))?;
            anchored.is_match(&text)
        }
        CriterionKind::JsonPath => jsonpath::evaluate(criterion, resolver, snapshot)?,
        CriterionKind::XPath => {
            let text = context_text(criterion, resolver, snapshot)?;
            xml::evaluate_boolean(&text, criterion.condition.trim())?
        }
    };
    debug!(condition = %criterion.condition, ?kind, holds, "criterion evaluated");
    Ok(holds)
}

/// All criteria must hold; the first error aborts evaluation.
pub fn evaluate_all(
    criteria: &[Criterion],
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<bool, EvalError> {
    for criterion in criteria {
        if !evaluate_criterion(criterion, resolver, snapshot)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The criterion's context as text; structured values are serialized.
fn context_text(
    criterion: &Criterion,
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<String, EvalError> {
    let context = criterion
        .context
        .as_deref()
        .ok_or_else(|| EvalError::MissingContext {
            kind: criterion.kind(),
            condition: criterion.condition.clone(),
        })?;
    match resolver.resolve(context, snapshot)? {
        None => Err(EvalError::MissingContextValue {
            context: context.to_string(),
        }),
        Some(JsonValue::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("malformed condition '{condition}': expected '<left> <operator> <right>'")]
    Format { condition: String },
    #[error("cannot compare {left} with {right}")]
    Incomparable { left: String, right: String },
    #[error("{kind:?} criterion '{condition}' requires a context")]
    MissingContext {
        kind: CriterionKind,
        condition: String,
    },
    #[error("criterion context '{context}' resolved to nothing")]
    MissingContextValue { context: String },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
    #[error("criterion context is not valid JSON: {message}")]
    ContextNotJson { message: String },
    #[error("invalid JSONPath '{query}': {message}")]
    JsonPath { query: String, message: String },
    #[error("'{query}' matched nothing")]
    NoMatch { query: String },
    #[error(transparent)]
    Xml(#[from] XmlError),
}
