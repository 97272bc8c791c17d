//! Runtime expression resolution against the document graph and the live transaction.

mod body;
mod lookup;

use arazzo_model::{
    parse_runtime_expr, parse_template, ExprError, NamePath, RuntimeExpr, Segment, Step,
    TemplateError, WorkflowDocument,
};
use serde_json::{Map, Value as JsonValue};
use tracing::trace;

use crate::cache::ExpressionCache;
use crate::snapshot::TransactionSnapshot;
use crate::xml::XmlError;

/// How many textual values may chain into further expressions.
const MAX_INDIRECTION: usize = 16;

/// Resolves expressions for one workflow run.
///
/// Document-graph results are memoized in the shared [`ExpressionCache`];
/// transaction reads and the run-local `$inputs`/`$outputs` namespaces are not.
pub struct Resolver<'a> {
    document: &'a WorkflowDocument,
    workflow_id: String,
    inputs: JsonValue,
    outputs: Map<String, JsonValue>,
    cache: &'a mut ExpressionCache,
    indirection: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        document: &'a WorkflowDocument,
        workflow_id: impl Into<String>,
        inputs: JsonValue,
        cache: &'a mut ExpressionCache,
    ) -> Self {
        Self {
            document,
            workflow_id: workflow_id.into(),
            inputs,
            outputs: Map::new(),
            cache,
            indirection: 0,
        }
    }

    pub fn document(&self) -> &'a WorkflowDocument {
        self.document
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn inputs(&self) -> &JsonValue {
        &self.inputs
    }

    pub fn outputs(&self) -> &Map<String, JsonValue> {
        &self.outputs
    }

    pub fn cache(&self) -> &ExpressionCache {
        &*self.cache
    }

    /// Reborrows the shared cache for a nested run.
    pub fn cache_mut(&mut self) -> &mut ExpressionCache {
        &mut *self.cache
    }

    pub fn lookup(&self, expression: &str) -> Option<&JsonValue> {
        self.cache.get(expression.trim())
    }

    pub fn publish(&mut self, expression: impl Into<String>, value: JsonValue) {
        self.cache.publish(expression, value);
    }

    /// Makes `name` visible to `$outputs.<name>` for the rest of this run.
    pub fn record_output(&mut self, name: impl Into<String>, value: JsonValue) {
        self.outputs.insert(name.into(), value);
    }

    /// Resolves one expression. `Ok(None)` means the reference is well formed
    /// but points at nothing.
    ///
    /// Text that is not an expression comes back unchanged.
    pub fn resolve(
        &mut self,
        expression: &str,
        snapshot: Option<&TransactionSnapshot>,
    ) -> Result<Option<JsonValue>, ResolveError> {
        let expr = expression.trim();
        if let Some(hit) = self.cache.get(expr) {
            trace!(expression = expr, "expression cache hit");
            return Ok(Some(hit.clone()));
        }
        if !expr.starts_with('$') && !expr.starts_with("#/components") {
            return Ok(Some(JsonValue::String(expression.to_string())));
        }

        let parsed = parse_runtime_expr(expr)?;
        let value = match &parsed {
            RuntimeExpr::Url
            | RuntimeExpr::Method
            | RuntimeExpr::StatusCode
            | RuntimeExpr::Request(_)
            | RuntimeExpr::Response(_) => {
                let snapshot = snapshot.ok_or_else(|| ResolveError::NoSnapshot {
                    expression: expr.to_string(),
                })?;
                return body::read_transaction(expr, &parsed, snapshot);
            }
            RuntimeExpr::Components(_) => {
                return Err(ResolveError::ComponentReference {
                    expression: expr.to_string(),
                })
            }
            RuntimeExpr::Inputs(path) => {
                let start = self.inputs.get(&path.root);
                return Ok(lookup::walk(start, &path.segments(), &*self.cache));
            }
            RuntimeExpr::Outputs(path) => {
                let start = self.outputs.get(&path.root);
                return Ok(lookup::walk(start, &path.segments(), &*self.cache));
            }
            RuntimeExpr::SourceDescriptions(path) => {
                let node = match self.document.source_description(&path.root) {
                    Some(sd) => Some(serde_json::to_value(sd)?),
                    None => None,
                };
                lookup::walk(node.as_ref(), &path.segments(), &*self.cache)
            }
            RuntimeExpr::Steps(path) => {
                // Reads below a published output follow republishing, so they are not memoized.
                if let Some(published) = self.walk_published("steps", path) {
                    return self.follow_indirection(expr, Some(published));
                }
                let node = match self.find_step(&path.root) {
                    Some(step) => Some(serde_json::to_value(step)?),
                    None => None,
                };
                let found = lookup::walk(node.as_ref(), &path.segments(), &*self.cache);
                self.follow_indirection(expr, found)?
            }
            RuntimeExpr::Workflows(path) => {
                // Reads below a published output follow republishing, so they are not memoized.
                if let Some(published) = self.walk_published("workflows", path) {
                    return self.follow_indirection(expr, Some(published));
                }
                let node = match self.document.workflow(&path.root) {
                    Some(w) => Some(serde_json::to_value(w)?),
                    None => None,
                };
                let found = lookup::walk(node.as_ref(), &path.segments(), &*self.cache);
                self.follow_indirection(expr, found)?
            }
        };

        if let Some(v) = &value {
            if v.as_str() != Some(expr) && self.cache.remember(expr, v.clone()) {
                trace!(expression = expr, "expression memoized");
            }
        }
        Ok(value)
    }

    /// Substitutes every `{$...}` placeholder in `text`. Text without
    /// placeholders is resolved as one whole expression.
    pub fn resolve_template(
        &mut self,
        text: &str,
        snapshot: Option<&TransactionSnapshot>,
    ) -> Result<String, ResolveError> {
        let template = parse_template(text)?;
        if !template.has_expressions() {
            return self
                .resolve(text, snapshot)?
                .map(|v| stringify(&v))
                .ok_or_else(|| ResolveError::Unresolved {
                    expression: text.trim().to_string(),
                });
        }

        let mut out = String::new();
        for segment in template.segments {
            match segment {
                Segment::Literal(l) => out.push_str(&l),
                Segment::Expr(e) => {
                    let v = self
                        .resolve(&e, snapshot)?
                        .ok_or(ResolveError::Unresolved { expression: e })?;
                    out.push_str(&stringify(&v));
                }
            }
        }
        Ok(out)
    }

    /// Resolves every string leaf of a structured value. A string that is a
    /// single expression keeps the resolved value's type.
    pub fn resolve_value(
        &mut self,
        value: &JsonValue,
        snapshot: Option<&TransactionSnapshot>,
    ) -> Result<JsonValue, ResolveError> {
        match value {
            JsonValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.starts_with('$') {
                    return self
                        .resolve(trimmed, snapshot)?
                        .ok_or_else(|| ResolveError::Unresolved {
                            expression: trimmed.to_string(),
                        });
                }
                if parse_template(s)?.has_expressions() {
                    Ok(JsonValue::String(self.resolve_template(s, snapshot)?))
                } else {
                    Ok(value.clone())
                }
            }
            JsonValue::Array(items) => items
                .iter()
                .map(|v| self.resolve_value(v, snapshot))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            JsonValue::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(v, snapshot)?);
                }
                Ok(JsonValue::Object(out))
            }
            JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) => Ok(value.clone()),
        }
    }

    /// Continues a lookup from the longest published prefix, e.g. a step output
    /// holding a whole response body.
    fn walk_published(&self, namespace: &str, path: &NamePath) -> Option<JsonValue> {
        let segments = path.segments();
        for split in (1..=segments.len()).rev() {
            let key = format!("${namespace}.{}.{}", path.root, segments[..split].join("."));
            if let Some(hit) = self.cache.get(&key) {
                return lookup::walk(Some(hit), &segments[split..], &*self.cache);
            }
        }
        None
    }

    /// The current workflow's steps shadow same-named steps elsewhere.
    fn find_step(&self, step_id: &str) -> Option<&'a Step> {
        let document = self.document;
        document
            .workflow(&self.workflow_id)
            .and_then(|w| w.step(step_id))
            .or_else(|| document.workflows.iter().find_map(|w| w.step(step_id)))
    }

    /// A textual leaf that is itself an expression or template is resolved in turn.
    fn follow_indirection(
        &mut self,
        expression: &str,
        found: Option<JsonValue>,
    ) -> Result<Option<JsonValue>, ResolveError> {
        let Some(JsonValue::String(text)) = &found else {
            return Ok(found);
        };
        if !is_expression_text(text) || text.trim() == expression {
            return Ok(found);
        }
        if self.indirection >= MAX_INDIRECTION {
            return Err(ResolveError::Indirection {
                expression: expression.to_string(),
            });
        }

        let text = text.clone();
        self.indirection += 1;
        let result = if text.trim().starts_with('$') {
            self.resolve(&text, None)
        } else {
            self.resolve_template(&text, None).map(|s| Some(JsonValue::String(s)))
        };
        self.indirection -= 1;
        result
    }
}

fn is_expression_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.starts_with('$') {
        return parse_runtime_expr(trimmed).is_ok();
    }
    parse_template(text).is_ok_and(|t| t.has_expressions())
}

/// Text form used when a value is spliced into a template.
pub fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Syntax(#[from] ExprError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("'{expression}' reads the transaction but no snapshot is available")]
    NoSnapshot { expression: String },
    #[error("'{expression}' must be resolved by the component-reference collaborator")]
    ComponentReference { expression: String },
    #[error("'{expression}' resolved to nothing")]
    Unresolved { expression: String },
    #[error("'{expression}' chains through too many nested expressions")]
    Indirection { expression: String },
    #[error("cannot read body for '{expression}': {message}")]
    Body { expression: String, message: String },
    #[error("cannot query body of content type '{content_type}' for '{expression}'")]
    UnsupportedBody {
        expression: String,
        content_type: String,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("cannot view document node as a value: {0}")]
    Serialize(#[from] serde_json::Error),
}
