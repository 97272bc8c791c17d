use arazzo_model::{BodyPath, RuntimeExpr, Source};
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;

use crate::resolver::ResolveError;
use crate::snapshot::{HttpMessage, TransactionSnapshot};
use crate::xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyFormat {
    Json,
    Xml,
}

/// Declared content type first, then a look at the first non-blank character.
pub(crate) fn detect_format(content_type: Option<&str>, body: &str) -> Option<BodyFormat> {
    if let Some(ct) = content_type.map(str::to_ascii_lowercase) {
        if ct.contains("json") {
            return Some(BodyFormat::Json);
        }
        if ct.contains("xml") {
            return Some(BodyFormat::Xml);
        }
    }
    match body.trim_start().chars().next() {
        Some('{' | '[') => Some(BodyFormat::Json),
        Some('<') => Some(BodyFormat::Xml),
        _ => None,
    }
}

pub(crate) fn read_transaction(
    expression: &str,
    parsed: &RuntimeExpr,
    snapshot: &TransactionSnapshot,
) -> Result<Option<JsonValue>, ResolveError> {
    match parsed {
        RuntimeExpr::Url => Ok(Some(JsonValue::String(snapshot.url.clone()))),
        RuntimeExpr::Method => Ok(Some(JsonValue::String(snapshot.method.clone()))),
        RuntimeExpr::StatusCode => Ok(Some(JsonValue::from(snapshot.status_code))),
        RuntimeExpr::Request(source) => read_source(
            expression,
            source,
            &snapshot.request,
            snapshot.request_content_type(),
        ),
        RuntimeExpr::Response(source) => read_source(
            expression,
            source,
            &snapshot.response,
            snapshot.response_content_type(),
        ),
        _ => Ok(None),
    }
}

fn read_source(
    expression: &str,
    source: &Source,
    message: &HttpMessage,
    content_type: Option<&str>,
) -> Result<Option<JsonValue>, ResolveError> {
    let text = |v: Option<&String>| v.map(|s| JsonValue::String(s.clone()));
    match source {
        Source::Header(name) => Ok(message.header(name).map(|v| JsonValue::String(v.to_string()))),
        Source::Query(name) => Ok(text(message.query.get(name))),
        Source::Path(name) => Ok(text(message.path.get(name))),
        Source::Body(path) => read_body(expression, &message.body, content_type, path.as_ref()),
    }
}

fn read_body(
    expression: &str,
    body: &str,
    content_type: Option<&str>,
    path: Option<&BodyPath>,
) -> Result<Option<JsonValue>, ResolveError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let Some(path) = path else {
        return Ok(Some(JsonValue::String(body.to_string())));
    };

    let body_error = |message: String| ResolveError::Body {
        expression: expression.to_string(),
        message,
    };

    match detect_format(content_type, body) {
        Some(BodyFormat::Json) => {
            let tree: JsonValue =
                serde_json::from_str(body).map_err(|e| body_error(e.to_string()))?;
            let query = path.to_json_path();
            let compiled = JsonPath::parse(&query).map_err(|e| body_error(e.to_string()))?;
            let nodes = compiled.query(&tree).all();
            Ok(nodes.first().map(|v| (*v).clone()))
        }
        Some(BodyFormat::Xml) => {
            Ok(xml::select_text(body, &path.to_xpath())?.map(JsonValue::String))
        }
        None => Err(ResolveError::UnsupportedBody {
            expression: expression.to_string(),
            content_type: content_type.unwrap_or("unknown").to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection() {
        assert_eq!(
            detect_format(Some("application/problem+json"), ""),
            Some(BodyFormat::Json)
        );
        assert_eq!(detect_format(Some("text/xml; charset=utf-8"), ""), Some(BodyFormat::Xml));
        assert_eq!(detect_format(None, "  [1]"), Some(BodyFormat::Json));
        assert_eq!(detect_format(Some("text/plain"), "<a/>"), Some(BodyFormat::Xml));
        assert_eq!(detect_format(Some("text/plain"), "hello"), None);
    }
}
