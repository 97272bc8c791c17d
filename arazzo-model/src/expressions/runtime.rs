use std::sync::LazyLock;

use regex::Regex;

use super::body_path::BodyPath;
use super::json_pointer::{JsonPointer, JsonPointerError};

static TCHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").expect("valid regex"));

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\.\-_]+$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeExpr {
    Url,
    Method,
    StatusCode,
    Request(Source),
    Response(Source),
    Inputs(NamePath),
    Outputs(NamePath),
    Steps(NamePath),
    Workflows(NamePath),
    SourceDescriptions(NamePath),
    /// `$components.…` or `#/components/…`, kept verbatim.
    Components(String),
}

impl RuntimeExpr {
    /// Whether the value comes from the live transaction rather than the document graph.
    pub fn reads_transaction(&self) -> bool {
        matches!(
            self,
            RuntimeExpr::Url
                | RuntimeExpr::Method
                | RuntimeExpr::StatusCode
                | RuntimeExpr::Request(_)
                | RuntimeExpr::Response(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Header(String),
    Query(String),
    Path(String),
    Body(Option<BodyPath>),
}

/// `<root>.<rest...>` with an optional trailing `#/pointer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePath {
    pub root: String,
    pub rest: Vec<String>,
    pub pointer: Option<JsonPointer>,
}

impl NamePath {
    /// Every segment after the root, pointer tokens included.
    pub fn segments(&self) -> Vec<String> {
        let mut out = self.rest.clone();
        if let Some(p) = &self.pointer {
            out.extend(p.tokens());
        }
        out
    }
}

pub fn parse_runtime_expr(input: &str) -> Result<RuntimeExpr, ExprError> {
    let s = input.trim();
    if s.starts_with("#/components") {
        return Ok(RuntimeExpr::Components(s.to_string()));
    }
    let Some(body) = s.strip_prefix('$') else {
        return Err(ExprError::MissingDollarPrefix);
    };

    match body {
        "url" => return Ok(RuntimeExpr::Url),
        "method" => return Ok(RuntimeExpr::Method),
        "statusCode" => return Ok(RuntimeExpr::StatusCode),
        _ => {}
    }

    // Body paths carry their own pointer syntax, so sources are split first.
    if let Some(rest) = body.strip_prefix("request.") {
        return Ok(RuntimeExpr::Request(parse_source(rest)?));
    }
    if let Some(rest) = body.strip_prefix("response.") {
        return Ok(RuntimeExpr::Response(parse_source(rest)?));
    }
    if body.starts_with("components.") {
        return Ok(RuntimeExpr::Components(s.to_string()));
    }

    let (head, pointer) = split_pointer_suffix(body)?;
    let namespaces: [(&str, fn(NamePath) -> RuntimeExpr); 5] = [
        ("inputs.", RuntimeExpr::Inputs),
        ("outputs.", RuntimeExpr::Outputs),
        ("steps.", RuntimeExpr::Steps),
        ("workflows.", RuntimeExpr::Workflows),
        ("sourceDescriptions.", RuntimeExpr::SourceDescriptions),
    ];
    for (prefix, build) in namespaces {
        if let Some(rest) = head.strip_prefix(prefix) {
            return Ok(build(parse_name_path(rest, pointer)?));
        }
    }

    Err(ExprError::UnknownExpression(s.to_string()))
}

fn split_pointer_suffix(s: &str) -> Result<(&str, Option<JsonPointer>), ExprError> {
    match s.split_once('#') {
        Some((head, frag)) => Ok((head, Some(JsonPointer::parse(frag)?))),
        None => Ok((s, None)),
    }
}

fn parse_source(rest: &str) -> Result<Source, ExprError> {
    if let Some(token) = rest.strip_prefix("header.") {
        if token.is_empty() {
            return Err(ExprError::EmptyName);
        }
        if !TCHAR_RE.is_match(token) {
            return Err(ExprError::InvalidHeaderToken(token.to_string()));
        }
        return Ok(Source::Header(token.to_string()));
    }
    if let Some(name) = rest.strip_prefix("query.") {
        validate_name(name)?;
        return Ok(Source::Query(name.to_string()));
    }
    if let Some(name) = rest.strip_prefix("path.") {
        validate_name(name)?;
        return Ok(Source::Path(name.to_string()));
    }
    if let Some(suffix) = rest.strip_prefix("body") {
        if suffix.is_empty() {
            return Ok(Source::Body(None));
        }
        let path = match suffix.strip_prefix('#') {
            Some(ptr) => BodyPath::from_pointer(&JsonPointer::parse(ptr)?),
            None => BodyPath::parse(suffix)?,
        };
        return Ok(Source::Body(Some(path).filter(|p| !p.is_empty())));
    }

    Err(ExprError::InvalidSource(rest.to_string()))
}

fn parse_name_path(rest: &str, pointer: Option<JsonPointer>) -> Result<NamePath, ExprError> {
    let mut parts = rest.split('.');
    let root = parts.next().unwrap_or_default();
    validate_name(root)?;

    let mut remaining = Vec::new();
    for p in parts {
        validate_name(p)?;
        remaining.push(p.to_string());
    }

    Ok(NamePath {
        root: root.to_string(),
        rest: remaining,
        pointer,
    })
}

fn validate_name(name: &str) -> Result<(), ExprError> {
    if name.is_empty() {
        return Err(ExprError::EmptyName);
    }
    if !NAME_RE.is_match(name) {
        return Err(ExprError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("runtime expression must start with '$'")]
    MissingDollarPrefix,
    #[error("unknown runtime expression: {0}")]
    UnknownExpression(String),
    #[error("invalid source reference: {0}")]
    InvalidSource(String),
    #[error("name segment must not be empty")]
    EmptyName,
    #[error("invalid name segment: {0}")]
    InvalidName(String),
    #[error("invalid header token: {0}")]
    InvalidHeaderToken(String),
    #[error("invalid body path: {0}")]
    InvalidBodyPath(String),
    #[error("invalid json pointer: {0}")]
    InvalidJsonPointer(#[from] JsonPointerError),
}
