use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use super::json_pointer::JsonPointer;
use super::runtime::ExprError;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A sub-path into a request or response body.
///
/// `body#/items/0/name`, `body.items.0.name` and `body.items[0].name` all
/// produce the same segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyPath {
    segments: Vec<PathSegment>,
}

impl BodyPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn from_pointer(pointer: &JsonPointer) -> Self {
        Self {
            segments: pointer.tokens().into_iter().map(segment_of).collect(),
        }
    }

    /// Parses the dotted/bracketed suffix that follows `body`, e.g. `.a[0].b`.
    pub fn parse(suffix: &str) -> Result<Self, ExprError> {
        let invalid = || ExprError::InvalidBodyPath(suffix.to_string());
        let mut segments = Vec::new();
        let mut rest = suffix;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                let key = &after[..end];
                if key.is_empty() {
                    return Err(invalid());
                }
                segments.push(segment_of(key.to_string()));
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']').ok_or_else(invalid)?;
                let inner = after[..end].trim();
                let segment = if let Ok(i) = inner.parse::<usize>() {
                    PathSegment::Index(i)
                } else {
                    let unquoted = inner
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                        .ok_or_else(invalid)?;
                    PathSegment::Key(unquoted.to_string())
                };
                segments.push(segment);
                rest = &after[end + 1..];
            } else {
                return Err(invalid());
            }
        }

        Ok(Self { segments })
    }

    /// Renders as a JSONPath query rooted at `$`.
    pub fn to_json_path(&self) -> String {
        let mut out = String::from("$");
        for seg in &self.segments {
            match seg {
                PathSegment::Index(i) => {
                    let _ = write!(out, "[{i}]");
                }
                PathSegment::Key(k) if IDENT_RE.is_match(k) => {
                    let _ = write!(out, ".{k}");
                }
                PathSegment::Key(k) => {
                    let escaped = k.replace('\\', "\\\\").replace('\'', "\\'");
                    let _ = write!(out, "['{escaped}']");
                }
            }
        }
        out
    }

    /// Renders as an absolute XPath location path. The first key names the
    /// document element; indices become 1-based position predicates.
    pub fn to_xpath(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                PathSegment::Key(k) => {
                    let _ = write!(out, "/{k}");
                }
                PathSegment::Index(i) => {
                    if out.is_empty() {
                        out.push_str("/*");
                    }
                    let _ = write!(out, "[{}]", i + 1);
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

fn segment_of(token: String) -> PathSegment {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = token.parse() {
            return PathSegment::Index(i);
        }
    }
    PathSegment::Key(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn spellings_agree() {
        let dotted = BodyPath::parse(".items.0.name").unwrap();
        let bracketed = BodyPath::parse(".items[0].name").unwrap();
        let pointer = BodyPath::from_pointer(&JsonPointer::parse("/items/0/name").unwrap());
        let expected = vec![key("items"), PathSegment::Index(0), key("name")];
        assert_eq!(dotted.segments(), expected.as_slice());
        assert_eq!(bracketed, dotted);
        assert_eq!(pointer, dotted);
    }

    #[test]
    fn leading_index_and_quoted_keys() {
        let p = BodyPath::parse("[1]['odd key']").unwrap();
        assert_eq!(p.segments(), &[PathSegment::Index(1), key("odd key")]);
        assert_eq!(p.to_json_path(), "$[1]['odd key']");
    }

    #[test]
    fn renders_native_queries() {
        let p = BodyPath::parse(".pets.2.name").unwrap();
        assert_eq!(p.to_json_path(), "$.pets[2].name");
        assert_eq!(p.to_xpath(), "/pets[3]/name");
        assert_eq!(BodyPath::default().to_json_path(), "$");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(BodyPath::parse("..a").is_err());
        assert!(BodyPath::parse("[0").is_err());
        assert!(BodyPath::parse("[abc]").is_err());
        assert!(BodyPath::parse("a").is_err());
    }
}
