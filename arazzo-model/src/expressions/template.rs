use super::runtime::{parse_runtime_expr, ExprError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn has_expressions(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Expr(_)))
    }
}

/// Splits `text` into literal runs and `{$...}` placeholders.
///
/// A `{` not followed (after optional whitespace) by `$` is literal text, so
/// JSON embedded in a payload string survives untouched.
pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            buf.push(ch);
            continue;
        }

        let mut lookahead = chars.clone();
        while lookahead.next_if(|c| c.is_whitespace()).is_some() {}
        if lookahead.peek() != Some(&'$') {
            buf.push('{');
            continue;
        }

        // No nesting.
        let mut inner = String::new();
        let mut closed = false;
        for n in chars.by_ref() {
            if n == '}' {
                closed = true;
                break;
            }
            inner.push(n);
        }
        if !closed {
            return Err(TemplateError::UnclosedExpression);
        }

        let expr = inner.trim();
        parse_runtime_expr(expr)?;
        if !buf.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut buf)));
        }
        segments.push(Segment::Expr(expr.to_string()));
    }

    if !buf.is_empty() {
        segments.push(Segment::Literal(buf));
    }

    Ok(Template { segments })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid runtime expression: {0}")]
    InvalidRuntimeExpr(#[from] ExprError),
    #[error("unclosed embedded expression (missing '}}')")]
    UnclosedExpression,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_literals_and_placeholders() {
        let t = parse_template("a{$inputs.x}b{ $steps.s.outputs.y }c").unwrap();
        assert_eq!(
            t.segments,
            vec![
                Segment::Literal("a".into()),
                Segment::Expr("$inputs.x".into()),
                Segment::Literal("b".into()),
                Segment::Expr("$steps.s.outputs.y".into()),
                Segment::Literal("c".into()),
            ]
        );
        assert!(t.has_expressions());
    }

    #[test]
    fn plain_braces_are_literal() {
        let t = parse_template(r#"{"id": 1}"#).unwrap();
        assert!(!t.has_expressions());
        assert_eq!(t.segments, vec![Segment::Literal(r#"{"id": 1}"#.into())]);
    }

    #[test]
    fn unmatched_brace_is_an_error() {
        assert_eq!(
            parse_template("a{$inputs.x"),
            Err(TemplateError::UnclosedExpression)
        );
    }
}
