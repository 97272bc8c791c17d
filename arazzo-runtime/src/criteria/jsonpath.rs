use std::borrow::Cow;

use arazzo_model::{parse_template, Criterion};
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;

use crate::criteria::simple::{self, Operand, Operator};
use crate::criteria::{context_text, EvalError};
use crate::resolver::Resolver;
use crate::snapshot::TransactionSnapshot;

/// `<query> <op> <expected>` where the query is a JSONPath (`$...`) or a
/// JSON Pointer (`#/...`). Without a top-level operator the condition is an
/// existence check.
pub(crate) fn evaluate(
    criterion: &Criterion,
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<bool, EvalError> {
    let text = context_text(criterion, resolver, snapshot)?;
    let tree: JsonValue = serde_json::from_str(&text).map_err(|e| EvalError::ContextNotJson {
        message: e.to_string(),
    })?;

    let condition = criterion.condition.trim();
    let Some((query, op, expected)) = split_top_level(condition) else {
        return Ok(!select_all(&tree, condition)?.is_empty());
    };

    let actual = select_all(&tree, query)?
        .into_iter()
        .next()
        .ok_or_else(|| EvalError::NoMatch {
            query: query.to_string(),
        })?;
    let expected = expected_operand(expected, resolver, snapshot)?;
    simple::compare(&Operand::from_value(Some(&actual)), op, &expected)
}

fn select_all(tree: &JsonValue, query: &str) -> Result<Vec<JsonValue>, EvalError> {
    if let Some(pointer) = query.strip_prefix('#') {
        return Ok(tree.pointer(pointer).cloned().into_iter().collect());
    }

    let path = JsonPath::parse(query).map_err(|e| EvalError::JsonPath {
        query: query.to_string(),
        message: e.to_string(),
    })?;
    // A root filter selects among children, so a lone object is matched as a one-element list.
    let target = if query.starts_with("$[?") && !tree.is_array() {
        Cow::Owned(JsonValue::Array(vec![tree.clone()]))
    } else {
        Cow::Borrowed(tree)
    };
    Ok(path.query(&target).all().into_iter().cloned().collect())
}

fn expected_operand(
    text: &str,
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<Operand, EvalError> {
    let is_expression = text.starts_with('$')
        || parse_template(text).is_ok_and(|t| t.has_expressions());
    if !is_expression {
        return Ok(Operand::literal(text));
    }
    let resolved = resolver.resolve_template(text, snapshot)?;
    Ok(Operand::literal(&resolved))
}

/// Finds the first comparison operator outside brackets, parentheses and quotes.
pub(crate) fn split_top_level(condition: &str) -> Option<(&str, Operator, &str)> {
    let bytes = condition.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' => quote = Some(b),
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth = depth.saturating_sub(1),
            b'=' | b'!' | b'<' | b'>' if depth == 0 => {
                if let Some(op) = Operator::at(&condition[i..]) {
                    let left = condition[..i].trim();
                    let right = condition[i + op.symbol().len()..].trim();
                    return Some((left, op, right));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
