use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::criteria::EvalError;
use crate::resolver::Resolver;
use crate::snapshot::TransactionSnapshot;

static SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==|!=|<=|>=|<|>").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl Operator {
    /// Two-character operators are tried before `<` and `>`.
    const PRECEDENCE: [Operator; 6] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Le,
        Operator::Ge,
        Operator::Lt,
        Operator::Gt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Gt => ">",
        }
    }

    /// The operator `text` starts with, if any.
    pub(crate) fn at(text: &str) -> Option<Operator> {
        Self::PRECEDENCE
            .into_iter()
            .find(|op| text.starts_with(op.symbol()))
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Gt => ordering == Ordering::Greater,
        }
    }
}

/// A comparison operand after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Absent,
    Number(f64),
    Text(String),
}

impl Operand {
    pub fn from_value(value: Option<&JsonValue>) -> Self {
        match value {
            None | Some(JsonValue::Null) => Operand::Absent,
            Some(JsonValue::Number(n)) => n.as_f64().map_or(Operand::Absent, Operand::Number),
            Some(JsonValue::String(s)) => Self::typed(s),
            Some(JsonValue::Bool(b)) => Operand::Text(b.to_string()),
            Some(other) => Operand::Text(other.to_string()),
        }
    }

    /// Literal operand text; one pair of surrounding quotes is dropped.
    pub fn literal(text: &str) -> Self {
        let t = text.trim();
        let unquoted = ['"', '\'']
            .into_iter()
            .find_map(|q| t.strip_prefix(q).and_then(|s| s.strip_suffix(q)))
            .unwrap_or(t);
        Self::typed(unquoted)
    }

    fn typed(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Operand::Number(n),
            _ => Operand::Text(text.to_string()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Absent => f.write_str("absent value"),
            Operand::Number(n) => write!(f, "number {n}"),
            Operand::Text(t) => write!(f, "text '{t}'"),
        }
    }
}

pub(crate) fn evaluate(
    condition: &str,
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<bool, EvalError> {
    let (left, op, right) = split(condition)?;
    let left = operand(left, resolver, snapshot)?;
    let right = operand(right, resolver, snapshot)?;
    compare(&left, op, &right)
}

fn split(condition: &str) -> Result<(&str, Operator, &str), EvalError> {
    let format_error = || EvalError::Format {
        condition: condition.to_string(),
    };
    let op = Operator::PRECEDENCE
        .into_iter()
        .find(|op| condition.contains(op.symbol()))
        .ok_or_else(format_error)?;
    let parts: Vec<&str> = SPLIT_RE.split(condition).collect();
    let [left, right] = parts.as_slice() else {
        return Err(format_error());
    };
    Ok((left.trim(), op, right.trim()))
}

fn operand(
    text: &str,
    resolver: &mut Resolver<'_>,
    snapshot: Option<&TransactionSnapshot>,
) -> Result<Operand, EvalError> {
    if text.starts_with('$') {
        let value = resolver.resolve(text, snapshot)?;
        return Ok(Operand::from_value(value.as_ref()));
    }
    Ok(Operand::literal(text))
}

/// Numbers compare numerically, text case-insensitively. An absent value
/// equals the literal text `null`; every other pairing is an error.
pub fn compare(left: &Operand, op: Operator, right: &Operand) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
        (Operand::Number(a), Operand::Number(b)) => a.partial_cmp(b),
        (Operand::Text(a), Operand::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        (Operand::Absent, Operand::Text(t)) | (Operand::Text(t), Operand::Absent)
            if t.eq_ignore_ascii_case("null") =>
        {
            Some(Ordering::Equal)
        }
        _ => None,
    };
    let ordering = ordering.ok_or_else(|| EvalError::Incomparable {
        left: left.to_string(),
        right: right.to_string(),
    })?;
    Ok(op.holds(ordering))
}
