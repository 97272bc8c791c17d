use std::borrow::Cow;

use serde_json::Value as JsonValue;

use crate::cache::ExpressionCache;
use crate::xml;

/// Walks `segments` down from `start`. Any absent segment makes the whole lookup absent.
pub(crate) fn walk(
    start: Option<&JsonValue>,
    segments: &[String],
    cache: &ExpressionCache,
) -> Option<JsonValue> {
    let mut current = Cow::Borrowed(start?);
    for segment in segments {
        if let Some(view) = dereference_embedded(&current, cache) {
            current = Cow::Owned(view);
        }
        let next = child(&current, segment)?.clone();
        current = Cow::Owned(next);
    }
    Some(current.into_owned())
}

/// Turns a textual intermediate value into something a path can descend into.
///
/// A string carrying a `$` marker is first looked up in the cache under its
/// own text. The (possibly substituted) text is then parsed as JSON when it
/// opens with `{` or `[`, or as XML when it opens with `<`. Returns `None`
/// when the value should be walked as is.
pub(crate) fn dereference_embedded(
    value: &JsonValue,
    cache: &ExpressionCache,
) -> Option<JsonValue> {
    let JsonValue::String(text) = value else {
        return None;
    };

    let cached = if text.contains('$') {
        cache.get(text.trim()).cloned()
    } else {
        None
    };

    match cached {
        Some(JsonValue::String(s)) => Some(parse_structured(&s).unwrap_or(JsonValue::String(s))),
        Some(other) => Some(other),
        None => parse_structured(text),
    }
}

fn parse_structured(text: &str) -> Option<JsonValue> {
    let t = text.trim_start();
    if t.starts_with('{') || t.starts_with('[') {
        serde_json::from_str(t).ok()
    } else if t.starts_with('<') {
        xml::to_json(t).ok()
    } else {
        None
    }
}

fn child<'v>(value: &'v JsonValue, segment: &str) -> Option<&'v JsonValue> {
    match value {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
