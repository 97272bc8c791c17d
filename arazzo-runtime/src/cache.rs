use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

/// Resolved values keyed by the exact expression text that produced them.
///
/// One cache belongs to one top-level invocation and is passed down to every
/// nested run. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct ExpressionCache {
    entries: BTreeMap<String, JsonValue>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, expression: &str) -> Option<&JsonValue> {
        self.entries.get(expression)
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.entries.contains_key(expression)
    }

    /// Memo write: the first value stored under a key wins.
    pub fn remember(&mut self, expression: impl Into<String>, value: JsonValue) -> bool {
        match self.entries.entry(expression.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Published outputs replace earlier values so a re-run step exposes its latest result.
    pub fn publish(&mut self, expression: impl Into<String>, value: JsonValue) {
        self.entries.insert(expression.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remember_keeps_first_value() {
        let mut cache = ExpressionCache::new();
        assert!(cache.remember("$inputs.a", json!(1)));
        assert!(!cache.remember("$inputs.a", json!(2)));
        assert_eq!(cache.get("$inputs.a"), Some(&json!(1)));
    }

    #[test]
    fn publish_overwrites() {
        let mut cache = ExpressionCache::new();
        cache.publish("$steps.s.outputs.id", json!("a"));
        cache.publish("$steps.s.outputs.id", json!("b"));
        assert_eq!(cache.get("$steps.s.outputs.id"), Some(&json!("b")));
        assert_eq!(cache.len(), 1);
    }
}
