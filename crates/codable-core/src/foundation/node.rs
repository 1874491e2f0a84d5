//! Config tree access.
//!
//! Config trees are plain [`serde_json::Value`]s. This module adds the
//! handful of operations the decoder needs on top of them: value-type
//! inspection, dotted-path lookup, a read-only object view that can hide
//! one key, scalar coercions, and fallback merging.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

// =============================================================================
// Value Types
// =============================================================================

/// The shape of a config node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigValueType {
    Object,
    List,
    String,
    Number,
    Boolean,
    Null,
}

impl ConfigValueType {
    /// Returns the shape of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::List,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Null => Self::Null,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "OBJECT",
            Self::List => "LIST",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Null => "NULL",
        }
    }
}

impl fmt::Display for ConfigValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Path Lookup
// =============================================================================

/// Looks up a dotted path below `root`.
///
/// An empty path addresses `root` itself. A path that ends on `null` is
/// treated as absent.
pub fn at_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    if !path.is_empty() {
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
    }
    (!current.is_null()).then_some(current)
}

/// Returns true if `path` resolves to a non-null value.
pub fn has_path(root: &Value, path: &str) -> bool {
    at_path(root, path).is_some()
}

// =============================================================================
// Object View
// =============================================================================

/// A read-only view of an object node, optionally hiding one key.
///
/// The hydration engine uses this to strip the discriminator key from a
/// plugin node without copying the node.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView<'a> {
    map: &'a Map<String, Value>,
    hidden: Option<&'a str>,
}

impl<'a> ObjectView<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map, hidden: None }
    }

    /// Views `value` if it is an object.
    pub fn of(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    /// Returns a view that additionally hides `key`.
    pub fn hiding(self, key: &'a str) -> Self {
        Self {
            map: self.map,
            hidden: Some(key),
        }
    }

    fn visible(&self, key: &str) -> bool {
        self.hidden != Some(key)
    }

    /// Returns the raw value under `key`, `null` included.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        if self.visible(key) {
            self.map.get(key)
        } else {
            None
        }
    }

    /// Returns true if `key` is present with a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    /// Looks up a dotted path inside the view.
    pub fn at_path(&self, path: &str) -> Option<&'a Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.get(head)?;
        match rest {
            Some(rest) => at_path(value, rest),
            None => (!value.is_null()).then_some(value),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        let hidden = self.hidden;
        self.map
            .iter()
            .filter(move |(key, _)| hidden != Some(key.as_str()))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the only visible entry, if there is exactly one.
    pub fn single_entry(&self) -> Option<(&'a str, &'a Value)> {
        let mut entries = self.iter();
        let first = entries.next()?;
        entries.next().is_none().then_some(first)
    }

    /// Copies the visible entries into an owned map.
    pub fn to_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(key, value)| (key.to_owned(), value.clone()))
            .collect()
    }

    /// Flattens the view into dotted leaf paths.
    ///
    /// Nested objects are descended into; lists and scalars are leaves.
    /// Null leaves are omitted.
    pub fn flattened(&self) -> IndexMap<String, &'a Value> {
        let mut out = IndexMap::new();
        for (key, value) in self.iter() {
            flatten_into(&mut out, key.to_owned(), value);
        }
        out
    }
}

fn flatten_into<'a>(out: &mut IndexMap<String, &'a Value>, prefix: String, value: &'a Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(out, format!("{prefix}.{key}"), child);
            }
        }
        Value::Null => {}
        _ => {
            out.insert(prefix, value);
        }
    }
}

// =============================================================================
// Coercions
// =============================================================================

/// Reads a scalar as a string. Numbers and booleans are rendered.
pub fn coerce_string(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// Reads a boolean, accepting `true/yes/on` and `false/no/off` strings.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Reads a number, parsing numeric strings.
pub fn coerce_number(value: &Value) -> Option<serde_json::Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(i.into())
            } else if let Ok(u) = s.parse::<u64>() {
                Some(u.into())
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
            }
        }
        _ => None,
    }
}

// =============================================================================
// Merging
// =============================================================================

/// Deep merge: keys in `node` win, nested objects are merged recursively.
pub fn with_fallback(node: &Map<String, Value>, fallback: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = fallback.clone();
    for (key, value) in node {
        let combined = match (value, merged.get(key)) {
            (Value::Object(ours), Some(Value::Object(theirs))) => {
                Value::Object(with_fallback(ours, theirs))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

/// Shallow merge: keys in `node` replace fallback keys wholesale.
pub fn with_shallow_fallback(
    node: &Map<String, Value>,
    fallback: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = fallback.clone();
    for (key, value) in node {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_names() {
        assert_eq!(ConfigValueType::of(&json!({})).to_string(), "OBJECT");
        assert_eq!(ConfigValueType::of(&json!([1])).to_string(), "LIST");
        assert_eq!(ConfigValueType::of(&json!(null)), ConfigValueType::Null);
    }

    #[test]
    fn test_at_path_treats_null_as_absent() {
        let root = json!({"a": {"b": 1, "c": null}});
        assert_eq!(at_path(&root, "a.b"), Some(&json!(1)));
        assert!(at_path(&root, "a.c").is_none());
        assert!(!has_path(&root, "a.missing"));
        assert!(has_path(&root, ""));
    }

    #[test]
    fn test_view_hides_key() {
        let node = json!({"type": "upper", "pattern": "x"});
        let view = ObjectView::of(&node).unwrap().hiding("type");
        assert!(view.get("type").is_none());
        assert_eq!(view.len(), 1);
        assert_eq!(view.single_entry().map(|(k, _)| k), Some("pattern"));
        assert!(!view.to_map().contains_key("type"));
    }

    #[test]
    fn test_view_flattened_paths() {
        let node = json!({"a": {"b": 1, "c": {"d": [1, 2]}}, "e": null, "f": "x"});
        let flat = ObjectView::of(&node).unwrap().flattened();
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a.b", "a.c.d", "f"]);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce_bool(&json!("yes")), Some(true));
        assert_eq!(coerce_bool(&json!("Off")), Some(false));
        assert_eq!(coerce_bool(&json!(1)), None);
        assert_eq!(coerce_string(&json!(12)).as_deref(), Some("12"));
        assert_eq!(coerce_number(&json!("42")).and_then(|n| n.as_i64()), Some(42));
        assert_eq!(coerce_number(&json!("2.5")).and_then(|n| n.as_f64()), Some(2.5));
        assert!(coerce_number(&json!("nope")).is_none());
    }

    #[test]
    fn test_deep_and_shallow_fallback() {
        let node = json!({"a": {"x": 1}, "b": 2});
        let fallback = json!({"a": {"y": 3}, "c": 4});
        let node = node.as_object().unwrap();
        let fallback = fallback.as_object().unwrap();

        let deep = with_fallback(node, fallback);
        assert_eq!(Value::Object(deep), json!({"a": {"x": 1, "y": 3}, "b": 2, "c": 4}));

        let shallow = with_shallow_fallback(node, fallback);
        assert_eq!(Value::Object(shallow), json!({"a": {"x": 1}, "b": 2, "c": 4}));
    }
}
