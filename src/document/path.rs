//! Dot-path addressing over JSON values.
//!
//! A [`KeyPath`] such as `openai.apiKey` names a leaf inside a document. Object
//! members are addressed by key and array elements by decimal index
//! (`providers.0.apiKey`). Traversal never invents structure: writing below a
//! missing or non-container node is reported as a [`PathError`].

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Key path is empty")]
    Empty,

    #[error("Key path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("No value at '{0}'")]
    Missing(String),

    #[error("Value at '{0}' is not an object or array")]
    NotAContainer(String),

    #[error("Segment '{segment}' of '{path}' is not an array index")]
    InvalidIndex { path: String, segment: String },

    #[error("Index out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds { path: String, len: usize },
}

/// A parsed dot-delimited address of a value inside a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    raw: String,
    segments: Vec<String>,
}

impl KeyPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted form of the first `depth` segments, for error messages
    fn prefix(&self, depth: usize) -> String {
        if depth == 0 {
            "<root>".to_string()
        } else {
            self.segments[..depth].join(".")
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Resolve a path, returning `None` when any segment is absent
pub fn get<'a>(root: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    let mut current = root;
    for segment in &path.segments {
        current = child(current, segment)?;
    }
    Some(current)
}

/// Mutable variant of [`get`]
pub fn get_mut<'a>(root: &'a mut Value, path: &KeyPath) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in &path.segments {
        current = child_mut(current, segment)?;
    }
    Some(current)
}

fn parse_index(path: &KeyPath, depth: usize) -> Result<usize, PathError> {
    let segment = &path.segments[depth];
    segment.parse::<usize>().map_err(|_| PathError::InvalidIndex {
        path: path.as_str().to_string(),
        segment: segment.clone(),
    })
}

/// Store `value` at `path`, returning the value it replaced.
///
/// Every intermediate segment must already exist and be an object or array.
/// The final segment may name a new member of an existing object, or an
/// existing element of an array.
pub fn set(root: &mut Value, path: &KeyPath, value: Value) -> Result<Option<Value>, PathError> {
    let (last, parents) = path.segments.split_last().ok_or(PathError::Empty)?;

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = match current {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| PathError::Missing(path.prefix(depth + 1)))?,
            Value::Array(items) => {
                let index = parse_index(path, depth)?;
                let len = items.len();
                items.get_mut(index).ok_or_else(|| PathError::IndexOutOfBounds {
                    path: path.prefix(depth + 1),
                    len,
                })?
            }
            _ => return Err(PathError::NotAContainer(path.prefix(depth))),
        };
    }

    match current {
        Value::Object(map) => Ok(map.insert(last.clone(), value)),
        Value::Array(items) => {
            let index = parse_index(path, parents.len())?;
            let len = items.len();
            match items.get_mut(index) {
                Some(slot) => Ok(Some(std::mem::replace(slot, value))),
                None => Err(PathError::IndexOutOfBounds {
                    path: path.as_str().to_string(),
                    len,
                }),
            }
        }
        _ => Err(PathError::NotAContainer(path.prefix(parents.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> KeyPath {
        KeyPath::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert_eq!(KeyPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            KeyPath::parse("openai..apiKey"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(KeyPath::parse(".apiKey"), Err(PathError::EmptySegment(_))));
        assert_eq!(path("openai.apiKey").segments().len(), 2);
    }

    #[test]
    fn test_get_walks_objects_and_arrays() {
        let doc = json!({
            "openai": {"apiKey": "sk-1"},
            "providers": [{"apiKey": "a"}, {"apiKey": "b"}]
        });

        assert_eq!(get(&doc, &path("openai.apiKey")), Some(&json!("sk-1")));
        assert_eq!(get(&doc, &path("providers.1.apiKey")), Some(&json!("b")));
        assert_eq!(get(&doc, &path("providers.7.apiKey")), None);
        assert_eq!(get(&doc, &path("openai.apiKey.deeper")), None);
        assert_eq!(get(&doc, &path("anthropic.apiKey")), None);
    }

    #[test]
    fn test_set_replaces_and_inserts_leaf() {
        let mut doc = json!({"openai": {"apiKey": "old"}});

        let previous = set(&mut doc, &path("openai.apiKey"), json!("new")).unwrap();
        assert_eq!(previous, Some(json!("old")));

        let previous = set(&mut doc, &path("openai.model"), json!("gpt")).unwrap();
        assert_eq!(previous, None);
        assert_eq!(doc, json!({"openai": {"apiKey": "new", "model": "gpt"}}));
    }

    #[test]
    fn test_set_does_not_fabricate_intermediates() {
        let mut doc = json!({"openai": {"apiKey": "x"}});
        let before = doc.clone();

        let err = set(&mut doc, &path("anthropic.apiKey"), json!("y")).unwrap_err();
        assert_eq!(err, PathError::Missing("anthropic".to_string()));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut doc = json!({"openai": "flat"});
        let err = set(&mut doc, &path("openai.apiKey"), json!("y")).unwrap_err();
        assert_eq!(err, PathError::NotAContainer("openai".to_string()));

        let mut scalar_root = json!(42);
        let err = set(&mut scalar_root, &path("a"), json!(1)).unwrap_err();
        assert_eq!(err, PathError::NotAContainer("<root>".to_string()));
    }

    #[test]
    fn test_set_array_elements() {
        let mut doc = json!({"items": [1, 2]});
        set(&mut doc, &path("items.1"), json!(5)).unwrap();
        assert_eq!(doc, json!({"items": [1, 5]}));

        assert!(matches!(
            set(&mut doc, &path("items.2"), json!(9)),
            Err(PathError::IndexOutOfBounds { len: 2, .. })
        ));
        assert!(matches!(
            set(&mut doc, &path("items.first"), json!(9)),
            Err(PathError::InvalidIndex { .. })
        ));
    }
}
