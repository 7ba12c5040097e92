use serde_json::{Map, Value};

use super::path::{KeyPath, PathError};

/// Shape contract for a family of stored documents: which leaves are
/// sensitive and what a never-written document looks like.
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    sensitive_paths: Vec<KeyPath>,
    defaults: Value,
}

impl DocumentSchema {
    /// Build a schema from default data and a list of sensitive dot-paths.
    /// Duplicate paths are kept once, in first-seen order.
    pub fn new(defaults: Value, sensitive_paths: &[&str]) -> Result<Self, PathError> {
        let mut paths: Vec<KeyPath> = Vec::with_capacity(sensitive_paths.len());
        for raw in sensitive_paths {
            let parsed = KeyPath::parse(raw)?;
            if !paths.contains(&parsed) {
                paths.push(parsed);
            }
        }
        Ok(Self {
            sensitive_paths: paths,
            defaults,
        })
    }

    /// A schema with no sensitive fields and an empty object as default
    pub fn plain() -> Self {
        Self {
            sensitive_paths: Vec::new(),
            defaults: Value::Object(Map::new()),
        }
    }

    pub fn sensitive_paths(&self) -> &[KeyPath] {
        &self.sensitive_paths
    }

    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    pub fn is_sensitive(&self, path: &KeyPath) -> bool {
        self.sensitive_paths.contains(path)
    }
}
