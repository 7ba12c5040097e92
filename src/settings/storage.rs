use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use super::models::{default_document, fill_defaults, Settings, SENSITIVE_PATHS};
use crate::document::{path, DocumentSchema, KeyPath};
use crate::encryption::FieldCipher;
use crate::storage::{Collection, Result};

/// Name of the single settings document
pub const SETTINGS_FILE: &str = "settings.json";

/// Storage for application settings (one encrypted JSON document)
#[derive(Clone)]
pub struct SettingsStore {
    collection: Collection,
}

impl SettingsStore {
    /// Open the store rooted at `settings_dir`, creating it if needed
    pub fn new(settings_dir: PathBuf, cipher: Arc<dyn FieldCipher>) -> Result<Self> {
        let schema = DocumentSchema::new(default_document(), SENSITIVE_PATHS)?;
        let collection = Collection::new(settings_dir, schema, cipher)?;
        Ok(Self { collection })
    }

    pub fn file_path(&self) -> PathBuf {
        self.collection.base_dir().join(SETTINGS_FILE)
    }

    /// The decrypted settings document, with defaults for anything unset.
    ///
    /// A corrupt settings file is an error, never silently reset.
    pub fn load(&self) -> Result<Value> {
        let defaults = self.collection.schema().defaults();
        match self.collection.get_file(SETTINGS_FILE)? {
            Some(mut doc) => {
                fill_defaults(&mut doc, defaults);
                Ok(doc)
            }
            None => Ok(defaults.clone()),
        }
    }

    /// Typed view of [`load`](Self::load)
    pub fn settings(&self) -> Result<Settings> {
        Ok(serde_json::from_value(self.load()?)?)
    }

    /// Whether values at `key_path` are stored encrypted. Unparseable paths
    /// are not sensitive.
    pub fn is_sensitive(&self, key_path: &str) -> bool {
        KeyPath::parse(key_path)
            .map(|parsed| self.collection.schema().is_sensitive(&parsed))
            .unwrap_or(false)
    }

    /// Value at a dot-path such as `openai.baseUrl`
    pub fn get(&self, key_path: &str) -> Result<Option<Value>> {
        let key_path = KeyPath::parse(key_path)?;
        let doc = self.load()?;
        Ok(path::get(&doc, &key_path).cloned())
    }

    /// Set one value and persist. Intermediate objects must already exist.
    ///
    /// Returns the previous value at that path, if any.
    pub fn set(&self, key_path: &str, value: Value) -> Result<Option<Value>> {
        let key_path = KeyPath::parse(key_path)?;
        let defaults = self.collection.schema().defaults().clone();
        let mut previous = None;

        self.collection.update_file(SETTINGS_FILE, |doc| {
            fill_defaults(doc, &defaults);
            previous = path::set(doc, &key_path, value)?;
            Ok(())
        })?;

        log::info!("Updated setting {}", key_path);
        Ok(previous)
    }

    /// Replace the whole settings document
    pub fn replace(&self, doc: &Value) -> Result<()> {
        self.collection.add_file(SETTINGS_FILE, doc)
    }
}
