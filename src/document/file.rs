use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::field_crypto::{decrypt_path, encrypt_path};
use super::path;
use super::schema::DocumentSchema;
use crate::encryption::{Envelope, FieldCipher};
use crate::storage::fs::{atomic_write, ensure_dir};
use crate::storage::{Result, StoreError};

/// One JSON document on disk plus its decrypted in-memory snapshot.
///
/// The snapshot always holds plaintext; sensitive leaves only exist as
/// envelopes in the serialized form written to disk.
pub struct DocumentFile {
    path: PathBuf,
    schema: Arc<DocumentSchema>,
    cipher: Arc<dyn FieldCipher>,
    snapshot: Option<Value>,
    persisted: bool,
}

impl DocumentFile {
    pub fn new(path: PathBuf, schema: Arc<DocumentSchema>, cipher: Arc<dyn FieldCipher>) -> Self {
        Self {
            path,
            schema,
            cipher,
            snapshot: None,
            persisted: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document into memory.
    ///
    /// An existing file is parsed and every sensitive path decrypted. A missing
    /// file seeds the snapshot from the schema defaults without writing
    /// anything. Returns whether the document exists on disk. Only the first
    /// call reads the file.
    pub fn initialize(&mut self) -> Result<bool> {
        if self.snapshot.is_some() {
            return Ok(self.persisted);
        }

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.snapshot = Some(self.schema.defaults().clone());
                self.persisted = false;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let mut doc: Value =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::DocumentCorrupt {
                path: self.path.clone(),
                source,
            })?;

        for key_path in self.schema.sensitive_paths() {
            decrypt_path(&mut doc, key_path, self.cipher.as_ref()).map_err(|source| {
                StoreError::Decryption {
                    path: self.path.clone(),
                    key_path: key_path.to_string(),
                    source,
                }
            })?;
        }

        self.snapshot = Some(doc);
        self.persisted = true;
        Ok(true)
    }

    /// Deep copy of the decrypted document
    pub fn get_all_data(&self) -> Result<Value> {
        self.snapshot
            .clone()
            .ok_or_else(|| StoreError::Uninitialized(self.path.clone()))
    }

    /// Replace the whole document.
    ///
    /// Sensitive paths are sealed on a copy of `new_doc`, the result is written
    /// atomically, and only then does the snapshot change. A failed write
    /// leaves both the file and the snapshot as they were. A sensitive path
    /// holding anything other than a string, `null` or an envelope is
    /// rejected before anything is written.
    pub fn overwrite_data(&mut self, new_doc: &Value) -> Result<()> {
        let mut sealed = new_doc.clone();
        for key_path in self.schema.sensitive_paths() {
            match path::get(&sealed, key_path) {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(leaf) if Envelope::is_envelope(leaf) => {}
                Some(_) => return Err(StoreError::InvalidSensitiveValue(key_path.to_string())),
            }
            encrypt_path(&mut sealed, key_path, self.cipher.as_ref()).map_err(|source| {
                StoreError::Encryption {
                    key_path: key_path.to_string(),
                    source,
                }
            })?;
        }

        let bytes = serde_json::to_vec_pretty(&sealed)?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        atomic_write(&self.path, &bytes)?;

        log::debug!("Wrote document {:?} ({} bytes)", self.path, bytes.len());
        self.snapshot = Some(new_doc.clone());
        self.persisted = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{
        generate_key, ChaChaFieldCipher, EncryptionError, EncryptionKey, Envelope,
    };
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde_json::json;
    use tempfile::TempDir;

    fn settings_schema() -> Arc<DocumentSchema> {
        Arc::new(
            DocumentSchema::new(
                json!({"openai": {"apiKey": ""}, "anthropic": {"apiKey": ""}}),
                &["openai.apiKey", "anthropic.apiKey"],
            )
            .unwrap(),
        )
    }

    fn cipher_for(key: &EncryptionKey) -> Arc<dyn FieldCipher> {
        Arc::new(ChaChaFieldCipher::new(key.clone()))
    }

    #[test]
    fn test_missing_file_seeds_defaults_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut doc = DocumentFile::new(path.clone(), settings_schema(), cipher_for(&generate_key()));

        assert!(!doc.initialize().unwrap());
        assert_eq!(doc.get_all_data().unwrap()["openai"]["apiKey"], json!(""));
        assert!(!path.exists());
    }

    #[test]
    fn test_get_all_data_requires_initialize() {
        let dir = TempDir::new().unwrap();
        let doc = DocumentFile::new(
            dir.path().join("x.json"),
            settings_schema(),
            cipher_for(&generate_key()),
        );
        assert!(matches!(doc.get_all_data(), Err(StoreError::Uninitialized(_))));
    }

    #[test]
    fn test_round_trip_and_confidentiality() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let key = generate_key();
        let data = json!({
            "openai": {"apiKey": "sk-123", "baseUrl": "https://api.openai.com/v1"},
            "anthropic": {"apiKey": "sk-ant-456"},
            "theme": "dark"
        });

        let mut writer = DocumentFile::new(path.clone(), settings_schema(), cipher_for(&key));
        writer.overwrite_data(&data).unwrap();
        assert_eq!(writer.get_all_data().unwrap(), data);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("sk-123"));
        assert!(!raw.contains("sk-ant-456"));
        assert!(raw.contains("https://api.openai.com/v1"));

        let mut reader = DocumentFile::new(path, settings_schema(), cipher_for(&key));
        assert!(reader.initialize().unwrap());
        assert_eq!(reader.get_all_data().unwrap(), data);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let dir = TempDir::new().unwrap();
        let mut doc = DocumentFile::new(
            dir.path().join("s.json"),
            settings_schema(),
            cipher_for(&generate_key()),
        );
        doc.overwrite_data(&json!({"openai": {"apiKey": "sk-1"}})).unwrap();

        let mut copy = doc.get_all_data().unwrap();
        copy["openai"]["apiKey"] = json!("mutated");
        assert_eq!(doc.get_all_data().unwrap()["openai"]["apiKey"], json!("sk-1"));
    }

    #[test]
    fn test_initialize_reads_disk_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.json");
        let key = generate_key();

        let mut writer = DocumentFile::new(path.clone(), settings_schema(), cipher_for(&key));
        writer.overwrite_data(&json!({"openai": {"apiKey": "sk-1"}})).unwrap();

        let mut reader = DocumentFile::new(path.clone(), settings_schema(), cipher_for(&key));
        reader.initialize().unwrap();
        fs::write(&path, "garbage").unwrap();

        // The second call is served from memory.
        assert!(reader.initialize().unwrap());
        assert_eq!(reader.get_all_data().unwrap()["openai"]["apiKey"], json!("sk-1"));
    }

    #[test]
    fn test_corrupt_file_is_an_error_not_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let mut doc = DocumentFile::new(path, settings_schema(), cipher_for(&generate_key()));
        assert!(matches!(doc.initialize(), Err(StoreError::DocumentCorrupt { .. })));
        assert!(doc.get_all_data().is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails_to_decrypt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let key = generate_key();

        let mut writer = DocumentFile::new(path.clone(), settings_schema(), cipher_for(&key));
        writer.overwrite_data(&json!({"openai": {"apiKey": "sk-123"}})).unwrap();

        let mut stored: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let envelope = Envelope::from_value(&stored["openai"]["apiKey"]).unwrap().unwrap();
        let mut bytes = BASE64.decode(&envelope.ciphertext).unwrap();
        bytes[0] ^= 0x01;
        stored["openai"]["apiKey"]["ciphertext"] = json!(BASE64.encode(bytes));
        fs::write(&path, serde_json::to_vec_pretty(&stored).unwrap()).unwrap();

        let mut reader = DocumentFile::new(path, settings_schema(), cipher_for(&key));
        match reader.initialize() {
            Err(StoreError::Decryption { key_path, source, .. }) => {
                assert_eq!(key_path, "openai.apiKey");
                assert!(matches!(source, EncryptionError::TagMismatch));
            }
            other => panic!("expected decryption error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let mut writer =
            DocumentFile::new(path.clone(), settings_schema(), cipher_for(&generate_key()));
        writer.overwrite_data(&json!({"anthropic": {"apiKey": "sk-ant"}})).unwrap();

        let mut reader = DocumentFile::new(path, settings_schema(), cipher_for(&generate_key()));
        assert!(matches!(reader.initialize(), Err(StoreError::Decryption { .. })));
    }

    #[test]
    fn test_overwrite_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2026").join("10").join("c.json");

        let mut doc = DocumentFile::new(
            path.clone(),
            Arc::new(DocumentSchema::plain()),
            cipher_for(&generate_key()),
        );
        doc.overwrite_data(&json!({"title": "hello"})).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_non_string_secret_is_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let key = generate_key();

        let mut doc = DocumentFile::new(path.clone(), settings_schema(), cipher_for(&key));
        doc.overwrite_data(&json!({"openai": {"apiKey": "sk-1"}})).unwrap();

        for bad in [json!(987654321), json!(true), json!({"nested": "sk-2"}), json!(["sk-3"])] {
            let result = doc.overwrite_data(&json!({"openai": {"apiKey": bad}}));
            match result {
                Err(StoreError::InvalidSensitiveValue(key_path)) => {
                    assert_eq!(key_path, "openai.apiKey")
                }
                other => panic!("expected rejection, got {:?}", other),
            }
        }

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("987654321"));
        assert!(!raw.contains("sk-2"));
        assert_eq!(doc.get_all_data().unwrap()["openai"]["apiKey"], json!("sk-1"));

        doc.overwrite_data(&json!({"openai": {"apiKey": null}})).unwrap();
    }
}
