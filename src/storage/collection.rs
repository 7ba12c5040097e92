use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{Result, StoreError};
use super::fs::{ensure_dir, list_document_names, validate_file_name};
use super::locks::PathLocks;
use crate::document::{DocumentFile, DocumentSchema};
use crate::encryption::FieldCipher;

/// One page of a listing. Callers keep asking while `next_token` is `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Shared machinery of flat and partitioned collections: everything needed
/// to open a document in some directory and mutate it under its path lock.
#[derive(Clone)]
pub(crate) struct DocumentAccess {
    schema: Arc<DocumentSchema>,
    cipher: Arc<dyn FieldCipher>,
    locks: &'static PathLocks,
}

impl DocumentAccess {
    pub(crate) fn new(schema: DocumentSchema, cipher: Arc<dyn FieldCipher>) -> Self {
        Self {
            schema: Arc::new(schema),
            cipher,
            locks: PathLocks::global(),
        }
    }

    pub(crate) fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    fn open(&self, path: PathBuf) -> DocumentFile {
        DocumentFile::new(path, Arc::clone(&self.schema), Arc::clone(&self.cipher))
    }

    pub(crate) fn write(&self, path: PathBuf, data: &Value) -> Result<()> {
        let lock_path = path.clone();
        self.locks
            .with_lock(&lock_path, || self.open(path).overwrite_data(data))
    }

    pub(crate) fn read(&self, path: PathBuf) -> Result<Option<Value>> {
        let mut doc = self.open(path);
        if !doc.initialize()? {
            return Ok(None);
        }
        doc.get_all_data().map(Some)
    }

    pub(crate) fn update<F>(&self, path: PathBuf, apply: F) -> Result<Value>
    where
        F: FnOnce(&mut Value) -> Result<()>,
    {
        let lock_path = path.clone();
        self.locks.with_lock(&lock_path, || {
            let mut doc = self.open(path);
            doc.initialize()?;
            let mut data = doc.get_all_data()?;
            apply(&mut data)?;
            doc.overwrite_data(&data)?;
            Ok(data)
        })
    }

    pub(crate) fn delete(&self, path: PathBuf, name: &str) -> Result<()> {
        self.locks.with_lock(&path, || match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted document {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        })
    }
}

/// A flat directory of encrypted JSON documents
#[derive(Clone)]
pub struct Collection {
    base_dir: PathBuf,
    access: DocumentAccess,
}

impl Collection {
    /// Open a collection, creating its directory if needed
    pub fn new(
        base_dir: PathBuf,
        schema: DocumentSchema,
        cipher: Arc<dyn FieldCipher>,
    ) -> Result<Self> {
        ensure_dir(&base_dir)?;
        Ok(Self {
            base_dir,
            access: DocumentAccess::new(schema, cipher),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn schema(&self) -> &DocumentSchema {
        self.access.schema()
    }

    fn file_path(&self, name: &str) -> Result<PathBuf> {
        validate_file_name(name)?;
        Ok(self.base_dir.join(name))
    }

    /// Create or fully replace a document
    pub fn add_file(&self, name: &str, data: &Value) -> Result<()> {
        let path = self.file_path(name)?;
        self.access.write(path, data)
    }

    /// Read a document. `None` means absent; a damaged file is an error.
    pub fn get_file(&self, name: &str) -> Result<Option<Value>> {
        let path = self.file_path(name)?;
        self.access.read(path)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.file_path(name)?.is_file())
    }

    /// Read-modify-write a document while holding its lock.
    ///
    /// A missing document starts from the schema defaults. Returns the
    /// document as written.
    pub fn update_file<F>(&self, name: &str, apply: F) -> Result<Value>
    where
        F: FnOnce(&mut Value) -> Result<()>,
    {
        let path = self.file_path(name)?;
        self.access.update(path, apply)
    }

    /// Unlink a document. Deleting a missing document is `NotFound`.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name)?;
        self.access.delete(path, name)
    }

    /// All document names, unpaged
    pub fn list_files(&self) -> Result<ListPage> {
        Ok(ListPage {
            files: list_document_names(&self.base_dir)?,
            next_token: None,
        })
    }
}
