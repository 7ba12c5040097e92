use std::path::PathBuf;

use thiserror::Error;

use crate::document::PathError;
use crate::encryption::EncryptionError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A file exists but is not valid JSON. Never replaced with defaults.
    #[error("Document is corrupt: {}: {source}", .path.display())]
    DocumentCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An envelope is present but cannot be opened (wrong key or tampering)
    #[error("Failed to decrypt '{key_path}' in {}: {source}", .path.display())]
    Decryption {
        path: PathBuf,
        key_path: String,
        #[source]
        source: EncryptionError,
    },

    #[error("Failed to encrypt '{key_path}': {source}")]
    Encryption {
        key_path: String,
        #[source]
        source: EncryptionError,
    },

    /// Only strings can be sealed, so anything else at a sensitive path
    /// would be stored in the clear.
    #[error("Value at sensitive path '{0}' must be a string")]
    InvalidSensitiveValue(String),

    #[error("Partition error: {0}")]
    Partition(String),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    #[error("Page token is stale: the partition set changed since it was issued")]
    StalePageToken,

    #[error("Key path error: {0}")]
    Path(#[from] PathError),

    #[error("Document not initialized: {}", .0.display())]
    Uninitialized(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
