//! Encryption error types

use thiserror::Error;

/// Errors that can occur while sealing or opening field envelopes
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authentication tag did not verify: wrong key or tampered bytes
    #[error("Decryption failed: authentication tag mismatch")]
    TagMismatch,

    #[error("Invalid envelope format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported envelope algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u32),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Result type alias for encryption operations
pub type EncryptionResult<T> = Result<T, EncryptionError>;
