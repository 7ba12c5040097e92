//! Encryption data models

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::{EncryptionError, EncryptionResult};

/// Marker identifying an encrypted field value
pub const ENVELOPE_MAGIC: &str = "PARLEY_ENC";

/// Current envelope format version
pub const ENVELOPE_VERSION: u32 = 1;

/// Algorithm identifier written into every envelope
pub const ALGORITHM_ID: &str = "chacha20poly1305";

/// Ciphertext that replaces a plaintext leaf on disk.
///
/// Envelopes are JSON objects carrying the `magic` marker, so they can never be
/// confused with an ordinary string leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Magic identifier
    pub magic: String,
    /// Algorithm used to seal the value
    pub alg: String,
    /// Envelope format version
    pub version: u32,
    /// Nonce used for this encryption (base64-encoded)
    pub nonce: String,
    /// Encrypted data without the tag (base64-encoded)
    pub ciphertext: String,
    /// Authentication tag (base64-encoded)
    pub tag: String,
}

impl Envelope {
    pub fn new(nonce: String, ciphertext: String, tag: String) -> Self {
        Self {
            magic: ENVELOPE_MAGIC.to_string(),
            alg: ALGORITHM_ID.to_string(),
            version: ENVELOPE_VERSION,
            nonce,
            ciphertext,
            tag,
        }
    }

    /// Check whether a JSON value is shaped like an envelope (has the marker)
    pub fn is_envelope(value: &Value) -> bool {
        value
            .as_object()
            .and_then(|obj| obj.get("magic"))
            .and_then(Value::as_str)
            .map(|magic| magic == ENVELOPE_MAGIC)
            .unwrap_or(false)
    }

    /// Parse an envelope out of a JSON value.
    ///
    /// Returns `None` when the value is not an envelope at all. A value that
    /// carries the marker but is otherwise malformed is an error.
    pub fn from_value(value: &Value) -> Option<EncryptionResult<Self>> {
        if !Self::is_envelope(value) {
            return None;
        }
        let parsed = serde_json::from_value::<Envelope>(value.clone())
            .map_err(|e| EncryptionError::InvalidFormat(e.to_string()))
            .and_then(|envelope| {
                if envelope.version != ENVELOPE_VERSION {
                    return Err(EncryptionError::UnsupportedVersion(envelope.version));
                }
                if envelope.alg != ALGORITHM_ID {
                    return Err(EncryptionError::UnsupportedAlgorithm(envelope.alg));
                }
                Ok(envelope)
            });
        Some(parsed)
    }

    /// Convert into the JSON object stored on disk
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "magic": self.magic,
            "alg": self.alg,
            "version": self.version,
            "nonce": self.nonce,
            "ciphertext": self.ciphertext,
            "tag": self.tag,
        })
    }
}

/// Encryption key with secure memory handling
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    /// The 256-bit key
    key: [u8; 32],
}

impl EncryptionKey {
    /// Create a new encryption key from raw bytes
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Build a key from a byte slice that must be exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> EncryptionResult<Self> {
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EncryptionError::InvalidKeyLength(bytes.len()))?;
        Ok(Self { key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for passphrase key derivation
#[derive(Debug, Clone)]
pub struct Argon2Params {
    /// Memory cost in KiB (65536 = 64MB)
    pub memory_cost: u32,
    /// Number of iterations
    pub time_cost: u32,
    /// Parallelism factor
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}
