//! Master key acquisition for binaries.
//!
//! The store itself only ever receives a [`FieldCipher`](super::FieldCipher);
//! this module is how the CLI obtains the key that backs it. Key material is
//! never written next to the documents it protects.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use super::crypto::{derive_key, generate_key};
use super::errors::EncryptionError;
use super::models::{Argon2Params, EncryptionKey};

pub const DEFAULT_KEYRING_SERVICE: &str = "parley";
pub const DEFAULT_KEYRING_ACCOUNT: &str = "master-key";
pub const DEFAULT_KEY_ENV: &str = "PARLEY_MASTER_KEY";
pub const DEFAULT_PASSPHRASE_ENV: &str = "PARLEY_PASSPHRASE";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Passphrase key source requires a salt in the configuration")]
    MissingSalt,

    #[error("Stored key is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// Where the master key comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeySource {
    /// OS keychain entry holding a base64 key; created on first use
    Keyring { service: String, account: String },
    /// Base64-encoded 32-byte key in an environment variable
    Env { var: String },
    /// Argon2id-derived key from a passphrase in an environment variable
    Passphrase { var: String, salt: Option<String> },
}

impl Default for KeySource {
    fn default() -> Self {
        Self::Keyring {
            service: DEFAULT_KEYRING_SERVICE.to_string(),
            account: DEFAULT_KEYRING_ACCOUNT.to_string(),
        }
    }
}

impl KeySource {
    /// Resolve the configured source into key material
    pub fn load(&self) -> Result<EncryptionKey, KeyError> {
        match self {
            KeySource::Keyring { service, account } => load_or_create_keyring_key(service, account),
            KeySource::Env { var } => {
                let encoded = Zeroizing::new(read_env(var)?);
                decode_key(encoded.trim())
            }
            KeySource::Passphrase { var, salt } => {
                let salt = salt.as_deref().ok_or(KeyError::MissingSalt)?;
                let passphrase = Zeroizing::new(read_env(var)?);
                Ok(derive_key(&passphrase, salt, &Argon2Params::default())?)
            }
        }
    }
}

fn read_env(var: &str) -> Result<String, KeyError> {
    std::env::var(var).map_err(|_| KeyError::MissingEnv(var.to_string()))
}

/// Decode a base64 key string
pub fn decode_key(encoded: &str) -> Result<EncryptionKey, KeyError> {
    let bytes = Zeroizing::new(BASE64.decode(encoded)?);
    Ok(EncryptionKey::from_slice(&bytes)?)
}

/// Encode a key for storage in a keychain or environment variable
pub fn encode_key(key: &EncryptionKey) -> String {
    BASE64.encode(key.as_bytes())
}

fn load_or_create_keyring_key(service: &str, account: &str) -> Result<EncryptionKey, KeyError> {
    let entry =
        keyring::Entry::new(service, account).map_err(|e| KeyError::Keyring(e.to_string()))?;

    match entry.get_password() {
        Ok(encoded) => {
            let encoded = Zeroizing::new(encoded);
            decode_key(encoded.trim())
        }
        Err(keyring::Error::NoEntry) => {
            let key = generate_key();
            let encoded = Zeroizing::new(encode_key(&key));
            entry
                .set_password(&encoded)
                .map_err(|e| KeyError::Keyring(e.to_string()))?;
            log::info!("Created new master key in keyring service '{}'", service);
            Ok(key)
        }
        Err(e) => Err(KeyError::Keyring(e.to_string())),
    }
}
