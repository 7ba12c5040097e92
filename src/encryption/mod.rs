//! Field-level encryption for stored documents
//!
//! This module provides:
//! - ChaCha20-Poly1305 authenticated encryption of single string values
//! - The on-disk envelope format that replaces an encrypted leaf
//! - The injectable [`FieldCipher`] capability handed to documents
//! - Master key acquisition (keyring, environment, Argon2id passphrase)

pub mod cipher;
pub mod crypto;
pub mod errors;
pub mod keys;
pub mod models;

// Re-export commonly used types
pub use cipher::{ChaChaFieldCipher, CounterNonces, FieldCipher, NonceSource, RandomNonces};
pub use crypto::{derive_key, generate_key, generate_salt};
pub use errors::{EncryptionError, EncryptionResult};
pub use keys::{KeyError, KeySource};
pub use models::{
    Argon2Params, EncryptionKey, Envelope, ALGORITHM_ID, ENVELOPE_MAGIC, ENVELOPE_VERSION,
};
