//! Field cipher capability injected into documents
//!
//! Documents never see key material directly. They are handed a [`FieldCipher`]
//! and ask it to seal or open one leaf value at a time, passing the key path as
//! associated data so an envelope cannot be replayed into a different field.

use std::sync::atomic::{AtomicU64, Ordering};

use super::crypto::{self, NONCE_SIZE};
use super::errors::EncryptionResult;
use super::models::{EncryptionKey, Envelope};

/// Seals and opens individual string values
pub trait FieldCipher: Send + Sync {
    /// Encrypt `plaintext` into a fresh envelope bound to `key_path`
    fn seal(&self, plaintext: &str, key_path: &str) -> EncryptionResult<Envelope>;

    /// Decrypt an envelope that was sealed for `key_path`
    fn open(&self, envelope: &Envelope, key_path: &str) -> EncryptionResult<String>;
}

/// Source of per-encryption nonces
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> [u8; NONCE_SIZE];
}

/// Nonces drawn from the thread-local CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonces;

impl NonceSource for RandomNonces {
    fn next_nonce(&self) -> [u8; NONCE_SIZE] {
        crypto::generate_nonce()
    }
}

/// Deterministic, strictly increasing nonces.
///
/// Intended for tests that need reproducible envelopes. Every call still
/// produces a distinct nonce.
#[derive(Debug, Default)]
pub struct CounterNonces {
    next: AtomicU64,
}

impl CounterNonces {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl NonceSource for CounterNonces {
    fn next_nonce(&self) -> [u8; NONCE_SIZE] {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[NONCE_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        nonce
    }
}

/// ChaCha20-Poly1305 field cipher holding a single in-memory key
pub struct ChaChaFieldCipher {
    key: EncryptionKey,
    nonces: Box<dyn NonceSource>,
}

impl ChaChaFieldCipher {
    pub fn new(key: EncryptionKey) -> Self {
        Self::with_nonce_source(key, Box::new(RandomNonces))
    }

    pub fn with_nonce_source(key: EncryptionKey, nonces: Box<dyn NonceSource>) -> Self {
        Self { key, nonces }
    }
}

impl std::fmt::Debug for ChaChaFieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaChaFieldCipher")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl FieldCipher for ChaChaFieldCipher {
    fn seal(&self, plaintext: &str, key_path: &str) -> EncryptionResult<Envelope> {
        let nonce = self.nonces.next_nonce();
        crypto::seal_envelope(plaintext, key_path.as_bytes(), &self.key, &nonce)
    }

    fn open(&self, envelope: &Envelope, key_path: &str) -> EncryptionResult<String> {
        crypto::open_envelope(envelope, key_path.as_bytes(), &self.key)
    }
}
