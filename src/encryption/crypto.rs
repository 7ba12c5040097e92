//! Cryptographic operations for encryption/decryption

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use super::errors::{EncryptionError, EncryptionResult};
use super::models::{Argon2Params, EncryptionKey, Envelope};

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Nonce size in bytes for ChaCha20-Poly1305
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Generate a random salt for key derivation
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    BASE64.encode(salt)
}

/// Generate a random nonce for encryption
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Generate a fresh random 256-bit key
pub fn generate_key() -> EncryptionKey {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    EncryptionKey::new(key)
}

/// Derive an encryption key from a passphrase using Argon2id
pub fn derive_key(
    passphrase: &str,
    salt_b64: &str,
    params: &Argon2Params,
) -> EncryptionResult<EncryptionKey> {
    let salt_bytes = BASE64.decode(salt_b64)?;

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32), // Output 256-bit key
    )
    .map_err(|e| EncryptionError::KeyDerivationFailed(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), &salt_bytes, &mut key)
        .map_err(|e| EncryptionError::KeyDerivationFailed(e.to_string()))?;

    Ok(EncryptionKey::new(key))
}

/// Encrypt data using ChaCha20-Poly1305. The returned buffer has the tag appended.
pub fn encrypt(
    plaintext: &[u8],
    aad: &[u8],
    key: &EncryptionKey,
    nonce_bytes: &[u8; NONCE_SIZE],
) -> EncryptionResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    cipher
        .encrypt(Nonce::from_slice(nonce_bytes), Payload { msg: plaintext, aad })
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))
}

/// Decrypt data using ChaCha20-Poly1305. `ciphertext` must include the tag.
pub fn decrypt(
    ciphertext: &[u8],
    aad: &[u8],
    key: &EncryptionKey,
    nonce_bytes: &[u8],
) -> EncryptionResult<Vec<u8>> {
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(EncryptionError::InvalidFormat(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        )));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), Payload { msg: ciphertext, aad })
        .map_err(|_| EncryptionError::TagMismatch)
}

/// Seal a string into an envelope, binding it to `aad`
pub fn seal_envelope(
    plaintext: &str,
    aad: &[u8],
    key: &EncryptionKey,
    nonce: &[u8; NONCE_SIZE],
) -> EncryptionResult<Envelope> {
    let sealed = encrypt(plaintext.as_bytes(), aad, key, nonce)?;

    // ChaCha20-Poly1305 appends the auth tag to the ciphertext; the envelope
    // keeps them in separate fields.
    let tag_offset = sealed.len().saturating_sub(TAG_SIZE);
    let (cipher_data, tag_data) = sealed.split_at(tag_offset);

    Ok(Envelope::new(
        BASE64.encode(nonce),
        BASE64.encode(cipher_data),
        BASE64.encode(tag_data),
    ))
}

/// Open an envelope previously produced by [`seal_envelope`]
pub fn open_envelope(
    envelope: &Envelope,
    aad: &[u8],
    key: &EncryptionKey,
) -> EncryptionResult<String> {
    let nonce = BASE64.decode(&envelope.nonce)?;
    let mut ciphertext = BASE64.decode(&envelope.ciphertext)?;
    let tag = BASE64.decode(&envelope.tag)?;
    if tag.len() != TAG_SIZE {
        return Err(EncryptionError::InvalidFormat(format!(
            "Invalid tag size: expected {}, got {}",
            TAG_SIZE,
            tag.len()
        )));
    }

    ciphertext.extend_from_slice(&tag);
    let plaintext = decrypt(&ciphertext, aad, key, &nonce)?;
    String::from_utf8(plaintext).map_err(|_| EncryptionError::InvalidUtf8)
}
