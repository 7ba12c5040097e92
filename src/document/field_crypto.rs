//! Encrypt or decrypt the single leaf addressed by a key path.

use serde_json::Value;

use super::path::{self, KeyPath};
use crate::encryption::{EncryptionResult, Envelope, FieldCipher};

/// Replace the string at `path` with a freshly sealed envelope.
///
/// Returns `Ok(false)` without touching the document when the path is missing,
/// the leaf is not a string, the string is empty, or the leaf is already an
/// envelope.
pub fn encrypt_path(
    doc: &mut Value,
    path: &KeyPath,
    cipher: &dyn FieldCipher,
) -> EncryptionResult<bool> {
    let leaf = match path::get_mut(doc, path) {
        Some(leaf) => leaf,
        None => return Ok(false),
    };

    let envelope = match &*leaf {
        Value::String(plaintext) if !plaintext.is_empty() => {
            cipher.seal(plaintext, path.as_str())?
        }
        _ => return Ok(false),
    };

    *leaf = envelope.to_value();
    Ok(true)
}

/// Replace the envelope at `path` with its plaintext.
///
/// Anything that is not an envelope is left as is. An envelope that fails to
/// open is an error; the ciphertext is never handed back in its place.
pub fn decrypt_path(
    doc: &mut Value,
    path: &KeyPath,
    cipher: &dyn FieldCipher,
) -> EncryptionResult<bool> {
    let leaf = match path::get_mut(doc, path) {
        Some(leaf) => leaf,
        None => return Ok(false),
    };

    let envelope = match Envelope::from_value(leaf) {
        Some(parsed) => parsed?,
        None => return Ok(false),
    };

    let plaintext = cipher.open(&envelope, path.as_str())?;
    *leaf = Value::String(plaintext);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{generate_key, ChaChaFieldCipher, EncryptionError};
    use serde_json::json;

    fn path(raw: &str) -> KeyPath {
        KeyPath::parse(raw).unwrap()
    }

    #[test]
    fn test_encrypt_then_decrypt_restores_plaintext() {
        let cipher = ChaChaFieldCipher::new(generate_key());
        let mut doc = json!({"openai": {"apiKey": "sk-123", "model": "gpt"}});

        assert!(encrypt_path(&mut doc, &path("openai.apiKey"), &cipher).unwrap());
        assert!(Envelope::is_envelope(&doc["openai"]["apiKey"]));
        assert_eq!(doc["openai"]["model"], json!("gpt"));
        assert!(!doc.to_string().contains("sk-123"));

        assert!(decrypt_path(&mut doc, &path("openai.apiKey"), &cipher).unwrap());
        assert_eq!(doc, json!({"openai": {"apiKey": "sk-123", "model": "gpt"}}));
    }

    #[test]
    fn test_encrypt_is_noop_for_missing_and_non_string() {
        let cipher = ChaChaFieldCipher::new(generate_key());
        let mut doc = json!({"count": 3, "flag": true, "empty": "", "nested": {"list": [1]}});
        let before = doc.clone();

        for raw in ["missing.key", "count", "flag", "empty", "nested", "nested.list"] {
            assert!(!encrypt_path(&mut doc, &path(raw), &cipher).unwrap());
        }
        assert_eq!(doc, before);
    }

    #[test]
    fn test_encrypt_twice_does_not_double_wrap() {
        let cipher = ChaChaFieldCipher::new(generate_key());
        let mut doc = json!({"secret": "T0P"});

        assert!(encrypt_path(&mut doc, &path("secret"), &cipher).unwrap());
        let sealed = doc.clone();
        assert!(!encrypt_path(&mut doc, &path("secret"), &cipher).unwrap());
        assert_eq!(doc, sealed);
    }

    #[test]
    fn test_decrypt_leaves_plain_strings_alone() {
        let cipher = ChaChaFieldCipher::new(generate_key());
        let mut doc = json!({"secret": "legacy-plaintext"});

        assert!(!decrypt_path(&mut doc, &path("secret"), &cipher).unwrap());
        assert_eq!(doc["secret"], json!("legacy-plaintext"));
    }

    #[test]
    fn test_decrypt_with_wrong_key_propagates() {
        let writer = ChaChaFieldCipher::new(generate_key());
        let reader = ChaChaFieldCipher::new(generate_key());
        let mut doc = json!({"secret": "T0P"});

        encrypt_path(&mut doc, &path("secret"), &writer).unwrap();
        let sealed = doc.clone();

        let result = decrypt_path(&mut doc, &path("secret"), &reader);
        assert!(matches!(result, Err(EncryptionError::TagMismatch)));
        // Nothing partial was written back into the document.
        assert_eq!(doc, sealed);
    }
}
