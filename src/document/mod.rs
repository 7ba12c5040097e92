//! Single JSON documents with selectively encrypted fields
//!
//! - [`path`]: typed dot-path traversal over `serde_json::Value`
//! - [`field_crypto`]: seal/open the leaf at one key path
//! - [`schema`]: which paths of a document family are sensitive
//! - [`file`]: one on-disk document with atomic whole-document replace

pub mod field_crypto;
mod file;
pub mod path;
mod schema;

pub use field_crypto::{decrypt_path, encrypt_path};
pub use file::DocumentFile;
pub use path::{KeyPath, PathError};
pub use schema::DocumentSchema;
