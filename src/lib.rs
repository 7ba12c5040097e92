//! Encrypted, partitioned JSON document storage for a desktop chat client.
//!
//! Documents are plain JSON files whose declared sensitive leaves (API keys,
//! private prompts) are replaced on disk by authenticated-encryption
//! envelopes. Two collection shapes sit on top:
//!
//! - [`storage::Collection`]: a flat directory of documents
//! - [`storage::PartitionedCollection`]: documents bucketed by creation
//!   month with paginated listing
//!
//! [`settings::SettingsStore`] and [`conversations::ConversationStore`] are the
//! application-level callers of each shape.

pub mod cache;
pub mod clock;
pub mod config;
pub mod conversations;
pub mod document;
pub mod encryption;
pub mod settings;
pub mod storage;

pub use config::{ConfigError, StoreConfig};
pub use conversations::ConversationStore;
pub use settings::SettingsStore;
pub use storage::{Collection, ListPage, PartitionedCollection, StoreError};
