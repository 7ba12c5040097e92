//! Opaque pagination cursor for partitioned listings.
//!
//! A token records which partition the next page starts in, both by position
//! in the descending partition list and by name. If the partition found at
//! that position no longer has that name, the partition set changed between
//! calls and the token is rejected as stale instead of silently skipping or
//! repeating files.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::partition::Partition;

/// Current cursor format version
pub const PAGE_TOKEN_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    #[serde(rename = "v")]
    pub version: u32,
    /// Position of the resume partition in the descending partition list
    pub index: usize,
    /// Name of the resume partition when the token was issued
    pub partition: Partition,
    /// Entries of the resume partition already returned
    #[serde(default)]
    pub offset: usize,
}

impl PageToken {
    pub fn new(index: usize, partition: Partition, offset: usize) -> Self {
        Self {
            version: PAGE_TOKEN_VERSION,
            index,
            partition,
            offset,
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of integers and a string cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        BASE64_URL.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self, StoreError> {
        let bytes = BASE64_URL
            .decode(raw.trim())
            .map_err(|e| StoreError::InvalidPageToken(e.to_string()))?;
        let token: PageToken = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::InvalidPageToken(e.to_string()))?;
        if token.version != PAGE_TOKEN_VERSION {
            return Err(StoreError::InvalidPageToken(format!(
                "unsupported token version {}",
                token.version
            )));
        }
        Ok(token)
    }

    /// Check the token against the current descending partition list and
    /// return the position to resume from.
    pub fn resolve(&self, partitions: &[Partition]) -> Result<usize, StoreError> {
        match partitions.get(self.index) {
            Some(found) if *found == self.partition => Ok(self.index),
            _ => Err(StoreError::StalePageToken),
        }
    }
}
