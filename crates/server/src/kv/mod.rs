//! Key-value namespace backing the card store.
//!
//! # Architecture
//!
//! Cards live in a Cloudflare Workers KV namespace reached over its REST
//! API. Each value carries an attached metadata object (`{ownerId}`) that is
//! only visible while enumerating keys - the namespace has no queryable
//! index, so owner-scoped operations are paginated scans.
//!
//! Two backends sit behind the [`KvStore`] enum:
//!
//! - [`CloudflareKv`] - the durable namespace (production)
//! - [`MemoryKv`] - a process-scoped map used when no Cloudflare credentials
//!   are configured; non-durable, non-shared across instances, and suitable
//!   for local development and tests only
//!
//! Enum dispatch keeps the application state a concrete type; both backends
//! expose the same four operations and the same pagination contract: when a
//! page reports `list_complete == false` it always carries a cursor.

mod cloudflare;
mod memory;

pub use cloudflare::CloudflareKv;
pub use memory::MemoryKv;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scanbridge_core::OwnerId;

/// Errors from the KV layer.
#[derive(Debug, Error)]
pub enum KvError {
    /// HTTP request to the KV API failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The KV API returned an error response.
    #[error("KV API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The KV API response could not be parsed.
    #[error("KV response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Metadata attached to every card key.
///
/// Inspectable during key enumeration without fetching or deserializing the
/// value, which is what makes owner-filtered scans possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetadata {
    pub owner_id: OwnerId,
}

/// A key name plus its attached metadata, as seen during enumeration.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub name: String,
    pub metadata: Option<KeyMetadata>,
}

/// One page of a key enumeration.
#[derive(Debug, Clone)]
pub struct KeyPage {
    pub keys: Vec<KeyEntry>,
    /// Continuation cursor; always present when `list_complete` is false.
    pub cursor: Option<String>,
    pub list_complete: bool,
}

/// The key-value namespace, dispatching to the configured backend.
#[derive(Clone)]
pub enum KvStore {
    Cloudflare(CloudflareKv),
    Memory(MemoryKv),
}

impl KvStore {
    /// Fetch a value by key. Absent keys are `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `KvError` if the backend request fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match self {
            Self::Cloudflare(kv) => kv.get(key).await,
            Self::Memory(kv) => Ok(kv.get(key).await),
        }
    }

    /// Store a value under a key with attached metadata.
    ///
    /// # Errors
    ///
    /// Returns `KvError` if the backend request fails.
    pub async fn put(&self, key: &str, value: &str, metadata: &KeyMetadata) -> Result<(), KvError> {
        match self {
            Self::Cloudflare(kv) => kv.put(key, value, metadata).await,
            Self::Memory(kv) => {
                kv.put(key, value, metadata).await;
                Ok(())
            }
        }
    }

    /// Delete a key. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `KvError` if the backend request fails.
    pub async fn delete(&self, key: &str) -> Result<(), KvError> {
        match self {
            Self::Cloudflare(kv) => kv.delete(key).await,
            Self::Memory(kv) => {
                kv.delete(key).await;
                Ok(())
            }
        }
    }

    /// Enumerate one page of keys under `prefix`, starting at `cursor`.
    ///
    /// # Errors
    ///
    /// Returns `KvError` if the backend request fails.
    pub async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<KeyPage, KvError> {
        match self {
            Self::Cloudflare(kv) => kv.list(prefix, cursor).await,
            Self::Memory(kv) => Ok(kv.list(prefix, cursor).await),
        }
    }
}
