//! In-memory KV fallback.
//!
//! Used when no Cloudflare credentials are configured. State lives in this
//! process only - nothing survives a restart and nothing is shared across
//! instances, so this backend is for local development and tests, never a
//! source of truth.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{KeyEntry, KeyMetadata, KeyPage};

/// Listing page size. Kept small enough to be overridable in tests so the
/// cursor-draining paths actually see multiple pages.
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    metadata: KeyMetadata,
}

/// Process-scoped KV map with the same pagination contract as the durable
/// namespace.
#[derive(Clone)]
pub struct MemoryKv {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
    page_size: usize,
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKv {
    /// Create an empty in-memory namespace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a namespace whose listings page at `page_size` keys.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: page_size.max(1),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).map(|e| e.value.clone())
    }

    pub async fn put(&self, key: &str, value: &str, metadata: &KeyMetadata) {
        self.entries.write().await.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                metadata: metadata.clone(),
            },
        );
    }

    pub async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Enumerate one page of keys under `prefix` in lexicographic order.
    ///
    /// The cursor is the last key name of the previous page; listing resumes
    /// strictly after it, mirroring an opaque continuation token.
    pub async fn list(&self, prefix: &str, cursor: Option<&str>) -> KeyPage {
        let entries = self.entries.read().await;

        let mut keys: Vec<KeyEntry> = Vec::with_capacity(self.page_size);
        let mut remaining = false;
        for (name, entry) in entries.range(prefix.to_owned()..) {
            if !name.starts_with(prefix) {
                break;
            }
            if let Some(cursor) = cursor
                && name.as_str() <= cursor
            {
                continue;
            }
            if keys.len() == self.page_size {
                remaining = true;
                break;
            }
            keys.push(KeyEntry {
                name: name.clone(),
                metadata: Some(entry.metadata.clone()),
            });
        }

        let cursor = if remaining {
            keys.last().map(|k| k.name.clone())
        } else {
            None
        };

        KeyPage {
            list_complete: cursor.is_none(),
            keys,
            cursor,
        }
    }

    /// Number of stored keys, for test assertions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the namespace is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
