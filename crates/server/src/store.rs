//! The card store.
//!
//! Persists [`Card`] records in the KV namespace under `card:<id>` with
//! `{ownerId}` attached as key metadata. The namespace has no secondary
//! index: owner-scoped counting and listing are full metadata-filtered
//! scans, draining every cursor page before concluding. That makes them
//! O(total cards in the namespace) - an accepted trade-off at this volume.
//!
//! The quota check and the subsequent write are not transactional; two
//! concurrent creates near the limit can both pass the count and briefly
//! exceed it. The KV store offers no compare-and-swap, so this race is
//! accepted and documented rather than papered over.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use scanbridge_core::{Card, CardId, DEFAULT_COMPANY, DEFAULT_NAME, NewCard, OwnerId};

use crate::kv::{KeyMetadata, KvError, KvStore};

/// Namespace prefix for card keys.
const KEY_PREFIX: &str = "card:";

/// How many times a colliding id is regenerated before giving up.
const ID_PROBE_ATTEMPTS: u32 = 5;

/// Errors from card store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `imageData` or `ownerId` missing or empty on create.
    #[error("missing required fields")]
    MissingFields,

    /// Encoded image payload exceeds the configured maximum.
    #[error("image payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// Owner already holds the maximum number of cards.
    #[error("owner has reached the limit of {limit} cards")]
    QuotaExceeded { limit: usize },

    /// No card under that id (or the stored record is unreadable).
    #[error("card not found")]
    NotFound,

    /// The card belongs to a different owner.
    #[error("card belongs to a different owner")]
    Forbidden,

    /// A card failed to serialize; indicates a bug, surfaced as internal.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The underlying KV namespace failed.
    #[error("KV error: {0}")]
    Kv(#[from] KvError),
}

/// Durable, quota-enforced, ownership-scoped persistence of cards.
#[derive(Clone)]
pub struct CardStore {
    kv: KvStore,
    max_image_bytes: usize,
    card_limit: usize,
}

impl CardStore {
    /// Create a store over the given namespace with configured limits.
    #[must_use]
    pub fn new(kv: KvStore, max_image_bytes: usize, card_limit: usize) -> Self {
        Self {
            kv,
            max_image_bytes,
            card_limit,
        }
    }

    fn key(id: &CardId) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Create a card.
    ///
    /// Validates presence and payload size, enforces the per-owner quota via
    /// a full metadata scan, generates a collision-probed id, applies the
    /// placeholder defaults, and commits the JSON-encoded card with
    /// `{ownerId}` metadata. A best-effort read-back follows the write;
    /// a miss there is logged, not fatal.
    ///
    /// # Errors
    ///
    /// `MissingFields`, `PayloadTooLarge`, `QuotaExceeded`, or a KV error.
    pub async fn create(&self, new: NewCard) -> Result<Card, StoreError> {
        let image_data = new
            .image_data
            .filter(|s| !s.is_empty())
            .ok_or(StoreError::MissingFields)?;
        let owner_id = new
            .owner_id
            .filter(|s| !s.is_empty())
            .map(OwnerId::new)
            .ok_or(StoreError::MissingFields)?;

        if image_data.len() > self.max_image_bytes {
            return Err(StoreError::PayloadTooLarge {
                size: image_data.len(),
                max: self.max_image_bytes,
            });
        }

        let count = self.count_for_owner(&owner_id).await?;
        debug!(owner = %owner_id, count, "quota scan complete");
        if count >= self.card_limit {
            return Err(StoreError::QuotaExceeded {
                limit: self.card_limit,
            });
        }

        let id = self.generate_id().await?;
        let card = Card {
            id,
            name: non_empty_or(new.name, DEFAULT_NAME),
            company: non_empty_or(new.company, DEFAULT_COMPANY),
            image_data,
            owner_id: owner_id.clone(),
            created_at: Utc::now().timestamp_millis(),
        };

        let key = Self::key(&card.id);
        let value = serde_json::to_string(&card)?;
        self.kv.put(&key, &value, &KeyMetadata { owner_id }).await?;

        // Read back to catch writes the store accepted but dropped. The KV
        // namespace is eventually consistent, so a miss here is suspicious
        // but not proof of loss.
        match self.kv.get(&key).await {
            Ok(Some(_)) => debug!(card = %card.id, "post-write verification ok"),
            Ok(None) => warn!(card = %card.id, "post-write verification missed the new card"),
            Err(e) => warn!(card = %card.id, error = %e, "post-write verification failed"),
        }

        Ok(card)
    }

    /// Fetch a card by id. Public: no ownership check, shareable by design.
    ///
    /// # Errors
    ///
    /// `NotFound` when the key is absent or the stored record is corrupt;
    /// KV errors otherwise.
    pub async fn get(&self, id: &CardId) -> Result<Card, StoreError> {
        let value = self
            .kv
            .get(&Self::key(id))
            .await?
            .ok_or(StoreError::NotFound)?;

        serde_json::from_str(&value).map_err(|e| {
            warn!(card = %id, error = %e, "stored card is corrupt");
            StoreError::NotFound
        })
    }

    /// List all of an owner's cards, newest first.
    ///
    /// Scans the whole card namespace, draining every cursor page, and
    /// fetches each key whose metadata matches the owner. Corrupt records
    /// are skipped with a warning so one bad value never breaks the list.
    ///
    /// # Errors
    ///
    /// Returns a KV error if any page or value fetch fails.
    pub async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Card>, StoreError> {
        let mut cards = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.kv.list(KEY_PREFIX, cursor.as_deref()).await?;
            for entry in &page.keys {
                if !entry
                    .metadata
                    .as_ref()
                    .is_some_and(|m| &m.owner_id == owner_id)
                {
                    continue;
                }
                // A key can vanish between the listing and the fetch;
                // skip it like any other non-match.
                let Some(value) = self.kv.get(&entry.name).await? else {
                    continue;
                };
                match serde_json::from_str::<Card>(&value) {
                    Ok(card) => cards.push(card),
                    Err(e) => warn!(key = %entry.name, error = %e, "skipping corrupt card"),
                }
            }
            if page.list_complete {
                break;
            }
            cursor = page.cursor;
        }

        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cards)
    }

    /// Delete a card, checking ownership first.
    ///
    /// Deleting a card that does not exist succeeds silently - the delete is
    /// idempotent so a double-tap never surfaces a spurious error.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the card exists but belongs to someone else; KV
    /// errors otherwise.
    pub async fn delete(&self, id: &CardId, owner_id: &OwnerId) -> Result<(), StoreError> {
        let key = Self::key(id);

        if let Some(value) = self.kv.get(&key).await? {
            match serde_json::from_str::<Card>(&value) {
                Ok(card) if &card.owner_id != owner_id => return Err(StoreError::Forbidden),
                Ok(_) => {}
                // A corrupt record has no verifiable owner; deleting it is
                // the only way it ever gets cleaned up.
                Err(e) => warn!(card = %id, error = %e, "deleting corrupt card"),
            }
        }

        self.kv.delete(&key).await?;
        Ok(())
    }

    /// Count an owner's cards via a full metadata scan.
    ///
    /// # Errors
    ///
    /// Returns a KV error if any page fetch fails.
    pub async fn count_for_owner(&self, owner_id: &OwnerId) -> Result<usize, StoreError> {
        let mut count = 0;
        let mut cursor: Option<String> = None;

        loop {
            let page = self.kv.list(KEY_PREFIX, cursor.as_deref()).await?;
            count += page
                .keys
                .iter()
                .filter(|k| {
                    k.metadata
                        .as_ref()
                        .is_some_and(|m| &m.owner_id == owner_id)
                })
                .count();
            if page.list_complete {
                break;
            }
            cursor = page.cursor;
        }

        Ok(count)
    }

    /// Probe the namespace, for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the namespace is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.kv.list(KEY_PREFIX, None).await?;
        Ok(())
    }

    /// Generate a fresh card id, probing the namespace for collisions.
    ///
    /// UUID v4 collisions are astronomically unlikely; the probe is a
    /// defensive belt, not a correctness guarantee. After exhausting the
    /// attempts the last id is used anyway, with a warning.
    async fn generate_id(&self) -> Result<CardId, StoreError> {
        let mut id = Uuid::new_v4().to_string();

        for attempt in 1..=ID_PROBE_ATTEMPTS {
            if self.kv.get(&format!("{KEY_PREFIX}{id}")).await?.is_none() {
                return Ok(CardId::new(id));
            }
            warn!(attempt, "card id collision, regenerating");
            id = Uuid::new_v4().to_string();
        }

        warn!("id collision probing exhausted, proceeding with unprobed id");
        Ok(CardId::new(id))
    }
}

/// Apply a placeholder default to an absent or empty display field.
fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use crate::kv::MemoryKv;

    use super::*;

    const MAX_IMAGE_BYTES: usize = 2_097_152;
    const CARD_LIMIT: usize = 10;

    fn memory_store() -> CardStore {
        CardStore::new(
            KvStore::Memory(MemoryKv::new()),
            MAX_IMAGE_BYTES,
            CARD_LIMIT,
        )
    }

    /// A store whose listings paginate every 3 keys, so quota and list
    /// scans must drain multiple cursor pages.
    fn paginating_store() -> CardStore {
        CardStore::new(
            KvStore::Memory(MemoryKv::with_page_size(3)),
            MAX_IMAGE_BYTES,
            CARD_LIMIT,
        )
    }

    fn new_card(owner: &str) -> NewCard {
        NewCard {
            name: Some("Ana".to_owned()),
            company: Some("Acme".to_owned()),
            image_data: Some("data:image/webp;base64,Zm9v".to_owned()),
            owner_id: Some(owner.to_owned()),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let store = memory_store();
        let created = store.create(new_card("o1")).await.unwrap();

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_created_ids_are_unique() {
        let store = memory_store();
        let mut ids = HashSet::new();
        for _ in 0..CARD_LIMIT {
            let card = store.create(new_card("o1")).await.unwrap();
            assert!(ids.insert(card.id.into_inner()));
        }
    }

    #[tokio::test]
    async fn test_missing_image_data_is_rejected() {
        let store = memory_store();
        let missing = NewCard {
            image_data: None,
            ..new_card("o1")
        };
        assert!(matches!(
            store.create(missing).await,
            Err(StoreError::MissingFields)
        ));

        let empty = NewCard {
            image_data: Some(String::new()),
            ..new_card("o1")
        };
        assert!(matches!(
            store.create(empty).await,
            Err(StoreError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn test_missing_owner_is_rejected() {
        let store = memory_store();
        let missing = NewCard {
            owner_id: None,
            ..new_card("o1")
        };
        assert!(matches!(
            store.create(missing).await,
            Err(StoreError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_rejected() {
        let store = memory_store();
        let oversized = NewCard {
            image_data: Some("x".repeat(3 * 1024 * 1024)),
            ..new_card("o1")
        };
        assert!(matches!(
            store.create(oversized).await,
            Err(StoreError::PayloadTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_payload_at_exact_limit_is_accepted() {
        let store = memory_store();
        let at_limit = NewCard {
            image_data: Some("x".repeat(MAX_IMAGE_BYTES)),
            ..new_card("o1")
        };
        assert!(store.create(at_limit).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_display_fields_get_placeholders() {
        let store = memory_store();
        let bare = NewCard {
            name: None,
            company: Some(String::new()),
            ..new_card("o1")
        };
        let card = store.create(bare).await.unwrap();
        assert_eq!(card.name, DEFAULT_NAME);
        assert_eq!(card.company, DEFAULT_COMPANY);
    }

    #[tokio::test]
    async fn test_eleventh_card_hits_quota() {
        let store = paginating_store();
        for _ in 0..CARD_LIMIT {
            store.create(new_card("o1")).await.unwrap();
        }

        assert!(matches!(
            store.create(new_card("o1")).await,
            Err(StoreError::QuotaExceeded { limit: CARD_LIMIT })
        ));

        // The failed create must not have persisted anything.
        let owner = OwnerId::new("o1");
        assert_eq!(store.count_for_owner(&owner).await.unwrap(), CARD_LIMIT);
    }

    #[tokio::test]
    async fn test_quota_is_per_owner() {
        let store = memory_store();
        for _ in 0..CARD_LIMIT {
            store.create(new_card("o1")).await.unwrap();
        }

        // A different owner is unaffected.
        assert!(store.create(new_card("o2")).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_by_owner_is_scoped_and_newest_first() {
        let store = paginating_store();
        let mut created = Vec::new();
        for _ in 0..5 {
            created.push(store.create(new_card("o1")).await.unwrap());
        }
        store.create(new_card("o2")).await.unwrap();

        let listed = store.list_by_owner(&OwnerId::new("o1")).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|c| c.owner_id == OwnerId::new("o1")));
        assert!(
            listed
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at)
        );
    }

    #[tokio::test]
    async fn test_list_for_unknown_owner_is_empty() {
        let store = memory_store();
        store.create(new_card("o1")).await.unwrap();

        let listed = store.list_by_owner(&OwnerId::new("nobody")).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_card_is_not_found() {
        let store = memory_store();
        assert!(matches!(
            store.get(&CardId::new("missing")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_as_not_found_and_skips_in_list() {
        let kv = MemoryKv::new();
        let store = CardStore::new(KvStore::Memory(kv.clone()), MAX_IMAGE_BYTES, CARD_LIMIT);

        let owner = OwnerId::new("o1");
        kv.put(
            "card:broken",
            "not json",
            &KeyMetadata {
                owner_id: owner.clone(),
            },
        )
        .await;
        store.create(new_card("o1")).await.unwrap();

        assert!(matches!(
            store.get(&CardId::new("broken")).await,
            Err(StoreError::NotFound)
        ));

        // One bad record must not break the owner's listing.
        let listed = store.list_by_owner(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_owner_removes_card() {
        let store = memory_store();
        let card = store.create(new_card("o1")).await.unwrap();

        store.delete(&card.id, &OwnerId::new("o1")).await.unwrap();
        assert!(matches!(
            store.get(&card.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_by_other_owner_is_forbidden() {
        let store = memory_store();
        let card = store.create(new_card("o1")).await.unwrap();

        assert!(matches!(
            store.delete(&card.id, &OwnerId::new("intruder")).await,
            Err(StoreError::Forbidden)
        ));

        // The card is still retrievable by everyone.
        assert!(store.get(&card.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_card_is_silent_success() {
        let store = memory_store();
        store
            .delete(&CardId::new("never-existed"), &OwnerId::new("o1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_count_drains_all_pages() {
        let store = paginating_store();
        for _ in 0..7 {
            store.create(new_card("o1")).await.unwrap();
        }

        // 7 cards across page size 3 means three pages; a partial scan
        // would undercount.
        let count = store.count_for_owner(&OwnerId::new("o1")).await.unwrap();
        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn test_ping_succeeds_on_empty_namespace() {
        let store = memory_store();
        store.ping().await.unwrap();
    }
}
