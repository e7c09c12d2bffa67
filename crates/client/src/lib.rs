//! Caching API client for the card service.
//!
//! The sync layer between a UI and the card store: results are cached for
//! five minutes and invalidated on mutation, so repeat renders don't re-scan
//! the namespace. The cache is advisory - the store stays the source of
//! truth, and a stale read is at worst five minutes old.
//!
//! # Example
//!
//! ```rust,ignore
//! use scanbridge_client::CardsClient;
//! use scanbridge_core::{NewCard, OwnerId};
//!
//! let client = CardsClient::new("http://localhost:3000", OwnerId::new(owner));
//!
//! let card = client.create_card(NewCard {
//!     name: Some("Ana".into()),
//!     company: Some("Acme".into()),
//!     image_data: Some(image),
//!     owner_id: None, // filled in from the client's owner
//! }).await?;
//!
//! let mine = client.list_cards().await?;
//! client.delete_card(&card.id).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::debug;

use scanbridge_core::{ApiResponse, Card, CardId, NewCard, OwnerId};

/// How long list and card reads stay fresh.
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Errors from the card API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a failure envelope.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered success without the expected payload.
    #[error("API response missing data")]
    MissingData,
}

/// Cache key for card reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Card(CardId),
    OwnerCards,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Card(Box<Card>),
    Cards(Vec<Card>),
}

/// Client for the card service, scoped to one owner.
///
/// Cheaply cloneable; all clones share the HTTP connection pool and cache.
#[derive(Clone)]
pub struct CardsClient {
    inner: Arc<CardsClientInner>,
}

struct CardsClientInner {
    client: reqwest::Client,
    base_url: String,
    owner_id: OwnerId,
    cache: Cache<CacheKey, CacheValue>,
}

impl CardsClient {
    /// Create a client for the card service at `base_url`, acting as
    /// `owner_id`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, owner_id: OwnerId) -> Self {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(CardsClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_owned(),
                owner_id,
                cache,
            }),
        }
    }

    /// The owner this client acts as.
    #[must_use]
    pub fn owner_id(&self) -> &OwnerId {
        &self.inner.owner_id
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/cards{path}", self.inner.base_url)
    }

    /// List this owner's cards, newest first. Cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request or the API fails.
    pub async fn list_cards(&self) -> Result<Vec<Card>, ClientError> {
        if let Some(CacheValue::Cards(cards)) = self.inner.cache.get(&CacheKey::OwnerCards).await {
            debug!("cache hit for card list");
            return Ok(cards);
        }

        let response = self
            .inner
            .client
            .get(self.api_url(""))
            .query(&[("ownerId", self.inner.owner_id.as_str())])
            .send()
            .await?;
        let cards: Vec<Card> = unwrap_envelope(response).await?;

        self.inner
            .cache
            .insert(CacheKey::OwnerCards, CacheValue::Cards(cards.clone()))
            .await;
        Ok(cards)
    }

    /// Fetch any card by id (shared links are public). Cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request or the API fails, including a
    /// 404 for unknown ids.
    pub async fn get_card(&self, id: &CardId) -> Result<Card, ClientError> {
        let key = CacheKey::Card(id.clone());
        if let Some(CacheValue::Card(card)) = self.inner.cache.get(&key).await {
            debug!("cache hit for card");
            return Ok(*card);
        }

        let response = self
            .inner
            .client
            .get(self.api_url(&format!("/{id}")))
            .send()
            .await?;
        let card: Card = unwrap_envelope(response).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Card(Box::new(card.clone())))
            .await;
        Ok(card)
    }

    /// Create a card for this owner and invalidate the cached list.
    ///
    /// Whatever `owner_id` the caller put in `new` is replaced with this
    /// client's owner.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request or the API fails (missing
    /// fields, oversized image, quota).
    pub async fn create_card(&self, new: NewCard) -> Result<Card, ClientError> {
        let body = NewCard {
            owner_id: Some(self.inner.owner_id.as_str().to_owned()),
            ..new
        };

        let response = self
            .inner
            .client
            .post(self.api_url(""))
            .json(&body)
            .send()
            .await?;
        let card: Card = unwrap_envelope(response).await?;

        self.inner.cache.invalidate(&CacheKey::OwnerCards).await;
        Ok(card)
    }

    /// Delete one of this owner's cards and invalidate its cache entries.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request or the API fails (foreign cards
    /// come back as a 403).
    pub async fn delete_card(&self, id: &CardId) -> Result<(), ClientError> {
        let response = self
            .inner
            .client
            .delete(self.api_url(&format!("/{id}")))
            .query(&[("ownerId", self.inner.owner_id.as_str())])
            .send()
            .await?;
        check_envelope(response).await?;

        self.inner.cache.invalidate(&CacheKey::OwnerCards).await;
        self.inner.cache.invalidate(&CacheKey::Card(id.clone())).await;
        Ok(())
    }
}

/// Parse a response envelope and extract its payload.
async fn unwrap_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status().as_u16();
    let envelope: ApiResponse<T> = response.json().await?;

    if !envelope.success {
        return Err(ClientError::Api {
            status,
            message: envelope
                .error
                .unwrap_or_else(|| "unknown error".to_owned()),
        });
    }
    envelope.data.ok_or(ClientError::MissingData)
}

/// Parse a response envelope that carries no payload.
async fn check_envelope(response: reqwest::Response) -> Result<(), ClientError> {
    let status = response.status().as_u16();
    let envelope: ApiResponse<serde_json::Value> = response.json().await?;

    if !envelope.success {
        return Err(ClientError::Api {
            status,
            message: envelope
                .error
                .unwrap_or_else(|| "unknown error".to_owned()),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_cleanly() {
        let client = CardsClient::new("http://localhost:3000/", OwnerId::new("o1"));
        assert_eq!(client.api_url(""), "http://localhost:3000/api/cards");
        assert_eq!(
            client.api_url("/abc"),
            "http://localhost:3000/api/cards/abc"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 403,
            message: "Límite de 10 tarjetas alcanzado".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "API error (403): Límite de 10 tarjetas alcanzado"
        );
    }
}
