//! Cloudflare Workers KV REST client.
//!
//! Talks to the namespace at
//! `/accounts/{account_id}/storage/kv/namespaces/{namespace_id}` with a
//! bearer token. Values are written together with their metadata in one
//! multipart `PUT`; key enumeration returns metadata alongside each key name
//! plus a continuation cursor (empty cursor means the listing is complete).
//!
//! The namespace is eventually consistent: a `list` immediately after a
//! `put` may not see the new key yet. Callers own that trade-off.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::config::CloudflareKvConfig;

use super::{KeyEntry, KeyMetadata, KeyPage, KvError};

/// Cloudflare API base URL.
const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Keys fetched per list request (Cloudflare's maximum).
const LIST_PAGE_LIMIT: u32 = 1000;

/// Client for one Cloudflare Workers KV namespace.
#[derive(Clone)]
pub struct CloudflareKv {
    client: reqwest::Client,
    namespace_url: String,
}

impl CloudflareKv {
    /// Create a client for the configured namespace.
    ///
    /// # Errors
    ///
    /// Returns `KvError::Api` if the API token is not a valid header value,
    /// or `KvError::Http` if the HTTP client fails to build.
    pub fn new(config: &CloudflareKvConfig) -> Result<Self, KvError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value).map_err(|e| KvError::Api {
            status: 0,
            message: format!("invalid API token format: {e}"),
        })?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        let namespace_url = format!(
            "{API_BASE}/accounts/{}/storage/kv/namespaces/{}",
            config.account_id, config.namespace_id
        );

        Ok(Self {
            client,
            namespace_url,
        })
    }

    fn value_url(&self, key: &str) -> String {
        format!("{}/values/{}", self.namespace_url, urlencoding::encode(key))
    }

    /// Fetch the raw value stored under `key`.
    pub(super) async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let response = self.client.get(self.value_url(key)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        Ok(Some(response.text().await?))
    }

    /// Write `value` under `key` with attached metadata.
    pub(super) async fn put(
        &self,
        key: &str,
        value: &str,
        metadata: &KeyMetadata,
    ) -> Result<(), KvError> {
        let metadata_json = serde_json::to_string(metadata)?;
        let form = reqwest::multipart::Form::new()
            .text("value", value.to_owned())
            .text("metadata", metadata_json);

        let response = self
            .client
            .put(self.value_url(key))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        debug!(key, "KV put ok");
        Ok(())
    }

    /// Delete `key`. A 404 is treated as success so deletes stay idempotent.
    pub(super) async fn delete(&self, key: &str) -> Result<(), KvError> {
        let response = self.client.delete(self.value_url(key)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        Ok(())
    }

    /// Enumerate one page of keys under `prefix`.
    pub(super) async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<KeyPage, KvError> {
        let mut request = self
            .client
            .get(format!("{}/keys", self.namespace_url))
            .query(&[("prefix", prefix)])
            .query(&[("limit", LIST_PAGE_LIMIT)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        let body: ListResponse = serde_json::from_str(&response.text().await?)?;
        if !body.success {
            let message = body
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(api_error(status, message));
        }

        let keys = body
            .result
            .into_iter()
            .map(|k| KeyEntry {
                name: k.name,
                metadata: k.metadata,
            })
            .collect();

        // An absent or empty cursor marks the end of the listing.
        let cursor = body
            .result_info
            .and_then(|info| info.cursor)
            .filter(|c| !c.is_empty());
        let list_complete = cursor.is_none();

        Ok(KeyPage {
            keys,
            cursor,
            list_complete,
        })
    }
}

fn api_error(status: StatusCode, message: String) -> KvError {
    KvError::Api {
        status: status.as_u16(),
        message: message.chars().take(500).collect(),
    }
}

/// Response body of the list-keys endpoint.
#[derive(Debug, Deserialize)]
struct ListResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Vec<ListKey>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListKey {
    name: String,
    // Metadata deserialization is lenient: keys written without an ownerId
    // (or with unrelated metadata) simply don't match any owner filter.
    #[serde(default, deserialize_with = "lenient_metadata")]
    metadata: Option<KeyMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    cursor: Option<String>,
}

/// Deserialize metadata as `None` when it doesn't match the expected shape.
fn lenient_metadata<'de, D>(deserializer: D) -> Result<Option<KeyMetadata>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_parses_metadata() {
        let body = r#"{
            "success": true,
            "errors": [],
            "result": [
                {"name": "card:a", "metadata": {"ownerId": "owner-1"}},
                {"name": "card:b"},
                {"name": "card:c", "metadata": {"unrelated": true}}
            ],
            "result_info": {"count": 3, "cursor": ""}
        }"#;

        let parsed: ListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.result.len(), 3);
        assert_eq!(
            parsed.result[0].metadata.as_ref().unwrap().owner_id.as_str(),
            "owner-1"
        );
        assert!(parsed.result[1].metadata.is_none());
        assert!(parsed.result[2].metadata.is_none());
    }

    #[test]
    fn test_empty_cursor_means_complete() {
        let info = ResultInfo {
            cursor: Some(String::new()),
        };
        let cursor = info.cursor.filter(|c| !c.is_empty());
        assert!(cursor.is_none());
    }
}
