//! The JSON envelope wrapping every API response.

use serde::{Deserialize, Serialize};

/// Standard `{success, data?|error?}` envelope.
///
/// Success responses carry `data`; failures carry a user-facing `error`
/// message. Shared between the server (serialization) and the client
/// (deserialization) so the contract cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload in a success envelope.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Build a failure envelope with a user-facing message.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Success envelope with no payload (e.g. delete).
pub type EmptyResponse = ApiResponse<()>;

impl ApiResponse<()> {
    /// Success envelope carrying no data at all.
    #[must_use]
    pub const fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}
