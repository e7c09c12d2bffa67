//! Core types for ScanBridge.
//!
//! This module provides the card record, type-safe identifier wrappers, and
//! the JSON envelope shared by the HTTP surface and the client.

pub mod card;
pub mod id;
pub mod response;

pub use card::{Card, DEFAULT_COMPANY, DEFAULT_NAME, NewCard};
pub use id::{CardId, OwnerId};
pub use response::{ApiResponse, EmptyResponse};
