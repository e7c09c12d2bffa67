//! Card API handlers.
//!
//! Implements the `/api/cards` surface: create, public get, owner-scoped
//! list, and ownership-checked delete. Every response is wrapped in the
//! `{success, data?|error?}` envelope.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use scanbridge_core::{ApiResponse, Card, CardId, EmptyResponse, NewCard, OwnerId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Build the cards router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cards", get(list_cards).post(create_card))
        .route("/api/cards/{id}", get(get_card).delete(delete_card))
}

/// Owner token passed as a query parameter.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerQuery {
    owner_id: Option<String>,
}

impl OwnerQuery {
    fn owner_id(self) -> Option<OwnerId> {
        self.owner_id.filter(|s| !s.is_empty()).map(OwnerId::new)
    }
}

/// `POST /api/cards` - create a card.
///
/// # Errors
///
/// 400 on a missing/unreadable body or missing fields, 413 on an oversized
/// image, 403 at the quota, 500 on store failure.
async fn create_card(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewCard>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Card>>)> {
    let Json(new) = body.map_err(|_| AppError::BadRequest("Missing required fields".to_owned()))?;
    let card = state.store().create(new).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(card))))
}

/// `GET /api/cards/{id}` - fetch a card.
///
/// Public by design: shareable links must resolve without an owner token.
///
/// # Errors
///
/// 404 when absent or unreadable, 500 on store failure.
async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Card>>> {
    let card = state.store().get(&CardId::new(id)).await?;
    Ok(Json(ApiResponse::ok(card)))
}

/// `GET /api/cards?ownerId=` - list an owner's cards, newest first.
///
/// # Errors
///
/// 400 when `ownerId` is missing, 500 on store failure.
async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<Vec<Card>>>> {
    let owner_id = query
        .owner_id()
        .ok_or_else(|| AppError::BadRequest("ownerId is required".to_owned()))?;
    let cards = state.store().list_by_owner(&owner_id).await?;
    Ok(Json(ApiResponse::ok(cards)))
}

/// `DELETE /api/cards/{id}?ownerId=` - delete an owned card.
///
/// Deleting a card that is already gone succeeds, so a double-tap never
/// surfaces an error.
///
/// # Errors
///
/// 401 without an owner token, 403 on an ownership mismatch, 500 on store
/// failure.
async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<EmptyResponse>> {
    let owner_id = query.owner_id().ok_or(AppError::Unauthorized)?;
    state.store().delete(&CardId::new(id), &owner_id).await?;
    Ok(Json(EmptyResponse::ok_empty()))
}
