//! HTTP route handlers.

pub mod cards;

use axum::Router;

use crate::state::AppState;

/// Build the full application router.
pub fn routes() -> Router<AppState> {
    Router::new().merge(cards::router())
}
