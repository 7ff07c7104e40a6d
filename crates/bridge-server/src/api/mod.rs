//! HTTP surface over the session registry.
//!
//! ```text
//! POST   /sessions/{platform}      start a session
//! GET    /sessions                 list sessions
//! GET    /sessions/{id}/credential current login prompt as a PNG data URL
//! GET    /sessions/{id}/status     poll login progress
//! GET    /sessions/{id}/items      recent conversations (?filter=&limit=)
//! DELETE /sessions/{id}            close a session
//! GET    /health                   liveness
//! ```

mod error;
mod handlers;

pub use error::ApiError;

use crate::session::SessionRegistry;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
pub type AppState = Arc<SessionRegistry>;

/// Build the application router.
pub fn router(registry: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sessions", get(handlers::list))
        .route(
            "/sessions/{id}",
            post(handlers::start).delete(handlers::close),
        )
        .route("/sessions/{id}/credential", get(handlers::credential))
        .route("/sessions/{id}/status", get(handlers::status))
        .route("/sessions/{id}/items", get(handlers::items))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}
