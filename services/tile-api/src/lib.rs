//! TMS tile API service library.
//!
//! The binary in `main.rs` wires this up behind a CLI; the library split
//! exists so integration tests can drive the router directly.

pub mod config;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Builds the service router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tms/:layer/:z/:x/:y", get(handlers::tile_handler))
        .route("/layers", post(handlers::submit_layer_handler))
        .route("/jobs/:id", get(handlers::job_status_handler))
        .route("/health", get(handlers::health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
