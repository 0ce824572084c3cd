//! tribunal-grader - Interview grading service
//!
//! Accepts submission bundles (canvas snapshots, optional audio, phase
//! timings), transcribes the audio, drives a panel of LLM evaluators and
//! synthesis stages through a single-writer pipeline, persists every
//! progress event for replay, and serves the contract-exact result.

pub mod agents;
pub mod api;
pub mod compat;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod transcription;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use tribunal_common::config::Config;

use crate::pipeline::GradingDriver;
use crate::storage::ArtifactStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Process-wide configuration, resolved once at startup
    pub config: Arc<Config>,
    /// Artifact blob store rooted at the upload directory
    pub storage: ArtifactStore,
    /// The grading pipeline driver
    pub driver: Arc<GradingDriver>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: Arc<Config>,
        storage: ArtifactStore,
        driver: Arc<GradingDriver>,
    ) -> Self {
        Self {
            db,
            config,
            storage,
            driver,
        }
    }
}

/// Build application router
///
/// Routes:
/// - POST /api/submissions - multipart submission intake
/// - GET  /api/submissions/:id - final result (404 until complete)
/// - GET  /api/submissions/:id/stream - SSE progress stream
/// - GET  /api/problems, /api/problems/:id - problem catalog
/// - GET  /health - health check
pub fn build_router(state: AppState) -> Router {
    // Four canvases plus four recordings can arrive in one body
    let body_limit = (state.config.max_upload_bytes() as usize).saturating_mul(9);

    let cors = match state.config.frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(
                origin = %state.config.frontend_origin,
                "Invalid frontend origin; falling back to permissive CORS"
            );
            CorsLayer::permissive()
        }
    };

    Router::new()
        .merge(api::submission_routes())
        .merge(api::problem_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}
