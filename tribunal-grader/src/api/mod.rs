//! HTTP API handlers

pub mod health;
pub mod problems;
pub mod stream;
pub mod submissions;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// Submission routes: intake, result, progress stream
pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/api/submissions", post(submissions::create_submission))
        .route("/api/submissions/:id", get(submissions::get_submission_result))
        .route("/api/submissions/:id/stream", get(stream::submission_stream))
}

/// Read-only problem catalog routes
pub fn problem_routes() -> Router<AppState> {
    Router::new()
        .route("/api/problems", get(problems::list_problems))
        .route("/api/problems/:id", get(problems::get_problem))
}

/// Health check route
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}
