//! Error types for tribunal-grader
//!
//! `ApiError` covers the handful of ways an HTTP request can fail against
//! this service: the looked-up problem or submission does not exist, the
//! result is not ready yet (a 404 by design; the stream is how progress is
//! observed), or one of the intake fields failed validation. `PipelineError`
//! is the typed stage failure surfaced to the driver; its `Display` strings
//! are the stable reason tags recorded verbatim in terminal events. Error
//! codes on the wire use the same lowercase tag convention.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tribunal_common::Phase;
use uuid::Uuid;

/// Errors returned by the HTTP surface
#[derive(Debug, Error)]
pub enum ApiError {
    /// The referenced problem is not in the catalog
    #[error("problem '{0}' is not in the catalog")]
    UnknownProblem(String),

    /// No submission with this id exists
    #[error("submission '{0}' does not exist")]
    UnknownSubmission(Uuid),

    /// The submission exists but grading has not completed
    #[error("submission '{0}' has no result yet; follow its stream for progress")]
    ResultNotReady(Uuid),

    /// One intake field failed validation
    #[error("invalid '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// The multipart body itself could not be read
    #[error("unreadable submission form: {0}")]
    MalformedForm(String),

    /// Registry, storage, or event-log failure behind a handler
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::UnknownProblem(_) => (StatusCode::NOT_FOUND, "unknown_problem"),
            ApiError::UnknownSubmission(_) => (StatusCode::NOT_FOUND, "unknown_submission"),
            ApiError::ResultNotReady(_) => (StatusCode::NOT_FOUND, "result_not_ready"),
            ApiError::InvalidField { .. } => (StatusCode::BAD_REQUEST, "invalid_field"),
            ApiError::MalformedForm(_) => (StatusCode::BAD_REQUEST, "malformed_form"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Wire shape of an error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        }
        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Typed stage failure surfaced to the pipeline driver.
///
/// The `Display` form of each variant is the reason tag written into the
/// terminal `failed` event, so clients and operators see a stable string.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A transcription provider call failed for one phase
    #[error("transcription_failed: {phase}")]
    TranscriptionFailed {
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// The transcription stage exceeded its overall budget
    #[error("transcription_timeout")]
    TranscriptionTimeout,

    /// An LLM stage errored, returned unparseable JSON, or violated its
    /// output contract
    #[error("agent_execution_failed: {stage}")]
    AgentExecutionFailed {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// A scratch slot expected to be filled by a prior stage was empty
    #[error("missing_phase_output: {phase}")]
    MissingPhaseOutput { phase: Phase },

    /// The contract guard could not validate or repair the final result
    #[error("contract_violation: {field}")]
    ContractViolation { field: String },

    /// The end-to-end pipeline budget was exceeded
    #[error("pipeline_timeout")]
    PipelineTimeout,

    /// A cooperative cancellation request was honored
    #[error("cancelled")]
    Cancelled,

    /// A registry/event-log/result-cache write failed before commit
    #[error("persistence_failed: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn agent(stage: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        PipelineError::AgentExecutionFailed {
            stage: stage.into(),
            source: source.into(),
        }
    }
}
