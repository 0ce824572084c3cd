//! Progress stream endpoint
//!
//! Serves `text/event-stream` by polling the durable event log. Every event
//! a client sees was committed first, so reconnecting and replaying from
//! ordinal zero always yields the same trace. The stream closes after one
//! terminal event or when the connection exceeds its soft cap.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::Instant;
use tribunal_common::contract::SubmissionResult;
use tribunal_common::{Phase, StreamStatus};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

/// Wire shape of one stream event
#[derive(Debug, Serialize)]
struct StreamPayload {
    status: StreamStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    /// Full result document, attached to the terminal `complete` event
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Box<SubmissionResult>>,
}

/// GET /api/submissions/{id}/stream
pub async fn submission_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Unknown submissions get a 404 instead of an empty stream
    db::submissions::get_submission(&state.db, id)
        .await?
        .ok_or(ApiError::UnknownSubmission(id))?;

    let poll_interval = state.config.stream_poll_interval;
    let deadline = Instant::now() + state.config.stream_max_duration;

    let stream = async_stream::stream! {
        tracing::info!(submission_id = %id, "SSE stream opened");
        let mut last_ordinal: i64 = -1;

        loop {
            let events = match db::events::events_after(&state.db, id, last_ordinal).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(submission_id = %id, error = %e, "Event poll failed; closing stream");
                    return;
                }
            };

            for event in events {
                last_ordinal = event.ordinal;

                let mut payload = StreamPayload {
                    status: event.status,
                    message: event.message,
                    phase: event.phase,
                    progress: event.progress,
                    result: None,
                };

                if event.status == StreamStatus::Complete {
                    match db::submissions::get_submission(&state.db, id).await {
                        Ok(Some(submission)) => {
                            payload.result = submission.result.map(Box::new);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(
                                submission_id = %id,
                                error = %e,
                                "Result fetch for terminal event failed"
                            );
                        }
                    }
                }

                match serde_json::to_string(&payload) {
                    Ok(data) => yield Ok(Event::default().data(data)),
                    Err(e) => {
                        tracing::error!(submission_id = %id, error = %e, "Event serialization failed");
                    }
                }

                if payload.status.is_terminal() {
                    tracing::info!(submission_id = %id, status = %payload.status, "SSE stream finished");
                    return;
                }
            }

            if Instant::now() >= deadline {
                tracing::info!(submission_id = %id, "SSE stream hit its duration cap");
                return;
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
