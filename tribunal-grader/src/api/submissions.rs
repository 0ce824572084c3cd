//! Submission intake and result endpoints
//!
//! Intake accepts a multipart form with four canvas snapshots (required),
//! up to four audio recordings, and a `phase_times` JSON object with
//! exactly the four phase keys. Validation failures reject the request
//! before any row or file is written. On accept, the grading driver is
//! scheduled in the background and the submission id returned.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use tribunal_common::contract::SubmissionResult;
use tribunal_common::{Phase, StreamStatus, PHASE_ORDER};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{PhaseArtifact, SubmissionStatus};
use crate::storage::{is_audio_mime, is_canvas_mime};
use crate::{db, AppState};

#[derive(Debug, Serialize)]
pub struct CreateSubmissionResponse {
    pub submission_id: Uuid,
}

/// One uploaded file with its declared content type
struct Upload {
    mime: String,
    bytes: Vec<u8>,
}

/// Parsed multipart form before validation
#[derive(Default)]
struct IntakeForm {
    problem_id: Option<String>,
    phase_times: Option<String>,
    canvases: BTreeMap<Phase, Upload>,
    audio: BTreeMap<Phase, Upload>,
}

/// POST /api/submissions
pub async fn create_submission(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<CreateSubmissionResponse>> {
    let form = read_form(multipart, state.config.max_upload_bytes()).await?;

    let problem_id = form
        .problem_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid_field("problem_id", "required"))?;

    let phase_times = form
        .phase_times
        .as_deref()
        .ok_or_else(|| ApiError::invalid_field("phase_times", "required"))
        .and_then(|raw| {
            parse_phase_times(raw).map_err(|reason| ApiError::invalid_field("phase_times", reason))
        })?;

    // Unknown problem: reject before creating anything
    let problem = db::problems::get_problem(&state.db, problem_id)
        .await?
        .ok_or_else(|| ApiError::UnknownProblem(problem_id.to_string()))?;

    for phase in PHASE_ORDER {
        let canvas = form
            .canvases
            .get(&phase)
            .ok_or_else(|| ApiError::invalid_field(format!("canvas_{phase}"), "required"))?;
        if canvas.bytes.is_empty() {
            return Err(ApiError::invalid_field(format!("canvas_{phase}"), "empty file"));
        }
        if !is_canvas_mime(&canvas.mime) {
            return Err(ApiError::invalid_field(
                format!("canvas_{phase}"),
                format!("must be image/png or image/jpeg, got '{}'", canvas.mime),
            ));
        }
    }
    for (phase, upload) in &form.audio {
        if !is_audio_mime(&upload.mime) {
            return Err(ApiError::invalid_field(
                format!("audio_{phase}"),
                format!("unsupported audio type '{}'", upload.mime),
            ));
        }
    }

    // Accepted: persist files, rows, and the queued event, then schedule
    let submission_id = Uuid::new_v4();
    db::submissions::create_submission(&state.db, submission_id, &problem.id, &phase_times)
        .await?;

    for phase in PHASE_ORDER {
        let canvas = &form.canvases[&phase];
        let canvas_url = state
            .storage
            .store_canvas(submission_id, phase, &canvas.mime, &canvas.bytes)
            .await?;

        let (audio_url, audio_mime) = match form.audio.get(&phase) {
            Some(upload) if !upload.bytes.is_empty() => {
                let url = state
                    .storage
                    .store_audio(submission_id, phase, &upload.mime, &upload.bytes)
                    .await?;
                (Some(url), Some(upload.mime.clone()))
            }
            _ => (None, None),
        };

        db::artifacts::insert_artifact(
            &state.db,
            submission_id,
            &PhaseArtifact {
                phase,
                canvas_url,
                canvas_mime: canvas.mime.clone(),
                audio_url,
                audio_mime,
            },
        )
        .await?;
    }

    db::events::append_event(
        &state.db,
        submission_id,
        StreamStatus::Queued,
        "Submission received; queued for grading.",
        None,
        None,
    )
    .await?;

    tracing::info!(
        submission_id = %submission_id,
        problem_id = %problem.id,
        audio_phases = form.audio.len(),
        "Submission accepted; scheduling grading"
    );

    let driver = state.driver.clone();
    tokio::spawn(async move {
        driver.run(submission_id).await;
    });

    Ok(Json(CreateSubmissionResponse { submission_id }))
}

/// GET /api/submissions/{id}
///
/// Serves the cached result once grading completed; anything earlier is a
/// 404 by design - the stream is the way to observe progress.
pub async fn get_submission_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SubmissionResult>> {
    let submission = db::submissions::get_submission(&state.db, id)
        .await?
        .ok_or(ApiError::UnknownSubmission(id))?;

    match (submission.status, submission.result) {
        (SubmissionStatus::Complete, Some(result)) => Ok(Json(result)),
        _ => Err(ApiError::ResultNotReady(id)),
    }
}

async fn read_form(mut multipart: Multipart, max_bytes: u64) -> ApiResult<IntakeForm> {
    let mut form = IntakeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::MalformedForm(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        match name.as_str() {
            "problem_id" => {
                form.problem_id = Some(read_text(field).await?);
            }
            "phase_times" => {
                form.phase_times = Some(read_text(field).await?);
            }
            _ => {
                let target = name
                    .strip_prefix("canvas_")
                    .map(|p| (true, p))
                    .or_else(|| name.strip_prefix("audio_").map(|p| (false, p)));
                let Some((is_canvas, phase_name)) = target else {
                    return Err(ApiError::invalid_field(name, "unexpected field"));
                };
                let phase = Phase::parse(phase_name)
                    .ok_or_else(|| ApiError::invalid_field(&name, "unknown phase"))?;

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::MalformedForm(format!("reading '{name}': {e}")))?;
                if bytes.len() as u64 > max_bytes {
                    return Err(ApiError::invalid_field(
                        name,
                        format!("exceeds the {max_bytes} byte upload limit"),
                    ));
                }

                let upload = Upload {
                    mime,
                    bytes: bytes.to_vec(),
                };
                if is_canvas {
                    form.canvases.insert(phase, upload);
                } else {
                    form.audio.insert(phase, upload);
                }
            }
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::MalformedForm(format!("text field: {e}")))
}

/// `phase_times` must be a JSON object with exactly the four phase keys and
/// non-negative integer seconds. Returns the failure reason; the handler
/// attaches the field name.
fn parse_phase_times(raw: &str) -> Result<BTreeMap<Phase, u64>, String> {
    let parsed: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| format!("not a JSON object: {e}"))?;

    if parsed.len() != PHASE_ORDER.len() {
        return Err(format!(
            "must contain exactly the four phase keys, got {}",
            parsed.len()
        ));
    }

    let mut times = BTreeMap::new();
    for (key, value) in parsed {
        let phase = Phase::parse(&key).ok_or_else(|| format!("unknown phase key '{key}'"))?;
        let seconds = value
            .as_u64()
            .ok_or_else(|| format!("'{key}' must be a non-negative integer"))?;
        times.insert(phase, seconds);
    }

    Ok(times)
}
