//! Submission registry operations
//!
//! The registry is the durable record of each submission's lifecycle.
//! Terminal states are absorbing: `set_status` refuses to move a submission
//! out of `complete` or `failed`, which makes driver re-runs idempotent.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tribunal_common::contract::SubmissionResult;
use tribunal_common::Phase;
use uuid::Uuid;

use crate::models::{Submission, SubmissionStatus};

/// Insert a new submission in `queued` state
pub async fn create_submission(
    pool: &SqlitePool,
    id: Uuid,
    problem_id: &str,
    phase_times: &BTreeMap<Phase, u64>,
) -> Result<Submission> {
    let created_at = Utc::now();
    let phase_times_json = serde_json::to_string(phase_times)?;

    sqlx::query(
        r#"
        INSERT INTO submissions (id, problem_id, status, phase_times, created_at)
        VALUES (?, ?, 'queued', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(problem_id)
    .bind(phase_times_json)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(Submission {
        id,
        problem_id: problem_id.to_string(),
        status: SubmissionStatus::Queued,
        phase_times: phase_times.clone(),
        created_at,
        completed_at: None,
        result: None,
    })
}

/// Load a submission by id
pub async fn get_submission(pool: &SqlitePool, id: Uuid) -> Result<Option<Submission>> {
    let row = sqlx::query(
        r#"
        SELECT id, problem_id, status, phase_times, result, created_at, completed_at
        FROM submissions
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let status: String = row.get("status");
    let status = SubmissionStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("invalid submission status '{status}'"))?;

    let phase_times: String = row.get("phase_times");
    let phase_times: BTreeMap<Phase, u64> = serde_json::from_str(&phase_times)?;

    let result: Option<String> = row.get("result");
    let result: Option<SubmissionResult> = result
        .map(|raw| serde_json::from_str(&raw))
        .transpose()?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()?
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Some(Submission {
        id,
        problem_id: row.get("problem_id"),
        status,
        phase_times,
        created_at,
        completed_at,
        result,
    }))
}

/// Transition lifecycle state.
///
/// Returns `true` when the transition applied. Terminal rows are never
/// updated; a transition attempt against one returns `false`.
pub async fn set_status(
    pool: &SqlitePool,
    id: Uuid,
    status: SubmissionStatus,
) -> Result<bool> {
    let completed_at = status
        .is_terminal()
        .then(|| Utc::now().to_rfc3339());

    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET status = ?, completed_at = COALESCE(?, completed_at)
        WHERE id = ? AND status NOT IN ('complete', 'failed')
        "#,
    )
    .bind(status.as_str())
    .bind(completed_at)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Cache the final result and mark the submission complete in one write
pub async fn complete_with_result(
    pool: &SqlitePool,
    id: Uuid,
    result: &SubmissionResult,
) -> Result<bool> {
    let raw = serde_json::to_string(result)?;

    let outcome = sqlx::query(
        r#"
        UPDATE submissions
        SET status = 'complete', result = ?, completed_at = ?
        WHERE id = ? AND status NOT IN ('complete', 'failed')
        "#,
    )
    .bind(raw)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(outcome.rows_affected() > 0)
}

/// Mark any submission stranded in `processing` by a previous process as
/// failed. Run once at startup: a dead process means the background task
/// driving that submission no longer exists.
pub async fn fail_stale_processing(pool: &SqlitePool) -> Result<Vec<Uuid>> {
    let rows = sqlx::query("SELECT id FROM submissions WHERE status = 'processing'")
        .fetch_all(pool)
        .await?;

    let mut failed = Vec::new();
    for row in rows {
        let id: String = row.get("id");
        let id = Uuid::parse_str(&id)?;
        if set_status(pool, id, SubmissionStatus::Failed).await? {
            failed.push(id);
        }
    }

    Ok(failed)
}
