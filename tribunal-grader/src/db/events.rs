//! Append-only grading event log
//!
//! Every progress update is committed here before clients can see it; the
//! stream endpoint replays this table by polling. Ordinals are assigned
//! inside the INSERT so concurrent writers cannot produce gaps or
//! duplicates for a submission.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tribunal_common::{Phase, StreamStatus};
use uuid::Uuid;

/// One persisted progress event
#[derive(Debug, Clone)]
pub struct GradingEvent {
    pub submission_id: Uuid,
    pub ordinal: i64,
    pub status: StreamStatus,
    pub message: String,
    pub phase: Option<Phase>,
    pub progress: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Append an event, assigning the next ordinal atomically
pub async fn append_event(
    pool: &SqlitePool,
    submission_id: Uuid,
    status: StreamStatus,
    message: &str,
    phase: Option<Phase>,
    progress: Option<f64>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO grading_events (submission_id, ordinal, status, message, phase, progress, created_at)
        SELECT ?1, COALESCE(MAX(ordinal) + 1, 0), ?2, ?3, ?4, ?5, ?6
        FROM grading_events
        WHERE submission_id = ?1
        "#,
    )
    .bind(submission_id.to_string())
    .bind(status.as_str())
    .bind(message)
    .bind(phase.map(|p| p.as_str()))
    .bind(progress)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::debug!(
        submission_id = %submission_id,
        status = %status,
        "Grading event persisted"
    );

    Ok(())
}

/// Events with ordinal strictly greater than `after`, in ordinal order.
/// Pass `after = -1` to replay the full trace.
pub async fn events_after(
    pool: &SqlitePool,
    submission_id: Uuid,
    after: i64,
) -> Result<Vec<GradingEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT ordinal, status, message, phase, progress, created_at
        FROM grading_events
        WHERE submission_id = ? AND ordinal > ?
        ORDER BY ordinal
        "#,
    )
    .bind(submission_id.to_string())
    .bind(after)
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("status");
        let status = StreamStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("invalid event status '{status}'"))?;

        let phase: Option<String> = row.get("phase");
        let phase = phase
            .map(|p| {
                Phase::parse(&p).ok_or_else(|| anyhow::anyhow!("invalid event phase '{p}'"))
            })
            .transpose()?;

        let created_at: String = row.get("created_at");
        let created_at =
            chrono::DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc);

        events.push(GradingEvent {
            submission_id,
            ordinal: row.get("ordinal"),
            status,
            message: row.get("message"),
            phase,
            progress: row.get("progress"),
            created_at,
        });
    }

    Ok(events)
}

/// Full replayable trace for a submission
pub async fn get_events(pool: &SqlitePool, submission_id: Uuid) -> Result<Vec<GradingEvent>> {
    events_after(pool, submission_id, -1).await
}
