//! Transcript snippet persistence

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tribunal_common::contract::TranscriptSnippet;
use tribunal_common::Phase;
use uuid::Uuid;

use crate::models::TranscriptRow;

/// Replace all snippets for a submission with the given rows
pub async fn replace_transcripts(
    pool: &SqlitePool,
    submission_id: Uuid,
    rows: &[TranscriptRow],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM submission_transcripts WHERE submission_id = ?")
        .bind(submission_id.to_string())
        .execute(&mut *tx)
        .await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO submission_transcripts
                (submission_id, phase, timestamp_sec, text, is_highlight)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(submission_id.to_string())
        .bind(row.phase.as_str())
        .bind(row.timestamp_sec)
        .bind(&row.text)
        .bind(row.is_highlight as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Snippets for one phase, ordered by timestamp
pub async fn get_phase_snippets(
    pool: &SqlitePool,
    submission_id: Uuid,
    phase: Phase,
) -> Result<Vec<TranscriptSnippet>> {
    let rows = sqlx::query(
        r#"
        SELECT timestamp_sec, text
        FROM submission_transcripts
        WHERE submission_id = ? AND phase = ?
        ORDER BY timestamp_sec
        "#,
    )
    .bind(submission_id.to_string())
    .bind(phase.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TranscriptSnippet {
            timestamp_sec: row.get("timestamp_sec"),
            text: row.get("text"),
        })
        .collect())
}
