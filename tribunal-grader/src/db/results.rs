//! Grading result audit table
//!
//! The submission row carries the authoritative result cache; this table
//! keeps a history/audit copy keyed by submission for operator queries.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tribunal_common::contract::SubmissionResult;
use uuid::Uuid;

/// Store or refresh the audit copy of a final result
pub async fn save_result(
    pool: &SqlitePool,
    submission_id: Uuid,
    result: &SubmissionResult,
) -> Result<()> {
    let raw = serde_json::to_string(result)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO grading_results
            (submission_id, result_version, overall_score, verdict, raw_result, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(submission_id) DO UPDATE SET
            result_version = excluded.result_version,
            overall_score = excluded.overall_score,
            verdict = excluded.verdict,
            raw_result = excluded.raw_result,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(submission_id.to_string())
    .bind(result.result_version as i64)
    .bind(result.overall_score)
    .bind(result.verdict.as_str())
    .bind(raw)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the audit copy, if any
pub async fn get_result(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> Result<Option<SubmissionResult>> {
    let row = sqlx::query("SELECT raw_result FROM grading_results WHERE submission_id = ?")
        .bind(submission_id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let raw: String = row.get("raw_result");
            Ok(Some(serde_json::from_str(&raw)?))
        }
        None => Ok(None),
    }
}
