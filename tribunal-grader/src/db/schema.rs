//! Database schema definitions for the grading service
//!
//! Ownership is rooted at `submissions`: artifacts, transcripts, events,
//! and audit results cascade-delete with their submission. Problems are
//! referenced, never owned.

use anyhow::Result;
use sqlx::SqlitePool;

/// Initialize database schema
///
/// Creates all required tables:
/// - problems: read-only catalog with rubric definitions
/// - submissions: lifecycle state, phase times, cached final result
/// - submission_artifacts: canvas/audio references, one row per phase
/// - submission_transcripts: timestamped snippets from transcription
/// - grading_events: append-only progress log, replayable per submission
/// - grading_results: history/audit copy of final results
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    // Execute schema in transaction for atomic creation
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS problems (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            prompt TEXT NOT NULL,
            constraints TEXT NOT NULL DEFAULT '[]',
            rubric_definition TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            problem_id TEXT NOT NULL REFERENCES problems(id),
            status TEXT NOT NULL DEFAULT 'queued',
            phase_times TEXT NOT NULL,
            result TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT,
            CHECK (status IN ('queued', 'processing', 'complete', 'failed'))
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(status)")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submission_artifacts (
            submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
            phase TEXT NOT NULL,
            canvas_url TEXT NOT NULL,
            canvas_mime TEXT NOT NULL,
            audio_url TEXT,
            audio_mime TEXT,
            PRIMARY KEY (submission_id, phase),
            CHECK (phase IN ('clarify', 'estimate', 'design', 'explain'))
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submission_transcripts (
            submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
            phase TEXT NOT NULL,
            timestamp_sec REAL NOT NULL,
            text TEXT NOT NULL,
            is_highlight INTEGER NOT NULL DEFAULT 0,
            CHECK (timestamp_sec >= 0)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transcripts_submission
         ON submission_transcripts(submission_id, phase, timestamp_sec)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grading_events (
            submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
            ordinal INTEGER NOT NULL,
            status TEXT NOT NULL,
            message TEXT NOT NULL,
            phase TEXT,
            progress REAL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (submission_id, ordinal),
            CHECK (progress IS NULL OR (progress >= 0.0 AND progress <= 1.0))
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grading_results (
            submission_id TEXT PRIMARY KEY REFERENCES submissions(id) ON DELETE CASCADE,
            result_version INTEGER NOT NULL,
            overall_score REAL NOT NULL,
            verdict TEXT NOT NULL,
            raw_result TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}
