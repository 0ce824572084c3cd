//! Submission artifact operations
//!
//! One row per (submission, phase); a gradable submission has exactly four.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tribunal_common::Phase;
use uuid::Uuid;

use crate::models::PhaseArtifact;

/// Insert one artifact row
pub async fn insert_artifact(
    pool: &SqlitePool,
    submission_id: Uuid,
    artifact: &PhaseArtifact,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO submission_artifacts
            (submission_id, phase, canvas_url, canvas_mime, audio_url, audio_mime)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission_id.to_string())
    .bind(artifact.phase.as_str())
    .bind(&artifact.canvas_url)
    .bind(&artifact.canvas_mime)
    .bind(&artifact.audio_url)
    .bind(&artifact.audio_mime)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all artifact rows for a submission, keyed by phase
pub async fn get_artifacts(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> Result<BTreeMap<Phase, PhaseArtifact>> {
    let rows = sqlx::query(
        r#"
        SELECT phase, canvas_url, canvas_mime, audio_url, audio_mime
        FROM submission_artifacts
        WHERE submission_id = ?
        "#,
    )
    .bind(submission_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut artifacts = BTreeMap::new();
    for row in rows {
        let phase: String = row.get("phase");
        let phase = Phase::parse(&phase)
            .ok_or_else(|| anyhow::anyhow!("invalid artifact phase '{phase}'"))?;
        artifacts.insert(
            phase,
            PhaseArtifact {
                phase,
                canvas_url: row.get("canvas_url"),
                canvas_mime: row.get("canvas_mime"),
                audio_url: row.get("audio_url"),
                audio_mime: row.get("audio_mime"),
            },
        );
    }

    Ok(artifacts)
}
