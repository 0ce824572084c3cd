//! Problem catalog operations
//!
//! The catalog is read-only at runtime; `seed_builtin_problems` populates a
//! fresh database so the service grades out of the box.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tribunal_common::Phase;

use crate::models::{Problem, ProblemSummary, RubricDefinition};

/// Load a problem by id, validating its rubric definition
pub async fn get_problem(pool: &SqlitePool, id: &str) -> Result<Option<Problem>> {
    let row = sqlx::query(
        r#"
        SELECT id, slug, title, difficulty, prompt, constraints, rubric_definition, created_at
        FROM problems
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let constraints: String = row.get("constraints");
    let rubric: String = row.get("rubric_definition");
    let created_at: String = row.get("created_at");

    let problem = Problem {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        difficulty: row.get("difficulty"),
        prompt: row.get("prompt"),
        constraints: serde_json::from_str(&constraints)?,
        rubric_definition: serde_json::from_str(&rubric)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)?
            .with_timezone(&Utc),
    };
    problem.validate().map_err(anyhow::Error::from)?;

    Ok(Some(problem))
}

/// List catalog summaries ordered by slug
pub async fn list_problems(pool: &SqlitePool) -> Result<Vec<ProblemSummary>> {
    let rows = sqlx::query(
        "SELECT id, slug, title, difficulty FROM problems ORDER BY slug",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ProblemSummary {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            difficulty: row.get("difficulty"),
        })
        .collect())
}

/// Insert a problem, replacing any existing row with the same id
pub async fn upsert_problem(pool: &SqlitePool, problem: &Problem) -> Result<()> {
    problem.validate().map_err(anyhow::Error::from)?;

    sqlx::query(
        r#"
        INSERT INTO problems (id, slug, title, difficulty, prompt, constraints, rubric_definition, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            slug = excluded.slug,
            title = excluded.title,
            difficulty = excluded.difficulty,
            prompt = excluded.prompt,
            constraints = excluded.constraints,
            rubric_definition = excluded.rubric_definition
        "#,
    )
    .bind(&problem.id)
    .bind(&problem.slug)
    .bind(&problem.title)
    .bind(&problem.difficulty)
    .bind(&problem.prompt)
    .bind(serde_json::to_string(&problem.constraints)?)
    .bind(serde_json::to_string(&problem.rubric_definition)?)
    .bind(problem.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the built-in catalog on an empty database
pub async fn seed_builtin_problems(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM problems")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    for problem in builtin_problems() {
        upsert_problem(pool, &problem).await?;
    }

    Ok(())
}

fn builtin_problems() -> Vec<Problem> {
    vec![Problem {
        id: "url-shortener".to_string(),
        slug: "url-shortener".to_string(),
        title: "Design a URL Shortener".to_string(),
        difficulty: "apprentice".to_string(),
        prompt: "Design a URL shortening service handling 10M new URLs per month \
                 with a 100:1 read/write ratio. Cover short-code generation, \
                 redirection latency, and basic click analytics."
            .to_string(),
        constraints: vec![
            "10M new URLs per month".to_string(),
            "100:1 read/write ratio".to_string(),
            "Redirect p99 under 100ms".to_string(),
        ],
        rubric_definition: vec![
            rubric_item(
                "Requirements Clarity",
                "How well requirements were identified and prioritized",
                &[(Phase::Clarify, 0.7), (Phase::Estimate, 0.3)],
            ),
            rubric_item(
                "Capacity Planning",
                "Quality of back-of-envelope calculations and stated assumptions",
                &[(Phase::Estimate, 0.8), (Phase::Clarify, 0.2)],
            ),
            rubric_item(
                "Architecture Quality",
                "Soundness of the high-level design and component choices",
                &[(Phase::Design, 0.7), (Phase::Explain, 0.3)],
            ),
            rubric_item(
                "Tradeoff Reasoning",
                "Depth of tradeoff analysis and self-critique",
                &[(Phase::Explain, 0.7), (Phase::Design, 0.3)],
            ),
        ],
        created_at: Utc::now(),
    }]
}

fn rubric_item(label: &str, description: &str, weights: &[(Phase, f64)]) -> RubricDefinition {
    RubricDefinition {
        label: label.to_string(),
        description: description.to_string(),
        phase_weights: weights.iter().copied().collect(),
    }
}
