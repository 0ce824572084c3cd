//! Rubric/radar aggregation
//!
//! Weighted roll-ups are computed in code; the model only writes the
//! summary paragraph. The contract guard recomputes the same math later,
//! so both sides share these functions and constants.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tribunal_common::contract::{RadarDimension, RubricItem};
use tribunal_common::{RubricStatus, Skill, Verdict};

use crate::error::PipelineError;
use crate::models::RubricDefinition;
use crate::providers::LanguageModel;

use super::parse_stage_output;

const STAGE: &str = "rubric_radar";

/// Fixed radar weights, indexed by `PHASE_ORDER`
/// (clarify, estimate, design, explain). These constants are part of the
/// scoring contract and must not drift.
pub const RADAR_WEIGHTS: [(Skill, [f64; 4]); 4] = [
    (Skill::Clarity, [0.5, 0.2, 0.2, 0.1]),
    (Skill::Structure, [0.1, 0.1, 0.6, 0.2]),
    (Skill::Power, [0.0, 0.4, 0.4, 0.2]),
    (Skill::Wisdom, [0.1, 0.0, 0.3, 0.6]),
];

/// Aggregated scoring output: rubric items, radar, overall, verdict, summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricRadar {
    pub rubric: Vec<RubricItem>,
    pub radar: Vec<RadarDimension>,
    pub overall_score: f64,
    pub verdict: Verdict,
    pub summary: String,
}

/// Per-phase scores in `PHASE_ORDER`
pub type PhaseScores = [f64; 4];

/// Weighted rubric score for one criterion
pub fn rubric_score(def: &RubricDefinition, scores: &PhaseScores) -> f64 {
    def.phase_weights
        .iter()
        .map(|(phase, weight)| scores[phase.index()] * weight)
        .sum()
}

/// Compute all rubric items from the problem's definitions
pub fn compute_rubric(defs: &[RubricDefinition], scores: &PhaseScores) -> Vec<RubricItem> {
    defs.iter()
        .map(|def| {
            let score = rubric_score(def, scores);
            RubricItem {
                label: def.label.clone(),
                description: def.description.clone(),
                computed_from: def.computed_from(),
                score,
                status: RubricStatus::from_score(score),
            }
        })
        .collect()
}

/// Compute the four radar dimensions from the fixed weights
pub fn compute_radar(scores: &PhaseScores) -> Vec<RadarDimension> {
    RADAR_WEIGHTS
        .iter()
        .map(|(skill, weights)| RadarDimension {
            dimension: *skill,
            score: weights
                .iter()
                .zip(scores.iter())
                .map(|(w, s)| w * s)
                .sum(),
        })
        .collect()
}

/// Arithmetic mean of the four phase scores, rounded to one decimal
pub fn overall_score(scores: &PhaseScores) -> f64 {
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Run the aggregation stage: deterministic math plus a generated summary
pub async fn synthesize(
    llm: &dyn LanguageModel,
    defs: &[RubricDefinition],
    scores: &PhaseScores,
) -> Result<RubricRadar, PipelineError> {
    let rubric = compute_rubric(defs, scores);
    let radar = compute_radar(scores);
    let overall = overall_score(scores);
    let verdict = Verdict::from_score(overall);

    let prompt = summary_prompt(&rubric, &radar, overall, verdict);
    let raw = llm
        .generate_json(&prompt)
        .await
        .map_err(|e| PipelineError::agent(STAGE, anyhow::anyhow!(e)))?;
    let output: SummaryOutput = parse_stage_output(STAGE, &raw)?;
    if output.summary.trim().is_empty() {
        return Err(PipelineError::agent(
            STAGE,
            anyhow::anyhow!("summary must not be empty"),
        ));
    }

    Ok(RubricRadar {
        rubric,
        radar,
        overall_score: overall,
        verdict,
        summary: output.summary,
    })
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary: String,
}

fn summary_prompt(
    rubric: &[RubricItem],
    radar: &[RadarDimension],
    overall: f64,
    verdict: Verdict,
) -> String {
    let mut p = String::new();
    let _ = writeln!(
        p,
        "You are summarizing a system-design interview evaluation. The numbers below \
         are already final; do not recompute or contradict them."
    );

    let _ = writeln!(p, "\nRadar dimensions:");
    for dim in radar {
        let _ = writeln!(p, "- {}: {:.2}", dim.dimension, dim.score);
    }
    let _ = writeln!(p, "\nRubric items:");
    for item in rubric {
        let _ = writeln!(
            p,
            "- {} ({:?}): {:.2}",
            item.label, item.status, item.score
        );
    }
    let _ = writeln!(p, "\nOverall score: {overall:.1}, verdict: {verdict}");

    let _ = writeln!(
        p,
        r#"
Write 2-3 sentences naming the strongest dimension, the most critical
weakness if any, and why the verdict follows from the scores.
Output strict JSON only: {{"summary": "<2-3 sentences>"}}"#
    );

    p
}
