//! Version-1 report uplift
//!
//! Historical grading reports were dimension-oriented: scoping, design,
//! scale, tradeoff. This transformer deterministically lifts such a report
//! into the version-2 phase-oriented contract. It is an adjunct for stored
//! data only; new runs never pass through here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tribunal_common::contract::{
    EvidenceItem, NextAttemptItem, PhaseScore, ProblemRef, RadarDimension, ReferenceOutline,
    ReferenceSection, RubricItem, StrengthWeakness, SubmissionResult, RESULT_VERSION,
};
use tribunal_common::{Phase, RubricStatus, Skill, Verdict, PHASE_ORDER};

use crate::models::{PhaseArtifact, RubricDefinition};

/// Legacy rubric dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Scoping,
    Design,
    Scale,
    Tradeoff,
}

impl Dimension {
    /// The v2 phase each legacy dimension maps onto
    pub fn phase(&self) -> Phase {
        match self {
            Dimension::Scoping => Phase::Clarify,
            Dimension::Design => Phase::Design,
            Dimension::Scale => Phase::Estimate,
            Dimension::Tradeoff => Phase::Explain,
        }
    }

    /// The radar skill each legacy dimension informs
    pub fn skill(&self) -> Skill {
        match self {
            Dimension::Scoping => Skill::Clarity,
            Dimension::Design => Skill::Structure,
            Dimension::Scale => Skill::Power,
            Dimension::Tradeoff => Skill::Wisdom,
        }
    }

    fn for_phase(phase: Phase) -> Dimension {
        match phase {
            Phase::Clarify => Dimension::Scoping,
            Phase::Design => Dimension::Design,
            Phase::Estimate => Dimension::Scale,
            Phase::Explain => Dimension::Tradeoff,
        }
    }
}

/// Per-dimension score with qualitative feedback (v1 shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// Stored version-1 grading report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyReport {
    pub overall_score: f64,
    pub verdict: String,
    #[serde(default)]
    pub dimensions: BTreeMap<Dimension, DimensionScore>,
    #[serde(default)]
    pub top_improvements: Vec<String>,
    #[serde(default)]
    pub phase_observations: BTreeMap<Phase, String>,
}

/// Metadata needed alongside the legacy report
pub struct UpliftContext<'a> {
    pub submission_id: String,
    pub problem: ProblemRef,
    pub rubric_defs: &'a [RubricDefinition],
    pub artifacts: &'a BTreeMap<Phase, PhaseArtifact>,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

/// Lift a v1 report into the v2 contract.
///
/// Phase scores come from the mapped dimension; rubric items are recomputed
/// from the problem's phase weights over those scores, so the uplifted
/// document satisfies the same math the guard checks on new runs.
pub fn uplift(report: &LegacyReport, ctx: &UpliftContext<'_>) -> SubmissionResult {
    let score_for = |phase: Phase| -> f64 {
        report
            .dimensions
            .get(&Dimension::for_phase(phase))
            .map(|d| d.score)
            .unwrap_or(5.0)
    };

    let phase_scores: Vec<PhaseScore> = PHASE_ORDER
        .iter()
        .map(|phase| {
            let dimension = Dimension::for_phase(*phase);
            let data = report.dimensions.get(&dimension);
            PhaseScore {
                phase: *phase,
                score: score_for(*phase),
                bullets: bullets_for(dimension, data),
            }
        })
        .collect();

    let evidence: Vec<EvidenceItem> = PHASE_ORDER
        .iter()
        .map(|phase| EvidenceItem {
            phase: *phase,
            snapshot_url: ctx
                .artifacts
                .get(phase)
                .map(|a| a.canvas_url.clone())
                .unwrap_or_default(),
            // v1 stored no timestamped transcripts or per-phase notes
            transcripts: vec![],
            noticed: None,
        })
        .collect();

    let rubric: Vec<RubricItem> = ctx
        .rubric_defs
        .iter()
        .map(|def| {
            let score: f64 = def
                .phase_weights
                .iter()
                .map(|(phase, weight)| score_for(*phase) * weight)
                .sum();
            RubricItem {
                label: def.label.clone(),
                description: def.description.clone(),
                computed_from: def.computed_from(),
                score,
                status: RubricStatus::from_score(score),
            }
        })
        .collect();

    let radar: Vec<RadarDimension> = [
        Dimension::Scoping,
        Dimension::Design,
        Dimension::Scale,
        Dimension::Tradeoff,
    ]
    .iter()
    .map(|d| RadarDimension {
        dimension: d.skill(),
        score: report.dimensions.get(d).map(|s| s.score).unwrap_or(5.0),
    })
    .collect();

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    for (dimension, data) in &report.dimensions {
        let phase = dimension.phase();
        strengths.extend(data.strengths.iter().map(|text| StrengthWeakness {
            phase,
            text: text.clone(),
            timestamp_sec: None,
        }));
        weaknesses.extend(data.weaknesses.iter().map(|text| StrengthWeakness {
            phase,
            text: text.clone(),
            timestamp_sec: None,
        }));
    }

    let verdict = normalize_verdict(&report.verdict, report.overall_score);

    SubmissionResult {
        result_version: RESULT_VERSION,
        submission_id: ctx.submission_id.clone(),
        problem: ctx.problem.clone(),
        overall_score: report.overall_score,
        verdict,
        summary: summary_from(report),
        phase_scores,
        evidence,
        rubric,
        radar,
        strengths,
        weaknesses,
        highlights: vec![],
        next_attempt_plan: plan_from(&report.top_improvements),
        follow_up_questions: default_follow_ups(),
        reference_outline: default_outline(),
        submitted_at: ctx.submitted_at,
        graded_at: ctx.graded_at,
    }
}

fn bullets_for(dimension: Dimension, data: Option<&DimensionScore>) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(data) = data {
        bullets.extend(data.strengths.iter().take(2).cloned());
        bullets.extend(data.weaknesses.iter().take(2).cloned());
        if bullets.len() < 3 && !data.feedback.is_empty() {
            bullets.extend(
                data.feedback
                    .split('.')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .take(6 - bullets.len())
                    .map(str::to_string),
            );
        }
    }
    while bullets.len() < 3 {
        bullets.push(format!("No detailed {dimension:?} feedback was recorded."));
    }
    bullets.truncate(6);
    bullets
}

fn normalize_verdict(raw: &str, overall: f64) -> Verdict {
    match raw.to_ascii_lowercase().replace('_', "-").as_str() {
        "hire" | "lean-hire" | "strong-hire" => Verdict::Hire,
        "no-hire" | "lean-no-hire" | "strong-no-hire" => Verdict::NoHire,
        "maybe" | "no-decision" => Verdict::Maybe,
        _ => Verdict::from_score(overall),
    }
}

fn summary_from(report: &LegacyReport) -> String {
    for phase in PHASE_ORDER {
        if let Some(observation) = report.phase_observations.get(&phase) {
            if !observation.is_empty() {
                return observation.clone();
            }
        }
    }
    format!(
        "Overall performance: {} at {:.1}/10.",
        normalize_verdict(&report.verdict, report.overall_score),
        report.overall_score
    )
}

fn plan_from(improvements: &[String]) -> Vec<NextAttemptItem> {
    let mut plan: Vec<NextAttemptItem> = improvements
        .iter()
        .take(3)
        .map(|text| NextAttemptItem {
            what_went_wrong: text.clone(),
            do_next_time: vec![
                format!("Focus on: {}", text.to_lowercase()),
                "Rehearse against a comparable problem before the next attempt.".to_string(),
            ],
        })
        .collect();

    while plan.len() < 3 {
        plan.push(NextAttemptItem {
            what_went_wrong: "Additional improvement area to be identified.".to_string(),
            do_next_time: vec![
                "Review the recorded feedback per phase.".to_string(),
                "Practice the weakest dimension deliberately.".to_string(),
            ],
        });
    }

    plan
}

fn default_follow_ups() -> Vec<String> {
    vec![
        "How would you handle traffic spikes 10x larger than your estimates?".to_string(),
        "What monitoring and alerting would you put in place for this system?".to_string(),
        "How would you evolve this design as requirements change over time?".to_string(),
    ]
}

fn default_outline() -> ReferenceOutline {
    ReferenceOutline {
        sections: vec![
            ReferenceSection {
                section: "Requirements & Scope".to_string(),
                bullets: vec![
                    "Define functional requirements".to_string(),
                    "Identify non-functional requirements (scale, latency, availability)".to_string(),
                    "Clarify constraints and assumptions".to_string(),
                ],
            },
            ReferenceSection {
                section: "Capacity Estimation".to_string(),
                bullets: vec![
                    "Calculate traffic patterns (QPS, bandwidth)".to_string(),
                    "Estimate storage requirements".to_string(),
                    "Determine compute resource needs".to_string(),
                ],
            },
            ReferenceSection {
                section: "High-Level Design".to_string(),
                bullets: vec![
                    "Sketch system components".to_string(),
                    "Define data flow".to_string(),
                    "Identify key technologies".to_string(),
                ],
            },
            ReferenceSection {
                section: "Deep Dive & Tradeoffs".to_string(),
                bullets: vec![
                    "Discuss scaling strategies".to_string(),
                    "Analyze consistency vs availability tradeoffs".to_string(),
                    "Address failure scenarios".to_string(),
                ],
            },
        ],
    }
}
