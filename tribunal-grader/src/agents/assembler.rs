//! Final result assembly
//!
//! Deterministic: the judgements, aggregate, and plan are already
//! structured, so the final document is a concatenation in fixed phase
//! order plus metadata. The contract guard re-validates everything this
//! stage produces.

use chrono::{DateTime, Utc};
use tribunal_common::contract::{
    ProblemRef, PhaseScore, SubmissionResult, RESULT_VERSION,
};
use tribunal_common::PHASE_ORDER;

use crate::models::{Problem, Submission};

use super::phase::PhaseJudgement;
use super::plan_outline::PlanOutline;
use super::rubric_radar::RubricRadar;

/// Build the contract-exact result document.
///
/// `judgements` must be in `PHASE_ORDER`; phase_scores and evidence inherit
/// that ordering, and strengths/weaknesses/highlights concatenate across
/// phases preserving their per-phase tags.
pub fn assemble(
    submission: &Submission,
    problem: &Problem,
    judgements: &[PhaseJudgement; 4],
    rubric_radar: &RubricRadar,
    plan_outline: &PlanOutline,
    graded_at: DateTime<Utc>,
) -> SubmissionResult {
    let phase_scores = judgements
        .iter()
        .map(|j| PhaseScore {
            phase: j.phase,
            score: j.score,
            bullets: j.bullets.clone(),
        })
        .collect();

    let evidence = judgements.iter().map(|j| j.evidence.clone()).collect();

    let strengths = judgements
        .iter()
        .flat_map(|j| j.strengths.iter().cloned())
        .collect();
    let weaknesses = judgements
        .iter()
        .flat_map(|j| j.weaknesses.iter().cloned())
        .collect();
    let highlights = judgements
        .iter()
        .flat_map(|j| j.highlights.iter().cloned())
        .collect();

    SubmissionResult {
        result_version: RESULT_VERSION,
        submission_id: submission.id.to_string(),
        problem: ProblemRef {
            id: problem.id.clone(),
            name: problem.title.clone(),
            difficulty: problem.difficulty.clone(),
        },
        overall_score: rubric_radar.overall_score,
        verdict: rubric_radar.verdict,
        summary: rubric_radar.summary.clone(),
        phase_scores,
        evidence,
        rubric: rubric_radar.rubric.clone(),
        radar: rubric_radar.radar.clone(),
        strengths,
        weaknesses,
        highlights,
        next_attempt_plan: plan_outline.next_attempt_plan.clone(),
        follow_up_questions: plan_outline.follow_up_questions.clone(),
        reference_outline: plan_outline.reference_outline.clone(),
        submitted_at: submission.created_at,
        graded_at: Some(graded_at),
    }
}

/// Debug-time check that judgements arrive in canonical order
pub fn assert_phase_order(judgements: &[PhaseJudgement; 4]) -> bool {
    judgements
        .iter()
        .zip(PHASE_ORDER.iter())
        .all(|(j, p)| j.phase == *p)
}
