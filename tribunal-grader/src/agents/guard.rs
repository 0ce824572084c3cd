//! Contract guard
//!
//! Last validator before the result cache. Repairs minor drift
//! deterministically, rechecks the weighted math against the phase scores
//! and problem rubric, and enforces ordering invariants. Anything it
//! cannot repair fails the pipeline with the offending field name.
//!
//! Repair policy: over-long lists truncate to their caps; under-long lists
//! are padded only when the constraint is exactly-N and the missing items
//! can be synthesized from scratch state, otherwise the guard fails.

use tribunal_common::contract::{
    NextAttemptItem, PhaseScore, SubmissionResult, RESULT_VERSION,
};
use tribunal_common::{Verdict, PHASE_ORDER, SKILL_ORDER};

use crate::error::PipelineError;
use crate::models::RubricDefinition;

use super::phase::PhaseJudgement;
use super::rubric_radar::{self, PhaseScores};

/// Tolerance when rechecking weighted sums
const MATH_EPSILON: f64 = 1e-6;

/// Bullet list caps on phase scores
const MAX_BULLETS: usize = 6;
const MIN_BULLETS: usize = 3;

/// Scratch-state context the guard may synthesize repairs from
pub struct GuardContext<'a> {
    pub judgements: &'a [PhaseJudgement; 4],
    pub rubric_defs: &'a [RubricDefinition],
}

impl GuardContext<'_> {
    fn phase_scores(&self) -> PhaseScores {
        let mut scores = [0.0; 4];
        for j in self.judgements.iter() {
            scores[j.phase.index()] = j.score;
        }
        scores
    }
}

/// Validate and normalize a result in place.
///
/// On success the document satisfies every hard invariant of the v2
/// contract; on failure the submission must fail with the returned error.
pub fn enforce(
    result: &mut SubmissionResult,
    ctx: &GuardContext<'_>,
) -> Result<(), PipelineError> {
    result.result_version = RESULT_VERSION;

    let scores = ctx.phase_scores();

    repair_phase_scores(result, ctx)?;
    repair_evidence(result, ctx)?;
    recheck_rubric(result, ctx, &scores);
    recheck_radar(result, &scores);
    recheck_overall(result, &scores);
    repair_plan(result, ctx)?;

    if result.follow_up_questions.len() < 3 {
        return Err(violation("follow_up_questions"));
    }

    let sections = &mut result.reference_outline.sections;
    if sections.len() > 6 {
        sections.truncate(6);
    }
    if sections.len() < 4 {
        return Err(violation("reference_outline"));
    }

    if result.submission_id.is_empty() {
        return Err(violation("submission_id"));
    }
    if result.problem.id.is_empty() || result.problem.name.is_empty() {
        return Err(violation("problem"));
    }

    Ok(())
}

/// Exactly four phase scores in canonical order, bullets within caps
fn repair_phase_scores(
    result: &mut SubmissionResult,
    ctx: &GuardContext<'_>,
) -> Result<(), PipelineError> {
    let mut ordered = Vec::with_capacity(4);
    for phase in PHASE_ORDER {
        // Prefer the assembled entry; fall back to the scratch judgement
        let entry = result
            .phase_scores
            .iter()
            .find(|ps| ps.phase == phase)
            .cloned()
            .or_else(|| {
                ctx.judgements
                    .iter()
                    .find(|j| j.phase == phase)
                    .map(|j| PhaseScore {
                        phase,
                        score: j.score,
                        bullets: j.bullets.clone(),
                    })
            });

        let Some(mut entry) = entry else {
            return Err(violation("phase_scores"));
        };

        entry.score = entry.score.clamp(0.0, 10.0);
        if entry.bullets.len() > MAX_BULLETS {
            entry.bullets.truncate(MAX_BULLETS);
        }
        if entry.bullets.len() < MIN_BULLETS {
            // Refill from the judgement; if that is still short, the
            // evaluator contract was broken upstream
            if let Some(j) = ctx.judgements.iter().find(|j| j.phase == phase) {
                entry.bullets = j.bullets.clone();
            }
            if entry.bullets.len() < MIN_BULLETS {
                return Err(violation("phase_scores"));
            }
        }

        ordered.push(entry);
    }

    result.phase_scores = ordered;
    Ok(())
}

/// Exactly four evidence items in canonical order
fn repair_evidence(
    result: &mut SubmissionResult,
    ctx: &GuardContext<'_>,
) -> Result<(), PipelineError> {
    let mut ordered = Vec::with_capacity(4);
    for phase in PHASE_ORDER {
        let entry = result
            .evidence
            .iter()
            .find(|e| e.phase == phase)
            .cloned()
            .or_else(|| {
                ctx.judgements
                    .iter()
                    .find(|j| j.phase == phase)
                    .map(|j| j.evidence.clone())
            });

        match entry {
            Some(entry) => ordered.push(entry),
            None => return Err(violation("evidence")),
        }
    }

    result.evidence = ordered;
    Ok(())
}

/// Rubric scores must equal the weighted sums; statuses must match thresholds
fn recheck_rubric(result: &mut SubmissionResult, ctx: &GuardContext<'_>, scores: &PhaseScores) {
    // The problem definition is authoritative: recompute the full list
    // rather than trusting whatever survived assembly.
    let recomputed = rubric_radar::compute_rubric(ctx.rubric_defs, scores);

    let drifted = result.rubric.len() != recomputed.len()
        || result
            .rubric
            .iter()
            .zip(recomputed.iter())
            .any(|(got, want)| {
                got.label != want.label
                    || (got.score - want.score).abs() > MATH_EPSILON
                    || got.status != want.status
                    || got.computed_from != want.computed_from
            });

    if drifted {
        tracing::warn!("rubric drifted from deterministic recomputation; overwriting");
        result.rubric = recomputed;
    }
}

/// Radar must carry the four canonical skills with fixed-weight scores
fn recheck_radar(result: &mut SubmissionResult, scores: &PhaseScores) {
    let recomputed = rubric_radar::compute_radar(scores);

    let drifted = result.radar.len() != 4
        || result
            .radar
            .iter()
            .zip(recomputed.iter())
            .any(|(got, want)| {
                got.dimension != want.dimension
                    || (got.score - want.score).abs() > MATH_EPSILON
            });

    if drifted {
        tracing::warn!("radar drifted from fixed-weight recomputation; overwriting");
        result.radar = recomputed;
    }

    debug_assert_eq!(
        result.radar.iter().map(|d| d.dimension).collect::<Vec<_>>(),
        SKILL_ORDER.to_vec()
    );
}

/// Overall score is the rounded mean; verdict follows the thresholds
fn recheck_overall(result: &mut SubmissionResult, scores: &PhaseScores) {
    let overall = rubric_radar::overall_score(scores);
    if (result.overall_score - overall).abs() > MATH_EPSILON {
        tracing::warn!(
            got = result.overall_score,
            want = overall,
            "overall score drifted; overwriting"
        );
        result.overall_score = overall;
    }
    result.overall_score = result.overall_score.clamp(0.0, 10.0);
    result.verdict = Verdict::from_score(result.overall_score);
}

/// Exactly three plan items; synthesize missing ones from phase weaknesses
fn repair_plan(
    result: &mut SubmissionResult,
    ctx: &GuardContext<'_>,
) -> Result<(), PipelineError> {
    let plan = &mut result.next_attempt_plan;
    if plan.len() > 3 {
        plan.truncate(3);
    }

    if plan.len() < 3 {
        let mut weaknesses = ctx
            .judgements
            .iter()
            .flat_map(|j| j.weaknesses.iter())
            .map(|w| (w.phase, w.text.clone()));

        while plan.len() < 3 {
            let Some((phase, text)) = weaknesses.next() else {
                return Err(violation("next_attempt_plan"));
            };
            plan.push(NextAttemptItem {
                what_went_wrong: text,
                do_next_time: vec![
                    format!("Revisit the {phase} phase with a focused checklist."),
                    "Practice this area against a comparable problem.".to_string(),
                ],
            });
        }
    }

    Ok(())
}

fn violation(field: &str) -> PipelineError {
    PipelineError::ContractViolation {
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tribunal_common::contract::{
        EvidenceItem, EvidenceNote, ProblemRef, RadarDimension, ReferenceOutline,
        ReferenceSection, StrengthWeakness,
    };
    use tribunal_common::{Phase, Skill};

    fn judgement(phase: Phase, score: f64) -> PhaseJudgement {
        PhaseJudgement {
            phase,
            score,
            bullets: vec!["one".into(), "two".into(), "three".into()],
            evidence: EvidenceItem {
                phase,
                snapshot_url: format!("/uploads/s/canvas_{phase}.png"),
                transcripts: vec![],
                noticed: Some(EvidenceNote {
                    strength: "s".into(),
                    issue: "i".into(),
                }),
            },
            strengths: vec![StrengthWeakness {
                phase,
                text: "strength".into(),
                timestamp_sec: None,
            }],
            weaknesses: vec![StrengthWeakness {
                phase,
                text: format!("{phase} went poorly"),
                timestamp_sec: None,
            }],
            highlights: vec![],
        }
    }

    fn judgements() -> [PhaseJudgement; 4] {
        [
            judgement(Phase::Clarify, 8.0),
            judgement(Phase::Estimate, 7.5),
            judgement(Phase::Design, 6.0),
            judgement(Phase::Explain, 9.0),
        ]
    }

    fn defs() -> Vec<RubricDefinition> {
        vec![RubricDefinition {
            label: "Requirements Clarity".into(),
            description: "d".into(),
            phase_weights: [(Phase::Clarify, 0.7), (Phase::Estimate, 0.3)]
                .into_iter()
                .collect(),
        }]
    }

    fn valid_result(judgements: &[PhaseJudgement; 4], defs: &[RubricDefinition]) -> SubmissionResult {
        let scores = [8.0, 7.5, 6.0, 9.0];
        SubmissionResult {
            result_version: 2,
            submission_id: "abc".into(),
            problem: ProblemRef {
                id: "url-shortener".into(),
                name: "Design a URL Shortener".into(),
                difficulty: "apprentice".into(),
            },
            overall_score: rubric_radar::overall_score(&scores),
            verdict: Verdict::Hire,
            summary: "ok".into(),
            phase_scores: judgements
                .iter()
                .map(|j| PhaseScore {
                    phase: j.phase,
                    score: j.score,
                    bullets: j.bullets.clone(),
                })
                .collect(),
            evidence: judgements.iter().map(|j| j.evidence.clone()).collect(),
            rubric: rubric_radar::compute_rubric(defs, &scores),
            radar: rubric_radar::compute_radar(&scores),
            strengths: vec![],
            weaknesses: vec![],
            highlights: vec![],
            next_attempt_plan: (0..3)
                .map(|i| NextAttemptItem {
                    what_went_wrong: format!("gap {i}"),
                    do_next_time: vec!["a".into(), "b".into()],
                })
                .collect(),
            follow_up_questions: vec!["q1?".into(), "q2?".into(), "q3?".into()],
            reference_outline: ReferenceOutline {
                sections: (0..4)
                    .map(|i| ReferenceSection {
                        section: format!("s{i}"),
                        bullets: vec!["a".into(), "b".into(), "c".into()],
                    })
                    .collect(),
            },
            submitted_at: Utc::now(),
            graded_at: Some(Utc::now()),
        }
    }

    #[test]
    fn valid_result_is_untouched_except_for_recomputation() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();
        assert_eq!(result.result_version, 2);
        assert_eq!(result.phase_scores.len(), 4);
        // S8 math: 8.0*0.7 + 7.5*0.3 = 7.85, partial
        assert!((result.rubric[0].score - 7.85).abs() < 1e-6);
        assert_eq!(result.rubric[0].status, tribunal_common::RubricStatus::Partial);
    }

    #[test]
    fn permuted_phase_scores_are_reordered() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.phase_scores.swap(0, 3);
        result.evidence.swap(1, 2);

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();

        for (i, phase) in PHASE_ORDER.iter().enumerate() {
            assert_eq!(result.phase_scores[i].phase, *phase);
            assert_eq!(result.evidence[i].phase, *phase);
        }
    }

    #[test]
    fn missing_phase_score_is_synthesized_from_scratch() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.phase_scores.remove(2);

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();
        assert_eq!(result.phase_scores.len(), 4);
        assert_eq!(result.phase_scores[2].phase, Phase::Design);
        assert_eq!(result.phase_scores[2].score, 6.0);
    }

    #[test]
    fn drifted_radar_is_overwritten() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.radar = vec![RadarDimension {
            dimension: Skill::Clarity,
            score: 1.0,
        }];

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();
        assert_eq!(result.radar.len(), 4);
        let scores = [8.0, 7.5, 6.0, 9.0];
        let want = rubric_radar::compute_radar(&scores);
        assert_eq!(result.radar, want);
    }

    #[test]
    fn wrong_verdict_is_corrected_from_overall() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.verdict = Verdict::NoHire;
        result.overall_score = 2.0;

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();
        // mean of 8.0, 7.5, 6.0, 9.0 = 7.6 -> hire
        assert!((result.overall_score - 7.6).abs() < 1e-9);
        assert_eq!(result.verdict, Verdict::Hire);
    }

    #[test]
    fn short_plan_is_padded_from_weaknesses() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.next_attempt_plan.truncate(1);

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();
        assert_eq!(result.next_attempt_plan.len(), 3);
    }

    #[test]
    fn overlong_lists_truncate_to_caps() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.phase_scores[0].bullets = (0..9).map(|i| format!("b{i}")).collect();
        result.next_attempt_plan.push(NextAttemptItem {
            what_went_wrong: "extra".into(),
            do_next_time: vec!["x".into()],
        });
        result.reference_outline.sections = (0..8)
            .map(|i| ReferenceSection {
                section: format!("s{i}"),
                bullets: vec!["a".into(), "b".into(), "c".into()],
            })
            .collect();

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        enforce(&mut result, &ctx).unwrap();
        assert_eq!(result.phase_scores[0].bullets.len(), 6);
        assert_eq!(result.next_attempt_plan.len(), 3);
        assert_eq!(result.reference_outline.sections.len(), 6);
    }

    #[test]
    fn unrepairable_questions_fail_with_field_tag() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.follow_up_questions.truncate(1);

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        let err = enforce(&mut result, &ctx).unwrap_err();
        assert_eq!(err.to_string(), "contract_violation: follow_up_questions");
    }

    #[test]
    fn short_outline_fails() {
        let judgements = judgements();
        let defs = defs();
        let mut result = valid_result(&judgements, &defs);
        result.reference_outline.sections.truncate(2);

        let ctx = GuardContext {
            judgements: &judgements,
            rubric_defs: &defs,
        };
        let err = enforce(&mut result, &ctx).unwrap_err();
        assert_eq!(err.to_string(), "contract_violation: reference_outline");
    }
}
