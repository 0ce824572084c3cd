//! Per-run scratch state
//!
//! Holds the typed output slots of a single pipeline run. Only the driver
//! writes to it: agents return values, the driver assigns them, so there is
//! no implicit ordering coupling between stages. The session lives on the
//! driver's stack and is released on every exit path when it drops.

use tribunal_common::{Phase, PHASE_ORDER};
use uuid::Uuid;

use crate::agents::phase::PhaseJudgement;
use crate::agents::plan_outline::PlanOutline;
use crate::agents::rubric_radar::{PhaseScores, RubricRadar};
use crate::error::PipelineError;

/// Scratch slots for one grading run
pub struct ScratchSession {
    submission_id: Uuid,
    judgements: [Option<PhaseJudgement>; 4],
    pub rubric_radar: Option<RubricRadar>,
    pub plan_outline: Option<PlanOutline>,
}

impl ScratchSession {
    pub fn new(submission_id: Uuid) -> Self {
        tracing::debug!(submission_id = %submission_id, "Scratch session acquired");
        Self {
            submission_id,
            judgements: [None, None, None, None],
            rubric_radar: None,
            plan_outline: None,
        }
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    /// Assign one phase slot; the driver is the single writer
    pub fn set_judgement(&mut self, judgement: PhaseJudgement) {
        let index = judgement.phase.index();
        self.judgements[index] = Some(judgement);
    }

    pub fn judgement(&self, phase: Phase) -> Option<&PhaseJudgement> {
        self.judgements[phase.index()].as_ref()
    }

    /// All four judgements in phase order; an empty slot fails the pipeline
    pub fn judgements(&self) -> Result<[&PhaseJudgement; 4], PipelineError> {
        let mut out = Vec::with_capacity(4);
        for phase in PHASE_ORDER {
            match self.judgements[phase.index()].as_ref() {
                Some(j) => out.push(j),
                None => return Err(PipelineError::MissingPhaseOutput { phase }),
            }
        }
        Ok([out[0], out[1], out[2], out[3]])
    }

    /// Clone the four judgements out in phase order
    pub fn judgement_array(&self) -> Result<[PhaseJudgement; 4], PipelineError> {
        let refs = self.judgements()?;
        Ok([
            refs[0].clone(),
            refs[1].clone(),
            refs[2].clone(),
            refs[3].clone(),
        ])
    }

    /// Phase scores in phase order
    pub fn phase_scores(&self) -> Result<PhaseScores, PipelineError> {
        let refs = self.judgements()?;
        Ok([refs[0].score, refs[1].score, refs[2].score, refs[3].score])
    }
}

impl Drop for ScratchSession {
    fn drop(&mut self) {
        tracing::debug!(submission_id = %self.submission_id, "Scratch session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribunal_common::contract::{EvidenceItem, StrengthWeakness};

    fn judgement(phase: Phase, score: f64) -> PhaseJudgement {
        PhaseJudgement {
            phase,
            score,
            bullets: vec!["a".into(), "b".into(), "c".into()],
            evidence: EvidenceItem {
                phase,
                snapshot_url: "u".into(),
                transcripts: vec![],
                noticed: None,
            },
            strengths: vec![StrengthWeakness {
                phase,
                text: "s".into(),
                timestamp_sec: None,
            }],
            weaknesses: vec![StrengthWeakness {
                phase,
                text: "w".into(),
                timestamp_sec: None,
            }],
            highlights: vec![],
        }
    }

    #[test]
    fn empty_slot_is_a_missing_phase_output() {
        let mut scratch = ScratchSession::new(Uuid::new_v4());
        scratch.set_judgement(judgement(Phase::Clarify, 7.0));
        scratch.set_judgement(judgement(Phase::Estimate, 7.0));
        scratch.set_judgement(judgement(Phase::Explain, 7.0));

        let err = scratch.judgements().unwrap_err();
        assert_eq!(err.to_string(), "missing_phase_output: design");
    }

    #[test]
    fn scores_come_back_in_phase_order() {
        let mut scratch = ScratchSession::new(Uuid::new_v4());
        // Insertion order does not matter; slots are phase-indexed
        scratch.set_judgement(judgement(Phase::Explain, 9.0));
        scratch.set_judgement(judgement(Phase::Clarify, 8.0));
        scratch.set_judgement(judgement(Phase::Design, 6.0));
        scratch.set_judgement(judgement(Phase::Estimate, 7.5));

        assert_eq!(scratch.phase_scores().unwrap(), [8.0, 7.5, 6.0, 9.0]);
    }
}
