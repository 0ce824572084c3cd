//! Version-2 result contract
//!
//! The exact JSON document delivered to clients once grading completes.
//! Cardinality and ordering rules are enforced by the grader's contract
//! guard before any result is cached:
//! - `phase_scores` and `evidence`: exactly four entries in phase order
//! - `radar`: exactly the four skills clarity, structure, power, wisdom
//! - `next_attempt_plan`: exactly three items
//! - `follow_up_questions`: at least three entries
//! - `verdict`: lowercase enum, `result_version`: always 2

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::{Phase, RubricStatus, Skill, Verdict};

/// Contract version stamped into every result document
pub const RESULT_VERSION: u32 = 2;

/// Timestamped transcript segment used as evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    /// Seconds from phase start, non-negative
    pub timestamp_sec: f64,
    pub text: String,
}

/// One-sentence strength/issue pair an evaluator noticed for a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceNote {
    pub strength: String,
    pub issue: String,
}

/// Evidence for a single phase: snapshot plus timestamped transcripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub phase: Phase,
    pub snapshot_url: String,
    /// Empty when the candidate recorded no audio for the phase
    #[serde(default)]
    pub transcripts: Vec<TranscriptSnippet>,
    #[serde(default)]
    pub noticed: Option<EvidenceNote>,
}

/// Score and feedback bullets for a single phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseScore {
    pub phase: Phase,
    /// 0-10, decimals allowed
    pub score: f64,
    /// 3-6 concise feedback bullets
    pub bullets: Vec<String>,
}

/// Weighted rubric criterion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
    pub label: String,
    pub description: String,
    /// Sorted list of phases carrying weight for this criterion
    pub computed_from: Vec<Phase>,
    pub score: f64,
    pub status: RubricStatus,
}

/// One radar chart dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarDimension {
    pub dimension: Skill,
    pub score: f64,
}

/// Phase-tagged observation, timestamped when tied to a transcript moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthWeakness {
    pub phase: Phase,
    pub text: String,
    #[serde(default)]
    pub timestamp_sec: Option<f64>,
}

/// Improvement plan entry for the next attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAttemptItem {
    /// 1-2 sentences describing the gap
    pub what_went_wrong: String,
    /// 2-3 actionable bullets
    pub do_next_time: Vec<String>,
}

/// Section in the reference solution outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSection {
    pub section: String,
    /// 3-6 key points
    pub bullets: Vec<String>,
}

/// Reference solution skeleton, 4-6 sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceOutline {
    pub sections: Vec<ReferenceSection>,
}

/// Problem metadata embedded in the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemRef {
    pub id: String,
    pub name: String,
    pub difficulty: String,
}

/// Complete grading result, contract version 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub result_version: u32,
    pub submission_id: String,
    pub problem: ProblemRef,
    pub overall_score: f64,
    pub verdict: Verdict,
    pub summary: String,
    pub phase_scores: Vec<PhaseScore>,
    pub evidence: Vec<EvidenceItem>,
    pub rubric: Vec<RubricItem>,
    pub radar: Vec<RadarDimension>,
    pub strengths: Vec<StrengthWeakness>,
    pub weaknesses: Vec<StrengthWeakness>,
    /// Key transcript moments worth replaying
    #[serde(default)]
    pub highlights: Vec<StrengthWeakness>,
    pub next_attempt_plan: Vec<NextAttemptItem>,
    pub follow_up_questions: Vec<String>,
    pub reference_outline: ReferenceOutline,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}
