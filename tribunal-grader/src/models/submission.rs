//! Submission lifecycle and artifact models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tribunal_common::contract::SubmissionResult;
use tribunal_common::Phase;
use uuid::Uuid;

/// Lifecycle states for a submission.
///
/// `queued → processing → complete | failed`. Terminal states are absorbing:
/// the registry refuses further transitions once one is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Queued,
    Processing,
    Complete,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Complete => "complete",
            SubmissionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(SubmissionStatus::Queued),
            "processing" => Some(SubmissionStatus::Processing),
            "complete" => Some(SubmissionStatus::Complete),
            "failed" => Some(SubmissionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Complete | SubmissionStatus::Failed)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary submission record.
///
/// Invariants: `phase_times` holds exactly the four phase keys;
/// `completed_at` is set iff the status is terminal; `complete` implies a
/// cached result that passed the contract guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub problem_id: String,
    pub status: SubmissionStatus,
    /// Client-supplied elapsed seconds per phase
    pub phase_times: BTreeMap<Phase, u64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Final result document, cached on successful completion
    pub result: Option<SubmissionResult>,
}

/// Stored artifact references for one (submission, phase)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseArtifact {
    pub phase: Phase,
    pub canvas_url: String,
    pub canvas_mime: String,
    pub audio_url: Option<String>,
    pub audio_mime: Option<String>,
}

/// One persisted transcript snippet row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub phase: Phase,
    pub timestamp_sec: f64,
    pub text: String,
    pub is_highlight: bool,
}
