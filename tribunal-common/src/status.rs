//! Stream status values and the legacy v1 status mapping
//!
//! The progress stream emits one status per event. V1 clients used
//! dimension-oriented names (scoping, scale, tradeoff); the mapping here is
//! bijective on the shared subset so old dashboards keep working. The
//! v2-only queued/processing statuses have no legacy equivalent.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Status values carried by grading progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Queued,
    Processing,
    Clarify,
    Estimate,
    Design,
    Explain,
    Synthesizing,
    Complete,
    Failed,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Queued => "queued",
            StreamStatus::Processing => "processing",
            StreamStatus::Clarify => "clarify",
            StreamStatus::Estimate => "estimate",
            StreamStatus::Design => "design",
            StreamStatus::Explain => "explain",
            StreamStatus::Synthesizing => "synthesizing",
            StreamStatus::Complete => "complete",
            StreamStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(StreamStatus::Queued),
            "processing" => Some(StreamStatus::Processing),
            "clarify" => Some(StreamStatus::Clarify),
            "estimate" => Some(StreamStatus::Estimate),
            "design" => Some(StreamStatus::Design),
            "explain" => Some(StreamStatus::Explain),
            "synthesizing" => Some(StreamStatus::Synthesizing),
            "complete" => Some(StreamStatus::Complete),
            "failed" => Some(StreamStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses end the event trace; at most one per submission
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamStatus::Complete | StreamStatus::Failed)
    }

    /// The phase this status tags, when it is a phase status
    pub fn phase(&self) -> Option<Phase> {
        match self {
            StreamStatus::Clarify => Some(Phase::Clarify),
            StreamStatus::Estimate => Some(Phase::Estimate),
            StreamStatus::Design => Some(Phase::Design),
            StreamStatus::Explain => Some(Phase::Explain),
            _ => None,
        }
    }
}

impl From<Phase> for StreamStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Clarify => StreamStatus::Clarify,
            Phase::Estimate => StreamStatus::Estimate,
            Phase::Design => StreamStatus::Design,
            Phase::Explain => StreamStatus::Explain,
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a v2 status to its legacy v1 name, `None` for v2-only statuses
pub fn to_legacy(status: StreamStatus) -> Option<&'static str> {
    match status {
        StreamStatus::Clarify => Some("scoping"),
        StreamStatus::Estimate => Some("scale"),
        StreamStatus::Design => Some("design"),
        StreamStatus::Explain => Some("tradeoff"),
        StreamStatus::Synthesizing => Some("synthesizing"),
        StreamStatus::Complete => Some("complete"),
        StreamStatus::Failed => Some("failed"),
        StreamStatus::Queued | StreamStatus::Processing => None,
    }
}

/// Convert a legacy v1 status name to its v2 status, `None` when unknown
pub fn from_legacy(legacy: &str) -> Option<StreamStatus> {
    match legacy {
        "scoping" => Some(StreamStatus::Clarify),
        "scale" => Some(StreamStatus::Estimate),
        "design" => Some(StreamStatus::Design),
        "tradeoff" => Some(StreamStatus::Explain),
        "synthesizing" => Some(StreamStatus::Synthesizing),
        "complete" => Some(StreamStatus::Complete),
        "failed" => Some(StreamStatus::Failed),
        _ => None,
    }
}

/// Accept either a v2 status name or a legacy v1 name
pub fn normalize(input: &str) -> crate::Result<StreamStatus> {
    StreamStatus::parse(input)
        .or_else(|| from_legacy(input))
        .ok_or_else(|| crate::Error::unknown("status", input))
}
