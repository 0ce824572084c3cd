//! Phase vocabulary and score-derived enums
//!
//! The four interview phases are a fixed, ordered set. Every ordered
//! structure in the contract (phase_scores, evidence, event emission) uses
//! `PHASE_ORDER`; every weighted computation indexes scores by that order.

use serde::{Deserialize, Serialize};

/// One of the four timed interview phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Clarify,
    Estimate,
    Design,
    Explain,
}

/// Canonical phase ordering used everywhere a phase sequence appears
pub const PHASE_ORDER: [Phase; 4] = [
    Phase::Clarify,
    Phase::Estimate,
    Phase::Design,
    Phase::Explain,
];

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Clarify => "clarify",
            Phase::Estimate => "estimate",
            Phase::Design => "design",
            Phase::Explain => "explain",
        }
    }

    /// Position within `PHASE_ORDER`
    pub fn index(&self) -> usize {
        match self {
            Phase::Clarify => 0,
            Phase::Estimate => 1,
            Phase::Design => 2,
            Phase::Explain => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clarify" => Some(Phase::Clarify),
            "estimate" => Some(Phase::Estimate),
            "design" => Some(Phase::Design),
            "explain" => Some(Phase::Explain),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::parse(s).ok_or_else(|| crate::Error::unknown("phase", s))
    }
}

/// Aggregate skill dimensions shown on the radar chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Clarity,
    Structure,
    Power,
    Wisdom,
}

/// Canonical radar ordering
pub const SKILL_ORDER: [Skill; 4] = [
    Skill::Clarity,
    Skill::Structure,
    Skill::Power,
    Skill::Wisdom,
];

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Clarity => "clarity",
            Skill::Structure => "structure",
            Skill::Power => "power",
            Skill::Wisdom => "wisdom",
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hiring recommendation derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "hire")]
    Hire,
    #[serde(rename = "maybe")]
    Maybe,
    #[serde(rename = "no-hire")]
    NoHire,
}

impl Verdict {
    /// Threshold mapping: hire >= 7.5, maybe >= 5.0, otherwise no-hire
    pub fn from_score(score: f64) -> Self {
        if score >= 7.5 {
            Verdict::Hire
        } else if score >= 5.0 {
            Verdict::Maybe
        } else {
            Verdict::NoHire
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Hire => "hire",
            Verdict::Maybe => "maybe",
            Verdict::NoHire => "no-hire",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass/partial/fail classification for a rubric criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubricStatus {
    Pass,
    Partial,
    Fail,
}

impl RubricStatus {
    /// Threshold mapping: pass >= 8.0, partial >= 5.0, otherwise fail
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            RubricStatus::Pass
        } else if score >= 5.0 {
            RubricStatus::Partial
        } else {
            RubricStatus::Fail
        }
    }
}

/// Difficulty tiers shown in the problem browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Apprentice,
    Sorcerer,
    Archmage,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Apprentice => "apprentice",
            Difficulty::Sorcerer => "sorcerer",
            Difficulty::Archmage => "archmage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apprentice" => Some(Difficulty::Apprentice),
            "sorcerer" => Some(Difficulty::Sorcerer),
            "archmage" => Some(Difficulty::Archmage),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order_is_fixed() {
        let names: Vec<&str> = PHASE_ORDER.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, ["clarify", "estimate", "design", "explain"]);
        for (i, phase) in PHASE_ORDER.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
    }

    #[test]
    fn phase_round_trips_through_serde() {
        for phase in PHASE_ORDER {
            let json = serde_json::to_string(&phase).unwrap();
            let back: Phase = serde_json::from_str(&json).unwrap();
            assert_eq!(phase, back);
        }
    }

    #[test]
    fn verdict_thresholds() {
        // 7.5 exactly is a hire, 5.0 exactly is a maybe
        assert_eq!(Verdict::from_score(7.5), Verdict::Hire);
        assert_eq!(Verdict::from_score(7.49), Verdict::Maybe);
        assert_eq!(Verdict::from_score(5.0), Verdict::Maybe);
        assert_eq!(Verdict::from_score(4.99), Verdict::NoHire);
        assert_eq!(Verdict::from_score(10.0), Verdict::Hire);
        assert_eq!(Verdict::from_score(0.0), Verdict::NoHire);
    }

    #[test]
    fn verdict_serializes_lowercase_with_dash() {
        assert_eq!(serde_json::to_string(&Verdict::NoHire).unwrap(), "\"no-hire\"");
        assert_eq!(serde_json::to_string(&Verdict::Hire).unwrap(), "\"hire\"");
    }

    #[test]
    fn rubric_status_thresholds() {
        assert_eq!(RubricStatus::from_score(8.0), RubricStatus::Pass);
        assert_eq!(RubricStatus::from_score(7.999), RubricStatus::Partial);
        assert_eq!(RubricStatus::from_score(5.0), RubricStatus::Partial);
        assert_eq!(RubricStatus::from_score(4.999), RubricStatus::Fail);
    }
}
