//! Problem catalog models
//!
//! Problems are read-only inputs: prompt, constraints, and the rubric
//! definition that drives the weighted roll-ups. Rubric weights are
//! validated at load time so the aggregator can trust them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tribunal_common::{Error, Phase, Result};

/// Weight tolerance for rubric definitions; weights must sum to 1 within this
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// One rubric criterion with per-phase weights summing to 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricDefinition {
    pub label: String,
    pub description: String,
    /// Map from phase to non-negative weight; keys are the phases this
    /// criterion is computed from
    pub phase_weights: BTreeMap<Phase, f64>,
}

impl RubricDefinition {
    /// Validate weight invariants: non-negative, non-empty, sum = 1 ± 1e-6
    pub fn validate(&self) -> Result<()> {
        if self.phase_weights.is_empty() {
            return Err(Error::ContractInvalid(format!(
                "rubric item '{}' has no phase weights",
                self.label
            )));
        }
        let mut sum = 0.0;
        for (phase, weight) in &self.phase_weights {
            if *weight < 0.0 {
                return Err(Error::ContractInvalid(format!(
                    "rubric item '{}' has negative weight for phase '{phase}'",
                    self.label
                )));
            }
            sum += weight;
        }
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(Error::ContractInvalid(format!(
                "rubric item '{}' weights sum to {sum}, expected 1.0",
                self.label
            )));
        }
        Ok(())
    }

    /// Sorted phase list this criterion is derived from (fixed phase order)
    pub fn computed_from(&self) -> Vec<Phase> {
        let mut phases: Vec<Phase> = self.phase_weights.keys().copied().collect();
        phases.sort_by_key(|p| p.index());
        phases
    }
}

/// Lightweight view used for problem list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub difficulty: String,
}

/// Full problem detail with prompt and rubric definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub difficulty: String,
    pub prompt: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub rubric_definition: Vec<RubricDefinition>,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    /// Validate every rubric item's weights
    pub fn validate(&self) -> Result<()> {
        for item in &self.rubric_definition {
            item.validate()?;
        }
        Ok(())
    }

    pub fn summary(&self) -> ProblemSummary {
        ProblemSummary {
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            difficulty: self.difficulty.clone(),
        }
    }
}
