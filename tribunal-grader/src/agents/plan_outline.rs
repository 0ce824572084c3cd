//! Plan/outline generation
//!
//! Produces the improvement plan, follow-up questions, and reference
//! outline from the phase judgements and the aggregated scores. Advice is
//! expected to be problem-specific; cardinality is validated here and
//! repaired, where allowed, by the contract guard.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tribunal_common::contract::{NextAttemptItem, ReferenceOutline};

use crate::error::PipelineError;
use crate::models::Problem;
use crate::providers::LanguageModel;

use super::parse_stage_output;
use super::phase::PhaseJudgement;
use super::rubric_radar::RubricRadar;

const STAGE: &str = "plan_outline";

/// Improvement guidance and reference solution skeleton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutline {
    pub next_attempt_plan: Vec<NextAttemptItem>,
    pub follow_up_questions: Vec<String>,
    pub reference_outline: ReferenceOutline,
}

impl PlanOutline {
    /// Contract checks: exactly 3 plan items, >= 3 questions, 4-6 sections
    pub fn validate(&self) -> Result<(), String> {
        if self.next_attempt_plan.len() != 3 {
            return Err(format!(
                "expected exactly 3 next_attempt_plan items, got {}",
                self.next_attempt_plan.len()
            ));
        }
        if self.follow_up_questions.len() < 3 {
            return Err(format!(
                "expected at least 3 follow_up_questions, got {}",
                self.follow_up_questions.len()
            ));
        }
        let sections = self.reference_outline.sections.len();
        if !(4..=6).contains(&sections) {
            return Err(format!(
                "expected 4-6 reference outline sections, got {sections}"
            ));
        }
        Ok(())
    }
}

/// Run the plan/outline stage
pub async fn generate(
    llm: &dyn LanguageModel,
    problem: &Problem,
    judgements: &[PhaseJudgement; 4],
    rubric_radar: &RubricRadar,
) -> Result<PlanOutline, PipelineError> {
    let prompt = prompt(problem, judgements, rubric_radar);
    let raw = llm
        .generate_json(&prompt)
        .await
        .map_err(|e| PipelineError::agent(STAGE, anyhow::anyhow!(e)))?;

    let output: PlanOutline = parse_stage_output(STAGE, &raw)?;
    output
        .validate()
        .map_err(|msg| PipelineError::agent(STAGE, anyhow::anyhow!(msg)))?;

    Ok(output)
}

fn prompt(
    problem: &Problem,
    judgements: &[PhaseJudgement; 4],
    rubric_radar: &RubricRadar,
) -> String {
    let mut p = String::new();
    let _ = writeln!(
        p,
        "You are generating improvement guidance after a system-design interview. \
         Be specific to this problem and this candidate's performance; generic advice \
         is a defect."
    );
    let _ = writeln!(p, "\n## Problem\n{}\n{}", problem.title, problem.prompt);

    let _ = writeln!(p, "\n## Phase results");
    for j in judgements {
        let _ = writeln!(p, "### {} (score {:.1})", j.phase, j.score);
        for w in &j.weaknesses {
            let _ = writeln!(p, "- weakness: {}", w.text);
        }
        for s in &j.strengths {
            let _ = writeln!(p, "- strength: {}", s.text);
        }
    }

    let _ = writeln!(
        p,
        "\n## Aggregate\noverall {:.1}, verdict {}",
        rubric_radar.overall_score, rubric_radar.verdict
    );
    for item in &rubric_radar.rubric {
        let _ = writeln!(p, "- rubric '{}': {:.2} ({:?})", item.label, item.score, item.status);
    }

    let _ = writeln!(
        p,
        r#"
## Output contract (strict JSON, no markdown)
{{
  "next_attempt_plan": [
    {{"what_went_wrong": <1-2 sentences>, "do_next_time": [<2-3 actionable bullets>]}},
    ... exactly 3 items, ordered by impact on the lowest rubric scores ...
  ],
  "follow_up_questions": [<at least 3 interview-style questions building on
    partial understanding or unexplored edges>],
  "reference_outline": {{
    "sections": [{{"section": <name>, "bullets": [<3-6 concise technical points>]}},
                 ... 4-6 sections covering a strong reference solution ...]
  }}
}}"#
    );

    p
}
