//! Phase evaluator panel
//!
//! Four evaluators, one per interview phase, each grading only its own
//! phase from the snapshot, transcript snippets, and problem context. All
//! four run concurrently and write to their own scratch slot; the output
//! contract is validated before the judgement is accepted.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tribunal_common::contract::{EvidenceItem, StrengthWeakness, TranscriptSnippet};
use tribunal_common::Phase;

use crate::error::PipelineError;
use crate::models::Problem;
use crate::providers::LanguageModel;

use super::parse_stage_output;

/// Strict per-phase judgement emitted by one evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseJudgement {
    pub phase: Phase,
    pub score: f64,
    pub bullets: Vec<String>,
    pub evidence: EvidenceItem,
    pub strengths: Vec<StrengthWeakness>,
    pub weaknesses: Vec<StrengthWeakness>,
    #[serde(default)]
    pub highlights: Vec<StrengthWeakness>,
}

impl PhaseJudgement {
    /// Validate the output contract for the assigned phase
    pub fn validate(&self, assigned: Phase) -> Result<(), String> {
        if self.phase != assigned {
            return Err(format!(
                "judgement is for phase '{}', expected '{assigned}'",
                self.phase
            ));
        }
        if !(0.0..=10.0).contains(&self.score) {
            return Err(format!("score {} outside [0, 10]", self.score));
        }
        if self.bullets.len() < 3 || self.bullets.len() > 6 {
            return Err(format!(
                "expected 3-6 bullets, got {}",
                self.bullets.len()
            ));
        }
        if self.evidence.phase != assigned {
            return Err(format!(
                "evidence tagged '{}', expected '{assigned}'",
                self.evidence.phase
            ));
        }
        if self.strengths.is_empty() {
            return Err("at least one strength is required".to_string());
        }
        if self.weaknesses.is_empty() {
            return Err("at least one weakness is required".to_string());
        }
        Ok(())
    }
}

/// Everything one evaluator sees about its phase
#[derive(Debug, Clone)]
pub struct PhaseInput {
    pub snapshot_url: String,
    pub transcripts: Vec<TranscriptSnippet>,
    pub phase_time_secs: u64,
}

/// One member of the evaluator panel, bound to a single phase
#[derive(Debug, Clone, Copy)]
pub struct PhaseEvaluator {
    phase: Phase,
}

impl PhaseEvaluator {
    pub fn new(phase: Phase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stage name used in failure reason tags
    pub fn stage_name(&self) -> &'static str {
        self.phase.as_str()
    }

    /// Run the evaluator and validate its judgement
    pub async fn evaluate(
        &self,
        llm: &dyn LanguageModel,
        problem: &Problem,
        input: &PhaseInput,
    ) -> Result<PhaseJudgement, PipelineError> {
        let prompt = self.prompt(problem, input);
        let raw = llm
            .generate_json(&prompt)
            .await
            .map_err(|e| PipelineError::agent(self.stage_name(), anyhow::anyhow!(e)))?;

        let judgement: PhaseJudgement = parse_stage_output(self.stage_name(), &raw)?;
        judgement
            .validate(self.phase)
            .map_err(|msg| PipelineError::agent(self.stage_name(), anyhow::anyhow!(msg)))?;

        Ok(judgement)
    }

    fn focus(&self) -> &'static str {
        match self.phase {
            Phase::Clarify => {
                "requirements gathering and problem scoping: functional vs non-functional \
                 requirements, clarifying questions about constraints and scale, MVP versus \
                 stretch features, edge cases and assumptions"
            }
            Phase::Estimate => {
                "capacity planning: storage, QPS, bandwidth and memory calculations, stated \
                 assumptions, mathematical correctness, awareness of read/write patterns and growth"
            }
            Phase::Design => {
                "high-level architecture: component identification, data flow, technology \
                 selection with justification, API design, single points of failure"
            }
            Phase::Explain => {
                "tradeoff reasoning: consistency/availability choices, comparison of \
                 alternatives, self-critique, and awareness of production concerns"
            }
        }
    }

    fn prompt(&self, problem: &Problem, input: &PhaseInput) -> String {
        let phase = self.phase;
        let mut p = String::new();

        let _ = writeln!(
            p,
            "You are an expert system-design interview evaluator. Grade ONLY the '{phase}' \
             phase of this interview. Focus areas for this phase: {}.",
            self.focus()
        );
        let _ = writeln!(p, "\n## Problem\n{} ({})", problem.title, problem.difficulty);
        let _ = writeln!(p, "{}", problem.prompt);
        if !problem.constraints.is_empty() {
            let _ = writeln!(p, "Constraints:");
            for c in &problem.constraints {
                let _ = writeln!(p, "- {c}");
            }
        }

        let _ = writeln!(
            p,
            "\n## Candidate material for the {phase} phase\nCanvas snapshot URL: {}",
            input.snapshot_url
        );
        let _ = writeln!(p, "Time spent: {} seconds", input.phase_time_secs);
        if input.transcripts.is_empty() {
            let _ = writeln!(p, "Transcript: (the candidate was silent during this phase)");
        } else {
            let _ = writeln!(p, "Transcript snippets (timestamp seconds, text):");
            for snippet in &input.transcripts {
                let _ = writeln!(p, "[{:.1}] {}", snippet.timestamp_sec, snippet.text);
            }
        }

        let _ = writeln!(
            p,
            r#"
## Output contract (strict JSON, no markdown, no prose)
Emit a single JSON object:
{{
  "phase": "{phase}",
  "score": <float 0-10>,
  "bullets": [<3-6 concise feedback strings>],
  "evidence": {{
    "phase": "{phase}",
    "snapshot_url": "{url}",
    "transcripts": [{{"timestamp_sec": <num>, "text": <string>}}],
    "noticed": {{"strength": <one sentence>, "issue": <one sentence>}}
  }},
  "strengths": [{{"phase": "{phase}", "text": <string>, "timestamp_sec": <num or null>}}],
  "weaknesses": [{{"phase": "{phase}", "text": <string>, "timestamp_sec": <num or null>}}],
  "highlights": [{{"phase": "{phase}", "text": <verbatim transcript quote>, "timestamp_sec": <num>}}]
}}
Rules: cite transcript timestamps when calling out specific moments; emit 3-6
bullets; identify 1-3 strengths and 1-2 weaknesses, timestamped when possible;
extract 0-2 highlights quoting the transcript verbatim; copy evidence
transcripts from the snippets that best support your judgement. Use the 0-10
scale where 9-10 is senior-level mastery, 7-8 solid mid-level work, 5-6 basic
competency with gaps, 3-4 significant gaps, 0-2 fundamental misunderstanding."#,
            phase = phase,
            url = input.snapshot_url,
        );

        p
    }
}
