//! LLM evaluator stages
//!
//! Every stage shares one shape: a prompt template, input bindings from the
//! run's scratch state, a strict JSON output contract, and an output slot
//! the driver assigns. Model output is treated as an opaque text document:
//! fencing is stripped, then the document either parses and validates or
//! the stage fails with its reason tag.

pub mod assembler;
pub mod guard;
pub mod phase;
pub mod plan_outline;
pub mod rubric_radar;

use serde::de::DeserializeOwned;

use crate::error::PipelineError;

/// Strip markdown code fences some models wrap around JSON output
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") up to the first newline
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a stage's JSON output, tagging failures with the stage name
pub fn parse_stage_output<T: DeserializeOwned>(
    stage: &str,
    raw: &str,
) -> Result<T, PipelineError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| {
        PipelineError::agent(
            stage,
            anyhow::anyhow!("output is not valid JSON for its contract: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_passes_through() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");

        let bare_fence = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(bare_fence), "{\"a\": 1}");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(strip_code_fences("  \n{\"a\": 1}\n  "), "{\"a\": 1}");
    }

    #[test]
    fn parse_failure_carries_stage_tag() {
        let err = parse_stage_output::<serde_json::Value>("clarify", "not json at all")
            .unwrap_err();
        assert_eq!(err.to_string(), "agent_execution_failed: clarify");
    }

    #[test]
    fn parse_accepts_fenced_output() {
        let value: serde_json::Value =
            parse_stage_output("clarify", "```json\n{\"score\": 7.5}\n```").unwrap();
        assert_eq!(value["score"], 7.5);
    }
}
