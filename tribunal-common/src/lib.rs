//! tribunal-common - Shared types for the Tribunal grading service
//!
//! Carries everything both the grader and its clients agree on:
//! - the four-phase vocabulary and derived enums (verdict, rubric status, radar skills)
//! - the version-2 result contract delivered to frontends
//! - stream status values and the legacy v1 status mapping
//! - configuration resolution and the common error type

pub mod config;
pub mod contract;
pub mod error;
pub mod phase;
pub mod status;

pub use error::{Error, Result};
pub use phase::{Phase, RubricStatus, Skill, Verdict, PHASE_ORDER, SKILL_ORDER};
pub use status::StreamStatus;
