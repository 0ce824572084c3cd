//! Shared error type for the contract crate
//!
//! Everything in tribunal-common is vocabulary and configuration, so the
//! error surface is narrow: a name outside one of the fixed contract
//! vocabularies, a definition that breaks a contract invariant, or a
//! configuration knob that failed to resolve. Anything operational
//! (database, provider, pipeline) belongs to the grader's own error types.

use thiserror::Error;

/// Result type for contract and configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the shared contract types
#[derive(Error, Debug)]
pub enum Error {
    /// A value outside one of the fixed vocabularies
    /// (phase, radar skill, stream status, verdict, difficulty)
    #[error("unknown {vocabulary} '{value}'")]
    UnknownName {
        vocabulary: &'static str,
        value: String,
    },

    /// A rubric definition or result document violating a contract invariant
    #[error("contract invalid: {0}")]
    ContractInvalid(String),

    /// A configuration knob could not be resolved
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for vocabulary parse failures
    pub fn unknown(vocabulary: &'static str, value: impl Into<String>) -> Self {
        Error::UnknownName {
            vocabulary,
            value: value.into(),
        }
    }
}
