//! Error types
//!
//! [`EvaluationError`] covers the fatal evaluation outcomes: they stop any
//! further case execution but still end in a report. [`CatalogError`] covers
//! translator initialization, the only failure that makes the process exit
//! unsuccessfully.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::StopReason;
use crate::i18n::{MessageId, Translator};

#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Global time budget exhausted before a case could start.
    #[error("no time left to run the remaining cases")]
    NoTimeLeft,

    /// A regular-expression output carries a flag other than `i`, `m` or space.
    #[error("invalid regular expression flag {flag:?} in case {case:?}")]
    InvalidRegexFlag { case: String, flag: char },

    /// A regular-expression output does not compile.
    #[error("invalid regular expression in case {case:?}")]
    InvalidRegex {
        case: String,
        #[source]
        source: regex::Error,
    },

    /// The harness received an external stop request.
    #[error("evaluation interrupted ({0})")]
    Interrupted(StopReason),
}

impl EvaluationError {
    /// Render the report text for this error.
    pub fn describe(&self, translator: &dyn Translator) -> String {
        match self {
            EvaluationError::NoTimeLeft => translator.message(MessageId::NoTimeLeft).to_string(),
            EvaluationError::InvalidRegexFlag { case, flag } => {
                translator.format(MessageId::InvalidRegexFlag, &[case, flag])
            }
            EvaluationError::InvalidRegex { case, source } => {
                translator.format(MessageId::InvalidRegex, &[case, source])
            }
            EvaluationError::Interrupted(StopReason::Terminate) => {
                translator.message(MessageId::StopRequested).to_string()
            }
            EvaluationError::Interrupted(StopReason::Signal) => {
                translator.message(MessageId::UnexpectedSignal).to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read message file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse message file {origin}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("message catalog {origin} has no entry for id {code}")]
    MissingMessage { origin: String, code: u32 },
}
