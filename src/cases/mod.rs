//! Declared test cases
//!
//! A [`CaseSpec`] is one case exactly as the case file declares it, before any
//! matcher is built or the program is run.

pub mod parser;

pub use parser::{CaseFileParser, Diagnostic, ParseOutcome};

/// One declared test case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseSpec {
    /// Human label (`case=`)
    pub description: String,
    /// Text fed to the program's stdin
    pub input: String,
    /// Raw expected outputs, classified into matchers later
    pub outputs: Vec<String>,
    /// Explicit grade reduction; `None` means the default share
    pub grade_reduction: Option<f32>,
    /// Shown instead of the generic output diff on failure
    pub fail_message: Option<String>,
    /// Executable overriding the submission binary
    pub program_to_run: Option<String>,
    /// Arguments passed to the program
    pub program_args: Vec<String>,
    /// Expected exit code; `None` when the exit code is not tested
    pub expected_exit_code: Option<i32>,
    /// Variation tag, trimmed and lower-cased; empty for every variation
    pub variation: String,
}

impl CaseSpec {
    /// Whether this case belongs to the run with `active` variation.
    pub fn applies_to(&self, active: &str) -> bool {
        self.variation.is_empty() || self.variation == active
    }
}
