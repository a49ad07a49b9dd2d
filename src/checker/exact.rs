//! Quoted exact-text expectations: `"text"` or the end-anchored `*"text"`.

use crate::core::utils::trim;

#[derive(Debug, Clone)]
pub struct ExactText {
    expected: String,
    anchored: bool,
}

impl ExactText {
    /// `"..."` or `*"..."` after trimming.
    pub fn is_shape(text: &str) -> bool {
        let clean = trim(text);
        (clean.len() > 1 && clean.starts_with('"') && clean.ends_with('"'))
            || (clean.len() > 3 && clean.starts_with("*\"") && clean.ends_with('"'))
    }

    pub fn new(text: &str) -> Self {
        let clean = trim(text);
        let (anchored, inner) = if clean.len() > 2 && clean.starts_with('*') {
            (true, clean.get(2..clean.len() - 1))
        } else {
            (false, clean.get(1..clean.len().saturating_sub(1)))
        };
        Self {
            expected: inner.unwrap_or_default().to_string(),
            anchored,
        }
    }

    /// Quote-stripped text the program should print.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn matches(&self, output: &str) -> bool {
        if self.expected == output {
            return true;
        }
        let mut output = output;
        if !self.expected.is_empty() && !self.expected.ends_with('\n') {
            output = output.strip_suffix('\n').unwrap_or(output);
        }
        if self.anchored && self.expected.len() < output.len() {
            output.ends_with(self.expected.as_str())
        } else {
            self.expected == output
        }
    }
}
