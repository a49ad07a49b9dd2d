//! Regular-expression expectations written as `/pattern/flags`.
//!
//! Flags: `i` (case-insensitive) and `m` (newline-sensitive: `^`/`$` match at
//! line boundaries and `.` stops at newlines). Without `m` the pattern sees the
//! whole output as one string, `.` included.

use regex::{Regex, RegexBuilder};

use crate::core::utils::trim;
use crate::error::EvaluationError;

#[derive(Debug, Clone)]
pub struct RegexOutput {
    source: String,
    regex: Regex,
}

impl RegexOutput {
    /// Starts with `/` and has a later `/`.
    pub fn is_shape(text: &str) -> bool {
        let clean = trim(text);
        clean.len() > 2 && clean.starts_with('/') && clean[1..].contains('/')
    }

    /// Compile the expectation. Errors are configuration errors of `case`.
    pub fn new(text: &str, case: &str) -> Result<Self, EvaluationError> {
        let clean = trim(text);
        let close = clean.rfind('/').filter(|&pos| pos > 0).unwrap_or(clean.len());
        let source = clean.get(1..close).unwrap_or_default().to_string();

        let mut case_insensitive = false;
        let mut multi_line = false;
        for flag in clean.get(close + 1..).unwrap_or_default().chars() {
            match flag {
                'i' => case_insensitive = true,
                'm' => multi_line = true,
                ' ' => {}
                other => {
                    return Err(EvaluationError::InvalidRegexFlag {
                        case: case.to_string(),
                        flag: other,
                    })
                }
            }
        }

        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .multi_line(multi_line)
            .dot_matches_new_line(!multi_line)
            .build()
            .map_err(|source| EvaluationError::InvalidRegex {
                case: case.to_string(),
                source,
            })?;

        Ok(Self { source, regex })
    }

    /// Pattern without delimiters and flags.
    pub fn expected(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, output: &str) -> bool {
        self.regex.is_match(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        assert!(RegexOutput::is_shape("/a/"));
        assert!(RegexOutput::is_shape(" /^[0-9]+$/m "));
        assert!(!RegexOutput::is_shape("/a"));
        assert!(!RegexOutput::is_shape("//"));
        assert!(!RegexOutput::is_shape("a/b/"));
    }

    #[test]
    fn test_multiline_anchors() {
        let m = RegexOutput::new("/^[0-9]+$/m", "c").unwrap();
        assert_eq!(m.expected(), "^[0-9]+$");
        assert!(m.matches("42"));
        assert!(!m.matches("42a"));
        assert!(m.matches("abc\n42\n"));
    }

    #[test]
    fn test_unanchored_search() {
        let m = RegexOutput::new("/sum = [0-9]+/", "c").unwrap();
        assert!(m.matches("the sum = 12 ok"));
        assert!(!m.matches("total 12"));
    }

    #[test]
    fn test_whole_output_anchors_without_m() {
        let m = RegexOutput::new("/^a.b$/", "c").unwrap();
        assert!(m.matches("a\nb"));
        assert!(!m.matches("x\na\nb"));
    }

    #[test]
    fn test_case_insensitive_flag() {
        let m = RegexOutput::new("/hello/ i", "c").unwrap();
        assert!(m.matches("HeLLo"));
    }

    #[test]
    fn test_invalid_flag_is_error() {
        let err = RegexOutput::new("/a/x", "bad case").unwrap_err();
        match err {
            EvaluationError::InvalidRegexFlag { case, flag } => {
                assert_eq!(case, "bad case");
                assert_eq!(flag, 'x');
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_malformed_pattern_is_error() {
        assert!(matches!(
            RegexOutput::new("/a(b/", "c"),
            Err(EvaluationError::InvalidRegex { .. })
        ));
    }
}
