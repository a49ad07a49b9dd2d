//! Output matchers
//!
//! Each expected output declared in a case file becomes exactly one
//! [`OutputMatcher`], chosen by the shape of the raw text:
//!
//! 1. `/pattern/flags` - regular expression
//! 2. `"text"` or `*"text"` - exact text
//! 3. only numbers (optionally `*`-anchored) - numeric sequence
//! 4. anything else - free text
//!
//! Matchers never fail at match time; malformed regular expressions are
//! rejected when the matcher is built.

pub mod exact;
pub mod numbers;
pub mod pattern;
pub mod text;

use crate::error::EvaluationError;
use crate::i18n::MessageId;

pub use exact::ExactText;
pub use numbers::NumbersOutput;
pub use pattern::RegexOutput;
pub use text::TextOutput;

#[derive(Debug, Clone)]
pub enum OutputMatcher {
    RegularExpression(RegexOutput),
    ExactText(ExactText),
    NumericSequence(NumbersOutput),
    FreeText(TextOutput),
}

impl OutputMatcher {
    /// Build the matcher for one raw expected output of case `case`.
    pub fn classify(raw: &str, case: &str) -> Result<Self, EvaluationError> {
        let matcher = if RegexOutput::is_shape(raw) {
            OutputMatcher::RegularExpression(RegexOutput::new(raw, case)?)
        } else if ExactText::is_shape(raw) {
            OutputMatcher::ExactText(ExactText::new(raw))
        } else if NumbersOutput::is_shape(raw) {
            OutputMatcher::NumericSequence(NumbersOutput::new(raw))
        } else {
            OutputMatcher::FreeText(TextOutput::new(raw))
        };
        Ok(matcher)
    }

    pub fn matches(&self, output: &str) -> bool {
        match self {
            OutputMatcher::RegularExpression(m) => m.matches(output),
            OutputMatcher::ExactText(m) => m.matches(output),
            OutputMatcher::NumericSequence(m) => m.matches(output),
            OutputMatcher::FreeText(m) => m.matches(output),
        }
    }

    /// Expected output as shown to the student in a failure comment.
    pub fn expected(&self) -> &str {
        match self {
            OutputMatcher::RegularExpression(m) => m.expected(),
            OutputMatcher::ExactText(m) => m.expected(),
            OutputMatcher::NumericSequence(m) => m.expected(),
            OutputMatcher::FreeText(m) => m.expected(),
        }
    }

    /// Message naming the kind of expectation.
    pub fn kind_message(&self) -> MessageId {
        match self {
            OutputMatcher::RegularExpression(_) => MessageId::RegexType,
            OutputMatcher::ExactText(_) => MessageId::ExactTextType,
            OutputMatcher::NumericSequence(_) => MessageId::NumbersType,
            OutputMatcher::FreeText(_) => MessageId::TextType,
        }
    }
}
