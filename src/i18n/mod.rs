//! Message translation
//!
//! Every text the harness emits is looked up by a numeric message id through a
//! [`Translator`]. The bundled [`Catalog`] reads JSON message files, and can
//! carry an optional [`Enhancer`] that rewrites raw program lines into friendlier
//! explanations.

pub mod catalog;
pub mod enhance;

use std::borrow::Cow;
use std::fmt::Display;

pub use catalog::Catalog;
pub use enhance::Enhancer;

/// Identifier of every message the harness can emit.
///
/// The numeric codes are the keys of the JSON catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    NumbersType,
    TextType,
    ExactTextType,
    InvalidRegex,
    RegexType,
    TestTitle,
    NoOutputSpecified,
    Timeout,
    OutputTooLarge,
    ExitCodeMismatch,
    IncorrectOutput,
    InputHeader,
    ProgramOutputHeader,
    ExpectedOutputHeader,
    PipeError,
    ExecutableNotFound,
    SpawnError,
    SignalTermination,
    AbnormalTermination,
    WaitError,
    SyntaxError,
    NoTimeLeft,
    Progress,
    TestSingular,
    TestPlural,
    FailedTests,
    SummaryTitle,
    SummaryRule,
    SummaryLine,
    NoTestCase,
    StopRequested,
    UnexpectedSignal,
    InvalidRegexFlag,
}

impl MessageId {
    pub const ALL: [MessageId; 33] = [
        MessageId::NumbersType,
        MessageId::TextType,
        MessageId::ExactTextType,
        MessageId::InvalidRegex,
        MessageId::RegexType,
        MessageId::TestTitle,
        MessageId::NoOutputSpecified,
        MessageId::Timeout,
        MessageId::OutputTooLarge,
        MessageId::ExitCodeMismatch,
        MessageId::IncorrectOutput,
        MessageId::InputHeader,
        MessageId::ProgramOutputHeader,
        MessageId::ExpectedOutputHeader,
        MessageId::PipeError,
        MessageId::ExecutableNotFound,
        MessageId::SpawnError,
        MessageId::SignalTermination,
        MessageId::AbnormalTermination,
        MessageId::WaitError,
        MessageId::SyntaxError,
        MessageId::NoTimeLeft,
        MessageId::Progress,
        MessageId::TestSingular,
        MessageId::TestPlural,
        MessageId::FailedTests,
        MessageId::SummaryTitle,
        MessageId::SummaryRule,
        MessageId::SummaryLine,
        MessageId::NoTestCase,
        MessageId::StopRequested,
        MessageId::UnexpectedSignal,
        MessageId::InvalidRegexFlag,
    ];

    /// Numeric catalog key.
    pub fn code(self) -> u32 {
        match self {
            MessageId::NumbersType => 3,
            MessageId::TextType => 4,
            MessageId::ExactTextType => 5,
            MessageId::InvalidRegex => 7,
            MessageId::RegexType => 9,
            MessageId::TestTitle => 10,
            MessageId::NoOutputSpecified => 11,
            MessageId::Timeout => 12,
            MessageId::OutputTooLarge => 13,
            MessageId::ExitCodeMismatch => 14,
            MessageId::IncorrectOutput => 15,
            MessageId::InputHeader => 16,
            MessageId::ProgramOutputHeader => 17,
            MessageId::ExpectedOutputHeader => 18,
            MessageId::PipeError => 19,
            MessageId::ExecutableNotFound => 20,
            MessageId::SpawnError => 21,
            MessageId::SignalTermination => 23,
            MessageId::AbnormalTermination => 24,
            MessageId::WaitError => 25,
            MessageId::SyntaxError => 26,
            MessageId::NoTimeLeft => 27,
            MessageId::Progress => 28,
            MessageId::TestSingular => 29,
            MessageId::TestPlural => 30,
            MessageId::FailedTests => 31,
            MessageId::SummaryTitle => 32,
            MessageId::SummaryRule => 33,
            MessageId::SummaryLine => 34,
            MessageId::NoTestCase => 36,
            MessageId::StopRequested => 37,
            MessageId::UnexpectedSignal => 38,
            MessageId::InvalidRegexFlag => 39,
        }
    }
}

/// Message lookup capability consumed by the grading engine.
pub trait Translator: Send + Sync {
    /// Template for `id`. Implementations guarantee every id resolves.
    fn message(&self, id: MessageId) -> &str;

    /// Template for `id` with its `{}` holes filled in order.
    fn format(&self, id: MessageId, args: &[&dyn Display]) -> String {
        fill(self.message(id), args)
    }

    /// Rewrite one line of program text for display. Identity by default.
    fn enhance<'a>(&self, line: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(line)
    }
}

/// Substitute `{}` holes left to right. Missing arguments leave the hole empty.
pub fn fill(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        if let Some(arg) = args.next() {
            out.push_str(&arg.to_string());
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Format multi-line program text for a comment body: every line is passed
/// through [`Translator::enhance`] and terminated with `\n`.
pub fn case_format(text: &str, translator: &dyn Translator) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    for line in crate::core::utils::split_lines(text) {
        out.push_str(&translator.enhance(line));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fill_positional() {
        assert_eq!(fill("Test {}: {}", &[&3, &"sum"]), "Test 3: sum");
        assert_eq!(fill("{} and {}", &[&1]), "1 and ");
        assert_eq!(fill("plain", &[&1]), "plain");
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<u32> = MessageId::ALL.iter().map(|id| id.code()).collect();
        assert_eq!(codes.len(), MessageId::ALL.len());
    }

    #[test]
    fn test_case_format_terminates_lines() {
        let catalog = Catalog::english().unwrap();
        assert_eq!(case_format("a\r\nb", &catalog), "a\nb\n");
        assert_eq!(case_format("", &catalog), "");
    }
}
