//! Report rendering
//!
//! Blocks are delimited by `<|--` and `--|>` and always come in this order:
//! no-test-case notice, failed-test titles (only with more than one failure),
//! failure details, run summary, grade line.

use super::comments::Comments;
use crate::i18n::{MessageId, Translator};

/// Line prefixes used inside report blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    Plain,
    Enhanced,
}

impl ReportStyle {
    fn list_prefix(self) -> &'static str {
        match self {
            ReportStyle::Plain => "",
            ReportStyle::Enhanced => "<comment>",
        }
    }

    fn title_prefix(self) -> &'static str {
        match self {
            ReportStyle::Plain => "-",
            ReportStyle::Enhanced => "<subTitle>",
        }
    }
}

/// What the report is rendered from.
#[derive(Debug)]
pub struct Summary<'a> {
    /// Cases left after variation filtering
    pub case_count: usize,
    pub comments: &'a Comments,
    pub runs: usize,
    pub errors: usize,
    /// `None` when grading is disabled
    pub grade: Option<f32>,
}

pub fn render(summary: &Summary<'_>, style: ReportStyle, translator: &dyn Translator) -> String {
    let mut out = String::new();
    let heading = |out: &mut String, id: MessageId| {
        out.push('-');
        out.push_str(translator.message(id));
        out.push('\n');
    };

    if summary.case_count == 0 {
        out.push_str("<|--\n");
        heading(&mut out, MessageId::NoTestCase);
        out.push_str("--|>\n");
    }

    if summary.comments.len() > 1 {
        out.push_str("\n<|--\n");
        heading(&mut out, MessageId::FailedTests);
        for comment in summary.comments.iter() {
            out.push_str(style.list_prefix());
            out.push_str(&comment.title);
            if !comment.title.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push_str("--|>\n");
    }

    if !summary.comments.is_empty() {
        out.push_str("\n<|--\n");
        for comment in summary.comments.iter() {
            out.push_str(style.title_prefix());
            out.push_str(&comment.title_with_reduction);
            out.push_str(&comment.body);
            out.push('\n');
        }
        out.push_str("--|>\n");
    }

    if summary.runs > 0 {
        let passed = summary.runs.saturating_sub(summary.errors);
        let tests = |n: usize| {
            translator.message(if n == 1 {
                MessageId::TestSingular
            } else {
                MessageId::TestPlural
            })
        };
        let rule = translator.message(MessageId::SummaryRule);
        let line = translator.format(
            MessageId::SummaryLine,
            &[
                &format!("{:2}", summary.runs),
                &tests(summary.runs),
                &format!("{:2}", passed),
                &tests(passed),
            ],
        );
        out.push_str("\n<|--\n");
        heading(&mut out, MessageId::SummaryTitle);
        out.push_str(&format!(">{}\n>{}\n>{}\n", rule, line, rule));
        out.push_str("\n--|>\n");
    }

    if let Some(grade) = summary.grade {
        out.push_str(&format!("\nGrade :=>>{}\n", format_grade(grade)));
    }
    out
}

/// Two decimals in a five-wide field, dropping a `.00` ending.
pub fn format_grade(grade: f32) -> String {
    // Avoid printing "-0".
    let grade = if grade == 0.0 { 0.0 } else { grade };
    let text = format!("{:5.2}", grade);
    match text.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}
