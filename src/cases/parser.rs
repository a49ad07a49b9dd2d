//! Case file parser
//!
//! The case file is a line-oriented list of `name=value` tags. `input=` and
//! `output=` may span several lines: following untagged lines are appended
//! until an interrupting tag, or until a previously declared end marker
//! (`inputend=` / `outputend=`) appears.
//!
//! ```text
//! case=Sum of two numbers
//! input=3 4
//! output="7"
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use super::CaseSpec;
use crate::core::utils::{normalize_name, remove_last_newline, split_lines, trim};
use crate::runner::split_args;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Case,
    Input,
    InputEnd,
    Output,
    OutputEnd,
    GradeReduction,
    FailMessage,
    ProgramToRun,
    ProgramArguments,
    ExpectedExitCode,
    Variation,
}

impl Tag {
    fn from_name(name: &str) -> Option<Tag> {
        let tag = match name {
            "case=" => Tag::Case,
            "input=" => Tag::Input,
            "inputend=" => Tag::InputEnd,
            "output=" => Tag::Output,
            "outputend=" => Tag::OutputEnd,
            "gradereduction=" => Tag::GradeReduction,
            "failmessage=" => Tag::FailMessage,
            "programtorun=" => Tag::ProgramToRun,
            "programarguments=" => Tag::ProgramArguments,
            "expectedexitcode=" => Tag::ExpectedExitCode,
            "variation=" => Tag::Variation,
            _ => return None,
        };
        Some(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Regular,
    ReadingInput,
    ReadingOutput,
}

/// Non-fatal anomaly found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A line that is neither a known tag nor part of an open section (1-based).
    UnexpectedLine(usize),
}

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub cases: Vec<CaseSpec>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Split `line` into its normalized tag name (letters lower-cased, up to and
/// including the first `=`) and value. Lines without `=` have no tag.
fn parse_line(line: &str) -> (String, &str) {
    match line.find('=') {
        Some(pos) => {
            let name = line[..=pos]
                .chars()
                .filter(|c| c.is_ascii_alphabetic() || *c == '=')
                .map(|c| c.to_ascii_lowercase())
                .collect();
            (name, &line[pos + 1..])
        }
        None => (String::new(), line),
    }
}

/// Longest leading prefix of `text` that parses as `T` (C `atof`/`atoi` style).
fn leading_number<T: FromStr>(text: &str) -> Option<T> {
    let text = trim(text);
    (1..=text.len())
        .rev()
        .filter(|&end| text.is_char_boundary(end))
        .find_map(|end| text[..end].parse().ok())
}

fn cut_to_end_tag<'a>(value: &'a str, end_tag: &str) -> Option<&'a str> {
    if end_tag.is_empty() {
        return None;
    }
    value.find(end_tag).map(|pos| &value[..pos])
}

pub struct CaseFileParser {
    grade_range: f32,
}

impl CaseFileParser {
    /// `grade_min`/`grade_max` resolve percentage grade reductions.
    pub fn new(grade_min: f32, grade_max: f32) -> Self {
        Self {
            grade_range: grade_max - grade_min,
        }
    }

    /// Read and parse the case file, then delete it. A missing file parses as
    /// an empty suite.
    pub fn parse_file(&self, path: &Path) -> std::io::Result<ParseOutcome> {
        if !path.exists() {
            debug!("No case file at {:?}", path);
            return Ok(ParseOutcome::default());
        }
        let bytes = fs::read(path)?;
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove case file {:?}: {}", path, e);
        }
        Ok(self.parse_str(&String::from_utf8_lossy(&bytes)))
    }

    pub fn parse_str(&self, content: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let mut state = State::Regular;
        let mut in_case = false;
        let mut input_end = String::new();
        let mut output_end = String::new();
        let mut case = CaseSpec::default();
        let mut output = String::new();

        for (index, line) in split_lines(content).into_iter().enumerate() {
            let (name, value) = parse_line(line);
            let tag = Tag::from_name(&name);

            match state {
                State::ReadingInput => {
                    if !input_end.is_empty() {
                        match line.find(input_end.as_str()) {
                            Some(pos) => {
                                case.input.push_str(&line[..pos]);
                                state = State::Regular;
                            }
                            None => {
                                case.input.push_str(line);
                                case.input.push('\n');
                            }
                        }
                        continue;
                    }
                    if matches!(tag, Some(Tag::Output | Tag::GradeReduction | Tag::Case)) {
                        state = State::Regular;
                    } else {
                        case.input.push_str(line);
                        case.input.push('\n');
                        continue;
                    }
                }
                State::ReadingOutput => {
                    if !output_end.is_empty() {
                        match line.find(output_end.as_str()) {
                            Some(pos) => {
                                output.push_str(&line[..pos]);
                                case.outputs.push(std::mem::take(&mut output));
                                state = State::Regular;
                            }
                            None => {
                                output.push_str(line);
                                output.push('\n');
                            }
                        }
                        continue;
                    }
                    if matches!(
                        tag,
                        Some(Tag::Input | Tag::Output | Tag::GradeReduction | Tag::Case)
                    ) {
                        remove_last_newline(&mut output);
                        case.outputs.push(std::mem::take(&mut output));
                        state = State::Regular;
                    } else {
                        output.push_str(line);
                        output.push('\n');
                        continue;
                    }
                }
                State::Regular => {}
            }

            let Some(tag) = tag else {
                if !trim(line).is_empty() && (!name.is_empty() || !in_case) {
                    debug!("Unexpected line {} in case file: {:?}", index + 1, line);
                    outcome.diagnostics.push(Diagnostic::UnexpectedLine(index + 1));
                }
                continue;
            };

            match tag {
                Tag::Input => {
                    in_case = true;
                    match cut_to_end_tag(value, &input_end) {
                        Some(cut) => case.input.push_str(cut),
                        None => {
                            case.input.push_str(value);
                            case.input.push('\n');
                            state = State::ReadingInput;
                        }
                    }
                }
                Tag::Output => {
                    in_case = true;
                    match cut_to_end_tag(value, &output_end) {
                        Some(cut) => case.outputs.push(cut.to_string()),
                        None => {
                            output = format!("{}\n", value);
                            state = State::ReadingOutput;
                        }
                    }
                }
                Tag::GradeReduction => {
                    in_case = true;
                    let value = trim(value);
                    let reduction = if value.len() > 1 && value.ends_with('%') {
                        let percent: f32 = leading_number(value).unwrap_or(0.0);
                        self.grade_range * percent / 100.0
                    } else {
                        leading_number(value).unwrap_or(0.0)
                    };
                    case.grade_reduction = Some(reduction);
                }
                Tag::ExpectedExitCode => {
                    case.expected_exit_code = Some(leading_number(value).unwrap_or(0));
                }
                Tag::ProgramToRun => {
                    let program = trim(value);
                    case.program_to_run = (!program.is_empty()).then(|| program.to_string());
                }
                Tag::ProgramArguments => {
                    case.program_args = split_args(trim(value));
                }
                Tag::FailMessage => {
                    let message = trim(value);
                    case.fail_message = (!message.is_empty()).then(|| message.to_string());
                }
                Tag::Variation => {
                    case.variation = normalize_name(value);
                }
                Tag::InputEnd => {
                    input_end = trim(value).to_string();
                }
                Tag::OutputEnd => {
                    output_end = trim(value).to_string();
                }
                Tag::Case => {
                    if in_case {
                        outcome.cases.push(std::mem::take(&mut case));
                    }
                    in_case = true;
                    case.description = trim(value).to_string();
                }
            }
        }

        if state == State::ReadingOutput {
            remove_last_newline(&mut output);
            case.outputs.push(output);
        }
        if in_case {
            outcome.cases.push(case);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParseOutcome {
        CaseFileParser::new(0.0, 10.0).parse_str(content)
    }

    #[test]
    fn test_minimal_case() {
        let outcome = parse("case=Sum of two numbers\ninput=3 4\noutput=\"7\"\n");
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.cases.len(), 1);
        let case = &outcome.cases[0];
        assert_eq!(case.description, "Sum of two numbers");
        assert_eq!(case.input, "3 4\n");
        assert_eq!(case.outputs, vec!["\"7\"".to_string()]);
        assert_eq!(case.grade_reduction, None);
        assert_eq!(case.expected_exit_code, None);
    }

    #[test]
    fn test_multiline_sections() {
        let outcome = parse(
            "case=multi\ninput=1\n2\n3\noutput=first\nline\noutput=second\ncase=next\noutput=x\n",
        );
        assert_eq!(outcome.cases.len(), 2);
        let first = &outcome.cases[0];
        assert_eq!(first.input, "1\n2\n3\n");
        assert_eq!(first.outputs, vec!["first\nline", "second"]);
        assert_eq!(outcome.cases[1].outputs, vec!["x"]);
    }

    #[test]
    fn test_input_swallows_other_tags() {
        let outcome = parse("case=c\ninput=a\nfailmessage=literal\noutput=1\n");
        let case = &outcome.cases[0];
        assert_eq!(case.input, "a\nfailmessage=literal\n");
        assert_eq!(case.fail_message, None);
    }

    #[test]
    fn test_end_tags() {
        let outcome = parse(
            "inputend=END\noutputend=STOP\ncase=c\ninput=a\ncase=not a tag\nbEND\noutput=x\ny STOP trailing\ngradereduction=2\n",
        );
        assert_eq!(outcome.cases.len(), 1);
        let case = &outcome.cases[0];
        assert_eq!(case.input, "a\ncase=not a tag\nb");
        assert_eq!(case.outputs, vec!["x\ny "]);
        assert_eq!(case.grade_reduction, Some(2.0));
    }

    #[test]
    fn test_end_tag_on_same_line() {
        let outcome = parse("inputend=<<\ncase=c\ninput=42<<\noutput=42\n");
        assert_eq!(outcome.cases[0].input, "42");
    }

    #[test]
    fn test_grade_reduction_percent() {
        let parser = CaseFileParser::new(0.0, 20.0);
        let outcome = parser.parse_str("case=a\ngradereduction=25%\ncase=b\ngradereduction= 1.5 \n");
        assert_eq!(outcome.cases[0].grade_reduction, Some(5.0));
        assert_eq!(outcome.cases[1].grade_reduction, Some(1.5));
    }

    #[test]
    fn test_other_tags() {
        let outcome = parse(
            "case=c\nProgram To Run = /bin/echo \nprogramarguments=a 'b c' \"d\"\nexpectedexitcode=3\nvariation= VarA\nfailmessage= Try again \n",
        );
        let case = &outcome.cases[0];
        assert_eq!(case.program_to_run.as_deref(), Some("/bin/echo"));
        assert_eq!(case.program_args, vec!["a", "b c", "d"]);
        assert_eq!(case.expected_exit_code, Some(3));
        assert_eq!(case.variation, "vara");
        assert_eq!(case.fail_message.as_deref(), Some("Try again"));
    }

    #[test]
    fn test_unexpected_lines_are_diagnostics() {
        let outcome = parse("garbage\ncase=c\nunknown=1\n\noutput=1\n");
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnexpectedLine(1), Diagnostic::UnexpectedLine(3)]
        );
        assert_eq!(outcome.cases.len(), 1);
    }

    #[test]
    fn test_output_flushed_at_eof() {
        let outcome = parse("case=c\noutput=a\nb\n");
        assert_eq!(outcome.cases[0].outputs, vec!["a\nb"]);
    }

    #[test]
    fn test_empty_file() {
        let outcome = parse("");
        assert!(outcome.cases.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_file_deletes_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evaluate.cases");
        std::fs::write(&path, "case=one\ninput=1\noutput=1\n").unwrap();

        let outcome = CaseFileParser::new(0.0, 10.0).parse_file(&path).unwrap();
        assert_eq!(outcome.cases.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = CaseFileParser::new(0.0, 10.0)
            .parse_file(&dir.path().join("missing.cases"))
            .unwrap();
        assert!(outcome.cases.is_empty());
    }
}
