//! A declared case bound to its matchers and, once run, to its outcome.

use std::time::Duration;

use tracing::debug;

use crate::cases::CaseSpec;
use crate::checker::OutputMatcher;
use crate::core::utils::truncate_at_boundary;
use crate::core::{StopToken, Verdict};
use crate::error::EvaluationError;
use crate::i18n::{case_format, MessageId, Translator};
use crate::runner::{CommandSpec, ExecutionError, RunLimits, RunOutcome, Runner};

/// Longest execution-error reason kept for a comment.
const MAX_REASON_LEN: usize = 1000;

/// Longer `programtorun=` values are ignored in favor of the default program.
const MAX_PROGRAM_LEN: usize = 512;

#[derive(Debug)]
pub struct TestCase {
    id: usize,
    spec: CaseSpec,
    matchers: Vec<OutputMatcher>,
    outcome: Option<RunOutcome>,
    correct_output: bool,
    correct_exit_code: bool,
    execution_error: Option<String>,
    grade_reduction_applied: f32,
}

impl TestCase {
    /// Build the case with 1-based `id`. Fails on a malformed regular expression.
    pub fn new(id: usize, spec: CaseSpec) -> Result<Self, EvaluationError> {
        let matchers = spec
            .outputs
            .iter()
            .map(|raw| OutputMatcher::classify(raw, &spec.description))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            spec,
            matchers,
            outcome: None,
            correct_output: false,
            correct_exit_code: false,
            execution_error: None,
            grade_reduction_applied: 0.0,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    /// Reduction declared in the case file, if any.
    pub fn declared_reduction(&self) -> Option<f32> {
        self.spec.grade_reduction
    }

    pub fn grade_reduction_applied(&self) -> f32 {
        self.grade_reduction_applied
    }

    pub fn set_grade_reduction_applied(&mut self, reduction: f32) {
        self.grade_reduction_applied = reduction;
    }

    pub fn is_exit_code_tested(&self) -> bool {
        self.spec.expected_exit_code.is_some()
    }

    /// Command for this case: the declared program and arguments, or the
    /// default program.
    pub fn command(&self, default_program: &str) -> CommandSpec {
        let program = match self.spec.program_to_run.as_deref() {
            Some(p) if !p.is_empty() && p.len() < MAX_PROGRAM_LEN => p,
            _ => default_program,
        };
        CommandSpec::new(program).with_args(self.spec.program_args.iter().cloned())
    }

    /// Run the program and judge its outcome.
    pub fn run<R: Runner + ?Sized>(
        &mut self,
        runner: &R,
        default_program: &str,
        timeout: Duration,
        stop: &StopToken,
        translator: &dyn Translator,
    ) {
        let cmd = self.command(default_program);
        debug!("Running case {} with timeout {:?}", self.id, timeout);
        let outcome = runner.run(&cmd, &self.spec.input, &RunLimits::new(timeout), stop);

        self.execution_error = outcome.execution_error.as_ref().map(|error| {
            let mut reason = describe_execution_error(error, translator);
            truncate_at_boundary(&mut reason, MAX_REASON_LEN);
            reason
        });
        self.correct_exit_code = match self.spec.expected_exit_code {
            Some(expected) => outcome.exit_code() == Some(expected),
            None => false,
        };
        self.correct_output =
            self.matches(&outcome.output_after) || self.matches(&outcome.full_output());
        self.outcome = Some(outcome);
    }

    fn matches(&self, output: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(output))
    }

    /// A case passes on correct output from a clean run, or on the expected
    /// exit code when one is declared.
    pub fn is_correct(&self) -> bool {
        let Some(outcome) = &self.outcome else {
            return false;
        };
        let clean = !outcome.timed_out
            && !outcome.output_too_large
            && self.execution_error.is_none();
        (self.correct_output && clean) || (self.is_exit_code_tested() && self.correct_exit_code)
    }

    pub fn verdict(&self) -> Verdict {
        let Some(outcome) = &self.outcome else {
            return Verdict::ExecutionError;
        };
        if self.is_correct() {
            Verdict::Passed
        } else if outcome.timed_out {
            Verdict::Timeout
        } else if outcome.output_too_large {
            Verdict::OutputTooLarge
        } else if self.execution_error.is_some() {
            Verdict::ExecutionError
        } else if self.is_exit_code_tested() && !self.correct_exit_code {
            Verdict::WrongExitCode
        } else {
            Verdict::WrongOutput
        }
    }

    /// `Test N: description`, optionally followed by the applied reduction.
    pub fn comment_title(&self, with_reduction: bool, translator: &dyn Translator) -> String {
        let mut title = translator.format(MessageId::TestTitle, &[&self.id]);
        if !self.spec.description.is_empty() {
            title.push_str(": ");
            title.push_str(&self.spec.description);
        }
        if with_reduction && self.grade_reduction_applied > 0.0 {
            title.push_str(&format!(" ({:.3})", -self.grade_reduction_applied));
        }
        title.push('\n');
        title
    }

    /// Explanation of a failure; empty for a passed case.
    pub fn comment(&self, translator: &dyn Translator) -> String {
        if self.is_correct() {
            return String::new();
        }
        let mut comment = String::new();
        if self.matchers.is_empty() {
            comment.push_str(translator.message(MessageId::NoOutputSpecified));
        }
        if let Some(outcome) = &self.outcome {
            if outcome.timed_out {
                comment.push_str(translator.message(MessageId::Timeout));
            }
            if outcome.output_too_large {
                let kib = outcome.bytes_read / 1024;
                comment.push_str(&translator.format(MessageId::OutputTooLarge, &[&kib]));
            }
        }
        if let Some(reason) = &self.execution_error {
            comment.push_str(reason);
            comment.push('\n');
        }
        if let Some(expected) = self.spec.expected_exit_code {
            if !self.correct_exit_code {
                let found = self
                    .outcome
                    .as_ref()
                    .and_then(RunOutcome::exit_code)
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "-".to_string());
                comment.push_str(
                    &translator.format(MessageId::ExitCodeMismatch, &[&expected, &found]),
                );
            }
        }
        if !self.correct_output {
            if let Some(message) = &self.spec.fail_message {
                comment.push_str(message);
                comment.push('\n');
            } else {
                let output = self
                    .outcome
                    .as_ref()
                    .map(RunOutcome::full_output)
                    .unwrap_or_default();
                comment.push_str(translator.message(MessageId::IncorrectOutput));
                comment.push_str(translator.message(MessageId::InputHeader));
                comment.push_str(&case_format(&self.spec.input, translator));
                comment.push_str(translator.message(MessageId::ProgramOutputHeader));
                comment.push_str(&case_format(&output, translator));
                if let Some(first) = self.matchers.first() {
                    let kind = translator.message(first.kind_message());
                    comment.push_str(
                        &translator.format(MessageId::ExpectedOutputHeader, &[&kind]),
                    );
                    comment.push_str(&case_format(first.expected(), translator));
                }
            }
        }
        comment
    }
}

fn describe_execution_error(error: &ExecutionError, translator: &dyn Translator) -> String {
    match error {
        ExecutionError::Pipe(reason) => translator.format(MessageId::PipeError, &[reason]),
        ExecutionError::NotFound(program) => {
            translator.format(MessageId::ExecutableNotFound, &[program])
        }
        ExecutionError::Spawn(reason) => translator.format(MessageId::SpawnError, &[reason]),
        ExecutionError::Signaled { name, number } => {
            translator.format(MessageId::SignalTermination, &[name, number])
        }
        ExecutionError::AbnormalTermination => {
            translator.message(MessageId::AbnormalTermination).to_string()
        }
        ExecutionError::Wait(reason) => translator.format(MessageId::WaitError, &[reason]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;
    use crate::runner::RunStatus;
    use std::cell::RefCell;

    /// Runner returning a canned outcome and remembering the command.
    struct CannedRunner {
        outcome: RunOutcome,
        seen: RefCell<Option<CommandSpec>>,
    }

    impl CannedRunner {
        fn new(output: &str, status: RunStatus) -> Self {
            let mut outcome = RunOutcome::failed(ExecutionError::AbnormalTermination);
            outcome.execution_error = None;
            outcome.output_after = output.to_string();
            outcome.bytes_read = output.len();
            outcome.status = status;
            Self {
                outcome,
                seen: RefCell::new(None),
            }
        }
    }

    impl Runner for CannedRunner {
        fn run(&self, cmd: &CommandSpec, _: &str, _: &RunLimits, _: &StopToken) -> RunOutcome {
            *self.seen.borrow_mut() = Some(cmd.clone());
            self.outcome.clone()
        }
    }

    fn spec(outputs: &[&str]) -> CaseSpec {
        CaseSpec {
            description: "sum".into(),
            input: "3 4".into(),
            outputs: outputs.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    fn run_case(case: &mut TestCase, runner: &CannedRunner) {
        let catalog = Catalog::english().unwrap();
        case.run(runner, "./vpl_test", Duration::from_secs(5), &StopToken::new(), &catalog);
    }

    #[test]
    fn test_correct_output() {
        let mut case = TestCase::new(1, spec(&["\"8\"", "7"])).unwrap();
        run_case(&mut case, &CannedRunner::new("7\n", RunStatus::Exited(0)));
        assert!(case.is_correct());
        assert_eq!(case.verdict(), Verdict::Passed);
        assert_eq!(case.comment(&Catalog::english().unwrap()), "");
    }

    #[test]
    fn test_wrong_output_comment() {
        let catalog = Catalog::english().unwrap();
        let mut case = TestCase::new(2, spec(&["7"])).unwrap();
        run_case(&mut case, &CannedRunner::new("8\n", RunStatus::Exited(0)));
        assert!(!case.is_correct());
        assert_eq!(case.verdict(), Verdict::WrongOutput);
        assert_eq!(
            case.comment(&catalog),
            "Incorrect program output\n --- Input ---\n3 4\n\n --- Program output ---\n8\n\n --- Expected output (numbers)---\n7\n"
        );
    }

    #[test]
    fn test_fail_message_replaces_diff() {
        let catalog = Catalog::english().unwrap();
        let mut s = spec(&["7"]);
        s.fail_message = Some("Check the sum".into());
        let mut case = TestCase::new(1, s).unwrap();
        run_case(&mut case, &CannedRunner::new("8", RunStatus::Exited(0)));
        assert_eq!(case.comment(&catalog), "Check the sum\n");
    }

    #[test]
    fn test_exit_code_alone_passes() {
        let catalog = Catalog::english().unwrap();
        let mut s = spec(&["7"]);
        s.expected_exit_code = Some(2);
        let mut case = TestCase::new(1, s.clone()).unwrap();
        run_case(&mut case, &CannedRunner::new("wrong", RunStatus::Exited(2)));
        assert!(case.is_correct());

        let mut case = TestCase::new(1, s).unwrap();
        run_case(&mut case, &CannedRunner::new("8", RunStatus::Exited(1)));
        assert!(!case.is_correct());
        assert_eq!(case.verdict(), Verdict::WrongExitCode);
        assert!(case
            .comment(&catalog)
            .starts_with("Incorrect exit code. Expected 2, found 1\n"));
    }

    #[test]
    fn test_timeout_never_correct() {
        let mut runner = CannedRunner::new("7", RunStatus::Signaled(15));
        runner.outcome.timed_out = true;
        let mut case = TestCase::new(1, spec(&["7"])).unwrap();
        run_case(&mut case, &runner);
        assert!(!case.is_correct());
        assert_eq!(case.verdict(), Verdict::Timeout);
        assert!(case
            .comment(&Catalog::english().unwrap())
            .starts_with("Program timeout\n"));
    }

    #[test]
    fn test_execution_error_reason() {
        let mut runner = CannedRunner::new("", RunStatus::Signaled(11));
        runner.outcome.execution_error = Some(ExecutionError::Signaled {
            name: "SIGSEGV".into(),
            number: 11,
        });
        let mut case = TestCase::new(1, spec(&[])).unwrap();
        run_case(&mut case, &runner);
        let comment = case.comment(&Catalog::english().unwrap());
        assert!(comment.starts_with(
            "Configuration error in the test case: the output is not defined\nProgram terminated due to \"SIGSEGV\" (11)\n"
        ));
        assert_eq!(case.verdict(), Verdict::ExecutionError);
    }

    #[test]
    fn test_titles() {
        let catalog = Catalog::english().unwrap();
        let mut case = TestCase::new(3, spec(&["7"])).unwrap();
        assert_eq!(case.comment_title(true, &catalog), "Test 3: sum\n");
        case.set_grade_reduction_applied(1.25);
        assert_eq!(case.comment_title(false, &catalog), "Test 3: sum\n");
        assert_eq!(case.comment_title(true, &catalog), "Test 3: sum (-1.250)\n");

        let anonymous = TestCase::new(4, CaseSpec::default()).unwrap();
        assert_eq!(anonymous.comment_title(false, &catalog), "Test 4\n");
    }

    #[test]
    fn test_program_override() {
        let mut s = spec(&["7"]);
        s.program_to_run = Some("/bin/other".into());
        s.program_args = vec!["-x".into()];
        let mut case = TestCase::new(1, s).unwrap();
        let runner = CannedRunner::new("7", RunStatus::Exited(0));
        run_case(&mut case, &runner);
        let seen = runner.seen.borrow().clone().unwrap();
        assert_eq!(seen.program, "/bin/other");
        assert_eq!(seen.args, vec!["-x"]);

        let plain = TestCase::new(2, spec(&["7"])).unwrap();
        assert_eq!(plain.command("./vpl_test").program, "./vpl_test");
    }

    #[test]
    fn test_bad_regex_rejected() {
        assert!(matches!(
            TestCase::new(1, spec(&["/(/"])),
            Err(EvaluationError::InvalidRegex { .. })
        ));
    }
}
