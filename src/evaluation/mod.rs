//! Evaluation orchestration
//!
//! An [`Evaluator`] goes through `NotStarted → Parsing → Running → Reporting
//! → Done` once. It parses the case file, keeps the cases of the active
//! variation, runs them in order under the global time budget, grades them and
//! writes the report.

pub mod comments;
pub mod report;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cases::{CaseFileParser, Diagnostic, ParseOutcome};
use crate::config::GradingConfig;
use crate::core::StopToken;
use crate::error::EvaluationError;
use crate::i18n::{MessageId, Translator};
use crate::runner::Runner;
use crate::test_case::TestCase;

pub use comments::{Comment, Comments};
pub use report::{ReportStyle, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Parsing,
    Running,
    Reporting,
    Done,
}

pub struct Evaluator<'a, R: Runner> {
    config: &'a GradingConfig,
    runner: R,
    translator: &'a dyn Translator,
    stop: StopToken,
    /// Start of the time budget
    started: Instant,
    phase: Phase,
    case_count: usize,
    cases: Vec<TestCase>,
    grade: f32,
    comments: Comments,
    runs: usize,
    errors: usize,
}

impl<'a, R: Runner> Evaluator<'a, R> {
    pub fn new(
        config: &'a GradingConfig,
        runner: R,
        translator: &'a dyn Translator,
        stop: StopToken,
    ) -> Self {
        Self {
            config,
            runner,
            translator,
            stop,
            started: Instant::now(),
            phase: Phase::NotStarted,
            case_count: 0,
            cases: Vec::new(),
            grade: config.grade_min,
            comments: Comments::default(),
            runs: 0,
            errors: 0,
        }
    }

    /// Count the time budget from `start` instead of from construction, so
    /// work done before the evaluator existed is charged to it.
    pub fn started_at(mut self, start: Instant) -> Self {
        self.started = start;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn grade(&self) -> f32 {
        self.grade
    }

    pub fn comments(&self) -> &Comments {
        &self.comments
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Run the whole evaluation, writing progress lines and the final report
    /// to `out`. Only write failures are returned as errors.
    pub fn evaluate(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.enter(Phase::Parsing);
        let parser = CaseFileParser::new(self.config.grade_min, self.config.grade_max);
        let parsed = match parser.parse_file(&self.config.cases_file) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    "Failed to read case file {}: {}",
                    self.config.cases_file.display(),
                    e
                );
                ParseOutcome::default()
            }
        };
        let loaded = self.load_cases(parsed);

        self.enter(Phase::Running);
        match loaded {
            Ok(()) => self.run_tests(out)?,
            Err(error) => self.add_fatal_error(error),
        }

        self.enter(Phase::Reporting);
        out.write_all(self.report().as_bytes())?;
        out.flush()?;
        self.enter(Phase::Done);
        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Evaluation phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Turn parse diagnostics into comments and build the cases of the active
    /// variation. Ids are assigned after filtering.
    fn load_cases(&mut self, parsed: ParseOutcome) -> Result<(), EvaluationError> {
        for diagnostic in &parsed.diagnostics {
            let Diagnostic::UnexpectedLine(line) = diagnostic;
            let message = self.translator.format(MessageId::SyntaxError, &[line]);
            warn!("{}", message);
            self.comments.push(Comment::new(message.clone(), message, ""));
        }

        let variation = &self.config.variation;
        let specs: Vec<_> = parsed
            .cases
            .into_iter()
            .filter(|spec| spec.applies_to(variation))
            .collect();
        self.case_count = specs.len();
        info!("Loaded {} test cases (variation {:?})", self.case_count, variation);

        for (index, spec) in specs.into_iter().enumerate() {
            self.cases.push(TestCase::new(index + 1, spec)?);
        }
        Ok(())
    }

    fn run_tests(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let total = self.cases.len();
        if total == 0 {
            return Ok(());
        }
        let (min, max) = (self.config.grade_min, self.config.grade_max);
        let max_time = self.config.max_time;
        if max_time < 0 {
            self.add_fatal_error(EvaluationError::NoTimeLeft);
            return Ok(());
        }

        self.grade = max;
        let default_share = (max - min) / total as f32;
        for index in 0..total {
            let progress = self.translator.format(
                MessageId::Progress,
                &[&(index + 1), &total, &self.cases[index].description()],
            );
            out.write_all(progress.as_bytes())?;
            out.flush()?;

            let elapsed = self.started.elapsed().as_secs() as i64;
            let timeout = (max_time - elapsed) / (total - index) as i64;
            if timeout <= 1 || elapsed >= max_time {
                self.add_fatal_error(EvaluationError::NoTimeLeft);
                return Ok(());
            }
            if self.interrupted() {
                break;
            }

            let case = &mut self.cases[index];
            case.run(
                &self.runner,
                &self.config.program,
                Duration::from_secs(timeout as u64),
                &self.stop,
                self.translator,
            );
            self.runs += 1;
            if self.interrupted() {
                break;
            }

            let case = &mut self.cases[index];
            if case.is_correct() {
                info!("Case {} passed", case.id());
                continue;
            }
            let reduction = case.declared_reduction().unwrap_or(default_share);
            case.set_grade_reduction_applied(reduction);
            self.grade = (self.grade - reduction).max(min).min(max.max(min));
            self.errors += 1;
            info!(
                "Case {} failed: {} (reduction {:.3}, grade {:.2})",
                case.id(),
                case.verdict(),
                reduction,
                self.grade
            );
            if !self.comments.is_full() {
                let comment = Comment::new(
                    case.comment_title(false, self.translator),
                    case.comment_title(true, self.translator),
                    case.comment(self.translator),
                );
                self.comments.push(comment);
            }
        }
        Ok(())
    }

    /// Records a fatal comment when a stop was requested.
    fn interrupted(&mut self) -> bool {
        match self.stop.reason() {
            Some(reason) => {
                self.add_fatal_error(EvaluationError::Interrupted(reason));
                true
            }
            None => false,
        }
    }

    /// Record a fatal error and drop the grade to the minimum.
    pub fn add_fatal_error(&mut self, error: EvaluationError) {
        warn!("Fatal evaluation error: {}", error);
        let message = error.describe(self.translator);
        let range = self.config.grade_max - self.config.grade_min;
        let titled = format!("{} ({:.2})", message, range);
        self.comments.push_replacing_last(Comment::new(message, titled, ""));
        self.grade = self.config.grade_min;
    }

    /// Render the report for the current state.
    pub fn report(&self) -> String {
        let style = if self.config.enhanced {
            ReportStyle::Enhanced
        } else {
            ReportStyle::Plain
        };
        let summary = Summary {
            case_count: self.case_count,
            comments: &self.comments,
            runs: self.runs,
            errors: self.errors,
            grade: (!self.config.no_grade()).then_some(self.grade),
        };
        report::render(&summary, style, self.translator)
    }
}
