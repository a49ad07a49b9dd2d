use std::fmt;

/// Summary verdict of one executed test case, used for logging.
///
/// The grading model itself works on the individual outcome flags; this is
/// the single most relevant reason a case failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    WrongOutput,
    WrongExitCode,
    Timeout,
    OutputTooLarge,
    ExecutionError,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Passed => "passed",
            Verdict::WrongOutput => "wrong_output",
            Verdict::WrongExitCode => "wrong_exit_code",
            Verdict::Timeout => "timeout",
            Verdict::OutputTooLarge => "output_too_large",
            Verdict::ExecutionError => "execution_error",
        };
        write!(f, "{}", s)
    }
}
