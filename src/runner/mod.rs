//! Runner module - Execution abstraction layer
//!
//! A runner launches one program, feeds it its input, captures what it prints
//! and reports how it ended. It does NOT:
//! - Compare outputs or decide whether a case passed
//! - Know about grades, comments or messages

pub mod process;

use std::time::Duration;

use crate::core::StopToken;

pub use process::ProcessRunner;

/// Captured output is cut from the front beyond this many bytes.
pub const MAX_OUTPUT: usize = 256 * 1024;

/// Command specification for execution
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program path
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Extra environment variables (key=value) on top of the inherited ones
    pub env: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_env(mut self, env: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.env = env.into_iter().map(|e| e.into()).collect();
        self
    }
}

/// Limits for one execution
#[derive(Debug, Clone)]
pub struct RunLimits {
    /// Wall-clock deadline
    pub timeout: Duration,
    /// Capture cap per output segment in bytes
    pub max_output: usize,
}

impl RunLimits {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_output: MAX_OUTPUT,
        }
    }
}

/// How the program ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Exited normally with the given code
    Exited(i32),
    /// Killed by the given signal
    Signaled(i32),
    /// Never started, or could not be reaped
    Unknown,
}

/// Reason an execution could not be carried out normally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Pipes could not be created
    Pipe(String),
    /// The program file does not exist
    NotFound(String),
    /// The program could not be started
    Spawn(String),
    /// The program died from a signal the harness did not send
    Signaled { name: String, number: i32 },
    /// The program ended without exit code or signal
    AbnormalTermination,
    /// Waiting for the program failed
    Wait(String),
}

/// Outcome of running a program
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Output received while input was still being written
    pub output_before: String,
    /// Output received after all input was written
    pub output_after: String,
    /// Total bytes read from the program
    pub bytes_read: usize,
    pub status: RunStatus,
    pub timed_out: bool,
    pub output_too_large: bool,
    pub execution_error: Option<ExecutionError>,
}

impl RunOutcome {
    /// Outcome of a run that failed before the program started.
    pub fn failed(error: ExecutionError) -> Self {
        Self {
            output_before: String::new(),
            output_after: String::new(),
            bytes_read: 0,
            status: RunStatus::Unknown,
            timed_out: false,
            output_too_large: false,
            execution_error: Some(error),
        }
    }

    /// Exit code, when the program exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            RunStatus::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// All captured output in order of receipt.
    pub fn full_output(&self) -> String {
        format!("{}{}", self.output_before, self.output_after)
    }
}

/// Runner trait for executing programs
pub trait Runner {
    /// Run `cmd`, writing `input` to its stdin, until it ends, the deadline in
    /// `limits` passes or `stop` is requested.
    fn run(&self, cmd: &CommandSpec, input: &str, limits: &RunLimits, stop: &StopToken)
        -> RunOutcome;
}

/// Split an argument line on spaces, keeping `'...'` and `"..."` groups together.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current: Option<(String, char)> = None;
    for c in line.chars() {
        let closed = match current.as_mut() {
            None => {
                match c {
                    ' ' => {}
                    '\'' | '"' => current = Some((String::new(), c)),
                    _ => current = Some((c.to_string(), ' ')),
                }
                false
            }
            Some((arg, separator)) => {
                if c == *separator {
                    true
                } else {
                    arg.push(c);
                    false
                }
            }
        };
        if closed {
            if let Some((arg, _)) = current.take() {
                args.push(arg);
            }
        }
    }
    if let Some((arg, _)) = current {
        args.push(arg);
    }
    args
}
