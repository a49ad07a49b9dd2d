//! Process runner implementation
//!
//! Runs the program under test as a child in its own process group. Stdout
//! and stderr share one pipe. The parent never blocks on the child: it polls
//! both pipes without waiting, moves at most one input line and one read
//! chunk per step, checks whether the child has ended and sleeps a few
//! milliseconds before the next step.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{pipe2, Pid};
use tracing::{debug, warn};

use super::{CommandSpec, ExecutionError, RunLimits, RunOutcome, RunStatus, Runner};
use crate::core::utils::{lossy, next_line_len};
use crate::core::StopToken;

/// Bytes read from the program per step.
const READ_CHUNK: usize = 10 * 1024;

/// Attempts to reap a killed child before giving up on it.
const REAP_ATTEMPTS: u32 = 200;

/// Runner that executes the program directly, without sandbox
pub struct ProcessRunner {
    /// Sleep between two polling steps
    poll_interval: Duration,
    /// Time a terminated program gets before it is killed
    grace: Duration,
}

impl ProcessRunner {
    pub fn new(poll_interval: Duration, grace: Duration) -> Self {
        Self {
            poll_interval,
            grace,
        }
    }

    /// SIGTERM the child's group, then SIGKILL it if it is still alive after
    /// the grace period.
    fn terminate(&self, child: &mut Child) -> Option<ExitStatus> {
        let group = Pid::from_raw(child.id() as i32);
        debug!("Terminating process group {}", group);
        if let Err(e) = killpg(group, Signal::SIGTERM) {
            debug!("SIGTERM to group {} failed: {}", group, e);
        }
        thread::sleep(self.grace);
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }

        if let Err(e) = killpg(group, Signal::SIGKILL) {
            debug!("SIGKILL to group {} failed: {}", group, e);
        }
        for _ in 0..REAP_ATTEMPTS {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    warn!("Failed to reap killed program: {}", e);
                    return None;
                }
            }
        }
        warn!("Killed program {} could not be reaped", child.id());
        None
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_millis(5))
    }
}

impl Runner for ProcessRunner {
    fn run(
        &self,
        cmd: &CommandSpec,
        input: &str,
        limits: &RunLimits,
        stop: &StopToken,
    ) -> RunOutcome {
        debug!("Running program: {} with args: {:?}", cmd.program, cmd.args);

        let pipes = match Pipes::open() {
            Ok(pipes) => pipes,
            Err(e) => return RunOutcome::failed(ExecutionError::Pipe(e.to_string())),
        };
        if !Path::new(&cmd.program).exists() {
            return RunOutcome::failed(ExecutionError::NotFound(cmd.program.clone()));
        }

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(cmd.env.iter().filter_map(|pair| pair.split_once('=')))
            .stdin(Stdio::from(pipes.child_stdin))
            .stdout(Stdio::from(pipes.child_stdout))
            .stderr(Stdio::from(pipes.child_stderr))
            .process_group(0);
        let spawned = command.spawn();
        // Release the parent's copies of the child ends.
        drop(command);
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return RunOutcome::failed(ExecutionError::NotFound(cmd.program.clone()))
            }
            Err(e) => return RunOutcome::failed(ExecutionError::Spawn(e.to_string())),
        };

        let mut session = Session::new(pipes.stdin, pipes.stdout, input, limits.max_output);
        let start = Instant::now();
        let mut timed_out = false;
        let mut wait_error = None;
        let exit_status = loop {
            session.step();
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {}
                Err(e) => {
                    wait_error = Some(e.to_string());
                    break self.terminate(&mut child);
                }
            }
            thread::sleep(self.poll_interval);

            timed_out = start.elapsed() >= limits.timeout;
            if timed_out || stop.is_requested() || session.capture.overflow {
                debug!(
                    "Stopping program {} (timeout: {}, overflow: {})",
                    child.id(),
                    timed_out,
                    session.capture.overflow
                );
                break self.terminate(&mut child);
            }
        };
        session.drain();

        let (status, execution_error) = match exit_status {
            Some(status) => interpret(status),
            None => (RunStatus::Unknown, None),
        };
        let execution_error = wait_error.map(ExecutionError::Wait).or(execution_error);
        debug!(
            "Program ended: {:?} after {:?}, {} bytes read",
            status,
            start.elapsed(),
            session.capture.total
        );

        RunOutcome {
            output_before: lossy(&session.capture.before),
            output_after: lossy(&session.capture.after),
            bytes_read: session.capture.total,
            status,
            timed_out,
            output_too_large: session.capture.overflow,
            execution_error,
        }
    }
}

/// Map a wait status to the run status. Any signal death is reported,
/// including the runner's own SIGTERM or SIGKILL.
fn interpret(status: ExitStatus) -> (RunStatus, Option<ExecutionError>) {
    if let Some(code) = status.code() {
        return (RunStatus::Exited(code), None);
    }
    if let Some(number) = status.signal() {
        let error = ExecutionError::Signaled {
            name: Signal::try_from(number)
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|_| "unknown signal".to_string()),
            number,
        };
        return (RunStatus::Signaled(number), Some(error));
    }
    (RunStatus::Unknown, Some(ExecutionError::AbnormalTermination))
}

fn set_nonblocking(fd: &OwnedFd) -> nix::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?);
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

/// Both pipes of one execution, child ends and parent ends.
struct Pipes {
    child_stdin: OwnedFd,
    child_stdout: OwnedFd,
    child_stderr: OwnedFd,
    stdin: OwnedFd,
    stdout: OwnedFd,
}

impl Pipes {
    fn open() -> io::Result<Self> {
        let (child_stdin, stdin) = pipe2(OFlag::O_CLOEXEC)?;
        let (stdout, child_stdout) = pipe2(OFlag::O_CLOEXEC)?;
        let child_stderr = child_stdout.try_clone()?;
        set_nonblocking(&stdin)?;
        set_nonblocking(&stdout)?;
        Ok(Self {
            child_stdin,
            child_stdout,
            child_stderr,
            stdin,
            stdout,
        })
    }
}

/// Output captured so far, split on whether input was still pending.
struct Capture {
    before: Vec<u8>,
    after: Vec<u8>,
    total: usize,
    overflow: bool,
    max: usize,
}

impl Capture {
    fn push(&mut self, data: &[u8], input_pending: bool) {
        self.total += data.len();
        let buffer = if input_pending {
            &mut self.before
        } else {
            &mut self.after
        };
        buffer.extend_from_slice(data);
        if buffer.len() > self.max {
            let excess = buffer.len() - self.max;
            buffer.drain(..excess);
            self.overflow = true;
        }
    }
}

/// Parent side of the pipes for one execution.
struct Session<'a> {
    writer: Option<File>,
    reader: File,
    pending: &'a [u8],
    eof: bool,
    capture: Capture,
}

impl<'a> Session<'a> {
    fn new(stdin: OwnedFd, stdout: OwnedFd, input: &'a str, max_output: usize) -> Self {
        let pending = input.as_bytes();
        Self {
            // Empty input closes stdin right away.
            writer: (!pending.is_empty()).then(|| File::from(stdin)),
            reader: File::from(stdout),
            pending,
            eof: false,
            capture: Capture {
                before: Vec::new(),
                after: Vec::new(),
                total: 0,
                overflow: false,
                max: max_output,
            },
        }
    }

    /// One non-blocking step: read one chunk if output is ready, then write
    /// one input line if stdin is ready. Reading first keeps a prompt printed
    /// before the last input line in the before segment.
    fn step(&mut self) {
        let (writable, readable) = {
            let read_flags = PollFlags::POLLIN | PollFlags::POLLPRI;
            let mut fds = vec![PollFd::new(self.reader.as_fd(), read_flags)];
            if let Some(writer) = &self.writer {
                fds.push(PollFd::new(writer.as_fd(), PollFlags::POLLOUT));
            }
            if let Err(e) = poll(&mut fds, PollTimeout::ZERO) {
                debug!("poll failed: {}", e);
                return;
            }
            let ready = |fd: &PollFd, flags: PollFlags| {
                fd.revents().map(|r| r.intersects(flags)).unwrap_or(false)
            };
            (
                fds.get(1).map(|fd| ready(fd, PollFlags::POLLOUT)).unwrap_or(false),
                ready(&fds[0], read_flags),
            )
        };

        if readable {
            self.read_chunk();
        }
        if writable {
            self.write_line();
        }
    }

    fn write_line(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let pending = self.pending;
        match writer.write(&pending[..next_line_len(pending)]) {
            Ok(written) => self.pending = &pending[written..],
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                // The program closed its stdin; the rest of the input is never consumed.
                debug!("Stopped writing input: {}", e);
                self.writer = None;
                return;
            }
        }
        if self.pending.is_empty() {
            self.writer = None;
        }
    }

    /// Returns false once nothing more can be read right now.
    fn read_chunk(&mut self) -> bool {
        if self.eof {
            return false;
        }
        let mut buf = [0u8; READ_CHUNK];
        match self.reader.read(&mut buf) {
            Ok(0) => {
                self.eof = true;
                false
            }
            Ok(n) => {
                self.capture.push(&buf[..n], !self.pending.is_empty());
                true
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => true,
            Err(e) => {
                if e.kind() != ErrorKind::WouldBlock {
                    debug!("Reading program output failed: {}", e);
                }
                false
            }
        }
    }

    /// Collect what the program wrote just before it ended.
    fn drain(&mut self) {
        let limit = self.capture.max / READ_CHUNK + 2;
        for _ in 0..limit {
            if !self.read_chunk() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// The script is run through /bin/sh rather than executed, so a freshly
    /// written file is never exec'd.
    fn script(dir: &TempDir, body: &str) -> CommandSpec {
        let path = dir.path().join("prog.sh");
        std::fs::write(&path, format!("{}\n", body)).unwrap();
        CommandSpec::new("/bin/sh").with_args([path.to_string_lossy().into_owned()])
    }

    fn run(body: &str, input: &str, timeout: Duration) -> RunOutcome {
        let dir = TempDir::new().unwrap();
        ProcessRunner::default().run(
            &script(&dir, body),
            input,
            &RunLimits::new(timeout),
            &StopToken::new(),
        )
    }

    #[test]
    fn test_echo_and_exit_code() {
        let outcome = run("echo hello; echo oops >&2; exit 3", "", Duration::from_secs(5));
        assert_eq!(outcome.exit_code(), Some(3));
        assert_eq!(outcome.full_output(), "hello\noops\n");
        assert!(!outcome.timed_out);
        assert!(outcome.execution_error.is_none());
    }

    #[test]
    fn test_input_is_fed_and_closed() {
        let outcome = run("cat", "1\n2\n3", Duration::from_secs(5));
        assert_eq!(outcome.exit_code(), Some(0));
        assert_eq!(outcome.full_output(), "1\n2\n3");
    }

    #[test]
    fn test_output_after_input() {
        let outcome = run("read a; read b; echo $((a + b))", "2\n40\n", Duration::from_secs(5));
        assert_eq!(outcome.output_after, "42\n");
        assert_eq!(outcome.bytes_read, 3);
    }

    #[test]
    fn test_prompts_stay_before_last_input() {
        let body = "printf 'Enter: '; read a; printf 'Enter: '; read b; \
                    printf 'Enter: '; read c; echo $((a + b + c))";
        let outcome = run(body, "1\n2\n3\n", Duration::from_secs(5));
        assert_eq!(outcome.output_before, "Enter: Enter: Enter: ");
        assert_eq!(outcome.output_after, "6\n");
    }

    #[test]
    fn test_args_and_env() {
        let dir = TempDir::new().unwrap();
        let mut cmd = script(&dir, "echo \"$1-$2-$GREETING\"").with_env(["GREETING=hi"]);
        cmd.args.extend(["a b".to_string(), "c".to_string()]);
        let outcome = ProcessRunner::default().run(
            &cmd,
            "",
            &RunLimits::new(Duration::from_secs(5)),
            &StopToken::new(),
        );
        assert_eq!(outcome.full_output(), "a b-c-hi\n");
    }

    #[test]
    fn test_timeout_kills_program() {
        let start = Instant::now();
        let outcome = run("echo started; sleep 30", "", Duration::from_millis(300));
        assert!(outcome.timed_out);
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(outcome.full_output().starts_with("started"));
        assert!(matches!(outcome.status, RunStatus::Signaled(_)));
        assert!(matches!(
            outcome.execution_error,
            Some(ExecutionError::Signaled { number, .. }) if number == 15 || number == 9
        ));
    }

    #[test]
    fn test_stop_request_kills_program() {
        let dir = TempDir::new().unwrap();
        let cmd = script(&dir, "sleep 30");
        let stop = StopToken::new();
        stop.request(crate::core::StopReason::Terminate);
        let start = Instant::now();
        let outcome = ProcessRunner::default().run(
            &cmd,
            "",
            &RunLimits::new(Duration::from_secs(30)),
            &stop,
        );
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!outcome.timed_out);
        assert_eq!(outcome.exit_code(), None);
    }

    #[test]
    fn test_output_overflow() {
        let dir = TempDir::new().unwrap();
        let cmd = script(&dir, "while :; do echo 0123456789; done");
        let limits = RunLimits {
            timeout: Duration::from_secs(10),
            max_output: 4096,
        };
        let outcome =
            ProcessRunner::default().run(&cmd, "", &limits, &StopToken::new());
        assert!(outcome.output_too_large);
        assert!(!outcome.timed_out);
        assert!(outcome.output_after.len() <= 4096);
        assert!(outcome.bytes_read > 4096);
    }

    #[test]
    fn test_signal_is_execution_error() {
        let outcome = run("kill -s SEGV $$", "", Duration::from_secs(5));
        assert_eq!(outcome.status, RunStatus::Signaled(11));
        assert_eq!(
            outcome.execution_error,
            Some(ExecutionError::Signaled {
                name: "SIGSEGV".to_string(),
                number: 11
            })
        );
    }

    #[test]
    fn test_missing_program() {
        let outcome = ProcessRunner::default().run(
            &CommandSpec::new("/nonexistent/prog"),
            "",
            &RunLimits::new(Duration::from_secs(1)),
            &StopToken::new(),
        );
        assert_eq!(
            outcome.execution_error,
            Some(ExecutionError::NotFound("/nonexistent/prog".to_string()))
        );
        assert_eq!(outcome.status, RunStatus::Unknown);
    }

    #[test]
    fn test_capture_truncates_front() {
        let mut capture = Capture {
            before: Vec::new(),
            after: Vec::new(),
            total: 0,
            overflow: false,
            max: 4,
        };
        capture.push(b"ab", true);
        capture.push(b"cdef", false);
        capture.push(b"gh", false);
        assert_eq!(capture.before, b"ab");
        assert_eq!(capture.after, b"efgh");
        assert_eq!(capture.total, 8);
        assert!(capture.overflow);
    }
}
