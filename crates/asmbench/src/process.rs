//! External process invocation.
//!
//! Programs are run from explicit argument lists, never through a shell. Both
//! output streams are captured separately. An optional timeout and a
//! [`CancellationToken`] bound how long the driver waits on a child.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{BenchError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Shared flag requesting that a run stop.
///
/// Clones observe the same flag.
///
/// ```
/// use asmbench::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// Renders a copy-pasteable command line for diagnostics.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> Cow<'_, str> {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=+./:,@%".contains(c));
    if plain {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub program: String,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Standard output as UTF-8.
    ///
    /// # Errors
    ///
    /// [`BenchError::NonUtf8`] if the bytes are not valid UTF-8.
    pub fn stdout_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.stdout).map_err(|_| BenchError::NonUtf8 {
            program: self.program.clone(),
        })
    }

    /// Standard error, with invalid UTF-8 replaced.
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Fails with [`BenchError::ToolFailed`] unless the process exited
    /// successfully.
    pub fn require_success(self) -> Result<Self> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(BenchError::ToolFailed {
                program: self.program.clone(),
                status: self.status,
                stderr: self.stderr_lossy().trim_end().to_string(),
            })
        }
    }
}

/// Runs one process at a time and waits for it.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ProcessRunner {
    /// A runner without timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs `invocation` to completion and captures its output.
    ///
    /// The exit status is not checked here.
    ///
    /// # Errors
    ///
    /// - [`BenchError::Spawn`] if the program cannot be started
    /// - [`BenchError::Timeout`] if the timeout elapses first (the child is killed)
    /// - [`BenchError::Cancelled`] if the token is cancelled first (the child is killed)
    pub fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        if self.cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }

        let program = invocation.program_name();
        trace!(event = "spawn", command = %invocation);

        let mut child = invocation
            .command()
            .spawn()
            .map_err(|source| BenchError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait(&mut child, &program)?;

        Ok(ProcessOutput {
            program,
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        })
    }

    fn wait(&self, child: &mut Child, program: &str) -> Result<ExitStatus> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }

            if self.cancel.is_cancelled() {
                kill(child);
                return Err(BenchError::Cancelled);
            }

            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    kill(child);
                    return Err(BenchError::Timeout {
                        program: program.to_string(),
                        after: limit,
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

// Pipe readers of a killed child are left detached: a grandchild may still
// hold the pipe open.
fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => {
            let bytes = handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("pipe reader panicked")))?;
            Ok(bytes)
        }
    }
}
