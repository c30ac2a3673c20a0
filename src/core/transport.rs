/*!
 * Remote transport: runs the account query on one host.
 *
 * `ProcessTransport` spawns `<program> <args...> <host> <remote command>`
 * with stdout and stderr redirected to capture files, then polls the child
 * so that a per-host timeout or an interrupt can kill it without blocking
 * on full pipes.
 */

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::config::AuditConfig;
use crate::core::staging::file_name_for;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw output of one remote execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the transport was killed by a signal
    pub exit_code: Option<i32>,
}

/// Per-execution context handed to a transport by the collector
#[derive(Debug, Clone, Copy)]
pub struct ExecContext<'a> {
    /// Position of the host in the host list; keeps capture names unique
    pub slot: usize,
    /// Directory for capture files
    pub capture_dir: &'a Path,
    pub timeout: Option<Duration>,
    pub interrupted: &'a AtomicBool,
}

/// Broad class of a per-host failure, used in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Timeout,
    Interrupted,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Errors isolated to a single host
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to start '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("failed waiting for transport: {0}")]
    Wait(io::Error),

    #[error("capture file '{}': {source}", path.display())]
    Capture { path: PathBuf, source: io::Error },

    /// The remote side wrote to its error stream; text is kept verbatim
    #[error("{0}")]
    Remote(String),

    #[error("transport exited with status {0}")]
    ExitStatus(i32),

    #[error("transport terminated by signal")]
    Killed,

    #[error("no response within {secs}s")]
    Timeout { secs: u64 },

    #[error("interrupted")]
    Interrupted,
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout { .. } => FailureKind::Timeout,
            TransportError::Interrupted => FailureKind::Interrupted,
            _ => FailureKind::Transport,
        }
    }
}

/// Something that can run the account query against a host.
///
/// Implementations must be usable from several worker threads at once.
pub trait Transport: Send + Sync {
    fn execute(&self, host: &str, ctx: &ExecContext<'_>) -> Result<RemoteOutput, TransportError>;
}

/// Runs the query through an external program such as `ssh`
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    program: String,
    args: Vec<String>,
    remote_command: String,
}

impl ProcessTransport {
    pub fn new(program: impl Into<String>, args: Vec<String>, remote_command: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            remote_command: remote_command.into(),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(
            config.transport.clone(),
            config.transport_args.clone(),
            config.remote_command.clone(),
        )
    }

    fn command_for(&self, host: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(host)
            .arg(&self.remote_command)
            .stdin(Stdio::null());
        command
    }
}

impl Transport for ProcessTransport {
    fn execute(&self, host: &str, ctx: &ExecContext<'_>) -> Result<RemoteOutput, TransportError> {
        let capture = CaptureFiles::new(ctx.capture_dir, ctx.slot, host);
        let stdout_file = capture.create(&capture.stdout)?;
        let stderr_file = capture.create(&capture.stderr)?;

        let mut child = self
            .command_for(host)
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if ctx.interrupted.load(Ordering::SeqCst) {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(TransportError::Interrupted);
                    }
                    if let Some(timeout) = ctx.timeout {
                        if started.elapsed() >= timeout {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(TransportError::Timeout {
                                secs: timeout.as_secs(),
                            });
                        }
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(TransportError::Wait(e));
                }
            }
        };

        debug!(host, elapsed_ms = started.elapsed().as_millis() as u64, "transport finished");

        Ok(RemoteOutput {
            stdout: capture.read(&capture.stdout)?,
            stderr: capture.read(&capture.stderr)?,
            exit_code: status.code(),
        })
    }
}

/// stdout/stderr capture files for one execution, removed on drop
struct CaptureFiles {
    stdout: PathBuf,
    stderr: PathBuf,
}

impl CaptureFiles {
    fn new(dir: &Path, slot: usize, host: &str) -> Self {
        let stem = format!("{}-{}", slot, file_name_for(host));
        Self {
            stdout: dir.join(format!("{}.out", stem)),
            stderr: dir.join(format!("{}.err", stem)),
        }
    }

    fn create(&self, path: &Path) -> Result<File, TransportError> {
        File::create(path).map_err(|source| TransportError::Capture {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read(&self, path: &Path) -> Result<String, TransportError> {
        let bytes = std::fs::read(path).map_err(|source| TransportError::Capture {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Drop for CaptureFiles {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.stdout);
        let _ = std::fs::remove_file(&self.stderr);
    }
}
