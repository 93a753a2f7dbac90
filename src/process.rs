//! Bounded subprocess execution
//!
//! `ProcessRunner` is the only way gate components talk to external tools.
//! Output is captured fully, the exit code is reported, and a process that
//! outlives its budget (or the caller's cancellation) is killed and reaped
//! before `run` returns. On unix each child leads its own process group, and
//! the whole group is killed so helpers it started do not outlive it.

use crate::error::FailureKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long to keep draining pipes once the child itself is gone.
/// A descendant outside the process group can hold them open indefinitely;
/// whatever was read by then is kept.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A single external command invocation
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl ProcessRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell-like rendering for logs and diagnostics
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured outcome of a subprocess
///
/// Exactly one of these holds: `launch_error` is set, `timed_out` is set, or
/// the process exited on its own (`exit_code` is `None` only when a signal
/// ended it).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub cancelled: bool,
    pub launch_error: Option<String>,
    pub pid: Option<u32>,
    pub duration_ms: u64,
}

impl ProcessResult {
    pub fn launch_failure(reason: impl Into<String>) -> Self {
        Self {
            launch_error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    pub fn timeout() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.failure_kind().is_none()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.launch_error.is_some() {
            Some(FailureKind::Launch)
        } else if self.timed_out {
            Some(FailureKind::Timeout)
        } else if self.exit_code == Some(0) {
            None
        } else {
            Some(FailureKind::NonZeroExit)
        }
    }

    /// One-line cause, `None` on success
    pub fn failure_reason(&self) -> Option<String> {
        let kind = self.failure_kind()?;
        let reason = match kind {
            FailureKind::Launch => self.launch_error.clone().unwrap_or_default(),
            FailureKind::Timeout if self.cancelled => "cancelled before completion".to_string(),
            FailureKind::Timeout => format!("timed out after {}ms", self.duration_ms),
            _ => match self.exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by signal".to_string(),
            },
        };
        Some(reason)
    }

    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// Last `n` non-empty lines of stdout followed by stderr
    pub fn tail_lines(&self, n: usize) -> Vec<String> {
        let combined = self.combined_output();
        let lines: Vec<&str> = combined.lines().filter(|l| !l.trim().is_empty()).collect();
        let skip = lines.len().saturating_sub(n);
        lines[skip..].iter().map(|l| l.to_string()).collect()
    }
}

/// Runs external commands on behalf of checks and orchestrators
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, request: ProcessRequest) -> ProcessResult;
}

/// Runner backed by real OS processes
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill in-flight processes when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cap every request's timeout to the time left before `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn effective_timeout(&self, requested: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => requested.min(deadline.saturating_duration_since(Instant::now())),
            None => requested,
        }
    }
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, request: ProcessRequest) -> ProcessResult {
        let start = Instant::now();
        let budget = self.effective_timeout(request.timeout);

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        tracing::debug!(
            command = %request.display_command(),
            timeout_ms = budget.as_millis() as u64,
            "spawning process"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(
                    program = %request.program.display(),
                    error = %err,
                    "failed to launch process"
                );
                let mut result = ProcessResult::launch_failure(format!(
                    "failed to launch {}: {}",
                    request.program.display(),
                    err
                ));
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        let pid = child.id();
        let stdout = OutputBuffer::default();
        let stderr = OutputBuffer::default();
        let stdout_task = spawn_reader(child.stdout.take(), stdout.clone());
        let stderr_task = spawn_reader(child.stderr.take(), stderr.clone());

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = tokio::time::sleep(budget) => WaitOutcome::TimedOut,
            _ = self.cancel.cancelled() => WaitOutcome::Cancelled,
        };

        let mut result = ProcessResult {
            pid,
            ..ProcessResult::default()
        };

        let stopped = match outcome {
            WaitOutcome::Exited(Ok(status)) => {
                result.exit_code = status.code();
                None
            }
            WaitOutcome::Exited(Err(err)) => {
                result.launch_error = Some(format!(
                    "lost track of {}: {}",
                    request.program.display(),
                    err
                ));
                None
            }
            WaitOutcome::TimedOut => Some(false),
            WaitOutcome::Cancelled => Some(true),
        };

        if let Some(cancelled) = stopped {
            kill_process_group(pid);
            // kill() sends SIGKILL and waits, so the child is reaped here
            if let Err(err) = child.kill().await {
                tracing::warn!(pid = ?pid, error = %err, "failed to kill process");
            }
            tracing::warn!(
                command = %request.display_command(),
                timeout_ms = budget.as_millis() as u64,
                cancelled,
                "process did not finish in time; killed"
            );
            result.timed_out = true;
            result.cancelled = cancelled;
        }

        result.stdout = drain(stdout_task, &stdout).await;
        result.stderr = drain(stderr_task, &stderr).await;
        result.duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            command = %request.display_command(),
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            duration_ms = result.duration_ms,
            "process finished"
        );

        result
    }
}

/// Bytes read from one pipe so far, shared with its reader task
#[derive(Clone, Default)]
struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    fn append(&self, chunk: &[u8]) {
        self.0.lock().extend_from_slice(chunk);
    }

    fn snapshot(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

fn spawn_reader<R>(pipe: Option<R>, sink: OutputBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => sink.append(&chunk[..n]),
                Err(err) => {
                    tracing::debug!(error = %err, "pipe read ended early");
                    break;
                }
            }
        }
    })
}

/// Waits briefly for the reader to hit EOF, then returns everything captured
async fn drain(mut task: JoinHandle<()>, sink: &OutputBuffer) -> String {
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(error = %err, "output reader task failed"),
        Err(_) => {
            task.abort();
            tracing::debug!("pipe still open after grace period; keeping partial output");
        }
    }
    sink.snapshot()
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    // the child leads its group, so its pid is the group id
    if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(pgid = pid, error = %err, "failed to signal process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Locate an executable by path or by searching `PATH`
pub fn resolve_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| candidate_names(&dir, program))
        .find(|candidate| candidate.is_file())
}

fn candidate_names(dir: &Path, program: &Path) -> Vec<PathBuf> {
    let mut names = vec![dir.join(program)];
    if cfg!(windows) && program.extension().is_none() {
        names.push(dir.join(program).with_extension("exe"));
    }
    names
}
