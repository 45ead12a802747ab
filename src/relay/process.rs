//! Scoped handle over one transcoder subprocess.
//!
//! A `MixerProcess` is acquired when a relay request starts and released by
//! exactly one call to [`MixerProcess::shutdown`]: interrupt once, wait out the
//! grace period, then kill. If the handle is dropped without a shutdown (the
//! runtime is gone), `kill_on_drop` still takes the process down.

use std::{
    io,
    process::{ExitStatus, Stdio},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, ChildStdout, Command},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::common::{errors::RelayError, types::StreamId};

/// How long to keep draining stderr after the process is gone.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a relay stopped. Recorded once per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    ClientClosed,
    SubprocessError,
    SubprocessExit,
    ServerShutdown,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ClientClosed => "client-closed",
            Self::SubprocessError => "subprocess-error",
            Self::SubprocessExit => "subprocess-exit",
            Self::ServerShutdown => "server-shutdown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub reason: TerminationReason,
    /// Graceful interrupts delivered. Never more than one.
    pub interrupts: u32,
    /// Whether the grace period ran out and the process had to be killed.
    pub killed: bool,
    pub status: Option<ExitStatus>,
}

impl ShutdownReport {
    pub fn exit_summary(&self) -> String {
        match self.status {
            Some(status) => describe_status(status),
            None => "unknown".to_string(),
        }
    }
}

fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("code {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {}", signal);
        }
    }
    "no status".to_string()
}

/// Number of relay subprocesses not yet reaped.
#[derive(Debug, Clone, Default)]
pub struct ActiveStreams(Arc<AtomicUsize>);

impl ActiveStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) -> ActiveGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        ActiveGuard(self.0.clone())
    }

    /// Polls until every subprocess has been released or `timeout` passes.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

#[derive(Debug)]
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct MixerProcess {
    id: StreamId,
    child: Child,
    stderr_task: Option<JoinHandle<()>>,
    interrupts: u32,
    _active: ActiveGuard,
}

impl MixerProcess {
    /// Launches `program` with stdin closed and stdout/stderr piped.
    /// Returns the handle and the stdout pipe the response body reads from.
    pub fn spawn(
        id: StreamId,
        program: &str,
        args: &[String],
        active: &ActiveStreams,
    ) -> Result<(Self, ChildStdout), RelayError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The interrupt must reach the transcoder even when we were started
        // with SIGINT ignored (nohup, backgrounded by a script).
        #[cfg(unix)]
        unsafe {
            command.pre_exec(|| {
                libc::signal(libc::SIGINT, libc::SIG_DFL);
                Ok(())
            });
        }

        let mut child = command
            .spawn()
            .map_err(|source| RelayError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(RelayError::MissingPipe("stdout"))?;
        let stderr_task = child.stderr.take().map(|stderr| drain_stderr(id, stderr));

        debug!("[{}] transcoder started (pid {:?})", id, child.id());

        Ok((
            Self {
                id,
                child,
                stderr_task,
                interrupts: 0,
                _active: active.acquire(),
            },
            stdout,
        ))
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Sends the graceful interrupt. A second call is a no-op.
    fn interrupt(&mut self) -> io::Result<()> {
        if self.interrupts > 0 {
            return Ok(());
        }
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        send_interrupt(pid)?;
        self.interrupts += 1;
        debug!("[{}] sent interrupt to pid {}", self.id, pid);
        Ok(())
    }

    async fn wait_for(&mut self, grace: Duration) -> Option<ExitStatus> {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!("[{}] failed to wait on transcoder: {}", self.id, e);
                None
            }
            Err(_) => None,
        }
    }

    /// Releases the process on every path. When stdout has already closed
    /// (`SubprocessExit`) the process is first given `grace` to exit on its own.
    pub async fn shutdown(mut self, reason: TerminationReason, grace: Duration) -> ShutdownReport {
        let mut killed = false;

        let mut status = match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!("[{}] failed to poll transcoder: {}", self.id, e);
                None
            }
        };

        if status.is_none() && reason == TerminationReason::SubprocessExit {
            status = self.wait_for(grace).await;
        }

        if status.is_none() {
            match self.interrupt() {
                Ok(()) if self.interrupts > 0 => status = self.wait_for(grace).await,
                Ok(()) => {}
                Err(e) => warn!("[{}] interrupt failed, escalating: {}", self.id, e),
            }
        }

        if status.is_none() {
            warn!(
                "[{}] transcoder ignored interrupt for {:?}, killing",
                self.id, grace
            );
            if let Err(e) = self.child.kill().await {
                error!("[{}] failed to kill transcoder: {}", self.id, e);
            }
            killed = true;
            status = self.child.try_wait().ok().flatten();
        }

        if let Some(task) = self.stderr_task.take() {
            let _ = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, task).await;
        }

        let report = ShutdownReport {
            reason,
            interrupts: self.interrupts,
            killed,
            status,
        };

        let clean = matches!(report.status, Some(s) if s.success());
        if clean || reason == TerminationReason::ClientClosed {
            info!(
                "[{}] transcoder terminated ({}): {}",
                self.id,
                reason,
                report.exit_summary()
            );
        } else {
            warn!(
                "[{}] transcoder terminated ({}): {}",
                self.id,
                reason,
                report.exit_summary()
            );
        }

        report
    }
}

fn drain_stderr(id: StreamId, stderr: ChildStderr) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => warn!("[{}] ffmpeg: {}", id, line.trim_end()),
                Ok(None) => break,
                Err(e) => {
                    debug!("[{}] stderr closed: {}", id, e);
                    break;
                }
            }
        }
    })
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> io::Result<()> {
    // SAFETY: kill(2) takes plain integers. The pid belongs to a child we have
    // not reaped yet, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_interrupt(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful interrupt is only available on unix",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    /// Blocks until the script has installed its traps and printed `ready`.
    async fn wait_ready(stdout: ChildStdout) -> BufReader<ChildStdout> {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), "ready");
        reader
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_with_program_name() {
        let active = ActiveStreams::new();
        let result = MixerProcess::spawn(
            StreamId::next(),
            "/definitely/not/a/transcoder",
            &[],
            &active,
        );
        match result {
            Err(RelayError::Spawn { program, .. }) => {
                assert_eq!(program, "/definitely/not/a/transcoder")
            }
            _ => panic!("expected spawn error"),
        }
        assert_eq!(active.count(), 0);
    }

    #[tokio::test]
    async fn running_process_gets_exactly_one_interrupt() {
        let active = ActiveStreams::new();
        let (process, stdout) = MixerProcess::spawn(
            StreamId::next(),
            "sh",
            &sh("trap 'exit 130' INT; echo ready; while :; do sleep 0.05; done"),
            &active,
        )
        .unwrap();
        let _stdout = wait_ready(stdout).await;
        assert_eq!(active.count(), 1);

        let report = process
            .shutdown(TerminationReason::ClientClosed, Duration::from_secs(2))
            .await;

        assert_eq!(report.interrupts, 1);
        assert!(!report.killed);
        assert_eq!(report.status.and_then(|s| s.code()), Some(130));
        assert_eq!(active.count(), 0);
    }

    #[tokio::test]
    async fn ignored_interrupt_escalates_to_kill() {
        let active = ActiveStreams::new();
        let (process, stdout) = MixerProcess::spawn(
            StreamId::next(),
            "sh",
            &sh("trap '' INT; echo ready; while :; do sleep 0.05; done"),
            &active,
        )
        .unwrap();
        let _stdout = wait_ready(stdout).await;

        let report = process
            .shutdown(TerminationReason::ClientClosed, Duration::from_millis(200))
            .await;

        assert_eq!(report.interrupts, 1);
        assert!(report.killed);
        assert_eq!(active.count(), 0);
    }

    #[tokio::test]
    async fn exited_process_is_reaped_without_signals() {
        let active = ActiveStreams::new();
        let (process, _stdout) =
            MixerProcess::spawn(StreamId::next(), "sh", &sh("exit 3"), &active).unwrap();

        let report = process
            .shutdown(TerminationReason::SubprocessExit, Duration::from_secs(2))
            .await;

        assert_eq!(report.interrupts, 0);
        assert!(!report.killed);
        assert_eq!(report.status.and_then(|s| s.code()), Some(3));
        assert_eq!(report.exit_summary(), "code 3");
    }

    #[tokio::test]
    async fn stderr_output_does_not_end_the_process() {
        let active = ActiveStreams::new();
        let (process, stdout) = MixerProcess::spawn(
            StreamId::next(),
            "sh",
            &sh("echo 'feed stalled' >&2; trap 'exit 0' INT; echo ready; while :; do sleep 0.05; done"),
            &active,
        )
        .unwrap();

        let _stdout = wait_ready(stdout).await;
        assert_eq!(active.count(), 1);

        let report = process
            .shutdown(TerminationReason::ClientClosed, Duration::from_secs(2))
            .await;
        assert_eq!(report.interrupts, 1);
        assert!(report.status.map(|s| s.success()).unwrap_or(false));
    }

    #[tokio::test]
    async fn wait_until_idle_times_out_while_streams_are_live() {
        let active = ActiveStreams::new();
        let guard = active.acquire();
        assert!(!active.wait_until_idle(Duration::from_millis(50)).await);
        drop(guard);
        assert!(active.wait_until_idle(Duration::from_millis(50)).await);
    }
}
