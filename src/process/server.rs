//! The long-lived `postgres` server process.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use super::capture::OutputCapture;
use super::command::prepare_command;
use super::control::{force_kill, graceful_signal};
use super::DRAIN_TIMEOUT;
use crate::error::{PgError, Result};
use crate::platform::SERVER_TOOL;

/// Command line for the server: socket only, TCP disabled, fsync off, then the
/// caller's arguments verbatim.
pub fn server_args(data_dir: &Path, sock_dir: &Path, additional: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-D".into(),
        data_dir.into(),
        "-k".into(),
        sock_dir.into(),
        "-h".into(),
        "".into(),
        "-F".into(),
    ];
    args.extend(additional.iter().map(OsString::from));
    args
}

/// A spawned server with its captured stdout and stderr.
///
/// Released either through [`ServerProcess::abort`] when provisioning fails,
/// or through the teardown steps once the instance is stopped. Dropping it
/// kills the process.
pub struct ServerProcess {
    child: Child,
    /// Pid at spawn, kept for reporting. Signals use `child.id()`, which is
    /// `None` once the process has been reaped.
    pid: Option<u32>,
    stdout: Option<OutputCapture>,
    stderr: Option<OutputCapture>,
}

impl ServerProcess {
    pub async fn launch(
        bin_dir: &Path,
        data_dir: &Path,
        sock_dir: &Path,
        additional_args: &[String],
    ) -> Result<Self> {
        let mut cmd = prepare_command(&bin_dir.join(SERVER_TOOL));
        cmd.args(server_args(data_dir, sock_dir, additional_args));
        let server = Self::spawn(cmd).await?;
        log::info!(
            "PostgreSQL started (pid: {:?}, socket: {})",
            server.pid,
            sock_dir.display()
        );
        Ok(server)
    }

    /// Spawn `cmd` with piped output in its own process group.
    pub(crate) async fn spawn(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| PgError::spawn_failed(format!("Failed to start PostgreSQL: {}", e)))?;
        let pid = child.id();

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(PgError::spawn_failed("Failed to capture server output"));
        };

        let tag = pid.map_or_else(|| "?".to_string(), |pid| pid.to_string());
        Ok(Self {
            child,
            pid,
            stdout: Some(OutputCapture::spawn(stdout, format!("postgres {} stdout", tag))),
            stderr: Some(OutputCapture::spawn(stderr, format!("postgres {} stderr", tag))),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit status if the process has already terminated.
    pub(crate) fn exit_status(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => Some(e.to_string()),
        }
    }

    /// Send SIGINT (fast shutdown). A process that was already reaped is not
    /// signalled.
    pub(crate) fn interrupt(&self) -> Result<()> {
        match self.child.id() {
            Some(pid) => graceful_signal(pid),
            None => {
                log::debug!("PostgreSQL (pid: {:?}) already exited", self.pid);
                Ok(())
            }
        }
    }

    /// Wait for the process to exit. Returns `false` when the wait failed or
    /// the process did not exit cleanly.
    pub(crate) async fn wait_for_exit(&mut self) -> bool {
        match self.child.wait().await {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log::warn!("PostgreSQL (pid: {:?}) exited with {}", self.pid, status);
                false
            }
            Err(e) => {
                log::warn!("Failed to wait for PostgreSQL (pid: {:?}): {}", self.pid, e);
                false
            }
        }
    }

    /// SIGKILL the process group. Best-effort.
    pub(crate) fn force_kill(&self) {
        if let Some(pid) = self.child.id() {
            if let Err(e) = force_kill(pid) {
                log::debug!("Force kill of PostgreSQL ignored: {}", e);
            }
        }
    }

    /// Close both output captures if still open.
    pub(crate) fn close_streams(&mut self) {
        if let Some(stdout) = self.stdout.take() {
            stdout.close();
        }
        if let Some(stderr) = self.stderr.take() {
            stderr.close();
        }
    }

    /// Stop the server after a failed provisioning stage and fold its output
    /// into `err`.
    ///
    /// The exit status is ignored: a signalled or non-zero exit is expected here.
    /// The pid the server was spawned with is recorded under `pid`.
    pub async fn abort(mut self, stage: &str, err: PgError) -> PgError {
        if let Err(e) = self.interrupt() {
            log::warn!("{}, killing instead", e);
            let _ = self.child.start_kill();
        }
        let _ = self.child.wait().await;

        let stdout = match self.stdout.take() {
            Some(capture) => capture.drain(DRAIN_TIMEOUT).await,
            None => String::new(),
        };
        let stderr = match self.stderr.take() {
            Some(capture) => capture.drain(DRAIN_TIMEOUT).await,
            None => String::new(),
        };

        let err = err.in_stage(stage).with_diagnostics(stdout, stderr);
        match self.pid {
            Some(pid) => err.with_field("pid", pid.to_string()),
            None => err,
        }
    }
}
