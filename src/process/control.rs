//! Signal delivery to the server process.

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::error::{PgError, Result};

/// Check if a process is alive by PID.
pub fn is_process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Ask the server for a fast shutdown.
pub(crate) fn graceful_signal(pid: u32) -> Result<()> {
    kill(Pid::from_raw(pid as i32), Signal::SIGINT).map_err(|e| {
        PgError::signal(Some(pid), format!("Failed to send SIGINT: {}", e))
    })
}

/// Kill the server and every backend it left behind.
///
/// The server is spawned as the leader of its own process group, so the group
/// id equals its pid.
pub fn force_kill(pid: u32) -> Result<()> {
    let target = Pid::from_raw(pid as i32);
    killpg(target, Signal::SIGKILL).or_else(|group_err| {
        kill(target, Signal::SIGKILL).map_err(|kill_err| {
            PgError::signal(
                Some(pid),
                format!(
                    "Failed to kill process group ({}) and process ({})",
                    group_err, kill_err
                ),
            )
        })
    })
}
