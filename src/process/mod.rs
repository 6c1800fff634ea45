//! Process management for PostgreSQL tools.

mod capture;
mod command;
mod control;
mod server;

use std::time::Duration;

pub use command::prepare_command;
pub use control::{force_kill, is_process_alive};
pub use server::{server_args, ServerProcess};

/// Bytes of each output stream kept for diagnostics (the tail wins).
const CAPTURE_LIMIT: usize = 64 * 1024;

/// How long the abort sequence waits for the output streams to reach EOF.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
