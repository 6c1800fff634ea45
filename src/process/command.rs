use std::path::Path;

use tokio::process::Command;

use crate::platform::FORCED_LOCALE;

/// Build a command for a PostgreSQL tool with the caller's environment plus a
/// forced UTF-8 locale.
pub fn prepare_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.env("LC_ALL", FORCED_LOCALE);
    cmd
}
