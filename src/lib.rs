//! Disposable PostgreSQL servers for test suites.
//!
//! [`PgInstance::start`] finds the PostgreSQL binaries, initializes a fresh
//! cluster in a temporary directory, starts `postgres` listening only on a
//! Unix-domain socket, creates a `test` database and hands back a connection
//! pool. [`PgInstance::stop`] shuts the server down and removes the files.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let pg = pgspawn::PgInstance::start(&pgspawn::Config::default()).await?;
//! sqlx::query("CREATE TABLE test (val text)")
//!     .execute(pg.pool())
//!     .await?;
//! pg.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! PostgreSQL must be installed, but does not have to be running.

#[cfg(not(unix))]
compile_error!("pgspawn talks to PostgreSQL over Unix-domain sockets and needs a Unix platform");

mod config;
mod error;
mod instance;
mod locate;
mod paths;
mod platform;
mod process;

pub use config::{Config, ENV_ARGS, ENV_BIN_DIR, ENV_DIR};
pub use error::{ErrorKind, PgError, Result};
pub use instance::{
    connect_options, stop_instance, PgInstance, Retry, RetryError, ADMIN_DATABASE,
    READY_ATTEMPTS, READY_INTERVAL, TEST_DATABASE, TEST_USER,
};
pub use locate::{find_bin_dir, locate};
pub use paths::Workspace;
pub use platform::{fallback_install_roots, FORCED_LOCALE, INIT_TOOL, SERVER_TOOL};
pub use process::{force_kill, is_process_alive, server_args};
