//! The provisioned instance handle.

use std::path::{Path, PathBuf};

use sqlx::postgres::{PgConnectOptions, PgPool};

use super::{TEST_DATABASE, TEST_USER};
use crate::paths::Workspace;
use crate::process::ServerProcess;

/// A running, provisioned PostgreSQL server.
///
/// Obtained from [`PgInstance::start`] and released with [`PgInstance::stop`].
/// Dropping it without `stop` kills the server and removes an auto-allocated
/// directory, but skips the orderly shutdown.
pub struct PgInstance {
    pub(super) pool: PgPool,
    pub(super) options: PgConnectOptions,
    // Field order matters on drop: the server is killed before its directory goes.
    pub(super) server: ServerProcess,
    pub(super) workspace: Workspace,
    pub(super) host: PathBuf,
}

impl PgInstance {
    /// Pool connected to the test database.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Socket directory, usable as the `host` connection parameter.
    pub fn host(&self) -> &Path {
        &self.host
    }

    pub fn user(&self) -> &str {
        TEST_USER
    }

    /// Name of the test database.
    pub fn name(&self) -> &str {
        TEST_DATABASE
    }

    pub fn base_dir(&self) -> &Path {
        self.workspace.base_dir()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.workspace.data_dir()
    }

    pub fn pid(&self) -> Option<u32> {
        self.server.pid()
    }

    /// Options for opening additional connections or pools to the test database.
    pub fn connect_options(&self) -> PgConnectOptions {
        self.options.clone()
    }

    /// libpq-style URL for the test database, e.g. for `psql`.
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}@localhost/{}?host={}",
            TEST_USER,
            TEST_DATABASE,
            self.host.display()
        )
    }
}

impl std::fmt::Debug for PgInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgInstance")
            .field("pid", &self.server.pid())
            .field("host", &self.host)
            .field("base_dir", &self.workspace.base_dir())
            .finish_non_exhaustive()
    }
}
