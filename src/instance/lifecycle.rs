//! Instance lifecycle management (start/stop).

use std::path::Path;

use sqlx::postgres::{PgConnectOptions, PgPool};

use super::bootstrap::{connect_options, create_test_database, open_test_pool};
use super::cleanup::remove_socket_files;
use super::init::init_cluster;
use super::ready::{wait_until_ready, Retry};
use super::types::PgInstance;
use super::{ADMIN_DATABASE, TEST_DATABASE};
use crate::config::Config;
use crate::error::{PgError, Result};
use crate::locate::find_bin_dir;
use crate::paths::Workspace;
use crate::process::ServerProcess;

impl PgInstance {
    /// Start a fresh server and create the test database in it.
    ///
    /// The server runs with fsync disabled, so it is faster and less durable
    /// than a production setup. On failure nothing is left running and an
    /// auto-allocated directory is removed; errors raised after the server was
    /// spawned carry its stdout and stderr.
    pub async fn start(config: &Config) -> Result<Self> {
        let bin_dir = find_bin_dir(config.bin_dir.as_deref())?;
        let workspace = Workspace::prepare(config.dir.as_deref())?;
        let sock_dir = workspace.sock_dir();

        let reused = workspace.is_initialized();
        if reused {
            log::info!(
                "Reusing initialized cluster in {}",
                workspace.data_dir().display()
            );
        } else {
            init_cluster(&bin_dir, &workspace.data_dir()).await?;
        }

        let mut server = ServerProcess::launch(
            &bin_dir,
            &workspace.data_dir(),
            &sock_dir,
            &config.additional_args,
        )
        .await?;

        match bring_up(&mut server, &sock_dir, reused).await {
            Ok((pool, options)) => Ok(Self {
                pool,
                options,
                server,
                workspace,
                host: sock_dir,
            }),
            Err((stage, err)) => Err(server.abort(stage, err).await),
        }
    }

    /// Stop the server and remove storage files.
    ///
    /// Only a failure to signal the server is reported; every later step is
    /// best-effort and runs regardless.
    pub async fn stop(self) -> Result<()> {
        let Self {
            pool,
            mut server,
            workspace,
            host,
            ..
        } = self;

        pool.close().await;

        let signalled = server.interrupt();
        if signalled.is_ok() && !server.wait_for_exit().await {
            server.force_kill();
            remove_socket_files(&host);
        }

        server.close_streams();
        drop(server);
        workspace.remove();

        log::info!("PostgreSQL instance at {} stopped", host.display());
        signalled
    }
}

/// Stop `instance` if there is one. A missing instance is not an error.
pub async fn stop_instance(instance: Option<PgInstance>) -> Result<()> {
    match instance {
        Some(instance) => instance.stop().await,
        None => Ok(()),
    }
}

/// Readiness, bootstrap and pool stages. Errors name the failed stage so the
/// caller can run the abort sequence.
async fn bring_up(
    server: &mut ServerProcess,
    sock_dir: &Path,
    reused: bool,
) -> std::result::Result<(PgPool, PgConnectOptions), (&'static str, PgError)> {
    let admin_options = connect_options(sock_dir, ADMIN_DATABASE)
        .map_err(|e| ("Failed to create connection options", e))?;
    let admin = wait_until_ready(server, &admin_options, Retry::READINESS)
        .await
        .map_err(|e| ("Failed to connect to postgres DB", e))?;

    create_test_database(admin, reused)
        .await
        .map_err(|e| ("Failed to create test DB", e))?;

    let options = connect_options(sock_dir, TEST_DATABASE)
        .map_err(|e| ("Failed to create connection options", e))?;
    let pool = open_test_pool(options.clone())
        .await
        .map_err(|e| ("Failed to connect to test DB", e))?;

    Ok((pool, options))
}
