//! Test database creation and the caller-facing pool.

use std::path::Path;
use std::str::FromStr as _;

use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions as _, Connection as _};

use super::TEST_USER;
use crate::error::{PgError, Result};

const CREATE_TEST_DATABASE: &str = "CREATE DATABASE test";

/// SQLSTATE `duplicate_database`.
const DUPLICATE_DATABASE: &str = "42P04";

/// Connect options for `database` on the instance's socket directory.
pub fn connect_options(sock_dir: &Path, database: &str) -> Result<PgConnectOptions> {
    let url = format!("postgres://{}@localhost/{}", TEST_USER, database);
    let options = PgConnectOptions::from_str(&url)
        .map_err(|e| PgError::config_parse(format!("Invalid connection url {}: {}", url, e)))?;
    Ok(options.socket(sock_dir).ssl_mode(PgSslMode::Disable))
}

/// Create the test database over the administrative connection, then close it.
///
/// With `allow_existing` an already present database is accepted, which
/// happens when a persistent directory is reused.
pub async fn create_test_database(mut admin: PgConnection, allow_existing: bool) -> Result<()> {
    let result = sqlx::raw_sql(CREATE_TEST_DATABASE).execute(&mut admin).await;

    if let Err(e) = admin.close().await {
        log::debug!("Closing administrative connection failed: {}", e);
    }

    match result {
        Ok(_) => Ok(()),
        Err(e) if allow_existing && is_duplicate_database(&e) => {
            log::info!("Test database already exists, reusing it");
            Ok(())
        }
        Err(e) => Err(PgError::bootstrap(e.to_string())),
    }
}

fn is_duplicate_database(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == DUPLICATE_DATABASE)
}

/// Open the pool handed to the caller. Every statement is logged at trace level.
pub async fn open_test_pool(options: PgConnectOptions) -> Result<PgPool> {
    PgPoolOptions::new()
        .connect_with(options.log_statements(log::LevelFilter::Trace))
        .await
        .map_err(|e| PgError::pool_open(e.to_string()))
}
