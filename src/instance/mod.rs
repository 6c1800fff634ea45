//! Provisioned PostgreSQL instances.
//!
//! Start-up runs strictly in order: locate binaries, prepare directories,
//! `initdb`, launch `postgres`, wait for readiness, create the test database,
//! open the pool. Teardown unwinds it in one pass.

mod bootstrap;
mod cleanup;
mod init;
mod lifecycle;
mod ready;
mod types;

pub use bootstrap::connect_options;
pub use lifecycle::stop_instance;
pub use ready::{Retry, RetryError, READY_ATTEMPTS, READY_INTERVAL};
pub use types::PgInstance;

/// Superuser created by `initdb` and used for every connection.
pub const TEST_USER: &str = "test";

/// Database created for the caller.
pub const TEST_DATABASE: &str = "test";

/// Database used only to issue `CREATE DATABASE`.
pub const ADMIN_DATABASE: &str = "postgres";
