//! Platform packaging conventions for PostgreSQL installs.

use std::path::PathBuf;

/// Name of the tool whose presence identifies a binary directory.
pub const INIT_TOOL: &str = "initdb";

/// Name of the server executable.
pub const SERVER_TOOL: &str = "postgres";

/// Locale forced onto spawned tools. Some platforms default to a locale that
/// makes `initdb` refuse to run.
#[cfg(target_os = "linux")]
pub const FORCED_LOCALE: &str = "C.UTF-8";

/// Locale forced onto spawned tools. Some platforms default to a locale that
/// makes `initdb` refuse to run.
#[cfg(not(target_os = "linux"))]
pub const FORCED_LOCALE: &str = "en_US.UTF-8";

/// Roots that hold one or more versioned installs, each with a `bin/` directory.
///
/// Debian/Ubuntu keep `initdb` out of `$PATH` under `/usr/lib/postgresql/<ver>/bin`.
pub fn fallback_install_roots() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/usr/lib/postgresql"),
            PathBuf::from("/opt/homebrew/opt"),
            PathBuf::from("/Applications/Postgres.app/Contents/Versions"),
        ]
    }

    #[cfg(not(target_os = "macos"))]
    {
        vec![PathBuf::from("/usr/lib/postgresql")]
    }
}
