//! Instance settings, from code, TOML or the environment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PgError, Result};

/// Environment variable overriding [`Config::bin_dir`].
pub const ENV_BIN_DIR: &str = "PGSPAWN_BIN_DIR";
/// Environment variable overriding [`Config::dir`].
pub const ENV_DIR: &str = "PGSPAWN_DIR";
/// Environment variable overriding [`Config::additional_args`], whitespace separated.
pub const ENV_ARGS: &str = "PGSPAWN_ARGS";

/// Settings for a single instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory containing `initdb` and `postgres`. Searched for when unset.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,
    /// Base directory for database files. Owned by the caller and kept on
    /// teardown; a temporary directory is allocated and removed when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Extra arguments appended to the `postgres` command line.
    #[serde(default)]
    pub additional_args: Vec<String>,
}

impl Config {
    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(bin_dir.into());
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let content = content.trim_start_matches('\u{feff}');
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PgError::config_parse(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with the `PGSPAWN_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Overlay the `PGSPAWN_*` environment variables. Empty values are ignored.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bin_dir) = non_empty(ENV_BIN_DIR) {
            self.bin_dir = Some(PathBuf::from(bin_dir));
        }
        if let Some(dir) = non_empty(ENV_DIR) {
            self.dir = Some(PathBuf::from(dir));
        }
        if let Some(args) = non_empty(ENV_ARGS) {
            self.additional_args = args.split_whitespace().map(str::to_string).collect();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = Config::from_toml_str(
            r#"
            bin_dir = "/usr/lib/postgresql/16/bin"
            dir = "/tmp/pgdata"
            additional_args = ["-c", "wal_level=logical"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.bin_dir.as_deref(),
            Some(Path::new("/usr/lib/postgresql/16/bin"))
        );
        assert_eq!(config.dir.as_deref(), Some(Path::new("/tmp/pgdata")));
        assert_eq!(config.additional_args, vec!["-c", "wal_level=logical"]);
    }

    #[test]
    fn invalid_toml_is_config_parse_error() {
        let err = Config::from_toml_str("additional_args = 3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigParseFailed);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigParseFailed);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pgspawn.toml");
        fs::write(&path, "additional_args = [\"-c\", \"fsync=off\"]\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.additional_args, vec!["-c", "fsync=off"]);
    }

    #[test]
    fn env_overrides_and_skips_empty_values() {
        let vars = HashMap::from([
            (ENV_BIN_DIR, "/opt/pg/bin"),
            (ENV_DIR, "  "),
            (ENV_ARGS, "-c  wal_level=logical"),
        ]);
        let config = Config::default()
            .with_dir("/keep/me")
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.bin_dir.as_deref(), Some(Path::new("/opt/pg/bin")));
        assert_eq!(config.dir.as_deref(), Some(Path::new("/keep/me")));
        assert_eq!(config.additional_args, vec!["-c", "wal_level=logical"]);
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        std::env::set_var(ENV_ARGS, "-c fsync=off");
        let config = Config::from_env();
        std::env::remove_var(ENV_ARGS);

        assert_eq!(config.additional_args, vec!["-c", "fsync=off"]);
    }

    #[test]
    fn builder_appends_args() {
        let config = Config::default()
            .with_args(["-c", "a=1"])
            .with_args(vec!["-c".to_string(), "b=2".to_string()]);
        assert_eq!(config.additional_args, vec!["-c", "a=1", "-c", "b=2"]);
    }
}
