//! Crate error types.

use std::fmt;

/// Error raised while provisioning or tearing down an instance.
///
/// Failures after the server process was spawned carry the server's captured
/// stdout/stderr, see [`PgError::stdout`] and [`PgError::stderr`].
#[derive(Debug)]
pub struct PgError {
    payload: Vec<(String, String)>,
    kind: ErrorKind,
    diagnostics: Option<Diagnostics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No directory containing `initdb` was found
    BinaryNotFound,
    /// `initdb` could not be run or exited unsuccessfully
    InitializationFailed,
    /// The server process could not be spawned
    ProcessSpawnFailed,
    /// Configuration or connection options could not be parsed
    ConfigParseFailed,
    /// The server never accepted a connection within the retry budget
    ReadinessTimeout,
    /// The test database could not be created
    BootstrapFailed,
    /// The test database pool could not be opened
    PoolOpenFailed,
    /// The server process could not be signalled during teardown
    SignalFailed,
    /// File system error
    Io,
}

#[derive(Debug, Clone, Default)]
struct Diagnostics {
    stdout: String,
    stderr: String,
}

impl PgError {
    pub fn new(kind: ErrorKind, payload: Vec<(String, String)>) -> Self {
        Self {
            payload,
            kind,
            diagnostics: None,
        }
    }

    /// Create an error with a single "detail" key from a non-empty string,
    /// or an empty payload if the string is empty.
    fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let payload = if detail.is_empty() {
            Vec::new()
        } else {
            vec![("detail".to_string(), detail)]
        };
        Self::new(kind, payload)
    }

    pub fn binary_not_found(searched: &[std::path::PathBuf]) -> Self {
        let searched = searched
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        Self::new(
            ErrorKind::BinaryNotFound,
            vec![("searched".to_string(), searched)],
        )
    }

    pub fn initialization_failed(detail: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::InitializationFailed,
            vec![
                ("detail".to_string(), detail.into()),
                ("output".to_string(), output.into()),
            ],
        )
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::ProcessSpawnFailed, message)
    }

    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::ConfigParseFailed, message)
    }

    pub fn readiness_timeout(attempts: u32, last_error: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ReadinessTimeout,
            vec![
                ("attempts".to_string(), attempts.to_string()),
                ("last_error".to_string(), last_error.into()),
            ],
        )
    }

    pub fn bootstrap(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::BootstrapFailed, message)
    }

    pub fn pool_open(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::PoolOpenFailed, message)
    }

    pub fn signal(pid: Option<u32>, detail: impl Into<String>) -> Self {
        let pid = pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
        Self::new(
            ErrorKind::SignalFailed,
            vec![
                ("pid".to_string(), pid),
                ("detail".to_string(), detail.into()),
            ],
        )
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Io, message)
    }

    /// Prefix the payload with the provisioning stage that failed.
    pub(crate) fn in_stage(mut self, stage: &str) -> Self {
        self.payload.insert(0, ("stage".to_string(), stage.to_string()));
        self
    }

    /// Append a payload entry.
    pub(crate) fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload.push((key.to_string(), value.into()));
        self
    }

    /// Attach the server's captured output streams.
    pub(crate) fn with_diagnostics(mut self, stdout: String, stderr: String) -> Self {
        self.diagnostics = Some(Diagnostics { stdout, stderr });
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Look up a payload value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Captured server stdout, present once the server had been spawned.
    pub fn stdout(&self) -> Option<&str> {
        self.diagnostics.as_ref().map(|d| d.stdout.as_str())
    }

    /// Captured server stderr, present once the server had been spawned.
    pub fn stderr(&self) -> Option<&str> {
        self.diagnostics.as_ref().map(|d| d.stderr.as_str())
    }
}

impl fmt::Display for PgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{:?}", self.kind)?;
        } else {
            let pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "{:?}: {}", self.kind, pairs.join(", "))?;
        }
        if let Some(diag) = &self.diagnostics {
            write!(f, "\nOUT: {}\nERR: {}", diag.stdout, diag.stderr)?;
        }
        Ok(())
    }
}

impl std::error::Error for PgError {}

impl From<std::io::Error> for PgError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for PgError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_parse(err.to_string())
    }
}

impl From<walkdir::Error> for PgError {
    fn from(err: walkdir::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<sqlx::Error> for PgError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => Self::config_parse(e.to_string()),
            other => Self::pool_open(other.to_string()),
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, PgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_payload_is_kind_only() {
        let err = PgError::new(ErrorKind::BootstrapFailed, Vec::new());
        assert_eq!(err.to_string(), "BootstrapFailed");
    }

    #[test]
    fn display_keeps_payload_order() {
        let err = PgError::bootstrap("relation exists").in_stage("Failed to create test DB");
        assert_eq!(
            err.to_string(),
            "BootstrapFailed: stage=Failed to create test DB, detail=relation exists"
        );
        assert_eq!(err.get("detail"), Some("relation exists"));
    }

    #[test]
    fn diagnostics_are_rendered_after_payload() {
        let err = PgError::readiness_timeout(3, "connection refused")
            .with_diagnostics("hello".to_string(), "FATAL: boom".to_string());
        let rendered = err.to_string();
        assert!(rendered.starts_with("ReadinessTimeout: attempts=3, last_error=connection refused"));
        assert!(rendered.ends_with("\nOUT: hello\nERR: FATAL: boom"));
        assert_eq!(err.stdout(), Some("hello"));
        assert_eq!(err.stderr(), Some("FATAL: boom"));
    }

    #[test]
    fn empty_detail_yields_empty_payload() {
        let err = PgError::spawn_failed("");
        assert_eq!(err.kind(), ErrorKind::ProcessSpawnFailed);
        assert!(err.get("detail").is_none());
        assert!(err.stdout().is_none());
    }

    #[test]
    fn io_errors_convert_to_io_kind() {
        let err: PgError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.get("detail"), Some("gone"));
    }
}
