//! One-shot cluster initialization with `initdb`.

use std::path::Path;
use std::process::Stdio;

use super::TEST_USER;
use crate::error::{PgError, Result};
use crate::platform::INIT_TOOL;
use crate::process::prepare_command;

/// Lay out a fresh cluster in `data_dir` with a password-less superuser.
///
/// Sync is disabled; a crash may corrupt the cluster, which is fine for tests.
pub async fn init_cluster(bin_dir: &Path, data_dir: &Path) -> Result<()> {
    let output = prepare_command(&bin_dir.join(INIT_TOOL))
        .arg("-D")
        .arg(data_dir)
        .arg("--no-sync")
        .arg(format!("--username={}", TEST_USER))
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| PgError::initialization_failed(format!("Failed to run initdb: {}", e), ""))?;

    if output.status.success() {
        log::debug!("Initialized cluster in {}", data_dir.display());
        return Ok(());
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Err(PgError::initialization_failed(
        format!("Failed to initialize DB: initdb {}", output.status),
        combined,
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;

    fn fake_initdb(dir: &Path, script: &str) {
        use std::os::unix::fs::PermissionsExt as _;

        let tool = dir.join(INIT_TOOL);
        fs::write(&tool, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn passes_fixed_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let record = tmp.path().join("args");
        fake_initdb(
            tmp.path(),
            &format!("echo \"$@\" > '{}'", record.display()),
        );

        init_cluster(tmp.path(), Path::new("/data/dir")).await.unwrap();
        let args = fs::read_to_string(record).unwrap();
        assert_eq!(args.trim(), "-D /data/dir --no-sync --username=test");
    }

    #[tokio::test]
    async fn failure_carries_combined_output() {
        let tmp = tempfile::tempdir().unwrap();
        fake_initdb(
            tmp.path(),
            "echo 'The files belonging to this database system'; echo 'initdb: error: invalid locale' >&2; exit 1",
        );

        let err = init_cluster(tmp.path(), tmp.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);
        let output = err.get("output").unwrap();
        assert!(output.contains("The files belonging"));
        assert!(output.contains("invalid locale"));
    }

    #[tokio::test]
    async fn missing_tool_is_initialization_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = init_cluster(tmp.path(), tmp.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);
        assert_eq!(err.get("output"), Some(""));
    }
}
