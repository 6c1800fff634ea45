//! On-disk layout of an instance.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{PgError, Result};

const TEMP_PREFIX: &str = "pgspawn";

/// Base directory of an instance with its `data` and `sock` subdirectories.
#[derive(Debug)]
pub struct Workspace {
    base: PathBuf,
    /// Set when the base directory was allocated here; `None` for a caller's directory.
    temp: Option<TempDir>,
}

impl Workspace {
    /// Use the caller's directory, or allocate a fresh one under the system temp dir.
    ///
    /// An allocated directory is removed when the workspace is dropped.
    pub fn prepare(dir: Option<&Path>) -> Result<Self> {
        let workspace = match dir {
            Some(dir) => Self {
                base: dir.to_path_buf(),
                temp: None,
            },
            None => Self::allocate_temp()?,
        };

        workspace.create_layout()?;
        Ok(workspace)
    }

    fn allocate_temp() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| PgError::io(format!("Failed to create temp dir: {}", e)))?;
        Ok(Self {
            base: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    fn create_layout(&self) -> Result<()> {
        for dir in [self.data_dir(), self.sock_dir()] {
            create_dir_all_private(&dir).map_err(|e| {
                PgError::io(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn sock_dir(&self) -> PathBuf {
        self.base.join("sock")
    }

    pub fn is_owned(&self) -> bool {
        self.temp.is_some()
    }

    /// Whether the data directory already holds an initialized cluster.
    pub fn is_initialized(&self) -> bool {
        self.data_dir().join("PG_VERSION").is_file()
    }

    /// Remove the base directory if it was allocated here. Errors are logged, never returned.
    pub fn remove(self) {
        let Some(temp) = self.temp else {
            return;
        };
        if let Err(e) = temp.close() {
            if e.kind() == std::io::ErrorKind::NotFound {
                return;
            }
            log::warn!("Failed to remove {}: {}", self.base.display(), e);
        }
    }
}

fn create_dir_all_private(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt as _;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o711)
        .create(dir)
}
