//! Discovery of the directory holding the PostgreSQL executables.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PgError, Result};
use crate::platform::{fallback_install_roots, INIT_TOOL};

/// Find the directory containing `initdb` and `postgres`.
///
/// Without a hint `$PATH` is searched first. Then the hint (if any) and the
/// platform install roots are scanned in order.
pub fn find_bin_dir(hint: Option<&Path>) -> Result<PathBuf> {
    let search_path = std::env::var_os("PATH");
    locate(hint, search_path.as_deref(), &fallback_install_roots())
}

/// Pure lookup behind [`find_bin_dir`]; the search path and roots are explicit.
pub fn locate(
    hint: Option<&Path>,
    search_path: Option<&OsStr>,
    roots: &[PathBuf],
) -> Result<PathBuf> {
    if hint.is_none() {
        if let Some(dir) = search_path.and_then(find_in_search_path) {
            return Ok(dir);
        }
    }

    let folders: Vec<PathBuf> = hint
        .map(Path::to_path_buf)
        .into_iter()
        .chain(roots.iter().cloned())
        .collect();

    for folder in &folders {
        if let Some(dir) = scan_folder(folder)? {
            log::debug!("Found PostgreSQL binaries in {}", dir.display());
            return Ok(dir);
        }
    }

    Err(PgError::binary_not_found(&folders))
}

fn find_in_search_path(search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find(|dir| is_executable(&dir.join(INIT_TOOL)))
}

/// Look for `initdb` directly in `folder`, then in `folder/*/bin`.
fn scan_folder(folder: &Path) -> Result<Option<PathBuf>> {
    let meta = match fs::metadata(folder) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PgError::io(format!(
                "Failed to inspect {}: {}",
                folder.display(),
                e
            )))
        }
    };
    if !meta.is_dir() {
        return Ok(None);
    }

    let entries = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_dir = entry.file_type().is_dir() || (entry.path_is_symlink() && path.is_dir());

        if !is_dir {
            if entry.file_name() == INIT_TOOL {
                return Ok(Some(folder.to_path_buf()));
            }
            continue;
        }

        let bin = path.join("bin");
        if bin.join(INIT_TOOL).exists() {
            return Ok(Some(bin));
        }
    }

    Ok(None)
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
