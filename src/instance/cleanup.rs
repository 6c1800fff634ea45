//! Best-effort cleanup after an unclean server exit.

use std::path::Path;

use walkdir::WalkDir;

/// Remove every entry left in the socket directory (sockets and lock files).
///
/// Read and removal errors are logged and otherwise ignored.
pub fn remove_socket_files(sock_dir: &Path) {
    for entry in WalkDir::new(sock_dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping socket cleanup in {:?}: {}", sock_dir, e);
                return;
            }
        };
        if let Err(e) = std::fs::remove_file(entry.path()) {
            log::warn!("Failed to remove {:?}: {}", entry.path(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn removes_leftover_socket_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(".s.PGSQL.5432"), "").unwrap();
        fs::write(tmp.path().join(".s.PGSQL.5432.lock"), "").unwrap();

        remove_socket_files(tmp.path());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert!(tmp.path().is_dir());
    }

    #[test]
    fn missing_directory_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        remove_socket_files(&tmp.path().join("gone"));
    }
}
