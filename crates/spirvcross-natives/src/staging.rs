//! Staging directories
//!
//! Each bootstrap attempt stages its libraries into a fresh directory named
//! `<prefix>-<pid>-<random>` under the staging root. The directory and its files
//! are removed once every load has been attempted; a mapped library does not
//! need its file to stay on disk.
//!
//! Removal is best effort. Some platforms refuse to delete a file that is still
//! mapped, so directories can be left behind; [`sweep_stale`] removes those on a
//! later run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::BootstrapError;

/// A staging directory owned by one bootstrap attempt.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Create a new, uniquely named staging directory under `root`.
    ///
    /// Fails if the directory cannot be created; there is no retry.
    pub fn create(root: &Path, prefix: &str) -> Result<Self, BootstrapError> {
        let name = format!("{}-{}-{:016x}", prefix, std::process::id(), rand::random::<u64>());
        let path = root.join(name);

        fs::create_dir_all(root)
            .and_then(|_| fs::create_dir(&path))
            .map_err(|source| BootstrapError::StagingDirectory {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Created staging directory {}", path.display());
        Ok(Self { path })
    }

    /// Path of the staging directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file staged under this directory.
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

/// Delete staged files, then the staging directory.
///
/// Every failure is logged as a warning and returned; none of them are fatal.
pub fn clean(dir: &StagingDir, staged: &[PathBuf]) -> Vec<BootstrapError> {
    let mut failures = Vec::new();

    for path in staged {
        if path.exists() {
            if let Err(source) = fs::remove_file(path) {
                tracing::warn!("Unable to delete staged library {}: {}", path.display(), source);
                failures.push(BootstrapError::Cleanup {
                    path: path.clone(),
                    source,
                });
            }
        }
    }

    if dir.path().exists() {
        if let Err(source) = fs::remove_dir(dir.path()) {
            tracing::warn!(
                "Unable to delete staging directory {}: {}",
                dir.path().display(),
                source
            );
            failures.push(BootstrapError::Cleanup {
                path: dir.path().to_path_buf(),
                source,
            });
        }
    }

    failures
}

/// Remove staging directories left behind by other processes.
///
/// A directory under `root` is stale when its name is `<prefix>-<pid>-<hex>`,
/// the pid is not the current process, and either that process is gone (Unix
/// only) or the directory has not been modified for `stale_after`.
/// Returns the removed directories.
pub fn sweep_stale(root: &Path, prefix: &str, stale_after: Duration) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping sweep of {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let own_pid = std::process::id();
    let now = SystemTime::now();
    let mut removed = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(pid) = parse_owner_pid(name, prefix) else {
            continue;
        };
        if pid == own_pid || !path.is_dir() {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= stale_after);

        if !expired && process_alive(pid) {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::info!("Removed stale staging directory {}", path.display());
                removed.push(path);
            }
            Err(e) => {
                tracing::warn!(
                    "Unable to remove stale staging directory {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    removed
}

/// Extract the owning pid from a staging directory name.
fn parse_owner_pid(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
    let (pid, suffix) = rest.split_once('-')?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    pid.parse().ok()
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks for existence. EPERM means it exists but is not ours.
    let result = unsafe { libc::kill(pid, 0) };
    result == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

// No cheap liveness check here; rely on the age threshold.
#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_unique_dirs() {
        let root = tempfile::tempdir().unwrap();
        let a = StagingDir::create(root.path(), "natives").unwrap();
        let b = StagingDir::create(root.path(), "natives").unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        let name = a.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(parse_owner_pid(name, "natives"), Some(std::process::id()));
    }

    #[test]
    fn test_create_fails_under_file() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let result = StagingDir::create(&blocker, "natives");
        assert!(matches!(result, Err(BootstrapError::StagingDirectory { .. })));
    }

    #[test]
    fn test_clean_removes_files_and_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = StagingDir::create(root.path(), "natives").unwrap();
        let a = dir.file_path("libA.so");
        let b = dir.file_path("libB.so");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let failures = clean(&dir, &[a.clone(), b.clone()]);
        assert!(failures.is_empty());
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(!dir.path().exists());
    }

    #[test]
    fn test_clean_tolerates_already_deleted() {
        let root = tempfile::tempdir().unwrap();
        let dir = StagingDir::create(root.path(), "natives").unwrap();
        let gone = dir.file_path("libGone.so");

        let failures = clean(&dir, &[gone]);
        assert!(failures.is_empty());
        assert!(!dir.path().exists());
    }

    #[test]
    fn test_clean_reports_untracked_leftovers() {
        let root = tempfile::tempdir().unwrap();
        let dir = StagingDir::create(root.path(), "natives").unwrap();
        fs::write(dir.file_path("stray"), b"x").unwrap();

        let failures = clean(&dir, &[]);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], BootstrapError::Cleanup { .. }));
        assert!(dir.path().exists());
    }

    #[test]
    fn test_parse_owner_pid() {
        assert_eq!(parse_owner_pid("natives-42-00ff", "natives"), Some(42));
        assert_eq!(parse_owner_pid("natives-42-", "natives"), None);
        assert_eq!(parse_owner_pid("natives-42-zz", "natives"), None);
        assert_eq!(parse_owner_pid("natives-x-00ff", "natives"), None);
        assert_eq!(parse_owner_pid("other-42-00ff", "natives"), None);
        assert_eq!(parse_owner_pid("nativesX-42-00ff", "natives"), None);
    }

    #[test]
    fn test_sweep_removes_expired_foreign_dirs() {
        let root = tempfile::tempdir().unwrap();
        let foreign = root.path().join("natives-4000000-abcdef");
        fs::create_dir(&foreign).unwrap();
        fs::write(foreign.join("libA.so"), b"a").unwrap();
        let own = StagingDir::create(root.path(), "natives").unwrap();
        let unrelated = root.path().join("keep-me");
        fs::create_dir(&unrelated).unwrap();

        let removed = sweep_stale(root.path(), "natives", Duration::ZERO);

        assert_eq!(removed, vec![foreign.clone()]);
        assert!(!foreign.exists());
        assert!(own.path().exists());
        assert!(unrelated.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_sweep_keeps_fresh_dirs_of_live_processes() {
        let root = tempfile::tempdir().unwrap();
        // pid 1 is always alive on Unix
        let live = root.path().join("natives-1-abcdef");
        fs::create_dir(&live).unwrap();

        let removed = sweep_stale(root.path(), "natives", Duration::from_secs(3600));
        assert!(removed.is_empty());
        assert!(live.exists());
    }

    #[test]
    fn test_sweep_missing_root() {
        let removed = sweep_stale(Path::new("/nonexistent/root"), "natives", Duration::ZERO);
        assert!(removed.is_empty());
    }
}
