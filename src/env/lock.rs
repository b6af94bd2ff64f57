// ABOUTME: Per-environment advisory lock preventing concurrent jobs against one environment.
// ABOUTME: Uses atomic file creation with holder info stored as JSON in the lock file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::diagnostics::{Diagnostics, Warning};
use crate::model::Lockable;
use crate::types::EnvName;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("environment '{environment}' is locked by {holder} (pid {pid}) since {started_at}")]
    Held {
        environment: String,
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("lock on '{0}' was taken by another process while breaking it")]
    Raced(String),

    #[error("failed to {action} lock file {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode lock info: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Lockable for LockError {
    fn is_lock_error(&self) -> bool {
        matches!(self, LockError::Held { .. } | LockError::Raced(_))
    }
}

impl<T> Lockable for Result<T, LockError> {
    fn is_lock_error(&self) -> bool {
        self.as_ref().err().is_some_and(|e| e.is_lock_error())
    }
}

/// Who holds an environment lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub environment: String,
}

fn this_host() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

impl LockInfo {
    pub fn new(environment: &EnvName) -> Self {
        Self {
            holder: this_host(),
            pid: std::process::id(),
            started_at: Utc::now(),
            environment: environment.to_string(),
        }
    }

    /// True when the holder ran on this host and its process has exited.
    ///
    /// A lock taken on another host cannot be checked and is never abandoned.
    /// Age alone says nothing: a job holds the lock through all of its waits.
    pub fn is_abandoned(&self) -> bool {
        self.holder == this_host() && !process_alive(self.pid)
    }

    pub fn lock_path(lock_dir: &Path, environment: &EnvName) -> PathBuf {
        lock_dir.join(format!("{environment}.lock"))
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Pids 0 and -1 address process groups, never a single holder.
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists, owned by someone else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// A held environment lock. Dropping it without `release` removes the file best-effort.
#[derive(Debug)]
pub struct EnvironmentLock {
    path: PathBuf,
    environment: EnvName,
    released: bool,
}

impl EnvironmentLock {
    /// Acquire the lock for `environment` under `lock_dir`.
    ///
    /// Abandoned, corrupt or (with `force`) live locks are broken with a
    /// warning recorded in `diagnostics`.
    pub fn acquire(
        lock_dir: &Path,
        environment: &EnvName,
        force: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, LockError> {
        std::fs::create_dir_all(lock_dir).map_err(|source| LockError::Io {
            action: "create directory for",
            path: lock_dir.to_path_buf(),
            source,
        })?;

        let path = LockInfo::lock_path(lock_dir, environment);
        let info = serde_json::to_string(&LockInfo::new(environment))?;

        if Self::try_create(&path, &info)? {
            return Ok(Self::held(path, environment));
        }

        match Self::read_existing(&path) {
            Some(existing) if !force && !existing.is_abandoned() => {
                return Err(LockError::Held {
                    environment: environment.to_string(),
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                });
            }
            Some(existing) => {
                let reason = if force {
                    "Breaking"
                } else {
                    "Auto-breaking abandoned"
                };
                diagnostics.warn(Warning::lock_broken(format!(
                    "{reason} lock on '{environment}' held by {} (pid {}) since {}",
                    existing.holder, existing.pid, existing.started_at
                )));
            }
            None => {
                diagnostics.warn(Warning::lock_broken(format!(
                    "Lock info for '{environment}' unreadable, breaking lock"
                )));
            }
        }

        tracing::debug!("Removing lock at {}", path.display());
        if let Err(source) = std::fs::remove_file(&path)
            && source.kind() != std::io::ErrorKind::NotFound
        {
            return Err(LockError::Io {
                action: "remove",
                path,
                source,
            });
        }

        if !Self::try_create(&path, &info)? {
            return Err(LockError::Raced(environment.to_string()));
        }
        Ok(Self::held(path, environment))
    }

    fn held(path: PathBuf, environment: &EnvName) -> Self {
        tracing::debug!("Acquired lock for '{}' at {}", environment, path.display());
        Self {
            path,
            environment: environment.clone(),
            released: false,
        }
    }

    /// Create the lock file if absent. `Ok(false)` when it already exists.
    fn try_create(path: &Path, info: &str) -> Result<bool, LockError> {
        let io_err = |source| LockError::Io {
            action: "create",
            path: path.to_path_buf(),
            source,
        };
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(mut file) => {
                file.write_all(info.as_bytes()).map_err(io_err)?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_err(e)),
        }
    }

    fn read_existing(path: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn environment(&self) -> &EnvName {
        &self.environment
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        std::fs::remove_file(&self.path).map_err(|source| LockError::Io {
            action: "remove",
            path: self.path.clone(),
            source,
        })
    }

    /// Run `work` while holding the lock for `environment`.
    ///
    /// The lock is released whether `work` succeeds or fails. A failed
    /// release is recorded as a warning and does not change the result.
    pub async fn with_lock<T, E, F>(
        lock_dir: &Path,
        environment: &EnvName,
        force: bool,
        diagnostics: &mut Diagnostics,
        work: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let lock = Self::acquire(lock_dir, environment, force, diagnostics)?;
        let result = work.await;
        if let Err(e) = lock.release() {
            diagnostics.warn(Warning::lock_release(format!(
                "failed to release lock for '{environment}': {e}"
            )));
        }
        result
    }
}

impl Drop for EnvironmentLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;

    fn blue() -> EnvName {
        EnvName::new("blue").unwrap()
    }

    fn write_info(dir: &Path, info: &LockInfo) {
        std::fs::write(
            LockInfo::lock_path(dir, &blue()),
            serde_json::to_string(info).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn lock_info_creates_with_current_host_and_pid() {
        let info = LockInfo::new(&blue());
        assert_eq!(info.environment, "blue");
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn lock_path_is_named_after_environment() {
        assert_eq!(
            LockInfo::lock_path(Path::new("/tmp/locks"), &blue()),
            PathBuf::from("/tmp/locks/blue.lock")
        );
    }

    /// Pid of a child that has already exited and been reaped.
    fn exited_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn running_holder_is_not_abandoned_however_old() {
        let mut info = LockInfo::new(&blue());
        info.started_at = Utc::now() - chrono::Duration::hours(5);
        assert!(!info.is_abandoned());
    }

    #[test]
    fn exited_holder_on_this_host_is_abandoned() {
        let mut info = LockInfo::new(&blue());
        info.pid = exited_pid();
        assert!(info.is_abandoned());
    }

    #[test]
    fn holder_on_another_host_is_never_abandoned() {
        let mut info = LockInfo::new(&blue());
        info.holder = format!("{}-elsewhere", info.holder);
        info.pid = exited_pid();
        assert!(!info.is_abandoned());
    }

    #[test]
    fn long_running_job_keeps_its_lock() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::default();
        let held = EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag).unwrap();

        let mut info = LockInfo::new(&blue());
        info.started_at = Utc::now() - chrono::Duration::minutes(61);
        write_info(dir.path(), &info);

        let second = EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag);
        assert!(matches!(second, Err(LockError::Held { .. })));
        assert!(!diag.has_warnings());
        assert!(held.path().exists());
    }

    #[test]
    fn second_acquire_reports_holder() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::default();
        let _held = EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag).unwrap();

        let second = EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag);
        assert!(second.is_lock_error());
        match second {
            Err(LockError::Held { pid, holder, .. }) => {
                assert_eq!(pid, std::process::id());
                assert!(!holder.is_empty());
            }
            other => panic!("expected Held, got {other:?}"),
        }
        assert!(!diag.has_warnings());
    }

    #[test]
    fn release_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::default();
        let lock = EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag).unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());
        lock.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn abandoned_lock_is_broken_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = LockInfo::new(&blue());
        info.pid = exited_pid();
        write_info(dir.path(), &info);

        let mut diag = Diagnostics::default();
        let lock = EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag).unwrap();
        assert_eq!(lock.environment(), &blue());
        assert_eq!(diag.warnings()[0].kind, WarningKind::LockBroken);
    }

    #[test]
    fn force_breaks_live_lock() {
        let dir = tempfile::tempdir().unwrap();
        write_info(dir.path(), &LockInfo::new(&blue()));

        let mut diag = Diagnostics::default();
        assert!(EnvironmentLock::acquire(dir.path(), &blue(), true, &mut diag).is_ok());
        assert!(diag.has_warnings());
    }

    #[test]
    fn corrupt_lock_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(LockInfo::lock_path(dir.path(), &blue()), "garbage").unwrap();

        let mut diag = Diagnostics::default();
        assert!(EnvironmentLock::acquire(dir.path(), &blue(), false, &mut diag).is_ok());
    }

    #[tokio::test]
    async fn with_lock_releases_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::default();

        let result: Result<(), LockError> =
            EnvironmentLock::with_lock(dir.path(), &blue(), false, &mut diag, async {
                Err(LockError::Raced("blue".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(!LockInfo::lock_path(dir.path(), &blue()).exists());
    }

    #[test]
    fn io_errors_are_not_lock_errors() {
        let err = LockError::Io {
            action: "create",
            path: PathBuf::from("/x"),
            source: std::io::Error::other("disk"),
        };
        assert!(!err.is_lock_error());
    }
}
