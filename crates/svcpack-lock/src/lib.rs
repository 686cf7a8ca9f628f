//! Advisory packaging lock, one per service root.
//!
//! Two packaging runs against the same service root would race on the output
//! artifact. The lock lives next to the artifact at
//! `<serviceRoot>/.packaging-output/.lock` and coordinates svcpack processes;
//! it is not a security boundary.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::process;

/// Directory (relative to the service root) that holds artifacts and the lock.
pub const OUTPUT_DIR_NAME: &str = ".packaging-output";

/// File name of the lock inside [`OUTPUT_DIR_NAME`].
pub const LOCK_FILE_NAME: &str = ".lock";

/// Age after which an orphaned lock is considered stale (in seconds).
pub const DEFAULT_STALE_THRESHOLD_SECS: u64 = 3600;

/// Lock information stored in the lock file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that created the lock
    pub pid: u32,
    /// When the lock was taken
    pub created_at: DateTime<Utc>,
    /// Service root being packaged
    pub service_root: String,
    /// svcpack version that created the lock
    pub svcpack_version: String,
}

/// Lock errors
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(
        "Packaging already in progress for '{service_root}' (PID {pid}, started {created_ago} ago)"
    )]
    ConcurrentExecution {
        service_root: String,
        pid: u32,
        created_ago: String,
    },

    #[error(
        "Stale packaging lock for '{service_root}' (PID {pid}, age {age_secs}s). Use --force to override"
    )]
    StaleLock {
        service_root: String,
        pid: u32,
        age_secs: u64,
    },

    #[error("Lock file is corrupted or invalid: {reason}")]
    CorruptedLock { reason: String },

    #[error("Failed to acquire lock: {reason}")]
    AcquisitionFailed { reason: String },

    #[error("Failed to release lock: {reason}")]
    ReleaseFailed { reason: String },

    #[error("IO error during lock operation: {0}")]
    Io(#[from] io::Error),
}

/// Exclusive packaging lock for a service root. Released on drop.
pub struct PackagingLock {
    lock_path: Utf8PathBuf,
    _fd_lock: Option<Box<RwLock<fs::File>>>,
    info: LockInfo,
}

impl PackagingLock {
    /// Path of the lock file for `service_root`.
    #[must_use]
    pub fn lock_path(service_root: &Utf8Path) -> Utf8PathBuf {
        service_root.join(OUTPUT_DIR_NAME).join(LOCK_FILE_NAME)
    }

    /// Acquire the lock for `service_root`.
    ///
    /// An existing lock whose owning process has exited is reclaimed. With
    /// `force`, any existing lock is overridden. Otherwise a lock held by a
    /// live process is [`LockError::ConcurrentExecution`], or
    /// [`LockError::StaleLock`] once it is older than `ttl_seconds` (the pid
    /// may have been reused).
    pub fn acquire(
        service_root: &Utf8Path,
        force: bool,
        ttl_seconds: Option<u64>,
    ) -> Result<Self, LockError> {
        let lock_path = Self::lock_path(service_root);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::AcquisitionFailed {
                reason: format!("Failed to create output directory {parent}: {e}"),
            })?;
        }

        let ttl = ttl_seconds.unwrap_or(DEFAULT_STALE_THRESHOLD_SECS);
        let info = LockInfo {
            pid: process::id(),
            created_at: Utc::now(),
            service_root: service_root.to_string(),
            svcpack_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        for _ in 0..2 {
            match fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&lock_path)
            {
                Ok(file) => return Self::finalize(lock_path, file, info),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    Self::check_existing(&lock_path, service_root, force, ttl)?;
                    match fs::remove_file(&lock_path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => {
                            return Err(LockError::AcquisitionFailed {
                                reason: format!("Failed to remove stale lock {lock_path}: {e}"),
                            });
                        }
                    }
                }
                Err(e) => {
                    return Err(LockError::AcquisitionFailed {
                        reason: format!("Failed to create lock file {lock_path}: {e}"),
                    });
                }
            }
        }

        Err(LockError::AcquisitionFailed {
            reason: format!("Another process re-created {lock_path} while overriding it"),
        })
    }

    /// Read the lock currently held for `service_root`, if any.
    pub fn current(service_root: &Utf8Path) -> Result<Option<LockInfo>, LockError> {
        let lock_path = Self::lock_path(service_root);
        match fs::read_to_string(&lock_path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| LockError::CorruptedLock {
                    reason: format!("Failed to parse {lock_path}: {e}"),
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LockError::Io(e)),
        }
    }

    /// Release the lock explicitly, surfacing removal errors.
    pub fn release(mut self) -> Result<(), LockError> {
        self._fd_lock.take();
        match fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::ReleaseFailed {
                reason: format!("Failed to remove {}: {e}", self.lock_path),
            }),
        }
    }

    #[must_use]
    pub const fn info(&self) -> &LockInfo {
        &self.info
    }

    fn finalize(lock_path: Utf8PathBuf, file: fs::File, info: LockInfo) -> Result<Self, LockError> {
        let json = serde_json::to_string_pretty(&info).map_err(|e| LockError::AcquisitionFailed {
            reason: format!("Failed to serialize lock info: {e}"),
        })?;

        let mut rw_lock = Box::new(RwLock::new(file));
        {
            let guard = rw_lock
                .try_write()
                .map_err(|_| LockError::ConcurrentExecution {
                    service_root: info.service_root.clone(),
                    pid: 0,
                    created_ago: "unknown".to_string(),
                })?;
            let mut file_ref = &*guard;
            file_ref.write_all(json.as_bytes())?;
            file_ref.flush()?;
            file_ref.sync_all()?;
        }

        Ok(Self {
            lock_path,
            _fd_lock: Some(rw_lock),
            info,
        })
    }

    fn check_existing(
        lock_path: &Utf8Path,
        service_root: &Utf8Path,
        force: bool,
        ttl_seconds: u64,
    ) -> Result<(), LockError> {
        if force {
            return Ok(());
        }

        let content = match fs::read_to_string(lock_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(LockError::Io(e)),
        };

        let existing: LockInfo =
            serde_json::from_str(&content).map_err(|e| LockError::CorruptedLock {
                reason: format!("Failed to parse {lock_path}: {e}"),
            })?;

        let age_secs = Utc::now()
            .signed_duration_since(existing.created_at)
            .num_seconds()
            .max(0) as u64;

        if !is_process_running(existing.pid) {
            return Ok(());
        }

        if age_secs > ttl_seconds {
            return Err(LockError::StaleLock {
                service_root: service_root.to_string(),
                pid: existing.pid,
                age_secs,
            });
        }

        Err(LockError::ConcurrentExecution {
            service_root: service_root.to_string(),
            pid: existing.pid,
            created_ago: format_age(age_secs),
        })
    }
}

impl std::fmt::Debug for PackagingLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagingLock")
            .field("lock_path", &self.lock_path)
            .field("info", &self.info)
            .field("_fd_lock", &"<RwLock>")
            .finish()
    }
}

impl Drop for PackagingLock {
    fn drop(&mut self) {
        if self._fd_lock.take().is_some() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // kill(pid, 0): 0 if it exists, EPERM if it exists but is not ours
        let rc = unsafe { libc::kill(pid as i32, 0) };
        if rc == 0 {
            true
        } else {
            matches!(
                io::Error::last_os_error().raw_os_error(),
                Some(code) if code == libc::EPERM
            )
        }
    }

    #[cfg(windows)]
    {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::minwinbase::STILL_ACTIVE;
        use winapi::um::processthreadsapi::{GetExitCodeProcess, OpenProcess};
        use winapi::um::winnt::PROCESS_QUERY_LIMITED_INFORMATION;

        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return false;
            }
            let mut exit_code: u32 = 0;
            let ok = GetExitCodeProcess(handle, &mut exit_code);
            CloseHandle(handle);
            ok != 0 && exit_code == STILL_ACTIVE
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        true
    }
}

fn format_age(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_acquire_creates_lock_file() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let lock = PackagingLock::acquire(&root, false, None).unwrap();
        assert!(PackagingLock::lock_path(&root).exists());
        assert_eq!(lock.info().pid, process::id());

        let current = PackagingLock::current(&root).unwrap().unwrap();
        assert_eq!(current.service_root, root.to_string());
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let _held = PackagingLock::acquire(&root, false, None).unwrap();
        let err = PackagingLock::acquire(&root, false, None).unwrap_err();
        assert!(matches!(err, LockError::ConcurrentExecution { .. }));
    }

    #[test]
    fn test_force_overrides_existing_lock() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let held = PackagingLock::acquire(&root, false, None).unwrap();
        std::mem::forget(held);

        let lock = PackagingLock::acquire(&root, true, None).unwrap();
        lock.release().unwrap();
        assert!(!PackagingLock::lock_path(&root).exists());
    }

    #[test]
    fn test_drop_releases_lock() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        {
            let _lock = PackagingLock::acquire(&root, false, None).unwrap();
        }
        assert!(!PackagingLock::lock_path(&root).exists());
        assert!(PackagingLock::acquire(&root, false, None).is_ok());
    }

    #[test]
    fn test_corrupted_lock_is_reported() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let path = PackagingLock::lock_path(&root);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let err = PackagingLock::acquire(&root, false, None).unwrap_err();
        assert!(matches!(err, LockError::CorruptedLock { .. }));
    }

    fn write_lock(root: &Utf8Path, pid: u32, created_at: DateTime<Utc>) {
        let path = PackagingLock::lock_path(root);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let info = LockInfo {
            pid,
            created_at,
            service_root: root.to_string(),
            svcpack_version: "0.0.0".to_string(),
        };
        fs::write(&path, serde_json::to_string(&info).unwrap()).unwrap();
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn test_lock_of_exited_process_is_reclaimed() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let dead_pid = i32::MAX as u32;

        write_lock(&root, dead_pid, Utc::now());
        let lock = PackagingLock::acquire(&root, false, None).unwrap();
        assert_eq!(lock.info().pid, process::id());
        drop(lock);

        write_lock(&root, dead_pid, Utc::now() - chrono::Duration::hours(2));
        let lock = PackagingLock::acquire(&root, false, None).unwrap();
        assert_eq!(PackagingLock::current(&root).unwrap().unwrap().pid, process::id());
        lock.release().unwrap();
    }

    #[test]
    fn test_old_lock_of_live_process_is_stale() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        write_lock(&root, process::id(), Utc::now() - chrono::Duration::hours(2));
        let err = PackagingLock::acquire(&root, false, None).unwrap_err();
        assert!(matches!(err, LockError::StaleLock { .. }));

        assert!(PackagingLock::acquire(&root, true, None).is_ok());
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(5), "5s");
        assert_eq!(format_age(120), "2m");
        assert_eq!(format_age(7200), "2h");
        assert_eq!(format_age(172_800), "2d");
    }
}
