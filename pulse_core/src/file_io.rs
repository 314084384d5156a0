//! # File I/O Module
//!
//! Durable storage primitives behind [`crate::store::FileSlot`]:
//! - **Atomic writes**: write to `.tmp`, fsync, rename over the target
//! - **Store locking**: an OS-level lock plus a `.lock` sidecar naming the holder
//!
//! Every failure is reported as [`PulseError::StorageUnavailable`] (or
//! [`PulseError::StoreLocked`] when another live process holds the lock).
//! Nothing here retries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulse_core::file_io::{write_atomic, StoreLock};
//! use std::path::Path;
//!
//! let path = Path::new("profiles.json");
//! let lock = StoreLock::acquire(path)?;
//! write_atomic(path, b"[]")?;
//! drop(lock); // releases lock
//! # Ok::<(), pulse_core::errors::PulseError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{PulseError, PulseResult};

/// Locks older than this are considered abandoned
const STALE_LOCK_HOURS: i64 = 24;

/// Lock metadata stored in `.lock` files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn current() -> Self {
        LockInfo {
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a store file, released when dropped.
pub struct StoreLock {
    lock_path: PathBuf,
    /// Keeps the OS lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl StoreLock {
    /// Acquire the lock for `path` without blocking.
    ///
    /// Fails with `StoreLocked` if another live process holds it. A lock left
    /// behind by a dead process, or older than a day, is taken over.
    pub fn acquire(path: &Path) -> PulseResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::current();

        if let Some(existing) = read_lock_info(&lock_path) {
            if !is_lock_stale(&existing) && existing.pid != info.pid {
                return Err(PulseError::store_locked(
                    path.display().to_string(),
                    format!("pid {} on {}", existing.pid, existing.machine),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            log::debug!("Taking over stale lock {}", lock_path.display());
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| {
                PulseError::storage_unavailable(
                    "create lock",
                    lock_path.display().to_string(),
                    e.to_string(),
                )
            })?;

        lock_file.try_lock_exclusive().map_err(|_| {
            PulseError::store_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json =
            serde_json::to_string_pretty(&info).map_err(|e| PulseError::SerializationError {
                reason: e.to_string(),
            })?;

        lock_file.write_all(lock_json.as_bytes()).map_err(|e| {
            PulseError::storage_unavailable(
                "write lock",
                lock_path.display().to_string(),
                e.to_string(),
            )
        })?;

        Ok(StoreLock {
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current holder of the lock for `path`, if any live one exists.
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path)).filter(|info| !is_lock_stale(info))
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Sidecar lock path: `profiles.json` -> `profiles.json.lock`
pub fn lock_path_for(path: &Path) -> PathBuf {
    with_suffix(path, "lock")
}

fn temp_path_for(path: &Path) -> PathBuf {
    with_suffix(path, "tmp")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let extension = path
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    out.set_extension(extension);
    out
}

fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    let age = Utc::now() - info.locked_at;
    age.num_hours() > STALE_LOCK_HOURS
}

/// Read a whole file. A missing file is `Ok(None)`, not an error.
pub fn read_optional(path: &Path) -> PulseResult<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PulseError::storage_unavailable(
                "open",
                path.display().to_string(),
                e.to_string(),
            ))
        }
    };

    let mut contents = Vec::new();
    file.read_to_end(&mut contents).map_err(|e| {
        PulseError::storage_unavailable("read", path.display().to_string(), e.to_string())
    })?;
    Ok(Some(contents))
}

/// Replace `path` with `bytes` so readers see either the old or the new
/// contents, never a partial write.
///
/// 1. Write to a sibling `.tmp` file
/// 2. Sync to disk (fsync)
/// 3. Rename over the target
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PulseResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            PulseError::storage_unavailable(
                "create directory",
                parent.display().to_string(),
                e.to_string(),
            )
        })?;
    }

    let tmp_path = temp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        PulseError::storage_unavailable(
            "create temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        )
    })?;

    tmp_file.write_all(bytes).map_err(|e| {
        PulseError::storage_unavailable(
            "write temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        )
    })?;

    tmp_file.sync_all().map_err(|e| {
        PulseError::storage_unavailable(
            "sync temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        )
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        PulseError::storage_unavailable(
            "rename to final",
            path.display().to_string(),
            e.to_string(),
        )
    })?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
