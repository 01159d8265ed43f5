//! # File I/O Module
//!
//! Handles artifact file operations with safety features:
//! - **Atomic writes**: Write to .tmp, sync, rename so a stage writes its whole
//!   artifact or nothing
//! - **Model locking**: One pipeline process per template model directory at a
//!   time, so per-model runs can be spread over separate processes
//!
//! ## Lock Files
//!
//! A model run holds `.lca.lock` inside the model directory. The file carries
//! JSON metadata about who holds the lock and is removed on drop. Ownership
//! is the OS lock on that file, so a file left by a killed run is stale as
//! soon as its process is gone.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lca_core::file_io::{atomic_write, ModelLock};
//! use std::path::Path;
//!
//! let model_dir = Path::new("data/template_models/S1_O1_T1_R1");
//! let lock = ModelLock::acquire(model_dir, "operator")?;
//! atomic_write(&model_dir.join("impacts/example.csv"), b"element_index\n")?;
//! drop(lock);
//! # Ok::<(), lca_core::errors::LcaError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};

/// Lock file name inside a model directory
pub const LOCK_FILE_NAME: &str = ".lca.lock";

/// Lock file metadata stored in `.lca.lock` files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (operator name)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

/// Get the hostname of the current machine
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

/// Exclusive lock on a template model directory, released on drop.
///
/// Uses both:
/// 1. OS-level file locking (via fs2) for process safety
/// 2. a lock file with metadata for operator visibility
pub struct ModelLock {
    model_dir: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl ModelLock {
    /// Acquire an exclusive lock on a model directory.
    ///
    /// The OS lock decides ownership. A lock file left behind by a process
    /// that exited without releasing it (crash, Ctrl-C) is taken over.
    ///
    /// # Returns
    ///
    /// * `Ok(ModelLock)` - Lock acquired successfully
    /// * `Err(LcaError::FileLocked)` - Another live process holds the lock
    pub fn acquire(model_dir: &Path, user_id: impl Into<String>) -> LcaResult<Self> {
        let lock_path = model_dir.join(LOCK_FILE_NAME);
        let info = LockInfo::new(user_id);

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                LcaError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(match read_lock_info(&lock_path) {
                Ok(existing) => LcaError::file_locked(
                    model_dir.display().to_string(),
                    format!("{} ({}, pid {})", existing.user_id, existing.machine, existing.pid),
                    existing.locked_at.to_rfc3339(),
                ),
                Err(_) => LcaError::file_locked(
                    model_dir.display().to_string(),
                    "another process".to_string(),
                    "unknown".to_string(),
                ),
            });
        }

        let mut previous = String::new();
        if lock_file.read_to_string(&mut previous).is_ok() {
            if let Ok(stale) = serde_json::from_str::<LockInfo>(&previous) {
                tracing::warn!(
                    model_dir = %model_dir.display(),
                    user = %stale.user_id,
                    pid = stale.pid,
                    locked_at = %stale.locked_at,
                    "replacing stale lock"
                );
            }
        }

        let lock_json = serde_json::to_string_pretty(&info)
            .map_err(|e| LcaError::serialization(e.to_string()))?;

        lock_file
            .set_len(0)
            .and_then(|_| lock_file.seek(SeekFrom::Start(0)))
            .and_then(|_| lock_file.write_all(lock_json.as_bytes()))
            .map_err(|e| {
                LcaError::file_error("write lock", lock_path.display().to_string(), e.to_string())
            })?;

        lock_file.sync_all().map_err(|e| {
            LcaError::file_error("sync lock", lock_path.display().to_string(), e.to_string())
        })?;

        Ok(ModelLock {
            model_dir: model_dir.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Holder of the lock on a model directory, if a live process has it.
    ///
    /// Does not acquire the lock.
    pub fn check(model_dir: &Path) -> Option<LockInfo> {
        let lock_path = model_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new().read(true).write(true).open(&lock_path).ok()?;
        if file.try_lock_exclusive().is_ok() {
            // free: whatever metadata is left is stale
            let _ = file.unlock();
            return None;
        }
        read_lock_info(&lock_path).ok()
    }

    /// The locked model directory
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl Drop for ModelLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn read_lock_info(lock_path: &Path) -> LcaResult<LockInfo> {
    let mut file = File::open(lock_path).map_err(|e| {
        LcaError::file_error("read lock", lock_path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        LcaError::file_error("read lock", lock_path.display().to_string(), e.to_string())
    })?;

    serde_json::from_str(&contents).map_err(|e| LcaError::serialization(e.to_string()))
}

/// Write bytes to `path` atomically.
///
/// 1. Write to a sibling `.tmp` file
/// 2. Sync to disk (fsync)
/// 3. Rename over the destination
///
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> LcaResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        LcaError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(bytes).map_err(|e| {
        LcaError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        LcaError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        LcaError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Create a directory (and parents) if it does not exist
pub fn ensure_dir(dir: &Path) -> LcaResult<()> {
    fs::create_dir_all(dir)
        .map_err(|e| LcaError::file_error("create directory", dir.display().to_string(), e.to_string()))
}

/// Read a whole file into memory
pub fn read_bytes(path: &Path) -> LcaResult<Vec<u8>> {
    fs::read(path).map_err(|e| LcaError::file_error("read", path.display().to_string(), e.to_string()))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
