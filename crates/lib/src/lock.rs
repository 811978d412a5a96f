//! File-based locking for mutual exclusion between compilation requests.
//!
//! Two kinds of lock files exist: one per dependency cache entry, held around
//! the check-fetch-extract sequence, and one per build root, held while ninja
//! executes. Locks are advisory (`flock` on Unix, `LockFileEx` on Windows) and
//! are released when the [`FileLock`] is dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub purpose: String,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error("failed to create lock directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] io::Error),

  #[error("failed to open lock file '{0}': {1}")]
  OpenFile(PathBuf, #[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock '{0}': {1}")]
  LockFailed(PathBuf, #[source] io::Error),
}

#[derive(Debug)]
pub struct FileLock {
  file: File,
  lock_path: PathBuf,
}

impl FileLock {
  /// Acquire an exclusive lock, blocking until any current holder releases it.
  ///
  /// `purpose` is recorded in the lock file so a waiting process can report
  /// who it is waiting for.
  pub fn acquire(lock_path: &Path, purpose: &str) -> Result<Self, LockError> {
    let file = open_lock_file(lock_path)?;

    match try_lock(&file, false) {
      Ok(()) => {}
      Err(err) if is_contention(&err) => {
        match read_holder(lock_path) {
          Some(holder) => info!(
            lock = %lock_path.display(),
            pid = holder.pid,
            holder = %holder.purpose,
            "waiting for lock"
          ),
          None => info!(lock = %lock_path.display(), "waiting for lock"),
        }
        try_lock(&file, true).map_err(|e| LockError::LockFailed(lock_path.to_path_buf(), e))?;
      }
      Err(err) => return Err(LockError::LockFailed(lock_path.to_path_buf(), err)),
    }

    debug!(lock = %lock_path.display(), purpose, "lock acquired");
    Self::write_metadata(&file, purpose)?;

    Ok(FileLock {
      file,
      lock_path: lock_path.to_path_buf(),
    })
  }

  /// Acquire an exclusive lock without waiting.
  #[cfg(test)]
  ///
  /// Returns `Ok(None)` when another handle currently holds the lock.
  pub fn try_acquire(lock_path: &Path, purpose: &str) -> Result<Option<Self>, LockError> {
    let file = open_lock_file(lock_path)?;

    match try_lock(&file, false) {
      Ok(()) => {}
      Err(err) if is_contention(&err) => return Ok(None),
      Err(err) => return Err(LockError::LockFailed(lock_path.to_path_buf(), err)),
    }

    Self::write_metadata(&file, purpose)?;

    Ok(Some(FileLock {
      file,
      lock_path: lock_path.to_path_buf(),
    }))
  }

  /// Reads the lock metadata from the held file handle.
  ///
  /// Opening a second handle would fail on Windows due to mandatory locking.
  #[cfg(test)]
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  #[cfg(test)]
  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, purpose: &str) -> Result<(), LockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      purpose: purpose.to_string(),
    };

    file.set_len(0).map_err(LockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(LockError::WriteMetadata)?;

    Ok(())
  }
}

impl Drop for FileLock {
  fn drop(&mut self) {
    debug!(lock = %self.lock_path.display(), "lock released");
  }
}

fn open_lock_file(lock_path: &Path) -> Result<File, LockError> {
  if let Some(parent) = lock_path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).map_err(|e| LockError::CreateDir(parent.to_path_buf(), e))?;
  }

  OpenOptions::new()
    .read(true)
    .write(true)
    .create(true)
    .truncate(false)
    .open(lock_path)
    .map_err(|e| LockError::OpenFile(lock_path.to_path_buf(), e))
}

fn read_holder(lock_path: &Path) -> Option<LockMetadata> {
  let mut file = File::open(lock_path).ok()?;
  let mut contents = String::new();
  file.read_to_string(&mut contents).ok()?;
  serde_json::from_str(&contents).ok()
}

fn is_contention(err: &io::Error) -> bool {
  if err.kind() == io::ErrorKind::WouldBlock {
    return true;
  }
  // ERROR_LOCK_VIOLATION
  cfg!(windows) && err.raw_os_error() == Some(33)
}

#[cfg(unix)]
fn try_lock(file: &File, blocking: bool) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = if blocking {
    FlockOperation::LockExclusive
  } else {
    FlockOperation::NonBlockingLockExclusive
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File, blocking: bool) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = if blocking {
    LOCKFILE_EXCLUSIVE_LOCK
  } else {
    LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK
  };

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
