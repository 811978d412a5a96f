//! Version-pinned cache of vendored header-only dependencies.
//!
//! # Cache Structure
//!
//! Each `(name, version)` lives at `<cache_root>/{name}-{version}/`. Presence
//! of that directory is the only signal that the entry is usable; contents
//! are not re-verified. The directory only ever appears through an atomic
//! rename from a staging directory, so it is either absent or complete:
//!
//! ```text
//! <cache_root>/
//!   .eigen-3.4.0.lock          exclusive lock around check + fetch + extract
//!   .eigen-3.4.0.XXXXXX/       staging (archive + extracted tree), removed on drop
//!   eigen-3.4.0/               final tree
//! ```

pub mod fetch;
pub mod unpack;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::lock::{FileLock, LockError};

pub use fetch::{Fetcher, HttpFetcher, url_to_filename, verify_sha256};
pub use unpack::unpack_archive;

/// Errors that can occur while materializing a dependency.
#[derive(Debug, Error)]
pub enum DepsError {
  /// Failed to create the cache root.
  #[error("failed to create cache directory '{0}': {1}")]
  CreateCacheDir(PathBuf, #[source] io::Error),

  #[error(transparent)]
  Lock(#[from] LockError),

  /// HTTP request failed or returned a non-success status.
  #[error("download failed for {url}: {message}")]
  Download { url: String, message: String },

  /// SHA256 hash mismatch after download.
  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  #[error("unsupported archive format: {0}")]
  UnsupportedArchive(String),

  #[error("failed to extract '{path}': {message}")]
  Extract { path: PathBuf, message: String },

  /// I/O error inside the staging directory.
  #[error("failed to stage dependency: {0}")]
  Stage(#[source] io::Error),

  /// The extracted tree could not be moved into place.
  #[error("failed to install dependency at '{path}': {source}")]
  Install {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A pinned third-party source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
  pub name: String,
  pub version: String,
  /// Archive URL; its file name decides the archive format.
  pub url: String,
  /// Optional lowercase-hex SHA256 of the archive.
  pub sha256: Option<String>,
}

impl DependencySpec {
  pub fn new(name: &str, version: &str, url: &str) -> Self {
    Self {
      name: name.to_string(),
      version: version.to_string(),
      url: url.to_string(),
      sha256: None,
    }
  }

  pub fn with_sha256(mut self, sha256: &str) -> Self {
    self.sha256 = Some(sha256.to_string());
    self
  }

  /// Eigen 3.4.0 release tarball.
  pub fn eigen() -> Self {
    Self::new(
      "eigen",
      "3.4.0",
      "https://gitlab.com/libeigen/eigen/-/archive/3.4.0/eigen-3.4.0.tar.gz",
    )
  }

  /// Directory name under the cache root.
  pub fn key(&self) -> String {
    format!("{}-{}", self.name, self.version)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
  Absent,
  Present,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCacheEntry {
  pub name: String,
  pub version: String,
  pub local_path: PathBuf,
  pub present: bool,
}

pub struct DependencyCache {
  root: PathBuf,
  fetcher: Arc<dyn Fetcher>,
}

impl DependencyCache {
  pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
    Self {
      root: root.into(),
      fetcher,
    }
  }

  /// Deterministic local path of an entry.
  pub fn entry_path(&self, spec: &DependencySpec) -> PathBuf {
    self.root.join(spec.key())
  }

  /// Presence check by path existence only.
  pub fn state(&self, spec: &DependencySpec) -> DependencyState {
    if self.entry_path(spec).exists() {
      DependencyState::Present
    } else {
      DependencyState::Absent
    }
  }

  /// Make sure the entry is present, fetching and extracting it if needed.
  ///
  /// A present entry is returned without any network access. Concurrent
  /// callers for the same entry serialize on a per-entry lock file, so the
  /// archive is fetched once and every caller sees the complete tree.
  pub fn ensure(&self, spec: &DependencySpec) -> Result<DependencyCacheEntry, DepsError> {
    let local_path = self.entry_path(spec);
    let entry = DependencyCacheEntry {
      name: spec.name.clone(),
      version: spec.version.clone(),
      local_path: local_path.clone(),
      present: true,
    };

    if self.state(spec) == DependencyState::Present {
      debug!(path = %local_path.display(), "dependency cache hit");
      return Ok(entry);
    }

    fs::create_dir_all(&self.root).map_err(|e| DepsError::CreateCacheDir(self.root.clone(), e))?;

    let key = spec.key();
    let _lock = FileLock::acquire(&self.root.join(format!(".{}.lock", key)), &format!("fetch {}", key))?;

    if self.state(spec) == DependencyState::Present {
      debug!(path = %local_path.display(), "dependency materialized while waiting for lock");
      return Ok(entry);
    }

    self.materialize(spec, &local_path)?;
    Ok(entry)
  }

  /// Fetch and extract into a staging directory, then rename into place.
  ///
  /// The staging directory is removed when it goes out of scope, on success
  /// and on every error path.
  fn materialize(&self, spec: &DependencySpec, dest: &Path) -> Result<(), DepsError> {
    let staging = tempfile::Builder::new()
      .prefix(&format!(".{}.", spec.key()))
      .tempdir_in(&self.root)
      .map_err(DepsError::Stage)?;

    let archive = staging.path().join(url_to_filename(&spec.url));
    self.fetcher.fetch(&spec.url, &archive)?;

    if let Some(expected) = &spec.sha256 {
      verify_sha256(&archive, &spec.url, expected)?;
    }

    let tree = staging.path().join("tree");
    unpack_archive(&archive, &tree)?;

    fs::rename(&tree, dest).map_err(|e| DepsError::Install {
      path: dest.to_path_buf(),
      source: e,
    })?;

    info!(name = %spec.name, version = %spec.version, path = %dest.display(), "dependency installed");
    Ok(())
  }
}
