//! Artifact directory layout.
//!
//! ```text
//! <build_root>/
//!   .build.lock
//!   shared/
//!     scripts/                  ninja builddir (.ninja_log, .ninja_deps)
//!     bin/<toolchain>/          dimension-independent objects
//!   vecdbImpl128/
//!     scripts/                  build.ninja, compile_commands.json
//!     bin/                      vecdbImpl.o, vecdbImpl128.so
//! ```
//!
//! Private directories embed the module name, so two dimensions never write
//! into the same one. The shared directory name is fixed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{BIN_DIR_NAME, BUILD_FILE_NAME, BUILD_LOCK_FILENAME, COMPDB_FILE_NAME, SCRIPTS_DIR_NAME, SHARED_DIR_NAME};

#[derive(Debug, Error)]
pub enum LayoutError {
  #[error("failed to create directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] io::Error),

  #[error("invalid module name '{0}'")]
  InvalidModuleName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
  pub build_root: PathBuf,
  /// Private: build description and compile-command database.
  pub script_dir: PathBuf,
  /// Private: dimension-dependent objects and the final module.
  pub bin_dir: PathBuf,
  /// Shared by every specialization under this build root.
  pub shared_bin_dir: PathBuf,
  /// Shared ninja `builddir`, so the build log spans specializations.
  pub log_dir: PathBuf,
  /// Final loadable module.
  pub output_path: PathBuf,
}

impl ArtifactLayout {
  /// Compute the layout without touching the filesystem.
  pub fn new(build_root: &Path, module_name: &str, module_suffix: &str) -> Result<Self, LayoutError> {
    validate_module_name(module_name)?;

    let private = build_root.join(module_name);
    let shared = build_root.join(SHARED_DIR_NAME);
    let bin_dir = private.join(BIN_DIR_NAME);

    Ok(Self {
      build_root: build_root.to_path_buf(),
      script_dir: private.join(SCRIPTS_DIR_NAME),
      output_path: bin_dir.join(format!("{}{}", module_name, module_suffix)),
      bin_dir,
      shared_bin_dir: shared.join(BIN_DIR_NAME),
      log_dir: shared.join(SCRIPTS_DIR_NAME),
    })
  }

  /// Compute the layout and create its directories.
  ///
  /// Directories that already exist are left alone.
  pub fn plan(build_root: &Path, module_name: &str, module_suffix: &str) -> Result<Self, LayoutError> {
    let layout = Self::new(build_root, module_name, module_suffix)?;
    for dir in [&layout.script_dir, &layout.bin_dir, &layout.shared_bin_dir, &layout.log_dir] {
      ensure_dir(dir)?;
    }
    debug!(module = module_name, root = %build_root.display(), "artifact layout ready");
    Ok(layout)
  }

  /// Shared object directory for one shared key, created on demand.
  pub fn shared_objects_dir(&self, key: &str) -> Result<PathBuf, LayoutError> {
    let dir = self.shared_bin_dir.join(key);
    ensure_dir(&dir)?;
    Ok(dir)
  }

  pub fn build_file(&self) -> PathBuf {
    self.script_dir.join(BUILD_FILE_NAME)
  }

  pub fn compdb_file(&self) -> PathBuf {
    self.script_dir.join(COMPDB_FILE_NAME)
  }

  /// Lock serializing build execution under this root.
  pub fn build_lock(&self) -> PathBuf {
    self.build_root.join(BUILD_LOCK_FILENAME)
  }
}

fn validate_module_name(name: &str) -> Result<(), LayoutError> {
  let valid = !name.is_empty()
    && name != SHARED_DIR_NAME
    && !name.starts_with('.')
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if valid {
    Ok(())
  } else {
    Err(LayoutError::InvalidModuleName(name.to_string()))
  }
}

fn ensure_dir(dir: &Path) -> Result<(), LayoutError> {
  match fs::create_dir_all(dir) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
    Err(e) => Err(LayoutError::CreateDir(dir.to_path_buf(), e)),
  }
}
