//! Toolchain resolution.
//!
//! A compiler id from the caller (`g++`, `clang++-17`, `/usr/bin/g++`) is
//! first matched against the closed `(Compiler, platform)` flag table, then
//! looked up on `PATH`. The two failure modes stay distinct: an id outside the
//! table is [`ToolchainError::Unsupported`] even if the binary exists, and a
//! known compiler missing from the host is [`ToolchainError::NotFound`].

pub mod flags;

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::consts::FINGERPRINT_HASH_LEN;
use crate::platform::{self, Platform};

pub use flags::{FlagSet, flag_set};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolchainError {
  /// The program is known but could not be found on PATH.
  #[error("toolchain '{0}' not found on PATH")]
  NotFound(String),

  /// No flag table entry exists for this compiler on this platform.
  #[error("unsupported toolchain '{compiler}' on {platform}")]
  Unsupported { compiler: String, platform: String },
}

/// Compiler families known to the flag table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compiler {
  Gcc,
  Clang,
}

impl Compiler {
  /// Classify a compiler id.
  ///
  /// Accepts bare names, version-suffixed names (`g++-13`) and paths.
  pub fn from_id(id: &str) -> Option<Self> {
    let name = Path::new(id).file_name()?.to_str()?;
    let name = name.strip_suffix(".exe").unwrap_or(name);

    let family = match name.rsplit_once('-') {
      Some((family, version)) if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit() || c == '.') => {
        family
      }
      _ => name,
    };

    match family {
      "g++" | "gcc" => Some(Self::Gcc),
      "clang++" | "clang" => Some(Self::Clang),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gcc => "gcc",
      Self::Clang => "clang",
    }
  }
}

impl fmt::Display for Compiler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A resolved compiler together with its final flag lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
  pub compiler: Compiler,
  /// Absolute (or caller-given) path of the compiler binary.
  pub executable: PathBuf,
  pub platform: Platform,
  /// Table defaults followed by caller additions, in order.
  pub compile_flags: Vec<String>,
  /// Table defaults followed by caller additions, in order.
  pub link_flags: Vec<String>,
}

impl ToolchainConfig {
  /// Identifies the compiler binary and the compile flags. Part of the shared
  /// objects key, see [`SourceSet::shared_key`](crate::graph::SourceSet::shared_key).
  ///
  /// Format: `{compiler}-{12 hex chars}`, e.g. `gcc-3f9a0c1d2e4b`.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.compiler.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(self.executable.to_string_lossy().as_bytes());
    for flag in &self.compile_flags {
      hasher.update([0]);
      hasher.update(flag.as_bytes());
    }
    let full = hex::encode(hasher.finalize());
    format!("{}-{}", self.compiler, &full[..FINGERPRINT_HASH_LEN])
  }
}

/// Resolve a toolchain for an explicit platform.
///
/// Caller flags are appended after the table defaults verbatim, so a later
/// flag overrides an earlier one under the compiler's last-wins rules.
pub fn resolve(
  id: &str,
  platform: Platform,
  extra_compile: &[String],
  extra_link: &[String],
) -> Result<ToolchainConfig, ToolchainError> {
  let unsupported = || ToolchainError::Unsupported {
    compiler: id.to_string(),
    platform: platform.triple(),
  };

  let compiler = Compiler::from_id(id).ok_or_else(unsupported)?;
  let FlagSet { mut compile, mut link } = flag_set(compiler, platform).ok_or_else(unsupported)?;
  let executable = find_executable(id).ok_or_else(|| ToolchainError::NotFound(id.to_string()))?;

  compile.extend(extra_compile.iter().cloned());
  link.extend(extra_link.iter().cloned());

  debug!(compiler = %compiler, executable = %executable.display(), platform = %platform, "resolved toolchain");

  Ok(ToolchainConfig {
    compiler,
    executable,
    platform,
    compile_flags: compile,
    link_flags: link,
  })
}

/// Resolve a toolchain for the running host.
pub fn resolve_for_host(
  id: &str,
  extra_compile: &[String],
  extra_link: &[String],
) -> Result<ToolchainConfig, ToolchainError> {
  let platform = Platform::current().ok_or_else(|| ToolchainError::Unsupported {
    compiler: id.to_string(),
    platform: platform::host_description(),
  })?;
  resolve(id, platform, extra_compile, extra_link)
}

/// Locate a program the way a shell would.
///
/// Names containing a path separator are checked as given; bare names are
/// searched in each `PATH` entry.
pub fn find_executable(program: &str) -> Option<PathBuf> {
  let candidate = Path::new(program);
  if candidate.is_absolute() || candidate.components().count() > 1 {
    return is_executable(candidate).then(|| candidate.to_path_buf());
  }

  let path_var = std::env::var_os("PATH")?;
  for dir in std::env::split_paths(&path_var) {
    let full = dir.join(program);
    if is_executable(&full) {
      return Some(full);
    }

    #[cfg(windows)]
    {
      let exe = full.with_extension("exe");
      if is_executable(&exe) {
        return Some(exe);
      }
    }
  }

  None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;

  std::fs::metadata(path)
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file()
}
