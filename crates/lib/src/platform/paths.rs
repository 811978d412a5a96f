use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Returns the user's home directory
///
/// Falls back to the system temp directory when no home is configured.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Root under which specializations are built.
///
/// `VECJIT_BUILD_ROOT` overrides the default `<cache>/build`.
pub fn build_root() -> PathBuf {
  if let Ok(path) = std::env::var("VECJIT_BUILD_ROOT") {
    return PathBuf::from(path);
  }
  cache_dir().join("build")
}

/// Root under which vendored dependencies are extracted.
///
/// `VECJIT_CACHE_ROOT` overrides the default `<cache>/external`.
pub fn dependency_root() -> PathBuf {
  if let Ok(path) = std::env::var("VECJIT_CACHE_ROOT") {
    return PathBuf::from(path);
  }
  cache_dir().join("external")
}
