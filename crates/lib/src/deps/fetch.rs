//! Archive download.
//!
//! The [`Fetcher`] trait is the only network boundary of the crate; the cache
//! manager never talks HTTP directly.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::deps::DepsError;

/// Downloads an archive to a local file.
pub trait Fetcher: Send + Sync {
  /// Download `url` into the file at `dest`, creating or truncating it.
  fn fetch(&self, url: &str, dest: &Path) -> Result<(), DepsError>;
}

/// Blocking HTTP(S) fetcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
  fn fetch(&self, url: &str, dest: &Path) -> Result<(), DepsError> {
    info!(url = %url, "fetching archive");

    let download_error = |message: String| DepsError::Download {
      url: url.to_string(),
      message,
    };

    let mut response = reqwest::blocking::get(url).map_err(|e| download_error(e.to_string()))?;

    if !response.status().is_success() {
      return Err(download_error(format!("HTTP {}", response.status())));
    }

    let mut file = File::create(dest).map_err(DepsError::Stage)?;
    let size = response
      .copy_to(&mut file)
      .map_err(|e| download_error(e.to_string()))?;

    info!(path = ?dest, size, "download complete");
    Ok(())
  }
}

/// Check a downloaded file against a pinned SHA256 (lowercase hex).
pub fn verify_sha256(path: &Path, url: &str, expected: &str) -> Result<(), DepsError> {
  let actual = hash_file(path).map_err(DepsError::Stage)?;
  if actual != expected.to_ascii_lowercase() {
    return Err(DepsError::HashMismatch {
      url: url.to_string(),
      expected: expected.to_string(),
      actual,
    });
  }
  debug!(path = ?path, "archive hash verified");
  Ok(())
}

fn hash_file(path: &Path) -> io::Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  io::copy(&mut file, &mut hasher)?;
  Ok(hex::encode(hasher.finalize()))
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to hash of URL
/// if no suitable filename can be extracted.
pub fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  format!("download_{}", &hex::encode(hasher.finalize())[..16])
}
