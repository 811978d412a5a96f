//! Shared helpers for the end-to-end tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use vecjit_lib::deps::{DependencySpec, DepsError, Fetcher};
use vecjit_lib::toolchain::find_executable;
use vecjit_lib::{Jit, JitConfig};

pub fn fixture_path(relative: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(relative)
}

/// Whether the host can run real builds.
pub fn tools_available() -> bool {
  let available = find_executable("g++").is_some() && find_executable("ninja").is_some();
  if !available {
    eprintln!("skipping: g++ or ninja not found on PATH");
  }
  available
}

/// Stand-in for the Eigen release tarball: a single header under the usual
/// `eigen-3.4.0/` top-level directory.
pub fn eigen_stub_archive() -> Vec<u8> {
  let header = "#pragma once\nnamespace Eigen {\nconstexpr int StubVersion = 3;\n}\n";

  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  let mut entry = tar::Header::new_gnu();
  entry.set_size(header.len() as u64);
  entry.set_mode(0o644);
  entry.set_cksum();
  builder
    .append_data(&mut entry, "eigen-3.4.0/Eigen/Core", header.as_bytes())
    .unwrap();
  builder.into_inner().unwrap().finish().unwrap()
}

/// Serves [`eigen_stub_archive`] for any URL.
pub struct ArchiveFetcher {
  bytes: Vec<u8>,
  calls: AtomicUsize,
}

impl ArchiveFetcher {
  pub fn new() -> Self {
    Self {
      bytes: eigen_stub_archive(),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Fetcher for ArchiveFetcher {
  fn fetch(&self, _url: &str, dest: &Path) -> Result<(), DepsError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    fs::write(dest, &self.bytes).map_err(DepsError::Stage)
  }
}

/// Isolated build and cache roots around the fixture sources.
pub struct TestEnv {
  pub temp: TempDir,
  pub fetcher: Arc<ArchiveFetcher>,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      fetcher: Arc::new(ArchiveFetcher::new()),
    }
  }

  pub fn build_root(&self) -> PathBuf {
    self.temp.path().join("build")
  }

  pub fn cache_root(&self) -> PathBuf {
    self.temp.path().join("cache")
  }

  pub fn config(&self) -> JitConfig {
    self.config_with_sources(&fixture_path("src"))
  }

  pub fn config_with_sources(&self, src_dir: &Path) -> JitConfig {
    JitConfig::new(src_dir, fixture_path("include"))
      .with_build_root(self.build_root())
      .with_cache_root(self.cache_root())
      .with_dependency(DependencySpec::new(
        "eigen",
        "3.4.0",
        "https://example.invalid/eigen-3.4.0.tar.gz",
      ))
  }

  pub fn jit(&self) -> Jit {
    Jit::with_fetcher(self.config(), self.fetcher.clone())
  }

  /// Copy the fixture sources somewhere writable.
  pub fn copy_sources(&self) -> PathBuf {
    let dest = self.temp.path().join("src");
    fs::create_dir_all(&dest).unwrap();
    for entry in fs::read_dir(fixture_path("src")).unwrap() {
      let entry = entry.unwrap();
      fs::copy(entry.path(), dest.join(entry.file_name())).unwrap();
    }
    dest
  }
}

/// Modification times of every file in `dir`, sorted by path.
pub fn mtimes(dir: &Path) -> Vec<(PathBuf, SystemTime)> {
  let mut times: Vec<_> = fs::read_dir(dir)
    .unwrap()
    .map(|e| e.unwrap().path())
    .filter(|p| p.is_file())
    .map(|p| {
      let modified = fs::metadata(&p).unwrap().modified().unwrap();
      (p, modified)
    })
    .collect();
  times.sort();
  times
}
