//! Test utilities for vecjit-lib.
//!
//! Fake fetchers, in-memory archives and stand-in executables for the
//! compiler and ninja.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::deps::{DepsError, Fetcher};

/// Build a `.tar.gz` whose entries all live under `top/`.
pub fn tar_gz(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for (path, contents) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
      .append_data(&mut header, format!("{}/{}", top, path), contents.as_bytes())
      .unwrap();
  }

  builder.into_inner().unwrap().finish().unwrap()
}

/// Serves fixed bytes for any URL and counts calls.
pub struct StaticFetcher {
  bytes: Vec<u8>,
  delay: Duration,
  calls: AtomicUsize,
}

impl StaticFetcher {
  pub fn new(bytes: Vec<u8>) -> Self {
    Self {
      bytes,
      delay: Duration::ZERO,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Fetcher for StaticFetcher {
  fn fetch(&self, _url: &str, dest: &Path) -> Result<(), DepsError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    thread::sleep(self.delay);
    std::fs::write(dest, &self.bytes).map_err(DepsError::Stage)
  }
}

/// Always fails, after leaving a partial download behind.
pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
  fn fetch(&self, url: &str, dest: &Path) -> Result<(), DepsError> {
    std::fs::write(dest, b"partial").map_err(DepsError::Stage)?;
    Err(DepsError::Download {
      url: url.to_string(),
      message: "HTTP 503 Service Unavailable".to_string(),
    })
  }
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// A stand-in for ninja.
///
/// Appends its arguments to `calls.log` next to itself, answers `-t commands`
/// and `-t compdb` with canned output, and exits with `build_exit` for a build.
/// Like ninja, a failed build relays the compiler diagnostic on stdout.
///
/// A successful build creates each `build` output of the build file that does
/// not exist yet and records it in `built.log`. A build that starts while
/// another is still running is recorded in `overlaps.log`.
#[cfg(unix)]
pub fn fake_ninja(dir: &Path, build_exit: i32, compdb_exit: i32) -> PathBuf {
  let body = format!(
    r#"PATH="$PATH:/usr/bin:/bin"
echo "$*" >> '{calls}'
case "$*" in
  *"-t commands"*)
    echo "g++ -c searchAlgorithm.cpp -o searchAlgorithm.o"
    exit 0
    ;;
  *"-t compdb"*)
    if [ {compdb_exit} -ne 0 ]; then echo "compdb unavailable" >&2; exit {compdb_exit}; fi
    printf '[\n  {{ "directory": "%s", "command": "g++ -c a.cpp -o a.o", "file": "a.cpp", "output": "a.o" }}\n]\n' "$PWD"
    exit 0
    ;;
esac
mkdir '{running}' 2>/dev/null || echo "$2" >> '{overlaps}'
sleep 0.2
rmdir '{running}' 2>/dev/null
echo "[1/1] compile a.o"
if [ {build_exit} -ne 0 ]; then
  echo "FAILED: a.o"
  echo "a.cpp:1:1: error: expected unqualified-id"
  echo "ninja: build stopped: subcommand failed." >&2
  exit {build_exit}
fi
for out in $(sed -n 's/^build \([^:]*\):.*/\1/p' "$2"); do
  if [ ! -e "$out" ]; then
    mkdir -p "$(dirname "$out")"
    touch "$out"
    echo "$out" >> '{built}'
  fi
done
exit 0
"#,
    calls = dir.join("calls.log").display(),
    running = dir.join("running").display(),
    overlaps = dir.join("overlaps.log").display(),
    built = dir.join("built.log").display(),
    build_exit = build_exit,
    compdb_exit = compdb_exit,
  );
  write_executable(dir, "ninja", &body)
}

#[cfg(unix)]
fn log_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}

/// Lines appended by [`fake_ninja`], one per invocation.
#[cfg(unix)]
pub fn fake_ninja_calls(dir: &Path) -> Vec<String> {
  log_lines(&dir.join("calls.log"))
}

/// Outputs [`fake_ninja`] created, in order.
#[cfg(unix)]
pub fn fake_ninja_built(dir: &Path) -> Vec<PathBuf> {
  log_lines(&dir.join("built.log")).into_iter().map(PathBuf::from).collect()
}

/// Build files whose build overlapped another [`fake_ninja`] build.
#[cfg(unix)]
pub fn fake_ninja_overlaps(dir: &Path) -> Vec<String> {
  log_lines(&dir.join("overlaps.log"))
}
