//! CLI smoke tests for vecjit.
//!
//! These run the binary with isolated roots and a controlled PATH, so none of
//! them touch the network or need a real compiler.

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn vecjit_cmd() -> Command {
  cargo_bin_cmd!("vecjit")
}

/// Command with build and cache roots under `temp` and PATH limited to `path`.
fn isolated_cmd(temp: &TempDir, path: &Path) -> Command {
  let mut cmd = vecjit_cmd();
  cmd
    .env("PATH", path)
    .env("VECJIT_BUILD_ROOT", temp.path().join("build"))
    .env("VECJIT_CACHE_ROOT", temp.path().join("cache"));
  cmd
}

#[test]
fn help_flag_works() {
  vecjit_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  vecjit_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("vecjit"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["compile", "plan", "deps"] {
    vecjit_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn zero_dimension_is_rejected() {
  vecjit_cmd()
    .args(["plan", "--dim", "0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--dim"));
}

#[test]
fn dimension_is_required() {
  vecjit_cmd()
    .arg("compile")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--dim"));
}

#[test]
fn unknown_toolchain_is_unsupported() {
  let temp = TempDir::new().unwrap();

  isolated_cmd(&temp, temp.path())
    .args(["plan", "--dim", "8", "--toolchain", "tcc"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unsupported toolchain 'tcc'"));

  assert!(!temp.path().join("cache").exists(), "nothing should be fetched");
}

#[test]
fn missing_compiler_is_reported() {
  let temp = TempDir::new().unwrap();

  isolated_cmd(&temp, temp.path())
    .args(["plan", "--dim", "8", "--toolchain", "clang++"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("toolchain 'clang++' not found"));
}

#[test]
fn missing_build_tool_is_reported() {
  let temp = TempDir::new().unwrap();

  isolated_cmd(&temp, temp.path())
    .args(["compile", "--dim", "8", "--build-tool", "no-such-ninja"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("toolchain 'no-such-ninja' not found"));
}

#[test]
fn json_output_flag_is_accepted() {
  let temp = TempDir::new().unwrap();

  isolated_cmd(&temp, temp.path())
    .args(["plan", "--dim", "8", "--toolchain", "tcc", "-o", "json"])
    .assert()
    .failure()
    .stdout(predicate::str::is_empty());
}
