//! `vecjit compile`: build one specialization and report where it landed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use vecjit_lib::{Jit, module_name};

use super::{BuildArgs, ConfigArgs};
use crate::output::{OutputFormat, print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct CompileOutput {
  module: String,
  dimension: u32,
  path: PathBuf,
  compile_commands: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  compdb_path: Option<PathBuf>,
}

pub fn cmd_compile(build: &BuildArgs, config: &ConfigArgs, quiet: bool, output: OutputFormat) -> Result<()> {
  let jit = Jit::new(config.config());
  debug!(src = %config.src_dir.display(), build_root = %jit.config().build_root.display(), "compiling");

  // Streamed build output would corrupt a JSON document on stdout.
  let request = build.request().quiet(quiet || output.is_json());
  let module = jit
    .compile(&request)
    .with_context(|| format!("Failed to compile {}", module_name(build.dim)))?;

  if output.is_json() {
    print_json(&CompileOutput {
      module: module.name,
      dimension: module.dimension,
      path: module.path,
      compile_commands: module.compile_commands.len(),
      compdb_path: module.compdb_path,
    })?;
  } else {
    print_success(&format!("Built {}", module.name));
    print_stat("Path", &module.path.display().to_string());
    if let Some(compdb) = &module.compdb_path {
      print_stat("Compile commands", &compdb.display().to_string());
    }
  }

  Ok(())
}
