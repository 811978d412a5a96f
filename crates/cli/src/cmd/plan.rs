//! `vecjit plan`: write `build.ninja` for one specialization without running it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use vecjit_lib::{Jit, module_name};

use super::{BuildArgs, ConfigArgs};
use crate::output::{OutputFormat, print_json, print_stat, print_success, symbols};

#[derive(Debug, Serialize)]
struct PlanOutput {
  module: String,
  toolchain: String,
  build_file: PathBuf,
  output_path: PathBuf,
  dependency: PathBuf,
  dimension_dependent: Vec<PathBuf>,
  shared: Vec<PathBuf>,
}

pub fn cmd_plan(build: &BuildArgs, config: &ConfigArgs, output: OutputFormat) -> Result<()> {
  let jit = Jit::new(config.config());
  let prepared = jit
    .prepare(&build.request())
    .with_context(|| format!("Failed to plan {}", module_name(build.dim)))?;

  let (dependent, shared): (Vec<_>, Vec<_>) = prepared
    .graph
    .compiles
    .iter()
    .partition(|node| node.dimension_dependent);

  if output.is_json() {
    print_json(&PlanOutput {
      module: prepared.specialization.module_name().to_string(),
      toolchain: prepared.toolchain.fingerprint(),
      build_file: prepared.build_file.clone(),
      output_path: prepared.layout.output_path.clone(),
      dependency: prepared.dependency.local_path.clone(),
      dimension_dependent: dependent.iter().map(|n| n.object.clone()).collect(),
      shared: shared.iter().map(|n| n.object.clone()).collect(),
    })?;
    return Ok(());
  }

  print_success(&format!("Wrote {}", prepared.build_file.display()));
  print_stat("Module", prepared.specialization.module_name());
  print_stat("Toolchain", &prepared.toolchain.fingerprint());
  print_stat("Output", &prepared.layout.output_path.display().to_string());
  println!();
  for node in dependent.iter().chain(shared.iter()) {
    let kind = if node.dimension_dependent { "private" } else { "shared" };
    println!(
      "  {} {} {} ({})",
      node.source.display(),
      symbols::ARROW,
      node.object.display(),
      kind
    );
  }

  Ok(())
}
