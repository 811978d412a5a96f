use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use vecjit_lib::deps::{DependencyCache, DependencyState, HttpFetcher};

use super::ConfigArgs;
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct DepsOutput {
  name: String,
  version: String,
  path: PathBuf,
  fetched: bool,
}

pub fn cmd_deps(config: &ConfigArgs, output: OutputFormat) -> Result<()> {
  let config = config.config();
  let spec = &config.dependency;
  let cache = DependencyCache::new(&config.cache_root, Arc::new(HttpFetcher));

  let fetched = cache.state(spec) == DependencyState::Absent;
  if fetched && !output.is_json() {
    print_info(&format!("Fetching {} {}", spec.name, spec.version));
  }

  let entry = cache
    .ensure(spec)
    .with_context(|| format!("Failed to fetch {} {}", spec.name, spec.version))?;

  if output.is_json() {
    print_json(&DepsOutput {
      name: entry.name,
      version: entry.version,
      path: entry.local_path,
      fetched,
    })?;
  } else {
    print_success(&format!("{} {} is cached", entry.name, entry.version));
    print_stat("Path", &entry.local_path.display().to_string());
  }

  Ok(())
}
