//! Compilation requests.
//!
//! [`Jit::compile`] runs the whole pipeline for one dimension: resolve the
//! toolchain, make sure the pinned dependency is cached, lay out the artifact
//! directories, write `build.ninja` and run it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::JitConfig;
use crate::deps::{DependencyCache, DependencyCacheEntry, Fetcher, HttpFetcher};
use crate::error::JitError;
use crate::execute::{BuildExecutor, CompileCommand};
use crate::graph::{BuildGraph, SourceSet};
use crate::layout::ArtifactLayout;
use crate::toolchain::{self, ToolchainConfig};

pub use crate::graph::{Specialization, module_name};

/// Arguments of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
  pub dimension: u32,
  /// Compiler id; the configured default when `None`.
  pub toolchain: Option<String>,
  pub quiet: bool,
  pub extra_compile_flags: Vec<String>,
  pub extra_link_flags: Vec<String>,
}

impl CompileRequest {
  pub fn new(dimension: u32) -> Self {
    Self {
      dimension,
      toolchain: None,
      quiet: false,
      extra_compile_flags: Vec::new(),
      extra_link_flags: Vec::new(),
    }
  }

  pub fn toolchain(mut self, id: &str) -> Self {
    self.toolchain = Some(id.to_string());
    self
  }

  pub fn quiet(mut self, quiet: bool) -> Self {
    self.quiet = quiet;
    self
  }

  pub fn compile_flag(mut self, flag: &str) -> Self {
    self.extra_compile_flags.push(flag.to_string());
    self
  }

  pub fn compile_flags<I, S>(mut self, flags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.extra_compile_flags.extend(flags.into_iter().map(Into::into));
    self
  }

  pub fn link_flag(mut self, flag: &str) -> Self {
    self.extra_link_flags.push(flag.to_string());
    self
  }

  pub fn link_flags<I, S>(mut self, flags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.extra_link_flags.extend(flags.into_iter().map(Into::into));
    self
  }
}

/// Everything decided before the build tool runs.
#[derive(Debug, Clone)]
pub struct PreparedBuild {
  pub specialization: Specialization,
  pub toolchain: ToolchainConfig,
  pub layout: ArtifactLayout,
  pub dependency: DependencyCacheEntry,
  pub graph: BuildGraph,
  pub build_file: PathBuf,
}

/// A built, loadable module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
  /// Module identifier, e.g. `vecdbImpl128`.
  pub name: String,
  pub dimension: u32,
  pub path: PathBuf,
  pub compile_commands: Vec<CompileCommand>,
  pub compdb_path: Option<PathBuf>,
}

pub struct Jit {
  config: JitConfig,
  fetcher: Arc<dyn Fetcher>,
}

impl Jit {
  pub fn new(config: JitConfig) -> Self {
    Self::with_fetcher(config, Arc::new(HttpFetcher))
  }

  pub fn with_fetcher(config: JitConfig, fetcher: Arc<dyn Fetcher>) -> Self {
    Self { config, fetcher }
  }

  pub fn config(&self) -> &JitConfig {
    &self.config
  }

  /// Resolve, fetch, lay out and write `build.ninja`, without building.
  pub fn prepare(&self, request: &CompileRequest) -> Result<PreparedBuild, JitError> {
    let specialization = Specialization::new(request.dimension)?;

    let toolchain_id = request.toolchain.as_deref().unwrap_or(&self.config.default_toolchain);
    let toolchain =
      toolchain::resolve_for_host(toolchain_id, &request.extra_compile_flags, &request.extra_link_flags)?;

    let spec = &self.config.dependency;
    let dependency = DependencyCache::new(&self.config.cache_root, self.fetcher.clone())
      .ensure(spec)
      .map_err(|source| JitError::DependencyFetchFailed {
        name: spec.name.clone(),
        version: spec.version.clone(),
        source,
      })?;

    let suffix = self
      .config
      .module_suffix
      .as_deref()
      .unwrap_or_else(|| toolchain.platform.os.loadable_suffix());
    let layout = ArtifactLayout::plan(&self.config.build_root, specialization.module_name(), suffix)?;

    let mut include_dirs = vec![self.config.include_dir.clone(), dependency.local_path.clone()];
    include_dirs.extend(self.config.extra_include_dirs.iter().cloned());
    let sources = SourceSet {
      src_dir: self.config.src_dir.clone(),
      units: self.config.sources.clone(),
      include_dirs,
    };

    let graph = BuildGraph::plan(&specialization, &toolchain, &layout, &sources)?;
    let build_file = graph.write(&layout.build_file())?;

    debug!(
      module = specialization.module_name(),
      toolchain = %toolchain.fingerprint(),
      build_file = %build_file.display(),
      "build prepared"
    );

    Ok(PreparedBuild {
      specialization,
      toolchain,
      layout,
      dependency,
      graph,
      build_file,
    })
  }

  /// Build the module for `request.dimension` and return where it landed.
  pub fn compile(&self, request: &CompileRequest) -> Result<CompiledModule, JitError> {
    let build_tool = toolchain::find_executable(&self.config.build_tool)
      .ok_or_else(|| JitError::ToolchainNotFound(self.config.build_tool.clone()))?;

    let prepared = self.prepare(request)?;
    let outcome = BuildExecutor::new(build_tool).run(
      &prepared.build_file,
      &prepared.layout.build_lock(),
      request.quiet,
    )?;

    let output = &prepared.layout.output_path;
    let path = dunce::canonicalize(output).map_err(|e| JitError::BuildFailed {
      code: None,
      stderr: format!("build reported success but '{}' is missing: {}", output.display(), e),
    })?;

    info!(
      module = prepared.specialization.module_name(),
      path = %path.display(),
      "module ready"
    );

    Ok(CompiledModule {
      name: prepared.specialization.module_name().to_string(),
      dimension: prepared.specialization.dimension(),
      path,
      compile_commands: outcome.compile_commands,
      compdb_path: outcome.compdb_path,
    })
  }
}
