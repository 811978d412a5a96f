//! Configuration passed explicitly into every compilation request.

use std::path::{Path, PathBuf};

use crate::consts::{DEFAULT_BUILD_TOOL, DEFAULT_TOOLCHAIN, SOURCE_EXTENSION};
use crate::deps::DependencySpec;
use crate::platform::paths;

/// A C++ translation unit fed into the build graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
  /// File stem under the source directory (`vecdbImpl` → `vecdbImpl.cpp`).
  pub name: String,
  /// Whether the compiled output depends on the feature dimension.
  pub dimension_dependent: bool,
}

impl SourceUnit {
  pub fn dependent(name: &str) -> Self {
    Self {
      name: name.to_string(),
      dimension_dependent: true,
    }
  }

  pub fn independent(name: &str) -> Self {
    Self {
      name: name.to_string(),
      dimension_dependent: false,
    }
  }

  pub fn source_path(&self, src_dir: &Path) -> PathBuf {
    src_dir.join(format!("{}.{}", self.name, SOURCE_EXTENSION))
  }

  pub fn object_name(&self) -> String {
    format!("{}.o", self.name)
  }
}

/// The module entry points plus the search, disk I/O and encoding helpers.
pub fn default_sources() -> Vec<SourceUnit> {
  vec![
    SourceUnit::dependent("vecdbImpl"),
    SourceUnit::independent("searchAlgorithm"),
    SourceUnit::independent("diskIO"),
    SourceUnit::independent("encoding"),
  ]
}

#[derive(Debug, Clone)]
pub struct JitConfig {
  /// Directory holding the `.cpp` translation units.
  pub src_dir: PathBuf,
  /// Project header directory, first on the include path.
  pub include_dir: PathBuf,
  /// Additional include directories (host headers and the like).
  pub extra_include_dirs: Vec<PathBuf>,
  /// Root of the per-specialization and shared build trees.
  pub build_root: PathBuf,
  /// Root of the vendored dependency cache.
  pub cache_root: PathBuf,
  pub sources: Vec<SourceUnit>,
  /// Header-only dependency placed on the include path.
  pub dependency: DependencySpec,
  /// Build executor program (name on PATH or a path).
  pub build_tool: String,
  /// Compiler used when a request names none.
  pub default_toolchain: String,
  /// Overrides the platform's loadable-module suffix (e.g. a host-specific
  /// extension suffix such as `.cpython-312-x86_64-linux-gnu.so`).
  pub module_suffix: Option<String>,
}

impl JitConfig {
  /// Configuration with roots taken from the environment (see
  /// [`paths::build_root`] and [`paths::dependency_root`]).
  pub fn new(src_dir: impl Into<PathBuf>, include_dir: impl Into<PathBuf>) -> Self {
    Self {
      src_dir: src_dir.into(),
      include_dir: include_dir.into(),
      extra_include_dirs: Vec::new(),
      build_root: paths::build_root(),
      cache_root: paths::dependency_root(),
      sources: default_sources(),
      dependency: DependencySpec::eigen(),
      build_tool: DEFAULT_BUILD_TOOL.to_string(),
      default_toolchain: DEFAULT_TOOLCHAIN.to_string(),
      module_suffix: None,
    }
  }

  pub fn with_build_root(mut self, build_root: impl Into<PathBuf>) -> Self {
    self.build_root = build_root.into();
    self
  }

  pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
    self.cache_root = cache_root.into();
    self
  }

  pub fn with_sources(mut self, sources: Vec<SourceUnit>) -> Self {
    self.sources = sources;
    self
  }

  pub fn with_dependency(mut self, dependency: DependencySpec) -> Self {
    self.dependency = dependency;
    self
  }

  pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.extra_include_dirs.push(dir.into());
    self
  }

  pub fn with_build_tool(mut self, build_tool: &str) -> Self {
    self.build_tool = build_tool.to_string();
    self
  }

  pub fn with_module_suffix(mut self, suffix: &str) -> Self {
    self.module_suffix = Some(suffix.to_string());
    self
  }
}
