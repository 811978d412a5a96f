//! Build graph generation.
//!
//! One graph per specialization: a compile edge per source unit and a single
//! link edge producing the loadable module. Dimension-dependent units compile
//! into the private `bin` directory with the dimension and module name
//! injected as preprocessor constants. Dimension-independent units compile
//! into a shared directory keyed by everything on their command line, with an edge
//! that is byte-for-byte the same in every specialization's graph; ninja then
//! treats a second request for the same object as up to date.
//!
//! All objects are linked directly into the module. Shared code is never
//! split into its own shared library, because modules for different
//! dimensions are loaded into one process side by side.

pub mod ninja;

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SourceUnit;
use crate::consts::{DIMENSION_DEFINE, FINGERPRINT_HASH_LEN, MODULE_NAME_DEFINE, MODULE_PREFIX};
use crate::layout::{ArtifactLayout, LayoutError};
use crate::toolchain::ToolchainConfig;

use ninja::{NinjaWriter, command_line, escape};

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("invalid dimension {0}: must be positive")]
  InvalidDimension(u32),

  #[error("invalid flag {flag:?}: {reason}")]
  InvalidFlag { flag: String, reason: &'static str },

  #[error("duplicate source unit '{0}'")]
  DuplicateSource(String),

  #[error("no source units to compile")]
  NoSources,

  #[error(transparent)]
  Layout(#[from] LayoutError),

  #[error("failed to write build description '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Module name for a dimension (`128` → `vecdbImpl128`).
pub fn module_name(dimension: u32) -> String {
  format!("{}{}", MODULE_PREFIX, dimension)
}

/// One build output instance parameterized by a fixed dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specialization {
  dimension: u32,
  module_name: String,
}

impl Specialization {
  pub fn new(dimension: u32) -> Result<Self, GraphError> {
    if dimension == 0 {
      return Err(GraphError::InvalidDimension(dimension));
    }
    Ok(Self {
      dimension,
      module_name: module_name(dimension),
    })
  }

  pub fn dimension(&self) -> u32 {
    self.dimension
  }

  pub fn module_name(&self) -> &str {
    &self.module_name
  }
}

/// Source units plus the include path, in search order.
#[derive(Debug, Clone)]
pub struct SourceSet {
  pub src_dir: PathBuf,
  pub units: Vec<SourceUnit>,
  pub include_dirs: Vec<PathBuf>,
}

impl SourceSet {
  /// Name of the shared objects directory for these sources under `toolchain`.
  ///
  /// Covers the toolchain fingerprint, the source directory and the include
  /// path, so projects or dependency versions sharing one build root never
  /// write the same object file. Format: `{compiler}-{12 hex chars}`.
  pub fn shared_key(&self, toolchain: &ToolchainConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(toolchain.fingerprint().as_bytes());
    hasher.update([0]);
    hasher.update(self.src_dir.to_string_lossy().as_bytes());
    for dir in &self.include_dirs {
      hasher.update([0]);
      hasher.update(dir.to_string_lossy().as_bytes());
    }
    let full = hex::encode(hasher.finalize());
    format!("{}-{}", toolchain.compiler, &full[..FINGERPRINT_HASH_LEN])
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileNode {
  pub source: PathBuf,
  pub object: PathBuf,
  pub dimension_dependent: bool,
  /// Edge-scoped preprocessor definitions; empty for shared units.
  pub defines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
  pub inputs: Vec<PathBuf>,
  pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildGraph {
  pub module_name: String,
  pub compiler: PathBuf,
  pub compile_flags: Vec<String>,
  pub link_flags: Vec<String>,
  pub include_dirs: Vec<PathBuf>,
  /// Ninja `builddir`.
  pub log_dir: PathBuf,
  pub compiles: Vec<CompileNode>,
  pub link: LinkNode,
}

impl BuildGraph {
  /// Compose the compile and link actions for one specialization.
  pub fn plan(
    specialization: &Specialization,
    toolchain: &ToolchainConfig,
    layout: &ArtifactLayout,
    sources: &SourceSet,
  ) -> Result<Self, GraphError> {
    for flag in toolchain.compile_flags.iter().chain(&toolchain.link_flags) {
      validate_flag(flag)?;
    }

    if sources.units.is_empty() {
      return Err(GraphError::NoSources);
    }

    let mut seen = HashSet::new();
    for unit in &sources.units {
      if !seen.insert(unit.name.as_str()) {
        return Err(GraphError::DuplicateSource(unit.name.clone()));
      }
    }

    let shared_dir = if sources.units.iter().any(|u| !u.dimension_dependent) {
      Some(layout.shared_objects_dir(&sources.shared_key(toolchain))?)
    } else {
      None
    };

    let compiles: Vec<CompileNode> = sources
      .units
      .iter()
      .map(|unit| {
        let source = unit.source_path(&sources.src_dir);
        match (&shared_dir, unit.dimension_dependent) {
          (Some(shared), false) => CompileNode {
            source,
            object: shared.join(unit.object_name()),
            dimension_dependent: false,
            defines: Vec::new(),
          },
          _ => CompileNode {
            source,
            object: layout.bin_dir.join(unit.object_name()),
            dimension_dependent: true,
            defines: vec![
              format!("-D{}={}", DIMENSION_DEFINE, specialization.dimension()),
              format!("-D{}={}", MODULE_NAME_DEFINE, specialization.module_name()),
            ],
          },
        }
      })
      .collect();

    let link = LinkNode {
      inputs: compiles.iter().map(|c| c.object.clone()).collect(),
      output: layout.output_path.clone(),
    };

    debug!(
      module = specialization.module_name(),
      compiles = compiles.len(),
      shared = compiles.iter().filter(|c| !c.dimension_dependent).count(),
      "planned build graph"
    );

    Ok(Self {
      module_name: specialization.module_name().to_string(),
      compiler: toolchain.executable.clone(),
      compile_flags: toolchain.compile_flags.clone(),
      link_flags: toolchain.link_flags.clone(),
      include_dirs: sources.include_dirs.clone(),
      log_dir: layout.log_dir.clone(),
      compiles,
      link,
    })
  }

  /// Render the graph as a `build.ninja`. Output is a pure function of the graph.
  pub fn to_ninja(&self) -> String {
    let mut w = NinjaWriter::new();

    w.comment(&format!(
      "Generated by vecjit for {}; rewritten on every compile.",
      self.module_name
    ));
    w.newline();
    w.variable("ninja_required_version", "1.7");
    w.variable("builddir", &escape(&self.log_dir.to_string_lossy()));
    w.variable("cxx", &command_line([self.compiler.to_string_lossy()]));
    w.variable("cxx_flags", &command_line(&self.compile_flags));
    w.variable("link_flags", &command_line(&self.link_flags));
    w.variable(
      "includes",
      &command_line(self.include_dirs.iter().map(|d| format!("-I{}", d.display()))),
    );
    w.newline();

    w.rule(
      "compile",
      "$cxx -MMD -MF $out.d $defines $includes $cxx_flags -c $in -o $out",
      "compile $out",
      Some("$out.d"),
      Some("gcc"),
    );
    w.newline();
    w.rule("link", "$cxx $in $link_flags -o $out", "link $out", None, None);
    w.newline();

    for node in &self.compiles {
      let variables = if node.defines.is_empty() {
        Vec::new()
      } else {
        vec![("defines", command_line(&node.defines))]
      };
      w.build(&[path_string(&node.object)], "compile", &[path_string(&node.source)], &variables);
    }
    w.newline();

    let inputs: Vec<String> = self.link.inputs.iter().map(|p| path_string(p)).collect();
    w.build(&[path_string(&self.link.output)], "link", &inputs, &[]);
    w.newline();
    w.default_targets(&[path_string(&self.link.output)]);

    w.finish()
  }

  /// Write the rendered graph to `path`, atomically replacing any previous
  /// file. Returns the path written.
  pub fn write(&self, path: &Path) -> Result<PathBuf, GraphError> {
    let write_error = |source: io::Error| GraphError::Write {
      path: path.to_path_buf(),
      source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::Builder::new()
      .prefix(".build.ninja.")
      .tempfile_in(dir)
      .map_err(write_error)?;
    file.write_all(self.to_ninja().as_bytes()).map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;

    info!(module = %self.module_name, path = %path.display(), "wrote build description");
    Ok(path.to_path_buf())
  }

  /// Objects shared with other specializations.
  pub fn shared_objects(&self) -> impl Iterator<Item = &Path> {
    self
      .compiles
      .iter()
      .filter(|c| !c.dimension_dependent)
      .map(|c| c.object.as_path())
  }
}

fn path_string(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn validate_flag(flag: &str) -> Result<(), GraphError> {
  let reason = if flag.is_empty() {
    "empty flag"
  } else if flag.contains(['\n', '\r']) {
    "contains a line break"
  } else if flag.contains('\0') {
    "contains a NUL byte"
  } else {
    return Ok(());
  };
  Err(GraphError::InvalidFlag {
    flag: flag.to_string(),
    reason,
  })
}
