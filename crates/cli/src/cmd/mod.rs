mod compile;
mod deps;
mod plan;

use std::path::PathBuf;

use clap::Args;

use vecjit_lib::{CompileRequest, JitConfig};

pub use compile::cmd_compile;
pub use deps::cmd_deps;
pub use plan::cmd_plan;

/// What to build.
#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Feature dimension to specialize for
  #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
  pub dim: u32,

  /// Compiler id (g++, clang++, or a path); defaults to g++
  #[arg(short, long)]
  pub toolchain: Option<String>,

  /// Extra compile flag, appended after the defaults (repeatable)
  #[arg(long = "cflag", value_name = "FLAG", allow_hyphen_values = true)]
  pub compile_flags: Vec<String>,

  /// Extra link flag, appended after the defaults (repeatable)
  #[arg(long = "ldflag", value_name = "FLAG", allow_hyphen_values = true)]
  pub link_flags: Vec<String>,
}

impl BuildArgs {
  pub fn request(&self) -> CompileRequest {
    let mut request = CompileRequest::new(self.dim)
      .compile_flags(self.compile_flags.iter().cloned())
      .link_flags(self.link_flags.iter().cloned());
    if let Some(toolchain) = &self.toolchain {
      request = request.toolchain(toolchain);
    }
    request
  }
}

/// Where sources, headers and caches live.
#[derive(Args, Debug)]
pub struct ConfigArgs {
  /// Directory holding the .cpp sources
  #[arg(long = "src", value_name = "DIR", default_value = "src")]
  pub src_dir: PathBuf,

  /// Project header directory
  #[arg(long = "include", value_name = "DIR", default_value = "include")]
  pub include_dir: PathBuf,

  /// Additional include directory (repeatable)
  #[arg(short = 'I', value_name = "DIR")]
  pub extra_includes: Vec<PathBuf>,

  /// Build root [env: VECJIT_BUILD_ROOT]
  #[arg(long, value_name = "DIR")]
  pub build_root: Option<PathBuf>,

  /// Dependency cache root [env: VECJIT_CACHE_ROOT]
  #[arg(long, value_name = "DIR")]
  pub cache_root: Option<PathBuf>,

  /// Build tool program
  #[arg(long, value_name = "PROGRAM")]
  pub build_tool: Option<String>,
}

impl ConfigArgs {
  pub fn config(&self) -> JitConfig {
    let mut config = JitConfig::new(&self.src_dir, &self.include_dir);
    for dir in &self.extra_includes {
      config = config.with_include_dir(dir);
    }
    if let Some(root) = &self.build_root {
      config = config.with_build_root(root);
    }
    if let Some(root) = &self.cache_root {
      config = config.with_cache_root(root);
    }
    if let Some(tool) = &self.build_tool {
      config = config.with_build_tool(tool);
    }
    config
  }
}
