//! Errors surfaced to callers of [`Jit`](crate::jit::Jit).
//!
//! Every failure is terminal for the request that raised it. Component
//! errors keep their own enums and are folded in here.

use thiserror::Error;

use crate::deps::DepsError;
use crate::execute::ExecuteError;
use crate::graph::GraphError;
use crate::layout::LayoutError;
use crate::toolchain::ToolchainError;

#[derive(Debug, Error)]
pub enum JitError {
  /// The compiler or the build tool is not installed.
  #[error("toolchain '{0}' not found on PATH")]
  ToolchainNotFound(String),

  #[error("unsupported toolchain '{compiler}' on {platform}")]
  UnsupportedToolchain { compiler: String, platform: String },

  /// Download or extraction of a pinned dependency failed. The cache holds
  /// no partial entry afterwards.
  #[error("failed to fetch dependency {name} {version}: {source}")]
  DependencyFetchFailed {
    name: String,
    version: String,
    #[source]
    source: DepsError,
  },

  #[error("failed to generate build description: {0}")]
  GraphWriteFailed(#[source] GraphError),

  /// Compilation or linking failed; `stderr` holds the tool's output verbatim.
  #[error("build failed{}:\n{stderr}", .code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
  BuildFailed { code: Option<i32>, stderr: String },
}

impl From<ToolchainError> for JitError {
  fn from(err: ToolchainError) -> Self {
    match err {
      ToolchainError::NotFound(id) => Self::ToolchainNotFound(id),
      ToolchainError::Unsupported { compiler, platform } => Self::UnsupportedToolchain { compiler, platform },
    }
  }
}

impl From<GraphError> for JitError {
  fn from(err: GraphError) -> Self {
    Self::GraphWriteFailed(err)
  }
}

impl From<LayoutError> for JitError {
  fn from(err: LayoutError) -> Self {
    Self::GraphWriteFailed(GraphError::Layout(err))
  }
}

impl From<ExecuteError> for JitError {
  fn from(err: ExecuteError) -> Self {
    match err {
      ExecuteError::BuildFailed { code, stderr } => Self::BuildFailed { code, stderr },
      other => Self::BuildFailed {
        code: None,
        stderr: other.to_string(),
      },
    }
  }
}
