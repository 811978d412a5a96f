//! vecjit-lib: just-in-time specialization of the native vector module.
//!
//! Each requested feature dimension gets its own ninja build graph and its own
//! private artifact directory, while dimension-independent translation units
//! are compiled once into a shared directory and reused:
//! - `toolchain`: compiler lookup and the per-platform flag table
//! - `deps`: the version-pinned header dependency cache
//! - `layout`: deterministic artifact directories per specialization
//! - `graph`: compile/link graph generation and `build.ninja` serialization
//! - `execute`: ninja invocation and the compile-command database
//! - `jit`: the compilation request tying the pieces together

pub mod config;
pub mod consts;
pub mod deps;
pub mod error;
pub mod execute;
pub mod graph;
pub mod jit;
pub mod layout;
pub mod lock;
pub mod platform;
pub mod toolchain;

#[cfg(test)]
pub(crate) mod util;

pub use config::{JitConfig, SourceUnit};
pub use error::JitError;
pub use jit::{CompileRequest, CompiledModule, Jit, PreparedBuild, Specialization, module_name};
