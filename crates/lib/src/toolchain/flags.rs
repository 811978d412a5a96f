//! Static compiler/platform flag table.

use crate::platform::Platform;
use crate::platform::arch::Arch;
use crate::platform::os::Os;
use crate::toolchain::Compiler;

/// Language, warning, PIC and optimization flags shared by every toolchain.
const BASE_COMPILE_FLAGS: &[&str] = &["-std=c++17", "-Wall", "-fPIC", "-O2", "-funroll-loops"];

const BASE_LINK_FLAGS: &[&str] = &["-shared"];

/// Default compile and link flags for one `(compiler, platform)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet {
  pub compile: Vec<String>,
  pub link: Vec<String>,
}

/// Look up the flag set for a toolchain.
///
/// Returns `None` for pairs outside the table.
pub fn flag_set(compiler: Compiler, platform: Platform) -> Option<FlagSet> {
  let runtime: &[&str] = match (compiler, platform.os) {
    (Compiler::Gcc, Os::Linux) | (Compiler::Gcc, Os::MacOs) | (Compiler::Clang, Os::Linux) => &["-lstdc++"],
    (Compiler::Clang, Os::MacOs) => &["-lc++"],
    (_, Os::Windows) => return None,
  };

  let tuning: &[&str] = match platform.arch {
    Arch::X86_64 => &["-march=native", "-mtune=native"],
    Arch::Aarch64 => &["-mcpu=native"],
  };

  // The host process provides its own symbols when it loads the module.
  let loader: &[&str] = match platform.os {
    Os::MacOs => &["-undefined", "dynamic_lookup"],
    _ => &[],
  };

  let compile = BASE_COMPILE_FLAGS.iter().chain(tuning).map(|s| s.to_string()).collect();
  let link = BASE_LINK_FLAGS
    .iter()
    .chain(runtime)
    .chain(loader)
    .map(|s| s.to_string())
    .collect();

  Some(FlagSet { compile, link })
}
