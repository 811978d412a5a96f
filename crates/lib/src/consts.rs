/// Application name, used for default cache locations.
pub const APP_NAME: &str = "vecjit";

/// Prefix of every specialized module name (`vecdbImpl128`, ...).
pub const MODULE_PREFIX: &str = "vecdbImpl";

/// Preprocessor constant carrying the feature dimension.
pub const DIMENSION_DEFINE: &str = "FEAT_DIM";

/// Preprocessor constant carrying the module name.
pub const MODULE_NAME_DEFINE: &str = "MODULE_NAME";

/// Name of the subtree shared by all specializations under the build root.
pub const SHARED_DIR_NAME: &str = "shared";

/// Per-subtree directory holding the build description and command database.
pub const SCRIPTS_DIR_NAME: &str = "scripts";

/// Per-subtree directory holding object files and the final module.
pub const BIN_DIR_NAME: &str = "bin";

pub const BUILD_FILE_NAME: &str = "build.ninja";

pub const COMPDB_FILE_NAME: &str = "compile_commands.json";

/// Lock file guarding ninja execution against one build root.
pub const BUILD_LOCK_FILENAME: &str = ".build.lock";

/// Length of the truncated toolchain fingerprint hash.
pub const FINGERPRINT_HASH_LEN: usize = 12;

pub const DEFAULT_TOOLCHAIN: &str = "g++";

pub const DEFAULT_BUILD_TOOL: &str = "ninja";

/// Extension of C++ translation units under the source directory.
pub const SOURCE_EXTENSION: &str = "cpp";
