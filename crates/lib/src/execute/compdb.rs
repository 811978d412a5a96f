//! Clang-style compile-command database (`compile_commands.json`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
  pub directory: PathBuf,
  pub command: String,
  pub file: PathBuf,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<PathBuf>,
}

impl CompileCommand {
  /// Absolute source path, resolving `file` against `directory`.
  pub fn source_path(&self) -> PathBuf {
    if self.file.is_absolute() {
      self.file.clone()
    } else {
      self.directory.join(&self.file)
    }
  }
}

pub fn parse(json: &str) -> Result<Vec<CompileCommand>, serde_json::Error> {
  serde_json::from_str(json)
}
