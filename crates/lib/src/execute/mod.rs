//! Build execution through ninja.
//!
//! A run has three phases, all against the same `build.ninja`:
//!
//! 1. `ninja -t commands` lists what would run. Diagnostic only.
//! 2. `ninja` performs the build while holding the build-root lock. Ninja's
//!    own up-to-date checks decide what actually gets compiled.
//! 3. `ninja -t compdb compile` exports `compile_commands.json`. Diagnostic only.
//!
//! Only phase 2 can fail a run.

pub mod compdb;

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::COMPDB_FILE_NAME;
use crate::lock::{FileLock, LockError};

pub use compdb::CompileCommand;

#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Ninja exited unsuccessfully. `stderr` holds its stdout (where compiler
  /// output is relayed) followed by its stderr, verbatim.
  #[error("build failed{}:\n{stderr}", .code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
  BuildFailed { code: Option<i32>, stderr: String },

  #[error(transparent)]
  Lock(#[from] LockError),
}

/// Result of a successful run.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
  /// Commands ninja listed before building, one per line.
  pub commands: Vec<String>,
  /// Parsed compile-command database; empty if export failed.
  pub compile_commands: Vec<CompileCommand>,
  /// Where the database was written, if it was.
  pub compdb_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BuildExecutor {
  program: PathBuf,
}

impl BuildExecutor {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self { program: program.into() }
  }

  /// Run all three phases for `build_file`, serialized on `build_lock`.
  pub fn run(&self, build_file: &Path, build_lock: &Path, quiet: bool) -> Result<BuildOutcome, ExecuteError> {
    let commands = match self.list_commands(build_file) {
      Ok(commands) => {
        for command in &commands {
          if quiet {
            debug!(command = %command, "planned command");
          } else {
            info!(command = %command, "planned command");
          }
        }
        commands
      }
      Err(e) => {
        warn!(error = %e, "could not list build commands");
        Vec::new()
      }
    };

    {
      let _lock = FileLock::acquire(build_lock, "ninja build")?;
      self.build(build_file, quiet)?;
    }

    let compdb_path = build_file.with_file_name(COMPDB_FILE_NAME);
    let (compile_commands, compdb_path) = match self.export_compile_commands(build_file, &compdb_path) {
      Ok(commands) => (commands, Some(compdb_path)),
      Err(message) => {
        warn!(path = %compdb_path.display(), error = %message, "could not export compile commands");
        (Vec::new(), None)
      }
    };

    Ok(BuildOutcome {
      commands,
      compile_commands,
      compdb_path,
    })
  }

  /// `ninja -t commands`: the full command list for the default target.
  pub fn list_commands(&self, build_file: &Path) -> Result<Vec<String>, ExecuteError> {
    let output = self.command(build_file).args(["-t", "commands"]).output().map_err(|e| self.spawn_error(e))?;
    if !output.status.success() {
      return Err(failure(&output));
    }
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect(),
    )
  }

  fn build(&self, build_file: &Path, quiet: bool) -> Result<(), ExecuteError> {
    info!(build_file = %build_file.display(), "running ninja");

    let mut child = self
      .command(build_file)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| self.spawn_error(e))?;

    // Drained on its own thread so a chatty stderr cannot block stdout.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
      thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
      })
    });

    let stdout = match child.stdout.take() {
      Some(pipe) => tee_lines(pipe, !quiet),
      None => Vec::new(),
    };
    let stderr = stderr_reader
      .and_then(|handle| handle.join().ok())
      .unwrap_or_default();
    let status = child.wait().map_err(|e| self.spawn_error(e))?;

    let output = Output { status, stdout, stderr };
    if !output.status.success() {
      return Err(failure(&output));
    }

    if quiet {
      let stdout = String::from_utf8_lossy(&output.stdout);
      if !stdout.trim().is_empty() {
        debug!(stdout = %stdout.trim_end(), "ninja output");
      }
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
      warn!(stderr = %stderr.trim_end(), "ninja reported warnings");
    }
    Ok(())
  }

  fn export_compile_commands(&self, build_file: &Path, dest: &Path) -> Result<Vec<CompileCommand>, String> {
    let output = self
      .command(build_file)
      .args(["-t", "compdb", "compile"])
      .output()
      .map_err(|e| self.spawn_error(e).to_string())?;
    if !output.status.success() {
      return Err(failure(&output).to_string());
    }

    let commands = compdb::parse(&String::from_utf8_lossy(&output.stdout)).map_err(|e| e.to_string())?;
    fs::write(dest, &output.stdout).map_err(|e| e.to_string())?;
    debug!(path = %dest.display(), entries = commands.len(), "wrote compile commands");
    Ok(commands)
  }

  fn command(&self, build_file: &Path) -> Command {
    let mut command = Command::new(&self.program);
    if let Some(dir) = build_file.parent().filter(|d| !d.as_os_str().is_empty()) {
      command.current_dir(dir);
    }
    command.arg("-f").arg(build_file);
    command
  }

  fn spawn_error(&self, source: io::Error) -> ExecuteError {
    ExecuteError::Spawn {
      program: self.program.clone(),
      source,
    }
  }
}

/// Collect everything `pipe` produces, echoing each line to our stdout as it
/// arrives when `echo` is set.
fn tee_lines(pipe: impl Read, echo: bool) -> Vec<u8> {
  let mut reader = BufReader::new(pipe);
  let mut captured = Vec::new();
  let mut line = Vec::new();
  let mut terminal = io::stdout();

  loop {
    line.clear();
    match reader.read_until(b'\n', &mut line) {
      Ok(0) | Err(_) => break,
      Ok(_) => {
        if echo {
          let _ = terminal.write_all(&line);
          let _ = terminal.flush();
        }
        captured.extend_from_slice(&line);
      }
    }
  }

  captured
}

/// Ninja relays compiler output on stdout, so both streams are kept.
fn failure(output: &Output) -> ExecuteError {
  let mut stderr = String::from_utf8_lossy(&output.stdout).into_owned();
  stderr.push_str(&String::from_utf8_lossy(&output.stderr));
  ExecuteError::BuildFailed {
    code: output.status.code(),
    stderr,
  }
}
