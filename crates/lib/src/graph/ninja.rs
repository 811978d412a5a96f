//! Minimal writer for the ninja build file syntax.
//!
//! See <https://ninja-build.org/manual.html#ref_lexer> for the escaping rules.

use std::fmt::Write;

#[derive(Debug, Default)]
pub struct NinjaWriter {
  out: String,
}

impl NinjaWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn comment(&mut self, text: &str) {
    for line in text.lines() {
      let _ = writeln!(self.out, "# {}", line);
    }
  }

  pub fn newline(&mut self) {
    self.out.push('\n');
  }

  /// Top-level variable. `value` must already be escaped.
  pub fn variable(&mut self, key: &str, value: &str) {
    let _ = writeln!(self.out, "{} = {}", key, value);
  }

  fn scoped_variable(&mut self, key: &str, value: &str) {
    let _ = writeln!(self.out, "  {} = {}", key, value);
  }

  pub fn rule(&mut self, name: &str, command: &str, description: &str, depfile: Option<&str>, deps: Option<&str>) {
    let _ = writeln!(self.out, "rule {}", name);
    self.scoped_variable("command", command);
    self.scoped_variable("description", description);
    if let Some(depfile) = depfile {
      self.scoped_variable("depfile", depfile);
    }
    if let Some(deps) = deps {
      self.scoped_variable("deps", deps);
    }
  }

  /// Build edge. Paths are escaped here; edge variable values must already be.
  pub fn build(&mut self, outputs: &[String], rule: &str, inputs: &[String], variables: &[(&str, String)]) {
    let outputs: Vec<String> = outputs.iter().map(|p| escape_path(p)).collect();
    let inputs: Vec<String> = inputs.iter().map(|p| escape_path(p)).collect();

    let _ = write!(self.out, "build {}: {}", outputs.join(" "), rule);
    for input in &inputs {
      let _ = write!(self.out, " {}", input);
    }
    self.out.push('\n');

    for (key, value) in variables {
      self.scoped_variable(key, value);
    }
  }

  pub fn default_targets(&mut self, targets: &[String]) {
    let targets: Vec<String> = targets.iter().map(|p| escape_path(p)).collect();
    let _ = writeln!(self.out, "default {}", targets.join(" "));
  }

  pub fn finish(self) -> String {
    self.out
  }
}

/// Escape a path used in a `build` or `default` line.
pub fn escape_path(path: &str) -> String {
  let mut escaped = String::with_capacity(path.len());
  for c in path.chars() {
    match c {
      '$' => escaped.push_str("$$"),
      ' ' => escaped.push_str("$ "),
      ':' => escaped.push_str("$:"),
      _ => escaped.push(c),
    }
  }
  escaped
}

/// Escape a variable value.
pub fn escape(value: &str) -> String {
  value.replace('$', "$$")
}

/// Quote one argument for `/bin/sh`, leaving plain arguments untouched.
pub fn shell_quote(arg: &str) -> String {
  let plain = !arg.is_empty()
    && arg
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "_-+=/.,:@%".contains(c));
  if plain {
    arg.to_string()
  } else {
    format!("'{}'", arg.replace('\'', r"'\''"))
  }
}

/// Shell-quote each argument, join with spaces and escape for ninja.
pub fn command_line<I, S>(args: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let joined: Vec<String> = args.into_iter().map(|a| shell_quote(a.as_ref())).collect();
  escape(&joined.join(" "))
}
