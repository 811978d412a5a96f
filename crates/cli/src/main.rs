mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, ConfigArgs, cmd_compile, cmd_deps, cmd_plan};
use output::OutputFormat;

/// Just-in-time builds of dimension-specialized vector modules
#[derive(Parser)]
#[command(name = "vecjit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (overridden by RUST_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the module for one dimension
  Compile {
    #[command(flatten)]
    build: BuildArgs,

    #[command(flatten)]
    config: ConfigArgs,

    /// Capture build tool output instead of streaming it
    #[arg(short, long)]
    quiet: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Write the build description for one dimension without building
  Plan {
    #[command(flatten)]
    build: BuildArgs,

    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Make sure the pinned header dependency is cached
  Deps {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Compile {
      build,
      config,
      quiet,
      output,
    } => cmd_compile(&build, &config, quiet, output),
    Commands::Plan { build, config, output } => cmd_plan(&build, &config, output),
    Commands::Deps { config, output } => cmd_deps(&config, output),
  }
}
