mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atmake_lib::config::Config;
use atmake_lib::consts::DESCRIPTOR_FILE_NAME;
use atmake_lib::platform::PlatformId;

use crate::output::OutputFormat;

/// atmake - declarative build descriptions for XATMI artifacts
#[derive(Parser)]
#[command(name = "atmake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Toolchain flavour, overrides ATMAKE_PLATFORM
  #[arg(long, global = true)]
  platform: Option<PlatformId>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Write the rule file for a descriptor
  Generate {
    #[arg(default_value = DESCRIPTOR_FILE_NAME)]
    descriptor: PathBuf,

    /// Print the rules instead of writing them
    #[arg(long)]
    stdout: bool,
  },

  /// Build targets directly, without make
  Build {
    #[arg(default_value = DESCRIPTOR_FILE_NAME)]
    descriptor: PathBuf,

    /// Targets to build (default: all)
    targets: Vec<String>,

    /// Number of recipes run in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Keep building what does not depend on a failed target
    #[arg(short, long)]
    keep_going: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Remove everything a descriptor produces
  Clean {
    #[arg(default_value = DESCRIPTOR_FILE_NAME)]
    descriptor: PathBuf,
  },

  /// Regenerate stale rule files below a directory
  Tree {
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Regenerate every rule file
    #[arg(short, long)]
    force: bool,

    /// Build `all` of the top-level descriptor afterwards
    #[arg(short, long)]
    build: bool,

    /// Number of recipes run in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show host and configuration
  Info {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let mut config = Config::from_env().context("Failed to read configuration")?;
  if let Some(platform) = cli.platform {
    config = config.with_platform(platform);
  }

  let result = match cli.command {
    Commands::Generate { descriptor, stdout } => cmd::cmd_generate(&descriptor, &config, stdout),
    Commands::Build {
      descriptor,
      targets,
      jobs,
      keep_going,
      output,
    } => {
      if let Some(jobs) = jobs {
        config = config.with_parallelism(jobs);
      }
      cmd::cmd_build(&descriptor, targets, config, keep_going, output)
    }
    Commands::Clean { descriptor } => cmd::cmd_clean(&descriptor, config),
    Commands::Tree {
      root,
      force,
      build,
      jobs,
      output,
    } => {
      if let Some(jobs) = jobs {
        config = config.with_parallelism(jobs);
      }
      cmd::cmd_tree(&root, config, force, build, output)
    }
    Commands::Info { output } => cmd::cmd_info(&config, output),
  };

  if let Err(ref e) = result {
    output::print_error(&format!("{:#}", e));
    std::process::exit(1);
  }

  Ok(())
}
