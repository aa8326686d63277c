mod commands;
mod core;
mod gate;
mod publish;
mod ui;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::ChangeArgs;
use crate::core::error::{RailError, RailResult, print_error};
use std::path::{Path, PathBuf};

/// Rebuild and publish only the container images whose sources changed
#[derive(Parser)]
#[command(name = "image-rail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Repository root (default: current directory, or the enclosing git checkout)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Config file (default: image-rail.toml, searched in the repository root)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// More log output (-v info, -vv debug); RUST_LOG overrides
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show which targets are gated by changes
  Evaluate {
    #[command(flatten)]
    changes: ChangeArgs,
    /// Output format: text (default), json, names-only, github
    #[arg(long, default_value = "text")]
    format: String,
  },

  /// Build and push images for gated targets
  Publish {
    #[command(flatten)]
    changes: ChangeArgs,
    /// Branch the push happened on (default: $GITHUB_REF_NAME or current branch)
    #[arg(long)]
    branch: Option<String>,
    /// Maximum targets published at once (default: all gated targets)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,
    /// Show dry-run plan without execution
    #[arg(long)]
    dry_run: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// List registered build targets
  Targets {
    /// Output targets in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging(verbose: u8) {
  let default_level = match verbose {
    0 => tracing::Level::WARN,
    1 => tracing::Level::INFO,
    _ => tracing::Level::DEBUG,
  };

  // Logs go to stderr so stdout stays machine-readable (--json, --format github)
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let root = match resolve_root(cli.root.as_deref(), cli.config.as_deref()) {
    Ok(root) => root,
    Err(e) => handle_error(e),
  };

  // Configuration errors are fatal here, before any change is evaluated
  let ctx = match crate::core::context::RepoContext::build(&root, cli.config.as_deref()) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Evaluate { changes, format } => commands::run_evaluate(&ctx, changes, format),
    Commands::Publish {
      changes,
      branch,
      jobs,
      dry_run,
      json,
    } => commands::run_publish(&ctx, changes, branch, jobs.map(usize::from), dry_run, json),
    Commands::Targets { json } => commands::run_targets(&ctx, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: RailError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

/// Pick the repository root.
///
/// An explicit `--root` wins. Otherwise the current directory is used when it
/// holds a config (or `--config` is given); failing that, the enclosing git
/// checkout's top level.
fn resolve_root(explicit: Option<&Path>, config: Option<&Path>) -> RailResult<PathBuf> {
  if let Some(root) = explicit {
    return Ok(root.to_path_buf());
  }

  let cwd = std::env::current_dir()
    .map_err(|e| RailError::message(format!("Failed to get current directory: {}", e)))?;

  if config.is_some() || crate::core::config::RailConfig::find_config_path(&cwd).is_some() {
    return Ok(cwd);
  }

  match crate::core::vcs::SystemGit::open(&cwd) {
    Ok(git) => Ok(git.work_tree().to_path_buf()),
    Err(_) => Ok(cwd),
  }
}
