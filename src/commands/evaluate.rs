//! `image-rail evaluate` - Show which targets a change set gates
//!
//! This command collects the changed paths (via git or explicit input) and
//! prints, for every registered target, whether its image needs rebuilding.
//! Nothing is built or pushed.

use super::source::{ChangeArgs, ResolvedChanges};
use crate::core::context::RepoContext;
use crate::core::error::{RailError, RailResult, ResultExt};
use crate::gate::{ChangeEvent, GateResult, TargetRegistry, evaluate};
use std::fs::OpenOptions;
use std::io::Write;

/// Output format for evaluate command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
  Text,
  Json,
  NamesOnly,
  Github,
}

impl OutputFormat {
  fn from_str(s: &str) -> RailResult<Self> {
    match s.to_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "json" => Ok(Self::Json),
      "names" | "names-only" => Ok(Self::NamesOnly),
      "github" => Ok(Self::Github),
      _ => Err(RailError::message(format!(
        "Unknown format '{}'. Valid formats: text, json, names-only, github",
        s
      ))),
    }
  }
}

/// Registry view, change event and gate decisions for one invocation
pub(crate) struct Evaluation {
  pub registry: TargetRegistry,
  pub event: ChangeEvent,
  /// Where the changes came from, for display
  pub source: String,
  pub gate: GateResult,
}

/// Resolve targets and changes, then evaluate the gates
pub(crate) fn compute(ctx: &RepoContext, args: &ChangeArgs) -> RailResult<Evaluation> {
  let registry = ctx.registry.select(&args.targets)?;
  let ResolvedChanges { event, source } = args.resolve(ctx.root())?;

  let gate = if args.all {
    GateResult::uniform(&event, &registry, true)
  } else {
    evaluate(&event, &registry)
  };

  Ok(Evaluation {
    registry,
    event,
    source,
    gate,
  })
}

/// Run the evaluate command
pub fn run_evaluate(ctx: &RepoContext, args: ChangeArgs, format: String) -> RailResult<()> {
  let output_format = OutputFormat::from_str(&format)?;
  let evaluation = compute(ctx, &args)?;

  match output_format {
    OutputFormat::Text => display_text(&evaluation),
    OutputFormat::Json => display_json(&evaluation)?,
    OutputFormat::NamesOnly => display_names_only(&evaluation),
    OutputFormat::Github => display_github(&evaluation)?,
  }

  Ok(())
}

/// Display results in human-readable text format
fn display_text(evaluation: &Evaluation) {
  let Evaluation {
    registry,
    event,
    source,
    gate,
  } = evaluation;

  println!("Gate Evaluation ({})", source);
  println!("=================");
  println!();

  println!("Changed files: {}", event.len());
  if !event.is_empty() && event.len() <= 20 {
    for file in event.paths() {
      println!("  {}", file);
    }
  }
  println!();

  println!("Targets: {} ({} gated)", gate.len(), gate.gated().len());
  for target in registry.iter() {
    let marker = if gate.is_gated(target.name()) { "🚀" } else { "⏭ " };
    println!("  {} {:<16} {}", marker, target.name(), target.watched_prefix());
  }
}

/// Display results in JSON format
fn display_json(evaluation: &Evaluation) -> RailResult<()> {
  use serde_json::json;

  let gated = evaluation.gate.gated();
  let output = json!({
      "event_id": evaluation.event.id().short(),
      "source": evaluation.source,
      "changed_files": evaluation.event.paths(),
      "gates": evaluation.gate.iter().collect::<std::collections::BTreeMap<_, _>>(),
      "summary": {
          "changed_files_count": evaluation.event.len(),
          "targets_count": evaluation.gate.len(),
          "gated_count": gated.len()
      }
  });

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

/// Display only gated target names
fn display_names_only(evaluation: &Evaluation) {
  for name in evaluation.gate.gated() {
    println!("{}", name);
  }
}

/// `name=true|false` lines, appended to $GITHUB_OUTPUT when set
fn display_github(evaluation: &Evaluation) -> RailResult<()> {
  let lines = github_output_lines(&evaluation.gate);

  for line in &lines {
    println!("{}", line);
  }

  if let Ok(path) = std::env::var("GITHUB_OUTPUT")
    && !path.is_empty()
  {
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&path)
      .with_context(|| format!("Failed to open GITHUB_OUTPUT file {}", path))?;
    for line in &lines {
      writeln!(file, "{}", line).with_context(|| format!("Failed to write GITHUB_OUTPUT file {}", path))?;
    }
    tracing::info!(path = %path, entries = lines.len(), "wrote gate outputs");
  }

  Ok(())
}

fn github_output_lines(gate: &GateResult) -> Vec<String> {
  gate.iter().map(|(name, open)| format!("{}={}", name, open)).collect()
}
