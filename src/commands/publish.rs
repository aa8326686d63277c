//! `image-rail publish` - Build and push images for gated targets
//!
//! This command:
//! 1. Checks the trigger branch against `[trigger] branches`
//! 2. Evaluates the change set against the target registry
//! 3. Dispatches the publish action of every gated target, in parallel
//! 4. Reports one outcome per target: skipped, succeeded, or failed
//!
//! Supports:
//! - `--dry-run` to show the plan without executing
//! - `--jobs N` to bound parallelism (`--jobs 1` runs sequentially)
//! - `--all` to rebuild every target (manual trigger)

use super::evaluate::{Evaluation, compute};
use super::source::ChangeArgs;
use crate::core::context::RepoContext;
use crate::core::error::RailResult;
use crate::core::vcs::SystemGit;
use crate::gate::GateResult;
use crate::publish::{DispatchOptions, DispatchReport, TargetOutcome, dispatch};
use serde_json::json;

/// Env var GitHub Actions sets to the pushed branch
const GITHUB_REF_NAME: &str = "GITHUB_REF_NAME";

/// Run the publish command
pub fn run_publish(
  ctx: &RepoContext,
  args: ChangeArgs,
  branch: Option<String>,
  jobs: Option<usize>,
  dry_run: bool,
  json: bool,
) -> RailResult<()> {
  let branch = resolve_branch(ctx, branch);

  if let Some(ref b) = branch
    && !ctx.config.trigger.allows_branch(b)
  {
    tracing::info!(branch = %b, allowed = ?ctx.config.trigger.branches, "branch not allowed to publish");
    let registry = ctx.registry.select(&args.targets)?;
    let event = crate::gate::ChangeEvent::empty();
    let gate = GateResult::uniform(&event, &registry, false);
    let report = dispatch(&gate, &registry, &DispatchOptions::default())?;

    if json {
      display_json(ctx, &report, branch.as_deref(), 0, dry_run)?;
    } else {
      println!(
        "⏭  Branch '{}' is not in [trigger] branches ({}); nothing to publish",
        b,
        ctx.config.trigger.branches.join(", ")
      );
      display_report(&report);
    }
    return Ok(());
  }

  let Evaluation {
    registry,
    event,
    source,
    gate,
  } = compute(ctx, &args)?;

  let options = DispatchOptions {
    jobs,
    dry_run,
    progress: !json,
  };

  if !json {
    display_plan(&gate, &source, event.len(), dry_run);
  }

  let report = dispatch(&gate, &registry, &options)?;

  if json {
    display_json(ctx, &report, branch.as_deref(), event.len(), dry_run)?;
  } else {
    display_report(&report);
  }

  report.into_result().map(|_| ())
}

/// Branch used for the trigger restriction.
///
/// `--branch`, then $GITHUB_REF_NAME, then the checked-out branch. Only
/// resolved when a restriction is configured.
fn resolve_branch(ctx: &RepoContext, explicit: Option<String>) -> Option<String> {
  if explicit.is_some() {
    return explicit;
  }

  if ctx.config.trigger.branches.is_empty() {
    return None;
  }

  if let Ok(name) = std::env::var(GITHUB_REF_NAME)
    && !name.is_empty()
  {
    return Some(name);
  }

  match SystemGit::open(ctx.root()).and_then(|git| git.current_branch()) {
    Ok(name) => Some(name),
    Err(e) => {
      tracing::warn!(error = %e, "could not determine current branch; publishing is not branch-restricted");
      None
    }
  }
}

/// Show what is about to happen
fn display_plan(gate: &GateResult, source: &str, changed: usize, dry_run: bool) {
  println!("📦 Publish Plan ({}, event {})", source, gate.event_id());
  println!("════════════════════════════════════════");
  println!("Changed files: {}", changed);

  let gated = gate.gated();
  if gated.is_empty() {
    println!("No target watches a changed path");
  } else {
    println!("Gated targets: {}", gated.join(", "));
  }

  if dry_run {
    println!("\nDRY RUN: Would execute:");
  }
  println!();
}

/// One line per target, then a summary
fn display_report(report: &DispatchReport) {
  for (name, outcome) in &report.outcomes {
    match outcome {
      TargetOutcome::Skipped => println!("  ⏭  {:<16} skipped", name),
      TargetOutcome::Planned { steps } => {
        println!("  📋 {:<16} planned", name);
        for step in steps {
          println!("       {}", step);
        }
      }
      TargetOutcome::Succeeded { images, duration_ms, .. } => {
        println!(
          "  ✅ {:<16} succeeded ({:.1}s)",
          name,
          *duration_ms as f64 / 1000.0
        );
        for image in images {
          println!("       {}", image);
        }
      }
      TargetOutcome::Failed { error, .. } => {
        println!("  ❌ {:<16} failed", name);
        for line in error.to_string().lines() {
          println!("       {}", line);
        }
      }
    }
  }

  println!();
  println!(
    "Summary: {} succeeded, {} failed, {} skipped",
    report.count("succeeded"),
    report.count("failed"),
    report.count("skipped")
  );
}

/// Display results in JSON format
fn display_json(
  ctx: &RepoContext,
  report: &DispatchReport,
  branch: Option<&str>,
  changed: usize,
  dry_run: bool,
) -> RailResult<()> {
  let commit = SystemGit::open(ctx.root()).and_then(|git| git.head_commit()).ok();

  let output = json!({
      "branch": branch,
      "commit": commit,
      "dry_run": dry_run,
      "changed_files_count": changed,
      "event_id": report.event_id.short(),
      "outcomes": report.outcomes,
      "failed": report.failed(),
      "success": report.is_success(),
  });

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
