//! Dispatch of publish actions for gated targets
//!
//! Every gated target runs its publish action exactly once. Targets are
//! independent: a failure (or panic) in one never stops another. Gated targets
//! run on a dedicated rayon pool; `jobs = 1` gives sequential execution.
//!
//! The report always has one outcome per registered target.

use super::trait_def::{PublishError, PublishRequest, PublishStep};
use crate::core::error::{RailError, RailResult};
use crate::gate::change_event::EventId;
use crate::gate::{BuildTarget, GateResult, TargetRegistry};
use crate::ui::progress::DispatchProgress;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

/// What happened to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TargetOutcome {
  /// Gate closed, nothing ran
  Skipped,
  /// Dry run: steps that would have run
  Planned { steps: Vec<String> },
  Succeeded {
    images: Vec<String>,
    started_at: DateTime<Utc>,
    duration_ms: u64,
  },
  Failed {
    error: PublishError,
    started_at: DateTime<Utc>,
    duration_ms: u64,
  },
}

impl TargetOutcome {
  pub fn label(&self) -> &'static str {
    match self {
      TargetOutcome::Skipped => "skipped",
      TargetOutcome::Planned { .. } => "planned",
      TargetOutcome::Succeeded { .. } => "succeeded",
      TargetOutcome::Failed { .. } => "failed",
    }
  }

  pub fn is_failure(&self) -> bool {
    matches!(self, TargetOutcome::Failed { .. })
  }
}

/// Per-target results of one dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
  pub event_id: EventId,
  pub outcomes: BTreeMap<String, TargetOutcome>,
}

impl DispatchReport {
  /// Names of targets whose publish action failed, sorted
  pub fn failed(&self) -> Vec<String> {
    self
      .outcomes
      .iter()
      .filter(|(_, o)| o.is_failure())
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Count of outcomes with the given label
  pub fn count(&self, label: &str) -> usize {
    self.outcomes.values().filter(|o| o.label() == label).count()
  }

  /// True only if no gated target failed
  pub fn is_success(&self) -> bool {
    self.outcomes.values().all(|o| !o.is_failure())
  }

  /// Turn failures into `RailError::Publish`, listing every failed target
  pub fn into_result(self) -> RailResult<Self> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(RailError::Publish { failed: self.failed() })
    }
  }
}

/// Dispatch settings
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
  /// Worker threads (default: one per gated target)
  pub jobs: Option<usize>,
  /// Plan only, invoke nothing
  pub dry_run: bool,
  /// Draw a progress bar on a terminal
  pub progress: bool,
}

/// Invoke the publish action of every gated target.
///
/// The gate result must cover exactly the registry's targets.
pub fn dispatch(gate: &GateResult, registry: &TargetRegistry, options: &DispatchOptions) -> RailResult<DispatchReport> {
  if !gate.covers(registry) {
    return Err(RailError::message(
      "Gate result does not match the target registry; evaluate again before dispatching",
    ));
  }

  let mut outcomes: BTreeMap<String, TargetOutcome> = BTreeMap::new();
  let mut gated: Vec<&BuildTarget> = Vec::new();

  for target in registry.iter() {
    if gate.is_gated(target.name()) {
      gated.push(target);
    } else {
      outcomes.insert(target.name().to_string(), TargetOutcome::Skipped);
    }
  }

  if options.dry_run {
    for target in gated {
      let steps = target.action().plan(&request_for(target));
      outcomes.insert(target.name().to_string(), TargetOutcome::Planned { steps });
    }
    return Ok(DispatchReport {
      event_id: gate.event_id().clone(),
      outcomes,
    });
  }

  if !gated.is_empty() {
    let threads = options.jobs.unwrap_or(gated.len()).clamp(1, gated.len());
    tracing::info!(targets = gated.len(), threads, "dispatching publish actions");

    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(|i| format!("image-rail-dispatch-{}", i))
      .build()?;
    let progress = DispatchProgress::new(gated.len(), "Publishing images", options.progress);

    let finished: Vec<(String, TargetOutcome)> = pool.install(|| {
      gated
        .par_iter()
        .map(|target| {
          let outcome = run_target(target);
          progress.inc();
          (target.name().to_string(), outcome)
        })
        .collect()
    });

    outcomes.extend(finished);
  }

  Ok(DispatchReport {
    event_id: gate.event_id().clone(),
    outcomes,
  })
}

fn request_for(target: &BuildTarget) -> PublishRequest<'_> {
  PublishRequest {
    target_name: target.name(),
    build_context: target.build_context(),
  }
}

/// Run one target's action, containing failures and panics
fn run_target(target: &BuildTarget) -> TargetOutcome {
  let started_at = Utc::now();
  let clock = Instant::now();
  let request = request_for(target);

  let result = catch_unwind(AssertUnwindSafe(|| target.action().publish(&request))).unwrap_or_else(|panic| {
    let message = panic
      .downcast_ref::<&str>()
      .map(|s| s.to_string())
      .or_else(|| panic.downcast_ref::<String>().cloned())
      .unwrap_or_else(|| "publish action panicked".to_string());
    Err(PublishError::new(PublishStep::Panic, "", message))
  });

  let duration_ms = clock.elapsed().as_millis() as u64;

  match result {
    Ok(summary) => {
      tracing::info!(target_name = target.name(), duration_ms, "publish succeeded");
      TargetOutcome::Succeeded {
        images: summary.images,
        started_at,
        duration_ms,
      }
    }
    Err(error) => {
      tracing::error!(target_name = target.name(), duration_ms, %error, "publish failed");
      TargetOutcome::Failed {
        error,
        started_at,
        duration_ms,
      }
    }
  }
}
