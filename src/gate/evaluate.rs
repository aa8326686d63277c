//! Change-set evaluation
//!
//! Given a change event and the target registry, decide for every target
//! whether its watched prefix was touched:
//! - exact match on the prefix, or
//! - a path underneath `prefix/`
//!
//! Plain string prefixes (`rocky9x/...` vs `rocky9`) do not count.

use super::change_event::{ChangeEvent, EventId};
use super::target::TargetRegistry;
use crate::utils::is_under_prefix;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-target gate decisions for one change event.
///
/// Always holds exactly one entry per registered target and is never
/// modified after evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateResult {
  event_id: EventId,
  gates: BTreeMap<String, bool>,
}

impl GateResult {
  /// Same decision for every target (manual trigger or branch restriction)
  pub fn uniform(event: &ChangeEvent, registry: &TargetRegistry, value: bool) -> Self {
    Self {
      event_id: event.id().clone(),
      gates: registry.iter().map(|t| (t.name().to_string(), value)).collect(),
    }
  }

  /// Gate decision for `name`, `None` if the target is not registered
  pub fn get(&self, name: &str) -> Option<bool> {
    self.gates.get(name).copied()
  }

  pub fn is_gated(&self, name: &str) -> bool {
    self.get(name).unwrap_or(false)
  }

  /// Names of targets whose gate is open, sorted
  pub fn gated(&self) -> Vec<&str> {
    self
      .gates
      .iter()
      .filter(|(_, open)| **open)
      .map(|(name, _)| name.as_str())
      .collect()
  }

  /// All entries, sorted by target name
  pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
    self.gates.iter().map(|(name, open)| (name.as_str(), *open))
  }

  pub fn len(&self) -> usize {
    self.gates.len()
  }

  pub fn event_id(&self) -> &EventId {
    &self.event_id
  }

  /// Whether this result has exactly one entry for each registered target
  pub fn covers(&self, registry: &TargetRegistry) -> bool {
    self.gates.len() == registry.len() && registry.iter().all(|t| self.gates.contains_key(t.name()))
  }
}

/// Evaluate which targets a change event touches.
///
/// Pure: the same event and registry always give the same result. Every
/// target is evaluated before the result is returned.
pub fn evaluate(event: &ChangeEvent, registry: &TargetRegistry) -> GateResult {
  let gates = registry
    .iter()
    .map(|target| {
      let open = event
        .paths()
        .iter()
        .any(|path| is_under_prefix(path, target.watched_prefix()));
      (target.name().to_string(), open)
    })
    .collect();

  let result = GateResult {
    event_id: event.id().clone(),
    gates,
  };

  tracing::debug!(
    event = %result.event_id,
    changed = event.len(),
    gated = ?result.gated(),
    "evaluated change set"
  );

  result
}
