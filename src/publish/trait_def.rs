//! Publish action abstraction
//!
//! Building, tagging and pushing an image is an external capability. The
//! dispatcher only sees the `PublishAction` trait: give it a target name and a
//! build context, get back success or a failure describing the step that broke.
//!
//! Built-in actions:
//! - `docker`: docker login/build/push against the configured registries
//! - `command`: any program run inside the build context

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// What a publish action is asked to do
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
  /// Registered target name
  pub target_name: &'a str,
  /// Directory containing the target's build recipe
  pub build_context: &'a Path,
}

/// Successful publish details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
  /// Image references pushed
  pub images: Vec<String>,
}

/// Pipeline step a publish failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStep {
  /// Process could not be started
  Spawn,
  /// Registry authentication
  Login,
  /// Image build
  Build,
  /// Image push
  Push,
  /// Custom command
  Run,
  /// Action panicked
  Panic,
}

impl fmt::Display for PublishStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      PublishStep::Spawn => "spawn",
      PublishStep::Login => "login",
      PublishStep::Build => "build",
      PublishStep::Push => "push",
      PublishStep::Run => "run",
      PublishStep::Panic => "panic",
    };
    write!(f, "{}", s)
  }
}

/// A failed publish, local to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishError {
  pub step: PublishStep,
  /// Command line that failed (never includes secrets)
  pub command: String,
  /// Exit status and stderr tail, or the spawn error
  pub message: String,
}

impl PublishError {
  pub fn new(step: PublishStep, command: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      step,
      command: command.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} step failed", self.step)?;
    if !self.command.is_empty() {
      write!(f, " ({})", self.command)?;
    }
    write!(f, ": {}", self.message)
  }
}

impl std::error::Error for PublishError {}

/// Build-and-publish capability for one target
///
/// Implementations must be safe to call from several threads at once: the
/// dispatcher may run different targets in parallel.
pub trait PublishAction: Send + Sync {
  /// Short backend name (e.g. "docker")
  fn kind(&self) -> &str;

  /// Human-readable steps this action would run, for dry runs
  fn plan(&self, request: &PublishRequest<'_>) -> Vec<String>;

  /// Build and publish. Steps run sequentially; the first failing step ends the run.
  fn publish(&self, request: &PublishRequest<'_>) -> Result<PublishSummary, PublishError>;
}
