//! Command publish action
//!
//! Runs a configured program inside the target's build context. Useful for
//! registries or builders the docker action does not cover (buildah, kaniko,
//! a Makefile). The target name and context are exported as
//! `IMAGE_RAIL_TARGET` and `IMAGE_RAIL_CONTEXT`.

use super::process::run_step;
use super::trait_def::{PublishAction, PublishError, PublishRequest, PublishStep, PublishSummary};
use crate::core::config::TargetConfig;
use std::process::Command;

pub const TARGET_ENV: &str = "IMAGE_RAIL_TARGET";
pub const CONTEXT_ENV: &str = "IMAGE_RAIL_CONTEXT";

#[derive(Debug, Clone)]
pub struct CommandPublisher {
  program: String,
  args: Vec<String>,
}

impl CommandPublisher {
  pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }

  /// Config validation guarantees a non-empty `command`
  pub fn from_config(target: &TargetConfig) -> Self {
    let mut parts = target.command.iter().cloned();
    let program = parts.next().unwrap_or_default();
    Self::new(program, parts.collect())
  }

  fn display(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl PublishAction for CommandPublisher {
  fn kind(&self) -> &str {
    "command"
  }

  fn plan(&self, request: &PublishRequest<'_>) -> Vec<String> {
    vec![format!("(cd {}) {}", request.build_context.display(), self.display())]
  }

  fn publish(&self, request: &PublishRequest<'_>) -> Result<PublishSummary, PublishError> {
    let mut cmd = Command::new(&self.program);
    cmd
      .args(&self.args)
      .current_dir(request.build_context)
      .env(TARGET_ENV, request.target_name)
      .env(CONTEXT_ENV, request.build_context);

    run_step(cmd, PublishStep::Run, &self.display(), None)?;
    Ok(PublishSummary::default())
  }
}
