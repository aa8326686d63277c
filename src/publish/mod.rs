//! Image publishing
//!
//! - **trait_def**: the `PublishAction` capability and its request/result types
//! - **docker**: docker login/build/push backend
//! - **command**: arbitrary command backend
//! - **dispatch**: runs actions for gated targets with failure isolation

mod command;
mod docker;
pub mod dispatch;
mod process;
mod trait_def;

pub use dispatch::{DispatchOptions, DispatchReport, TargetOutcome, dispatch};
pub use trait_def::{PublishAction, PublishRequest};
#[cfg(test)]
pub use trait_def::{PublishError, PublishSummary};

use crate::core::config::{PublishConfig, PublisherKind, TargetConfig};
use std::sync::Arc;

/// Build the publish action configured for a target
pub fn action_for(target: &TargetConfig, publish: &PublishConfig) -> Arc<dyn PublishAction> {
  match target.publisher {
    PublisherKind::Docker => Arc::new(docker::DockerPublisher::from_config(target, publish)),
    PublisherKind::Command => Arc::new(command::CommandPublisher::from_config(target)),
  }
}
