//! Unified repository context - build once, pass everywhere
//!
//! # Design
//!
//! RepoContext loads and validates image-rail.toml and builds the target
//! registry once in main.rs, then passes it by reference to every command.
//! Configuration errors (empty registry, duplicate names, bad prefixes) are
//! therefore fatal before any change event is looked at.
//!
//! ```text
//! main.rs:
//!   RepoContext::build() -> &RepoContext
//!   |
//!   v
//! commands/evaluate.rs, publish.rs, targets.rs:
//!   fn run_*(ctx: &RepoContext, ...)
//! ```

use crate::core::config::RailConfig;
use crate::core::error::RailResult;
use crate::gate::TargetRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Repository-level data shared by all commands
#[derive(Clone)]
pub struct RepoContext {
  /// Repository root directory
  pub root: PathBuf,

  /// Parsed image-rail.toml
  pub config: Arc<RailConfig>,

  /// Registered build targets (validated)
  pub registry: TargetRegistry,
}

impl RepoContext {
  /// Load configuration and build the target registry.
  pub fn build(root: &Path, config_path: Option<&Path>) -> RailResult<Self> {
    let root = root.to_path_buf();
    let config = RailConfig::load(&root, config_path)?;
    let registry = TargetRegistry::from_config(&config, &root)?;

    tracing::debug!(root = %root.display(), targets = registry.len(), "repository context ready");

    Ok(Self {
      root,
      config: Arc::new(config),
      registry,
    })
  }

  /// Get repository root as Path reference (convenience)
  pub fn root(&self) -> &Path {
    &self.root
  }
}
