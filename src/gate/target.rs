//! Build targets and the static target registry

use crate::core::config::RailConfig;
use crate::core::error::{ConfigError, RailError, RailResult};
use crate::publish::{self, PublishAction};
use crate::utils::normalize_repo_path;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A named, independently published unit with a watched path prefix.
#[derive(Clone)]
pub struct BuildTarget {
  name: String,
  watched_prefix: String,
  build_context: PathBuf,
  action: Arc<dyn PublishAction>,
}

impl BuildTarget {
  /// Create a target. The prefix is normalized; the build context is
  /// `root/prefix`.
  pub fn new(
    name: impl Into<String>,
    watched_prefix: &str,
    root: &Path,
    action: Arc<dyn PublishAction>,
  ) -> RailResult<Self> {
    let name = name.into();
    let watched_prefix = normalize_repo_path(watched_prefix).map_err(|_| {
      RailError::Config(ConfigError::InvalidPrefix {
        target: name.clone(),
        prefix: watched_prefix.to_string(),
      })
    })?;
    let build_context = root.join(&watched_prefix);

    Ok(Self {
      name,
      watched_prefix,
      build_context,
      action,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn watched_prefix(&self) -> &str {
    &self.watched_prefix
  }

  /// Directory holding the target's build recipe
  pub fn build_context(&self) -> &Path {
    &self.build_context
  }

  pub fn action(&self) -> &dyn PublishAction {
    self.action.as_ref()
  }
}

impl fmt::Debug for BuildTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildTarget")
      .field("name", &self.name)
      .field("watched_prefix", &self.watched_prefix)
      .field("publisher", &self.action.kind())
      .finish()
  }
}

/// Registered targets, in configuration order.
///
/// # Invariants
///
/// 1. At least one target
/// 2. Target names are unique
#[derive(Debug, Clone)]
pub struct TargetRegistry {
  targets: Vec<BuildTarget>,
}

impl TargetRegistry {
  /// Build a registry, rejecting empty and duplicate-named target sets
  pub fn new(targets: Vec<BuildTarget>) -> RailResult<Self> {
    if targets.is_empty() {
      return Err(RailError::Config(ConfigError::EmptyRegistry));
    }

    let mut seen = HashSet::new();
    for target in &targets {
      if !seen.insert(target.name()) {
        return Err(RailError::Config(ConfigError::DuplicateTarget {
          name: target.name().to_string(),
        }));
      }
    }

    Ok(Self { targets })
  }

  /// Build the registry from a validated configuration
  pub fn from_config(config: &RailConfig, root: &Path) -> RailResult<Self> {
    let targets = config
      .targets
      .iter()
      .map(|t| {
        let action = publish::action_for(t, &config.publish);
        BuildTarget::new(t.name.clone(), &t.path, root, action)
      })
      .collect::<RailResult<Vec<_>>>()?;

    Self::new(targets)
  }

  /// Restrict the registry to the named targets (order follows the registry).
  ///
  /// An empty selection keeps every target. Unknown names are a config error.
  pub fn select(&self, names: &[String]) -> RailResult<Self> {
    if names.is_empty() {
      return Ok(self.clone());
    }

    for name in names {
      if self.get(name).is_none() {
        return Err(RailError::Config(ConfigError::TargetNotFound { name: name.clone() }));
      }
    }

    let targets = self
      .targets
      .iter()
      .filter(|t| names.iter().any(|n| n == t.name()))
      .cloned()
      .collect();

    Self::new(targets)
  }

  pub fn get(&self, name: &str) -> Option<&BuildTarget> {
    self.targets.iter().find(|t| t.name() == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &BuildTarget> {
    self.targets.iter()
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }
}
