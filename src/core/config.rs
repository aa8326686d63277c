use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use crate::utils::normalize_repo_path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for image-rail
/// Searched in order: image-rail.toml, .image-rail.toml, .github/image-rail.toml, .config/image-rail.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailConfig {
  #[serde(default)]
  pub trigger: TriggerConfig,
  #[serde(default)]
  pub publish: PublishConfig,
  #[serde(default)]
  pub targets: Vec<TargetConfig>,
}

/// Which pushes are allowed to publish
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerConfig {
  /// Branches whose pushes may publish (empty = any branch)
  #[serde(default)]
  pub branches: Vec<String>,
}

impl TriggerConfig {
  /// Whether a push on `branch` is allowed to publish
  pub fn allows_branch(&self, branch: &str) -> bool {
    self.branches.is_empty() || self.branches.iter().any(|b| b == branch)
  }
}

/// Settings shared by every docker-published target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
  /// Docker CLI binary (default: "docker")
  #[serde(default = "default_docker")]
  pub docker: String,

  /// Registries images are pushed to (empty = image name as written)
  #[serde(default)]
  pub registries: Vec<RegistryConfig>,
}

fn default_docker() -> String {
  "docker".to_string()
}

impl Default for PublishConfig {
  fn default() -> Self {
    Self {
      docker: default_docker(),
      registries: Vec::new(),
    }
  }
}

/// A registry to push to, with optional credentials taken from the environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
  /// Registry host (e.g. "docker.io", "ghcr.io")
  pub name: String,

  /// Environment variable holding the login user
  #[serde(default)]
  pub username_env: Option<String>,

  /// Environment variable holding the login password or token
  #[serde(default)]
  pub password_env: Option<String>,
}

/// How a target gets built and published
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
  /// docker build + tag + push
  #[default]
  Docker,
  /// Arbitrary command run inside the build context
  Command,
}

/// A build target: a watched directory and the image built from it
///
/// # Example
///
/// ```toml
/// [[targets]]
/// name = "rocky9"
/// path = "docker/cbdb/build/rocky9"
/// image = "apache/incubator-cloudberry"
/// tags = ["cbdb-build-rocky9-latest"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
  /// Unique target name
  pub name: String,

  /// Watched path prefix, also the docker build context (relative to repo root)
  pub path: String,

  #[serde(default)]
  pub publisher: PublisherKind,

  /// Image repository (docker publisher)
  #[serde(default)]
  pub image: Option<String>,

  /// Tags pushed for the image (docker publisher)
  #[serde(default)]
  pub tags: Vec<String>,

  /// Dockerfile relative to `path` (default: "Dockerfile")
  #[serde(default)]
  pub dockerfile: Option<String>,

  /// Target platforms passed to `docker build --platform`
  #[serde(default)]
  pub platforms: Vec<String>,

  #[serde(default)]
  pub build_args: BTreeMap<String, String>,

  /// Subset of `[[publish.registries]]` names (default: all of them)
  #[serde(default)]
  pub registries: Option<Vec<String>>,

  /// Program and arguments (command publisher)
  #[serde(default)]
  pub command: Vec<String>,
}

impl TargetConfig {
  /// Dockerfile name, relative to the build context
  pub fn dockerfile(&self) -> &str {
    self.dockerfile.as_deref().unwrap_or("Dockerfile")
  }

  /// Validate the target configuration
  pub fn validate(&self, publish: &PublishConfig) -> RailResult<()> {
    if self.name.trim().is_empty() {
      return Err(RailError::Config(ConfigError::MissingField {
        field: format!("name for target with path '{}'", self.path),
      }));
    }

    if normalize_repo_path(&self.path).is_err() {
      return Err(RailError::Config(ConfigError::InvalidPrefix {
        target: self.name.clone(),
        prefix: self.path.clone(),
      }));
    }

    match self.publisher {
      PublisherKind::Docker => {
        if self.image.as_deref().is_none_or(|i| i.trim().is_empty()) {
          return Err(RailError::Config(ConfigError::MissingField {
            field: format!("image for target '{}'", self.name),
          }));
        }
        if self.tags.is_empty() {
          return Err(RailError::with_help(
            format!("Target '{}' has no tags to push", self.name),
            "Add `tags = [\"latest\"]` (or similar) to the target",
          ));
        }
      }
      PublisherKind::Command => {
        if self.command.is_empty() {
          return Err(RailError::Config(ConfigError::MissingField {
            field: format!("command for target '{}'", self.name),
          }));
        }
      }
    }

    if let Some(ref wanted) = self.registries {
      for registry in wanted {
        if !publish.registries.iter().any(|r| &r.name == registry) {
          return Err(RailError::with_help(
            format!("Target '{}' references unknown registry '{}'", self.name, registry),
            "Declare it under [[publish.registries]]",
          ));
        }
      }
    }

    Ok(())
  }

  /// Registries this target pushes to
  pub fn registries<'a>(&self, publish: &'a PublishConfig) -> Vec<&'a RegistryConfig> {
    match self.registries {
      Some(ref wanted) => publish
        .registries
        .iter()
        .filter(|r| wanted.iter().any(|w| w == &r.name))
        .collect(),
      None => publish.registries.iter().collect(),
    }
  }
}

impl RailConfig {
  /// Find config file in search order
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("image-rail.toml"),
      path.join(".image-rail.toml"),
      path.join(".github").join("image-rail.toml"),
      path.join(".config").join("image-rail.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from `explicit` or the first file found under `root`
  pub fn load(root: &Path, explicit: Option<&Path>) -> RailResult<Self> {
    let config_path = match explicit {
      Some(p) => p.to_path_buf(),
      None => Self::find_config_path(root).ok_or_else(|| {
        RailError::Config(ConfigError::NotFound {
          root: root.to_path_buf(),
        })
      })?,
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).map_err(|e| match e {
      RailError::Config(_) => e,
      other => other.context(format!("Invalid configuration in {}", config_path.display())),
    })?;

    tracing::debug!(path = %config_path.display(), targets = config.targets.len(), "loaded configuration");
    Ok(config)
  }

  /// Parse and validate config text
  pub fn parse(content: &str) -> RailResult<Self> {
    let config: RailConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Validate the whole configuration. Registry invariants are fatal here,
  /// before any change event is looked at.
  pub fn validate(&self) -> RailResult<()> {
    if self.targets.is_empty() {
      return Err(RailError::Config(ConfigError::EmptyRegistry));
    }

    let mut seen = HashSet::new();
    for target in &self.targets {
      if !seen.insert(target.name.as_str()) {
        return Err(RailError::Config(ConfigError::DuplicateTarget {
          name: target.name.clone(),
        }));
      }
      target.validate(&self.publish)?;
    }

    let mut registries = HashSet::new();
    for registry in &self.publish.registries {
      if !registries.insert(registry.name.as_str()) {
        return Err(RailError::Config(ConfigError::DuplicateRegistry {
          name: registry.name.clone(),
        }));
      }
    }

    Ok(())
  }
}
