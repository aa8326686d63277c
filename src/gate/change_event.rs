//! Change events: the paths modified by one push
//!
//! A `ChangeEvent` is validated once at construction. Every path is normalized
//! to repository-relative, forward-slash form; a single malformed path rejects
//! the whole event so evaluation never sees partial input.

use crate::core::error::{RailResult, ValidationError};
use crate::core::vcs::SystemGit;
use crate::utils::normalize_repo_path;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Event identifier (SHA256 over the normalized path list)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
  fn from_paths(paths: &[String]) -> Self {
    let mut hasher = Sha256::new();
    for path in paths {
      hasher.update(path.as_bytes());
      hasher.update([0u8]);
    }
    Self(format!("{:x}", hasher.finalize()))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// Ordered, immutable list of changed paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
  paths: Vec<String>,
  id: EventId,
}

impl ChangeEvent {
  /// Build an event from raw paths, normalizing each one.
  pub fn from_paths<I, S>(paths: I) -> RailResult<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let normalized = paths
      .into_iter()
      .map(|raw| {
        let raw = raw.as_ref();
        normalize_repo_path(raw).map_err(|reason| ValidationError::MalformedPath {
          path: raw.to_string(),
          reason,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    let id = EventId::from_paths(&normalized);
    Ok(Self { paths: normalized, id })
  }

  /// An event with no changed paths
  pub fn empty() -> Self {
    Self {
      id: EventId::from_paths(&[]),
      paths: Vec::new(),
    }
  }

  /// Parse newline-separated paths (blank lines ignored), e.g. from stdin
  pub fn from_lines(text: &str) -> RailResult<Self> {
    Self::from_paths(text.lines().filter(|l| !l.trim().is_empty()))
  }

  /// Paths changed between two refs of the repository at `root`
  pub fn from_git(root: &Path, from: &str, to: &str) -> RailResult<Self> {
    let git = SystemGit::open(root)?;
    let files = git.changed_files_between(from, to)?;
    tracing::debug!(from, to, count = files.len(), "collected changed files from git");
    Self::from_paths(files)
  }

  pub fn paths(&self) -> &[String] {
    &self.paths
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn id(&self) -> &EventId {
    &self.id
  }
}
