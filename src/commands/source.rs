//! Change source selection shared by `evaluate` and `publish`
//!
//! A change event comes from exactly one of:
//! - `--files <path>...` (explicit list, no git)
//! - `--stdin` (newline-separated paths)
//! - `--from <a> --to <b>` (SHA pair mode)
//! - `--since <ref>` compared against HEAD
//!
//! With none of these, a GitHub push event (`$GITHUB_EVENT_PATH`) supplies the
//! pushed `before..after` range; outside Actions the range is
//! `origin/main..HEAD`. When the base ref already points at HEAD (a push to
//! `main` checked out in CI) the last commit is used instead, so a relevant
//! change is never an empty event.

use crate::core::error::{RailResult, ResultExt};
use crate::core::vcs::SystemGit;
use crate::gate::ChangeEvent;
use clap::Args;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_SINCE: &str = "origin/main";

/// Env var GitHub Actions points at the triggering event payload
pub const GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";

/// git's well-known empty tree, the base for a repository's first commit
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

#[derive(Args, Debug, Clone, Default)]
pub struct ChangeArgs {
  /// Git ref to compare HEAD against (default: the push range, else origin/main)
  #[arg(long, conflicts_with_all = ["from", "files", "stdin"])]
  pub since: Option<String>,
  /// Start ref (for SHA pair mode)
  #[arg(long, requires = "to", conflicts_with_all = ["files", "stdin"])]
  pub from: Option<String>,
  /// End ref (for SHA pair mode)
  #[arg(long, requires = "from")]
  pub to: Option<String>,
  /// Changed paths given explicitly (repository-relative)
  #[arg(long, num_args = 1.., conflicts_with = "stdin")]
  pub files: Vec<String>,
  /// Read changed paths from stdin, one per line
  #[arg(long)]
  pub stdin: bool,
  /// Gate every target regardless of changes (manual rebuild)
  #[arg(long)]
  pub all: bool,
  /// Only consider these targets (repeatable)
  #[arg(long = "target", value_name = "NAME")]
  pub targets: Vec<String>,
}

/// A change event and a short description of where it came from
#[derive(Debug, Clone)]
pub struct ResolvedChanges {
  pub event: ChangeEvent,
  pub source: String,
}

impl ResolvedChanges {
  fn new(event: ChangeEvent, source: impl Into<String>) -> Self {
    Self {
      event,
      source: source.into(),
    }
  }
}

impl ChangeArgs {
  /// Build the change event. `--all` needs no changes and never touches git.
  pub fn resolve(&self, root: &Path) -> RailResult<ResolvedChanges> {
    if self.all {
      return Ok(ResolvedChanges::new(ChangeEvent::empty(), "all targets (manual)"));
    }

    if !self.files.is_empty() {
      return Ok(ResolvedChanges::new(ChangeEvent::from_paths(&self.files)?, "--files"));
    }

    if self.stdin {
      let mut input = String::new();
      std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read changed paths from stdin")?;
      return Ok(ResolvedChanges::new(ChangeEvent::from_lines(&input)?, "stdin"));
    }

    if let (Some(from), Some(to)) = (self.from.as_deref(), self.to.as_deref()) {
      let event = ChangeEvent::from_git(root, from, to)?;
      return Ok(ResolvedChanges::new(event, format!("{}..{}", from, to)));
    }

    let git = SystemGit::open(root)?;

    if self.since.is_none()
      && let Some(push) = PushEvent::from_env()
      && let Some((before, after)) = push.range()
    {
      if git.resolve_commit(before)?.is_some() {
        let event = ChangeEvent::from_git(root, before, after)?;
        return Ok(ResolvedChanges::new(
          event,
          format!("push {}..{}", short_sha(before), short_sha(after)),
        ));
      }
      tracing::warn!(
        before,
        "push base commit is not in this checkout (shallow clone?); falling back to {}",
        DEFAULT_SINCE
      );
    }

    let since = self.since.as_deref().unwrap_or(DEFAULT_SINCE);
    let head = git.head_commit()?;

    if git.resolve_commit(since)?.as_deref() == Some(head.as_str()) {
      let parent = git.resolve_commit("HEAD^")?.unwrap_or_else(|| EMPTY_TREE.to_string());
      tracing::info!(since, "base ref already points at HEAD; using the last commit");
      let event = ChangeEvent::from_git(root, &parent, &head)?;
      return Ok(ResolvedChanges::new(event, format!("HEAD^..HEAD ({} is HEAD)", since)));
    }

    let event = ChangeEvent::from_git(root, since, "HEAD")?;
    Ok(ResolvedChanges::new(event, format!("{}..HEAD", since)))
  }
}

/// The fields of a GitHub push payload that name the pushed range
#[derive(Debug, Default, Deserialize)]
struct PushEvent {
  #[serde(default)]
  before: Option<String>,
  #[serde(default)]
  after: Option<String>,
}

impl PushEvent {
  /// Payload at `$GITHUB_EVENT_PATH`, if set and readable
  fn from_env() -> Option<Self> {
    let path = std::env::var(GITHUB_EVENT_PATH).ok().filter(|p| !p.is_empty())?;

    let text = match std::fs::read_to_string(&path) {
      Ok(text) => text,
      Err(e) => {
        tracing::warn!(path = %path, error = %e, "could not read GitHub event payload");
        return None;
      }
    };

    match serde_json::from_str(&text) {
      Ok(event) => Some(event),
      Err(e) => {
        tracing::warn!(path = %path, error = %e, "could not parse GitHub event payload");
        None
      }
    }
  }

  /// `(before, after)`, unless the payload is not a push or creates the branch
  fn range(&self) -> Option<(&str, &str)> {
    let before = self.before.as_deref().filter(|s| !s.is_empty())?;
    let after = self.after.as_deref().filter(|s| !s.is_empty())?;

    // A new branch reports an all-zero `before`
    if before.bytes().all(|b| b == b'0') {
      return None;
    }

    Some((before, after))
  }
}

fn short_sha(sha: &str) -> &str {
  sha.get(..7).unwrap_or(sha)
}
