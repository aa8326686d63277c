//! System git backend
//!
//! Uses git plumbing commands for the few things image-rail needs:
//! - Changed paths between two refs (the change event)
//! - Ref resolution (default change range)
//! - Current branch (trigger restriction)
//! - Safe subprocess execution (isolated environment)

use crate::core::error::{GitError, RailError, RailResult, ResultExt, ValidationError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> RailResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RailError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RailError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Working tree root reported by git
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> RailResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "HEAD"])
      .output()
      .context("Failed to get HEAD commit")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RailError::Git(GitError::CommandFailed {
        command: "git rev-parse HEAD".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Commit SHA a ref points at, `None` when it does not resolve
  pub fn resolve_commit(&self, reference: &str) -> RailResult<Option<String>> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet"])
      .arg(format!("{}^{{commit}}", reference))
      .output()
      .context("Failed to run git rev-parse")?;

    if !output.status.success() {
      return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  /// Get current branch name
  pub fn current_branch(&self) -> RailResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Paths changed between two refs, in git's output order.
  ///
  /// Renames are split into a deletion and an addition so both the old and the
  /// new location count as changed. Paths are repository-relative.
  pub fn changed_files_between(&self, from: &str, to: &str) -> RailResult<Vec<String>> {
    let output = self
      .git_cmd()
      .args(["diff", "--name-only", "--no-renames", "-z", from, to, "--"])
      .output()
      .context("Failed to run git diff")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RailError::Git(GitError::CommandFailed {
        command: format!("git diff --name-only {} {}", from, to),
        stderr: stderr.to_string(),
      }));
    }

    parse_name_only_z(&output.stdout)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("diff.renames=false");

    cmd
  }
}

/// Split `git diff --name-only -z` output into paths.
///
/// A path that is not valid UTF-8 makes the change set malformed.
fn parse_name_only_z(stdout: &[u8]) -> RailResult<Vec<String>> {
  stdout
    .split(|b| *b == 0)
    .filter(|raw| !raw.is_empty())
    .map(|raw| {
      String::from_utf8(raw.to_vec()).map_err(|_| {
        RailError::Validation(ValidationError::MalformedPath {
          path: String::from_utf8_lossy(raw).into_owned(),
          reason: "path is not valid UTF-8".to_string(),
        })
      })
    })
    .collect()
}
