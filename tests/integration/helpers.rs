//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Config with the two build images, published by shell commands that drop a
/// marker file into the build context so tests can see what ran.
pub const CBDB_CONFIG: &str = r#"[trigger]
branches = ["main"]

[[targets]]
name = "rocky9"
path = "docker/cbdb/build/rocky9"
publisher = "command"
command = ["sh", "-c", "touch published-$IMAGE_RAIL_TARGET"]

[[targets]]
name = "ubuntu24"
path = "docker/cbdb/build/ubuntu24"
publisher = "command"
command = ["sh", "-c", "touch published-$IMAGE_RAIL_TARGET"]
"#;

/// A test repository with git history
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create a repo with a config file, the two build directories and one commit
  pub fn new(config: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    let repo = Self { _root: root, path };
    repo.write("image-rail.toml", config)?;
    repo.write("README.md", "# build images\n")?;
    repo.write("docker/cbdb/build/rocky9/Dockerfile", "FROM rockylinux/rockylinux:9\n")?;
    repo.write("docker/cbdb/build/ubuntu24/Dockerfile", "FROM ubuntu:24.04\n")?;
    repo.commit("Initial build images")?;

    Ok(repo)
  }

  /// Write a file (creating parent directories)
  pub fn write(&self, rel: &str, content: &str) -> Result<()> {
    let file = self.path.join(rel);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file, content)?;
    Ok(())
  }

  /// Commit current changes, returning the SHA
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "-A"])?;
    git(&self.path, &["commit", "-m", message])?;
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// SHA of HEAD
  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Point `origin/main` at HEAD, as a CI checkout of a push to main does
  pub fn set_origin_main_to_head(&self) -> Result<()> {
    git(&self.path, &["update-ref", "refs/remotes/origin/main", "HEAD"])?;
    Ok(())
  }

  /// Check if a file exists
  pub fn file_exists(&self, rel: &str) -> bool {
    self.path.join(rel).exists()
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run image-rail with extra environment, returning the output whatever the
/// exit status. CI variables from the outer environment are cleared first.
pub fn run_image_rail_with_env(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_image-rail");

  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("GITHUB_REF_NAME")
    .env_remove("GITHUB_OUTPUT")
    .env_remove("GITHUB_EVENT_PATH")
    .env_remove("RUST_LOG")
    .envs(envs.iter().copied())
    .output()
    .context("Failed to run image-rail")
}

/// Run image-rail, returning the output whatever the exit status
pub fn run_image_rail_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  run_image_rail_with_env(cwd, args, &[])
}

/// Run image-rail and require success
pub fn run_image_rail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_image_rail_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "image-rail command failed: image-rail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
