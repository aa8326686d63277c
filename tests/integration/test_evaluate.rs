//! Integration tests for `image-rail evaluate`

use crate::helpers::{CBDB_CONFIG, TestRepo, git, run_image_rail, run_image_rail_raw};
use anyhow::Result;

#[test]
fn test_evaluate_single_target_from_git() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  git(&repo.path, &["branch", "origin/main"])?;

  repo.write("docker/cbdb/build/rocky9/Dockerfile", "FROM rockylinux/rockylinux:9.4\n")?;
  repo.commit("Bump rocky base")?;

  let output = run_image_rail(&repo.path, &["evaluate", "--since", "origin/main", "--format", "json"])?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(json["gates"]["rocky9"], true);
  assert_eq!(json["gates"]["ubuntu24"], false);
  assert_eq!(json["summary"]["gated_count"], 1);
  assert_eq!(json["changed_files"][0], "docker/cbdb/build/rocky9/Dockerfile");

  Ok(())
}

#[test]
fn test_evaluate_unrelated_change_gates_nothing() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  let base = git(&repo.path, &["rev-parse", "HEAD"])?;
  let base = String::from_utf8_lossy(&base.stdout).trim().to_string();

  repo.write("README.md", "# updated\n")?;
  let head = repo.commit("Docs")?;

  let output = run_image_rail(&repo.path, &["evaluate", "--from", &base, "--to", &head, "--format", "names"])?;
  assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());

  Ok(())
}

#[test]
fn test_evaluate_prefix_needs_separator() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(
    &repo.path,
    &[
      "evaluate",
      "--files",
      "docker/cbdb/build/rocky9-old/Dockerfile",
      "docker/cbdb/build/ubuntu24",
      "--format",
      "github",
    ],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let lines: Vec<&str> = stdout.lines().collect();

  assert_eq!(lines, vec!["rocky9=false", "ubuntu24=true"]);
  Ok(())
}

#[test]
fn test_evaluate_github_output_file() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  let out_file = repo.path.join("gh-output");

  let bin = env!("CARGO_BIN_EXE_image-rail");
  let status = std::process::Command::new(bin)
    .current_dir(&repo.path)
    .args(["evaluate", "--files", "docker/cbdb/build/rocky9/x", "--format", "github"])
    .env("GITHUB_OUTPUT", &out_file)
    .status()?;
  assert!(status.success());

  let written = std::fs::read_to_string(&out_file)?;
  assert!(written.contains("rocky9=true"));
  assert!(written.contains("ubuntu24=false"));
  Ok(())
}

#[test]
fn test_evaluate_malformed_path_is_validation_error() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail_raw(
    &repo.path,
    &["evaluate", "--files", "docker/cbdb/build/rocky9/x", "../outside"],
  )?;

  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Malformed changed path"));
  Ok(())
}

#[test]
fn test_duplicate_targets_fail_at_startup() -> Result<()> {
  let config = r#"
[[targets]]
name = "rocky9"
path = "docker/cbdb/build/rocky9"
publisher = "command"
command = ["true"]

[[targets]]
name = "rocky9"
path = "docker/cbdb/build/ubuntu24"
publisher = "command"
command = ["true"]
"#;
  let repo = TestRepo::new(config)?;

  let output = run_image_rail_raw(&repo.path, &["evaluate", "--files", "README.md"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("defined more than once"));
  Ok(())
}

#[test]
fn test_evaluate_all_and_target_selection() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(&repo.path, &["evaluate", "--all", "--format", "names"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["rocky9", "ubuntu24"]);

  let output = run_image_rail(
    &repo.path,
    &["evaluate", "--all", "--target", "ubuntu24", "--format", "names"],
  )?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ubuntu24");

  Ok(())
}

#[test]
fn test_evaluate_first_commit_with_origin_at_head() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  repo.set_origin_main_to_head()?;

  let output = run_image_rail(&repo.path, &["evaluate", "--format", "json"])?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  // The only commit adds both build directories
  assert_eq!(json["gates"]["rocky9"], true);
  assert_eq!(json["gates"]["ubuntu24"], true);
  assert!(json["source"].as_str().unwrap_or_default().starts_with("HEAD^..HEAD"));
  Ok(())
}
