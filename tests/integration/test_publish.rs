//! Integration tests for `image-rail publish`
//!
//! Targets use the command publisher with `sh`, so these only run on unix.

#![cfg(unix)]

use crate::helpers::{CBDB_CONFIG, TestRepo, git, run_image_rail, run_image_rail_raw, run_image_rail_with_env};
use anyhow::Result;

const ROCKY_MARKER: &str = "docker/cbdb/build/rocky9/published-rocky9";
const UBUNTU_MARKER: &str = "docker/cbdb/build/ubuntu24/published-ubuntu24";

#[test]
fn test_publish_only_gated_target() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  git(&repo.path, &["branch", "origin/main"])?;

  repo.write("docker/cbdb/build/ubuntu24/Dockerfile", "FROM ubuntu:24.04\nRUN true\n")?;
  repo.commit("Touch ubuntu image")?;

  let output = run_image_rail(&repo.path, &["publish", "--json"])?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(json["branch"], "main");
  assert_eq!(json["success"], true);
  assert_eq!(json["outcomes"]["rocky9"]["status"], "skipped");
  assert_eq!(json["outcomes"]["ubuntu24"]["status"], "succeeded");

  assert!(repo.file_exists(UBUNTU_MARKER));
  assert!(!repo.file_exists(ROCKY_MARKER));
  Ok(())
}

#[test]
fn test_publish_failure_does_not_stop_other_targets() -> Result<()> {
  let config = r#"
[[targets]]
name = "rocky9"
path = "docker/cbdb/build/rocky9"
publisher = "command"
command = ["sh", "-c", "echo 'registry unreachable' >&2; exit 7"]

[[targets]]
name = "ubuntu24"
path = "docker/cbdb/build/ubuntu24"
publisher = "command"
command = ["sh", "-c", "touch published-$IMAGE_RAIL_TARGET"]
"#;
  let repo = TestRepo::new(config)?;

  let output = run_image_rail_raw(
    &repo.path,
    &[
      "publish",
      "--files",
      "docker/cbdb/build/rocky9/Dockerfile",
      "docker/cbdb/build/ubuntu24/Dockerfile",
      "--json",
    ],
  )?;

  assert_eq!(output.status.code(), Some(4));
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(json["success"], false);
  assert_eq!(json["failed"], serde_json::json!(["rocky9"]));
  assert_eq!(json["outcomes"]["rocky9"]["status"], "failed");
  assert_eq!(json["outcomes"]["ubuntu24"]["status"], "succeeded");

  assert!(repo.file_exists(UBUNTU_MARKER));
  assert!(String::from_utf8_lossy(&output.stderr).contains("rocky9"));
  Ok(())
}

#[test]
fn test_publish_dry_run_invokes_nothing() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(
    &repo.path,
    &["publish", "--files", "docker/cbdb/build/rocky9/Dockerfile", "--dry-run", "--json"],
  )?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(json["dry_run"], true);
  assert_eq!(json["outcomes"]["rocky9"]["status"], "planned");
  assert_eq!(json["outcomes"]["ubuntu24"]["status"], "skipped");
  assert!(!repo.file_exists(ROCKY_MARKER));
  Ok(())
}

#[test]
fn test_publish_skipped_on_other_branch() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(
    &repo.path,
    &[
      "publish",
      "--files",
      "docker/cbdb/build/rocky9/Dockerfile",
      "--branch",
      "feature/x",
      "--json",
    ],
  )?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(json["branch"], "feature/x");
  assert_eq!(json["outcomes"]["rocky9"]["status"], "skipped");
  assert_eq!(json["outcomes"]["ubuntu24"]["status"], "skipped");
  assert!(!repo.file_exists(ROCKY_MARKER));
  Ok(())
}

#[test]
fn test_publish_all_sequentially() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(&repo.path, &["publish", "--all", "--jobs", "1"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("2 succeeded, 0 failed, 0 skipped"));
  assert!(repo.file_exists(ROCKY_MARKER));
  assert!(repo.file_exists(UBUNTU_MARKER));
  Ok(())
}

#[test]
fn test_publish_nothing_changed_is_success() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(&repo.path, &["publish", "--files", "README.md"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("0 succeeded, 0 failed, 2 skipped"));
  Ok(())
}

#[test]
fn test_publish_push_to_main_with_origin_at_head() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  repo.write("docker/cbdb/build/rocky9/Dockerfile", "FROM rockylinux/rockylinux:9.5\n")?;
  repo.commit("Bump rocky base")?;
  repo.set_origin_main_to_head()?;

  let output = run_image_rail_with_env(&repo.path, &["publish", "--json"], &[("GITHUB_REF_NAME", "main")])?;
  assert_eq!(output.status.code(), Some(0));

  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(json["changed_files_count"], 1);
  assert_eq!(json["outcomes"]["rocky9"]["status"], "succeeded");
  assert_eq!(json["outcomes"]["ubuntu24"]["status"], "skipped");
  assert!(repo.file_exists(ROCKY_MARKER));
  assert!(!repo.file_exists(UBUNTU_MARKER));
  Ok(())
}

#[test]
fn test_publish_uses_github_push_range() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  let before = repo.head()?;

  // Two commits in one push; only the first touches an image
  repo.write("docker/cbdb/build/ubuntu24/Dockerfile", "FROM ubuntu:24.04\nRUN true\n")?;
  repo.commit("Touch ubuntu image")?;
  repo.write("README.md", "# docs\n")?;
  let after = repo.commit("Docs")?;
  repo.set_origin_main_to_head()?;

  let event_file = repo.path.join("push-event.json");
  let payload = serde_json::json!({
    "ref": "refs/heads/main",
    "before": before,
    "after": after,
  });
  std::fs::write(&event_file, payload.to_string())?;
  let event_path = event_file.display().to_string();

  let output = run_image_rail_with_env(
    &repo.path,
    &["publish", "--json"],
    &[("GITHUB_REF_NAME", "main"), ("GITHUB_EVENT_PATH", event_path.as_str())],
  )?;
  assert_eq!(output.status.code(), Some(0));

  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(json["changed_files_count"], 2);
  assert_eq!(json["outcomes"]["ubuntu24"]["status"], "succeeded");
  assert_eq!(json["outcomes"]["rocky9"]["status"], "skipped");
  assert!(repo.file_exists(UBUNTU_MARKER));
  Ok(())
}
