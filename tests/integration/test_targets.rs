//! Integration tests for `image-rail targets` and config loading

use crate::helpers::{CBDB_CONFIG, TestRepo, run_image_rail, run_image_rail_raw};
use anyhow::Result;

#[test]
fn test_targets_json_lists_registry() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;

  let output = run_image_rail(&repo.path, &["targets", "--json"])?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(json["branches"], serde_json::json!(["main"]));
  let targets = json["targets"].as_array().expect("targets array");
  assert_eq!(targets.len(), 2);
  assert_eq!(targets[0]["name"], "rocky9");
  assert_eq!(targets[0]["watched_prefix"], "docker/cbdb/build/rocky9");
  assert_eq!(targets[0]["publisher"], "command");
  assert_eq!(targets[1]["name"], "ubuntu24");
  Ok(())
}

#[test]
fn test_targets_text_shows_docker_plan() -> Result<()> {
  let config = r#"
[publish]
registries = [{ name = "ghcr.io/cloudberry", username_env = "GHCR_USER", password_env = "GHCR_TOKEN" }]

[[targets]]
name = "rocky9"
path = "docker/cbdb/build/rocky9"
image = "cbdb-build-rocky9"
tags = ["latest"]
"#;
  let repo = TestRepo::new(config)?;

  let output = run_image_rail(&repo.path, &["targets"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("rocky9 (docker)"));
  assert!(stdout.contains("ghcr.io/cloudberry/cbdb-build-rocky9:latest"));
  assert!(stdout.contains("any branch"));
  Ok(())
}

#[test]
fn test_config_in_dot_github() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  std::fs::create_dir_all(repo.path.join(".github"))?;
  std::fs::rename(repo.path.join("image-rail.toml"), repo.path.join(".github/image-rail.toml"))?;

  let output = run_image_rail(&repo.path, &["targets", "--json"])?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(json["targets"].as_array().map(Vec::len), Some(2));
  Ok(())
}

#[test]
fn test_empty_registry_is_config_error() -> Result<()> {
  let repo = TestRepo::new("[trigger]\nbranches = [\"main\"]\n")?;

  let output = run_image_rail_raw(&repo.path, &["targets"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_invalid_prefix_is_config_error() -> Result<()> {
  let config = r#"
[[targets]]
name = "escape"
path = "../elsewhere"
publisher = "command"
command = ["true"]
"#;
  let repo = TestRepo::new(config)?;

  let output = run_image_rail_raw(&repo.path, &["targets"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("escape"));
  Ok(())
}

#[test]
fn test_missing_config_is_config_error() -> Result<()> {
  let repo = TestRepo::new(CBDB_CONFIG)?;
  std::fs::remove_file(repo.path.join("image-rail.toml"))?;

  let output = run_image_rail_raw(&repo.path, &["targets"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}
