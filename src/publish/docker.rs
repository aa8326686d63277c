//! Docker publish action: login, build, push
//!
//! Each target builds once and is tagged with every `registry/image:tag`
//! combination, then each reference is pushed. With several platforms the
//! build goes through `docker buildx build --push` instead, since a
//! multi-platform image never lands in the local image store. Credentials are
//! read from the environment variables named in the config and passed on
//! stdin only.

use super::process::run_step;
use super::trait_def::{PublishAction, PublishError, PublishRequest, PublishStep, PublishSummary};
use crate::core::config::{PublishConfig, RegistryConfig, TargetConfig};
use std::collections::BTreeMap;
use std::process::Command;

/// docker CLI backed publisher for one target
#[derive(Debug, Clone)]
pub struct DockerPublisher {
  docker: String,
  image: String,
  tags: Vec<String>,
  dockerfile: String,
  platforms: Vec<String>,
  build_args: BTreeMap<String, String>,
  registries: Vec<RegistryConfig>,
}

impl DockerPublisher {
  pub fn from_config(target: &TargetConfig, publish: &PublishConfig) -> Self {
    Self {
      docker: publish.docker.clone(),
      image: target.image.clone().unwrap_or_default(),
      tags: target.tags.clone(),
      dockerfile: target.dockerfile().to_string(),
      platforms: target.platforms.clone(),
      build_args: target.build_args.clone(),
      registries: target.registries(publish).into_iter().cloned().collect(),
    }
  }

  /// Every reference the image is tagged and pushed as
  pub fn image_refs(&self) -> Vec<String> {
    if self.registries.is_empty() {
      return self.tags.iter().map(|tag| format!("{}:{}", self.image, tag)).collect();
    }

    self
      .registries
      .iter()
      .flat_map(|registry| {
        self
          .tags
          .iter()
          .map(move |tag| format!("{}/{}:{}", registry.name, self.image, tag))
      })
      .collect()
  }

  /// More than one platform needs buildx, which pushes as part of the build
  fn multi_platform(&self) -> bool {
    self.platforms.len() > 1
  }

  /// `docker build` (or `docker buildx build --push`) arguments, without the binary
  fn build_command_args(&self, request: &PublishRequest<'_>) -> Vec<String> {
    let mut args = Vec::new();
    if self.multi_platform() {
      args.push("buildx".to_string());
    }
    args.extend([
      "build".to_string(),
      "--file".to_string(),
      request.build_context.join(&self.dockerfile).display().to_string(),
    ]);

    if !self.platforms.is_empty() {
      args.push("--platform".to_string());
      args.push(self.platforms.join(","));
    }

    for (key, value) in &self.build_args {
      args.push("--build-arg".to_string());
      args.push(format!("{}={}", key, value));
    }

    for reference in self.image_refs() {
      args.push("--tag".to_string());
      args.push(reference);
    }

    if self.multi_platform() {
      args.push("--push".to_string());
    }

    args.push(request.build_context.display().to_string());
    args
  }

  /// Registries that declare credential env vars, with the values when both are set
  fn credentials(&self) -> Vec<(&RegistryConfig, Option<(String, String)>)> {
    self
      .registries
      .iter()
      .filter_map(|registry| {
        let (Some(user_var), Some(pass_var)) = (&registry.username_env, &registry.password_env) else {
          return None;
        };
        let values = match (std::env::var(user_var), std::env::var(pass_var)) {
          (Ok(user), Ok(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
          _ => None,
        };
        Some((registry, values))
      })
      .collect()
  }

  fn login_display(&self, registry: &RegistryConfig, user: &str) -> String {
    format!("{} login {} --username {} --password-stdin", self.docker, registry.name, user)
  }

  fn login(&self) -> Result<(), PublishError> {
    for (registry, values) in self.credentials() {
      let Some((user, pass)) = values else {
        tracing::warn!(
          registry = %registry.name,
          username_env = ?registry.username_env,
          password_env = ?registry.password_env,
          "registry credentials not set, pushing without login"
        );
        continue;
      };

      let mut cmd = Command::new(&self.docker);
      cmd.args(["login", &registry.name, "--username", &user, "--password-stdin"]);
      run_step(cmd, PublishStep::Login, &self.login_display(registry, &user), Some(&pass))?;
    }
    Ok(())
  }
}

impl PublishAction for DockerPublisher {
  fn kind(&self) -> &str {
    "docker"
  }

  fn plan(&self, request: &PublishRequest<'_>) -> Vec<String> {
    let mut steps: Vec<String> = self
      .credentials()
      .into_iter()
      .filter_map(|(registry, values)| values.map(|(user, _)| self.login_display(registry, &user)))
      .collect();

    steps.push(format!("{} {}", self.docker, self.build_command_args(request).join(" ")));

    if !self.multi_platform() {
      for reference in self.image_refs() {
        steps.push(format!("{} push {}", self.docker, reference));
      }
    }

    steps
  }

  fn publish(&self, request: &PublishRequest<'_>) -> Result<PublishSummary, PublishError> {
    self.login()?;

    let args = self.build_command_args(request);
    let build_line = format!("{} {}", self.docker, args.join(" "));
    let mut build = Command::new(&self.docker);
    build.args(&args);
    run_step(build, PublishStep::Build, &build_line, None)?;

    let pushed = if self.multi_platform() {
      self.image_refs()
    } else {
      let mut pushed = Vec::new();
      for reference in self.image_refs() {
        let mut push = Command::new(&self.docker);
        push.args(["push", &reference]);
        run_step(push, PublishStep::Push, &format!("{} push {}", self.docker, reference), None)?;
        pushed.push(reference);
      }
      pushed
    };

    tracing::info!(target_name = request.target_name, images = ?pushed, "image published");
    Ok(PublishSummary { images: pushed })
  }
}
