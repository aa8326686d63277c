//! `image-rail targets` - List registered build targets

use crate::core::context::RepoContext;
use crate::core::error::RailResult;
use crate::publish::PublishRequest;
use crate::utils::path_to_git_format;
use serde_json::json;

/// Run the targets command
pub fn run_targets(ctx: &RepoContext, json: bool) -> RailResult<()> {
  if json {
    let targets: Vec<_> = ctx
      .registry
      .iter()
      .map(|t| {
        json!({
            "name": t.name(),
            "watched_prefix": t.watched_prefix(),
            "build_context": path_to_git_format(t.build_context()),
            "publisher": t.action().kind(),
        })
      })
      .collect();

    let output = json!({
        "branches": ctx.config.trigger.branches,
        "targets": targets,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  println!("Build Targets");
  println!("=============");
  if ctx.config.trigger.branches.is_empty() {
    println!("Publishes from: any branch");
  } else {
    println!("Publishes from: {}", ctx.config.trigger.branches.join(", "));
  }
  println!();

  for target in ctx.registry.iter() {
    println!("🎯 {} ({})", target.name(), target.action().kind());
    println!("   watches: {}/", target.watched_prefix());

    let request = PublishRequest {
      target_name: target.name(),
      build_context: target.build_context(),
    };
    for step in target.action().plan(&request) {
      println!("   {}", step);
    }
    println!();
  }

  Ok(())
}
