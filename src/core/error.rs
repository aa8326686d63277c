//! Error types for image-rail with contextual messages and exit codes
//!
//! This module provides a unified error type that categorizes errors and provides
//! contextual help messages to users. Configuration problems are fatal at startup,
//! while publish failures are collected per target and surfaced together.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for image-rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, I/O)
  System = 2,
  /// Validation failure (malformed change set)
  Validation = 3,
  /// One or more gated targets failed to publish
  Publish = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for image-rail
#[derive(Debug)]
pub enum RailError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Validation errors (malformed change events)
  Validation(ValidationError),

  /// I/O errors
  Io(io::Error),

  /// Gated targets whose publish action failed
  Publish { failed: Vec<String> },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RailError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RailError::Message { message, context, help } => RailError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RailError::Config(_) => ExitCode::User,
      RailError::Git(_) => ExitCode::System,
      RailError::Validation(_) => ExitCode::Validation,
      RailError::Io(_) => ExitCode::System,
      RailError::Publish { .. } => ExitCode::Publish,
      RailError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RailError::Config(e) => e.help_message(),
      RailError::Git(e) => e.help_message(),
      RailError::Validation(e) => e.help_message(),
      RailError::Publish { .. } => {
        Some("Re-run with -v for step output, or `image-rail publish --target <name>` to retry one image.".to_string())
      }
      RailError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for RailError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RailError::Config(e) => write!(f, "{}", e),
      RailError::Git(e) => write!(f, "{}", e),
      RailError::Validation(e) => write!(f, "{}", e),
      RailError::Io(e) => write!(f, "I/O error: {}", e),
      RailError::Publish { failed } => {
        write!(f, "Publish failed for {} target(s): {}", failed.len(), failed.join(", "))
      }
      RailError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RailError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RailError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RailError {
  fn from(err: io::Error) -> Self {
    RailError::Io(err)
  }
}

impl From<String> for RailError {
  fn from(msg: String) -> Self {
    RailError::message(msg)
  }
}

impl From<&str> for RailError {
  fn from(msg: &str) -> Self {
    RailError::message(msg)
  }
}

impl From<ConfigError> for RailError {
  fn from(err: ConfigError) -> Self {
    RailError::Config(err)
  }
}

impl From<ValidationError> for RailError {
  fn from(err: ValidationError) -> Self {
    RailError::Validation(err)
  }
}

impl From<toml_edit::de::Error> for RailError {
  fn from(err: toml_edit::de::Error) -> Self {
    RailError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for RailError {
  fn from(err: serde_json::Error) -> Self {
    RailError::message(format!("JSON error: {}", err))
  }
}

impl From<rayon::ThreadPoolBuildError> for RailError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    RailError::message(format!("Failed to build dispatch thread pool: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  /// image-rail.toml not found
  NotFound { root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// No build targets registered
  EmptyRegistry,

  /// Two targets share a name
  DuplicateTarget { name: String },

  /// Two `[[publish.registries]]` entries share a name
  DuplicateRegistry { name: String },

  /// Watched prefix is empty or not a clean relative path
  InvalidPrefix { target: String, prefix: String },

  /// Target requested on the command line is not registered
  TargetNotFound { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Create image-rail.toml with at least one [[targets]] entry.".to_string()),
      ConfigError::EmptyRegistry => Some("Add a [[targets]] table with `name` and `path`.".to_string()),
      ConfigError::DuplicateTarget { name } => {
        Some(format!("Rename one of the '{}' targets; target names must be unique.", name))
      }
      ConfigError::DuplicateRegistry { name } => {
        Some(format!("Merge the '{}' entries in [[publish.registries]] into one.", name))
      }
      ConfigError::InvalidPrefix { .. } => {
        Some("Use a repository-relative directory such as `docker/cbdb/build/rocky9`.".to_string())
      }
      ConfigError::TargetNotFound { .. } => Some("List registered targets with `image-rail targets`.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { root } => {
        write!(
          f,
          "No image-rail configuration found.\nExpected file: {}/image-rail.toml",
          root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::EmptyRegistry => write!(f, "No build targets configured"),
      ConfigError::DuplicateTarget { name } => {
        write!(f, "Target '{}' is defined more than once", name)
      }
      ConfigError::DuplicateRegistry { name } => {
        write!(f, "Registry '{}' is declared more than once", name)
      }
      ConfigError::InvalidPrefix { target, prefix } => {
        write!(f, "Target '{}' has an invalid watched path '{}'", target, prefix)
      }
      ConfigError::TargetNotFound { name } => {
        write!(f, "Target '{}' not found in configuration", name)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::CommandFailed { stderr, .. } => {
        if stderr.contains("unknown revision") || stderr.contains("bad revision") {
          Some("Fetch the base ref first (e.g. `git fetch origin main`) or pass --files explicitly.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Run inside a git checkout or pass --files/--stdin instead: {}",
        path.display()
      )),
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
    }
  }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  /// A changed path could not be interpreted as a repository-relative path
  MalformedPath { path: String, reason: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::MalformedPath { .. } => {
        Some("Changed paths must be relative to the repository root, without `..` segments.".to_string())
      }
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::MalformedPath { path, reason } => {
        write!(f, "Malformed changed path '{}': {}", path, reason)
      }
    }
  }
}

/// Result type alias for image-rail
pub type RailResult<T> = Result<T, RailError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RailResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RailError>,
{
  fn context(self, ctx: impl Into<String>) -> RailResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RailError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
