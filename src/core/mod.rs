//! Core engine for image-rail
//!
//! - **config**: image-rail.toml parsing and validation
//! - **context**: Repository context shared by all commands
//! - **error**: Error types with contextual help messages and exit codes
//! - **vcs**: Git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
