//! CLI commands for image-rail
//!
//! - **evaluate**: Show which targets a change set gates
//! - **publish**: Build and push images for gated targets
//! - **targets**: List the target registry
//!
//! All commands accept `&RepoContext` so configuration is loaded and
//! validated once.

pub mod evaluate;
pub mod publish;
pub mod source;
pub mod targets;

pub use evaluate::run_evaluate;
pub use publish::run_publish;
pub use source::ChangeArgs;
pub use targets::run_targets;
