//! Change-set gating
//!
//! Maps the paths changed by a push onto the registered build targets.
//! Evaluation is pure; nothing here touches the publish side effects.

pub mod change_event;
pub mod evaluate;
pub mod target;

pub use change_event::ChangeEvent;
pub use evaluate::{GateResult, evaluate};
pub use target::{BuildTarget, TargetRegistry};
