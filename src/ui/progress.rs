//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars.
//! Image builds run in parallel, so the bar lives behind a mutex and is
//! advanced from worker threads as each target finishes.

use linya::{Bar, Progress};
use std::io::IsTerminal;
use std::sync::Mutex;

/// Thread-safe progress bar over dispatched targets.
///
/// Disabled (no-op) when stderr is not a terminal, e.g. in CI logs.
pub struct DispatchProgress {
  inner: Option<Mutex<(Progress, Bar)>>,
}

impl DispatchProgress {
  /// Create a progress bar for `total` targets
  pub fn new(total: usize, label: impl Into<String>, enabled: bool) -> Self {
    if !enabled || total == 0 || !std::io::stderr().is_terminal() {
      return Self::hidden();
    }

    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some(Mutex::new((progress, bar))),
    }
  }

  /// A progress bar that draws nothing
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Increment progress by 1 (thread-safe)
  pub fn inc(&self) {
    if let Some(ref inner) = self.inner
      && let Ok(mut guard) = inner.lock()
    {
      let (progress, bar) = &mut *guard;
      progress.inc_and_draw(bar, 1);
    }
  }

  #[cfg(test)]
  pub fn is_visible(&self) -> bool {
    self.inner.is_some()
  }
}
