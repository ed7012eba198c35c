//! Progress callbacks for multi-step local work.
//!
//! PDF compression rasterises and re-encodes every page, and container
//! compression re-encodes every embedded picture. Pass an
//! [`Arc<dyn StepProgressCallback>`] to the adapters that do this to hear
//! about each step; the CLI forwards the events to an `indicatif` bar.
//!
//! # Example
//!
//! ```rust
//! use toolverse::StepProgressCallback;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl StepProgressCallback for Counter {
//!     fn on_step_complete(&self, _step: usize, _total: usize, _bytes: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb: Arc<dyn StepProgressCallback> = Arc::new(Counter(AtomicUsize::new(0)));
//! cb.on_step_complete(1, 3, 2048);
//! ```

use std::sync::Arc;

/// Receives events as an adapter works through pages or archive entries.
///
/// All methods default to no-ops. Events may arrive from a blocking worker
/// thread, hence `Send + Sync`.
pub trait StepProgressCallback: Send + Sync {
    /// Called once, before the first step.
    fn on_start(&self, total_steps: usize) {
        let _ = total_steps;
    }

    /// `step` is 1-indexed.
    fn on_step_start(&self, step: usize, total_steps: usize) {
        let _ = (step, total_steps);
    }

    /// `bytes` is the size of the re-encoded output for this step.
    fn on_step_complete(&self, step: usize, total_steps: usize, bytes: usize) {
        let _ = (step, total_steps, bytes);
    }

    /// Called once after the last step succeeded.
    fn on_complete(&self, total_steps: usize, output_bytes: usize) {
        let _ = (total_steps, output_bytes);
    }
}

/// Default when no callback is supplied.
pub struct NoopProgressCallback;

impl StepProgressCallback for NoopProgressCallback {}

pub type ProgressCallback = Arc<dyn StepProgressCallback>;

/// The no-op callback as a shareable handle.
pub fn noop() -> ProgressCallback {
    Arc::new(NoopProgressCallback)
}
