//! Progress reporting.
//!
//! A processing pass and a submit both report through [`ProgressCallback`].
//! Callbacks observe only; there is no cancellation, a pass always runs to
//! completion.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use vidcover::{ProcessingOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} / {} videos processed", info.current, info.total);
//!     }
//! }
//!
//! let options = ProcessingOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of work being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Probing durations and default covers.
    Probing,
    /// Driving upload streams.
    Uploading,
}

/// A snapshot of progress within one pass.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub operation: OperationType,
    /// Items settled so far in this pass.
    pub current: u64,
    /// Items in this pass.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0).
    pub percentage: f32,
    /// Wall-clock time since the pass started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
}

/// Receives progress updates.
///
/// Must be [`Send`] and [`Sync`]; it is shared by every in-flight item.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Counts settled items for one pass and emits a snapshot per item.
///
/// `advance` takes `&self` so concurrently running items can share it.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: u64,
    current: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Emit the zero-progress snapshot that opens a pass.
    pub(crate) fn start(&self) {
        self.report(0);
    }

    /// Record one settled item. Returns the new count.
    pub(crate) fn advance(&self) -> u64 {
        let current = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.report(current);
        current
    }

    fn report(&self, current: u64) {
        let elapsed = self.start_time.elapsed();
        let percentage = if self.total > 0 {
            (current as f32 / self.total as f32) * 100.0
        } else {
            100.0
        };

        let estimated_remaining = (current > 0).then(|| {
            let remaining = self.total.saturating_sub(current);
            elapsed.div_f64(current as f64).mul_f64(remaining as f64)
        });

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
        });
    }
}
