//! Search progress tracking.
//!
//! Progress is a percentage in `[0, 100]`. Each (stored layer, filter) pair
//! is worth `100 / (layers × filters)`; a successful reply advances progress
//! by that unit times the number of shapes the request covered. Rendering is
//! left to a [`ProgressCallback`] so the engine stays independent of any
//! terminal or UI.

use std::sync::Arc;

/// Receives progress updates from a running search.
///
/// Implementations must be `Send + Sync` so a callback can be shared with
/// the dispatcher through an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// The percentage changed. Always in `[0, 100]`.
    fn set_percent(&self, percent: f64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// The round is over.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_percent(&self, _percent: f64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Snapshot of a round's progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    /// Stored layers at round start.
    pub total_shapes: usize,
    /// Selected filters at round start.
    pub total_filters: usize,
    /// (shape, filter) pairs answered successfully so far.
    pub completed_units: usize,
    /// Current percentage.
    pub percent: f64,
}

/// Tracks and reports a round's progress.
pub struct ProgressTracker {
    state: ProgressState,
    callback: Arc<dyn ProgressCallback>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    /// Starts tracking a round over `total_shapes` × `total_filters` pairs
    /// and reports 0%.
    #[must_use]
    pub fn new(
        total_shapes: usize,
        total_filters: usize,
        callback: Arc<dyn ProgressCallback>,
    ) -> Self {
        let tracker = Self {
            state: ProgressState {
                total_shapes,
                total_filters,
                completed_units: 0,
                percent: 0.0,
            },
            callback,
        };
        tracker.callback.set_percent(0.0);
        tracker
    }

    /// Percentage one (shape, filter) pair is worth; 0 when nothing is
    /// being searched.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn unit(&self) -> f64 {
        let pairs = self.state.total_shapes * self.state.total_filters;
        if pairs == 0 {
            0.0
        } else {
            100.0 / pairs as f64
        }
    }

    /// Adds `amount` percent, clamped to 100. Non-finite and non-positive
    /// amounts are ignored so progress never decreases.
    pub fn advance(&mut self, amount: f64) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        self.state.percent = (self.state.percent + amount).min(100.0);
        self.callback.set_percent(self.state.percent);
    }

    /// Records `count` answered (shape, filter) pairs.
    #[allow(clippy::cast_precision_loss)]
    pub fn advance_units(&mut self, count: usize) {
        self.state.completed_units += count;
        self.advance(self.unit() * count as f64);
    }

    /// Passes a status message to the callback.
    pub fn message(&self, msg: impl Into<String>) {
        self.callback.set_message(msg.into());
    }

    /// Reports the end of the round.
    pub fn finish(&self, msg: impl Into<String>) {
        self.callback.finish(msg.into());
    }

    /// Returns progress to 0%.
    pub fn reset(&mut self) {
        self.state.completed_units = 0;
        self.state.percent = 0.0;
        self.callback.set_percent(0.0);
    }

    /// Current snapshot.
    #[must_use]
    pub const fn state(&self) -> ProgressState {
        self.state
    }

    /// Current percentage.
    #[must_use]
    pub const fn percent(&self) -> f64 {
        self.state.percent
    }
}
