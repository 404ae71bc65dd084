//! Hooks for showing how far a harvest has got.

use std::sync::Arc;

/// Receives record counts as pages are harvested.
///
/// Positions are in records, not pages. A resumed run starts at the
/// checkpoint's `total_fetched`.
pub trait ProgressCallback: Send + Sync {
    /// The remote's total for the query, reported with every page.
    fn set_total(&self, total: u64);

    /// Records fetched so far.
    fn set_position(&self, pos: u64);

    /// `delta` more records fetched.
    fn inc(&self, delta: u64);

    fn set_message(&self, msg: String);

    /// The harvest completed.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
