//! Progress reporting for scrape runs.
//!
//! The scraper reports through [`ProgressCallback`] without knowing how
//! progress is shown: the CLI renders `indicatif` bars, the server passes
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a long-running scrape.
///
/// Implementations must be `Send + Sync` so one reporter can be shared
/// through an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total units of work.
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the work complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
