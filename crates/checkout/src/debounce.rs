//! Reusable debounce primitive with cancel-on-supersede semantics.
//!
//! Rapid triggers are coalesced into the single most recent one: every
//! call to [`Debouncer::mark`] supersedes all tokens issued before it,
//! and only the newest token survives its quiet period. Used for
//! address-input handling and any other rate-limited trigger.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A generation token identifying one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceToken(u64);

/// Coalesces rapid triggers into one, keeping only the latest.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a trigger, superseding every earlier token.
    #[must_use]
    pub fn mark(&self) -> DebounceToken {
        DebounceToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Wait out the quiet period for `token`.
    ///
    /// Resolves to `true` only if no newer token was issued in the
    /// meantime; superseded triggers resolve to `false` and their work
    /// must be skipped.
    pub async fn settle(&self, token: DebounceToken) -> bool {
        tokio::time::sleep(self.delay).await;
        token.0 == self.generation.load(Ordering::SeqCst)
    }
}
