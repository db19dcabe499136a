//! Subscription handles.

use courier_common_async::{CancellationToken, CancellationWatcher};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of one dispatch, rendered as `dsp_<uuid>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchId(Uuid);

impl DispatchId {
    /// Create a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dsp_{}", self.0)
    }
}

impl fmt::Debug for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchId({})", self)
    }
}

/// Cancellation handle for one in-flight dispatch.
///
/// Clones share state. The subscription is released before the terminal
/// event reaches the sink, so `is_active()` is already false inside
/// `on_success` and `on_failure`. The caller may cancel at any point before
/// that.
#[derive(Clone)]
pub struct Subscription {
    id: DispatchId,
    token: CancellationToken,
    released: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn new() -> Self {
        Self {
            id: DispatchId::new(),
            token: CancellationToken::new(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Identifier of the dispatch this subscription controls.
    pub fn id(&self) -> DispatchId {
        self.id
    }

    /// Cancel the dispatch. Safe from any thread; repeated calls do nothing.
    pub fn cancel(&self) {
        if self.token.cancel() {
            tracing::debug!(dispatch = %self.id, "subscription cancelled");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the dispatch can still produce events.
    pub fn is_active(&self) -> bool {
        !self.is_cancelled() && !self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub(crate) fn watcher(&self) -> CancellationWatcher {
        self.token.watcher()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .field("released", &self.released.load(Ordering::SeqCst))
            .finish()
    }
}
