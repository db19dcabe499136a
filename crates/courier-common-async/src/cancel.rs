//! Cancellation tokens.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

struct Inner {
    cancelled: AtomicBool,
    notify: watch::Sender<bool>,
}

/// Cancellation token shared between an owner and the work it controls.
///
/// Clones refer to the same underlying state. Cancelling is idempotent and
/// safe from any thread.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify,
            }),
        }
    }

    /// Cancel the operation.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        // send_replace stores the value even when nobody is watching yet.
        self.inner.notify.send_replace(true);
        true
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Create a watcher that can await cancellation.
    pub fn watcher(&self) -> CancellationWatcher {
        CancellationWatcher {
            inner: self.inner.clone(),
            notify: self.inner.notify.subscribe(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Watches for cancellation.
pub struct CancellationWatcher {
    inner: Arc<Inner>,
    notify: watch::Receiver<bool>,
}

impl CancellationWatcher {
    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation.
    pub async fn cancelled(&mut self) {
        if self.is_cancelled() {
            return;
        }
        while !*self.notify.borrow_and_update() {
            if self.notify.changed().await.is_err() {
                // Sender lives as long as any token or watcher; unreachable in practice.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl fmt::Debug for CancellationWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationWatcher")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
