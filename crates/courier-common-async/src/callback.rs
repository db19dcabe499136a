//! Callback delivery contexts.
//!
//! A [`CallbackContext`] decides where a callback runs. Work finishing on the
//! I/O pool posts its callbacks here instead of invoking them directly, so the
//! caller controls the thread that observes results.

use std::fmt;
use tokio::sync::mpsc;

/// A unit of work to run on a callback context.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere callbacks can be posted to.
///
/// Implementations must run callbacks posted from a single thread in the
/// order they were posted.
pub trait CallbackContext: Send + Sync {
    /// Schedule `callback` to run on this context.
    fn post(&self, callback: Callback);
}

/// Runs callbacks immediately on the posting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateContext;

impl CallbackContext for ImmediateContext {
    fn post(&self, callback: Callback) {
        callback();
    }
}

/// Create a FIFO callback queue.
///
/// The [`CallbackQueue`] half is handed to producers; the
/// [`CallbackReceiver`] half stays with the thread that should run the
/// callbacks (a UI loop, the main thread of a CLI, a test body).
pub fn callback_queue() -> (CallbackQueue, CallbackReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CallbackQueue { tx }, CallbackReceiver { rx })
}

/// Posting half of a callback queue.
#[derive(Clone)]
pub struct CallbackQueue {
    tx: mpsc::UnboundedSender<Callback>,
}

impl CallbackContext for CallbackQueue {
    fn post(&self, callback: Callback) {
        if self.tx.send(callback).is_err() {
            tracing::debug!("callback receiver dropped, discarding callback");
        }
    }
}

impl fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackQueue")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving half of a callback queue. Callbacks run on whichever thread
/// drains it.
pub struct CallbackReceiver {
    rx: mpsc::UnboundedReceiver<Callback>,
}

impl CallbackReceiver {
    /// Run every callback currently queued without waiting.
    ///
    /// Returns the number of callbacks run.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.rx.try_recv() {
            callback();
            ran += 1;
        }
        ran
    }

    /// Wait for the next callback and run it.
    ///
    /// Returns `false` once every [`CallbackQueue`] has been dropped and the
    /// queue is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CallbackReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackReceiver").finish_non_exhaustive()
    }
}
