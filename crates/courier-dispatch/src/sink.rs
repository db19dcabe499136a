//! Result sinks and the adapter that feeds them.

use courier_common_async::{Callback, CallbackContext};
use courier_common_http::Response;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::error::DispatchError;
use crate::subscription::Subscription;

/// Receives the events of one dispatch.
///
/// `on_acquired` is called exactly once, before one of `on_success` or
/// `on_failure`. Neither terminal callback runs once the subscription has
/// been cancelled. Retried failures are never reported.
pub trait ResultSink: Send + 'static {
    /// The dispatch has started; `subscription` can cancel it.
    fn on_acquired(&mut self, subscription: Subscription);

    /// The request succeeded.
    fn on_success(&mut self, response: Response);

    /// The request failed for good.
    fn on_failure(&mut self, error: DispatchError);
}

/// One event of a dispatch, as a value.
#[derive(Debug)]
pub enum ResultEvent {
    /// The dispatch started.
    Acquired(Subscription),
    /// Terminal success.
    Success(Response),
    /// Terminal failure.
    Failure(DispatchError),
}

impl ResultEvent {
    /// Whether this is `Success` or `Failure`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultEvent::Acquired(_))
    }
}

/// Forwards events into a channel. A closed channel drops them.
impl ResultSink for mpsc::UnboundedSender<ResultEvent> {
    fn on_acquired(&mut self, subscription: Subscription) {
        let _ = self.send(ResultEvent::Acquired(subscription));
    }

    fn on_success(&mut self, response: Response) {
        let _ = self.send(ResultEvent::Success(response));
    }

    fn on_failure(&mut self, error: DispatchError) {
        let _ = self.send(ResultEvent::Failure(error));
    }
}

/// Sink built from a closure over [`ResultEvent`].
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(ResultEvent) + Send + 'static,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ResultSink for FnSink<F>
where
    F: FnMut(ResultEvent) + Send + 'static,
{
    fn on_acquired(&mut self, subscription: Subscription) {
        (self.f)(ResultEvent::Acquired(subscription))
    }

    fn on_success(&mut self, response: Response) {
        (self.f)(ResultEvent::Success(response))
    }

    fn on_failure(&mut self, error: DispatchError) {
        (self.f)(ResultEvent::Failure(error))
    }
}

impl<F> fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

struct AdapterState {
    sink: Mutex<Option<Box<dyn ResultSink>>>,
    acquired: AtomicBool,
    terminated: AtomicBool,
}

/// Delivers pipeline events to a sink through a callback context.
///
/// Enforces the event contract regardless of what the pipeline does: a
/// second `Acquired` or a second terminal event is dropped, and terminal
/// events are dropped once the subscription is cancelled. Cancellation is
/// checked again on the callback context, so a result queued before
/// `cancel()` still never reaches the sink.
#[derive(Clone)]
pub(crate) struct SinkAdapter {
    state: Arc<AdapterState>,
    context: Arc<dyn CallbackContext>,
    subscription: Subscription,
}

impl SinkAdapter {
    pub(crate) fn new(
        sink: Box<dyn ResultSink>,
        context: Arc<dyn CallbackContext>,
        subscription: Subscription,
    ) -> Self {
        Self {
            state: Arc::new(AdapterState {
                sink: Mutex::new(Some(sink)),
                acquired: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
            }),
            context,
            subscription,
        }
    }

    /// Post `Acquired`. Returns whether it was posted.
    pub(crate) fn acquired(&self) -> bool {
        if self.state.acquired.swap(true, Ordering::SeqCst) {
            tracing::debug!(dispatch = %self.subscription.id(), "suppressing duplicate acquired event");
            return false;
        }
        let subscription = self.subscription.clone();
        self.post(false, move |sink| sink.on_acquired(subscription));
        true
    }

    /// Post `Success`. Returns whether it was posted.
    pub(crate) fn success(&self, response: Response) -> bool {
        self.terminal(move |sink| sink.on_success(response))
    }

    /// Post `Failure`. Returns whether it was posted.
    pub(crate) fn failure(&self, error: DispatchError) -> bool {
        self.terminal(move |sink| sink.on_failure(error))
    }

    fn terminal<F>(&self, deliver: F) -> bool
    where
        F: FnOnce(&mut dyn ResultSink) + Send + 'static,
    {
        if self.subscription.is_cancelled() {
            tracing::debug!(dispatch = %self.subscription.id(), "dispatch cancelled, dropping result");
            return false;
        }
        if !self.state.acquired.load(Ordering::SeqCst) {
            self.acquired();
        }
        if self.state.terminated.swap(true, Ordering::SeqCst) {
            tracing::debug!(dispatch = %self.subscription.id(), "suppressing duplicate terminal event");
            return false;
        }
        // The sink must already see an inactive subscription.
        self.subscription.release();
        self.post(true, deliver);
        true
    }

    fn post<F>(&self, terminal: bool, deliver: F)
    where
        F: FnOnce(&mut dyn ResultSink) + Send + 'static,
    {
        let state = self.state.clone();
        let subscription = self.subscription.clone();

        let callback: Callback = Box::new(move || {
            if terminal && subscription.is_cancelled() {
                tracing::debug!(dispatch = %subscription.id(), "cancelled before delivery, dropping result");
                return;
            }
            let mut guard = state.sink.lock().unwrap_or_else(PoisonError::into_inner);
            if terminal {
                // The sink is not needed after its terminal event.
                let sink = guard.take();
                drop(guard);
                if let Some(mut sink) = sink {
                    deliver(&mut *sink);
                }
            } else if let Some(sink) = guard.as_mut() {
                deliver(&mut **sink);
            }
        });

        self.context.post(callback);
    }
}
