//! One dispatch, driven from the main thread.

use std::sync::Arc;
use std::time::Duration;

use courier_common_async::{callback_queue, CallbackReceiver};
use courier_common_config::{CourierConfig, HttpSettings};
use courier_common_http::{HttpConfig, HttpTransport, Response};
use courier_dispatch::{Dispatcher, ResultEvent, RetryPolicy, Subscription};
use tokio::sync::mpsc;

use crate::error::CliError;

/// Dispatcher whose callbacks run on the thread awaiting [`Session::run`].
pub struct Session {
    dispatcher: Dispatcher,
    receiver: CallbackReceiver,
}

fn http_config(settings: &HttpSettings) -> HttpConfig {
    let mut config = HttpConfig {
        connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        request_timeout: Duration::from_secs(settings.request_timeout_secs),
        pool_max_idle_per_host: settings.pool_max_idle_per_host,
        gzip: settings.gzip,
        ..HttpConfig::default()
    };
    if let Some(user_agent) = &settings.user_agent {
        config.user_agent = user_agent.clone();
    }
    config
}

impl Session {
    /// Build the transport and dispatcher from configuration.
    pub fn new(config: &CourierConfig) -> Result<Self, CliError> {
        let transport = HttpTransport::with_config(http_config(&config.http)).map_err(|e| CliError::Config {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;
        let policy = RetryPolicy::from_settings(&config.retry)?;

        let (queue, receiver) = callback_queue();
        let dispatcher = Dispatcher::builder(Arc::new(transport))
            .retry_policy(policy)
            .callback_context(queue)
            .build()?;

        Ok(Self { dispatcher, receiver })
    }

    /// Issue one request and wait for its outcome.
    ///
    /// Ctrl-C cancels the dispatch and returns [`CliError::Interrupted`].
    pub async fn run<F>(self, issue: F) -> Result<Response, CliError>
    where
        F: FnOnce(&Dispatcher, mpsc::UnboundedSender<ResultEvent>),
    {
        let Session {
            dispatcher,
            mut receiver,
        } = self;

        let (tx, mut events) = mpsc::unbounded_channel();
        issue(&dispatcher, tx);
        // The queue closes once the dispatch lets go of it.
        drop(dispatcher);

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        let mut subscription = None;
        let mut outcome = None;

        while outcome.is_none() {
            tokio::select! {
                more = receiver.run_next() => {
                    if !more {
                        break;
                    }
                    while let Ok(event) = events.try_recv() {
                        match event {
                            ResultEvent::Acquired(sub) => {
                                tracing::debug!(dispatch = %sub.id(), "request started");
                                subscription = Some(sub);
                            }
                            ResultEvent::Success(response) => outcome = Some(Ok(response)),
                            ResultEvent::Failure(error) => outcome = Some(Err(error)),
                        }
                    }
                }
                _ = &mut interrupt => {
                    cancel_pending(&mut receiver, &mut events, subscription);
                    return Err(CliError::Interrupted);
                }
            }
        }

        match outcome {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(error.into()),
            None => Err(CliError::Request("no request was sent".to_string())),
        }
    }
}

/// Cancel the dispatch, picking up an `Acquired` that is still queued.
fn cancel_pending(
    receiver: &mut CallbackReceiver,
    events: &mut mpsc::UnboundedReceiver<ResultEvent>,
    mut subscription: Option<Subscription>,
) -> Option<Subscription> {
    receiver.drain();
    while let Ok(event) = events.try_recv() {
        if let ResultEvent::Acquired(sub) = event {
            subscription = Some(sub);
        }
    }
    if let Some(sub) = &subscription {
        sub.cancel();
    }
    subscription
}
