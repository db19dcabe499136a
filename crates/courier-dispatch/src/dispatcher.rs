//! The dispatcher.

use courier_common_async::{spawn_named, CallbackContext, ImmediateContext};
use courier_common_http::{FieldMap, RequestDescriptor, Transport};
use courier_common_log::spans::{self, Timer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::Instrument;

use crate::build::{self, BuildResult};
use crate::error::{DispatchError, Malformed, Result};
use crate::retry::RetryPolicy;
use crate::sink::{ResultSink, SinkAdapter};
use crate::subscription::Subscription;

struct Shared {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    context: Arc<dyn CallbackContext>,
    runtime: Handle,
}

/// Issues requests with retry and reports results to a [`ResultSink`].
///
/// Every operation returns as soon as the work is scheduled. The sink sees
/// `on_acquired` once, then `on_success` or `on_failure` once, on the
/// configured callback context. Clones share the transport, policy and
/// runtime.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Start building a dispatcher around `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> DispatcherBuilder {
        DispatcherBuilder::new(transport)
    }

    /// Dispatcher on the current runtime with immediate callbacks.
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Result<Self> {
        Self::builder(transport).retry_policy(policy).build()
    }

    /// Retry policy shared by every dispatch.
    pub fn policy(&self) -> &RetryPolicy {
        &self.shared.policy
    }

    /// GET `url`.
    pub fn get(&self, url: &str, sink: impl ResultSink) {
        self.submit(build::get(url), sink)
    }

    /// GET `url` with a query mapping. Empty or absent params send a plain GET.
    pub fn get_with_params(&self, url: &str, params: Option<&FieldMap>, sink: impl ResultSink) {
        self.submit(build::get_with_params(url, params), sink)
    }

    /// Form POST without headers or body fields.
    pub fn post_form(&self, url: &str, sink: impl ResultSink) {
        self.submit(build::post_form(url), sink)
    }

    /// Form POST with body fields.
    pub fn post_form_with_params(&self, url: &str, params: Option<&FieldMap>, sink: impl ResultSink) {
        self.submit(build::post_form_with_params(url, params), sink)
    }

    /// Form POST with headers and body fields, either of which may be empty.
    pub fn post_form_with_headers_and_params(
        &self,
        url: &str,
        headers: Option<&FieldMap>,
        params: Option<&FieldMap>,
        sink: impl ResultSink,
    ) {
        self.submit(build::post_form_with_headers_and_params(url, headers, params), sink)
    }

    /// JSON POST. An empty `body` is dropped without dispatching and the
    /// sink is never called.
    pub fn post_json(&self, url: &str, body: &str, sink: impl ResultSink) {
        self.submit(build::post_json(url, body), sink)
    }

    /// JSON POST with extra headers. Same empty-body rule as
    /// [`post_json`](Self::post_json).
    pub fn post_json_with_headers(
        &self,
        url: &str,
        headers: Option<&FieldMap>,
        body: &str,
        sink: impl ResultSink,
    ) {
        self.submit(build::post_json_with_headers(url, headers, body), sink)
    }

    /// Download `url`. The success payload is a byte stream.
    pub fn download_file(&self, url: &str, sink: impl ResultSink) {
        self.submit(build::download(url), sink)
    }

    /// Upload one file as the `headimg` multipart part.
    pub fn upload_single_file(&self, url: &str, path: impl AsRef<Path>, sink: impl ResultSink) {
        self.submit(build::upload_single_file(url, path), sink)
    }

    /// Upload one file plus text fields.
    pub fn upload_with_params(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        params: Option<&FieldMap>,
        sink: impl ResultSink,
    ) {
        self.submit(build::upload_with_params(url, path, params), sink)
    }

    /// Dispatch a prebuilt descriptor under the same rules as the builders:
    /// empty maps collapse, an empty JSON body is dropped and an empty URL
    /// fails as [`DispatchError::MalformedRequest`].
    pub fn dispatch(&self, descriptor: RequestDescriptor, sink: impl ResultSink) {
        self.submit(build::normalize(descriptor), sink)
    }

    fn submit(&self, built: BuildResult, sink: impl ResultSink) {
        match built {
            Err(Malformed::EmptyJsonBody) => {
                tracing::debug!("empty JSON body, request dropped");
            }
            built => self.start(built, Box::new(sink)),
        }
    }

    fn start(&self, built: BuildResult, sink: Box<dyn ResultSink>) {
        let subscription = Subscription::new();
        let adapter = SinkAdapter::new(sink, self.shared.context.clone(), subscription.clone());

        let (kind, url) = match &built {
            Ok(descriptor) => (descriptor.kind().as_str(), descriptor.url().to_string()),
            Err(_) => ("malformed", String::new()),
        };
        let span = spans::dispatch_span(&subscription.id().to_string(), kind, &url);

        let shared = self.shared.clone();
        spawn_named(
            &self.shared.runtime,
            "dispatch",
            run(shared, built, adapter, subscription).instrument(span),
        );
    }
}

async fn run(shared: Arc<Shared>, built: BuildResult, adapter: SinkAdapter, subscription: Subscription) {
    let timer = Timer::start("dispatch");
    adapter.acquired();

    let result = match &built {
        Ok(descriptor) => {
            tracing::debug!("dispatch started");
            let transport: &dyn Transport = &*shared.transport;
            shared
                .policy
                .wrap(move || transport.execute(descriptor), subscription.watcher())
                .await
        }
        Err(reason) => Err(DispatchError::MalformedRequest(*reason)),
    };

    match result {
        Ok(response) => {
            tracing::debug!(status = response.status, "dispatch succeeded");
            adapter.success(response);
        }
        Err(DispatchError::Cancelled) => {
            tracing::debug!("dispatch cancelled");
        }
        Err(error) => {
            spans::record_error(&error);
            tracing::debug!(error = %error, "dispatch failed");
            adapter.failure(error);
        }
    }

    subscription.release();
    timer.finish();
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.shared.policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    context: Option<Arc<dyn CallbackContext>>,
    runtime: Option<Handle>,
}

impl DispatcherBuilder {
    fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            context: None,
            runtime: None,
        }
    }

    /// Set the retry policy. Defaults to [`RetryPolicy::default`].
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set where sink callbacks run. Defaults to [`ImmediateContext`].
    pub fn callback_context(mut self, context: impl CallbackContext + 'static) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Set the runtime transport calls run on. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the dispatcher.
    pub fn build(self) -> Result<Dispatcher> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| DispatchError::Runtime(e.to_string()))?,
        };

        Ok(Dispatcher {
            shared: Arc::new(Shared {
                transport: self.transport,
                policy: self.policy,
                context: self.context.unwrap_or_else(|| Arc::new(ImmediateContext)),
                runtime,
            }),
        })
    }
}
