//! Test utilities for Courier crates.

use async_trait::async_trait;
use bytes::Bytes;
use courier_common_http::{RequestDescriptor, Response, Transport, TransportError};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a temporary file with given content.
pub fn temp_file(content: &str) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join("test_file");
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(_) => {}
        }
    };
}

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeed with a buffered body.
    Succeed(Bytes),
    /// Succeed with a streamed body made of these chunks.
    Stream(Vec<Bytes>),
    /// Fail with `TransportError::Other("call N failed")`, N counted from 1.
    Fail,
    /// Fail with `TransportError::RateLimited`.
    RateLimited(Option<Duration>),
}

/// A [`Transport`] that replays a script instead of touching the network.
///
/// Once the script runs out, the fallback step repeats forever.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    latency: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    /// Play `script`, then repeat `fallback`.
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Always succeed with `body`.
    pub fn succeed(body: impl Into<Bytes>) -> Self {
        Self::new(Vec::new(), Step::Succeed(body.into()))
    }

    /// Fail `failures` times, then succeed with `body`.
    pub fn fail_then_succeed(failures: usize, body: impl Into<Bytes>) -> Self {
        Self::new(vec![Step::Fail; failures], Step::Succeed(body.into()))
    }

    /// Fail on every call.
    pub fn always_fail() -> Self {
        Self::new(Vec::new(), Step::Fail)
    }

    /// Delay every call by `latency` before resolving.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Descriptors received, in call order.
    pub fn descriptors(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().expect("descriptor log poisoned").clone()
    }

    /// Wait until at least `n` calls have been made, polling every millisecond.
    pub async fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while self.calls() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Response, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen
            .lock()
            .expect("descriptor log poisoned")
            .push(descriptor.clone());

        let step = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match step {
            Step::Succeed(body) => Ok(Response::ok(body)),
            Step::Stream(chunks) => Ok(Response::streaming(Box::pin(futures_util::stream::iter(
                chunks.into_iter().map(Ok),
            )))),
            Step::Fail => Err(TransportError::other(format!("call {call} failed"))),
            Step::RateLimited(retry_after) => Err(TransportError::RateLimited { retry_after }),
        }
    }
}
