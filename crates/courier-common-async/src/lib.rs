//! Async runtime utilities.
//!
//! Courier splits work across two execution contexts: network calls run on a
//! multi-threaded tokio pool built by [`build_runtime`], while results are
//! handed back through a [`CallbackContext`] chosen by the caller.

pub mod callback;
pub mod cancel;

pub use callback::{callback_queue, Callback, CallbackContext, CallbackQueue, CallbackReceiver, ImmediateContext};
pub use cancel::{CancellationToken, CancellationWatcher};

use std::future::Future;
use tokio::runtime::{Builder, Runtime};

/// Configuration for the background I/O runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = num_cpus).
    pub worker_threads: usize,
    /// Thread name prefix.
    pub thread_name: String,
    /// Enable I/O driver.
    pub enable_io: bool,
    /// Enable time driver.
    pub enable_time: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0, // Use num_cpus
            thread_name: "courier-io".to_string(),
            enable_io: true,
            enable_time: true,
        }
    }
}

/// Build a configured Tokio runtime.
pub fn build_runtime(config: RuntimeConfig) -> std::io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();

    if config.worker_threads > 0 {
        builder.worker_threads(config.worker_threads);
    }

    builder.thread_name(&config.thread_name);

    if config.enable_io {
        builder.enable_io();
    }

    if config.enable_time {
        builder.enable_time();
    }

    tracing::debug!(
        worker_threads = config.worker_threads,
        thread_name = %config.thread_name,
        "building runtime"
    );
    builder.build()
}

/// Spawn a task onto the given runtime handle, tagging it for debugging.
pub fn spawn_named<F>(
    handle: &tokio::runtime::Handle,
    name: &'static str,
    future: F,
) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tracing::trace!(task = name, "spawning task");
    handle.spawn(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runtime_config_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.thread_name, "courier-io");
        assert!(config.enable_io);
        assert!(config.enable_time);
    }

    #[test]
    fn test_runtime_build() {
        let config = RuntimeConfig {
            worker_threads: 2,
            thread_name: "test-runtime".to_string(),
            enable_io: true,
            enable_time: true,
        };

        let runtime = build_runtime(config).expect("Should build runtime");

        let task = spawn_named(runtime.handle(), "on-pool", async {
            std::thread::current().name().map(str::to_owned)
        });
        let name = runtime.block_on(task).expect("Task should complete");
        assert_eq!(name.as_deref(), Some("test-runtime"));
    }

    #[tokio::test]
    async fn test_spawn_named() {
        let handle = tokio::runtime::Handle::current();
        let task = spawn_named(&handle, "test-task", async { 42 });
        let result = task.await.expect("Task should complete");
        assert_eq!(result, 42);
    }
}
