//! Retrying request dispatcher.
//!
//! A [`Dispatcher`] turns request arguments into a
//! [`RequestDescriptor`](courier_common_http::RequestDescriptor), runs it
//! through a [`Transport`](courier_common_http::Transport) under a
//! [`RetryPolicy`], and reports the outcome to a [`ResultSink`]:
//!
//! ```no_run
//! use courier_common_http::HttpTransport;
//! use courier_dispatch::{Dispatcher, ResultEvent, RetryPolicy};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new()?);
//! let dispatcher = Dispatcher::new(transport, RetryPolicy::default())?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! dispatcher.get("https://api.example.com/status", tx);
//!
//! while let Some(event) = rx.recv().await {
//!     if let ResultEvent::Success(response) = event {
//!         println!("{}", response.text().await?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod build;
pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod sink;
pub mod subscription;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, Malformed, Result};
pub use retry::{Attempt, Backoff, RetryDecision, RetryPolicy};
pub use sink::{FnSink, ResultEvent, ResultSink};
pub use subscription::{DispatchId, Subscription};
