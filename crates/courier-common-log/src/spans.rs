//! Span helpers for dispatches.

use tracing::{info_span, Span};

/// Create the span wrapping one dispatch from start to terminal event.
pub fn dispatch_span(dispatch_id: &str, kind: &str, url: &str) -> Span {
    info_span!(
        "dispatch",
        id = %dispatch_id,
        kind = %kind,
        url = %url,
        attempts = tracing::field::Empty,
        error = tracing::field::Empty,
    )
}

/// Create a span for one transport attempt inside a dispatch.
pub fn attempt_span(attempt: u32) -> Span {
    tracing::debug_span!("attempt", n = attempt)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", tracing::field::display(error));
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
    }
}
