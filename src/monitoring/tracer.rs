/*!
 * Tracing
 * Subscriber setup and per-call spans built on the tracing crate
 */

use crate::core::types::SandboxId;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

/// Calls slower than this are reported at warn level
pub const SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(10);

/// Install the global subscriber, reporting failure if one is already set
///
/// Environment variables:
/// - RUST_LOG: log filter (default: info)
/// - SANDBOX_TRACE_JSON: `1` or `true` for JSON output
pub fn try_init_tracing() -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("SANDBOX_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    }
}

/// Install the global subscriber; a subscriber that is already set is kept
pub fn init_tracing() {
    if try_init_tracing().is_err() {
        debug!("Tracing subscriber already installed");
    }
}

/// Span covering one script call
///
/// Records instruction and output usage as fields and logs the duration when
/// dropped.
pub struct CallSpan {
    span: Span,
    start: Instant,
    function: String,
}

impl CallSpan {
    pub fn new(sandbox_id: SandboxId, function: &str) -> Self {
        let span = info_span!(
            "sandbox_call",
            sandbox_id,
            function,
            instructions = tracing::field::Empty,
            output = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            function: function.to_string(),
        }
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn record_usage(&self, instructions: usize, output: usize) {
        self.span.record("instructions", instructions);
        self.span.record("output", output);
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
    }
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();
        if elapsed > SLOW_CALL_THRESHOLD {
            warn!(
                function = %self.function,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "Slow script call"
            );
        } else {
            debug!(
                function = %self.function,
                duration_us = elapsed.as_micros() as u64,
                "Script call finished"
            );
        }
    }
}
