/*!
 * Monitoring Module
 * Structured logging setup and call spans
 */

pub mod tracer;

pub use tracer::{init_tracing, try_init_tracing, CallSpan, SLOW_CALL_THRESHOLD};
