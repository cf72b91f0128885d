/*!
 * Monitoring
 * Structured tracing for the teardown path
 */

mod tracer;

pub use tracer::{init_tracing, HandshakeSpan, LOG_JSON_ENV};
