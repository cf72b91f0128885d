/*!
 * Structured Tracing
 *
 * The hook runs inside other people's processes, so the library only emits
 * `tracing` events and never installs a subscriber on its own. Binaries that
 * embed it may call [`init_tracing`].
 */

use std::cell::Cell;
use std::time::{Duration, Instant};
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set to `1` or `true` for JSON log lines
pub const LOG_JSON_ENV: &str = "ACCOUNTANT_HOOK_LOG_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: warn)
/// - ACCOUNTANT_HOOK_LOG_JSON: Enable JSON output (default: false)
///
/// Leaves an already-installed global subscriber untouched.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let use_json = std::env::var(LOG_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        debug!(json = use_json, "accountant hook tracing initialized");
    }
}

/// Times one accountant handshake
pub struct HandshakeSpan {
    span: tracing::Span,
    start: Instant,
    ack_wait: Option<Duration>,
    outcome: Cell<Option<&'static str>>,
}

/// Outcomes that end by running out a bound rather than by the accountant
const EXPIRED_OUTCOMES: [&str; 2] = ["timed_out", "unreachable"];

impl HandshakeSpan {
    pub fn new(pid: u32, endpoint: &str, ack_wait: Option<Duration>) -> Self {
        let span = span!(
            Level::DEBUG,
            "accountant_handshake",
            pid = pid,
            endpoint = endpoint,
            outcome = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            ack_wait,
            outcome: Cell::new(None),
        }
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record how the handshake unblocked
    pub fn record_outcome(&self, outcome: &'static str) {
        self.span.record("outcome", outcome);
        self.outcome.set(Some(outcome));
    }

    /// Elapsed time since the span was opened
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether `duration` is worth a warning
    ///
    /// The connect and the ack read share the same bound, so a handshake may
    /// legitimately take up to twice the ack wait. Timeouts are a normal
    /// release and never count as slow; unbounded waits have no budget.
    fn is_slow(&self, duration: Duration) -> bool {
        if self.outcome.get().map_or(false, |o| EXPIRED_OUTCOMES.contains(&o)) {
            return false;
        }
        self.ack_wait.map_or(false, |limit| duration > limit * 2)
    }
}

impl Drop for HandshakeSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if self.is_slow(duration) {
            warn!(
                duration_ms = duration.as_millis() as u64,
                "accountant handshake exceeded ack wait"
            );
        } else {
            debug!(duration_us = duration.as_micros() as u64, "accountant handshake completed");
        }
    }
}
