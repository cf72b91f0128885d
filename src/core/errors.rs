/*!
 * Error Types
 * Internal error handling with thiserror and miette
 *
 * None of these errors escape the teardown path: the hook logs them and maps
 * them onto a handshake outcome. Only `install` and `register_teardown`, which
 * run while the process is still live, return them to the caller.
 */

use miette::Diagnostic;
use thiserror::Error;

/// Hook errors with diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum HookError {
    #[error("Resource usage query failed: {0}")]
    #[diagnostic(
        code(hook::usage_query_failed),
        help("getrusage(RUSAGE_SELF) failed. The gate fails open and notification proceeds.")
    )]
    Usage(String),

    #[error("Failed to connect to accountant at {endpoint}: {source}")]
    #[diagnostic(
        code(hook::connect_failed),
        help("The accountant is not listening. Notification is skipped.")
    )]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send notification: {0}")]
    #[diagnostic(code(hook::send_failed))]
    Send(#[source] std::io::Error),

    #[error("Failed waiting for acknowledgment: {0}")]
    #[diagnostic(code(hook::ack_failed))]
    Ack(#[source] std::io::Error),

    #[error("Failed to configure connection: {0}")]
    #[diagnostic(code(hook::socket_option_failed))]
    SocketOption(#[source] std::io::Error),

    #[error("Failed to register exit hook: {0}")]
    #[diagnostic(
        code(hook::registration_failed),
        help("atexit() refused the handler. The process will exit without notifying the accountant.")
    )]
    Registration(String),

    #[error("Teardown priority {0} is reserved for the accountant hook")]
    #[diagnostic(
        code(hook::reserved_priority),
        help("Register host teardown actions below HOOK_PRIORITY so the accountant hook runs last.")
    )]
    ReservedPriority(u16),

    #[error("Failed to raise debug trap: {0}")]
    #[diagnostic(code(hook::trap_failed))]
    Trap(String),

    #[error("Not supported: {0}")]
    #[diagnostic(
        code(hook::not_supported),
        help("This capability is not available on this platform.")
    )]
    NotSupported(String),
}

#[cfg(unix)]
impl From<nix::errno::Errno> for HookError {
    fn from(err: nix::errno::Errno) -> Self {
        HookError::Usage(err.desc().to_string())
    }
}

/// Result type for hook operations
pub type HookResult<T> = std::result::Result<T, HookError>;
