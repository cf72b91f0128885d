/*!
 * Process Exit Tests
 * The hook inside a real exiting process
 */

use crate::common::{closed_port, FakeAccountant, Reply};
use accountant_hook::config::VARIANT_ENV;
use accountant_hook::NotificationMessage;
use pretty_assertions::assert_eq;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

const WORKER: &str = env!("CARGO_BIN_EXE_hooked-worker");

/// Enough user CPU time to pass the gate
const BUSY_MS: &str = "700";

fn worker(variant: &str, port: u16, spin_ms: &str, code: u8, path: &str) -> Command {
    let mut command = Command::new(WORKER);
    command
        .args([port.to_string(), spin_ms.to_string(), code.to_string(), path.to_string()])
        .env(VARIANT_ENV, variant)
        .env_remove("RUST_LOG");
    command
}

fn run_worker(variant: &str, port: u16, spin_ms: &str, code: u8, path: &str) -> (u32, ExitStatus) {
    wait(worker(variant, port, spin_ms, code, path))
}

fn wait(mut command: Command) -> (u32, ExitStatus) {
    let mut child = command.spawn().expect("failed to spawn hooked-worker");
    let pid = child.id();
    let status = child.wait().expect("failed to wait for hooked-worker");
    (pid, status)
}

fn single_message(accountant: &FakeAccountant) -> NotificationMessage {
    let lines = accountant.wait_for_lines(1, Duration::from_secs(2));
    assert_eq!(lines.len(), 1, "expected exactly one notification, got {:?}", lines);
    assert!(lines[0].ends_with('\n'));
    NotificationMessage::parse(&lines[0]).expect("malformed notification line")
}

#[test]
fn test_status_aware_exit_reports_pid_and_code() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let (pid, status) = run_worker("status", accountant.port(), BUSY_MS, 3, "exit");

    assert_eq!(status.code(), Some(3));
    let message = single_message(&accountant);
    assert_eq!(message.identity.pid, pid);
    assert_eq!(message.status, Some(3));
    assert_eq!(accountant.connections(), 1);
}

#[test]
fn test_guard_path_carries_status() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let (pid, status) = run_worker("status", accountant.port(), BUSY_MS, 4, "guard");

    assert_eq!(status.code(), Some(4));
    let message = single_message(&accountant);
    assert_eq!(message.identity.pid, pid);
    assert_eq!(message.status, Some(4));
}

#[test]
fn test_return_from_main_reaches_atexit_once() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let (pid, status) = run_worker("status", accountant.port(), BUSY_MS, 0, "return");

    assert_eq!(status.code(), Some(0));
    let message = single_message(&accountant);
    assert_eq!(message.identity.pid, pid);
    assert_eq!(message.status, None);
    assert_eq!(accountant.connections(), 1);
}

#[test]
fn test_std_exit_reaches_atexit() {
    let accountant = FakeAccountant::start(Reply::Close);

    let (pid, status) = run_worker("status", accountant.port(), BUSY_MS, 7, "std-exit");

    assert_eq!(status.code(), Some(7));
    assert_eq!(single_message(&accountant).identity.pid, pid);
}

#[test]
fn test_panic_unwinds_through_guard_once() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let (pid, status) = run_worker("status", accountant.port(), BUSY_MS, 0, "panic");

    // Rust's exit code for a panic escaping main; atexit finds the registry drained
    assert_eq!(status.code(), Some(101));
    let message = single_message(&accountant);
    assert_eq!(message.identity.pid, pid);
    assert_eq!(message.status, None);
    assert_eq!(accountant.connections(), 1);
}

#[test]
fn test_host_action_exiting_still_reaches_hook() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let (pid, status) = run_worker("status", accountant.port(), BUSY_MS, 6, "host-exit");

    assert_eq!(status.code(), Some(6));
    let message = single_message(&accountant);
    assert_eq!(message.identity.pid, pid);
    assert_eq!(message.status, Some(6));
    assert_eq!(accountant.connections(), 1);
}

#[test]
fn test_trivial_worker_is_not_reported() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let (_, status) = run_worker("status", accountant.port(), "0", 5, "exit");

    assert_eq!(status.code(), Some(5));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(accountant.connections(), 0);
}

#[test]
fn test_unreachable_accountant_keeps_exit_code() {
    let start = Instant::now();
    let (_, status) = run_worker("status", closed_port(), BUSY_MS, 9, "exit");

    assert_eq!(status.code(), Some(9));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_silent_accountant_bounded_exit() {
    let accountant = FakeAccountant::start(Reply::Silent(Duration::from_secs(30)));

    let start = Instant::now();
    let (_, status) = run_worker("status", accountant.port(), BUSY_MS, 2, "exit");

    assert_eq!(status.code(), Some(2));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(single_message(&accountant).status, Some(2));
}

#[cfg(unix)]
#[test]
fn test_generic_variant_sends_pid_then_traps() {
    use nix::sys::resource::{setrlimit, Resource};
    use std::os::unix::process::{CommandExt, ExitStatusExt};

    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let mut command = worker("generic", accountant.port(), BUSY_MS, 0, "exit");
    // SAFETY: setrlimit is async-signal-safe; no allocation happens in the child.
    unsafe {
        command.pre_exec(|| {
            setrlimit(Resource::RLIMIT_CORE, 0, 0).map_err(std::io::Error::from)
        });
    }
    let (pid, status) = wait(command);

    // No tracer is attached, so SIGTRAP terminates the worker
    assert_eq!(status.signal(), Some(libc::SIGTRAP));
    let message = single_message(&accountant);
    assert_eq!(message.identity.pid, pid);
    assert_eq!(message.status, None);
}
