/*!
 * Handshake Tests
 * Client behavior against a live loopback accountant
 */

use crate::common::{closed_port, FakeAccountant, Reply};
use accountant_hook::{
    AccountantEndpoint, AckWait, HandshakeOutcome, NotificationClient, NotificationMessage,
    ProcessIdentity,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn client(port: u16, ack_wait: AckWait) -> NotificationClient {
    NotificationClient::new(AccountantEndpoint::loopback(port), ack_wait)
}

#[test]
fn test_ack_releases_promptly() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));

    let start = Instant::now();
    let outcome = client(accountant.port(), AckWait::default()).notify(ProcessIdentity::new(4321), Some(0));

    assert_eq!(outcome, HandshakeOutcome::Acknowledged);
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(accountant.wait_for_lines(1, Duration::from_secs(1)), vec!["4321 0\n"]);
    assert_eq!(accountant.connections(), 1);
}

#[test]
fn test_ack_byte_content_is_ignored() {
    let accountant = FakeAccountant::start(Reply::Ack(0x00));

    let outcome = client(accountant.port(), AckWait::Unbounded).notify(ProcessIdentity::new(12), None);

    assert_eq!(outcome, HandshakeOutcome::Acknowledged);
    assert_eq!(accountant.wait_for_lines(1, Duration::from_secs(1)), vec!["12\n"]);
}

#[test]
fn test_close_releases_unbounded_wait() {
    let accountant = FakeAccountant::start(Reply::Close);

    let outcome = client(accountant.port(), AckWait::Unbounded).notify(ProcessIdentity::new(77), Some(2));

    assert_eq!(outcome, HandshakeOutcome::StreamClosed);
}

#[test]
fn test_silent_accountant_bounded_by_default_wait() {
    let accountant = FakeAccountant::start(Reply::Silent(Duration::from_secs(3)));

    let start = Instant::now();
    let outcome = client(accountant.port(), AckWait::default()).notify(ProcessIdentity::new(5), Some(0));
    let elapsed = start.elapsed();

    assert_eq!(outcome, HandshakeOutcome::TimedOut);
    assert!(elapsed >= Duration::from_millis(450), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2500), "returned after {:?}", elapsed);
}

#[test]
fn test_silent_accountant_holds_unbounded_wait_until_close() {
    let hold = Duration::from_millis(800);
    let accountant = FakeAccountant::start(Reply::Silent(hold));

    let start = Instant::now();
    let outcome = client(accountant.port(), AckWait::Unbounded).notify(ProcessIdentity::new(6), None);

    assert_eq!(outcome, HandshakeOutcome::StreamClosed);
    assert!(start.elapsed() >= Duration::from_millis(700));
}

#[test]
fn test_refused_connection_is_quiet_and_fast() {
    let start = Instant::now();
    let outcome = client(closed_port(), AckWait::Unbounded).notify(ProcessIdentity::new(9), Some(1));

    assert_eq!(outcome, HandshakeOutcome::Unreachable);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_one_connection_per_call() {
    let accountant = FakeAccountant::start(Reply::Ack(0x01));
    let client = client(accountant.port(), AckWait::default());

    client.notify(ProcessIdentity::new(1), Some(0));
    client.notify(ProcessIdentity::new(2), Some(0));

    let lines = accountant.wait_for_lines(2, Duration::from_secs(1));
    assert_eq!(accountant.connections(), 2);
    let mut parsed: Vec<_> = lines
        .iter()
        .map(|l| NotificationMessage::parse(l).unwrap().identity.pid)
        .collect();
    parsed.sort_unstable();
    assert_eq!(parsed, vec![1, 2]);
}
