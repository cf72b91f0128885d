/*!
 * Fake Accountant
 * Minimal loopback listener that records notification lines
 */

#![allow(dead_code)]

use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How the fake accountant answers after reading a line
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Write one byte
    Ack(u8),
    /// Close without writing
    Close,
    /// Hold the connection open, then close
    Silent(Duration),
}

pub struct FakeAccountant {
    port: u16,
    lines: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeAccountant {
    pub fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();

        let lines = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let lines = lines.clone();
            let connections = connections.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            connections.fetch_add(1, Ordering::SeqCst);
                            let lines = lines.clone();
                            thread::spawn(move || serve(stream, reply, lines));
                        }
                        Err(_) => thread::sleep(Duration::from_millis(5)),
                    }
                }
            })
        };

        Self {
            port,
            lines,
            connections,
            stop,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Wait until `count` lines were recorded or `timeout` passes
    pub fn wait_for_lines(&self, count: usize, timeout: Duration) -> Vec<String> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.lines.lock().len() >= count {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.lines()
    }
}

impl Drop for FakeAccountant {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(stream: TcpStream, reply: Reply, lines: Arc<Mutex<Vec<String>>>) {
    stream.set_nonblocking(false).unwrap();
    let mut line = String::new();
    if BufReader::new(&stream).read_line(&mut line).is_err() {
        return;
    }
    lines.lock().push(line);

    match reply {
        Reply::Ack(byte) => {
            let _ = (&stream).write_all(&[byte]);
        }
        Reply::Close => {}
        Reply::Silent(hold) => thread::sleep(hold),
    }
}

/// A loopback port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
