/*!
 * Hooked Worker
 *
 * A short-lived worker process with the accountant hook installed.
 *
 * Usage: hooked-worker <port> <spin_ms> <exit_code> [path]
 *
 * - port: loopback port the accountant listens on
 * - spin_ms: CPU time to burn before exiting
 * - exit_code: status to terminate with
 * - path: which teardown path to take (default: exit)
 *   - exit: `accountant_hook::exit`
 *   - return: return from `main` (atexit)
 *   - guard: `TeardownGuard` dropped with the status
 *   - std-exit: `std::process::exit` (atexit)
 *   - panic: panic unwinds through a live `TeardownGuard`
 *   - host-exit: a host teardown action calls `std::process::exit`
 *
 * The protocol variant comes from ACCOUNTANT_HOOK_VARIANT.
 */

use accountant_hook::gate::{RusageSampler, UsageSampler};
use accountant_hook::{init_tracing, AccountantEndpoint, HookConfig, TeardownGuard};
use std::hint::black_box;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info};

fn usage() -> ExitCode {
    eprintln!(
        "usage: hooked-worker <port> <spin_ms> <exit_code> [exit|return|guard|std-exit|panic|host-exit]"
    );
    ExitCode::from(64)
}

/// Burn at least `target` of user CPU time
///
/// Falls back to wall-clock time when usage cannot be sampled, and gives up
/// after ten times the target in wall-clock time on a starved machine.
fn spin(target: Duration) -> u64 {
    let start = Instant::now();
    let mut acc: u64 = 0;
    loop {
        let used = match RusageSampler.sample() {
            Ok(sample) => sample.user_time(),
            Err(_) => start.elapsed(),
        };
        if used >= target || start.elapsed() >= target * 10 {
            return acc;
        }
        for i in 0..100_000u64 {
            acc = black_box(acc.wrapping_mul(31).wrapping_add(i));
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        return usage();
    }

    let (port, spin_ms, code) = match (
        args[0].parse::<u16>(),
        args[1].parse::<u64>(),
        args[2].parse::<u8>(),
    ) {
        (Ok(port), Ok(spin_ms), Ok(code)) => (port, spin_ms, code),
        _ => return usage(),
    };
    let path = args.get(3).map(String::as_str).unwrap_or("exit");
    if !matches!(path, "exit" | "std-exit" | "guard" | "return" | "panic" | "host-exit") {
        return usage();
    }

    let config = HookConfig::from_env().with_endpoint(AccountantEndpoint::loopback(port));
    if let Err(e) = accountant_hook::install(config) {
        error!(error = %e, "accountant hook not installed");
    }

    if path == "host-exit" {
        let registered = accountant_hook::register_teardown("host-exit", 10, move |_| {
            std::process::exit(code.into());
        });
        if let Err(e) = registered {
            error!(error = %e, "host teardown not registered");
        }
    }

    // Only the guard paths rely on drop; "return" exercises the atexit trampoline
    let mut guard = matches!(path, "guard" | "panic").then(TeardownGuard::new);
    let checksum = spin(Duration::from_millis(spin_ms));
    info!(pid = std::process::id(), spin_ms, checksum, path, "worker finished");

    match path {
        "exit" | "host-exit" => accountant_hook::exit(code.into()),
        "panic" => panic!("worker failed after {}ms of work", spin_ms),
        "std-exit" => std::process::exit(code.into()),
        _ => {
            if let Some(guard) = guard.as_mut() {
                guard.set_status(code.into());
            }
            drop(guard);
            ExitCode::from(code)
        }
    }
}
