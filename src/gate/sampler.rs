/*!
 * CPU Usage Sampling
 *
 * A `ResourceSample` is taken once, immediately before the gate decision,
 * and is never persisted.
 */

use crate::core::errors::HookResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accumulated user-mode CPU time of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Whole seconds
    pub seconds: i64,
    /// Sub-second remainder in microseconds
    pub micros: i64,
}

impl ResourceSample {
    pub const fn new(seconds: i64, micros: i64) -> Self {
        Self { seconds, micros }
    }

    /// Total user CPU time, clamping negative components to zero
    pub fn user_time(&self) -> Duration {
        Duration::from_secs(self.seconds.max(0) as u64)
            + Duration::from_micros(self.micros.max(0) as u64)
    }
}

/// Source of CPU usage samples
pub trait UsageSampler: Send + Sync {
    fn sample(&self) -> HookResult<ResourceSample>;
}

/// Samples `getrusage(RUSAGE_SELF)`
#[derive(Debug, Default, Clone, Copy)]
pub struct RusageSampler;

impl UsageSampler for RusageSampler {
    #[cfg(unix)]
    fn sample(&self) -> HookResult<ResourceSample> {
        use nix::sys::resource::{getrusage, UsageWho};

        let utime = getrusage(UsageWho::RUSAGE_SELF)?.user_time();
        Ok(ResourceSample::new(utime.tv_sec() as i64, utime.tv_usec() as i64))
    }

    #[cfg(not(unix))]
    fn sample(&self) -> HookResult<ResourceSample> {
        Err(crate::core::errors::HookError::NotSupported(
            "getrusage is not available on this platform".to_string(),
        ))
    }
}
