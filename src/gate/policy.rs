/*!
 * Gate Policy
 *
 * A sample is trivial when it has less than one whole second AND less than
 * half a second of sub-second remainder. The boundary is part of the
 * accountant contract: `(0, 600_000)` is reported, `(0, 499_999)` is not.
 */

use super::sampler::{ResourceSample, RusageSampler, UsageSampler};
use crate::config::GatePolicy;
use crate::core::limits::{GATE_MIN_MICROS, GATE_MIN_SECONDS};
use tracing::{debug, warn};

/// Decide whether `sample` is worth a notification
#[inline]
pub fn should_notify(sample: &ResourceSample) -> bool {
    !(sample.seconds < GATE_MIN_SECONDS && sample.micros < GATE_MIN_MICROS)
}

/// Samples CPU usage and applies the gate policy
pub struct ResourceGate {
    policy: GatePolicy,
    sampler: Box<dyn UsageSampler>,
}

impl ResourceGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self::with_sampler(policy, Box::new(RusageSampler))
    }

    pub fn with_sampler(policy: GatePolicy, sampler: Box<dyn UsageSampler>) -> Self {
        Self { policy, sampler }
    }

    #[inline]
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Sample once and decide; a failed sample lets the notification through
    pub fn check(&self) -> bool {
        if self.policy == GatePolicy::Disabled {
            return true;
        }

        match self.sampler.sample() {
            Ok(sample) => {
                let notify = should_notify(&sample);
                debug!(
                    utime_sec = sample.seconds,
                    utime_usec = sample.micros,
                    notify,
                    "resource gate checked"
                );
                notify
            }
            Err(e) => {
                warn!(error = %e, "resource usage unavailable, notifying anyway");
                true
            }
        }
    }
}

impl std::fmt::Debug for ResourceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGate")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
