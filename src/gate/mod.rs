/*!
 * Resource Gate
 * Decides whether a process used enough CPU to be worth reporting
 */

mod policy;
mod sampler;

pub use policy::{should_notify, ResourceGate};
pub use sampler::{ResourceSample, RusageSampler, UsageSampler};
