//! Mapping from estimated server time to the time a client presents.

use value::Time;

use crate::config::ReplicationConfig;

/// Keeps the presented state a fixed number of ticks behind the server.
///
/// The delay leaves room for late packets to fill gaps before the client
/// needs them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicaTimeline {
    interpolation_delay: f64,
    update_frequency: u32,
}

impl ReplicaTimeline {
    #[must_use]
    pub fn new(config: &ReplicationConfig) -> Self {
        Self {
            interpolation_delay: f64::from(config.interpolation_delay.max(0.0)),
            update_frequency: config.update_frequency.max(1),
        }
    }

    /// Delay in ticks.
    #[must_use]
    pub const fn interpolation_delay(&self) -> f64 {
        self.interpolation_delay
    }

    /// Converts seconds since server frame zero into server time.
    #[must_use]
    pub fn server_time_from_seconds(&self, seconds: f64) -> Time {
        Time::from_f64(seconds * f64::from(self.update_frequency))
    }

    /// Time at which replicated state is sampled.
    #[must_use]
    pub fn replica_time(&self, estimated_server_time: Time) -> Time {
        estimated_server_time - self.interpolation_delay
    }
}
