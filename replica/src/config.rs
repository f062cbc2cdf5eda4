//! Replication settings shared by server and client.

use blake3::Hasher;

use crate::error::{LimitKind, ReplicaError, ReplicaResult};
use crate::packet::PROTOCOL_VERSION;

/// Tuning for replicated behaviors.
///
/// Server and client must agree on `update_frequency`; the remaining fields
/// only shape local behavior.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReplicationConfig {
    /// Server ticks per second.
    pub update_frequency: u32,
    /// Seconds of history kept per value.
    pub trace_duration: f32,
    /// Ticks a change keeps being retransmitted.
    pub num_upload_attempts: u32,
    /// Position change (world units) that triggers retransmission.
    pub movement_threshold: f32,
    /// Rotation change (degrees) that triggers retransmission.
    pub rotation_threshold: f32,
    /// Error halvings per second for client-side correction.
    pub smoothing_constant: f32,
    /// Squared distance above which interpolation snaps.
    pub snap_threshold: f32,
    /// Ticks a client may extrapolate past the newest frame.
    pub max_extrapolation: u32,
    /// Ticks the replica timeline lags behind the estimated server time.
    pub interpolation_delay: f32,
    /// Upper bound on history frames per value.
    pub max_trace_frames: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            update_frequency: 30,
            trace_duration: 1.0,
            num_upload_attempts: 8,
            movement_threshold: 0.001,
            rotation_threshold: 0.01,
            smoothing_constant: 15.0,
            snap_threshold: 25.0,
            max_extrapolation: 6,
            interpolation_delay: 2.0,
            max_trace_frames: 4096,
        }
    }
}

impl ReplicationConfig {
    /// Creates a config with a short history for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            update_frequency: 10,
            trace_duration: 1.5,
            num_upload_attempts: 3,
            movement_threshold: 0.001,
            rotation_threshold: 0.01,
            smoothing_constant: 15.0,
            snap_threshold: 25.0,
            max_extrapolation: 4,
            interpolation_delay: 1.0,
            max_trace_frames: 256,
        }
    }

    /// Ring buffer capacity derived from `trace_duration`, at most
    /// `max_trace_frames`.
    #[must_use]
    pub fn trace_duration_in_frames(&self) -> usize {
        self.requested_trace_frames()
            .min(self.max_trace_frames)
            .max(1)
    }

    fn requested_trace_frames(&self) -> usize {
        let frames = (f64::from(self.trace_duration) * f64::from(self.update_frequency)).ceil();
        // Float to int casts saturate; NaN becomes zero.
        (frames as usize).max(1)
    }

    /// Seconds per server tick.
    #[must_use]
    pub fn tick_duration(&self) -> f32 {
        1.0 / self.update_frequency.max(1) as f32
    }

    /// Fingerprint of the settings that change the meaning of a packet.
    #[must_use]
    pub fn protocol_hash(&self) -> u64 {
        let mut hasher = Hasher::new();
        hasher.update(&[PROTOCOL_VERSION]);
        hasher.update(&self.update_frequency.to_le_bytes());
        let hash = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(prefix)
    }

    pub fn validate(&self) -> ReplicaResult<()> {
        if self.update_frequency == 0 {
            return Err(invalid("update_frequency", "must be positive"));
        }
        if !(self.trace_duration > 0.0) {
            return Err(invalid("trace_duration", "must be positive"));
        }
        if self.num_upload_attempts == 0 {
            return Err(invalid("num_upload_attempts", "must be positive"));
        }
        if !(self.movement_threshold >= 0.0) || !(self.rotation_threshold >= 0.0) {
            return Err(invalid("movement_threshold", "thresholds must be non-negative"));
        }
        if !(self.smoothing_constant >= 0.0) {
            return Err(invalid("smoothing_constant", "must be non-negative"));
        }
        if self.snap_threshold.is_nan() {
            return Err(invalid("snap_threshold", "must be a number"));
        }
        if !(self.interpolation_delay >= 0.0) {
            return Err(invalid("interpolation_delay", "must be non-negative"));
        }
        let frames = self.requested_trace_frames();
        if frames > self.max_trace_frames {
            return Err(ReplicaError::LimitsExceeded {
                kind: LimitKind::TraceFrames,
                limit: self.max_trace_frames,
                actual: frames,
            });
        }
        Ok(())
    }
}

const fn invalid(field: &'static str, reason: &'static str) -> ReplicaError {
    ReplicaError::InvalidConfig { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ReplicationConfig::default().validate().unwrap();
        ReplicationConfig::for_testing().validate().unwrap();
    }

    #[test]
    fn trace_capacity_rounds_up() {
        let config = ReplicationConfig::for_testing();
        assert_eq!(config.trace_duration_in_frames(), 15);

        let config = ReplicationConfig {
            trace_duration: 0.01,
            ..ReplicationConfig::default()
        };
        assert_eq!(config.trace_duration_in_frames(), 1);
    }

    #[test]
    fn protocol_hash_depends_on_frequency_only() {
        let base = ReplicationConfig::default();
        let tuned = ReplicationConfig {
            smoothing_constant: 3.0,
            ..base.clone()
        };
        let faster = ReplicationConfig {
            update_frequency: 60,
            ..base.clone()
        };
        assert_eq!(base.protocol_hash(), tuned.protocol_hash());
        assert_ne!(base.protocol_hash(), faster.protocol_hash());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ReplicationConfig {
            update_frequency: 0,
            ..ReplicationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReplicaError::InvalidConfig {
                field: "update_frequency",
                ..
            })
        ));

        let config = ReplicationConfig {
            trace_duration: f32::NAN,
            ..ReplicationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_history_is_rejected() {
        let config = ReplicationConfig {
            trace_duration: 1.0e12,
            ..ReplicationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReplicaError::LimitsExceeded {
                kind: LimitKind::TraceFrames,
                limit: 4096,
                ..
            })
        ));
        assert_eq!(config.trace_duration_in_frames(), 4096);

        let config = ReplicationConfig {
            trace_duration: f32::INFINITY,
            ..ReplicationConfig::default()
        };
        assert!(config.validate().is_err());

        let at_limit = ReplicationConfig {
            update_frequency: 64,
            trace_duration: 1.0,
            max_trace_frames: 64,
            ..ReplicationConfig::for_testing()
        };
        at_limit.validate().unwrap();
        assert_eq!(at_limit.trace_duration_in_frames(), 64);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_uses_defaults() {
        let config: ReplicationConfig =
            serde_json::from_str(r#"{ "update_frequency": 60 }"#).unwrap();
        assert_eq!(config.update_frequency, 60);
        assert_eq!(config.num_upload_attempts, ReplicationConfig::default().num_upload_attempts);
    }
}
