//! Limits enforced while decoding delta packets.

/// Bounds applied to untrusted packet input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketLimits {
    /// Maximum size of a whole packet.
    pub max_packet_bytes: usize,
    /// Maximum number of object deltas in a packet.
    pub max_objects: usize,
    /// Maximum payload size of a single object delta.
    pub max_payload_bytes: usize,
}

impl Default for PacketLimits {
    fn default() -> Self {
        Self {
            max_packet_bytes: 64 * 1024,
            max_objects: 4096,
            max_payload_bytes: 16 * 1024,
        }
    }
}

impl PacketLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 4096,
            max_objects: 64,
            max_payload_bytes: 1024,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_packet_bytes: usize::MAX,
            max_objects: usize::MAX,
            max_payload_bytes: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_limits_smaller() {
        let test_limits = PacketLimits::for_testing();
        let default_limits = PacketLimits::default();
        assert!(test_limits.max_objects < default_limits.max_objects);
        assert!(test_limits.max_packet_bytes < default_limits.max_packet_bytes);
    }

    #[test]
    fn unlimited_limits() {
        let limits = PacketLimits::unlimited();
        assert_eq!(limits.max_objects, usize::MAX);
        assert_eq!(limits.max_payload_bytes, usize::MAX);
    }
}
