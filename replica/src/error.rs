//! Error types for replication.

use std::fmt;

/// Result type for replication operations.
pub type ReplicaResult<T> = Result<T, ReplicaError>;

/// Errors that can occur while encoding, decoding or applying replicated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaError {
    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// Packet does not start with the expected magic number.
    InvalidMagic { found: u16 },

    /// Packet was produced by an unsupported protocol version.
    UnsupportedVersion { found: u8 },

    /// Packet was produced with incompatible replication settings.
    ProtocolMismatch { expected: u64, found: u64 },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Input had trailing bytes after parsing.
    TrailingData { remaining_bits: usize },

    /// Behavior mask refers to behaviors the object does not have.
    InvalidBehaviorMask {
        object: u32,
        mask: u32,
        behaviors: usize,
    },

    /// Object is already registered.
    DuplicateObject { object: u32 },

    /// Object has more behaviors than a mask can address.
    TooManyBehaviors { object: u32, max: usize },

    /// Animation payload has a different skeleton size.
    BoneCountMismatch { expected: usize, found: usize },

    /// Animation state refers to an unknown clip.
    UnknownAnimation { index: u32, available: usize },

    /// Configuration value is unusable.
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    PacketBytes,
    Objects,
    PayloadBytes,
    TraceFrames,
}

impl fmt::Display for ReplicaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::InvalidMagic { found } => {
                write!(f, "invalid packet magic 0x{found:04X}")
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported protocol version {found}")
            }
            Self::ProtocolMismatch { expected, found } => {
                write!(
                    f,
                    "protocol hash mismatch: expected 0x{expected:016X}, found 0x{found:016X}"
                )
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::TrailingData { remaining_bits } => {
                write!(f, "trailing data after payload: {remaining_bits} bits")
            }
            Self::InvalidBehaviorMask {
                object,
                mask,
                behaviors,
            } => {
                write!(
                    f,
                    "behavior mask 0b{mask:b} is invalid for object {object} with {behaviors} behaviors"
                )
            }
            Self::DuplicateObject { object } => {
                write!(f, "object {object} is already registered")
            }
            Self::TooManyBehaviors { object, max } => {
                write!(f, "object {object} has more than {max} behaviors")
            }
            Self::BoneCountMismatch { expected, found } => {
                write!(f, "expected {expected} bones, found {found}")
            }
            Self::UnknownAnimation { index, available } => {
                write!(f, "animation {index} is unknown, {available} available")
            }
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid config field {field}: {reason}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PacketBytes => "packet bytes",
            Self::Objects => "objects",
            Self::PayloadBytes => "payload bytes",
            Self::TraceFrames => "trace frames",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for ReplicaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bitstream::BitError> for ReplicaError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}
