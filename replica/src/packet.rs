//! Delta packet framing.
//!
//! A packet carries every dirty object of one server frame:
//!
//! ```text
//! magic u16 | version u8 | protocol hash u64 | frame u64 | object count VLE
//! per object: id VLE | behavior mask VLE | payload length VLE | payload
//! ```
//!
//! All fields are byte aligned and little-endian.

use bitstream::{BitReader, BitWriter};
use value::Frame;

use crate::error::{LimitKind, ReplicaError, ReplicaResult};
use crate::limits::PacketLimits;
use crate::object::ObjectId;

/// Magic number identifying delta packets ("RT").
pub const MAGIC: u16 = 0x5254;

/// Current wire format version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the fixed part of the header.
pub const HEADER_SIZE: usize = 2 + 1 + 8 + 8;

/// Smallest possible encoded object delta (three one-byte varints).
const MIN_OBJECT_SIZE: usize = 3;

/// Changes of one object within a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDelta {
    pub id: ObjectId,
    /// Bit `i` is set when behavior `i` wrote a payload.
    pub mask: u32,
    /// Concatenated payloads of the masked behaviors, in behavior order.
    pub payload: Vec<u8>,
}

/// All object deltas produced by one server tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaPacket {
    pub frame: Frame,
    pub protocol_hash: u64,
    pub objects: Vec<ObjectDelta>,
}

impl DeltaPacket {
    /// Creates an empty packet.
    #[must_use]
    pub const fn new(frame: Frame, protocol_hash: u64) -> Self {
        Self {
            frame,
            protocol_hash,
            objects: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Encodes a packet into bytes.
pub fn encode_delta_packet(packet: &DeltaPacket) -> ReplicaResult<Vec<u8>> {
    let payload_bytes: usize = packet.objects.iter().map(|o| o.payload.len() + 8).sum();
    let mut writer = BitWriter::with_capacity(HEADER_SIZE + 5 + payload_bytes);

    writer.write_u16_aligned(MAGIC)?;
    writer.write_u8_aligned(PROTOCOL_VERSION)?;
    writer.write_u64_aligned(packet.protocol_hash)?;
    writer.write_u64_aligned(packet.frame.raw() as u64)?;
    writer.write_varu32(count_u32(packet.objects.len(), LimitKind::Objects)?)?;

    for object in &packet.objects {
        writer.write_varu32(object.id.raw())?;
        writer.write_varu32(object.mask)?;
        writer.write_varu32(count_u32(object.payload.len(), LimitKind::PayloadBytes)?)?;
        writer.write_bytes_aligned(&object.payload)?;
    }

    Ok(writer.finish())
}

/// Decodes a packet, enforcing `limits`.
///
/// Trailing bytes after the last object are rejected.
pub fn decode_delta_packet(bytes: &[u8], limits: &PacketLimits) -> ReplicaResult<DeltaPacket> {
    if bytes.len() > limits.max_packet_bytes {
        return Err(ReplicaError::LimitsExceeded {
            kind: LimitKind::PacketBytes,
            limit: limits.max_packet_bytes,
            actual: bytes.len(),
        });
    }

    let mut reader = BitReader::new(bytes);
    let magic = reader.read_u16_aligned()?;
    if magic != MAGIC {
        return Err(ReplicaError::InvalidMagic { found: magic });
    }
    let version = reader.read_u8_aligned()?;
    if version != PROTOCOL_VERSION {
        return Err(ReplicaError::UnsupportedVersion { found: version });
    }
    let protocol_hash = reader.read_u64_aligned()?;
    let frame = Frame::new(reader.read_u64_aligned()? as i64);

    let count = reader.read_varu32()? as usize;
    if count > limits.max_objects {
        return Err(ReplicaError::LimitsExceeded {
            kind: LimitKind::Objects,
            limit: limits.max_objects,
            actual: count,
        });
    }

    let mut objects = Vec::with_capacity(count.min(reader.bits_remaining() / 8 / MIN_OBJECT_SIZE));
    for _ in 0..count {
        let id = ObjectId::new(reader.read_varu32()?);
        let mask = reader.read_varu32()?;
        let len = reader.read_varu32()? as usize;
        if len > limits.max_payload_bytes {
            return Err(ReplicaError::LimitsExceeded {
                kind: LimitKind::PayloadBytes,
                limit: limits.max_payload_bytes,
                actual: len,
            });
        }
        let payload = reader.read_bytes_aligned(len)?.to_vec();
        objects.push(ObjectDelta { id, mask, payload });
    }

    if !reader.is_empty() {
        return Err(ReplicaError::TrailingData {
            remaining_bits: reader.bits_remaining(),
        });
    }

    Ok(DeltaPacket {
        frame,
        protocol_hash,
        objects,
    })
}

fn count_u32(count: usize, kind: LimitKind) -> ReplicaResult<u32> {
    u32::try_from(count).map_err(|_| ReplicaError::LimitsExceeded {
        kind,
        limit: u32::MAX as usize,
        actual: count,
    })
}
