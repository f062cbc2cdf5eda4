//! Server and client object registries driving the per-tick exchange.

use std::collections::BTreeMap;

use bitstream::{BitReader, BitWriter};
use tracing::debug;
use value::{Frame, Time};

use crate::clock::ReplicaTimeline;
use crate::config::ReplicationConfig;
use crate::error::{ReplicaError, ReplicaResult};
use crate::limits::PacketLimits;
use crate::object::{NetworkBehavior, NetworkObject, ObjectId};
use crate::packet::{decode_delta_packet, DeltaPacket, ObjectDelta};

/// Registry of objects shared by both replicator sides.
#[derive(Debug, Default)]
struct Registry {
    objects: BTreeMap<ObjectId, NetworkObject>,
}

impl Registry {
    fn add(&mut self, object: NetworkObject) -> ReplicaResult<()> {
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Err(ReplicaError::DuplicateObject { object: id.raw() });
        }
        self.objects.insert(id, object);
        Ok(())
    }

    fn behavior_mut<B: NetworkBehavior>(&mut self, id: ObjectId) -> Option<&mut B> {
        self.objects.get_mut(&id)?.behavior_mut::<B>()
    }
}

/// Authoritative side: collects dirty behaviors into one packet per tick.
#[derive(Debug)]
pub struct ServerReplicator {
    config: ReplicationConfig,
    protocol_hash: u64,
    registry: Registry,
}

impl ServerReplicator {
    pub fn new(config: ReplicationConfig) -> ReplicaResult<Self> {
        config.validate()?;
        Ok(Self {
            protocol_hash: config.protocol_hash(),
            config,
            registry: Registry::default(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Registers an object. IDs must be unique.
    pub fn add_object(&mut self, object: NetworkObject) -> ReplicaResult<()> {
        self.registry.add(object)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<NetworkObject> {
        self.registry.objects.remove(&id)
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&NetworkObject> {
        self.registry.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut NetworkObject> {
        self.registry.objects.get_mut(&id)
    }

    /// Returns behavior `B` of object `id`.
    pub fn behavior_mut<B: NetworkBehavior>(&mut self, id: ObjectId) -> Option<&mut B> {
        self.registry.behavior_mut(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.objects.is_empty()
    }

    /// Builds the delta packet for `frame`.
    ///
    /// Objects appear in ascending ID order; objects with nothing to send
    /// are left out.
    pub fn tick(&mut self, frame: Frame) -> ReplicaResult<DeltaPacket> {
        let mut packet = DeltaPacket::new(frame, self.protocol_hash);
        for (&id, object) in &mut self.registry.objects {
            let mask = object.prepare_unreliable_delta(frame);
            if mask == 0 {
                continue;
            }
            let mut writer = BitWriter::new();
            object.write_unreliable_delta(frame, mask, &mut writer)?;
            packet.objects.push(ObjectDelta {
                id,
                mask,
                payload: writer.finish(),
            });
        }
        Ok(packet)
    }
}

/// Receiving side: applies packets in any order and presents a delayed,
/// smoothed view of every object.
#[derive(Debug)]
pub struct ClientReplicator {
    protocol_hash: u64,
    limits: PacketLimits,
    timeline: ReplicaTimeline,
    registry: Registry,
    latest_frame: Option<Frame>,
}

impl ClientReplicator {
    pub fn new(config: &ReplicationConfig, limits: PacketLimits) -> ReplicaResult<Self> {
        config.validate()?;
        Ok(Self {
            protocol_hash: config.protocol_hash(),
            limits,
            timeline: ReplicaTimeline::new(config),
            registry: Registry::default(),
            latest_frame: None,
        })
    }

    /// Registers the local counterpart of a server object.
    pub fn add_object(&mut self, object: NetworkObject) -> ReplicaResult<()> {
        self.registry.add(object)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<NetworkObject> {
        self.registry.objects.remove(&id)
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&NetworkObject> {
        self.registry.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut NetworkObject> {
        self.registry.objects.get_mut(&id)
    }

    pub fn behavior_mut<B: NetworkBehavior>(&mut self, id: ObjectId) -> Option<&mut B> {
        self.registry.behavior_mut(id)
    }

    #[must_use]
    pub const fn timeline(&self) -> &ReplicaTimeline {
        &self.timeline
    }

    /// Newest frame received so far.
    #[must_use]
    pub const fn latest_frame(&self) -> Option<Frame> {
        self.latest_frame
    }

    /// Decodes and applies an encoded packet, returning its frame.
    pub fn apply_packet(&mut self, bytes: &[u8]) -> ReplicaResult<Frame> {
        let packet = decode_delta_packet(bytes, &self.limits)?;
        self.apply_delta_packet(&packet)?;
        Ok(packet.frame)
    }

    /// Applies a decoded packet.
    ///
    /// Deltas for unknown objects are skipped. On error, objects earlier in
    /// the packet stay applied.
    pub fn apply_delta_packet(&mut self, packet: &DeltaPacket) -> ReplicaResult<()> {
        if packet.protocol_hash != self.protocol_hash {
            return Err(ReplicaError::ProtocolMismatch {
                expected: self.protocol_hash,
                found: packet.protocol_hash,
            });
        }

        let frame = packet.frame;
        if let Some(latest) = self.latest_frame {
            if frame < latest {
                debug!(
                    frame = frame.raw(),
                    latest = latest.raw(),
                    "applying late packet"
                );
            }
        }

        for delta in &packet.objects {
            let Some(object) = self.registry.objects.get_mut(&delta.id) else {
                debug!(object = delta.id.raw(), frame = frame.raw(), "skipping unknown object");
                continue;
            };
            let mut reader = BitReader::new(&delta.payload);
            object.read_unreliable_delta(frame, delta.mask, &mut reader)?;
            if !reader.is_empty() {
                return Err(ReplicaError::TrailingData {
                    remaining_bits: reader.bits_remaining(),
                });
            }
        }

        self.latest_frame = Some(self.latest_frame.map_or(frame, |latest| latest.max(frame)));
        Ok(())
    }

    /// Updates every object for the current render frame.
    ///
    /// `time_step` is in seconds. Returns the replica time that was sampled.
    pub fn interpolate(&mut self, time_step: f32, estimated_server_time: Time) -> Time {
        let replica_time = self.timeline.replica_time(estimated_server_time);
        for object in self.registry.objects.values_mut() {
            object.interpolate_state(time_step, replica_time);
        }
        replica_time
    }
}
