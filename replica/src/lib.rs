//! Replicated objects on top of [`value`] histories.
//!
//! The server records authoritative state into behaviors every tick and
//! [`ServerReplicator::tick`] gathers the behaviors that still owe a send
//! into a [`DeltaPacket`]. Packets travel over an unreliable channel; the
//! [`ClientReplicator`] applies whatever arrives, in any order, and
//! presents every object at a delayed replica time.
//!
//! # Features
//!
//! - Transforms with velocity extrapolation and correction smoothing
//! - Skeletal poses and animation playback state
//! - Redundant sends instead of acknowledgements
//! - Bounded, validated packet decoding
//!
//! # Example
//!
//! ```
//! use glam::{Quat, Vec3};
//! use replica::{
//!     encode_delta_packet, ClientReplicator, Frame, NetworkObject, ObjectId, PacketLimits,
//!     ReplicatedTransform, ReplicationConfig, ServerReplicator, Time, TransformSettings,
//! };
//!
//! let config = ReplicationConfig::for_testing();
//! let object = |config: &ReplicationConfig| {
//!     NetworkObject::new(ObjectId::new(1))
//!         .with_behavior(ReplicatedTransform::new(config, TransformSettings::default()))
//! };
//!
//! let mut server = ServerReplicator::new(config.clone())?;
//! server.add_object(object(&config)?)?;
//! let mut client = ClientReplicator::new(&config, PacketLimits::default())?;
//! client.add_object(object(&config)?)?;
//!
//! for frame in 0..4 {
//!     let frame = Frame::new(frame);
//!     let transform = server
//!         .behavior_mut::<ReplicatedTransform>(ObjectId::new(1))
//!         .unwrap();
//!     transform.record(frame, Vec3::new(frame.raw() as f32, 0.0, 0.0), Quat::IDENTITY);
//!     let bytes = encode_delta_packet(&server.tick(frame)?)?;
//!     client.apply_packet(&bytes)?;
//! }
//!
//! client.interpolate(1.0 / 60.0, Time::from_f64(3.5));
//! let transform = client
//!     .object(ObjectId::new(1))
//!     .and_then(|object| object.behavior::<ReplicatedTransform>())
//!     .unwrap();
//! assert!((transform.position().x - 2.5).abs() < 1e-4);
//! # Ok::<(), replica::ReplicaError>(())
//! ```

mod animation;
mod animation_state;
mod clock;
mod codec;
mod config;
mod error;
mod limits;
mod object;
mod packet;
mod redundancy;
mod replicator;
mod transform;

pub use animation::{BoneTransform, ReplicatedAnimation};
pub use animation_state::{AnimationSample, ReplicatedAnimationState};
pub use clock::ReplicaTimeline;
pub use codec::{ByteSink, ByteSource};
pub use config::ReplicationConfig;
pub use error::{LimitKind, ReplicaError, ReplicaResult};
pub use limits::PacketLimits;
pub use object::{NetworkBehavior, NetworkObject, ObjectId, MAX_BEHAVIORS};
pub use packet::{
    decode_delta_packet, encode_delta_packet, DeltaPacket, ObjectDelta, HEADER_SIZE, MAGIC,
    PROTOCOL_VERSION,
};
pub use redundancy::RedundancyCounter;
pub use replicator::{ClientReplicator, ServerReplicator};
pub use transform::{ReplicatedTransform, TransformSettings};
pub use value::{Frame, Time};
