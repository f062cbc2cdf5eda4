//! Replicated objects and the behavior trait.

use std::any::Any;
use std::fmt;

use value::{Frame, Time};

use crate::codec::{ByteSink, ByteSource};
use crate::error::{ReplicaError, ReplicaResult};

/// Maximum number of behaviors per object, bounded by the width of a mask.
pub const MAX_BEHAVIORS: usize = 32;

/// Identifier of a replicated object, shared by server and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates a new object ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw object ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unit of replicated state attached to a [`NetworkObject`].
///
/// The server calls [`prepare_unreliable_delta`](Self::prepare_unreliable_delta)
/// once per tick and, if it returns `true`, writes the delta for that frame.
/// The client reads deltas as packets arrive and calls
/// [`interpolate_state`](Self::interpolate_state) once per rendered frame.
pub trait NetworkBehavior: Any + Send {
    /// Returns whether this behavior has data to send for `frame`.
    fn prepare_unreliable_delta(&mut self, frame: Frame) -> bool;

    /// Writes the delta for `frame`.
    fn write_unreliable_delta(&mut self, frame: Frame, sink: &mut dyn ByteSink) -> ReplicaResult<()>;

    /// Reads a delta written by the server for `frame`.
    ///
    /// Deltas may arrive late, twice, or out of order.
    fn read_unreliable_delta(
        &mut self,
        frame: Frame,
        source: &mut dyn ByteSource,
    ) -> ReplicaResult<()>;

    /// Updates the presented state. `time_step` is in seconds.
    fn interpolate_state(&mut self, time_step: f32, replica_time: Time);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An object with an ordered list of behaviors.
pub struct NetworkObject {
    id: ObjectId,
    behaviors: Vec<Box<dyn NetworkBehavior>>,
}

impl NetworkObject {
    #[must_use]
    pub const fn new(id: ObjectId) -> Self {
        Self {
            id,
            behaviors: Vec::new(),
        }
    }

    /// Appends a behavior. Server and client must add behaviors in the same order.
    pub fn add_behavior<B: NetworkBehavior>(&mut self, behavior: B) -> ReplicaResult<()> {
        if self.behaviors.len() >= MAX_BEHAVIORS {
            return Err(ReplicaError::TooManyBehaviors {
                object: self.id.raw(),
                max: MAX_BEHAVIORS,
            });
        }
        self.behaviors.push(Box::new(behavior));
        Ok(())
    }

    /// Builder form of [`add_behavior`](Self::add_behavior).
    pub fn with_behavior<B: NetworkBehavior>(mut self, behavior: B) -> ReplicaResult<Self> {
        self.add_behavior(behavior)?;
        Ok(self)
    }

    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Returns the first behavior of type `B`.
    #[must_use]
    pub fn behavior<B: NetworkBehavior>(&self) -> Option<&B> {
        self.behaviors
            .iter()
            .find_map(|behavior| behavior.as_any().downcast_ref::<B>())
    }

    /// Returns the first behavior of type `B` mutably.
    pub fn behavior_mut<B: NetworkBehavior>(&mut self) -> Option<&mut B> {
        self.behaviors
            .iter_mut()
            .find_map(|behavior| behavior.as_any_mut().downcast_mut::<B>())
    }

    /// Asks every behavior whether it sends on `frame`. Bit `i` of the
    /// result is set for behavior `i`.
    pub fn prepare_unreliable_delta(&mut self, frame: Frame) -> u32 {
        let mut mask = 0u32;
        for (index, behavior) in self.behaviors.iter_mut().enumerate() {
            if behavior.prepare_unreliable_delta(frame) {
                mask |= 1 << index;
            }
        }
        mask
    }

    /// Writes the deltas of the behaviors selected by `mask`.
    pub fn write_unreliable_delta(
        &mut self,
        frame: Frame,
        mask: u32,
        sink: &mut dyn ByteSink,
    ) -> ReplicaResult<()> {
        self.check_mask(mask)?;
        for (index, behavior) in self.behaviors.iter_mut().enumerate() {
            if mask & (1 << index) != 0 {
                behavior.write_unreliable_delta(frame, sink)?;
            }
        }
        Ok(())
    }

    /// Reads the deltas of the behaviors selected by `mask`.
    pub fn read_unreliable_delta(
        &mut self,
        frame: Frame,
        mask: u32,
        source: &mut dyn ByteSource,
    ) -> ReplicaResult<()> {
        self.check_mask(mask)?;
        for (index, behavior) in self.behaviors.iter_mut().enumerate() {
            if mask & (1 << index) != 0 {
                behavior.read_unreliable_delta(frame, source)?;
            }
        }
        Ok(())
    }

    pub fn interpolate_state(&mut self, time_step: f32, replica_time: Time) {
        for behavior in &mut self.behaviors {
            behavior.interpolate_state(time_step, replica_time);
        }
    }

    fn check_mask(&self, mask: u32) -> ReplicaResult<()> {
        let count = self.behaviors.len();
        let unknown = mask.checked_shr(count as u32).unwrap_or(0);
        if unknown != 0 {
            return Err(ReplicaError::InvalidBehaviorMask {
                object: self.id.raw(),
                mask,
                behaviors: count,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for NetworkObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkObject")
            .field("id", &self.id)
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}
