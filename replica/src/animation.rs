//! Replicated skeletal poses.

use std::any::Any;

use glam::{Quat, Vec3};
use value::{Frame, InterpolatedSpan, Interpolate, TemporalValueArray, Time};

use crate::codec::{ByteSink, ByteSource};
use crate::config::ReplicationConfig;
use crate::error::{ReplicaError, ReplicaResult};
use crate::object::NetworkBehavior;

/// Local transform of one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTransform {
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Interpolate for BoneTransform {
    fn blend(&self, other: &Self, factor: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, factor),
            rotation: self.rotation.slerp(other.rotation, factor),
            scale: self.scale.lerp(other.scale, factor),
        }
    }

    fn snap_distance(&self, other: &Self) -> f32 {
        self.position.distance_squared(other.position)
    }
}

/// Replicates the full pose of a skeleton every recorded tick.
///
/// The server keeps the pose history too, so hit checks can rewind to the
/// time a client saw.
#[derive(Debug, Clone)]
pub struct ReplicatedAnimation {
    snap_threshold: f32,
    trace: TemporalValueArray<BoneTransform>,
    scratch: Vec<BoneTransform>,
    pose: Vec<BoneTransform>,
}

impl ReplicatedAnimation {
    /// Creates a behavior for a skeleton with `bone_count` bones (at least one).
    #[must_use]
    pub fn new(config: &ReplicationConfig, bone_count: usize) -> Self {
        let trace = TemporalValueArray::new(bone_count, config.trace_duration_in_frames());
        let pose = vec![BoneTransform::default(); trace.len()];
        Self {
            snap_threshold: config.snap_threshold,
            trace,
            scratch: Vec::new(),
            pose,
        }
    }

    #[must_use]
    pub const fn bone_count(&self) -> usize {
        self.trace.len()
    }

    /// Presented pose on the client.
    #[must_use]
    pub fn pose(&self) -> &[BoneTransform] {
        &self.pose
    }

    /// Returns the slot for `frame` to be filled in place on the server.
    ///
    /// Returns `None` when the frame is older than the history.
    pub fn pose_mut(&mut self, frame: Frame) -> Option<&mut [BoneTransform]> {
        self.trace.set_uninitialized(frame)
    }

    /// Records a full pose for `frame` on the server.
    pub fn record(&mut self, frame: Frame, bones: &[BoneTransform]) -> ReplicaResult<()> {
        if bones.len() != self.bone_count() {
            return Err(ReplicaError::BoneCountMismatch {
                expected: self.bone_count(),
                found: bones.len(),
            });
        }
        self.trace.set(frame, bones);
        Ok(())
    }

    /// Samples the pose history at `time`.
    #[must_use]
    pub fn sample_pose(&self, time: Time) -> Option<InterpolatedSpan<'_, BoneTransform>> {
        self.trace
            .is_initialized()
            .then(|| self.trace.sample_valid(time, self.snap_threshold))
    }
}

impl NetworkBehavior for ReplicatedAnimation {
    fn prepare_unreliable_delta(&mut self, frame: Frame) -> bool {
        self.trace.has_frame(frame)
    }

    fn write_unreliable_delta(&mut self, frame: Frame, sink: &mut dyn ByteSink) -> ReplicaResult<()> {
        let bones = self.trace.get_closest_raw(frame);
        sink.write_vle(bones.len() as u32)?;
        for bone in bones {
            sink.write_vec3(bone.position)?;
            sink.write_quat(bone.rotation)?;
            sink.write_vec3(bone.scale)?;
        }
        Ok(())
    }

    fn read_unreliable_delta(
        &mut self,
        frame: Frame,
        source: &mut dyn ByteSource,
    ) -> ReplicaResult<()> {
        let found = source.read_vle()? as usize;
        if found != self.bone_count() {
            return Err(ReplicaError::BoneCountMismatch {
                expected: self.bone_count(),
                found,
            });
        }

        self.scratch.clear();
        for _ in 0..found {
            let position = source.read_vec3()?;
            let rotation = source.read_quat()?;
            let scale = source.read_vec3()?;
            self.scratch
                .push(BoneTransform::new(position, rotation, scale));
        }
        self.trace.set(frame, &self.scratch);
        Ok(())
    }

    fn interpolate_state(&mut self, _time_step: f32, replica_time: Time) {
        if !self.trace.is_initialized() {
            return;
        }
        let span = self.trace.sample_valid(replica_time, self.snap_threshold);
        self.pose.clear();
        self.pose.extend(span.iter());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
