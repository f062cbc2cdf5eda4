//! Replicated position and rotation.

use std::any::Any;

use glam::{Quat, Vec3};
use tracing::trace;
use value::{Frame, TemporalValue, Time, ValueSampler, ValueWithDerivative, NO_SNAP};

use crate::codec::{ByteSink, ByteSource};
use crate::config::ReplicationConfig;
use crate::error::ReplicaResult;
use crate::object::NetworkBehavior;
use crate::redundancy::RedundancyCounter;

type PositionTrace = TemporalValue<ValueWithDerivative<Vec3>>;
type RotationTrace = TemporalValue<ValueWithDerivative<Quat, Vec3>>;

/// Per-object switches for client-side prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSettings {
    /// Extrapolate position past the newest frame using velocity.
    pub extrapolate_position: bool,
    /// Extrapolate rotation past the newest frame using angular velocity.
    pub extrapolate_rotation: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            extrapolate_position: true,
            extrapolate_rotation: true,
        }
    }
}

/// Replicates a world transform from server to clients.
///
/// The server records one transform per tick with [`record`](Self::record).
/// Velocities are derived from the previous recorded frame and sent along,
/// so clients can extrapolate when packets are late.
#[derive(Debug, Clone)]
pub struct ReplicatedTransform {
    settings: TransformSettings,
    movement_threshold: f32,
    rotation_threshold: f32,
    position_trace: PositionTrace,
    rotation_trace: RotationTrace,
    position_sampler: ValueSampler<ValueWithDerivative<Vec3>>,
    rotation_sampler: ValueSampler<ValueWithDerivative<Quat, Vec3>>,
    redundancy: RedundancyCounter,
    last_uploaded: Option<(Vec3, Quat)>,
    position: Vec3,
    rotation: Quat,
}

impl ReplicatedTransform {
    #[must_use]
    pub fn new(config: &ReplicationConfig, settings: TransformSettings) -> Self {
        let capacity = config.trace_duration_in_frames();
        let extrapolation = |enabled: bool| if enabled { config.max_extrapolation } else { 0 };

        let mut position_sampler = ValueSampler::default();
        position_sampler.setup(
            extrapolation(settings.extrapolate_position),
            config.smoothing_constant,
            config.snap_threshold,
        );
        let mut rotation_sampler = ValueSampler::default();
        rotation_sampler.setup(
            extrapolation(settings.extrapolate_rotation),
            config.smoothing_constant,
            NO_SNAP,
        );

        Self {
            settings,
            movement_threshold: config.movement_threshold,
            rotation_threshold: config.rotation_threshold.to_radians(),
            position_trace: TemporalValue::new(capacity),
            rotation_trace: TemporalValue::new(capacity),
            position_sampler,
            rotation_sampler,
            redundancy: RedundancyCounter::new(config.num_upload_attempts),
            last_uploaded: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    /// Latest recorded transform on the server, presented transform on the client.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    #[must_use]
    pub const fn position_trace(&self) -> &PositionTrace {
        &self.position_trace
    }

    #[must_use]
    pub const fn rotation_trace(&self) -> &RotationTrace {
        &self.rotation_trace
    }

    /// Records the authoritative transform for `frame` on the server.
    pub fn record(&mut self, frame: Frame, position: Vec3, rotation: Quat) {
        let rotation = rotation.normalize();
        let (velocity, angular_velocity) = self.derivatives(frame, position, rotation);

        self.position_trace
            .set(frame, ValueWithDerivative::new(position, velocity));
        self.rotation_trace
            .set(frame, ValueWithDerivative::new(rotation, angular_velocity));
        self.position = position;
        self.rotation = rotation;

        let changed = self.last_uploaded.map_or(true, |(last_position, last_rotation)| {
            position.distance(last_position) > self.movement_threshold
                || last_rotation.angle_between(rotation) > self.rotation_threshold
        });
        if changed {
            trace!(frame = frame.raw(), "transform changed, resetting redundancy");
            self.redundancy.reset();
            self.last_uploaded = Some((position, rotation));
        }
    }

    /// Samples the server-side history, e.g. to rewind for hit checks.
    #[must_use]
    pub fn sample(&self, time: Time) -> Option<(Vec3, Quat)> {
        if !self.position_trace.is_initialized() {
            return None;
        }
        let position = self.position_trace.sample_valid(time, NO_SNAP).value;
        let rotation = self.rotation_trace.sample_valid(time, NO_SNAP).value;
        Some((position, rotation))
    }

    /// Per-tick velocities relative to the nearest earlier recorded frame.
    fn derivatives(&self, frame: Frame, position: Vec3, rotation: Quat) -> (Vec3, Vec3) {
        let Some(previous) = frame.raw().checked_sub(1).map(Frame::new) else {
            return (Vec3::ZERO, Vec3::ZERO);
        };
        let previous_position = self.position_trace.get_raw_or_prior(previous);
        let previous_rotation = self.rotation_trace.get_raw_or_prior(previous);
        match (previous_position, previous_rotation) {
            (Some((p, p_frame)), Some((r, r_frame))) if p_frame == r_frame => {
                let ticks = frame.ticks_after(p_frame) as f32;
                let velocity = (position - p.value) / ticks;
                let mut delta = rotation * r.value.inverse();
                if delta.w < 0.0 {
                    delta = -delta;
                }
                (velocity, delta.to_scaled_axis() / ticks)
            }
            _ => (Vec3::ZERO, Vec3::ZERO),
        }
    }
}

impl NetworkBehavior for ReplicatedTransform {
    fn prepare_unreliable_delta(&mut self, frame: Frame) -> bool {
        self.position_trace.has_frame(frame) && self.redundancy.consume()
    }

    fn write_unreliable_delta(&mut self, frame: Frame, sink: &mut dyn ByteSink) -> ReplicaResult<()> {
        let position = self.position_trace.get_closest_raw(frame);
        let rotation = self.rotation_trace.get_closest_raw(frame);
        sink.write_vec3(position.value)?;
        sink.write_vec3(position.derivative)?;
        sink.write_quat(rotation.value)?;
        sink.write_vec3(rotation.derivative)
    }

    fn read_unreliable_delta(
        &mut self,
        frame: Frame,
        source: &mut dyn ByteSource,
    ) -> ReplicaResult<()> {
        let position = source.read_vec3()?;
        let velocity = source.read_vec3()?;
        let rotation = source.read_quat()?;
        let angular_velocity = source.read_vec3()?;
        self.position_trace
            .set(frame, ValueWithDerivative::new(position, velocity));
        self.rotation_trace
            .set(frame, ValueWithDerivative::new(rotation, angular_velocity));
        Ok(())
    }

    fn interpolate_state(&mut self, time_step: f32, replica_time: Time) {
        if let Some(position) =
            self.position_sampler
                .update_and_sample(&self.position_trace, replica_time, time_step)
        {
            self.position = position;
        }
        if let Some(rotation) =
            self.rotation_sampler
                .update_and_sample(&self.rotation_trace, replica_time, time_step)
        {
            self.rotation = rotation;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
