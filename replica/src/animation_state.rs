//! Replicated animation playback state.

use std::any::Any;

use glam::Quat;
use value::{Frame, SamplerSettings, TemporalValue, Time, ValueSampler, NO_SNAP};

use crate::codec::{ByteSink, ByteSource};
use crate::config::ReplicationConfig;
use crate::error::{ReplicaError, ReplicaResult};
use crate::object::NetworkBehavior;

/// Which clip is playing and how far into it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationSample {
    /// Index into the clip table shared by server and client.
    pub animation: u32,
    /// Playback position in seconds.
    pub time: f32,
}

impl AnimationSample {
    #[must_use]
    pub const fn new(animation: u32, time: f32) -> Self {
        Self { animation, time }
    }
}

/// Replicates the current clip and a facing rotation.
///
/// Clients replay the clip locally instead of receiving bone poses. The
/// state is sent on every recorded tick.
#[derive(Debug, Clone)]
pub struct ReplicatedAnimationState {
    clip_lengths: Vec<f32>,
    tick_duration: f32,
    samples: TemporalValue<AnimationSample>,
    rotation_trace: TemporalValue<Quat>,
    rotation_sampler: ValueSampler<Quat>,
    current: Option<AnimationSample>,
    rotation: Quat,
}

impl ReplicatedAnimationState {
    /// Creates the behavior for a clip table given as clip lengths in seconds.
    #[must_use]
    pub fn new(config: &ReplicationConfig, clip_lengths: Vec<f32>) -> Self {
        let capacity = config.trace_duration_in_frames();
        Self {
            clip_lengths,
            tick_duration: config.tick_duration(),
            samples: TemporalValue::new(capacity),
            rotation_trace: TemporalValue::new(capacity),
            rotation_sampler: ValueSampler::new(SamplerSettings::new(
                0,
                config.smoothing_constant,
                NO_SNAP,
            )),
            current: None,
            rotation: Quat::IDENTITY,
        }
    }

    /// Presented clip and playback position on the client.
    #[must_use]
    pub const fn current(&self) -> Option<AnimationSample> {
        self.current
    }

    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Records the authoritative state for `frame` on the server.
    pub fn record(&mut self, frame: Frame, sample: AnimationSample, rotation: Quat) -> ReplicaResult<()> {
        self.check_animation(sample.animation)?;
        self.samples.set(frame, sample);
        self.rotation_trace.set(frame, rotation.normalize());
        self.current = Some(sample);
        self.rotation = rotation;
        Ok(())
    }

    fn check_animation(&self, index: u32) -> ReplicaResult<()> {
        if index as usize >= self.clip_lengths.len() {
            return Err(ReplicaError::UnknownAnimation {
                index,
                available: self.clip_lengths.len(),
            });
        }
        Ok(())
    }

    /// Advances `sample` from `sample_frame` to `time`, wrapping at the clip end.
    fn advance(&self, sample: AnimationSample, sample_frame: Frame, time: Time) -> AnimationSample {
        let elapsed = time.ticks_since(sample_frame).max(0.0) as f32 * self.tick_duration;
        let length = self
            .clip_lengths
            .get(sample.animation as usize)
            .copied()
            .unwrap_or(0.0);
        let mut played = sample.time + elapsed;
        if length > 0.0 {
            played = played.rem_euclid(length);
        }
        AnimationSample::new(sample.animation, played)
    }
}

impl NetworkBehavior for ReplicatedAnimationState {
    fn prepare_unreliable_delta(&mut self, frame: Frame) -> bool {
        self.samples.has_frame(frame)
    }

    fn write_unreliable_delta(&mut self, frame: Frame, sink: &mut dyn ByteSink) -> ReplicaResult<()> {
        let sample = self.samples.get_closest_raw(frame);
        sink.write_vle(sample.animation)?;
        sink.write_f32(sample.time)?;
        sink.write_quat(*self.rotation_trace.get_closest_raw(frame))
    }

    fn read_unreliable_delta(
        &mut self,
        frame: Frame,
        source: &mut dyn ByteSource,
    ) -> ReplicaResult<()> {
        let animation = source.read_vle()?;
        let time = source.read_f32()?;
        let rotation = source.read_quat()?;
        self.check_animation(animation)?;
        self.samples.set(frame, AnimationSample::new(animation, time));
        self.rotation_trace.set(frame, rotation);
        Ok(())
    }

    fn interpolate_state(&mut self, time_step: f32, replica_time: Time) {
        if let Some(rotation) =
            self.rotation_sampler
                .update_and_sample(&self.rotation_trace, replica_time, time_step)
        {
            self.rotation = rotation;
        }
        if let Some((&sample, sample_frame)) = self.samples.get_raw_or_prior(replica_time.frame()) {
            self.current = Some(self.advance(sample, sample_frame, replica_time));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream::{BitReader, BitWriter};

    fn transfer(server: &mut ReplicatedAnimationState, client: &mut ReplicatedAnimationState, frame: i64) {
        let mut writer = BitWriter::new();
        server
            .write_unreliable_delta(Frame::new(frame), &mut writer)
            .unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        client
            .read_unreliable_delta(Frame::new(frame), &mut reader)
            .unwrap();
    }

    #[test]
    fn unknown_clip_rejected() {
        let mut state = ReplicatedAnimationState::new(&ReplicationConfig::for_testing(), vec![1.0]);
        assert!(matches!(
            state.record(Frame::new(0), AnimationSample::new(1, 0.0), Quat::IDENTITY),
            Err(ReplicaError::UnknownAnimation {
                index: 1,
                available: 1,
            })
        ));
    }

    #[test]
    fn always_sent_when_recorded() {
        let mut state = ReplicatedAnimationState::new(&ReplicationConfig::for_testing(), vec![1.0]);
        for frame in 0..5 {
            state
                .record(Frame::new(frame), AnimationSample::new(0, 0.5), Quat::IDENTITY)
                .unwrap();
            assert!(state.prepare_unreliable_delta(Frame::new(frame)));
        }
        assert!(!state.prepare_unreliable_delta(Frame::new(9)));
    }

    #[test]
    fn client_advances_from_prior_sample() {
        // 10 Hz: each tick is 0.1 s.
        let config = ReplicationConfig::for_testing();
        let mut server = ReplicatedAnimationState::new(&config, vec![1.0, 0.5]);
        let mut client = ReplicatedAnimationState::new(&config, vec![1.0, 0.5]);
        server
            .record(Frame::new(4), AnimationSample::new(1, 0.25), Quat::IDENTITY)
            .unwrap();
        transfer(&mut server, &mut client, 4);

        client.interpolate_state(0.1, Time::from_f64(5.0));
        let current = client.current().unwrap();
        assert_eq!(current.animation, 1);
        assert!((current.time - 0.35).abs() < 1e-5);

        // Wraps at the end of the 0.5 s clip.
        client.interpolate_state(0.1, Time::from_f64(7.0));
        assert!((client.current().unwrap().time - 0.05).abs() < 1e-5);
    }

    #[test]
    fn nothing_presented_before_first_sample() {
        let config = ReplicationConfig::for_testing();
        let mut server = ReplicatedAnimationState::new(&config, vec![1.0]);
        let mut client = ReplicatedAnimationState::new(&config, vec![1.0]);
        server
            .record(Frame::new(10), AnimationSample::new(0, 0.0), Quat::IDENTITY)
            .unwrap();
        transfer(&mut server, &mut client, 10);

        client.interpolate_state(0.1, Time::from_f64(8.0));
        assert_eq!(client.current(), None);
    }

    #[test]
    fn facing_rotation_is_interpolated_not_extrapolated() {
        let config = ReplicationConfig::for_testing();
        let mut server = ReplicatedAnimationState::new(&config, vec![1.0]);
        let mut client = ReplicatedAnimationState::new(&config, vec![1.0]);
        for frame in 0..2 {
            server
                .record(
                    Frame::new(frame),
                    AnimationSample::new(0, 0.0),
                    Quat::from_rotation_y(frame as f32),
                )
                .unwrap();
            transfer(&mut server, &mut client, frame);
        }

        client.interpolate_state(0.1, Time::from_f64(0.5));
        assert!(client.rotation().angle_between(Quat::from_rotation_y(0.5)) < 1e-4);

        let mut late = ReplicatedAnimationState::new(&config, vec![1.0]);
        transfer(&mut server, &mut late, 0);
        transfer(&mut server, &mut late, 1);
        late.interpolate_state(0.1, Time::from_f64(3.0));
        assert!(late.rotation().angle_between(Quat::from_rotation_y(1.0)) < 1e-4);
    }
}
