//! Continuous-time reconstruction of a [`TemporalValue`] on the client.
//!
//! A [`ValueSampler`] interpolates received frames, extrapolates past the
//! newest one up to a cap, and hides retroactive changes (late or corrected
//! data) behind an exponentially decaying correction offset.

use crate::frame::{Frame, Time};
use crate::temporal::TemporalValue;
use crate::traits::{ValueTraits, NO_SNAP};

/// Fraction of the remaining error removed over `time_step` seconds.
///
/// `smoothing_constant` is the number of error halvings per second.
#[must_use]
pub fn exp_smoothing(smoothing_constant: f32, time_step: f32) -> f32 {
    (1.0 - 2f32.powf(-smoothing_constant * time_step)).clamp(0.0, 1.0)
}

/// Tuning for a [`ValueSampler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    /// Maximum number of ticks to extrapolate past the newest frame.
    pub max_extrapolation: u32,
    /// Error halvings per second for correction smoothing.
    pub smoothing_constant: f32,
    /// Distance above which interpolation snaps instead of blending.
    pub snap_threshold: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            max_extrapolation: 0,
            smoothing_constant: 15.0,
            snap_threshold: NO_SNAP,
        }
    }
}

impl SamplerSettings {
    #[must_use]
    pub const fn new(max_extrapolation: u32, smoothing_constant: f32, snap_threshold: f32) -> Self {
        Self {
            max_extrapolation,
            smoothing_constant,
            snap_threshold,
        }
    }
}

/// How the current frame is evaluated, resolved once per frame.
#[derive(Debug, Clone)]
enum CachedSample<T> {
    Interpolation { first: T, second: T },
    Extrapolation { base_frame: Frame, base: T },
}

#[derive(Debug, Clone)]
struct SampleCache<T> {
    frame: Frame,
    revision: u64,
    sample: CachedSample<T>,
}

impl<T: ValueTraits + Default> SampleCache<T> {
    fn build(value: &TemporalValue<T>, frame: Frame, snap_threshold: f32) -> Self {
        let sample = match value.sample_precise(Time::from_frame(frame.next()), snap_threshold) {
            Some(second) => CachedSample::Interpolation {
                first: value.sample_valid(Time::from_frame(frame), snap_threshold),
                second,
            },
            None => {
                let base_frame = value.last_frame();
                CachedSample::Extrapolation {
                    base_frame,
                    base: value.get_closest_raw(base_frame).clone(),
                }
            }
        };
        Self {
            frame,
            revision: value.revision(),
            sample,
        }
    }

    const fn is_current(&self, frame: Frame, revision: u64) -> bool {
        self.frame.raw() == frame.raw() && self.revision == revision
    }

    fn evaluate(&self, time: Time, settings: &SamplerSettings) -> T::Output {
        match &self.sample {
            CachedSample::Interpolation { first, second } => first
                .interpolate(second, time.fraction(), settings.snap_threshold)
                .extract(),
            CachedSample::Extrapolation { base_frame, base } => {
                let ticks = time
                    .ticks_since(*base_frame)
                    .clamp(0.0, f64::from(settings.max_extrapolation));
                base.extrapolate(ticks as f32)
            }
        }
    }
}

/// Client-side reader producing a smooth value at arbitrary times.
#[derive(Debug, Clone)]
pub struct ValueSampler<T: ValueTraits> {
    settings: SamplerSettings,
    cache: Option<SampleCache<T>>,
    previous: Option<(Time, T::Output)>,
    correction: T::Correction,
}

impl<T: ValueTraits + Default> Default for ValueSampler<T> {
    fn default() -> Self {
        Self::new(SamplerSettings::default())
    }
}

impl<T: ValueTraits + Default> ValueSampler<T> {
    #[must_use]
    pub fn new(settings: SamplerSettings) -> Self {
        Self {
            settings,
            cache: None,
            previous: None,
            correction: T::no_correction(),
        }
    }

    /// Replaces the settings and resets all state.
    pub fn setup(&mut self, max_extrapolation: u32, smoothing_constant: f32, snap_threshold: f32) {
        self.settings = SamplerSettings::new(max_extrapolation, smoothing_constant, snap_threshold);
        self.reset();
    }

    #[must_use]
    pub const fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Current correction offset.
    #[must_use]
    pub const fn correction(&self) -> &T::Correction {
        &self.correction
    }

    /// Forgets the cached frame, the previous sample and the correction.
    pub fn reset(&mut self) {
        self.cache = None;
        self.previous = None;
        self.correction = T::no_correction();
    }

    /// Samples `value` at `time`, `time_step` seconds after the previous call.
    ///
    /// Returns `None` (and resets) while `value` holds no data.
    pub fn update_and_sample(
        &mut self,
        value: &TemporalValue<T>,
        time: Time,
        time_step: f32,
    ) -> Option<T::Output> {
        if !value.is_initialized() {
            self.reset();
            return None;
        }

        T::smooth_correction(
            &mut self.correction,
            exp_smoothing(self.settings.smoothing_constant, time_step),
        );

        // History may have changed since the previous sample; keep the
        // shown value continuous by moving the difference into the correction.
        if let Some((previous_time, previous_value)) = self.previous.take() {
            let recomputed = self.sample_uncorrected(value, previous_time);
            T::update_correction(&mut self.correction, &recomputed, &previous_value);
        }

        let predicted = self.sample_uncorrected(value, time);
        self.previous = Some((time, predicted.clone()));
        Some(T::apply_correction(&self.correction, predicted))
    }

    fn sample_uncorrected(&mut self, value: &TemporalValue<T>, time: Time) -> T::Output {
        let settings = self.settings;
        let frame = time.frame();
        let revision = value.revision();
        let cache = match self.cache.take() {
            Some(cache) if cache.is_current(frame, revision) => cache,
            _ => SampleCache::build(value, frame, settings.snap_threshold),
        };
        self.cache.insert(cache).evaluate(time, &settings)
    }
}
