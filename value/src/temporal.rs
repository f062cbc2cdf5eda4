//! Frame-indexed history of a single value.

use crate::frame::{Frame, Time};
use crate::ring::FrameRingBuffer;
use crate::traits::Interpolate;

/// Rolling history of one value per frame.
///
/// Writes outside the window are dropped, rewrites of a frame overwrite it,
/// and sampling between frames blends the nearest valid neighbours.
#[derive(Debug, Clone, Default)]
pub struct TemporalValue<T> {
    ring: FrameRingBuffer,
    values: Vec<T>,
}

impl<T: Clone + Default> TemporalValue<T> {
    /// Creates an empty history holding up to `capacity` frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut value = Self {
            ring: FrameRingBuffer::default(),
            values: Vec::new(),
        };
        value.resize(capacity);
        value
    }

    /// Drops all frames and changes the capacity.
    pub fn resize(&mut self, capacity: usize) {
        self.ring.resize(capacity);
        self.values.clear();
        self.values.resize(capacity, T::default());
    }

    /// Stores `value` at `frame`. Frames older than the window are ignored.
    pub fn set(&mut self, frame: Frame, value: T) {
        if self.ring.allocate_frame(frame) {
            let index = self.ring.index_in_window(frame);
            self.values[index] = value;
        }
    }

    /// Returns the value stored exactly at `frame`.
    #[must_use]
    pub fn get_raw(&self, frame: Frame) -> Option<&T> {
        self.ring
            .allocated_frame_to_index(frame)
            .map(|index| &self.values[index])
    }

    /// Returns the value at `frame` or the nearest valid frame before it.
    #[must_use]
    pub fn get_raw_or_prior(&self, frame: Frame) -> Option<(&T, Frame)> {
        let found = self.ring.find_closest_allocated_frame(frame, true, false)?;
        self.get_raw(found).map(|value| (value, found))
    }

    /// Returns the value at the nearest valid frame in either direction.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been written yet.
    #[must_use]
    pub fn get_closest_raw(&self, frame: Frame) -> &T {
        let closest = self.ring.closest_allocated_frame(frame);
        &self.values[self.ring.index_in_window(closest)]
    }
}

impl<T> TemporalValue<T> {
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.ring.is_initialized()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[must_use]
    pub fn first_frame(&self) -> Frame {
        self.ring.first_frame()
    }

    #[must_use]
    pub const fn last_frame(&self) -> Frame {
        self.ring.last_frame()
    }

    #[must_use]
    pub fn has_frame(&self, frame: Frame) -> bool {
        self.ring.has_frame(frame)
    }

    /// Changes whenever frame data is written or the history is resized.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.ring.revision()
    }

    /// Underlying validity bookkeeping.
    #[must_use]
    pub const fn ring(&self) -> &FrameRingBuffer {
        &self.ring
    }
}

impl<T: Interpolate> TemporalValue<T> {
    /// Samples at `time`, blending valid neighbours or falling back to the
    /// nearest valid frame.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been written yet.
    #[must_use]
    pub fn sample_valid(&self, time: Time, snap_threshold: f32) -> T {
        let interp = self.ring.valid_frame_interpolation(time);
        let first = &self.values[interp.first_index];
        if interp.is_degenerate() {
            return first.clone();
        }
        let second = &self.values[interp.second_index];
        first.interpolate(second, interp.blend_factor, snap_threshold)
    }

    /// Samples at `time` only if it lies within received data.
    ///
    /// Returns `None` for times after the newest frame, which would need
    /// extrapolation, and for an empty history.
    #[must_use]
    pub fn sample_precise(&self, time: Time, snap_threshold: f32) -> Option<T> {
        if !self.ring.is_initialized() {
            return None;
        }
        let last = self.ring.last_frame();
        if time.frame() > last || (time.frame() == last && !time.is_exact()) {
            return None;
        }
        Some(self.sample_valid(time, snap_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NO_SNAP;

    fn f(frame: i64) -> Frame {
        Frame::new(frame)
    }

    #[test]
    fn set_and_get_raw() {
        let mut value = TemporalValue::new(4);
        value.set(f(1), 10.0f32);
        assert_eq!(value.get_raw(f(1)), Some(&10.0));
        assert_eq!(value.get_raw(f(2)), None);
    }

    #[test]
    fn rewrite_overwrites() {
        let mut value = TemporalValue::new(4);
        value.set(f(1), 10.0f32);
        value.set(f(2), 20.0);
        value.set(f(1), 11.0);
        assert_eq!(value.get_raw(f(1)), Some(&11.0));
        assert_eq!(value.last_frame(), f(2));
    }

    #[test]
    fn stale_set_is_ignored() {
        let mut value = TemporalValue::new(2);
        value.set(f(10), 1.0f32);
        value.set(f(5), 2.0);
        assert_eq!(value.get_raw(f(5)), None);
        assert_eq!(value.get_raw(f(10)), Some(&1.0));
    }

    #[test]
    fn raw_or_prior() {
        let mut value = TemporalValue::new(8);
        value.set(f(2), 2.0f32);
        value.set(f(5), 5.0);
        assert_eq!(value.get_raw_or_prior(f(4)), Some((&2.0, f(2))));
        assert_eq!(value.get_raw_or_prior(f(5)), Some((&5.0, f(5))));
        assert_eq!(value.get_raw_or_prior(f(1)), None);
    }

    #[test]
    fn closest_raw() {
        let mut value = TemporalValue::new(8);
        value.set(f(2), 2.0f32);
        value.set(f(5), 5.0);
        assert_eq!(*value.get_closest_raw(f(0)), 2.0);
        assert_eq!(*value.get_closest_raw(f(4)), 2.0);
        assert_eq!(*value.get_closest_raw(f(9)), 5.0);
    }

    #[test]
    fn sample_valid_interpolates() {
        let mut value = TemporalValue::new(8);
        value.set(f(1), 10.0f32);
        value.set(f(2), 20.0);
        assert_eq!(value.sample_valid(Time::from_f64(1.5), NO_SNAP), 15.0);
        assert_eq!(value.sample_valid(Time::from_f64(2.0), NO_SNAP), 20.0);
        assert_eq!(value.sample_valid(Time::from_f64(3.5), NO_SNAP), 20.0);
        assert_eq!(value.sample_valid(Time::from_f64(0.5), NO_SNAP), 10.0);
    }

    #[test]
    fn sample_precise_refuses_future() {
        let mut value = TemporalValue::new(8);
        assert_eq!(value.sample_precise(Time::from_f64(0.0), NO_SNAP), None);
        value.set(f(1), 10.0f32);
        value.set(f(2), 20.0);
        assert_eq!(value.sample_precise(Time::from_f64(2.0), NO_SNAP), Some(20.0));
        assert_eq!(value.sample_precise(Time::from_f64(2.5), NO_SNAP), None);
        assert_eq!(value.sample_precise(Time::from_f64(1.5), NO_SNAP), Some(15.0));
    }

    #[test]
    fn sample_precise_accepts_near_exact_last_frame() {
        let mut value = TemporalValue::new(8);
        value.set(f(1), 10.0f32);
        value.set(f(2), 20.0);
        let almost = Time::new(f(2), Time::EXACT_EPSILON / 5.0);
        assert!(almost.is_exact());
        assert_eq!(value.sample_precise(almost, NO_SNAP), Some(20.0));
        assert_eq!(value.sample_precise(Time::new(f(2), 0.01), NO_SNAP), None);
    }

    #[test]
    fn far_future_frame_replaces_history() {
        let mut value = TemporalValue::new(15);
        for frame in -10..=-5 {
            value.set(f(frame), frame as f32);
        }
        value.set(f(i64::MAX), 3.0f32);
        assert_eq!(value.last_frame(), f(i64::MAX));
        assert_eq!(value.get_raw(f(i64::MAX)), Some(&3.0));
        assert_eq!(value.get_raw(f(-5)), None);
        assert_eq!(value.sample_valid(Time::from_frame(f(i64::MAX)), NO_SNAP), 3.0);
        assert_eq!(value.get_closest_raw(f(i64::MIN)), &3.0);
    }

    #[test]
    fn sample_snaps_when_far_apart() {
        let mut value = TemporalValue::new(8);
        value.set(f(1), 0.0f32);
        value.set(f(2), 100.0);
        assert_eq!(value.sample_valid(Time::from_f64(1.25), 10.0), 0.0);
        assert_eq!(value.sample_valid(Time::from_f64(1.75), 10.0), 100.0);
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn sample_valid_on_empty_panics() {
        let value = TemporalValue::<f32>::new(4);
        let _ = value.sample_valid(Time::from_f64(0.0), NO_SNAP);
    }
}
