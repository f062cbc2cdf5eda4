//! Frame-indexed history of a fixed-size array of values.

use crate::frame::{Frame, Time};
use crate::ring::FrameRingBuffer;
use crate::traits::Interpolate;

/// Rolling history of `len` values per frame, stored contiguously.
#[derive(Debug, Clone, Default)]
pub struct TemporalValueArray<T> {
    ring: FrameRingBuffer,
    len: usize,
    values: Vec<T>,
}

impl<T: Clone + Default> TemporalValueArray<T> {
    /// Creates an empty history of `len` elements per frame.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(len: usize, capacity: usize) -> Self {
        let mut array = Self {
            ring: FrameRingBuffer::default(),
            len: 0,
            values: Vec::new(),
        };
        array.resize(len, capacity);
        array
    }

    /// Drops all frames and changes both dimensions. `len` is at least one.
    pub fn resize(&mut self, len: usize, capacity: usize) {
        self.ring.resize(capacity);
        self.len = len.max(1);
        self.values.clear();
        self.values.resize(self.len * capacity, T::default());
    }

    /// Stores `values` at `frame`, copying at most [`len`](Self::len)
    /// elements. Frames older than the window are ignored.
    pub fn set(&mut self, frame: Frame, values: &[T]) {
        if let Some(slot) = self.set_uninitialized(frame) {
            let count = slot.len().min(values.len());
            slot[..count].clone_from_slice(&values[..count]);
        }
    }

    /// Allocates `frame` and returns its slot for in-place filling.
    ///
    /// The slot keeps whatever it held before; callers overwrite every
    /// element they care about. Returns `None` when the frame is too old.
    pub fn set_uninitialized(&mut self, frame: Frame) -> Option<&mut [T]> {
        if !self.ring.allocate_frame(frame) {
            return None;
        }
        let index = self.ring.index_in_window(frame);
        Some(self.slot_mut(index))
    }

    #[must_use]
    pub fn get_raw(&self, frame: Frame) -> Option<&[T]> {
        self.ring
            .allocated_frame_to_index(frame)
            .map(|index| self.slot(index))
    }

    #[must_use]
    pub fn get_raw_or_prior(&self, frame: Frame) -> Option<(&[T], Frame)> {
        let found = self.ring.find_closest_allocated_frame(frame, true, false)?;
        self.get_raw(found).map(|values| (values, found))
    }

    /// # Panics
    ///
    /// Panics if nothing has been written yet.
    #[must_use]
    pub fn get_closest_raw(&self, frame: Frame) -> &[T] {
        let closest = self.ring.closest_allocated_frame(frame);
        self.slot(self.ring.index_in_window(closest))
    }

    fn slot_mut(&mut self, index: usize) -> &mut [T] {
        let start = index * self.len;
        &mut self.values[start..start + self.len]
    }
}

impl<T> TemporalValueArray<T> {
    /// Number of elements per frame.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.ring.is_initialized()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[must_use]
    pub const fn last_frame(&self) -> Frame {
        self.ring.last_frame()
    }

    #[must_use]
    pub fn has_frame(&self, frame: Frame) -> bool {
        self.ring.has_frame(frame)
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.ring.revision()
    }

    fn slot(&self, index: usize) -> &[T] {
        let start = index * self.len;
        &self.values[start..start + self.len]
    }
}

impl<T: Interpolate> TemporalValueArray<T> {
    /// Samples every element at `time` without copying the history.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been written yet.
    #[must_use]
    pub fn sample_valid(&self, time: Time, snap_threshold: f32) -> InterpolatedSpan<'_, T> {
        let interp = self.ring.valid_frame_interpolation(time);
        InterpolatedSpan {
            first: self.slot(interp.first_index),
            second: self.slot(interp.second_index),
            blend_factor: interp.blend_factor,
            snap_threshold,
        }
    }
}

/// Lazily interpolated view over two frames of a [`TemporalValueArray`].
///
/// Each element is blended when read.
#[derive(Debug, Clone, Copy)]
pub struct InterpolatedSpan<'a, T> {
    first: &'a [T],
    second: &'a [T],
    blend_factor: f32,
    snap_threshold: f32,
}

impl<'a, T: Interpolate> InterpolatedSpan<'a, T> {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.first.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    #[must_use]
    pub const fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    /// Returns the interpolated element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        let first = self.first.get(index)?;
        let second = self.second.get(index)?;
        Some(first.interpolate(second, self.blend_factor, self.snap_threshold))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let blend_factor = self.blend_factor;
        let snap_threshold = self.snap_threshold;
        self.first
            .iter()
            .zip(self.second)
            .map(move |(first, second)| first.interpolate(second, blend_factor, snap_threshold))
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}
