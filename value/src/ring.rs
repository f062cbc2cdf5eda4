//! Frame-indexed ring buffer bookkeeping.
//!
//! [`FrameRingBuffer`] tracks which of the last `capacity` frames hold valid
//! data. It owns no payload; typed containers keep a parallel slot array and
//! use the indices it hands out.

use crate::frame::{Frame, Time};

/// Two slots and a blend factor describing how to sample a continuous time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInterpolation {
    pub first_frame: Frame,
    pub first_index: usize,
    pub second_frame: Frame,
    pub second_index: usize,
    pub blend_factor: f32,
}

impl FrameInterpolation {
    const fn degenerate(frame: Frame, index: usize) -> Self {
        Self {
            first_frame: frame,
            first_index: index,
            second_frame: frame,
            second_index: index,
            blend_factor: 0.0,
        }
    }

    /// Returns `true` if both ends refer to the same slot.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.first_index == self.second_index
    }
}

/// Validity bookkeeping for a window of consecutive frames.
///
/// The window is `[first_frame, last_frame]` with
/// `first_frame = last_frame - capacity + 1`. Writing a frame newer than the
/// window rolls it forward, invalidating every skipped slot. Writing a frame
/// older than the window is dropped.
#[derive(Debug, Clone, Default)]
pub struct FrameRingBuffer {
    initialized: bool,
    last_frame: Frame,
    last_index: usize,
    has_frame_by_index: Vec<bool>,
    revision: u64,
}

impl FrameRingBuffer {
    /// Creates an uninitialized buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut ring = Self::default();
        ring.resize(capacity);
        ring
    }

    /// Drops all frames and changes the capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn resize(&mut self, capacity: usize) {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        self.has_frame_by_index.clear();
        self.has_frame_by_index.resize(capacity, false);
        self.initialized = false;
        self.last_frame = Frame::default();
        self.last_index = 0;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Returns `true` once any frame has been allocated.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.has_frame_by_index.len()
    }

    /// Oldest frame inside the window, clamped at the start of the timeline.
    #[must_use]
    pub fn first_frame(&self) -> Frame {
        let span = i64::try_from(self.capacity().saturating_sub(1)).unwrap_or(i64::MAX);
        Frame::new(self.last_frame.raw().saturating_sub(span))
    }

    /// Newest frame inside the window.
    #[must_use]
    pub const fn last_frame(&self) -> Frame {
        self.last_frame
    }

    /// Counter bumped on every successful allocation or resize.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Maps a frame inside the window to its slot, valid or not.
    #[must_use]
    pub fn frame_to_index(&self, frame: Frame) -> Option<usize> {
        let capacity = self.capacity();
        if !self.initialized || capacity == 0 {
            return None;
        }
        let behind = self.ticks_behind(frame);
        if !(0..capacity as i128).contains(&behind) {
            return None;
        }
        Some(self.offset_to_index(behind as usize))
    }

    /// Maps a frame to its slot only if the slot holds valid data.
    #[must_use]
    pub fn allocated_frame_to_index(&self, frame: Frame) -> Option<usize> {
        self.frame_to_index(frame)
            .filter(|&index| self.has_frame_by_index[index])
    }

    #[must_use]
    pub fn has_frame(&self, frame: Frame) -> bool {
        self.allocated_frame_to_index(frame).is_some()
    }

    /// Marks `frame` as holding data.
    ///
    /// Returns `false` when the frame is older than the window and was
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if the buffer has no capacity.
    pub fn allocate_frame(&mut self, frame: Frame) -> bool {
        let capacity = self.capacity();
        assert!(capacity > 0, "ring buffer must be resized before use");

        if !self.initialized {
            self.initialized = true;
            self.last_frame = frame;
            self.last_index = 0;
            self.has_frame_by_index[0] = true;
            self.bump_revision();
            return true;
        }

        if frame > self.last_frame {
            let step = frame.raw().abs_diff(self.last_frame.raw());
            if step >= capacity as u64 {
                self.has_frame_by_index.fill(false);
            } else {
                for skipped in 1..step as usize {
                    self.has_frame_by_index[(self.last_index + skipped) % capacity] = false;
                }
            }
            self.last_index = (self.last_index + (step % capacity as u64) as usize) % capacity;
            self.last_frame = frame;
            self.has_frame_by_index[self.last_index] = true;
            self.bump_revision();
            return true;
        }

        match self.frame_to_index(frame) {
            Some(index) => {
                self.has_frame_by_index[index] = true;
                self.bump_revision();
                true
            }
            None => false,
        }
    }

    /// Finds the nearest valid frame to `frame`.
    ///
    /// The exact frame wins if valid. Otherwise the past is scanned first
    /// and any valid past frame is returned before the future is considered,
    /// even if a future frame is closer.
    #[must_use]
    pub fn find_closest_allocated_frame(
        &self,
        frame: Frame,
        search_past: bool,
        search_future: bool,
    ) -> Option<Frame> {
        if !self.initialized {
            return None;
        }
        if self.has_frame(frame) {
            return Some(frame);
        }

        // Offsets count ticks back from `last_frame`; older frames have
        // larger offsets.
        let capacity = self.capacity() as i128;
        let behind = self.ticks_behind(frame);

        if search_past {
            let nearest = (behind + 1).max(0);
            if let Some(found) = (nearest..capacity).find_map(|offset| self.valid_at_offset(offset)) {
                return Some(found);
            }
        }

        if search_future {
            let nearest = behind.min(capacity);
            if let Some(found) = (0..nearest).rev().find_map(|offset| self.valid_at_offset(offset)) {
                return Some(found);
            }
        }

        None
    }

    /// Like [`find_closest_allocated_frame`](Self::find_closest_allocated_frame)
    /// in both directions, falling back to the last frame.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not initialized.
    #[must_use]
    pub fn closest_allocated_frame(&self, frame: Frame) -> Frame {
        assert!(self.initialized, "ring buffer is not initialized");
        self.find_closest_allocated_frame(frame, true, true)
            .unwrap_or(self.last_frame)
    }

    /// Resolves a continuous time into two valid slots and a blend factor.
    ///
    /// The blend factor is normalized over the real distance between the two
    /// valid frames, so gaps wider than one tick interpolate linearly in time.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not initialized.
    #[must_use]
    pub fn valid_frame_interpolation(&self, time: Time) -> FrameInterpolation {
        assert!(self.initialized, "ring buffer is not initialized");
        let frame = time.frame();

        let this_or_past = self.find_closest_allocated_frame(frame, true, false);
        if this_or_past == Some(frame) && time.is_exact() {
            return FrameInterpolation::degenerate(frame, self.index_in_window(frame));
        }

        let next_or_future = frame
            .raw()
            .checked_add(1)
            .and_then(|next| self.find_closest_allocated_frame(Frame::new(next), false, true));
        if let (Some(past), Some(future)) = (this_or_past, next_or_future) {
            let extra_past = (frame - past) as f32;
            let extra_future = (future - frame - 1) as f32;
            let blend_factor = (extra_past + time.fraction()) / (extra_past + extra_future + 1.0);
            return FrameInterpolation {
                first_frame: past,
                first_index: self.index_in_window(past),
                second_frame: future,
                second_index: self.index_in_window(future),
                blend_factor,
            };
        }

        let closest = this_or_past.or(next_or_future).unwrap_or(self.last_frame);
        FrameInterpolation::degenerate(closest, self.index_in_window(closest))
    }

    /// Iterates valid frames in `[first, last]`, oldest first.
    pub fn allocated_frames(&self, first: Frame, last: Frame) -> impl Iterator<Item = Frame> + '_ {
        let start = first.max(self.first_frame());
        let end = last.min(self.last_frame);
        let span = if self.initialized && start <= end {
            end - start + 1
        } else {
            0
        };
        (0..span)
            .map(move |offset| start + offset)
            .filter(move |&frame| self.has_frame(frame))
    }

    pub(crate) fn index_in_window(&self, frame: Frame) -> usize {
        self.frame_to_index(frame)
            .unwrap_or_else(|| panic!("frame {frame} is outside of the ring buffer window"))
    }

    fn ticks_behind(&self, frame: Frame) -> i128 {
        self.last_frame.ticks_after(frame)
    }

    fn offset_to_index(&self, offset: usize) -> usize {
        let capacity = self.capacity();
        (self.last_index + capacity - offset % capacity) % capacity
    }

    fn valid_at_offset(&self, offset: i128) -> Option<Frame> {
        let offset = i64::try_from(offset).ok()?;
        let frame = self.last_frame.raw().checked_sub(offset)?;
        self.has_frame_by_index[self.offset_to_index(offset as usize)].then_some(Frame::new(frame))
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(frame: i64) -> Frame {
        Frame::new(frame)
    }

    #[test]
    fn new_buffer_is_uninitialized() {
        let ring = FrameRingBuffer::new(4);
        assert!(!ring.is_initialized());
        assert_eq!(ring.capacity(), 4);
        assert!(!ring.has_frame(f(0)));
        assert_eq!(ring.find_closest_allocated_frame(f(0), true, true), None);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn zero_capacity_panics() {
        let _ = FrameRingBuffer::new(0);
    }

    #[test]
    #[should_panic(expected = "resized before use")]
    fn allocate_without_capacity_panics() {
        let mut ring = FrameRingBuffer::default();
        ring.allocate_frame(f(1));
    }

    #[test]
    fn first_allocation_initializes() {
        let mut ring = FrameRingBuffer::new(4);
        assert!(ring.allocate_frame(f(10)));
        assert!(ring.is_initialized());
        assert_eq!(ring.last_frame(), f(10));
        assert_eq!(ring.first_frame(), f(7));
        assert!(ring.has_frame(f(10)));
        assert!(!ring.has_frame(f(9)));
    }

    #[test]
    fn roll_forward_invalidates_skipped() {
        let mut ring = FrameRingBuffer::new(4);
        for frame in 0..4 {
            ring.allocate_frame(f(frame));
        }
        assert!(ring.allocate_frame(f(6)));
        assert_eq!(ring.first_frame(), f(3));
        assert!(ring.has_frame(f(3)));
        assert!(!ring.has_frame(f(4)));
        assert!(!ring.has_frame(f(5)));
        assert!(ring.has_frame(f(6)));
    }

    #[test]
    fn roll_forward_past_whole_window() {
        let mut ring = FrameRingBuffer::new(4);
        for frame in 0..4 {
            ring.allocate_frame(f(frame));
        }
        assert!(ring.allocate_frame(f(1000)));
        assert_eq!(ring.allocated_frames(f(990), f(1000)).collect::<Vec<_>>(), vec![f(1000)]);
    }

    #[test]
    fn jump_across_the_whole_timeline() {
        let mut ring = FrameRingBuffer::new(15);
        for frame in -10..=-5 {
            ring.allocate_frame(f(frame));
        }
        assert!(ring.allocate_frame(f(i64::MAX)));
        assert_eq!(ring.last_frame(), f(i64::MAX));
        assert_eq!(ring.first_frame(), f(i64::MAX - 14));
        assert_eq!(
            ring.allocated_frames(f(i64::MIN), f(i64::MAX)).collect::<Vec<_>>(),
            vec![f(i64::MAX)]
        );
        assert!(!ring.has_frame(f(-5)));
        assert!(!ring.allocate_frame(f(-5)));
        assert_eq!(ring.find_closest_allocated_frame(f(i64::MIN), true, true), Some(f(i64::MAX)));
        assert_eq!(ring.find_closest_allocated_frame(f(i64::MIN), true, false), None);

        let interp = ring.valid_frame_interpolation(Time::new(f(i64::MAX), 0.5));
        assert!(interp.is_degenerate());
        assert_eq!(interp.first_frame, f(i64::MAX));
    }

    #[test]
    fn window_clamps_at_timeline_start() {
        let mut ring = FrameRingBuffer::new(4);
        ring.allocate_frame(f(i64::MIN));
        assert_eq!(ring.first_frame(), f(i64::MIN));
        assert!(ring.allocate_frame(f(i64::MIN + 2)));
        assert!(ring.has_frame(f(i64::MIN)));
        assert!(!ring.has_frame(f(i64::MIN + 1)));
        assert_eq!(
            ring.find_closest_allocated_frame(f(i64::MIN + 1), true, false),
            Some(f(i64::MIN))
        );
        assert_eq!(
            ring.find_closest_allocated_frame(f(i64::MIN + 1), false, true),
            Some(f(i64::MIN + 2))
        );
        assert_eq!(ring.find_closest_allocated_frame(f(i64::MIN), false, false), Some(f(i64::MIN)));
        assert_eq!(ring.allocated_frames(f(i64::MIN), f(0)).count(), 2);
    }

    #[test]
    fn stale_write_is_dropped() {
        let mut ring = FrameRingBuffer::new(4);
        ring.allocate_frame(f(10));
        let revision = ring.revision();
        assert!(!ring.allocate_frame(f(6)));
        assert!(!ring.has_frame(f(6)));
        assert_eq!(ring.revision(), revision);
        assert!(ring.allocate_frame(f(7)));
        assert!(ring.has_frame(f(7)));
    }

    #[test]
    fn revision_changes_on_write() {
        let mut ring = FrameRingBuffer::new(4);
        let before = ring.revision();
        ring.allocate_frame(f(1));
        let after_first = ring.revision();
        assert_ne!(before, after_first);
        ring.allocate_frame(f(1));
        assert_ne!(after_first, ring.revision());
    }

    #[test]
    fn frame_to_index_wraps() {
        let mut ring = FrameRingBuffer::new(3);
        ring.allocate_frame(f(0));
        ring.allocate_frame(f(4));
        assert_eq!(ring.frame_to_index(f(4)), Some(1));
        assert_eq!(ring.frame_to_index(f(3)), Some(0));
        assert_eq!(ring.frame_to_index(f(2)), Some(2));
        assert_eq!(ring.frame_to_index(f(1)), None);
        assert_eq!(ring.frame_to_index(f(5)), None);
        assert_eq!(ring.allocated_frame_to_index(f(3)), None);
    }

    #[test]
    fn closest_prefers_past() {
        let mut ring = FrameRingBuffer::new(16);
        ring.allocate_frame(f(0));
        ring.allocate_frame(f(10));
        // Frame 9 is nearer, but past data wins.
        assert_eq!(ring.find_closest_allocated_frame(f(9), true, true), Some(f(0)));
        assert_eq!(ring.find_closest_allocated_frame(f(9), false, true), Some(f(10)));
        assert_eq!(ring.find_closest_allocated_frame(f(-2), true, false), None);
        assert_eq!(ring.find_closest_allocated_frame(f(20), true, false), Some(f(10)));
        assert_eq!(ring.find_closest_allocated_frame(f(20), false, true), None);
    }

    #[test]
    fn closest_falls_back_to_last_frame() {
        let mut ring = FrameRingBuffer::new(4);
        ring.allocate_frame(f(5));
        assert_eq!(ring.closest_allocated_frame(f(-100)), f(5));
        assert_eq!(ring.closest_allocated_frame(f(100)), f(5));
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn closest_on_uninitialized_panics() {
        let ring = FrameRingBuffer::new(4);
        let _ = ring.closest_allocated_frame(f(0));
    }

    #[test]
    fn interpolation_exact_frame() {
        let mut ring = FrameRingBuffer::new(8);
        ring.allocate_frame(f(1));
        ring.allocate_frame(f(2));
        let interp = ring.valid_frame_interpolation(Time::from_frame(f(1)));
        assert!(interp.is_degenerate());
        assert_eq!(interp.first_frame, f(1));
        assert_eq!(interp.blend_factor, 0.0);
    }

    #[test]
    fn interpolation_normalizes_over_gap() {
        let mut ring = FrameRingBuffer::new(8);
        ring.allocate_frame(f(1));
        ring.allocate_frame(f(4));
        let interp = ring.valid_frame_interpolation(Time::from_f64(2.5));
        assert_eq!(interp.first_frame, f(1));
        assert_eq!(interp.second_frame, f(4));
        assert!((interp.blend_factor - 0.5).abs() < 1e-6);

        let interp = ring.valid_frame_interpolation(Time::from_f64(1.0));
        assert!(interp.is_degenerate());

        let interp = ring.valid_frame_interpolation(Time::from_f64(3.0));
        assert!((interp.blend_factor - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn interpolation_one_sided_degenerates() {
        let mut ring = FrameRingBuffer::new(8);
        ring.allocate_frame(f(3));
        ring.allocate_frame(f(5));

        let before = ring.valid_frame_interpolation(Time::from_f64(1.5));
        assert!(before.is_degenerate());
        assert_eq!(before.first_frame, f(3));

        let after = ring.valid_frame_interpolation(Time::from_f64(7.5));
        assert!(after.is_degenerate());
        assert_eq!(after.first_frame, f(5));
    }

    #[test]
    fn allocated_frames_in_range() {
        let mut ring = FrameRingBuffer::new(8);
        for frame in [1, 2, 4, 7] {
            ring.allocate_frame(f(frame));
        }
        let frames: Vec<_> = ring.allocated_frames(f(2), f(100)).collect();
        assert_eq!(frames, vec![f(2), f(4), f(7)]);
        assert_eq!(ring.allocated_frames(f(5), f(3)).count(), 0);
    }

    #[test]
    fn resize_resets_state() {
        let mut ring = FrameRingBuffer::new(4);
        ring.allocate_frame(f(3));
        ring.resize(6);
        assert!(!ring.is_initialized());
        assert_eq!(ring.capacity(), 6);
        assert!(!ring.has_frame(f(3)));
    }
}
