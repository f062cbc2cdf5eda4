//! Discrete frames and continuous time on the simulation timeline.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A simulation tick number.
///
/// Frames are totally ordered and may be negative; the difference of two
/// frames is a signed tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Frame(i64);

impl Frame {
    /// Creates a new frame.
    #[must_use]
    pub const fn new(frame: i64) -> Self {
        Self(frame)
    }

    /// Returns the raw frame value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Ticks from `earlier` to `self`, exact for any pair of frames.
    #[must_use]
    pub fn ticks_after(self, earlier: Self) -> i128 {
        i128::from(self.0) - i128::from(earlier.0)
    }

    /// Returns the frame immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<i64> for Frame {
    fn from(frame: i64) -> Self {
        Self(frame)
    }
}

impl From<Frame> for i64 {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<i64> for Frame {
    type Output = Self;

    fn add(self, ticks: i64) -> Self {
        Self(self.0.wrapping_add(ticks))
    }
}

impl AddAssign<i64> for Frame {
    fn add_assign(&mut self, ticks: i64) {
        self.0 = self.0.wrapping_add(ticks);
    }
}

impl Sub<i64> for Frame {
    type Output = Self;

    fn sub(self, ticks: i64) -> Self {
        Self(self.0.wrapping_sub(ticks))
    }
}

impl Sub for Frame {
    type Output = i64;

    fn sub(self, other: Self) -> i64 {
        self.0.wrapping_sub(other.0)
    }
}

/// A point on the continuous timeline: a frame plus a fraction in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Time {
    frame: Frame,
    fraction: f32,
}

impl Time {
    /// Fractions below this are treated as exactly on the frame.
    pub const EXACT_EPSILON: f32 = 0.000_05;

    /// Creates a time from a frame and a fraction.
    ///
    /// Fractions outside `[0, 1)` are carried into the frame.
    #[must_use]
    pub fn new(frame: Frame, fraction: f32) -> Self {
        if (0.0..1.0).contains(&fraction) {
            return Self { frame, fraction };
        }
        let whole = fraction.floor();
        Self::normalized(frame + whole as i64, fraction - whole)
    }

    /// Creates a time exactly on `frame`.
    #[must_use]
    pub const fn from_frame(frame: Frame) -> Self {
        Self {
            frame,
            fraction: 0.0,
        }
    }

    /// Creates a time from an absolute tick count.
    #[must_use]
    pub fn from_f64(ticks: f64) -> Self {
        let whole = ticks.floor();
        Self::normalized(Frame::new(whole as i64), (ticks - whole) as f32)
    }

    /// Returns the frame part.
    #[must_use]
    pub const fn frame(self) -> Frame {
        self.frame
    }

    /// Returns the fractional part, in `[0, 1)`.
    #[must_use]
    pub const fn fraction(self) -> f32 {
        self.fraction
    }

    /// Returns `true` if this time lies on its frame boundary.
    #[must_use]
    pub fn is_exact(self) -> bool {
        self.fraction < Self::EXACT_EPSILON
    }

    /// Returns the absolute tick count.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.frame.raw() as f64 + f64::from(self.fraction)
    }

    /// Returns the signed number of ticks elapsed since `frame`.
    #[must_use]
    pub fn ticks_since(self, frame: Frame) -> f64 {
        self.frame.ticks_after(frame) as f64 + f64::from(self.fraction)
    }

    // Rounding in the f32 narrowing may produce exactly 1.0.
    fn normalized(frame: Frame, fraction: f32) -> Self {
        if fraction >= 1.0 {
            Self {
                frame: frame.next(),
                fraction: 0.0,
            }
        } else {
            Self {
                frame,
                fraction: fraction.max(0.0),
            }
        }
    }
}

impl From<Frame> for Time {
    fn from(frame: Frame) -> Self {
        Self::from_frame(frame)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:.3}", self.frame, self.fraction)
    }
}

impl Add<f64> for Time {
    type Output = Self;

    fn add(self, ticks: f64) -> Self {
        let whole = ticks.floor();
        let fraction = f64::from(self.fraction) + (ticks - whole);
        let carry = fraction.floor();
        Self::normalized(
            self.frame + whole as i64 + carry as i64,
            (fraction - carry) as f32,
        )
    }
}

impl Sub<f64> for Time {
    type Output = Self;

    fn sub(self, ticks: f64) -> Self {
        self + -ticks
    }
}

impl Sub for Time {
    type Output = f64;

    fn sub(self, other: Self) -> f64 {
        self.frame.ticks_after(other.frame) as f64 + f64::from(self.fraction) - f64::from(other.fraction)
    }
}
