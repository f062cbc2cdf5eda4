//! Per-type interpolation, extrapolation and correction policies.
//!
//! A stored value type implements [`Interpolate`] to be sampled from a
//! [`TemporalValue`](crate::TemporalValue), and additionally [`ValueTraits`]
//! to be reconstructed by a [`ValueSampler`](crate::ValueSampler).

use std::fmt;
use std::ops::{Add, Mul, Sub};

use glam::{Quat, Vec2, Vec3};

/// Snap threshold that never snaps.
pub const NO_SNAP: f32 = f32::INFINITY;

/// Blending between two stored values.
pub trait Interpolate: Clone + fmt::Debug {
    /// Blends towards `other` without snapping. `factor` is in `[0, 1]`.
    fn blend(&self, other: &Self, factor: f32) -> Self;

    /// Distance compared against the snap threshold.
    ///
    /// Types without a meaningful metric report zero and never snap.
    fn snap_distance(&self, _other: &Self) -> f32 {
        0.0
    }

    /// Blends towards `other`, or cuts to the nearer end when the two are
    /// further apart than `snap_threshold`.
    fn interpolate(&self, other: &Self, factor: f32, snap_threshold: f32) -> Self {
        if self.snap_distance(other) > snap_threshold {
            if factor < 0.5 {
                self.clone()
            } else {
                other.clone()
            }
        } else {
            self.blend(other, factor)
        }
    }
}

/// Client-side reconstruction policy for a stored value type.
pub trait ValueTraits: Interpolate {
    /// Value handed to consumers.
    type Output: Clone + fmt::Debug;
    /// Accumulated visual offset between predicted and corrected output.
    type Correction: Clone + fmt::Debug;

    fn extract(&self) -> Self::Output;

    /// Projects the value `factor` ticks forward. Frozen by default.
    fn extrapolate(&self, _factor: f32) -> Self::Output {
        self.extract()
    }

    fn no_correction() -> Self::Correction;

    /// Folds a retroactive change into the correction so that applying the
    /// new correction to `correct` yields the previously shown `previous`.
    fn update_correction(
        correction: &mut Self::Correction,
        correct: &Self::Output,
        previous: &Self::Output,
    );

    /// Decays the correction towards none by `factor` in `[0, 1]`.
    fn smooth_correction(correction: &mut Self::Correction, factor: f32);

    fn apply_correction(correction: &Self::Correction, value: Self::Output) -> Self::Output;
}

/// Vector-space values: blended linearly, corrected additively.
pub trait Linear:
    Copy
    + fmt::Debug
    + Default
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
{
    fn lerp_to(self, other: Self, factor: f32) -> Self {
        self * (1.0 - factor) + other * factor
    }

    fn distance_squared_to(self, other: Self) -> f32;
}

impl Linear for f32 {
    fn distance_squared_to(self, other: Self) -> f32 {
        (self - other) * (self - other)
    }
}

impl Linear for Vec2 {
    fn distance_squared_to(self, other: Self) -> f32 {
        self.distance_squared(other)
    }
}

impl Linear for Vec3 {
    fn distance_squared_to(self, other: Self) -> f32 {
        self.distance_squared(other)
    }
}

macro_rules! impl_linear_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Interpolate for $ty {
                fn blend(&self, other: &Self, factor: f32) -> Self {
                    self.lerp_to(*other, factor)
                }

                fn snap_distance(&self, other: &Self) -> f32 {
                    self.distance_squared_to(*other)
                }
            }

            impl ValueTraits for $ty {
                type Output = Self;
                type Correction = Self;

                fn extract(&self) -> Self {
                    *self
                }

                fn no_correction() -> Self {
                    Self::default()
                }

                fn update_correction(correction: &mut Self, correct: &Self, previous: &Self) {
                    *correction = *correction + (*previous - *correct);
                }

                fn smooth_correction(correction: &mut Self, factor: f32) {
                    *correction = *correction * (1.0 - factor);
                }

                fn apply_correction(correction: &Self, value: Self) -> Self {
                    value + *correction
                }
            }
        )*
    };
}

impl_linear_value!(f32, Vec2, Vec3);

/// Rotation distance in `[0, 1]`: zero for equal orientations.
fn rotation_distance(a: Quat, b: Quat) -> f32 {
    1.0 - a.dot(b).abs()
}

impl Interpolate for Quat {
    fn blend(&self, other: &Self, factor: f32) -> Self {
        self.slerp(*other, factor)
    }

    fn snap_distance(&self, other: &Self) -> f32 {
        rotation_distance(*self, *other)
    }
}

fn update_rotation_correction(correction: &mut Quat, correct: Quat, previous: Quat) {
    *correction = (*correction * previous * correct.inverse()).normalize();
}

fn smooth_rotation_correction(correction: &mut Quat, factor: f32) {
    *correction = correction.slerp(Quat::IDENTITY, factor);
}

impl ValueTraits for Quat {
    type Output = Self;
    type Correction = Self;

    fn extract(&self) -> Self {
        *self
    }

    fn no_correction() -> Self {
        Self::IDENTITY
    }

    fn update_correction(correction: &mut Self, correct: &Self, previous: &Self) {
        update_rotation_correction(correction, *correct, *previous);
    }

    fn smooth_correction(correction: &mut Self, factor: f32) {
        smooth_rotation_correction(correction, factor);
    }

    fn apply_correction(correction: &Self, value: Self) -> Self {
        (*correction * value).normalize()
    }
}

/// A value stored together with its rate of change per tick.
///
/// Enables extrapolation past the newest received frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueWithDerivative<T, D = T> {
    pub value: T,
    pub derivative: D,
}

impl<T, D> ValueWithDerivative<T, D> {
    #[must_use]
    pub const fn new(value: T, derivative: D) -> Self {
        Self { value, derivative }
    }
}

impl<T: Linear> Interpolate for ValueWithDerivative<T> {
    fn blend(&self, other: &Self, factor: f32) -> Self {
        Self {
            value: self.value.lerp_to(other.value, factor),
            derivative: self.derivative.lerp_to(other.derivative, factor),
        }
    }

    fn snap_distance(&self, other: &Self) -> f32 {
        self.value.distance_squared_to(other.value)
    }
}

impl<T: Linear> ValueTraits for ValueWithDerivative<T> {
    type Output = T;
    type Correction = T;

    fn extract(&self) -> T {
        self.value
    }

    fn extrapolate(&self, factor: f32) -> T {
        self.value + self.derivative * factor
    }

    fn no_correction() -> T {
        T::default()
    }

    fn update_correction(correction: &mut T, correct: &T, previous: &T) {
        *correction = *correction + (*previous - *correct);
    }

    fn smooth_correction(correction: &mut T, factor: f32) {
        *correction = *correction * (1.0 - factor);
    }

    fn apply_correction(correction: &T, value: T) -> T {
        value + *correction
    }
}

/// Rotation with angular velocity as a scaled axis (radians per tick).
impl Interpolate for ValueWithDerivative<Quat, Vec3> {
    fn blend(&self, other: &Self, factor: f32) -> Self {
        Self {
            value: self.value.slerp(other.value, factor),
            derivative: self.derivative.lerp(other.derivative, factor),
        }
    }

    fn snap_distance(&self, other: &Self) -> f32 {
        rotation_distance(self.value, other.value)
    }
}

impl ValueTraits for ValueWithDerivative<Quat, Vec3> {
    type Output = Quat;
    type Correction = Quat;

    fn extract(&self) -> Quat {
        self.value
    }

    fn extrapolate(&self, factor: f32) -> Quat {
        (Quat::from_scaled_axis(self.derivative * factor) * self.value).normalize()
    }

    fn no_correction() -> Quat {
        Quat::IDENTITY
    }

    fn update_correction(correction: &mut Quat, correct: &Quat, previous: &Quat) {
        update_rotation_correction(correction, *correct, *previous);
    }

    fn smooth_correction(correction: &mut Quat, factor: f32) {
        smooth_rotation_correction(correction, factor);
    }

    fn apply_correction(correction: &Quat, value: Quat) -> Quat {
        (*correction * value).normalize()
    }
}
