//! Frame-indexed value histories for networked simulation replicas.
//!
//! An authoritative server writes one value per tick into a
//! [`TemporalValue`]; a client receives a lossy, reordered subset of those
//! writes into its own copy and reads a smooth, extrapolated view of it at
//! continuous [`Time`] through a [`ValueSampler`].
//!
//! # Design Principles
//!
//! - **Bounded memory** - Every history is a fixed-capacity ring; stale writes are dropped.
//! - **Loss tolerant** - Missing frames are bridged by interpolating the nearest valid neighbours.
//! - **Static policies** - Blending, extrapolation and correction are traits on the stored type.
//! - **No I/O** - This crate knows nothing about packets, objects, or transports.
//!
//! # Example
//!
//! ```
//! use value::{Frame, TemporalValue, Time, NO_SNAP};
//!
//! let mut position = TemporalValue::new(8);
//! position.set(Frame::new(0), 10.0f32);
//! position.set(Frame::new(2), 14.0);
//!
//! // Frame 1 was lost: sampling bridges the gap.
//! assert_eq!(position.sample_valid(Time::from_f64(1.0), NO_SNAP), 12.0);
//! ```

mod array;
mod frame;
mod ring;
mod sampler;
mod temporal;
mod traits;

pub use array::{InterpolatedSpan, TemporalValueArray};
pub use frame::{Frame, Time};
pub use ring::{FrameInterpolation, FrameRingBuffer};
pub use sampler::{exp_smoothing, SamplerSettings, ValueSampler};
pub use temporal::TemporalValue;
pub use traits::{Interpolate, Linear, ValueTraits, ValueWithDerivative, NO_SNAP};
