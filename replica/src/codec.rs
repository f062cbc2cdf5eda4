//! Serialization seam between behaviors and the wire.
//!
//! Behaviors write their payloads through [`ByteSink`] and read them back
//! through [`ByteSource`], so they stay independent of the buffer type.

use bitstream::{BitReader, BitWriter};
use glam::{Quat, Vec3};

use crate::error::ReplicaResult;

/// Destination for behavior payloads.
pub trait ByteSink {
    fn write_f32(&mut self, value: f32) -> ReplicaResult<()>;

    /// Writes a variable-length unsigned integer.
    fn write_vle(&mut self, value: u32) -> ReplicaResult<()>;

    fn write_vec3(&mut self, value: Vec3) -> ReplicaResult<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    fn write_quat(&mut self, value: Quat) -> ReplicaResult<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)?;
        self.write_f32(value.w)
    }
}

/// Source of behavior payloads.
pub trait ByteSource {
    fn read_f32(&mut self) -> ReplicaResult<f32>;

    fn read_vle(&mut self) -> ReplicaResult<u32>;

    fn read_vec3(&mut self) -> ReplicaResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Reads a rotation, renormalizing it. Degenerate input yields identity.
    fn read_quat(&mut self) -> ReplicaResult<Quat> {
        let raw = Quat::from_xyzw(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        );
        let length = raw.length();
        if length.is_finite() && length > f32::EPSILON {
            Ok(raw / length)
        } else {
            Ok(Quat::IDENTITY)
        }
    }
}

impl ByteSink for BitWriter {
    fn write_f32(&mut self, value: f32) -> ReplicaResult<()> {
        Ok(self.write_f32_aligned(value)?)
    }

    fn write_vle(&mut self, value: u32) -> ReplicaResult<()> {
        Ok(self.write_varu32(value)?)
    }
}

impl ByteSource for BitReader<'_> {
    fn read_f32(&mut self) -> ReplicaResult<f32> {
        Ok(self.read_f32_aligned()?)
    }

    fn read_vle(&mut self) -> ReplicaResult<u32> {
        Ok(self.read_varu32()?)
    }
}
