//! Low-level bit packing primitives for retrace delta packets.
//!
//! This crate provides [`BitWriter`] and [`BitReader`] for bit-level and
//! byte-aligned encoding and decoding.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads/writes are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about frames, objects, or behaviors.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bit(true);
//! writer.write_bits(42, 7).unwrap();
//! writer.write_varu32(300).unwrap();
//! writer.write_f32_aligned(1.5).unwrap();
//!
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_varu32().unwrap(), 300);
//! assert_eq!(reader.read_f32_aligned().unwrap(), 1.5);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let writer = BitWriter::new();
        let bytes = writer.finish();
        assert!(bytes.is_empty());

        let reader = BitReader::new(&bytes);
        assert!(reader.is_empty());
    }

    #[test]
    fn bits_roundtrip_various_sizes() {
        let test_cases = [
            (0b1010u64, 4),
            (0xFFu64, 8),
            (0xABCDu64, 16),
            (0x1234_5678u64, 32),
            (u64::MAX, 64),
        ];

        for (value, bits) in test_cases {
            let mut writer = BitWriter::new();
            writer.write_bits(value, bits).unwrap();
            let bytes = writer.finish();

            let mut reader = BitReader::new(&bytes);
            let read_value = reader.read_bits(bits).unwrap();
            assert_eq!(
                read_value, value,
                "roundtrip failed for {bits}-bit value {value}"
            );
        }
    }

    #[test]
    fn mixed_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_bits(0b1010, 4).unwrap();
        writer.align_to_byte();
        writer.write_u64_aligned(u64::MAX - 1).unwrap();
        writer.write_varu64(1 << 40).unwrap();
        writer.write_f32_aligned(-0.25).unwrap();
        writer.write_bytes_aligned(&[9, 8, 7]).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
        reader.align_to_byte().unwrap();
        assert_eq!(reader.read_u64_aligned().unwrap(), u64::MAX - 1);
        assert_eq!(reader.read_varu64().unwrap(), 1 << 40);
        assert_eq!(reader.read_f32_aligned().unwrap(), -0.25);
        assert_eq!(reader.read_bytes_aligned(3).unwrap(), &[9, 8, 7]);
        assert!(reader.is_empty());
    }
}
