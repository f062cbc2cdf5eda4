use bitstream::{BitReader, BitWriter};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Bit(bool),
    Bits { bits: u8, value: u64 },
    Align,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(u32),
    VarU32(u32),
    VarU64(u64),
    VarS32(i32),
    Bytes(Vec<u8>),
}

impl Op {
    const fn is_aligned_op(&self) -> bool {
        !matches!(self, Self::Bit(_) | Self::Bits { .. } | Self::Align)
    }
}

fn mask_value(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        let mask = (1u64 << bits) - 1;
        value & mask
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Bit),
        (1u8..=64, any::<u64>()).prop_map(|(bits, value)| Op::Bits {
            bits,
            value: mask_value(bits, value),
        }),
        Just(Op::Align),
        any::<u8>().prop_map(Op::U8),
        any::<u16>().prop_map(Op::U16),
        any::<u32>().prop_map(Op::U32),
        any::<u64>().prop_map(Op::U64),
        any::<u32>().prop_map(Op::F32),
        any::<u32>().prop_map(Op::VarU32),
        any::<u64>().prop_map(Op::VarU64),
        any::<i32>().prop_map(Op::VarS32),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Op::Bytes),
    ]
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut writer = BitWriter::new();

        for op in &ops {
            if op.is_aligned_op() {
                writer.align_to_byte();
            }
            match op {
                Op::Bit(b) => writer.write_bit(*b),
                Op::Bits { bits, value } => writer.write_bits(*value, *bits).unwrap(),
                Op::Align => writer.align_to_byte(),
                Op::U8(v) => writer.write_u8_aligned(*v).unwrap(),
                Op::U16(v) => writer.write_u16_aligned(*v).unwrap(),
                Op::U32(v) => writer.write_u32_aligned(*v).unwrap(),
                Op::U64(v) => writer.write_u64_aligned(*v).unwrap(),
                Op::F32(bits) => writer.write_f32_aligned(f32::from_bits(*bits)).unwrap(),
                Op::VarU32(v) => writer.write_varu32(*v).unwrap(),
                Op::VarU64(v) => writer.write_varu64(*v).unwrap(),
                Op::VarS32(v) => writer.write_vars32(*v).unwrap(),
                Op::Bytes(bytes) => writer.write_bytes_aligned(bytes).unwrap(),
            }
        }

        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);

        for op in &ops {
            if op.is_aligned_op() {
                reader.align_to_byte().unwrap();
            }
            match op {
                Op::Bit(b) => prop_assert_eq!(reader.read_bit().unwrap(), *b),
                Op::Bits { bits, value } => {
                    prop_assert_eq!(reader.read_bits(*bits).unwrap(), *value);
                }
                Op::Align => reader.align_to_byte().unwrap(),
                Op::U8(v) => prop_assert_eq!(reader.read_u8_aligned().unwrap(), *v),
                Op::U16(v) => prop_assert_eq!(reader.read_u16_aligned().unwrap(), *v),
                Op::U32(v) => prop_assert_eq!(reader.read_u32_aligned().unwrap(), *v),
                Op::U64(v) => prop_assert_eq!(reader.read_u64_aligned().unwrap(), *v),
                Op::F32(bits) => {
                    prop_assert_eq!(reader.read_f32_aligned().unwrap().to_bits(), *bits);
                }
                Op::VarU32(v) => prop_assert_eq!(reader.read_varu32().unwrap(), *v),
                Op::VarU64(v) => prop_assert_eq!(reader.read_varu64().unwrap(), *v),
                Op::VarS32(v) => prop_assert_eq!(reader.read_vars32().unwrap(), *v),
                Op::Bytes(expected) => {
                    let actual = reader.read_bytes_aligned(expected.len()).unwrap();
                    prop_assert_eq!(actual, expected.as_slice());
                }
            }
        }
    }

    #[test]
    fn prop_reader_never_panics(data in prop::collection::vec(any::<u8>(), 0..64), bits in 0u8..=70) {
        let mut reader = BitReader::new(&data);
        let _ = reader.read_bits(bits);
        let _ = reader.align_to_byte();
        let _ = reader.read_varu64();
        let _ = reader.read_bytes_aligned(usize::from(bits));
    }
}
