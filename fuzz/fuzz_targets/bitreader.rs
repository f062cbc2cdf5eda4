#![no_main]

use bitstream::BitReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&ops, body)) = data.split_first() else {
        return;
    };
    let mut reader = BitReader::new(body);

    // The first byte seeds a bounded sequence of reads over the rest.
    let mut op = ops;
    for _ in 0..256 {
        if reader.is_empty() {
            break;
        }
        match op % 8 {
            0 => {
                let _ = reader.read_bit();
            }
            1 => {
                let _ = reader.read_bits(op % 64 + 1);
            }
            2 => {
                let _ = reader.align_to_byte();
            }
            3 => {
                let _ = reader.read_f32_aligned();
            }
            4 => {
                let _ = reader.read_varu32();
            }
            5 => {
                let _ = reader.read_varu64();
            }
            6 => {
                let _ = reader.read_vars32();
            }
            _ => {
                let _ = reader.read_bytes_aligned(usize::from(op % 16));
            }
        }
        op = op.wrapping_mul(31).wrapping_add(7);
    }
});
