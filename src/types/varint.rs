//! Variable-length and fixed-width integer decoding.
//!
//! Varints are big-endian base-128: each of the first eight bytes carries
//! seven bits and a continuation flag in the MSB. A ninth byte, when
//! reached, contributes all eight of its bits and always terminates.

/// Largest value that still fits in an 8-byte varint (56 bits).
const MAX_EIGHT_BYTE: u64 = 0x00ff_ffff_ffff_ffff;

/// Decode a varint from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed (1..=9). A slice that
/// ends mid-varint yields whatever was accumulated and the bytes available;
/// an empty slice yields `(0, 0)`.
pub fn decode_varint(bytes: &[u8]) -> (i64, usize) {
    let mut value: u64 = 0;

    for (i, &byte) in bytes.iter().take(8).enumerate() {
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return (value as i64, i + 1);
        }
    }

    match bytes.get(8) {
        Some(&byte) => (((value << 8) | u64::from(byte)) as i64, 9),
        None => (value as i64, bytes.len()),
    }
}

/// Encode a value using the minimal varint form.
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value > MAX_EIGHT_BYTE {
        let mut buf = vec![0u8; 9];
        buf[8] = value as u8;
        let mut rest = value >> 8;
        for byte in buf[..8].iter_mut().rev() {
            *byte = (rest & 0x7F) as u8 | 0x80;
            rest >>= 7;
        }
        return buf;
    }

    let mut buf = Vec::with_capacity(9);
    let mut rest = value;
    loop {
        buf.push((rest & 0x7F) as u8);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    buf.reverse();

    let last = buf.len() - 1;
    for byte in &mut buf[..last] {
        *byte |= 0x80;
    }
    buf
}

/// Number of bytes the minimal encoding of `value` occupies.
pub fn varint_len(value: u64) -> usize {
    if value > MAX_EIGHT_BYTE {
        return 9;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Plain big-endian unsigned integer of `n` bytes (1..=4) at `offset`.
///
/// Bytes beyond the end of the slice read as zero.
pub fn decode_be_uint(bytes: &[u8], offset: usize, n: usize) -> u32 {
    debug_assert!((1..=4).contains(&n));
    (0..n).fold(0u32, |acc, i| {
        let byte = bytes.get(offset + i).copied().unwrap_or(0);
        (acc << 8) | u32::from(byte)
    })
}

/// 4-byte big-endian page pointer at the start of `bytes`.
pub fn decode_fixed32(bytes: &[u8]) -> u32 {
    decode_be_uint(bytes, 0, 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_varint_roundtrip_boundaries() {
        let test_values = [
            (0u64, 1usize),
            (1, 1),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (2097151, 3),
            (2097152, 4),
            (268435455, 4),
            (268435456, 5),
            (MAX_EIGHT_BYTE, 8),
            (MAX_EIGHT_BYTE + 1, 9),
            (i64::MAX as u64, 9),
        ];

        for &(value, len) in &test_values {
            let encoded = encode_varint(value);
            assert_eq!(encoded.len(), len, "length for {}", value);
            assert_eq!(varint_len(value), len);
            assert_eq!(decode_varint(&encoded), (value as i64, len));
        }
    }

    #[test]
    fn test_varint_random_roundtrip() {
        let mut rng = rand::thread_rng();
        for _ in 0..2000 {
            let bits = rng.gen_range(0..63);
            let value = rng.gen_range(0..=(1u64 << (bits + 1)) - 1);
            let encoded = encode_varint(value);
            assert_eq!(decode_varint(&encoded), (value as i64, varint_len(value)));
        }
    }

    #[test]
    fn test_ninth_byte_uses_all_bits() {
        let bytes = [0xFF; 9];
        assert_eq!(decode_varint(&bytes), (-1, 9));

        let mut bytes = [0x80u8; 10];
        bytes[8] = 0xFF;
        bytes[9] = 0x01;
        assert_eq!(decode_varint(&bytes), (0xFF, 9));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(decode_varint(&[]), (0, 0));
        assert_eq!(decode_varint(&[0x81]), (1, 1));
        assert_eq!(decode_varint(&[0x81, 0x00, 0x55]), (128, 2));
    }

    #[test]
    fn test_fixed_width() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(decode_be_uint(&bytes, 0, 1), 0x12);
        assert_eq!(decode_be_uint(&bytes, 1, 2), 0x3456);
        assert_eq!(decode_be_uint(&bytes, 0, 3), 0x123456);
        assert_eq!(decode_fixed32(&bytes), 0x12345678);
        assert_eq!(decode_be_uint(&bytes, 3, 2), 0x7800);
    }
}
