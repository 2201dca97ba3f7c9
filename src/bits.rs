use std::ops::Range;

/// Get value of bits in positions start..end (inclusive)
pub fn bits(byte: u8, r: Range<usize>) -> u8 {
    assert!(r.start < r.end && r.end < 8);
    let width = r.end - r.start + 1;
    (byte >> r.start) & (((1u16 << width) - 1) as u8)
}

/// Get value of a single bit
pub fn bit(byte: u8, b: usize) -> u8 {
    (byte >> b) & 1
}

/// Sign extend a 7-bit immediate payload, copying bit 6 into bits 7..31
pub fn sign_extend7(payload: u8) -> u32 {
    (((payload << 1) as i8) >> 1) as i32 as u32
}

/// Reverse the bit order of a word, bit 0 becoming bit 31
pub fn reverse_bits(word: u32) -> u32 {
    let mut v = word >> 1;
    let mut rev = word;
    let mut remaining = u32::BITS - 1;
    while v != 0 {
        rev <<= 1;
        rev |= v & 1;
        v >>= 1;
        remaining -= 1;
    }
    rev << remaining
}
