//! Block alignment helpers.

/// Bytes needed to bring `offset` up to the next multiple of `unit`.
///
/// Always in `0..unit`.
#[inline]
pub const fn calc_padding(offset: u64, unit: u64) -> u64 {
    let rem = offset % unit;
    if rem == 0 {
        0
    } else {
        unit - rem
    }
}

/// Round `offset` up to the next multiple of `unit`.
#[inline]
pub const fn align_up(offset: u64, unit: u64) -> u64 {
    offset + calc_padding(offset, unit)
}

/// Append zero bytes to `buf` until its length is a multiple of `unit`.
pub fn pad_to(buf: &mut Vec<u8>, unit: u64) {
    let padding = calc_padding(buf.len() as u64, unit) as usize;
    buf.resize(buf.len() + padding, 0);
}
