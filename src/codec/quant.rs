//! Scalar quantizers shared by the grid and packed codecs.

use crate::util::{Error, Result, Vec2, Vec3};

/// Snap a position to the `step` grid.
pub(crate) fn quantize_position(codec: &'static str, p: Vec3, step: f32) -> Result<[i64; 3]> {
    let q = (p / step).round();
    if !q.is_finite() || q.abs().max_element() >= i64::MAX as f32 {
        return Err(Error::codec(codec, format!("position {p:?} does not fit the grid")));
    }
    Ok([q.x as i64, q.y as i64, q.z as i64])
}

#[inline]
pub(crate) fn dequantize_position(q: [i64; 3], step: f32) -> Vec3 {
    Vec3::new(q[0] as f32, q[1] as f32, q[2] as f32) * step
}

pub(crate) fn quantize_uv(codec: &'static str, uv: Vec2, bits: u8) -> Result<[i64; 2]> {
    let q = (uv * (1u64 << bits) as f32).round();
    if !q.is_finite() {
        return Err(Error::codec(codec, format!("texcoord {uv:?} is not finite")));
    }
    Ok([q.x as i64, q.y as i64])
}

#[inline]
pub(crate) fn dequantize_uv(q: [i64; 2], bits: u8) -> Vec2 {
    Vec2::new(q[0] as f32, q[1] as f32) / (1u64 << bits) as f32
}

/// Drop the low `16 - bits` bits of a normal component.
#[inline]
pub(crate) fn quantize_normal(n: i16, bits: u8) -> i32 {
    (n as i32) >> (16 - bits as u32)
}

#[inline]
pub(crate) fn dequantize_normal(q: i32, bits: u8) -> i16 {
    dequantize_shifted(q, 16 - bits as u32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Drop the low `8 - bits` bits of an 8-bit-range value (signed values
/// floor toward negative infinity).
#[inline]
pub(crate) fn quantize_channel(v: i32, bits: u8) -> i32 {
    v >> (8 - bits as u32)
}

#[inline]
pub(crate) fn dequantize_channel(q: i32, bits: u8) -> i32 {
    dequantize_shifted(q, 8 - bits as u32)
}

/// Reconstruct at the middle of the dropped interval.
#[inline]
fn dequantize_shifted(q: i32, shift: u32) -> i32 {
    if shift == 0 {
        q
    } else {
        (q << shift) + (1 << (shift - 1))
    }
}

/// Lossless RGB to YCoCg-R.
#[inline]
pub(crate) fn rgb_to_ycocg(r: u8, g: u8, b: u8) -> [i32; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let co = r - b;
    let t = b + (co >> 1);
    let cg = g - t;
    let y = t + (cg >> 1);
    [y, co, cg]
}

/// Inverse of [`rgb_to_ycocg`]. Inputs are clamped to the range the forward
/// transform produces, so corrupt values saturate instead of overflowing.
#[inline]
pub(crate) fn ycocg_to_rgb(y: i32, co: i32, cg: i32) -> [u8; 3] {
    let y = y.clamp(0, 255);
    let co = co.clamp(-255, 255);
    let cg = cg.clamp(-255, 255);
    let t = y - (cg >> 1);
    let g = cg + t;
    let b = t - (co >> 1);
    let r = b + co;
    [r, g, b].map(|c| c.clamp(0, 255) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ycocg_lossless() {
        for (r, g, b) in [(0, 0, 0), (255, 255, 255), (255, 0, 0), (12, 200, 99), (0, 255, 3)] {
            let [y, co, cg] = rgb_to_ycocg(r, g, b);
            assert_eq!(ycocg_to_rgb(y, co, cg), [r, g, b]);
        }
    }

    #[test]
    fn test_ycocg_saturates() {
        assert_eq!(ycocg_to_rgb(i32::MIN, i32::MAX, i32::MAX), ycocg_to_rgb(0, 255, 255));
        assert_eq!(ycocg_to_rgb(i32::MAX, i32::MIN, i32::MIN), ycocg_to_rgb(255, -255, -255));
    }

    #[test]
    fn test_normal_quantization() {
        for n in [i16::MIN, -1000, 0, 1, 12345, i16::MAX] {
            let back = dequantize_normal(quantize_normal(n, 10), 10);
            assert!((back as i32 - n as i32).abs() <= 32, "{n} -> {back}");
        }
        assert_eq!(dequantize_normal(quantize_normal(-7, 16), 16), -7);
    }

    #[test]
    fn test_channel_quantization() {
        for v in 0..=255 {
            let back = dequantize_channel(quantize_channel(v, 6), 6);
            assert!((back - v).abs() <= 2);
        }
        assert_eq!(dequantize_channel(quantize_channel(77, 8), 8), 77);
    }

    #[test]
    fn test_position_grid() {
        let q = quantize_position("test", Vec3::new(1.0, -2.5, 0.126), 0.25).unwrap();
        assert_eq!(q, [4, -10, 1]);
        assert_eq!(dequantize_position(q, 0.25), Vec3::new(1.0, -2.5, 0.25));
        assert!(quantize_position("test", Vec3::new(f32::NAN, 0.0, 0.0), 0.25).is_err());
    }
}
