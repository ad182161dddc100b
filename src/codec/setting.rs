//! Quantization settings for the compressed geometry codecs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result, Sphere};

pub const DEFAULT_NORMAL_BITS: u32 = 10;
pub const DEFAULT_LUMA_BITS: u32 = 6;
pub const DEFAULT_CHROMA_BITS: u32 = 6;
pub const DEFAULT_ALPHA_BITS: u32 = 5;
pub const DEFAULT_TEX_STEP: f32 = 0.25;
/// Coordinate bits used when neither bits nor a step are given.
pub const DEFAULT_COORD_BITS: u32 = 14;

/// User-facing quantization request. Zero fields take the defaults.
///
/// Loaded from JSON, e.g. `{"coord_bits": 12, "normal_bits": 8}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressSetting {
    /// Coordinate precision relative to the model radius.
    pub coord_bits: u32,
    /// Absolute coordinate step, used when `coord_bits` is zero.
    pub coord_step: f32,
    pub normal_bits: u32,
    /// Luma, chroma, chroma, alpha.
    pub color_bits: [u32; 4],
    /// Texture-space step in texels of a 512 texture.
    pub tex_step: f32,
    /// Explicit uv bits; derived from `tex_step` when zero.
    pub uv_bits: u32,
    /// zlib level of the grid codec.
    pub level: u32,
}

impl Default for CompressSetting {
    fn default() -> Self {
        Self {
            coord_bits: 0,
            coord_step: 0.0,
            normal_bits: DEFAULT_NORMAL_BITS,
            color_bits: [
                DEFAULT_LUMA_BITS,
                DEFAULT_CHROMA_BITS,
                DEFAULT_CHROMA_BITS,
                DEFAULT_ALPHA_BITS,
            ],
            tex_step: DEFAULT_TEX_STEP,
            uv_bits: 0,
            level: 6,
        }
    }
}

impl CompressSetting {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve against the bounding sphere of the whole model.
    pub fn resolve(&self, sphere: &Sphere) -> QuantizationBudget {
        let radius = sphere.radius;
        let step = if self.coord_bits > 0 && radius > 0.0 {
            radius / 2f32.powi(self.coord_bits as i32)
        } else if self.coord_step > 0.0 {
            self.coord_step
        } else if radius > 0.0 {
            radius / 2f32.powi(DEFAULT_COORD_BITS as i32)
        } else {
            2f32.powi(-(DEFAULT_COORD_BITS as i32))
        };
        let coord_q = (step.log2().floor() as i32).clamp(-40, 40);

        let defaults = Self::default();
        let pick = |v: u32, d: u32, max: u32| (if v == 0 { d } else { v }).clamp(1, max) as u8;
        let color_bits = [0, 1, 2, 3].map(|i| pick(self.color_bits[i], defaults.color_bits[i], 8));

        let tex_step = if self.tex_step > 0.0 { self.tex_step } else { DEFAULT_TEX_STEP };
        let uv_bits = if self.uv_bits > 0 {
            self.uv_bits
        } else {
            (512.0 / tex_step).log2().round().max(1.0) as u32
        };

        QuantizationBudget {
            coord_q,
            normal_bits: pick(self.normal_bits, DEFAULT_NORMAL_BITS, 16),
            color_bits,
            uv_bits: uv_bits.clamp(1, 24) as u8,
            level: self.level.min(9),
        }
    }
}

/// Resolved quantization handed to a geometry codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationBudget {
    /// log2 of the coordinate step.
    pub coord_q: i32,
    pub normal_bits: u8,
    pub color_bits: [u8; 4],
    pub uv_bits: u8,
    pub level: u32,
}

impl QuantizationBudget {
    #[inline]
    pub fn coord_step(&self) -> f32 {
        2f32.powi(self.coord_q)
    }

    /// Size of one uv quantum.
    #[inline]
    pub fn uv_step(&self) -> f32 {
        2f32.powi(-(self.uv_bits as i32))
    }
}

impl Default for QuantizationBudget {
    fn default() -> Self {
        CompressSetting::default().resolve(&Sphere::EMPTY)
    }
}
