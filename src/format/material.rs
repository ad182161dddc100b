//! Material records.

use std::io::{Read, Write};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{read_u32, write_u32, Record};
use crate::util::{Error, Result};

/// Shading model of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum MaterialType {
    #[default]
    Base = 0,
    Lambert = 1,
    Phong = 2,
    Pbr = 3,
}

impl MaterialType {
    fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Base,
            1 => Self::Lambert,
            2 => Self::Phong,
            3 => Self::Pbr,
            _ => return None,
        })
    }
}

bitflags! {
    /// Which inputs a material samples.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MaterialMode: u32 {
        const COLOR = 0x1;
        const TEXTURE = 0x2;
        const BUMP = 0x4;
    }
}

/// Surface parameters referenced by patches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub kind: MaterialType,
    pub mode: MaterialMode,
    pub color: [u8; 3],
    pub ambient: [u8; 3],
    pub emissive: [u8; 3],
    pub specular: [u8; 3],
    pub opacity: f32,
    pub shininess: f32,
    pub metallic: f32,
    pub roughness: f32,
    pub reflectance: f32,
    pub clearcoat_thickness: f32,
    pub clearcoat_roughness: f32,
    pub anisotropy: f32,
    pub anisotropy_rotation: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialType::Base,
            mode: MaterialMode::COLOR,
            color: [255; 3],
            ambient: [0; 3],
            emissive: [0; 3],
            specular: [0; 3],
            opacity: 1.0,
            shininess: 8.0,
            metallic: 0.0,
            roughness: 1.0,
            reflectance: 0.5,
            clearcoat_thickness: 0.0,
            clearcoat_roughness: 0.0,
            anisotropy: 0.0,
            anisotropy_rotation: 0.0,
        }
    }
}

fn read_rgb<R: Read>(r: &mut R) -> Result<[u8; 3]> {
    let mut c = [0u8; 3];
    r.read_exact(&mut c)?;
    Ok(c)
}

impl Record for Material {
    const SIZE: usize = 56;
    const NAME: &'static str = "material";

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let kind = read_u32(r)?;
        let kind = MaterialType::from_u32(kind)
            .ok_or_else(|| Error::invalid(format!("unknown material type {kind}")))?;
        let mode = MaterialMode::from_bits_retain(read_u32(r)?);
        let color = read_rgb(r)?;
        let ambient = read_rgb(r)?;
        let emissive = read_rgb(r)?;
        let specular = read_rgb(r)?;
        let mut scalars = [0f32; 9];
        r.read_f32_into::<LittleEndian>(&mut scalars)?;
        let [opacity, shininess, metallic, roughness, reflectance, clearcoat_thickness, clearcoat_roughness, anisotropy, anisotropy_rotation] =
            scalars;
        Ok(Self {
            kind,
            mode,
            color,
            ambient,
            emissive,
            specular,
            opacity,
            shininess,
            metallic,
            roughness,
            reflectance,
            clearcoat_thickness,
            clearcoat_roughness,
            anisotropy,
            anisotropy_rotation,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.kind as u32)?;
        write_u32(w, self.mode.bits())?;
        w.write_all(&self.color)?;
        w.write_all(&self.ambient)?;
        w.write_all(&self.emissive)?;
        w.write_all(&self.specular)?;
        for v in [
            self.opacity,
            self.shininess,
            self.metallic,
            self.roughness,
            self.reflectance,
            self.clearcoat_thickness,
            self.clearcoat_roughness,
            self.anisotropy,
            self.anisotropy_rotation,
        ] {
            w.write_f32::<LittleEndian>(v)?;
        }
        Ok(())
    }
}
