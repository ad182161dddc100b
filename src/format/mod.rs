//! Low-level LODM binary records.
//!
//! Every record is fixed-size, little-endian, and written field by field
//! with no implicit padding.
//!
//! ## File Structure
//!
//! ```text
//! +---------------------+
//! | Header              |  256 bytes
//! +---------------------+
//! | Node[]              |  44 bytes each (last entry is a sentinel)
//! | InstanceNode[]      |  52 bytes each (last entry is a sentinel)
//! | Instance[]          |  68 (matrix) or 44 (TRS) bytes each
//! | Patch[]             |  20 bytes each
//! | Texture[]           |  40 bytes each (last entry is a sentinel)
//! | Material[]          |  56 bytes each
//! | Feature[]           |  56 bytes each (last entry is a sentinel)
//! +---------------------+  padded to 256
//! | node blocks         |
//! | instance blocks     |
//! | texture blocks      |
//! | feature blocks      |  every block padded to 256
//! +---------------------+
//! ```

mod feature;
mod header;
mod instance;
mod material;
mod node;
mod patch;
mod signature;
mod texture;

pub use feature::*;
pub use header::*;
pub use instance::*;
pub use material::*;
pub use node::*;
pub use patch::*;
pub use signature::*;
pub use texture::*;

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::{Result, Sphere, Vec3};

/// Magic value at the start of every archive ("fwlm" little-endian).
pub const MAGIC: u32 = 0x6d6c_7766;

/// Current format version.
pub const CURRENT_VERSION: u32 = 0;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 256;

/// Alignment unit of every data block; stored addresses count these units.
pub const PADDING: u64 = 256;

/// "No texture / material / feature" marker in patch records.
pub const NONE: u32 = u32::MAX;

/// Convert a stored address (in padding units) to a byte offset.
#[inline]
pub const fn address(units: u32) -> u64 {
    units as u64 * PADDING
}

/// A fixed-size index record.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;
    /// Table name used in error messages.
    const NAME: &'static str;

    fn read_from<R: Read>(r: &mut R) -> Result<Self>;
    fn write_to<W: Write>(&self, w: &mut W) -> Result<()>;
}

/// Read `count` consecutive records.
pub fn read_table<T: Record, R: Read>(r: &mut R, count: usize) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(T::read_from(r)?);
    }
    Ok(out)
}

/// Write every record of a table.
pub fn write_table<T: Record, W: Write>(w: &mut W, table: &[T]) -> Result<()> {
    for rec in table {
        rec.write_to(w)?;
    }
    Ok(())
}

pub(crate) fn read_f32s<R: Read, const N: usize>(r: &mut R) -> Result<[f32; N]> {
    let mut out = [0f32; N];
    r.read_f32_into::<LittleEndian>(&mut out)?;
    Ok(out)
}

pub(crate) fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> Result<()> {
    for v in values {
        w.write_f32::<LittleEndian>(*v)?;
    }
    Ok(())
}

pub(crate) fn read_vec3<R: Read>(r: &mut R) -> Result<Vec3> {
    Ok(Vec3::from_array(read_f32s::<_, 3>(r)?))
}

pub(crate) fn read_sphere<R: Read>(r: &mut R) -> Result<Sphere> {
    Ok(Sphere::from_array(read_f32s::<_, 4>(r)?))
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(r.read_u32::<LittleEndian>()?)
}

pub(crate) fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_u32::<LittleEndian>(v)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn encoded<T: Record>(rec: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    rec.write_to(&mut buf).unwrap();
    buf
}
