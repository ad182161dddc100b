//! Attribute signature: which per-vertex and per-face arrays an archive
//! stores, plus the codec selection flags.

use std::io::{Read, Write};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::{Error, Result};

/// Scalar type of one attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AttributeType {
    #[default]
    None = 0,
    Byte = 1,
    UnsignedByte = 2,
    Short = 3,
    UnsignedShort = 4,
    Int = 5,
    UnsignedInt = 6,
    Float = 7,
    Double = 8,
}

impl AttributeType {
    /// Size of one component in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Byte,
            2 => Self::UnsignedByte,
            3 => Self::Short,
            4 => Self::UnsignedShort,
            5 => Self::Int,
            6 => Self::UnsignedInt,
            7 => Self::Float,
            8 => Self::Double,
            _ => return None,
        })
    }
}

/// One attribute slot: component type and component count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attribute {
    pub kind: AttributeType,
    pub count: u8,
}

impl Attribute {
    pub const fn new(kind: AttributeType, count: u8) -> Self {
        Self { kind, count }
    }

    /// Size of one element of this attribute in bytes.
    pub const fn size(&self) -> usize {
        self.count as usize * self.kind.size()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind != AttributeType::None
    }
}

/// Vertex attribute slots.
pub const VERTEX_COORD: usize = 0;
pub const VERTEX_NORM: usize = 1;
pub const VERTEX_COLOR: usize = 2;
pub const VERTEX_TEX: usize = 3;
pub const VERTEX_DATA0: usize = 4;

/// Face attribute slots.
pub const FACE_INDEX: usize = 0;
pub const FACE_NORM: usize = 1;
pub const FACE_COLOR: usize = 2;
pub const FACE_TEX: usize = 3;
pub const FACE_DATA0: usize = 4;

/// Eight attribute slots describing either vertices or faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Element {
    pub attributes: [Attribute; 8],
}

impl Element {
    /// Set a slot. Panics if `slot >= 8`.
    pub fn set(&mut self, slot: usize, attr: Attribute) {
        self.attributes[slot] = attr;
    }

    #[inline]
    pub fn has(&self, slot: usize) -> bool {
        self.attributes.get(slot).is_some_and(Attribute::is_valid)
    }

    /// Size of one full element in bytes.
    pub fn size(&self) -> usize {
        self.attributes.iter().map(Attribute::size).sum()
    }

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut e = Self::default();
        for attr in &mut e.attributes {
            let kind = r.read_u8()?;
            let count = r.read_u8()?;
            attr.kind = AttributeType::from_u8(kind)
                .ok_or_else(|| Error::invalid(format!("unknown attribute type {kind}")))?;
            attr.count = count;
        }
        Ok(e)
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for attr in &self.attributes {
            w.write_u8(attr.kind as u8)?;
            w.write_u8(attr.count)?;
        }
        Ok(())
    }
}

bitflags! {
    /// Codec and layout selection bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SignatureFlags: u32 {
        /// Textures are JPEG.
        const PTJPG = 0x1;
        /// Textures are PNG.
        const PTPNG = 0x2;
        /// Geometry uses the grid codec.
        const CORTO = 0x4;
        /// Geometry uses the packed codec.
        const DRACO = 0x8;
        /// The archive is one tile of a larger tiled model.
        const TILE = 0x10;
        /// Instances are stored as translation/scale/rotation instead of a matrix.
        const INSTANCE_TRS = 0x20;
    }
}

/// Which geometry encoding an archive uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryEncoding {
    Raw,
    Corto,
    Draco,
}

/// Which still-image codec an archive's textures use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Jpeg,
    Png,
}

impl TextureFormat {
    /// File extension used when textures are extracted.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Per-vertex and per-face attribute table plus flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signature {
    pub vertex: Element,
    pub face: Element,
    pub flags: SignatureFlags,
}

impl Signature {
    /// Encoded size in bytes.
    pub const SIZE: usize = 36;

    /// Float positions and `u16` triangle indices, plus the requested
    /// optional vertex attributes in their canonical storage types.
    pub fn mesh(normals: bool, colors: bool, texcoords: bool) -> Self {
        let mut s = Self::default();
        s.vertex.set(VERTEX_COORD, Attribute::new(AttributeType::Float, 3));
        s.face.set(FACE_INDEX, Attribute::new(AttributeType::UnsignedShort, 3));
        if normals {
            s.vertex.set(VERTEX_NORM, Attribute::new(AttributeType::Short, 3));
        }
        if colors {
            s.vertex.set(VERTEX_COLOR, Attribute::new(AttributeType::UnsignedByte, 4));
        }
        if texcoords {
            s.vertex.set(VERTEX_TEX, Attribute::new(AttributeType::Float, 2));
        }
        s
    }

    pub fn with_flags(mut self, flags: SignatureFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn set_flag(&mut self, flag: SignatureFlags) {
        self.flags |= flag;
    }

    pub fn unset_flag(&mut self, flag: SignatureFlags) {
        self.flags &= !flag;
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        self.vertex.has(VERTEX_NORM)
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        self.vertex.has(VERTEX_COLOR)
    }

    #[inline]
    pub fn has_texcoords(&self) -> bool {
        self.vertex.has(VERTEX_TEX)
    }

    #[inline]
    pub fn has_face_index(&self) -> bool {
        self.face.has(FACE_INDEX)
    }

    /// Textures are stored with some image codec.
    #[inline]
    pub fn has_ptextures(&self) -> bool {
        self.flags.intersects(SignatureFlags::PTJPG | SignatureFlags::PTPNG)
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags.intersects(SignatureFlags::CORTO | SignatureFlags::DRACO)
    }

    #[inline]
    pub fn is_tile(&self) -> bool {
        self.flags.contains(SignatureFlags::TILE)
    }

    #[inline]
    pub fn instance_trs(&self) -> bool {
        self.flags.contains(SignatureFlags::INSTANCE_TRS)
    }

    /// Geometry encoding selected by the flags. Both codec bits set is invalid.
    pub fn geometry_encoding(&self) -> Result<GeometryEncoding> {
        let corto = self.flags.contains(SignatureFlags::CORTO);
        let draco = self.flags.contains(SignatureFlags::DRACO);
        match (corto, draco) {
            (false, false) => Ok(GeometryEncoding::Raw),
            (true, false) => Ok(GeometryEncoding::Corto),
            (false, true) => Ok(GeometryEncoding::Draco),
            (true, true) => Err(Error::invalid("signature selects two geometry codecs")),
        }
    }

    /// Texture codec selected by the flags, `None` when the archive has no
    /// texture codec. Both image bits set is invalid.
    pub fn texture_format(&self) -> Result<Option<TextureFormat>> {
        let jpg = self.flags.contains(SignatureFlags::PTJPG);
        let png = self.flags.contains(SignatureFlags::PTPNG);
        match (jpg, png) {
            (false, false) => Ok(None),
            (true, false) => Ok(Some(TextureFormat::Jpeg)),
            (false, true) => Ok(Some(TextureFormat::Png)),
            (true, true) => Err(Error::invalid("signature selects two texture codecs")),
        }
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let vertex = Element::read_from(r)?;
        let face = Element::read_from(r)?;
        let flags = SignatureFlags::from_bits_retain(r.read_u32::<LittleEndian>()?);
        Ok(Self { vertex, face, flags })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        self.vertex.write_to(w)?;
        self.face.write_to(w)?;
        w.write_u32::<LittleEndian>(self.flags.bits())?;
        Ok(())
    }
}
