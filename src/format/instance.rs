//! Instance records and the placement payload of instance blocks.

use std::io::{Read, Write};

use super::{read_f32s, read_u32, read_vec3, write_f32s, write_u32, Signature};
use crate::util::{Error, Mat4, Quat, Result, Vec3};

/// How placements are stored, chosen per archive by the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceLayout {
    /// Full 4x4 matrix.
    #[default]
    Matrix,
    /// Translation, scale and rotation quaternion.
    Trs,
}

impl InstanceLayout {
    pub fn from_signature(sig: &Signature) -> Self {
        if sig.instance_trs() {
            Self::Trs
        } else {
            Self::Matrix
        }
    }

    /// Bytes of one transform.
    pub const fn transform_size(self) -> usize {
        match self {
            Self::Matrix => 64,
            Self::Trs => 40,
        }
    }

    /// Bytes of one index record (id + transform).
    pub const fn record_size(self) -> usize {
        4 + self.transform_size()
    }
}

/// Transform of one placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Matrix(Mat4),
    Trs {
        translation: Vec3,
        scale: Vec3,
        rotation: Quat,
    },
}

impl Placement {
    pub fn layout(&self) -> InstanceLayout {
        match self {
            Self::Matrix(_) => InstanceLayout::Matrix,
            Self::Trs { .. } => InstanceLayout::Trs,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        match *self {
            Self::Matrix(m) => m,
            Self::Trs { translation, scale, rotation } => {
                Mat4::from_scale_rotation_translation(scale, rotation, translation)
            }
        }
    }

    fn read_from<R: Read>(r: &mut R, layout: InstanceLayout) -> Result<Self> {
        Ok(match layout {
            InstanceLayout::Matrix => Self::Matrix(Mat4::from_cols_array(&read_f32s::<_, 16>(r)?)),
            InstanceLayout::Trs => {
                let translation = read_vec3(r)?;
                let scale = read_vec3(r)?;
                let rotation = Quat::from_array(read_f32s::<_, 4>(r)?);
                Self::Trs { translation, scale, rotation }
            }
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Self::Matrix(m) => write_f32s(w, &m.to_cols_array()),
            Self::Trs { translation, scale, rotation } => {
                write_f32s(w, &translation.to_array())?;
                write_f32s(w, &scale.to_array())?;
                write_f32s(w, &rotation.to_array())
            }
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::Matrix(Mat4::IDENTITY)
    }
}

/// One placement of an instance node's shared mesh.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Instance {
    pub id: u32,
    pub placement: Placement,
}

impl Instance {
    pub const NAME: &'static str = "instance";

    pub fn read_from<R: Read>(r: &mut R, layout: InstanceLayout) -> Result<Self> {
        let id = read_u32(r)?;
        let placement = Placement::read_from(r, layout)?;
        Ok(Self { id, placement })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.id)?;
        self.placement.write_to(w)
    }
}

/// Read a table of instances stored with `layout`.
pub fn read_instances<R: Read>(r: &mut R, count: usize, layout: InstanceLayout) -> Result<Vec<Instance>> {
    (0..count).map(|_| Instance::read_from(r, layout)).collect()
}

/// Encode the trailing payload of an instance block: all ids, then all
/// transforms.
pub fn encode_placements(instances: &[Instance], layout: InstanceLayout) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(instances.len() * layout.record_size());
    for inst in instances {
        write_u32(&mut buf, inst.id)?;
    }
    for inst in instances {
        check_layout(inst, layout)?;
        inst.placement.write_to(&mut buf)?;
    }
    Ok(buf)
}

/// Decode `count` placements from the trailing payload of an instance block.
/// Bytes after the last transform (block padding) are ignored.
pub fn decode_placements(data: &[u8], count: usize, layout: InstanceLayout) -> Result<Vec<Instance>> {
    let needed = count * layout.record_size();
    if data.len() < needed {
        return Err(Error::invalid(format!(
            "instance payload holds {} bytes, {} placements need {}",
            data.len(),
            count,
            needed
        )));
    }
    let mut r = data;
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(read_u32(&mut r)?);
    }
    ids.into_iter()
        .map(|id| Ok(Instance { id, placement: Placement::read_from(&mut r, layout)? }))
        .collect()
}

pub(crate) fn check_layout(inst: &Instance, layout: InstanceLayout) -> Result<()> {
    if inst.placement.layout() != layout {
        return Err(Error::invalid(format!(
            "instance {} stored as {:?}, archive uses {:?}",
            inst.id,
            inst.placement.layout(),
            layout
        )));
    }
    Ok(())
}
