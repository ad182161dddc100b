//! Decoded geometry held in an archive's payload slots.

use crate::format::{Instance, Signature};
use crate::util::{BBox3f, Error, Result, Sphere, Vec2, Vec3};

/// Largest vertex count a node can hold (`u16` face indices and counts).
pub const MAX_NODE_VERTICES: usize = u16::MAX as usize;

/// Decoded arrays of one node. Optional arrays are empty when the signature
/// does not carry them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<[u16; 3]>,
    pub normals: Vec<[i16; 3]>,
    pub texcoords: Vec<Vec2>,
    pub colors: Vec<[u8; 4]>,
}

impl NodeMesh {
    #[inline]
    pub fn nvert(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn nface(&self) -> usize {
        self.faces.len()
    }

    /// No faces: the node is a point cloud.
    #[inline]
    pub fn is_point_cloud(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn bounds(&self) -> BBox3f {
        BBox3f::from_points(&self.positions)
    }

    /// Sphere around the vertex box.
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::from_box(&self.bounds())
    }

    /// Check the arrays against the signature and the node size limits.
    pub fn validate(&self, sig: &Signature) -> Result<()> {
        let n = self.nvert();
        if n > MAX_NODE_VERTICES {
            return Err(Error::invalid(format!(
                "node has {n} vertices, at most {MAX_NODE_VERTICES} fit"
            )));
        }
        if self.nface() > MAX_NODE_VERTICES {
            return Err(Error::invalid(format!(
                "node has {} faces, at most {MAX_NODE_VERTICES} fit",
                self.nface()
            )));
        }
        check_len("normal", self.normals.len(), sig.has_normals(), n)?;
        check_len("texcoord", self.texcoords.len(), sig.has_texcoords(), n)?;
        check_len("color", self.colors.len(), sig.has_colors(), n)?;
        if let Some(bad) = self.faces.iter().flatten().find(|&&i| i as usize >= n) {
            return Err(Error::invalid(format!("face index {bad} beyond {n} vertices")));
        }
        Ok(())
    }
}

fn check_len(what: &str, len: usize, present: bool, nvert: usize) -> Result<()> {
    let expected = if present { nvert } else { 0 };
    if len != expected {
        return Err(Error::invalid(format!(
            "{what} array has {len} entries, expected {expected}"
        )));
    }
    Ok(())
}

/// Shared mesh of an instance node plus its placements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstanceMesh {
    pub mesh: NodeMesh,
    pub instances: Vec<Instance>,
}
