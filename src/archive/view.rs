//! Borrowed bundles of one node's record, patches and payloads.

use std::ops::Range;

use image::RgbaImage;

use super::{check_index, Archive};
use crate::format::{Feature, Instance, InstanceNode, Material, Node, Patch, Texture};
use crate::mesh::{InstanceMesh, NodeMesh};
use crate::util::Result;

/// A texture referenced by some patch, with its image when decoded.
#[derive(Debug, Clone, Copy)]
pub struct TextureRef<'a> {
    pub id: usize,
    pub texture: &'a Texture,
    pub image: Option<&'a RgbaImage>,
}

/// A feature referenced by some patch and its accumulated payload.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRef<'a> {
    pub id: usize,
    pub feature: &'a Feature,
    pub data: &'a [u8],
}

/// Everything the archive knows about one node.
#[derive(Debug, Clone)]
pub struct NodeView<'a> {
    pub index: usize,
    pub node: &'a Node,
    pub patches: &'a [Patch],
    /// `None` until the node is loaded.
    pub mesh: Option<&'a NodeMesh>,
    pub textures: Vec<TextureRef<'a>>,
    pub materials: Vec<(usize, &'a Material)>,
    pub features: Vec<FeatureRef<'a>>,
}

/// Everything the archive knows about one instance node.
#[derive(Debug, Clone)]
pub struct InstanceView<'a> {
    pub index: usize,
    pub instance_node: &'a InstanceNode,
    pub patches: &'a [Patch],
    /// Rows of the Instance table. Matches `mesh.instances` once loaded.
    pub instances: &'a [Instance],
    pub mesh: Option<&'a InstanceMesh>,
    pub textures: Vec<TextureRef<'a>>,
    pub materials: Vec<(usize, &'a Material)>,
    pub features: Vec<FeatureRef<'a>>,
}

/// Referenced ids in first-use order, each once.
struct Refs<'a> {
    textures: Vec<TextureRef<'a>>,
    materials: Vec<(usize, &'a Material)>,
    features: Vec<FeatureRef<'a>>,
}

impl Archive {
    pub fn node_view(&self, n: usize) -> Result<NodeView<'_>> {
        check_index("node", n, self.node_count())?;
        let range = self.node_patch_range(n)?;
        let refs = self.collect_refs(range.clone())?;
        Ok(NodeView {
            index: n,
            node: &self.nodes[n],
            patches: &self.patches[range],
            mesh: self.node_mesh(n),
            textures: refs.textures,
            materials: refs.materials,
            features: refs.features,
        })
    }

    pub fn instance_view(&self, n: usize) -> Result<InstanceView<'_>> {
        check_index("instance node", n, self.instance_node_count())?;
        let range = self.instance_patch_range(n)?;
        let refs = self.collect_refs(range.clone())?;
        Ok(InstanceView {
            index: n,
            instance_node: &self.instance_nodes[n],
            patches: &self.patches[range],
            instances: &self.instances[self.instance_range(n)?],
            mesh: self.instance_mesh(n),
            textures: refs.textures,
            materials: refs.materials,
            features: refs.features,
        })
    }

    /// Textures and materials out of range are errors; missing features are
    /// skipped as the loader skips them.
    fn collect_refs(&self, patches: Range<usize>) -> Result<Refs<'_>> {
        let mut refs = Refs {
            textures: Vec::new(),
            materials: Vec::new(),
            features: Vec::new(),
        };
        for patch in &self.patches[patches] {
            if let Some(t) = patch.texture() {
                let t = t as usize;
                check_index("texture", t, self.texture_count())?;
                if !refs.textures.iter().any(|r| r.id == t) {
                    refs.textures.push(TextureRef {
                        id: t,
                        texture: &self.textures[t],
                        image: self.texture_image(t),
                    });
                }
            }
            if let Some(m) = patch.material() {
                let m = m as usize;
                check_index("material", m, self.materials.len())?;
                if !refs.materials.iter().any(|(id, _)| *id == m) {
                    refs.materials.push((m, &self.materials[m]));
                }
            }
            if let Some(f) = patch.feature() {
                let f = f as usize;
                if f < self.feature_count() && !refs.features.iter().any(|r| r.id == f) {
                    refs.features.push(FeatureRef {
                        id: f,
                        feature: &self.features[f],
                        data: &self.feature_data[f],
                    });
                }
            }
        }
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Signature, SignatureFlags, NONE};
    use crate::mesh::tests::grid_mesh;
    use crate::ErrorKind;

    fn archive() -> Archive {
        let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::PTPNG);
        let mut a = Archive::new(sig, None).unwrap();
        a.push_texture(Texture::default(), RgbaImage::new(2, 2)).unwrap();
        a.push_material(Material::default()).unwrap();
        a.push_feature(Feature::default(), b"abc".to_vec()).unwrap();
        let mesh = grid_mesh(2);
        let patches = vec![
            Patch { node: 1, face_offset: 2, texture: 0, material: 0, feature: 0 },
            Patch { node: 1, face_offset: 5, texture: 0, material: NONE, feature: 7 },
            Patch { node: 1, face_offset: 8, texture: NONE, material: 0, feature: 0 },
        ];
        a.push_node(Node::default(), mesh, patches).unwrap();
        a
    }

    #[test]
    fn test_node_view_dedups_refs() {
        let a = archive();
        let v = a.node_view(0).unwrap();
        assert_eq!(v.patches.len(), 3);
        assert!(v.mesh.is_some());
        assert_eq!(v.textures.len(), 1);
        assert!(v.textures[0].image.is_some());
        assert_eq!(v.materials.len(), 1);
        assert_eq!(v.features.len(), 1);
        assert_eq!(v.features[0].data, b"abc");
    }

    #[test]
    fn test_view_out_of_range() {
        let a = archive();
        assert_eq!(a.node_view(1).unwrap_err().kind(), ErrorKind::Range);
        assert_eq!(a.instance_view(0).unwrap_err().kind(), ErrorKind::Range);
    }
}
