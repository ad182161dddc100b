//! In-memory construction of archives.

use image::RgbaImage;

use super::layout::count_roots;
use super::Archive;
use crate::codec::{self, check_patches, texture, CompressSetting};
use crate::format::{
    check_layout, Feature, Header, InstanceLayout, InstanceNode, Material, Node, Patch, Signature,
    SignatureFlags, Texture,
};
use crate::mesh::{InstanceMesh, NodeMesh};
use crate::util::{Error, Mat4, Result, Sphere};

impl Archive {
    /// Empty archive with the given signature. `setting` controls the
    /// quantization of compressed codecs at save time.
    pub fn new(signature: Signature, setting: Option<CompressSetting>) -> Result<Self> {
        let codec = codec::for_signature(&signature)?;
        let mut archive = Self {
            header: Header::new(signature),
            nodes: vec![Node::default()],
            instance_nodes: vec![InstanceNode::default()],
            instances: Vec::new(),
            patches: Vec::new(),
            textures: vec![Texture::default()],
            materials: Vec::new(),
            features: vec![Feature::default()],
            nroots: 0,
            setting: setting.unwrap_or_default(),
            codec,
            source: None,
            path: None,
            node_meshes: Vec::new(),
            instance_meshes: Vec::new(),
            texture_images: Vec::new(),
            feature_data: Vec::new(),
        };
        archive.sync_counts();
        Ok(archive)
    }

    fn require_detached(&self) -> Result<()> {
        if self.source.is_some() {
            return Err(Error::other("archive is attached to its source; detach it before editing"));
        }
        Ok(())
    }

    fn sync_counts(&mut self) {
        let h = &mut self.header;
        h.n_nodes = self.nodes.len() as u32;
        h.n_instance_nodes = self.instance_nodes.len() as u32;
        h.n_instances = self.instances.len() as u32;
        h.n_patches = self.patches.len() as u32;
        h.n_textures = self.textures.len() as u32;
        h.n_materials = self.materials.len() as u32;
        h.n_features = self.features.len() as u32;
    }

    /// Set the model bounding sphere. Pushed nodes keep growing it.
    pub fn set_sphere(&mut self, sphere: Sphere) {
        self.header.sphere = sphere;
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.header.matrix = matrix;
    }

    /// Mark the archive as tile `coord` of a tiled model.
    pub fn set_tile(&mut self, coord: [u32; 3]) {
        self.header.tile = coord;
        self.header.signature.set_flag(SignatureFlags::TILE);
    }

    /// Change the geometry and texture codec flags. Loaded payloads are
    /// re-encoded with the new codecs on the next save.
    pub fn set_codec_flags(&mut self, geometry: SignatureFlags, texture: SignatureFlags) -> Result<()> {
        self.require_detached()?;
        let codec_bits = SignatureFlags::CORTO | SignatureFlags::DRACO;
        let texture_bits = SignatureFlags::PTJPG | SignatureFlags::PTPNG;
        let mut sig = self.header.signature;
        sig.unset_flag(codec_bits | texture_bits);
        sig.set_flag(geometry & codec_bits);
        sig.set_flag(texture & texture_bits);
        let geometry_codec = codec::for_signature(&sig)?;
        sig.texture_format()?;
        self.codec = geometry_codec;
        self.header.signature = sig;
        Ok(())
    }

    /// Append a node with its decoded mesh and patches. Node counts, the
    /// first patch and an empty bounding sphere are filled from the mesh.
    ///
    /// All nodes must be pushed before any instance node.
    pub fn push_node(&mut self, mut node: Node, mesh: NodeMesh, patches: Vec<Patch>) -> Result<usize> {
        self.require_detached()?;
        if self.instance_node_count() > 0 {
            return Err(Error::other("nodes must be pushed before instance nodes"));
        }
        mesh.validate(self.signature())?;
        check_patches("builder", &mesh, &patches)?;

        fill_node(&mut node, &mesh, self.patches.len());
        let n = self.node_count();
        self.nodes.insert(n, node);
        self.patches.extend(patches);
        let end = self.patches.len() as u32;
        if let Some(sentinel) = self.nodes.last_mut() {
            sentinel.first_patch = end;
        }
        if let Some(sentinel) = self.instance_nodes.last_mut() {
            sentinel.node.first_patch = end;
        }

        self.header.sphere.merge(&node.sphere);
        self.header.nvert += mesh.nvert() as u64;
        self.header.nface += mesh.nface() as u64;
        self.node_meshes.push(Some(mesh));
        self.nroots = count_roots(&self.nodes, &self.patches);
        self.sync_counts();
        Ok(n)
    }

    /// Append an instance node: a shared mesh, its placements and patches.
    pub fn push_instance_node(
        &mut self,
        mut inode: InstanceNode,
        mesh: InstanceMesh,
        patches: Vec<Patch>,
    ) -> Result<usize> {
        self.require_detached()?;
        mesh.mesh.validate(self.signature())?;
        check_patches("builder", &mesh.mesh, &patches)?;
        let layout = InstanceLayout::from_signature(self.signature());
        for inst in &mesh.instances {
            check_layout(inst, layout)?;
        }

        fill_node(&mut inode.node, &mesh.mesh, self.patches.len());
        inode.ninstance = mesh.instances.len() as u32;
        let n = self.instance_node_count();
        self.instance_nodes.insert(n, inode);
        self.patches.extend(patches);
        let end = self.patches.len() as u32;
        if let Some(sentinel) = self.instance_nodes.last_mut() {
            sentinel.node.first_patch = end;
        }

        self.header.sphere.merge(&inode.node.sphere);
        self.header.nvert += mesh.mesh.nvert() as u64;
        self.header.nface += mesh.mesh.nface() as u64;
        self.instances.extend_from_slice(&mesh.instances);
        self.instance_meshes.push(Some(mesh));
        self.sync_counts();
        Ok(n)
    }

    /// Append a texture. The signature must select an image codec.
    pub fn push_texture(&mut self, texture: Texture, image: RgbaImage) -> Result<usize> {
        self.require_detached()?;
        texture::format_for(self.signature())?;
        let t = self.texture_count();
        self.textures.insert(t, texture);
        self.texture_images.push(Some(image));
        self.sync_counts();
        Ok(t)
    }

    pub fn push_material(&mut self, material: Material) -> Result<usize> {
        self.require_detached()?;
        self.materials.push(material);
        self.sync_counts();
        Ok(self.materials.len() - 1)
    }

    /// Append a feature with its initial payload.
    pub fn push_feature(&mut self, feature: Feature, data: Vec<u8>) -> Result<usize> {
        self.require_detached()?;
        let f = self.feature_count();
        self.features.insert(f, feature);
        self.feature_data.push(data);
        self.sync_counts();
        Ok(f)
    }
}

fn fill_node(node: &mut Node, mesh: &NodeMesh, first_patch: usize) {
    node.first_patch = first_patch as u32;
    node.nvert = mesh.nvert() as u16;
    node.nface = mesh.nface() as u16;
    if node.sphere.is_empty() {
        node.sphere = mesh.bounding_sphere();
    }
    if node.tight_radius == 0.0 {
        node.tight_radius = node.sphere.radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Instance, NONE};
    use crate::mesh::tests::grid_mesh;

    fn sig() -> Signature {
        Signature::mesh(true, true, true).with_flags(SignatureFlags::PTPNG)
    }

    fn patch(node: u32, face_offset: u32) -> Patch {
        Patch { node, face_offset, texture: NONE, material: NONE, feature: NONE }
    }

    #[test]
    fn test_new_has_sentinels() {
        let a = Archive::new(sig(), None).unwrap();
        assert_eq!(a.node_count(), 0);
        assert_eq!(a.header().n_nodes, 1);
        assert_eq!(a.header().n_textures, 1);
        assert_eq!(a.header().n_features, 1);
        assert_eq!(a.header().n_instance_nodes, 1);
        assert_eq!(a.nroots(), 0);
    }

    #[test]
    fn test_push_node_keeps_ranges() {
        let mut a = Archive::new(sig(), None).unwrap();
        let mesh = grid_mesh(2);
        let nface = mesh.nface() as u32;
        a.push_node(Node::default(), mesh.clone(), vec![patch(1, 4), patch(1, nface)]).unwrap();
        a.push_node(Node::default(), mesh, vec![patch(2, nface)]).unwrap();

        assert_eq!(a.node_count(), 2);
        assert_eq!(a.node_patch_range(0).unwrap(), 0..2);
        assert_eq!(a.node_patch_range(1).unwrap(), 2..3);
        assert_eq!(a.header().n_patches, 3);
        assert_eq!(a.nodes()[1].nvert, 9);
        assert!(!a.sphere().is_empty());
        assert!(a.node_patch_range(2).is_err());
        // Node 0 references node 1, so only node 0 is a root.
        assert_eq!(a.nroots(), 1);
    }

    #[test]
    fn test_nodes_before_instances() {
        let s = Signature::mesh(false, false, false);
        let mut a = Archive::new(s, None).unwrap();
        let mut mesh = grid_mesh(1);
        mesh.normals.clear();
        mesh.texcoords.clear();
        mesh.colors.clear();
        let inst = InstanceMesh { mesh: mesh.clone(), instances: vec![Instance::default(); 2] };
        a.push_instance_node(InstanceNode::default(), inst, vec![]).unwrap();
        assert_eq!(a.instances().len(), 2);
        assert_eq!(a.instance_range(0).unwrap(), 0..2);
        assert!(a.push_node(Node::default(), mesh, vec![]).is_err());
    }

    #[test]
    fn test_texture_requires_codec_flag() {
        let mut a = Archive::new(Signature::mesh(false, false, false), None).unwrap();
        assert!(a.push_texture(Texture::default(), RgbaImage::new(4, 4)).is_err());

        let mut a = Archive::new(sig(), None).unwrap();
        assert_eq!(a.push_texture(Texture::default(), RgbaImage::new(4, 4)).unwrap(), 0);
        assert_eq!(a.texture_count(), 1);
        assert_eq!(a.header().n_textures, 2);
    }

    #[test]
    fn test_rejects_bad_mesh() {
        let mut a = Archive::new(sig(), None).unwrap();
        let mut mesh = grid_mesh(2);
        mesh.colors.pop();
        assert!(a.push_node(Node::default(), mesh, vec![]).is_err());
        assert_eq!(a.node_count(), 0);
    }

    #[test]
    fn test_set_codec_flags() {
        let mut a = Archive::new(sig(), None).unwrap();
        a.set_codec_flags(SignatureFlags::DRACO, SignatureFlags::PTJPG).unwrap();
        assert_eq!(a.codec().name(), "packed");
        assert!(a.signature().flags.contains(SignatureFlags::PTJPG));
        assert!(!a.signature().flags.contains(SignatureFlags::PTPNG));
        assert!(a
            .set_codec_flags(SignatureFlags::DRACO | SignatureFlags::CORTO, SignatureFlags::empty())
            .is_err());
    }

    #[test]
    fn test_rejected_codec_flags_leave_archive_unchanged() {
        let start = sig().with_flags(SignatureFlags::CORTO);
        let mut a = Archive::new(start, None).unwrap();
        assert_eq!(a.codec().name(), "grid");
        let err = a
            .set_codec_flags(SignatureFlags::DRACO, SignatureFlags::PTJPG | SignatureFlags::PTPNG)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Format);
        assert_eq!(a.codec().name(), "grid");
        assert_eq!(a.signature().flags, start.flags);
    }
}
