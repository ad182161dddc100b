//! The archive: header, index tables, decoded payload slots and the byte
//! source they are streamed from.
//!
//! ```ignore
//! use lodm::Archive;
//!
//! let mut archive = Archive::open("model.lodm")?;
//! for n in 0..archive.nroots() {
//!     archive.load_node(n)?;
//! }
//! ```

mod builder;
mod layout;
mod loader;
mod source;
mod stream;
mod view;

pub use source::{BlockSource, ReadSeek};
pub use stream::OStream;
pub use view::{FeatureRef, InstanceView, NodeView, TextureRef};

use std::ops::Range;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::codec::{CompressSetting, GeometryCodec};
use crate::format::{
    Feature, Header, Instance, InstanceNode, Material, Node, Patch, Signature, Texture,
};
use crate::mesh::{InstanceMesh, NodeMesh};
use crate::util::{Error, Result, Sphere};

/// How an archive file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Map the file into memory instead of reading through a buffered stream.
    pub use_mmap: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
        }
    }
}

/// An LODM archive.
///
/// The node, instance-node, texture and feature tables hold one trailing
/// sentinel entry; accessors only expose the real entries.
pub struct Archive {
    header: Header,
    nodes: Vec<Node>,
    instance_nodes: Vec<InstanceNode>,
    instances: Vec<Instance>,
    patches: Vec<Patch>,
    textures: Vec<Texture>,
    materials: Vec<Material>,
    features: Vec<Feature>,
    nroots: usize,

    setting: CompressSetting,
    codec: Box<dyn GeometryCodec>,
    source: Option<BlockSource>,
    path: Option<PathBuf>,

    node_meshes: Vec<Option<NodeMesh>>,
    instance_meshes: Vec<Option<InstanceMesh>>,
    texture_images: Vec<Option<RgbaImage>>,
    feature_data: Vec<Vec<u8>>,
}

/// Real entries of a sentinel-terminated table.
#[inline]
fn real<T>(table: &[T]) -> &[T] {
    &table[..table.len().saturating_sub(1)]
}

#[inline]
pub(crate) fn check_index(table: &'static str, index: usize, count: usize) -> Result<()> {
    if index >= count {
        return Err(Error::OutOfRange { table, index, count });
    }
    Ok(())
}

impl Archive {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn signature(&self) -> &Signature {
        &self.header.signature
    }

    /// Bounding sphere of the whole model.
    pub fn sphere(&self) -> Sphere {
        self.header.sphere
    }

    /// Number of LOD-independent root nodes; roots are `0..nroots()`.
    pub fn nroots(&self) -> usize {
        self.nroots
    }

    /// Path the archive was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The archive still reads from a file or stream.
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&BlockSource> {
        self.source.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        real(&self.nodes)
    }

    pub fn instance_nodes(&self) -> &[InstanceNode] {
        real(&self.instance_nodes)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn textures(&self) -> &[Texture] {
        real(&self.textures)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn features(&self) -> &[Feature] {
        real(&self.features)
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn instance_node_count(&self) -> usize {
        self.instance_nodes().len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures().len()
    }

    pub fn feature_count(&self) -> usize {
        self.features().len()
    }

    pub fn node(&self, n: usize) -> Result<&Node> {
        check_index("node", n, self.node_count())?;
        Ok(&self.nodes[n])
    }

    pub fn instance_node(&self, n: usize) -> Result<&InstanceNode> {
        check_index("instance node", n, self.instance_node_count())?;
        Ok(&self.instance_nodes[n])
    }

    /// Patches owned by node `n`: `[Node[n].first_patch, Node[n+1].first_patch)`.
    pub fn node_patch_range(&self, n: usize) -> Result<Range<usize>> {
        check_index("node", n, self.node_count())?;
        patch_range(self.nodes[n].first_patch, self.nodes[n + 1].first_patch, self.patches.len())
    }

    pub fn instance_patch_range(&self, n: usize) -> Result<Range<usize>> {
        check_index("instance node", n, self.instance_node_count())?;
        patch_range(
            self.instance_nodes[n].node.first_patch,
            self.instance_nodes[n + 1].node.first_patch,
            self.patches.len(),
        )
    }

    pub fn node_patches(&self, n: usize) -> Result<&[Patch]> {
        Ok(&self.patches[self.node_patch_range(n)?])
    }

    pub fn instance_patches(&self, n: usize) -> Result<&[Patch]> {
        Ok(&self.patches[self.instance_patch_range(n)?])
    }

    /// Rows of the Instance table owned by instance node `n`.
    pub fn instance_range(&self, n: usize) -> Result<Range<usize>> {
        check_index("instance node", n, self.instance_node_count())?;
        let start: usize = self.instance_nodes[..n]
            .iter()
            .map(|i| i.ninstance as usize)
            .sum();
        let end = start + self.instance_nodes[n].ninstance as usize;
        if end > self.instances.len() {
            return Err(Error::invalid(format!(
                "instance node {n} owns placements up to {end}, table has {}",
                self.instances.len()
            )));
        }
        Ok(start..end)
    }

    pub fn node_mesh(&self, n: usize) -> Option<&NodeMesh> {
        self.node_meshes.get(n)?.as_ref()
    }

    pub fn instance_mesh(&self, n: usize) -> Option<&InstanceMesh> {
        self.instance_meshes.get(n)?.as_ref()
    }

    pub fn texture_image(&self, t: usize) -> Option<&RgbaImage> {
        self.texture_images.get(t)?.as_ref()
    }

    /// Accumulated payload of feature `f` (empty until loaded or pushed).
    pub fn feature_data(&self, f: usize) -> Option<&[u8]> {
        self.feature_data.get(f).map(Vec::as_slice)
    }

    pub fn setting(&self) -> &CompressSetting {
        &self.setting
    }

    pub fn set_setting(&mut self, setting: CompressSetting) {
        self.setting = setting;
    }

    pub fn codec(&self) -> &dyn GeometryCodec {
        self.codec.as_ref()
    }

    /// Replace the geometry codec chosen from the signature.
    pub fn set_geometry_codec(&mut self, codec: Box<dyn GeometryCodec>) {
        self.codec = codec;
    }

    /// Drop decoded payloads of node `n`, making the next load re-read it.
    pub fn unload_node(&mut self, n: usize) -> Result<()> {
        check_index("node", n, self.node_count())?;
        self.node_meshes[n] = None;
        Ok(())
    }
}

fn patch_range(first: u32, next: u32, npatches: usize) -> Result<Range<usize>> {
    let (first, next) = (first as usize, next as usize);
    if first > next || next > npatches {
        return Err(Error::invalid(format!(
            "patch range {first}..{next} outside {npatches} patches"
        )));
    }
    Ok(first..next)
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("nodes", &self.node_count())
            .field("instance_nodes", &self.instance_node_count())
            .field("patches", &self.patches.len())
            .field("textures", &self.texture_count())
            .field("features", &self.feature_count())
            .field("nroots", &self.nroots)
            .field("codec", &self.codec.name())
            .finish()
    }
}
