//! Index reading, block address arithmetic, root counting and `save`.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use super::stream::OStream;
use super::{check_index, Archive, BlockSource, OpenOptions};
use crate::codec::{self, texture, CompressSetting};
use crate::format::{
    check_layout, read_instances, read_table, write_table, Feature, Header, InstanceLayout,
    InstanceNode, Material, Node, Patch, Record, Texture, HEADER_SIZE, PADDING,
};
use crate::util::{Error, Result};

/// Byte size of the index tables described by `header`.
pub fn index_size(header: &Header) -> u64 {
    let layout = InstanceLayout::from_signature(&header.signature);
    header.n_nodes as u64 * Node::SIZE as u64
        + header.n_instance_nodes as u64 * InstanceNode::SIZE as u64
        + header.n_instances as u64 * layout.record_size() as u64
        + header.n_patches as u64 * Patch::SIZE as u64
        + header.n_textures as u64 * Texture::SIZE as u64
        + header.n_materials as u64 * Material::SIZE as u64
        + header.n_features as u64 * Feature::SIZE as u64
}

/// Convert a byte position to padding units.
fn units(pos: u64) -> Result<u32> {
    debug_assert_eq!(pos % PADDING, 0);
    u32::try_from(pos / PADDING)
        .map_err(|_| Error::invalid(format!("block offset {pos} exceeds the addressable range")))
}

/// Number of LOD-independent roots. `bound` starts at the number of real
/// nodes and shrinks whenever a scanned patch references a node below it;
/// the loop re-checks the shrinking bound.
pub(crate) fn count_roots(nodes: &[Node], patches: &[Patch]) -> usize {
    let real = nodes.len().saturating_sub(1);
    let mut bound = real;
    let mut j = 0;
    while j < bound {
        let first = nodes[j].first_patch as usize;
        let next = (nodes[j + 1].first_patch as usize).min(patches.len());
        for patch in patches.get(first..next).unwrap_or(&[]) {
            if (patch.node as usize) < bound {
                bound = patch.node as usize;
            }
        }
        j += 1;
    }
    bound
}

impl Archive {
    /// Open an archive file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, OpenOptions::default())
    }

    pub fn open_opts(path: impl AsRef<Path>, opts: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let source = BlockSource::open(path, opts.use_mmap)?;
        Self::from_source(source, Some(path.to_path_buf()))
    }

    /// Open an archive held by any seekable reader.
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R) -> Result<Self> {
        Self::from_source(BlockSource::from_reader(reader)?, None)
    }

    fn from_source(source: BlockSource, path: Option<PathBuf>) -> Result<Self> {
        if source.size() < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(source.size()));
        }
        let head = source.read_bytes(0, HEADER_SIZE)?;
        let header = Header::read_checked(&mut head.as_slice())?;
        let codec = codec::for_signature(&header.signature)?;

        let needed = HEADER_SIZE as u64 + index_size(&header);
        if source.size() < needed {
            return Err(Error::IndexTruncated {
                needed,
                available: source.size(),
            });
        }

        let index = source.read_range(HEADER_SIZE as u64, needed)?;
        let mut r = index.as_slice();
        let layout = InstanceLayout::from_signature(&header.signature);
        let nodes: Vec<Node> = read_table(&mut r, header.n_nodes as usize)?;
        let instance_nodes: Vec<InstanceNode> = read_table(&mut r, header.n_instance_nodes as usize)?;
        let instances = read_instances(&mut r, header.n_instances as usize, layout)?;
        let patches: Vec<Patch> = read_table(&mut r, header.n_patches as usize)?;
        let textures: Vec<Texture> = read_table(&mut r, header.n_textures as usize)?;
        let materials: Vec<Material> = read_table(&mut r, header.n_materials as usize)?;
        let features: Vec<Feature> = read_table(&mut r, header.n_features as usize)?;

        let nroots = count_roots(&nodes, &patches);
        tracing::debug!(
            path = ?path,
            nodes = nodes.len(),
            patches = patches.len(),
            nroots,
            codec = codec.name(),
            "opened archive"
        );

        let node_meshes = vec![None; nodes.len().saturating_sub(1)];
        let instance_meshes = vec![None; instance_nodes.len().saturating_sub(1)];
        let texture_images = vec![None; textures.len().saturating_sub(1)];
        let feature_data = vec![Vec::new(); features.len().saturating_sub(1)];

        Ok(Self {
            header,
            nodes,
            instance_nodes,
            instances,
            patches,
            textures,
            materials,
            features,
            nroots,
            setting: CompressSetting::default(),
            codec,
            source: Some(source),
            path,
            node_meshes,
            instance_meshes,
            texture_images,
            feature_data,
        })
    }

    /// Byte range `[start, end)` of node `n`'s block.
    pub fn node_block_range(&self, n: usize) -> Result<(u64, u64)> {
        check_index("node", n, self.node_count())?;
        Ok((self.nodes[n].address(), self.nodes[n + 1].address()))
    }

    pub fn instance_block_range(&self, n: usize) -> Result<(u64, u64)> {
        check_index("instance node", n, self.instance_node_count())?;
        Ok((
            self.instance_nodes[n].node.address(),
            self.instance_nodes[n + 1].node.address(),
        ))
    }

    pub fn texture_block_range(&self, t: usize) -> Result<(u64, u64)> {
        check_index("texture", t, self.texture_count())?;
        Ok((self.textures[t].address(), self.textures[t + 1].address()))
    }

    pub fn feature_block_range(&self, f: usize) -> Result<(u64, u64)> {
        check_index("feature", f, self.feature_count())?;
        Ok((self.features[f].address(), self.features[f + 1].address()))
    }

    /// Write the archive to `path`.
    ///
    /// An archive still attached to its source is fully loaded and detached
    /// first. It cannot be saved over its own file while attached.
    #[tracing::instrument(skip_all)]
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(own) = &self.path {
            if self.source.is_some() && same_file(own, path) {
                return Err(Error::other(format!(
                    "cannot save over the open source {}",
                    own.display()
                )));
            }
        }
        // Offsets are rewritten below, so the old source is unusable after this.
        self.detach()?;
        self.check_payloads()?;

        let sig = self.header.signature;
        let budget = self.setting.resolve(&self.header.sphere);
        let texture_format = if self.texture_count() > 0 {
            Some(texture::format_for(&sig)?)
        } else {
            None
        };

        self.refresh_header();
        let header_bytes = self.header.to_bytes()?;
        let index_len = index_size(&self.header);

        let mut out = OStream::create(path)?;
        out.write_bytes(&header_bytes)?;
        out.write_zeros(index_len)?;
        out.pad()?;

        for n in 0..self.node_count() {
            let range = self.node_patch_range(n)?;
            let Some(mesh) = self.node_meshes[n].as_ref() else {
                return Err(Error::MissingPayload { table: "node", index: n });
            };
            let block = codec::encode_node(self.codec.as_ref(), &sig, mesh, &self.patches[range], &budget)?;
            let node = &mut self.nodes[n];
            node.offset = units(out.pos())?;
            node.nvert = mesh.nvert() as u16;
            node.nface = mesh.nface() as u16;
            out.write_bytes(&block)?;
        }
        let end = units(out.pos())?;
        if let Some(sentinel) = self.nodes.last_mut() {
            sentinel.offset = end;
        }

        for n in 0..self.instance_node_count() {
            let range = self.instance_patch_range(n)?;
            let Some(mesh) = self.instance_meshes[n].as_ref() else {
                return Err(Error::MissingPayload { table: "instance node", index: n });
            };
            let (block, instance_offset) =
                codec::encode_instance(self.codec.as_ref(), &sig, mesh, &self.patches[range], &budget)?;
            let inode = &mut self.instance_nodes[n];
            inode.node.offset = units(out.pos())?;
            inode.node.nvert = mesh.mesh.nvert() as u16;
            inode.node.nface = mesh.mesh.nface() as u16;
            inode.instance_offset = instance_offset;
            inode.ninstance = mesh.instances.len() as u32;
            out.write_bytes(&block)?;
        }
        let end = units(out.pos())?;
        if let Some(sentinel) = self.instance_nodes.last_mut() {
            sentinel.node.offset = end;
        }
        self.instances = self
            .instance_meshes
            .iter()
            .flatten()
            .flat_map(|m| m.instances.iter().copied())
            .collect();

        if let Some(format) = texture_format {
            for t in 0..self.texture_count() {
                let Some(image) = self.texture_images[t].as_ref() else {
                    return Err(Error::MissingPayload { table: "texture", index: t });
                };
                let block = texture::encode(format, image)?;
                self.textures[t].offset = units(out.pos())?;
                out.write_bytes(&block)?;
            }
        }
        let end = units(out.pos())?;
        if let Some(sentinel) = self.textures.last_mut() {
            sentinel.offset = end;
        }

        for f in 0..self.feature_count() {
            self.features[f].offset = units(out.pos())?;
            out.write_bytes(&self.feature_data[f])?;
            out.pad()?;
        }
        let end = units(out.pos())?;
        if let Some(sentinel) = self.features.last_mut() {
            sentinel.offset = end;
        }

        let file_end = out.pos();
        out.seek(HEADER_SIZE as u64)?;
        let mut index = Vec::with_capacity(index_len as usize);
        self.write_index(&mut index)?;
        if index.len() as u64 != index_len {
            return Err(Error::invalid(format!(
                "index encoded to {} bytes, header promises {index_len}",
                index.len()
            )));
        }
        out.write_bytes(&index)?;
        out.seek_end()?;
        out.finish()?;

        tracing::debug!(
            path = %path.display(),
            nodes = self.node_count(),
            instance_nodes = self.instance_node_count(),
            textures = self.texture_count(),
            features = self.feature_count(),
            bytes = file_end,
            "saved archive"
        );
        Ok(())
    }

    fn write_index(&self, w: &mut Vec<u8>) -> Result<()> {
        let layout = InstanceLayout::from_signature(&self.header.signature);
        write_table(w, &self.nodes)?;
        write_table(w, &self.instance_nodes)?;
        for inst in &self.instances {
            check_layout(inst, layout)?;
            inst.write_to(w)?;
        }
        write_table(w, &self.patches)?;
        write_table(w, &self.textures)?;
        write_table(w, &self.materials)?;
        write_table(w, &self.features)?;
        Ok(())
    }

    /// Bring the header counts and totals in line with the tables.
    fn refresh_header(&mut self) {
        let h = &mut self.header;
        h.n_nodes = self.nodes.len() as u32;
        h.n_instance_nodes = self.instance_nodes.len() as u32;
        h.n_instances = self
            .instance_meshes
            .iter()
            .flatten()
            .map(|m| m.instances.len() as u32)
            .sum();
        h.n_patches = self.patches.len() as u32;
        h.n_textures = self.textures.len() as u32;
        h.n_materials = self.materials.len() as u32;
        h.n_features = self.features.len() as u32;

        let meshes = self
            .node_meshes
            .iter()
            .flatten()
            .chain(self.instance_meshes.iter().flatten().map(|m| &m.mesh));
        let (nvert, nface) = meshes.fold((0u64, 0u64), |(v, f), m| {
            (v + m.nvert() as u64, f + m.nface() as u64)
        });
        h.nvert = nvert;
        h.nface = nface;
    }

    fn check_payloads(&self) -> Result<()> {
        if let Some(n) = self.node_meshes.iter().position(Option::is_none) {
            return Err(Error::MissingPayload { table: "node", index: n });
        }
        if let Some(n) = self.instance_meshes.iter().position(Option::is_none) {
            return Err(Error::MissingPayload { table: "instance node", index: n });
        }
        if let Some(t) = self.texture_images.iter().position(Option::is_none) {
            return Err(Error::MissingPayload { table: "texture", index: t });
        }
        Ok(())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
