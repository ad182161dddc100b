//! On-demand streaming of node, instance, texture and feature blocks.
//!
//! Every load decodes into locals and publishes into the payload slots only
//! once everything for that node has succeeded.

use std::ops::Range;

use image::RgbaImage;
use rayon::prelude::*;

use super::{check_index, Archive, BlockSource};
use crate::codec::{self, texture};
use crate::format::{InstanceNode, Node};
use crate::mesh::{InstanceMesh, NodeMesh};
use crate::util::{Error, Result};

/// Texture images and feature bytes referenced by one node's patches.
#[derive(Default)]
struct PatchPayloads {
    textures: Vec<(usize, RgbaImage)>,
    features: Vec<(usize, Vec<u8>)>,
}

impl Archive {
    fn require_source(&self) -> Result<&BlockSource> {
        self.source.as_ref().ok_or(Error::NotOpen)
    }

    /// Load node `n`'s mesh plus the textures and features its patches use.
    /// Does nothing when the mesh is already loaded.
    pub fn load_node(&mut self, n: usize) -> Result<()> {
        check_index("node", n, self.node_count())?;
        if self.node_meshes[n].is_some() {
            return Ok(());
        }
        let (mesh, node, payloads) = self.fetch_node(n)?;
        self.publish_node(n, mesh, node, payloads);
        Ok(())
    }

    /// Load instance node `n`: shared mesh, placements and patch payloads.
    pub fn load_instance(&mut self, n: usize) -> Result<()> {
        check_index("instance node", n, self.instance_node_count())?;
        if self.instance_meshes[n].is_some() {
            return Ok(());
        }
        let (mesh, inode, payloads) = self.fetch_instance(n)?;
        self.publish_instance(n, mesh, inode, payloads);
        Ok(())
    }

    /// Load every node, then every instance node, in index order. Stops at
    /// the first failure.
    pub fn load_all(&mut self) -> Result<()> {
        for n in 0..self.node_count() {
            self.load_node(n)?;
        }
        for n in 0..self.instance_node_count() {
            self.load_instance(n)?;
        }
        Ok(())
    }

    /// [`load_all`](Self::load_all) with block decoding spread over the rayon
    /// pool. Reads are still serialized on the source; results are published
    /// in index order once every block decoded.
    #[tracing::instrument(skip_all)]
    pub fn load_all_parallel(&mut self) -> Result<()> {
        self.require_source()?;
        let pending_nodes: Vec<usize> = (0..self.node_count())
            .filter(|&n| self.node_meshes[n].is_none())
            .collect();
        let pending_instances: Vec<usize> = (0..self.instance_node_count())
            .filter(|&n| self.instance_meshes[n].is_none())
            .collect();
        tracing::debug!(
            nodes = pending_nodes.len(),
            instances = pending_instances.len(),
            "parallel load"
        );

        let this = &*self;
        let nodes = pending_nodes
            .par_iter()
            .map(|&n| this.fetch_node(n).map(|r| (n, r)))
            .collect::<Result<Vec<_>>>()?;
        let instances = pending_instances
            .par_iter()
            .map(|&n| this.fetch_instance(n).map(|r| (n, r)))
            .collect::<Result<Vec<_>>>()?;

        for (n, (mesh, node, payloads)) in nodes {
            self.publish_node(n, mesh, node, payloads);
        }
        for (n, (mesh, inode, payloads)) in instances {
            self.publish_instance(n, mesh, inode, payloads);
        }
        Ok(())
    }

    /// Decode texture `t` unless it is already decoded.
    pub fn load_texture(&mut self, t: usize) -> Result<()> {
        check_index("texture", t, self.texture_count())?;
        if self.texture_images[t].is_some() {
            return Ok(());
        }
        let image = self.fetch_texture(t)?;
        self.texture_images[t] = Some(image);
        Ok(())
    }

    /// Load every payload the archive holds, including textures and features
    /// no patch references. Used before re-encoding or saving.
    pub fn load_everything(&mut self) -> Result<()> {
        self.load_all()?;
        for t in 0..self.texture_count() {
            self.load_texture(t)?;
        }
        for f in 0..self.feature_count() {
            if self.feature_data[f].is_empty() {
                let data = self.fetch_feature(f)?;
                self.feature_data[f] = data;
            }
        }
        Ok(())
    }

    /// Load everything, then drop the source so the archive can be modified
    /// and saved anywhere, including over its original file.
    pub fn detach(&mut self) -> Result<()> {
        if self.source.is_some() {
            self.load_everything()?;
        }
        self.source = None;
        Ok(())
    }

    fn fetch_node(&self, n: usize) -> Result<(NodeMesh, Node, PatchPayloads)> {
        let source = self.require_source()?;
        let (start, end) = self.node_block_range(n)?;
        let block = source.read_range(start, end)?;
        let (mesh, node) =
            codec::decode_node(self.codec.as_ref(), &block, &self.header.signature, &self.nodes[n])?;
        let payloads = self.fetch_patch_payloads(self.node_patch_range(n)?)?;
        Ok((mesh, node, payloads))
    }

    fn fetch_instance(&self, n: usize) -> Result<(InstanceMesh, InstanceNode, PatchPayloads)> {
        let source = self.require_source()?;
        let (start, end) = self.instance_block_range(n)?;
        let block = source.read_range(start, end)?;
        let (mesh, inode) = codec::decode_instance(
            self.codec.as_ref(),
            &block,
            &self.header.signature,
            &self.instance_nodes[n],
        )?;
        let payloads = self.fetch_patch_payloads(self.instance_patch_range(n)?)?;
        Ok((mesh, inode, payloads))
    }

    fn fetch_texture(&self, t: usize) -> Result<RgbaImage> {
        let source = self.require_source()?;
        let (start, end) = self.texture_block_range(t)?;
        let block = source.read_range(start, end)?;
        texture::decode(texture::format_for(&self.header.signature)?, &block)
    }

    fn fetch_feature(&self, f: usize) -> Result<Vec<u8>> {
        let source = self.require_source()?;
        let (start, end) = self.feature_block_range(f)?;
        source.read_range(start, end)
    }

    fn fetch_patch_payloads(&self, patches: Range<usize>) -> Result<PatchPayloads> {
        let mut out = PatchPayloads::default();
        for p in patches {
            let patch = &self.patches[p];
            if let Some(t) = patch.texture() {
                let t = t as usize;
                check_index("texture", t, self.texture_count())?;
                let decoded = self.texture_images[t].is_some() || out.textures.iter().any(|(i, _)| *i == t);
                if !decoded {
                    out.textures.push((t, self.fetch_texture(t)?));
                }
            }
            if let Some(f) = patch.feature() {
                let f = f as usize;
                if f >= self.feature_count() {
                    tracing::warn!(patch = p, feature = f, "patch references a missing feature");
                    continue;
                }
                out.features.push((f, self.fetch_feature(f)?));
            }
        }
        Ok(out)
    }

    fn publish_node(&mut self, n: usize, mesh: NodeMesh, node: Node, payloads: PatchPayloads) {
        self.nodes[n].nvert = node.nvert;
        self.nodes[n].nface = node.nface;
        self.node_meshes[n] = Some(mesh);
        self.publish_payloads(payloads);
    }

    fn publish_instance(
        &mut self,
        n: usize,
        mesh: InstanceMesh,
        inode: InstanceNode,
        payloads: PatchPayloads,
    ) {
        self.instance_nodes[n].node.nvert = inode.node.nvert;
        self.instance_nodes[n].node.nface = inode.node.nface;
        self.instance_meshes[n] = Some(mesh);
        self.publish_payloads(payloads);
    }

    fn publish_payloads(&mut self, payloads: PatchPayloads) {
        for (t, image) in payloads.textures {
            if self.texture_images[t].is_none() {
                self.texture_images[t] = Some(image);
            }
        }
        for (f, data) in payloads.features {
            self.feature_data[f].extend_from_slice(&data);
        }
    }
}
