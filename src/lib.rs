//! # LODM
//!
//! Reader and writer for LODM archives: streaming multiresolution meshes
//! stored as a fixed header, compact index tables and independently
//! compressed, 256-byte aligned data blocks.
//!
//! ## Modules
//!
//! - [`util`] - Errors, bounding volumes, padding arithmetic
//! - [`format`] - Binary header and index records
//! - [`mesh`] - Decoded node geometry
//! - [`codec`] - Geometry codecs (raw, grid, packed) and the texture codec
//! - [`archive`] - Opening, streaming, building and saving archives
//! - [`export`] - Wavefront OBJ/MTL export of decoded nodes
//!
//! ## Example
//!
//! ```ignore
//! use lodm::Archive;
//!
//! let mut archive = Archive::open("model.lodm")?;
//! for n in 0..archive.nroots() {
//!     archive.load_node(n)?;
//!     let view = archive.node_view(n)?;
//!     println!("node {n}: {} patches", view.patches.len());
//! }
//! ```

pub mod archive;
pub mod codec;
pub mod export;
pub mod format;
pub mod mesh;
pub mod util;

// Re-export commonly used types
pub use archive::{Archive, OpenOptions};
pub use codec::{CompressSetting, GeometryCodec};
pub use format::{Signature, SignatureFlags};
pub use mesh::{InstanceMesh, NodeMesh};
pub use util::{Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::archive::{Archive, InstanceView, NodeView, OpenOptions};
    pub use crate::codec::{CompressSetting, GeometryCodec};
    pub use crate::format::{
        Feature, Instance, InstanceNode, Material, Node, Patch, Placement, Signature,
        SignatureFlags, Texture,
    };
    pub use crate::mesh::{InstanceMesh, NodeMesh};
    pub use crate::util::{Error, ErrorKind, Result, Sphere};
}
