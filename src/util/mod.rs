//! Utility types and functions for LODM.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - Bounding volumes ([`Sphere`], [`BBox3f`], [`Cone3s`]) and glam re-exports
//! - Padding arithmetic for the 256-byte block alignment

mod error;
mod math;
mod padding;

pub use error::*;
pub use math::*;
pub use padding::*;
