//! Math type re-exports and LODM bounding volumes.
//!
//! This module re-exports types from `glam` and provides the bounding
//! volumes stored in index records (spheres, boxes, packed normal cones).

// Re-export glam types
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use std::fmt;

/// Bounding sphere, stored on disk as `[x, y, z, radius]`.
///
/// A radius of zero marks an empty sphere.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    /// Empty sphere (radius 0), adopts whatever is merged into it first.
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: 0.0,
    };

    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Build from the on-disk `[x, y, z, r]` layout.
    #[inline]
    pub fn from_array(a: [f32; 4]) -> Self {
        Self {
            center: Vec3::new(a[0], a[1], a[2]),
            radius: a[3],
        }
    }

    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.center.x, self.center.y, self.center.z, self.radius]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.radius == 0.0
    }

    /// Distance between the two centers.
    #[inline]
    pub fn dist(&self, other: &Sphere) -> f32 {
        (other.center - self.center).length()
    }

    /// Grow this sphere so it encloses `other`.
    ///
    /// The result is approximate and depends on merge order.
    pub fn merge(&mut self, other: &Sphere) {
        if self.is_empty() {
            *self = *other;
            return;
        }

        let dir = other.center - self.center;
        let distance = dir.length();
        let farthest = other.radius + distance;
        if farthest <= self.radius {
            return;
        }

        let nearest = other.radius - distance;
        if nearest >= self.radius {
            *self = *other;
            return;
        }

        if distance < 0.001 * (self.radius + other.radius) {
            self.radius += distance;
            return;
        }

        let delta = (farthest - self.radius) / (distance * 2.0);
        self.center += dir * delta;
        self.radius = (self.radius + farthest) / 2.0;
    }

    /// Return a copy of `self` merged with `other`.
    #[inline]
    pub fn merged(mut self, other: &Sphere) -> Self {
        self.merge(other);
        self
    }

    /// `other` lies strictly inside `self`.
    #[inline]
    pub fn contains(&self, other: &Sphere) -> bool {
        self.dist(other) + other.radius < self.radius
    }

    /// Sphere around a box, touching its corners.
    pub fn from_box(b: &BBox3f) -> Self {
        if b.is_empty() {
            return Self::EMPTY;
        }
        Self::new(b.center(), b.size().length() * 0.5)
    }
}

impl fmt::Debug for Sphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sphere({:?}, r={})", self.center, self.radius)
    }
}

/// 3D bounding box with single precision.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox3f {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox3f {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box around a point set.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.expand_by_point(*p);
        }
        b
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents) of the box.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Default for BBox3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3f({:?} - {:?})", self.min, self.max)
    }
}

/// Normal cone packed into four `i16`: a unit axis and the cosine of the
/// half-angle, each scaled by `i16::MAX`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Cone3s(pub [i16; 4]);

impl Cone3s {
    pub fn new(axis: Vec3, cos_angle: f32) -> Self {
        let a = axis.normalize_or_zero();
        Self([
            pack_unit(a.x),
            pack_unit(a.y),
            pack_unit(a.z),
            pack_unit(cos_angle),
        ])
    }

    #[inline]
    pub fn axis(&self) -> Vec3 {
        Vec3::new(unpack_unit(self.0[0]), unpack_unit(self.0[1]), unpack_unit(self.0[2]))
    }

    #[inline]
    pub fn cos_angle(&self) -> f32 {
        unpack_unit(self.0[3])
    }
}

#[inline]
fn pack_unit(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[inline]
fn unpack_unit(v: i16) -> f32 {
    v as f32 / i16::MAX as f32
}
