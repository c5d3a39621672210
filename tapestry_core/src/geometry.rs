// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vectors, rays, planes, and bounding boxes.
//!
//! Everything here is `f64` to match [`Transform3d`](crate::transform::Transform3d).
//! Rays are parameterized as `origin + t * direction` and the direction is
//! never normalized, so a ray parameter survives affine changes of basis
//! unchanged. That is what lets hit testing compare distances found in
//! different node coordinate spaces.

use core::ops::{Add, Mul, Neg, Sub};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A 3-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// `(0, 0, 0)`.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// `(1, 1, 1)`.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a vector from its components.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the vector scaled to unit length, or `None` for the zero vector.
    #[must_use]
    pub fn normalize(self) -> Option<Self> {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, rhs: Self) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(self, rhs: Self) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    /// Returns `true` if any component is NaN.
    #[inline]
    #[must_use]
    pub const fn is_nan(self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A rotation quaternion `(x, y, z, w)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    /// X component of the vector part.
    pub x: f64,
    /// Y component of the vector part.
    pub y: f64,
    /// Z component of the vector part.
    pub z: f64,
    /// Scalar part.
    pub w: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Creates a quaternion from its components.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Returns `true` if any component is NaN.
    #[inline]
    #[must_use]
    pub const fn is_nan(self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan() || self.w.is_nan()
    }

    /// Returns the unit quaternion pointing the same way, or the identity if
    /// this quaternion has zero length.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len > 0.0 && len.is_finite() {
            let inv = 1.0 / len;
            Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }
}

impl Default for Quaternion {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A ray `origin + t * direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray3 {
    /// Ray origin.
    pub origin: Vec3,
    /// Ray direction (not necessarily unit length).
    pub direction: Vec3,
}

impl Ray3 {
    /// Creates a ray.
    #[inline]
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Returns the point at parameter `t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A closed interval `[min, max]` of ray parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    min: f64,
    max: f64,
}

impl Interval {
    /// The interval `[0, ∞)`, i.e. everything in front of the ray origin.
    pub const FORWARD: Self = Self {
        min: 0.0,
        max: f64::INFINITY,
    };

    /// Creates an interval, or `None` if `min > max` or either bound is NaN.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// Lower bound.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` if `t` lies inside the interval.
    #[inline]
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.min <= t && t <= self.max
    }

    /// Intersection of two intervals, or `None` if they are disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }
}

/// A half-space `{ p | normal · p >= distance }`.
///
/// A point is clipped by the plane when it lies outside the half-space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane3 {
    /// Plane normal, pointing into the kept half-space.
    pub normal: Vec3,
    /// Signed offset along `normal`.
    pub distance: f64,
}

impl Plane3 {
    /// Creates a plane from a normal and a signed distance.
    #[inline]
    #[must_use]
    pub const fn new(normal: Vec3, distance: f64) -> Self {
        Self { normal, distance }
    }

    /// Creates the plane through `point` whose kept side faces `normal`.
    #[inline]
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self::new(normal, normal.dot(point))
    }

    /// Returns `true` if any component is NaN.
    #[inline]
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        self.normal.is_nan() || self.distance.is_nan()
    }

    /// Returns `true` if `point` is on the kept side of the plane.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        self.normal.dot(point) >= self.distance
    }

    /// Narrows `interval` to the ray parameters on the kept side of the plane.
    ///
    /// Returns `None` when the ray is clipped entirely.
    #[must_use]
    pub fn clip_ray(&self, ray: &Ray3, interval: Interval) -> Option<Interval> {
        let n_dot_o = self.normal.dot(ray.origin);
        let n_dot_d = self.normal.dot(ray.direction);
        if n_dot_d == 0.0 {
            // Parallel: either entirely kept or entirely clipped.
            return (n_dot_o >= self.distance).then_some(interval);
        }
        let t = (self.distance - n_dot_o) / n_dot_d;
        if n_dot_d > 0.0 {
            interval.intersect(&Interval {
                min: t,
                max: f64::INFINITY,
            })
        } else {
            interval.intersect(&Interval {
                min: f64::NEG_INFINITY,
                max: t,
            })
        }
    }
}

/// Returns `true` if `point` passes every plane's containment test.
#[must_use]
pub fn is_point_inside_planes(point: Vec3, planes: &[Plane3]) -> bool {
    planes.iter().all(|plane| plane.contains(point))
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a box from its corners.
    #[inline]
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `min > max` on any axis.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns `true` if any coordinate is NaN.
    #[inline]
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        self.min.is_nan() || self.max.is_nan()
    }

    /// Shrinks the box by `inset_from_min` at the minimum corner and
    /// `inset_from_max` at the maximum corner.
    #[must_use]
    pub fn inset(&self, inset_from_min: Vec3, inset_from_max: Vec3) -> Self {
        Self::new(self.min + inset_from_min, self.max - inset_from_max)
    }

    /// The six half-spaces whose intersection is this box.
    ///
    /// Order: `-x`, `+x`, `-y`, `+y`, `-z`, `+z` faces. An empty box yields
    /// contradictory planes, so it clips everything.
    #[must_use]
    pub fn planes(&self) -> [Plane3; 6] {
        [
            Plane3::new(Vec3::new(1.0, 0.0, 0.0), self.min.x),
            Plane3::new(Vec3::new(-1.0, 0.0, 0.0), -self.max.x),
            Plane3::new(Vec3::new(0.0, 1.0, 0.0), self.min.y),
            Plane3::new(Vec3::new(0.0, -1.0, 0.0), -self.max.y),
            Plane3::new(Vec3::new(0.0, 0.0, 1.0), self.min.z),
            Plane3::new(Vec3::new(0.0, 0.0, -1.0), -self.max.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_containment() {
        let p = Plane3::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert!(p.contains(Vec3::new(2.0, 0.0, 0.0)));
        assert!(p.contains(Vec3::new(5.0, -3.0, 1.0)));
        assert!(!p.contains(Vec3::new(1.9, 0.0, 0.0)));
    }

    #[test]
    fn clip_ray_narrows_interval() {
        let plane = Plane3::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
        let ray = Ray3::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let clipped = plane.clip_ray(&ray, Interval::FORWARD).unwrap();
        assert_eq!(clipped.min(), 2.0);
        assert_eq!(clipped.max(), f64::INFINITY);

        let backwards = Ray3::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let clipped = plane.clip_ray(&backwards, Interval::FORWARD).unwrap();
        assert_eq!(clipped.min(), 0.0);
        assert_eq!(clipped.max(), 2.0);
    }

    #[test]
    fn parallel_ray_is_all_or_nothing() {
        let plane = Plane3::new(Vec3::new(0.0, 1.0, 0.0), 0.0);
        let above = Ray3::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let below = Ray3::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(
            plane.clip_ray(&above, Interval::FORWARD),
            Some(Interval::FORWARD)
        );
        assert_eq!(plane.clip_ray(&below, Interval::FORWARD), None);
    }

    #[test]
    fn bbox_planes_contain_interior_only() {
        let bbox = BoundingBox::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        let planes = bbox.planes();
        assert!(is_point_inside_planes(Vec3::new(5.0, 5.0, 5.0), &planes));
        assert!(is_point_inside_planes(Vec3::new(0.0, 10.0, 0.0), &planes));
        assert!(!is_point_inside_planes(Vec3::new(11.0, 5.0, 5.0), &planes));
        assert!(!is_point_inside_planes(Vec3::new(5.0, 5.0, -0.5), &planes));
    }

    #[test]
    fn empty_bbox_clips_everything() {
        let bbox = BoundingBox::new(Vec3::ONE, Vec3::ZERO);
        assert!(bbox.is_empty());
        let planes = bbox.planes();
        assert!(!is_point_inside_planes(Vec3::new(0.5, 0.5, 0.5), &planes));
    }

    #[test]
    fn inset_shrinks_box() {
        let bbox = BoundingBox::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 0.0));
        let inset = bbox.inset(Vec3::new(1.0, 2.0, 0.0), Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(inset.min, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(inset.max, Vec3::new(7.0, 6.0, 0.0));
    }

    #[test]
    fn interval_intersection() {
        let a = Interval::new(0.0, 5.0).unwrap();
        let b = Interval::new(3.0, 8.0).unwrap();
        assert_eq!(a.intersect(&b), Interval::new(3.0, 5.0));
        let c = Interval::new(6.0, 7.0).unwrap();
        assert_eq!(a.intersect(&c), None);
        assert!(Interval::new(1.0, 0.0).is_none());
    }

    #[test]
    fn normalize_rejects_zero() {
        assert!(Vec3::ZERO.normalize().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).normalize().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }
}
