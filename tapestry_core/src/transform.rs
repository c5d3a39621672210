// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D transforms the scene graph needs
//! (node local transforms, world composition, inversion for hit testing,
//! camera matrices) without pulling in a full linear-algebra crate.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::geometry::{Plane3, Quaternion, Ray3, Vec3};

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation from a quaternion. The quaternion is normalized
    /// first.
    #[must_use]
    pub fn from_rotation(q: Quaternion) -> Self {
        let Quaternion { x, y, z, w } = q.normalize();
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        Self {
            cols: [
                [1.0 - 2.0 * (yy + zz), 2.0 * (xy + wz), 2.0 * (xz - wy), 0.0],
                [2.0 * (xy - wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz + wx), 0.0],
                [2.0 * (xz + wy), 2.0 * (yz - wx), 1.0 - 2.0 * (xx + yy), 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Composes a node's local transform.
    ///
    /// Rotation and scale pivot around `anchor`; the result is
    /// `T(translation) · T(anchor) · R(rotation) · S(scale) · T(-anchor)`.
    #[must_use]
    pub fn from_components(
        translation: Vec3,
        scale: Vec3,
        rotation: Quaternion,
        anchor: Vec3,
    ) -> Self {
        Self::from_translation(
            translation.x + anchor.x,
            translation.y + anchor.y,
            translation.z + anchor.z,
        ) * Self::from_rotation(rotation)
            * Self::from_scale(scale.x, scale.y, scale.z)
            * Self::from_translation(-anchor.x, -anchor.y, -anchor.z)
    }

    /// Right-handed view matrix looking from `eye` toward `target`.
    ///
    /// Returns `None` when `eye == target` or `up` is parallel to the view
    /// direction.
    #[must_use]
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let f = (target - eye).normalize()?;
        let s = f.cross(up).normalize()?;
        let u = s.cross(f);
        Some(Self {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        })
    }

    /// Right-handed perspective projection with depth mapped to `[0, 1]`.
    #[must_use]
    pub fn perspective(fovy: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (fovy * 0.5).tan();
        let range = near - far;
        Self {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, far / range, -1.0],
                [0.0, 0.0, near * far / range, 0.0],
            ],
        }
    }

    /// Right-handed orthographic projection of the box
    /// `[0, width] × [0, height] × [near, far]`, with depth mapped to `[0, 1]`.
    #[must_use]
    pub fn orthographic(width: f64, height: f64, near: f64, far: f64) -> Self {
        let range = near - far;
        Self {
            cols: [
                [2.0 / width, 0.0, 0.0, 0.0],
                [0.0, 2.0 / height, 0.0, 0.0],
                [0.0, 0.0, 1.0 / range, 0.0],
                [-1.0, -1.0, near / range, 1.0],
            ],
        }
    }

    /// Applies the transform to a point (`w = 1`).
    #[must_use]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * p.x + c[1][0] * p.y + c[2][0] * p.z + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[2][1] * p.z + c[3][1],
            c[0][2] * p.x + c[1][2] * p.y + c[2][2] * p.z + c[3][2],
        )
    }

    /// Applies the linear part of the transform to a direction (`w = 0`).
    #[must_use]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * v.x + c[1][0] * v.y + c[2][0] * v.z,
            c[0][1] * v.x + c[1][1] * v.y + c[2][1] * v.z,
            c[0][2] * v.x + c[1][2] * v.y + c[2][2] * v.z,
        )
    }

    /// Applies the transform to both the origin and the direction of a ray.
    ///
    /// The ray parameter `t` is preserved.
    #[must_use]
    pub fn transform_ray(&self, ray: &Ray3) -> Ray3 {
        Ray3::new(
            self.transform_point(ray.origin),
            self.transform_vector(ray.direction),
        )
    }

    /// Pulls a plane expressed in this transform's *output* space back into
    /// its *input* space.
    ///
    /// For a point `p`, `result.contains(p) == plane.contains(self * p)`.
    #[must_use]
    pub fn pull_back_plane(&self, plane: &Plane3) -> Plane3 {
        let c = &self.cols;
        let n = plane.normal;
        // Transpose of the linear part applied to the normal.
        let normal = Vec3::new(
            c[0][0] * n.x + c[0][1] * n.y + c[0][2] * n.z,
            c[1][0] * n.x + c[1][1] * n.y + c[1][2] * n.z,
            c[2][0] * n.x + c[2][1] * n.y + c[2][2] * n.z,
        );
        let t = Vec3::new(c[3][0], c[3][1], c[3][2]);
        Plane3::new(normal, plane.distance - n.dot(t))
    }

    /// Length of each basis column, i.e. the scale a unit vector along each
    /// local axis picks up.
    #[must_use]
    pub fn axis_scale(&self) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            Vec3::new(c[0][0], c[0][1], c[0][2]).length(),
            Vec3::new(c[1][0], c[1][1], c[1][2]).length(),
            Vec3::new(c[2][0], c[2][1], c[2][2]).length(),
        )
    }

    /// Returns the columns narrowed to `f32`, flattened column-major.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "GPU-facing matrices are single precision"
    )]
    pub fn to_f32_array(&self) -> [f32; 16] {
        let mut out = [0.0_f32; 16];
        for (j, col) in self.cols.iter().enumerate() {
            for (i, v) in col.iter().enumerate() {
                out[j * 4 + i] = *v as f32;
            }
        }
        out
    }

    /// Inverse of the matrix, or `None` if it is singular or non-finite.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        // Cofactor expansion over 2×2 sub-determinants. `m[r][c]` is the
        // row-major view of the column-major storage.
        let m = |r: usize, c: usize| self.cols[c][r];

        let s0 = m(0, 0) * m(1, 1) - m(1, 0) * m(0, 1);
        let s1 = m(0, 0) * m(1, 2) - m(1, 0) * m(0, 2);
        let s2 = m(0, 0) * m(1, 3) - m(1, 0) * m(0, 3);
        let s3 = m(0, 1) * m(1, 2) - m(1, 1) * m(0, 2);
        let s4 = m(0, 1) * m(1, 3) - m(1, 1) * m(0, 3);
        let s5 = m(0, 2) * m(1, 3) - m(1, 2) * m(0, 3);

        let c5 = m(2, 2) * m(3, 3) - m(3, 2) * m(2, 3);
        let c4 = m(2, 1) * m(3, 3) - m(3, 1) * m(2, 3);
        let c3 = m(2, 1) * m(3, 2) - m(3, 1) * m(2, 2);
        let c2 = m(2, 0) * m(3, 3) - m(3, 0) * m(2, 3);
        let c1 = m(2, 0) * m(3, 2) - m(3, 0) * m(2, 2);
        let c0 = m(2, 0) * m(3, 1) - m(3, 0) * m(2, 1);

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;

        let mut r = [[0.0_f64; 4]; 4];
        r[0][0] = (m(1, 1) * c5 - m(1, 2) * c4 + m(1, 3) * c3) * inv;
        r[0][1] = (-m(0, 1) * c5 + m(0, 2) * c4 - m(0, 3) * c3) * inv;
        r[0][2] = (m(3, 1) * s5 - m(3, 2) * s4 + m(3, 3) * s3) * inv;
        r[0][3] = (-m(2, 1) * s5 + m(2, 2) * s4 - m(2, 3) * s3) * inv;

        r[1][0] = (-m(1, 0) * c5 + m(1, 2) * c2 - m(1, 3) * c1) * inv;
        r[1][1] = (m(0, 0) * c5 - m(0, 2) * c2 + m(0, 3) * c1) * inv;
        r[1][2] = (-m(3, 0) * s5 + m(3, 2) * s2 - m(3, 3) * s1) * inv;
        r[1][3] = (m(2, 0) * s5 - m(2, 2) * s2 + m(2, 3) * s1) * inv;

        r[2][0] = (m(1, 0) * c4 - m(1, 1) * c2 + m(1, 3) * c0) * inv;
        r[2][1] = (-m(0, 0) * c4 + m(0, 1) * c2 - m(0, 3) * c0) * inv;
        r[2][2] = (m(3, 0) * s4 - m(3, 1) * s2 + m(3, 3) * s0) * inv;
        r[2][3] = (-m(2, 0) * s4 + m(2, 1) * s2 - m(2, 3) * s0) * inv;

        r[3][0] = (-m(1, 0) * c3 + m(1, 1) * c1 - m(1, 2) * c0) * inv;
        r[3][1] = (m(0, 0) * c3 - m(0, 1) * c1 + m(0, 2) * c0) * inv;
        r[3][2] = (-m(3, 0) * s3 + m(3, 1) * s1 - m(3, 2) * s0) * inv;
        r[3][3] = (m(2, 0) * s3 - m(2, 1) * s1 + m(2, 2) * s0) * inv;

        // `r` is row-major; transpose back into columns.
        let mut cols = [[0.0_f64; 4]; 4];
        for (row, values) in r.iter().enumerate() {
            for (col, v) in values.iter().enumerate() {
                cols[col][row] = *v;
            }
        }
        let out = Self { cols };
        out.is_finite().then_some(out)
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx_eq(a: &Transform3d, b: &Transform3d) -> bool {
        a.cols
            .iter()
            .flatten()
            .zip(b.cols.iter().flatten())
            .all(|(x, y)| (x - y).abs() < EPS)
    }

    fn vec_approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        assert_eq!((a * b).col(3), [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn quarter_turn_about_z() {
        let half = core::f64::consts::FRAC_1_SQRT_2;
        let r = Transform3d::from_rotation(Quaternion::new(0.0, 0.0, half, half));
        let p = r.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!(vec_approx_eq(p, Vec3::new(0.0, 1.0, 0.0)), "got {p:?}");
    }

    #[test]
    fn anchor_pivots_scale() {
        let t = Transform3d::from_components(
            Vec3::ZERO,
            Vec3::new(2.0, 2.0, 1.0),
            Quaternion::IDENTITY,
            Vec3::new(5.0, 5.0, 0.0),
        );
        // The anchor is a fixed point of rotation and scale.
        assert!(vec_approx_eq(
            t.transform_point(Vec3::new(5.0, 5.0, 0.0)),
            Vec3::new(5.0, 5.0, 0.0)
        ));
        assert!(vec_approx_eq(
            t.transform_point(Vec3::new(6.0, 5.0, 0.0)),
            Vec3::new(7.0, 5.0, 0.0)
        ));
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transform3d::from_components(
            Vec3::new(3.0, -4.0, 1.0),
            Vec3::new(2.0, 0.5, 1.0),
            Quaternion::new(0.1, 0.2, 0.3, 0.9),
            Vec3::new(1.0, 1.0, 0.0),
        );
        let inv = t.inverse().unwrap();
        assert!(approx_eq(&(t * inv), &Transform3d::IDENTITY));
        assert!(approx_eq(&(inv * t), &Transform3d::IDENTITY));
    }

    #[test]
    fn singular_has_no_inverse() {
        assert!(Transform3d::from_scale(1.0, 0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn pulled_back_plane_agrees_with_forward_transform() {
        let t = Transform3d::from_translation(10.0, 0.0, 0.0) * Transform3d::from_scale(2.0, 1.0, 1.0);
        let world = Plane3::new(Vec3::new(1.0, 0.0, 0.0), 14.0);
        let local = t.pull_back_plane(&world);
        for x in [0.0, 1.9, 2.0, 2.1, 5.0] {
            let p = Vec3::new(x, 0.0, 0.0);
            assert_eq!(
                local.contains(p),
                world.contains(t.transform_point(p)),
                "mismatch at x = {x}"
            );
        }
    }

    #[test]
    fn axis_scale_reads_column_lengths() {
        let t = Transform3d::from_scale(2.0, 3.0, 4.0) * Transform3d::from_rotation(Quaternion::IDENTITY);
        assert!(vec_approx_eq(t.axis_scale(), Vec3::new(2.0, 3.0, 4.0)));
    }

    #[test]
    fn look_at_maps_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let view = Transform3d::look_at(eye, Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(vec_approx_eq(view.transform_point(eye), Vec3::ZERO));
        assert!(Transform3d::look_at(eye, eye, Vec3::new(0.0, 1.0, 0.0)).is_none());
    }

    #[test]
    fn nan_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(t.is_nan());
    }
}
