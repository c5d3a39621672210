// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cameras, renderers, and lights.

use crate::geometry::Vec3;
use crate::transform::Transform3d;

use super::id::Handle;
use super::kind::ResourceKind;

/// A camera looking into a scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Owning reference to the viewed Scene.
    pub scene: Handle,
    /// Eye position in scene space.
    pub eye_position: Vec3,
    /// Point the eye looks at.
    pub eye_look_at: Vec3,
    /// Up direction.
    pub eye_up: Vec3,
    /// Vertical field of view in radians; `0` selects an orthographic
    /// projection.
    pub fovy: f64,
}

impl Camera {
    /// A camera at the default pose: looking down `-z` from `z = 1000`.
    #[must_use]
    pub fn new(scene: Handle) -> Self {
        Self {
            scene,
            eye_position: Vec3::new(0.0, 0.0, 1000.0),
            eye_look_at: Vec3::ZERO,
            eye_up: Vec3::new(0.0, -1.0, 0.0),
            fovy: 0.0,
        }
    }

    /// View matrix, or `None` when the pose is degenerate.
    #[must_use]
    pub fn view_matrix(&self) -> Option<Transform3d> {
        Transform3d::look_at(self.eye_position, self.eye_look_at, self.eye_up)
    }

    /// Projection matrix for a viewport of the given size.
    #[must_use]
    pub fn projection_matrix(&self, width: f64, height: f64) -> Transform3d {
        let near = 0.1;
        let far = 2000.0;
        if self.fovy > 0.0 {
            Transform3d::perspective(self.fovy, width / height, near, far)
        } else {
            Transform3d::orthographic(width, height, near, far)
        }
    }
}

/// Shadow algorithm requested for a renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadowTechnique {
    /// No shadows.
    #[default]
    Unshadowed,
    /// Screen-space ambient occlusion.
    ScreenSpace,
    /// Shadow maps.
    ShadowMap,
    /// Moment shadow maps.
    MomentShadowMap,
    /// Stencil shadow volumes.
    StencilShadowVolume,
}

/// Renders a camera's view into a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Renderer {
    /// Owning reference to the camera.
    pub camera: Option<Handle>,
    /// Requested shadow technique.
    pub shadow_technique: ShadowTechnique,
    /// Ignore clip planes while drawing (debugging aid).
    pub disable_clipping: bool,
}

/// The variant-specific part of a light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Uniform ambient light.
    Ambient,
    /// Light from infinitely far away.
    Directional {
        /// Direction the light travels.
        direction: Vec3,
    },
    /// Light emitted from a point.
    Point {
        /// Position in scene space.
        position: Vec3,
        /// Distance attenuation factor.
        falloff: f32,
    },
}

/// A light that can be attached to a Scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Variant data.
    pub kind: LightKind,
    /// Linear RGB color.
    pub color: [f32; 3],
    /// The Scene this light is attached to (non-owning).
    pub scene: Option<Handle>,
}

impl Light {
    /// A white light of the given kind, unattached.
    #[must_use]
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: [1.0, 1.0, 1.0],
            scene: None,
        }
    }

    /// The resource kind for this light.
    #[must_use]
    pub const fn resource_kind(&self) -> ResourceKind {
        match self.kind {
            LightKind::Ambient => ResourceKind::AmbientLight,
            LightKind::Directional { .. } => ResourceKind::DirectionalLight,
            LightKind::Point { .. } => ResourceKind::PointLight,
        }
    }
}
