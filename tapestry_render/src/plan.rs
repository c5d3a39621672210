// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: an ordered sequence of draw items for one layer.

use alloc::vec::Vec;

use tapestry_core::geometry::Plane3;
use tapestry_core::resource::{Handle, ShapeGeometry};

/// A single shape to draw.
///
/// Items are produced front to back, most recently attached content first.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// The `ShapeNode` this item originates from.
    pub node: Handle,
    /// The shape, centered on the node's local origin in the `z = 0` plane.
    pub geometry: ShapeGeometry,
    /// World-space transform (column-major 4x4).
    pub world_transform: [f32; 16],
    /// Effective opacity (0.0–1.0, accumulated from ancestor opacity nodes).
    pub opacity: f32,
    /// World-space clip planes from the node and its ancestors. Empty when
    /// the renderer disables clipping.
    pub clip_planes: Vec<Plane3>,
    /// Material color, normalized RGBA.
    pub color: [f32; 4],
    /// Image bound to the material, if any.
    pub texture: Option<Handle>,
}

/// Camera matrices for a plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    /// World-to-eye transform (column-major 4x4).
    pub view: [f32; 16],
    /// Eye-to-clip transform (column-major 4x4).
    pub projection: [f32; 16],
}

/// The draw list for one compositor layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPlan {
    /// The camera, or `None` if its pose is degenerate.
    pub camera: Option<CameraMatrices>,
    /// Draw items in front-to-back order.
    pub items: Vec<RenderItem>,
}

impl RenderPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.camera = None;
        self.items.clear();
    }
}
