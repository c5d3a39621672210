// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositors, layer stacks, and layers.
//!
//! A compositor draws a layer stack; each layer is filled by a renderer,
//! which draws a camera's view of a scene. The first display compositor's
//! chain determines the global root of the view tree.

use alloc::vec::Vec;

use super::id::Handle;

/// A compositor layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Layer {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Owning reference to the renderer filling this layer.
    pub renderer: Option<Handle>,
    /// The stack holding this layer (non-owning).
    pub stack: Option<Handle>,
}

/// An ordered stack of layers, bottom first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerStack {
    /// Owning references to the layers.
    pub layers: Vec<Handle>,
}

/// Display color correction: `post + matrix * (color + pre)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorConversion {
    /// Offsets added before the matrix.
    pub preoffsets: [f32; 3],
    /// Row-major 3×3 matrix.
    pub matrix: [f32; 9],
    /// Offsets added after the matrix.
    pub postoffsets: [f32; 3],
}

impl ColorConversion {
    /// The no-op conversion.
    pub const IDENTITY: Self = Self {
        preoffsets: [0.0; 3],
        matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        postoffsets: [0.0; 3],
    };

    /// Returns `true` if every coefficient is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.preoffsets
            .iter()
            .chain(&self.matrix)
            .chain(&self.postoffsets)
            .all(|v| v.is_finite())
    }
}

impl Default for ColorConversion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A compositor, optionally bound to a display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Compositor {
    /// Whether this compositor drives a physical display.
    pub display: bool,
    /// Owning reference to the layer stack.
    pub layer_stack: Option<Handle>,
    /// Display color correction.
    pub color_conversion: ColorConversion,
    /// Display rotation in degrees: 0, 90, 180, or 270.
    pub rotation_degrees: u32,
    /// Minimum value of each color channel on the display.
    pub minimum_rgb: u8,
}

impl Compositor {
    /// A compositor with no layer stack and default display settings.
    #[must_use]
    pub fn new(display: bool) -> Self {
        Self {
            display,
            layer_stack: None,
            color_conversion: ColorConversion::IDENTITY,
            rotation_degrees: 0,
            minimum_rgb: 0,
        }
    }
}
