// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Materials and the memory-backed images that texture them.

use super::id::Handle;

/// An 8-bit-per-channel RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    /// Creates a color from its channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as normalized floats.
    #[must_use]
    pub fn to_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Surface appearance of a `ShapeNode`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Material {
    /// Base color, multiplied with the texture when present.
    pub color: Rgba8,
    /// Owning reference to an Image, if textured.
    pub texture: Option<Handle>,
}

/// A region of client memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Memory {
    /// Size in bytes.
    pub size: u64,
    /// Protected memory must never reach an unprotected output.
    pub is_protected: bool,
}

/// An image stored in a [`Memory`] resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Image {
    /// Owning reference to the backing memory.
    pub memory: Handle,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}
