// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource kinds and their capability bitsets.

use core::fmt;

/// A set of capability bits describing what a resource can do.
///
/// Every concrete [`ResourceKind`] maps to a fixed set of flags via
/// [`ResourceKind::type_flags`]. Table lookups ask for a set of required
/// flags and fail with `WrongType` when the resource lacks any of them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeFlags(u32);

impl TypeFlags {
    /// No capabilities.
    pub const NONE: Self = Self(0);
    /// Participates in the node tree.
    pub const NODE: Self = Self(1 << 0);
    /// May hold arbitrary node children.
    pub const CONTAINER: Self = Self(1 << 1);
    /// Plain grouping node.
    pub const ENTITY_NODE: Self = Self(1 << 2);
    /// Node drawing a shape with a material.
    pub const SHAPE_NODE: Self = Self(1 << 3);
    /// Node applying group opacity.
    pub const OPACITY_NODE: Self = Self(1 << 4);
    /// Root node owning lights.
    pub const SCENE: Self = Self(1 << 5);
    /// Embedding point for another session's View.
    pub const VIEW_HOLDER: Self = Self(1 << 6);
    /// A View's anchor node.
    pub const VIEW_NODE: Self = Self(1 << 7);
    /// Embedded half of a View/`ViewHolder` pair.
    pub const VIEW: Self = Self(1 << 8);
    /// Any shape.
    pub const SHAPE: Self = Self(1 << 9);
    /// Axis-aligned rectangle shape.
    pub const RECTANGLE: Self = Self(1 << 10);
    /// Rectangle with per-corner radii.
    pub const ROUNDED_RECTANGLE: Self = Self(1 << 11);
    /// Circle shape.
    pub const CIRCLE: Self = Self(1 << 12);
    /// Surface material.
    pub const MATERIAL: Self = Self(1 << 13);
    /// Client memory region.
    pub const MEMORY: Self = Self(1 << 14);
    /// Image backed by memory.
    pub const IMAGE: Self = Self(1 << 15);
    /// Camera viewing a scene.
    pub const CAMERA: Self = Self(1 << 16);
    /// Renderer using a camera.
    pub const RENDERER: Self = Self(1 << 17);
    /// Any light.
    pub const LIGHT: Self = Self(1 << 18);
    /// Ambient light.
    pub const AMBIENT_LIGHT: Self = Self(1 << 19);
    /// Directional light.
    pub const DIRECTIONAL_LIGHT: Self = Self(1 << 20);
    /// Point light.
    pub const POINT_LIGHT: Self = Self(1 << 21);
    /// Compositor layer.
    pub const LAYER: Self = Self(1 << 22);
    /// Ordered stack of layers.
    pub const LAYER_STACK: Self = Self(1 << 23);
    /// Any compositor.
    pub const COMPOSITOR: Self = Self(1 << 24);
    /// Compositor bound to a display.
    pub const DISPLAY_COMPOSITOR: Self = Self(1 << 25);
    /// Dynamic value bound to node properties.
    pub const VARIABLE: Self = Self(1 << 26);

    const NAMES: [(Self, &'static str); 27] = [
        (Self::NODE, "NODE"),
        (Self::CONTAINER, "CONTAINER"),
        (Self::ENTITY_NODE, "ENTITY_NODE"),
        (Self::SHAPE_NODE, "SHAPE_NODE"),
        (Self::OPACITY_NODE, "OPACITY_NODE"),
        (Self::SCENE, "SCENE"),
        (Self::VIEW_HOLDER, "VIEW_HOLDER"),
        (Self::VIEW_NODE, "VIEW_NODE"),
        (Self::VIEW, "VIEW"),
        (Self::SHAPE, "SHAPE"),
        (Self::RECTANGLE, "RECTANGLE"),
        (Self::ROUNDED_RECTANGLE, "ROUNDED_RECTANGLE"),
        (Self::CIRCLE, "CIRCLE"),
        (Self::MATERIAL, "MATERIAL"),
        (Self::MEMORY, "MEMORY"),
        (Self::IMAGE, "IMAGE"),
        (Self::CAMERA, "CAMERA"),
        (Self::RENDERER, "RENDERER"),
        (Self::LIGHT, "LIGHT"),
        (Self::AMBIENT_LIGHT, "AMBIENT_LIGHT"),
        (Self::DIRECTIONAL_LIGHT, "DIRECTIONAL_LIGHT"),
        (Self::POINT_LIGHT, "POINT_LIGHT"),
        (Self::LAYER, "LAYER"),
        (Self::LAYER_STACK, "LAYER_STACK"),
        (Self::COMPOSITOR, "COMPOSITOR"),
        (Self::DISPLAY_COMPOSITOR, "DISPLAY_COMPOSITOR"),
        (Self::VARIABLE, "VARIABLE"),
    ];

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Union of two flag sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if every bit in `other` is also set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for TypeFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for TypeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// The closed set of concrete resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Plain grouping node.
    EntityNode,
    /// Node drawing a shape.
    ShapeNode,
    /// Node applying group opacity.
    OpacityNode,
    /// Root node owning lights.
    Scene,
    /// Embedding point for a View.
    ViewHolder,
    /// A View's anchor node.
    ViewNode,
    /// Embedded half of a View/`ViewHolder` pair.
    View,
    /// Rectangle shape.
    Rectangle,
    /// Rounded rectangle shape.
    RoundedRectangle,
    /// Circle shape.
    Circle,
    /// Surface material.
    Material,
    /// Client memory.
    Memory,
    /// Image.
    Image,
    /// Camera.
    Camera,
    /// Renderer.
    Renderer,
    /// Ambient light.
    AmbientLight,
    /// Directional light.
    DirectionalLight,
    /// Point light.
    PointLight,
    /// Compositor layer.
    Layer,
    /// Layer stack.
    LayerStack,
    /// Offscreen compositor.
    Compositor,
    /// Display compositor.
    DisplayCompositor,
    /// Dynamic variable.
    Variable,
}

impl ResourceKind {
    /// The capability bits of this kind.
    #[must_use]
    pub const fn type_flags(self) -> TypeFlags {
        use TypeFlags as F;
        match self {
            Self::EntityNode => F::NODE.union(F::CONTAINER).union(F::ENTITY_NODE),
            Self::ShapeNode => F::NODE.union(F::SHAPE_NODE),
            Self::OpacityNode => F::NODE.union(F::CONTAINER).union(F::OPACITY_NODE),
            Self::Scene => F::NODE.union(F::CONTAINER).union(F::SCENE),
            Self::ViewHolder => F::NODE.union(F::VIEW_HOLDER),
            Self::ViewNode => F::NODE.union(F::CONTAINER).union(F::VIEW_NODE),
            Self::View => F::VIEW,
            Self::Rectangle => F::SHAPE.union(F::RECTANGLE),
            Self::RoundedRectangle => F::SHAPE.union(F::ROUNDED_RECTANGLE),
            Self::Circle => F::SHAPE.union(F::CIRCLE),
            Self::Material => F::MATERIAL,
            Self::Memory => F::MEMORY,
            Self::Image => F::IMAGE,
            Self::Camera => F::CAMERA,
            Self::Renderer => F::RENDERER,
            Self::AmbientLight => F::LIGHT.union(F::AMBIENT_LIGHT),
            Self::DirectionalLight => F::LIGHT.union(F::DIRECTIONAL_LIGHT),
            Self::PointLight => F::LIGHT.union(F::POINT_LIGHT),
            Self::Layer => F::LAYER,
            Self::LayerStack => F::LAYER_STACK,
            Self::Compositor => F::COMPOSITOR,
            Self::DisplayCompositor => F::COMPOSITOR.union(F::DISPLAY_COMPOSITOR),
            Self::Variable => F::VARIABLE,
        }
    }

    /// Human-readable kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EntityNode => "EntityNode",
            Self::ShapeNode => "ShapeNode",
            Self::OpacityNode => "OpacityNode",
            Self::Scene => "Scene",
            Self::ViewHolder => "ViewHolder",
            Self::ViewNode => "ViewNode",
            Self::View => "View",
            Self::Rectangle => "Rectangle",
            Self::RoundedRectangle => "RoundedRectangle",
            Self::Circle => "Circle",
            Self::Material => "Material",
            Self::Memory => "Memory",
            Self::Image => "Image",
            Self::Camera => "Camera",
            Self::Renderer => "Renderer",
            Self::AmbientLight => "AmbientLight",
            Self::DirectionalLight => "DirectionalLight",
            Self::PointLight => "PointLight",
            Self::Layer => "Layer",
            Self::LayerStack => "LayerStack",
            Self::Compositor => "Compositor",
            Self::DisplayCompositor => "DisplayCompositor",
            Self::Variable => "Variable",
        }
    }

    /// Returns `true` for kinds that participate in the node tree.
    #[inline]
    #[must_use]
    pub const fn is_node(self) -> bool {
        self.type_flags().contains(TypeFlags::NODE)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn container_kinds() {
        let containers = [
            ResourceKind::EntityNode,
            ResourceKind::OpacityNode,
            ResourceKind::Scene,
            ResourceKind::ViewNode,
        ];
        let leaves = [ResourceKind::ShapeNode, ResourceKind::ViewHolder];
        for kind in containers {
            assert!(kind.type_flags().contains(TypeFlags::CONTAINER), "{kind}");
        }
        for kind in leaves {
            assert!(kind.is_node(), "{kind}");
            assert!(!kind.type_flags().contains(TypeFlags::CONTAINER), "{kind}");
        }
    }

    #[test]
    fn display_compositor_is_a_compositor() {
        let flags = ResourceKind::DisplayCompositor.type_flags();
        assert!(flags.contains(TypeFlags::COMPOSITOR));
        assert!(!ResourceKind::Compositor.type_flags().contains(TypeFlags::DISPLAY_COMPOSITOR));
    }

    #[test]
    fn debug_lists_flag_names() {
        let flags = ResourceKind::Circle.type_flags();
        assert_eq!(format!("{flags:?}"), "SHAPE | CIRCLE");
        assert_eq!(format!("{:?}", TypeFlags::NONE), "NONE");
    }
}
