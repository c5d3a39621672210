// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node tree.
//!
//! A *node* is a resource with a place in the spatial tree. Each node has:
//!
//! - **Local properties** set by commands: translation, scale, rotation, and
//!   anchor (each a literal or bound to a [`Variable`](crate::resource::Variable)),
//!   clip planes, hit-test behavior, tag value, semantic visibility.
//! - **Topology** kept by the [`ResourceStore`](crate::resource::ResourceStore):
//!   an owning, ordered child list (most recently added last), a non-owning
//!   parent back-reference, and a cached pointer to the containing Scene.
//! - **A memoized world transform**, invalidated top-down when a local
//!   transform or an ancestor link changes and recomputed lazily on read.

mod clip;
mod intersect;
mod transform;
mod tree;

use alloc::vec::Vec;

use crate::geometry::{Plane3, Quaternion, Vec3};
use crate::koid::ViewRef;
use crate::resource::{Handle, ResourceKind};
use crate::view::ViewHolderData;

pub use intersect::Intersection;

/// Hit-test participation of a node's subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HitTestBehavior {
    /// The node and its descendants are hit tested.
    #[default]
    Default,
    /// The node and its descendants are skipped.
    Suppress,
}

/// A transform property that can be bound to a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformProperty {
    /// Translation.
    Translation,
    /// Scale.
    Scale,
    /// Rotation.
    Rotation,
    /// Pivot for rotation and scale.
    Anchor,
}

/// A property value, optionally driven by a variable.
///
/// `value` always holds the effective value. When `variable` is set, the
/// value is overwritten every time the variable changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundProperty<T> {
    /// Effective value.
    pub value: T,
    /// The variable driving this property, if bound.
    pub variable: Option<Handle>,
}

impl<T> BoundProperty<T> {
    const fn literal(value: T) -> Self {
        Self {
            value,
            variable: None,
        }
    }
}

/// `ShapeNode` payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeNodeData {
    /// Owning reference to the shape.
    pub shape: Option<Handle>,
    /// Owning reference to the material.
    pub material: Option<Handle>,
}

/// Scene payload.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneData {
    /// Identity of the scene in the view tree.
    pub view_ref: ViewRef,
    /// Owning references to attached lights.
    pub lights: Vec<Handle>,
}

/// Node variants.
#[derive(Debug)]
pub enum NodeKind {
    /// Plain grouping node.
    Entity,
    /// Draws a shape with a material.
    Shape(ShapeNodeData),
    /// Applies group opacity to its subtree.
    Opacity {
        /// Opacity in `[0, 1]`.
        opacity: f32,
    },
    /// Root of a renderable tree.
    Scene(SceneData),
    /// Embedding point for another session's View.
    ViewHolder(ViewHolderData),
    /// A View's anchor.
    ViewNode {
        /// The View owning this anchor (non-owning).
        view: Handle,
    },
}

/// A node's own state. Topology lives in the store.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) translation: BoundProperty<Vec3>,
    pub(crate) scale: BoundProperty<Vec3>,
    pub(crate) rotation: BoundProperty<Quaternion>,
    pub(crate) anchor: BoundProperty<Vec3>,
    pub(crate) clip_to_self: bool,
    pub(crate) clip_planes: Vec<Plane3>,
    pub(crate) hit_test_behavior: HitTestBehavior,
    pub(crate) tag_value: u32,
    pub(crate) semantically_visible: bool,
    pub(crate) reported_scale: Option<Vec3>,
}

impl Node {
    /// A node with identity transform and no clipping.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            translation: BoundProperty::literal(Vec3::ZERO),
            scale: BoundProperty::literal(Vec3::ONE),
            rotation: BoundProperty::literal(Quaternion::IDENTITY),
            anchor: BoundProperty::literal(Vec3::ZERO),
            clip_to_self: false,
            clip_planes: Vec::new(),
            hit_test_behavior: HitTestBehavior::Default,
            tag_value: 0,
            semantically_visible: true,
            reported_scale: None,
        }
    }

    /// The concrete resource kind.
    #[must_use]
    pub fn resource_kind(&self) -> ResourceKind {
        match self.kind {
            NodeKind::Entity => ResourceKind::EntityNode,
            NodeKind::Shape(_) => ResourceKind::ShapeNode,
            NodeKind::Opacity { .. } => ResourceKind::OpacityNode,
            NodeKind::Scene(_) => ResourceKind::Scene,
            NodeKind::ViewHolder(_) => ResourceKind::ViewHolder,
            NodeKind::ViewNode { .. } => ResourceKind::ViewNode,
        }
    }

    /// Variant payload.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Translation property.
    #[must_use]
    pub fn translation(&self) -> BoundProperty<Vec3> {
        self.translation
    }

    /// Scale property.
    #[must_use]
    pub fn scale(&self) -> BoundProperty<Vec3> {
        self.scale
    }

    /// Rotation property.
    #[must_use]
    pub fn rotation(&self) -> BoundProperty<Quaternion> {
        self.rotation
    }

    /// Anchor property.
    #[must_use]
    pub fn anchor(&self) -> BoundProperty<Vec3> {
        self.anchor
    }

    /// Whether the node clips its children to its own content.
    #[must_use]
    pub fn clip_to_self(&self) -> bool {
        self.clip_to_self
    }

    /// Local-space clip planes.
    #[must_use]
    pub fn clip_planes(&self) -> &[Plane3] {
        &self.clip_planes
    }

    /// Hit-test participation.
    #[must_use]
    pub fn hit_test_behavior(&self) -> HitTestBehavior {
        self.hit_test_behavior
    }

    /// Client tag reported by hit tests.
    #[must_use]
    pub fn tag_value(&self) -> u32 {
        self.tag_value
    }

    /// Whether assistive technology should see this subtree.
    #[must_use]
    pub fn semantically_visible(&self) -> bool {
        self.semantically_visible
    }

    /// Group opacity; `1.0` for non-opacity nodes.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        match self.kind {
            NodeKind::Opacity { opacity } => opacity,
            _ => 1.0,
        }
    }

    pub(crate) fn property_variable(&self, property: TransformProperty) -> Option<Handle> {
        match property {
            TransformProperty::Translation => self.translation.variable,
            TransformProperty::Scale => self.scale.variable,
            TransformProperty::Rotation => self.rotation.variable,
            TransformProperty::Anchor => self.anchor.variable,
        }
    }

    pub(crate) fn bound_variables(&self) -> impl Iterator<Item = Handle> {
        [
            self.translation.variable,
            self.scale.variable,
            self.rotation.variable,
            self.anchor.variable,
        ]
        .into_iter()
        .flatten()
    }
}
