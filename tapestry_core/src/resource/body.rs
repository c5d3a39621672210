// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-kind payload of a resource.

use alloc::vec::Vec;

use crate::node::{Node, NodeKind};
use crate::view::ViewData;

use super::camera::{Camera, Light, Renderer};
use super::compositor::{Compositor, Layer, LayerStack};
use super::id::Handle;
use super::kind::ResourceKind;
use super::material::{Image, Material, Memory};
use super::shape::Shape;
use super::variable::Variable;

/// Kind-specific resource data.
#[derive(Debug)]
#[expect(
    clippy::large_enum_variant,
    reason = "nodes are the bulk of every store and stay inline"
)]
pub enum Body {
    /// Any node kind.
    Node(Node),
    /// A View.
    View(ViewData),
    /// A shape.
    Shape(Shape),
    /// A material.
    Material(Material),
    /// Client memory.
    Memory(Memory),
    /// An image.
    Image(Image),
    /// A camera.
    Camera(Camera),
    /// A renderer.
    Renderer(Renderer),
    /// Any light kind.
    Light(Light),
    /// A compositor layer.
    Layer(Layer),
    /// A layer stack.
    LayerStack(LayerStack),
    /// A compositor or display compositor.
    Compositor(Compositor),
    /// A dynamic variable.
    Variable(Variable),
}

impl Body {
    /// The concrete kind of this payload.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Node(node) => node.resource_kind(),
            Self::View(_) => ResourceKind::View,
            Self::Shape(shape) => shape.kind(),
            Self::Material(_) => ResourceKind::Material,
            Self::Memory(_) => ResourceKind::Memory,
            Self::Image(_) => ResourceKind::Image,
            Self::Camera(_) => ResourceKind::Camera,
            Self::Renderer(_) => ResourceKind::Renderer,
            Self::Light(light) => light.resource_kind(),
            Self::Layer(_) => ResourceKind::Layer,
            Self::LayerStack(_) => ResourceKind::LayerStack,
            Self::Compositor(c) if c.display => ResourceKind::DisplayCompositor,
            Self::Compositor(_) => ResourceKind::Compositor,
            Self::Variable(_) => ResourceKind::Variable,
        }
    }

    /// Appends every reference this payload owns. Node children are owned
    /// through the store's topology and are not included.
    pub(crate) fn owned_refs(&self, out: &mut Vec<Handle>) {
        match self {
            Self::Node(node) => {
                out.extend(node.bound_variables());
                match &node.kind {
                    NodeKind::Shape(shape) => out.extend(shape.shape.iter().chain(&shape.material)),
                    NodeKind::Scene(scene) => out.extend(&scene.lights),
                    NodeKind::Entity
                    | NodeKind::Opacity { .. }
                    | NodeKind::ViewHolder(_)
                    | NodeKind::ViewNode { .. } => {}
                }
            }
            Self::View(view) => {
                out.push(view.anchor);
                out.extend(&view.annotation_holders);
            }
            Self::Material(material) => out.extend(material.texture),
            Self::Image(image) => out.push(image.memory),
            Self::Camera(camera) => out.push(camera.scene),
            Self::Renderer(renderer) => out.extend(renderer.camera),
            Self::Layer(layer) => out.extend(layer.renderer),
            Self::LayerStack(stack) => out.extend(&stack.layers),
            Self::Compositor(compositor) => out.extend(compositor.layer_stack),
            Self::Shape(_) | Self::Memory(_) | Self::Light(_) | Self::Variable(_) => {}
        }
    }
}
