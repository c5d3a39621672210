// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double dispatch over the closed set of resource kinds.
//!
//! [`ResourceStore::accept`] matches on a resource's payload and calls the one
//! [`ResourceVisitor`] method for that kind. Traversal policy (which children,
//! in which order, when to stop) belongs to the visitor; [`visit_children`]
//! is the shared helper for walking a container in a chosen [`ChildOrder`].
//!
//! Every method has an empty default, so a visitor only overrides the kinds
//! it cares about. A visitor that must never see some kind should override
//! that method with `unreachable!`: the kind set is closed, so reaching it is
//! a programming error rather than a recoverable condition.

use crate::resource::{Handle, ResourceStore};

/// Order in which a container's children are visited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChildOrder {
    /// Most recently attached child first. The canonical order for drawing
    /// and hit testing.
    #[default]
    FrontToBack,
    /// Attachment order, oldest child first.
    BackToFront,
}

/// One method per concrete resource kind.
///
/// Each method receives the store and the handle being visited, so the
/// visitor can read any resource data and recurse with
/// [`ResourceStore::accept`].
#[allow(unused_variables, reason = "default methods ignore their arguments")]
pub trait ResourceVisitor {
    /// An `EntityNode`.
    fn visit_entity_node(&mut self, store: &ResourceStore, node: Handle) {}
    /// A `ShapeNode`.
    fn visit_shape_node(&mut self, store: &ResourceStore, node: Handle) {}
    /// An `OpacityNode`.
    fn visit_opacity_node(&mut self, store: &ResourceStore, node: Handle) {}
    /// A Scene.
    fn visit_scene(&mut self, store: &ResourceStore, scene: Handle) {}
    /// A `ViewHolder`.
    fn visit_view_holder(&mut self, store: &ResourceStore, holder: Handle) {}
    /// A View's anchor node.
    fn visit_view_node(&mut self, store: &ResourceStore, node: Handle) {}
    /// A View.
    fn visit_view(&mut self, store: &ResourceStore, view: Handle) {}
    /// Any shape.
    fn visit_shape(&mut self, store: &ResourceStore, shape: Handle) {}
    /// A material.
    fn visit_material(&mut self, store: &ResourceStore, material: Handle) {}
    /// Client memory.
    fn visit_memory(&mut self, store: &ResourceStore, memory: Handle) {}
    /// An image.
    fn visit_image(&mut self, store: &ResourceStore, image: Handle) {}
    /// A camera.
    fn visit_camera(&mut self, store: &ResourceStore, camera: Handle) {}
    /// A renderer.
    fn visit_renderer(&mut self, store: &ResourceStore, renderer: Handle) {}
    /// Any light.
    fn visit_light(&mut self, store: &ResourceStore, light: Handle) {}
    /// A compositor layer.
    fn visit_layer(&mut self, store: &ResourceStore, layer: Handle) {}
    /// A layer stack.
    fn visit_layer_stack(&mut self, store: &ResourceStore, stack: Handle) {}
    /// A compositor or display compositor.
    fn visit_compositor(&mut self, store: &ResourceStore, compositor: Handle) {}
    /// A variable.
    fn visit_variable(&mut self, store: &ResourceStore, variable: Handle) {}
}

/// Visits every child of `node` in `order`.
pub fn visit_children<V: ResourceVisitor + ?Sized>(
    store: &ResourceStore,
    node: Handle,
    order: ChildOrder,
    visitor: &mut V,
) {
    match order {
        ChildOrder::FrontToBack => {
            for child in store.children(node).rev() {
                store.accept(child, visitor);
            }
        }
        ChildOrder::BackToFront => {
            for child in store.children(node) {
                store.accept(child, visitor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::node::{Node, NodeKind, ShapeNodeData};
    use crate::resource::{Body, SessionId};

    const S: SessionId = SessionId(1);

    /// Records entity and shape nodes; descends through entities only.
    struct Order(Vec<Handle>);

    impl ResourceVisitor for Order {
        fn visit_entity_node(&mut self, store: &ResourceStore, node: Handle) {
            self.0.push(node);
            visit_children(store, node, ChildOrder::FrontToBack, self);
        }

        fn visit_shape_node(&mut self, _: &ResourceStore, node: Handle) {
            self.0.push(node);
        }

        fn visit_material(&mut self, _: &ResourceStore, _: Handle) {
            unreachable!("materials are not part of the node tree");
        }
    }

    fn entity(store: &mut ResourceStore, id: u64) -> Handle {
        store.insert(S, id, Body::Node(Node::new(NodeKind::Entity)))
    }

    #[test]
    fn front_to_back_visits_most_recent_child_first() {
        let mut store = ResourceStore::new();
        let root = entity(&mut store, 1);
        let a = entity(&mut store, 2);
        let b = store.insert(
            S,
            3,
            Body::Node(Node::new(NodeKind::Shape(ShapeNodeData::default()))),
        );
        let c = entity(&mut store, 4);
        let d = entity(&mut store, 5);
        store.add_child(root, a).unwrap();
        store.add_child(root, b).unwrap();
        store.add_child(root, c).unwrap();
        store.add_child(c, d).unwrap();

        let mut order = Order(Vec::new());
        store.accept(root, &mut order);
        assert_eq!(order.0, [root, c, d, b, a]);

        let mut back = Order(Vec::new());
        visit_children(&store, root, ChildOrder::BackToFront, &mut back);
        assert_eq!(back.0, [a, b, c, d]);
    }

    #[test]
    #[should_panic(expected = "materials are not part of the node tree")]
    fn refused_kind_is_fatal() {
        let mut store = ResourceStore::new();
        let material = store.insert(
            S,
            1,
            Body::Material(crate::resource::Material::default()),
        );
        store.accept(material, &mut Order(Vec::new()));
    }
}
