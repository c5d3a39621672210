// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented text dumps of a node subtree.
//!
//! One line per resource, children indented two spaces under their parent
//! and listed front to back:
//!
//! ```text
//! Scene #1
//!   AmbientLight #4
//!   EntityNode #2 "toolbar" t=(10, 0, 0)
//!     ShapeNode #3 shape=Rectangle #5 material=#6
//!   ViewHolder #7 "app" view=connected
//!     ViewNode
//! ```

use std::fmt::Write as _;

use tapestry_core::geometry::Vec3;
use tapestry_core::node::NodeKind;
use tapestry_core::resource::{Handle, ResourceStore};
use tapestry_core::visitor::{ChildOrder, ResourceVisitor, visit_children};

/// Renders a subtree as indented text.
#[derive(Debug, Default)]
pub struct DumpVisitor {
    out: String,
    depth: usize,
}

impl DumpVisitor {
    /// Creates an empty dump.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The text so far.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    /// Dumps the subtree at `root`.
    #[must_use]
    pub fn dump(store: &ResourceStore, root: Handle) -> String {
        let mut visitor = Self::new();
        store.accept(root, &mut visitor);
        visitor.finish()
    }

    /// Writes the common prefix: indent, kind, id, and label.
    fn begin_line(&mut self, store: &ResourceStore, handle: Handle) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(store.kind(handle).name());
        let id = store.resource_id(handle);
        if id != 0 {
            let _ = write!(self.out, " #{id}");
        }
        let label = store.label(handle);
        if !label.is_empty() {
            let _ = write!(self.out, " {label:?}");
        }
    }

    fn node_line(&mut self, store: &ResourceStore, node: Handle) {
        self.begin_line(store, node);
        if let Some(n) = store.node(node) {
            let t = n.translation().value;
            if t != Vec3::ZERO {
                let _ = write!(self.out, " t=({}, {}, {})", t.x, t.y, t.z);
            }
            if n.tag_value() != 0 {
                let _ = write!(self.out, " tag={}", n.tag_value());
            }
            if !n.clip_planes().is_empty() {
                let _ = write!(self.out, " clip_planes={}", n.clip_planes().len());
            }
        }
    }

    fn children(&mut self, store: &ResourceStore, node: Handle) {
        self.depth += 1;
        visit_children(store, node, ChildOrder::FrontToBack, self);
        self.depth -= 1;
    }

    fn reference(&mut self, store: &ResourceStore, name: &str, handle: Option<Handle>) {
        if let Some(h) = handle {
            let _ = write!(self.out, " {name}=");
            if store.resource_id(h) == 0 {
                self.out.push_str(store.kind(h).name());
            } else {
                let _ = write!(self.out, "#{}", store.resource_id(h));
            }
        }
    }
}

impl ResourceVisitor for DumpVisitor {
    fn visit_entity_node(&mut self, store: &ResourceStore, node: Handle) {
        self.node_line(store, node);
        self.out.push('\n');
        self.children(store, node);
    }

    fn visit_opacity_node(&mut self, store: &ResourceStore, node: Handle) {
        self.node_line(store, node);
        if let Some(n) = store.node(node) {
            let _ = write!(self.out, " opacity={}", n.opacity());
        }
        self.out.push('\n');
        self.children(store, node);
    }

    fn visit_shape_node(&mut self, store: &ResourceStore, node: Handle) {
        self.node_line(store, node);
        if let Some(NodeKind::Shape(data)) = store.node(node).map(|n| n.kind()) {
            if let Some(shape) = data.shape {
                let _ = write!(
                    self.out,
                    " shape={} #{}",
                    store.kind(shape).name(),
                    store.resource_id(shape)
                );
            }
            self.reference(store, "material", data.material);
        }
        self.out.push('\n');
    }

    fn visit_scene(&mut self, store: &ResourceStore, scene: Handle) {
        self.node_line(store, scene);
        self.out.push('\n');
        if let Some(NodeKind::Scene(data)) = store.node(scene).map(|n| n.kind()) {
            self.depth += 1;
            for &light in &data.lights {
                store.accept(light, self);
            }
            self.depth -= 1;
        }
        self.children(store, scene);
    }

    fn visit_view_holder(&mut self, store: &ResourceStore, holder: Handle) {
        self.node_line(store, holder);
        if let Some(data) = store.view_holder(holder) {
            if !data.debug_name().is_empty() {
                let _ = write!(self.out, " {:?}", data.debug_name());
            }
            let state = if data.view().is_some() {
                "connected"
            } else {
                "pending"
            };
            let _ = write!(self.out, " view={state}");
        }
        self.out.push('\n');
        self.children(store, holder);
    }

    fn visit_view_node(&mut self, store: &ResourceStore, node: Handle) {
        self.node_line(store, node);
        self.out.push('\n');
        self.children(store, node);
    }

    fn visit_light(&mut self, store: &ResourceStore, light: Handle) {
        self.begin_line(store, light);
        self.out.push('\n');
    }
}
