// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of a node subtree.
//!
//! Each node becomes an object with its kind, id, label, and local
//! properties, plus a `children` array in front-to-back order. `ShapeNode`s
//! inline their shape and material. The result can be compared in tests or
//! written out with [`serde_json::to_writer_pretty`].

use serde_json::{Map, Value, json};

use tapestry_core::geometry::Vec3;
use tapestry_core::node::NodeKind;
use tapestry_core::resource::{Handle, ResourceStore, Shape};
use tapestry_core::visitor::{ChildOrder, ResourceVisitor, visit_children};

/// Builds a [`Value`] tree from a subtree.
#[derive(Debug, Default)]
pub struct SnapshotVisitor {
    /// Finished values at the current depth.
    level: Vec<Value>,
}

impl SnapshotVisitor {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the subtree at `root`.
    #[must_use]
    pub fn snapshot(store: &ResourceStore, root: Handle) -> Value {
        let mut visitor = Self::new();
        store.accept(root, &mut visitor);
        visitor.level.pop().unwrap_or(Value::Null)
    }

    /// Everything visited at the top level, in visit order.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.level
    }

    fn header(store: &ResourceStore, handle: Handle) -> Map<String, Value> {
        let mut obj = Map::new();
        obj.insert("kind".into(), json!(store.kind(handle).name()));
        obj.insert("id".into(), json!(store.resource_id(handle)));
        let label = store.label(handle);
        if !label.is_empty() {
            obj.insert("label".into(), json!(label));
        }
        obj
    }

    fn node(&mut self, store: &ResourceStore, node: Handle, mut obj: Map<String, Value>) {
        if let Some(n) = store.node(node) {
            obj.insert("translation".into(), vec3(n.translation().value));
            obj.insert("scale".into(), vec3(n.scale().value));
            let r = n.rotation().value;
            obj.insert("rotation".into(), json!([r.x, r.y, r.z, r.w]));
            if n.tag_value() != 0 {
                obj.insert("tag".into(), json!(n.tag_value()));
            }
            if !n.clip_planes().is_empty() {
                let planes: Vec<Value> = n
                    .clip_planes()
                    .iter()
                    .map(|p| json!({ "normal": vec3(p.normal), "distance": p.distance }))
                    .collect();
                obj.insert("clip_planes".into(), Value::Array(planes));
            }
        }

        let siblings = std::mem::take(&mut self.level);
        visit_children(store, node, ChildOrder::FrontToBack, self);
        let children = std::mem::replace(&mut self.level, siblings);
        if !children.is_empty() {
            obj.insert("children".into(), Value::Array(children));
        }
        self.level.push(Value::Object(obj));
    }
}

fn vec3(v: Vec3) -> Value {
    json!([v.x, v.y, v.z])
}

fn shape_json(shape: &Shape) -> Value {
    match *shape {
        Shape::Rectangle { width, height } => {
            json!({ "type": "rectangle", "width": width, "height": height })
        }
        Shape::RoundedRectangle {
            width,
            height,
            top_left_radius,
            top_right_radius,
            bottom_right_radius,
            bottom_left_radius,
        } => json!({
            "type": "rounded_rectangle",
            "width": width,
            "height": height,
            "radii": [top_left_radius, top_right_radius, bottom_right_radius, bottom_left_radius],
        }),
        Shape::Circle { radius } => json!({ "type": "circle", "radius": radius }),
    }
}

impl ResourceVisitor for SnapshotVisitor {
    fn visit_entity_node(&mut self, store: &ResourceStore, node: Handle) {
        let obj = Self::header(store, node);
        self.node(store, node, obj);
    }

    fn visit_opacity_node(&mut self, store: &ResourceStore, node: Handle) {
        let mut obj = Self::header(store, node);
        if let Some(n) = store.node(node) {
            obj.insert("opacity".into(), json!(n.opacity()));
        }
        self.node(store, node, obj);
    }

    fn visit_shape_node(&mut self, store: &ResourceStore, node: Handle) {
        let mut obj = Self::header(store, node);
        if let Some(NodeKind::Shape(data)) = store.node(node).map(|n| n.kind()) {
            if let Some(shape) = data.shape.and_then(|s| store.shape(s)) {
                obj.insert("shape".into(), shape_json(shape));
            }
            if let Some(material) = data.material.and_then(|m| store.material(m)) {
                let c = material.color;
                obj.insert(
                    "material".into(),
                    json!({ "color": [c.r, c.g, c.b, c.a], "textured": material.texture.is_some() }),
                );
            }
        }
        self.node(store, node, obj);
    }

    fn visit_scene(&mut self, store: &ResourceStore, scene: Handle) {
        let mut obj = Self::header(store, scene);
        if let Some(NodeKind::Scene(data)) = store.node(scene).map(|n| n.kind()) {
            obj.insert("view_ref".into(), json!(data.view_ref.koid().get()));
            obj.insert("lights".into(), json!(data.lights.len()));
        }
        self.node(store, scene, obj);
    }

    fn visit_view_holder(&mut self, store: &ResourceStore, holder: Handle) {
        let mut obj = Self::header(store, holder);
        if let Some(data) = store.view_holder(holder) {
            obj.insert("debug_name".into(), json!(data.debug_name()));
            obj.insert("connected".into(), json!(data.view().is_some()));
        }
        self.node(store, holder, obj);
    }

    fn visit_view_node(&mut self, store: &ResourceStore, node: Handle) {
        let mut obj = Self::header(store, node);
        if let Some(NodeKind::ViewNode { view }) = store.node(node).map(|n| n.kind())
            && let Some(data) = store.view(*view)
        {
            obj.insert("view_ref".into(), json!(data.view_ref().koid().get()));
            obj.insert("debug_name".into(), json!(data.debug_name()));
        }
        self.node(store, node, obj);
    }
}
