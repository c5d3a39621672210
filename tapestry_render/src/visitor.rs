// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene traversal producing a [`RenderPlan`].

use alloc::vec::Vec;

use tapestry_core::geometry::Plane3;
use tapestry_core::node::NodeKind;
use tapestry_core::resource::{Handle, ResourceStore};
use tapestry_core::visitor::{ChildOrder, ResourceVisitor, visit_children};

use crate::plan::{CameraMatrices, RenderItem, RenderPlan};

/// Collects the drawable content under a Scene.
///
/// Containers contribute their clip planes (pulled into world space) and
/// group opacity to everything below them; `ShapeNode`s with both a shape and
/// a material become [`RenderItem`]s. Children are walked front to back.
#[derive(Debug)]
pub struct RenderVisitor {
    disable_clipping: bool,
    opacity: f32,
    clip_planes: Vec<Plane3>,
    plan: RenderPlan,
}

impl Default for RenderVisitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl RenderVisitor {
    /// Creates a visitor. With `disable_clipping`, clip planes are ignored.
    #[must_use]
    pub fn new(disable_clipping: bool) -> Self {
        Self {
            disable_clipping,
            opacity: 1.0,
            clip_planes: Vec::new(),
            plan: RenderPlan::new(),
        }
    }

    /// Finishes the traversal.
    #[must_use]
    pub fn into_plan(self) -> RenderPlan {
        self.plan
    }

    /// Pushes the node's world-space clip planes, returning how many were
    /// pushed.
    fn push_clip_planes(&mut self, store: &ResourceStore, node: Handle) -> usize {
        if self.disable_clipping {
            return 0;
        }
        let Some(n) = store.node(node) else {
            return 0;
        };
        if n.clip_planes().is_empty() {
            return 0;
        }
        let Some(world_to_local) = store.world_transform(node).inverse() else {
            return 0;
        };
        let before = self.clip_planes.len();
        self.clip_planes.extend(
            n.clip_planes()
                .iter()
                .map(|plane| world_to_local.pull_back_plane(plane)),
        );
        self.clip_planes.len() - before
    }

    fn visit_container(&mut self, store: &ResourceStore, node: Handle) {
        let pushed = self.push_clip_planes(store, node);
        let saved = self.opacity;
        if let Some(n) = store.node(node) {
            self.opacity *= n.opacity();
        }
        visit_children(store, node, ChildOrder::FrontToBack, self);
        self.opacity = saved;
        let len = self.clip_planes.len() - pushed;
        self.clip_planes.truncate(len);
    }
}

impl ResourceVisitor for RenderVisitor {
    fn visit_entity_node(&mut self, store: &ResourceStore, node: Handle) {
        self.visit_container(store, node);
    }

    fn visit_opacity_node(&mut self, store: &ResourceStore, node: Handle) {
        self.visit_container(store, node);
    }

    fn visit_scene(&mut self, store: &ResourceStore, scene: Handle) {
        self.visit_container(store, scene);
    }

    fn visit_view_holder(&mut self, store: &ResourceStore, holder: Handle) {
        self.visit_container(store, holder);
    }

    fn visit_view_node(&mut self, store: &ResourceStore, node: Handle) {
        self.visit_container(store, node);
    }

    fn visit_shape_node(&mut self, store: &ResourceStore, node: Handle) {
        let Some(NodeKind::Shape(data)) = store.node(node).map(|n| n.kind()) else {
            return;
        };
        let (Some(shape), Some(material)) = (
            data.shape.and_then(|s| store.shape(s)),
            data.material.and_then(|m| store.material(m)),
        ) else {
            return;
        };
        let pushed = self.push_clip_planes(store, node);
        self.plan.items.push(RenderItem {
            node,
            geometry: shape.geometry(),
            world_transform: store.world_transform(node).to_f32_array(),
            opacity: self.opacity,
            clip_planes: self.clip_planes.clone(),
            color: material.color.to_f32(),
            texture: material.texture,
        });
        let len = self.clip_planes.len() - pushed;
        self.clip_planes.truncate(len);
    }
}

/// Builds the plan for a compositor layer: layer → renderer → camera →
/// scene.
///
/// Returns `None` if the layer has no renderer, the renderer no camera, or
/// `layer` is not a layer. The plan has no camera matrices when the camera
/// pose is degenerate or the layer has no area.
#[must_use]
pub fn plan_layer(store: &ResourceStore, layer: Handle) -> Option<RenderPlan> {
    let l = store.layer(layer)?;
    let renderer = store.renderer(l.renderer?)?;
    let camera = store.camera(renderer.camera?)?;

    let mut visitor = RenderVisitor::new(renderer.disable_clipping);
    store.accept(camera.scene, &mut visitor);
    let mut plan = visitor.into_plan();
    if l.width > 0.0 && l.height > 0.0 {
        plan.camera = camera.view_matrix().map(|view| CameraMatrices {
            view: view.to_f32_array(),
            projection: camera.projection_matrix(l.width, l.height).to_f32_array(),
        });
    }
    Some(plan)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use tapestry_core::command::{Command, ResourceArgs, Value};
    use tapestry_core::engine::Engine;
    use tapestry_core::geometry::Vec3;
    use tapestry_core::koid::ViewRef;
    use tapestry_core::resource::{ResourceId, Rgba8, SessionId};
    use tapestry_core::trace::Tracer;

    use super::*;

    fn apply(engine: &mut Engine, s: SessionId, commands: Vec<Command>) {
        let ok = engine.apply_commands(s, commands, &mut Tracer::none());
        assert!(ok.iter().all(|&ok| ok), "{:?}", engine.take_errors(s));
    }

    fn create(id: ResourceId, resource: ResourceArgs) -> Command {
        Command::CreateResource { id, resource }
    }

    /// Scene 1 seen by camera 4 through renderer 3 on a 100x100 layer 2.
    /// Material 5 is red; rectangle 6 is 10x10.
    fn scene() -> (Engine, SessionId) {
        let mut engine = Engine::default();
        let s = engine.create_session();
        apply(&mut engine, s, vec![
            create(1, ResourceArgs::Scene {
                view_ref: ViewRef::new(),
            }),
            create(2, ResourceArgs::Layer),
            create(3, ResourceArgs::Renderer),
            create(4, ResourceArgs::Camera { scene_id: 1 }),
            create(5, ResourceArgs::Material),
            create(6, ResourceArgs::Rectangle {
                width: 10.0,
                height: 10.0,
            }),
            Command::SetSize {
                id: 2,
                width: 100.0,
                height: 100.0,
            },
            Command::SetRenderer {
                layer_id: 2,
                renderer_id: 3,
            },
            Command::SetCamera {
                renderer_id: 3,
                camera_id: 4,
            },
            Command::SetColor {
                material_id: 5,
                color: Rgba8::new(255, 0, 0, 255),
            },
        ]);
        (engine, s)
    }

    fn shape_node(id: ResourceId, parent: ResourceId) -> Vec<Command> {
        vec![
            create(id, ResourceArgs::ShapeNode),
            Command::SetShape {
                node_id: id,
                shape_id: 6,
            },
            Command::SetMaterial {
                node_id: id,
                material_id: 5,
            },
            Command::AddChild {
                node_id: parent,
                child_id: id,
            },
        ]
    }

    fn plan_of(engine: &Engine, s: SessionId) -> RenderPlan {
        plan_layer(engine.store(), engine.resolve(s, 2).unwrap()).unwrap()
    }

    #[test]
    fn items_are_front_to_back() {
        let (mut engine, s) = scene();
        apply(&mut engine, s, shape_node(10, 1));
        apply(&mut engine, s, shape_node(11, 1));
        apply(&mut engine, s, vec![Command::SetTranslation {
            id: 11,
            value: Value::Literal(Vec3::new(5.0, 0.0, 0.0)),
        }]);

        let plan = plan_of(&engine, s);
        let nodes: Vec<Handle> = plan.items.iter().map(|i| i.node).collect();
        assert_eq!(nodes, [
            engine.resolve(s, 11).unwrap(),
            engine.resolve(s, 10).unwrap()
        ]);
        assert_eq!(plan.items[0].world_transform[12], 5.0);
        assert_eq!(plan.items[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert!(plan.camera.is_some(), "default camera pose is valid");
    }

    #[test]
    fn opacity_accumulates_and_restores() {
        let (mut engine, s) = scene();
        apply(&mut engine, s, vec![
            create(20, ResourceArgs::OpacityNode),
            create(21, ResourceArgs::OpacityNode),
            Command::SetOpacity {
                node_id: 20,
                opacity: 0.5,
            },
            Command::SetOpacity {
                node_id: 21,
                opacity: 0.5,
            },
            Command::AddChild {
                node_id: 1,
                child_id: 20,
            },
            Command::AddChild {
                node_id: 20,
                child_id: 21,
            },
        ]);
        apply(&mut engine, s, shape_node(10, 21));
        apply(&mut engine, s, shape_node(11, 1));

        let plan = plan_of(&engine, s);
        let opacity = |id| {
            let node = engine.resolve(s, id).unwrap();
            plan.items.iter().find(|i| i.node == node).unwrap().opacity
        };
        assert_eq!(opacity(10), 0.25);
        assert_eq!(opacity(11), 1.0);
    }

    #[test]
    fn clip_planes_follow_the_renderer_setting() {
        let (mut engine, s) = scene();
        apply(&mut engine, s, vec![
            create(20, ResourceArgs::EntityNode),
            Command::AddChild {
                node_id: 1,
                child_id: 20,
            },
            Command::SetTranslation {
                id: 20,
                value: Value::Literal(Vec3::new(3.0, 0.0, 0.0)),
            },
            Command::SetClipPlanes {
                node_id: 20,
                clip_planes: vec![Plane3::new(Vec3::new(1.0, 0.0, 0.0), 0.0)],
            },
        ]);
        apply(&mut engine, s, shape_node(10, 20));
        apply(&mut engine, s, shape_node(11, 1));

        let plan = plan_of(&engine, s);
        let clipped = &plan.items[0];
        assert_eq!(clipped.node, engine.resolve(s, 11).unwrap());
        assert!(clipped.clip_planes.is_empty(), "sibling of the clipped group");
        let inner = &plan.items[1];
        assert_eq!(inner.clip_planes.len(), 1);
        // x >= 0 in the group's space is x >= 3 in the world.
        assert!(!inner.clip_planes[0].contains(Vec3::new(2.0, 0.0, 0.0)));
        assert!(inner.clip_planes[0].contains(Vec3::new(4.0, 0.0, 0.0)));

        apply(&mut engine, s, vec![Command::SetDisableClipping {
            renderer_id: 3,
            disable_clipping: true,
        }]);
        let plan = plan_of(&engine, s);
        assert!(plan.items.iter().all(|i| i.clip_planes.is_empty()));
    }

    #[test]
    fn unfinished_shape_nodes_are_skipped() {
        let (mut engine, s) = scene();
        apply(&mut engine, s, vec![
            create(10, ResourceArgs::ShapeNode),
            Command::SetShape {
                node_id: 10,
                shape_id: 6,
            },
            Command::AddChild {
                node_id: 1,
                child_id: 10,
            },
        ]);
        assert!(plan_of(&engine, s).items.is_empty());
    }

    #[test]
    fn layer_without_renderer_has_no_plan() {
        let mut engine = Engine::default();
        let s = engine.create_session();
        apply(&mut engine, s, vec![create(2, ResourceArgs::Layer)]);
        assert_eq!(plan_layer(engine.store(), engine.resolve(s, 2).unwrap()), None);
    }
}
