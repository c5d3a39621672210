// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Protected-content audit.
//!
//! Screenshots and other readbacks must not include content backed by
//! protected memory. [`ProtectedMemoryVisitor`] follows `ShapeNode` →
//! material → texture image → memory under a root and stops descending as
//! soon as it finds one.

use tapestry_core::node::NodeKind;
use tapestry_core::resource::{Handle, ResourceStore};
use tapestry_core::visitor::{ChildOrder, ResourceVisitor, visit_children};

/// Finds the first protected memory reachable from a subtree.
#[derive(Debug, Default)]
pub struct ProtectedMemoryVisitor {
    found: Option<Handle>,
}

impl ProtectedMemoryVisitor {
    /// Creates a visitor that has found nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any visited content uses protected memory.
    #[must_use]
    pub fn has_protected_memory(&self) -> bool {
        self.found.is_some()
    }

    /// The `ShapeNode` whose material is protected, if any.
    #[must_use]
    pub fn found(&self) -> Option<Handle> {
        self.found
    }

    /// Audits the subtree at `root`.
    #[must_use]
    pub fn audit(store: &ResourceStore, root: Handle) -> Option<Handle> {
        let mut visitor = Self::new();
        store.accept(root, &mut visitor);
        visitor.found
    }

    fn descend(&mut self, store: &ResourceStore, node: Handle) {
        if self.found.is_none() {
            visit_children(store, node, ChildOrder::FrontToBack, self);
        }
    }

    fn is_protected(store: &ResourceStore, material: Handle) -> bool {
        store
            .material(material)
            .and_then(|m| m.texture)
            .and_then(|image| store.image(image))
            .and_then(|image| store.memory(image.memory))
            .is_some_and(|memory| memory.is_protected)
    }
}

impl ResourceVisitor for ProtectedMemoryVisitor {
    fn visit_entity_node(&mut self, store: &ResourceStore, node: Handle) {
        self.descend(store, node);
    }

    fn visit_opacity_node(&mut self, store: &ResourceStore, node: Handle) {
        self.descend(store, node);
    }

    fn visit_scene(&mut self, store: &ResourceStore, scene: Handle) {
        self.descend(store, scene);
    }

    fn visit_view_holder(&mut self, store: &ResourceStore, holder: Handle) {
        self.descend(store, holder);
    }

    fn visit_view_node(&mut self, store: &ResourceStore, node: Handle) {
        self.descend(store, node);
    }

    fn visit_shape_node(&mut self, store: &ResourceStore, node: Handle) {
        if self.found.is_some() {
            return;
        }
        if let Some(NodeKind::Shape(data)) = store.node(node).map(|n| n.kind())
            && data.material.is_some_and(|m| Self::is_protected(store, m))
        {
            self.found = Some(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapestry_core::command::{Command, ResourceArgs};
    use tapestry_core::engine::Engine;
    use tapestry_core::resource::{ResourceId, SessionId};
    use tapestry_core::trace::Tracer;

    fn create(id: ResourceId, resource: ResourceArgs) -> Command {
        Command::CreateResource { id, resource }
    }

    /// Entity 1 holding `ShapeNode` `node` textured from memory `memory`.
    fn textured(node: ResourceId, memory: ResourceId, is_protected: bool) -> Vec<Command> {
        vec![
            create(memory, ResourceArgs::Memory {
                size: 4096,
                is_protected,
            }),
            create(memory + 1, ResourceArgs::Image {
                memory_id: memory,
                width: 32,
                height: 32,
            }),
            create(memory + 2, ResourceArgs::Material),
            create(memory + 3, ResourceArgs::Circle { radius: 4.0 }),
            create(node, ResourceArgs::ShapeNode),
            Command::SetTexture {
                material_id: memory + 2,
                texture_id: memory + 1,
            },
            Command::SetMaterial {
                node_id: node,
                material_id: memory + 2,
            },
            Command::SetShape {
                node_id: node,
                shape_id: memory + 3,
            },
            Command::AddChild {
                node_id: 1,
                child_id: node,
            },
        ]
    }

    fn engine(commands: Vec<Command>) -> (Engine, SessionId) {
        let mut engine = Engine::default();
        let s = engine.create_session();
        let mut all = vec![create(1, ResourceArgs::EntityNode)];
        all.extend(commands);
        let ok = engine.apply_commands(s, all, &mut Tracer::none());
        assert!(ok.iter().all(|&ok| ok), "{:?}", engine.take_errors(s));
        (engine, s)
    }

    #[test]
    fn finds_protected_texture() {
        let mut commands = textured(2, 10, false);
        commands.extend(textured(3, 20, true));
        let (engine, s) = engine(commands);
        let root = engine.resolve(s, 1).unwrap();
        assert_eq!(
            ProtectedMemoryVisitor::audit(engine.store(), root),
            engine.resolve(s, 3)
        );
    }

    #[test]
    fn unprotected_content_passes() {
        let (engine, s) = engine(textured(2, 10, false));
        let mut visitor = ProtectedMemoryVisitor::new();
        engine
            .store()
            .accept(engine.resolve(s, 1).unwrap(), &mut visitor);
        assert!(!visitor.has_protected_memory());
        assert_eq!(visitor.found(), None);
    }

    #[test]
    fn stops_at_the_first_find() {
        let mut commands = textured(2, 10, true);
        commands.extend(textured(3, 20, true));
        let (engine, s) = engine(commands);
        let root = engine.resolve(s, 1).unwrap();
        // Front to back: the most recently attached node is found first.
        assert_eq!(
            ProtectedMemoryVisitor::audit(engine.store(), root),
            engine.resolve(s, 3)
        );
    }
}
