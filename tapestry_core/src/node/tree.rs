// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent/child edits and Scene propagation.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::NodeError;
use crate::resource::{Body, Handle, INVALID, ResourceStore, TypeFlags};
use crate::session::SessionEvent;
use crate::view::ViewProperties;

use super::NodeKind;

impl ResourceStore {
    /// Checks whether `child` may be added under `parent` without mutating
    /// anything.
    pub fn can_add_child(&self, parent: Handle, child: Handle) -> Result<(), NodeError> {
        let Some(parent_node) = self.node(parent) else {
            return Err(NodeError::NotANode(self.kind(parent)));
        };
        let Some(child_node) = self.node(child) else {
            return Err(NodeError::NotANode(self.kind(child)));
        };
        if matches!(child_node.kind, NodeKind::Scene(_)) {
            return Err(NodeError::SceneCannotBeChild);
        }
        match &parent_node.kind {
            NodeKind::ViewHolder(holder) => {
                let anchor = holder
                    .view
                    .and_then(|view| self.view(view))
                    .map(|view| view.anchor);
                if anchor != Some(child) {
                    return Err(NodeError::ViewHolderRejectsChild);
                }
            }
            _ => {
                let kind = parent_node.resource_kind();
                if !kind.type_flags().contains(TypeFlags::CONTAINER) {
                    return Err(NodeError::NotContainer(kind));
                }
                if matches!(child_node.kind, NodeKind::ViewNode { .. }) {
                    return Err(NodeError::AnchorOutsideViewHolder);
                }
            }
        }
        let mut ancestor = parent.idx;
        while ancestor != INVALID {
            if ancestor == child.idx {
                return Err(NodeError::WouldCreateCycle);
            }
            ancestor = self.parent[ancestor as usize];
        }
        Ok(())
    }

    /// Adds `child` as the last (front-most) child of `parent`.
    ///
    /// Detaches `child` from any previous parent first, then propagates the
    /// containing Scene down the moved subtree. Adding a node to its current
    /// parent is a successful no-op. The parent takes its own reference to
    /// the child.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub(crate) fn add_child(&mut self, parent: Handle, child: Handle) -> Result<(), NodeError> {
        self.can_add_child(parent, child)?;
        if self.parent[child.idx as usize] == parent.idx {
            return Ok(());
        }

        self.retain(child);
        self.detach(child);

        self.link_last_child(parent.idx, child.idx);
        let scene = self.scene_for_children(parent.idx);
        self.set_subtree_scene(child.idx, scene);
        self.invalidate_world_transform(child.idx);
        Ok(())
    }

    /// Removes `node` from its parent, clearing the Scene of the whole
    /// subtree. Detaching a parentless node does nothing.
    ///
    /// Drops the parent's reference, which destroys the node if nothing else
    /// holds it.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn detach(&mut self, node: Handle) {
        self.validate(node);
        if self.parent[node.idx as usize] == INVALID {
            return;
        }
        self.unlink_from_parent(node.idx);
        self.set_subtree_scene(node.idx, INVALID);
        self.invalidate_world_transform(node.idx);
        self.release(node);
    }

    /// Detaches every child of `parent`.
    ///
    /// The child list is collected before any child is detached.
    pub(crate) fn detach_children(&mut self, parent: Handle) -> Result<(), NodeError> {
        let Some(node) = self.node(parent) else {
            return Err(NodeError::NotANode(self.kind(parent)));
        };
        let kind = node.resource_kind();
        if !kind.type_flags().contains(TypeFlags::CONTAINER) {
            return Err(NodeError::NotContainer(kind));
        }
        let children: Vec<Handle> = self.children(parent).collect();
        for child in children {
            self.detach(child);
        }
        Ok(())
    }

    // -- Internal helpers --

    fn link_last_child(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = INVALID;
        let last = self.last_child[p as usize];
        self.prev_sibling[c as usize] = last;
        if last == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[last as usize] = c;
        }
        self.last_child[p as usize] = c;
    }

    /// Removes `idx` from its parent's child list. Does not touch references.
    pub(crate) fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev == INVALID {
            self.first_child[p as usize] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last_child[p as usize] = prev;
        } else {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// The Scene that children of `idx` belong to.
    fn scene_for_children(&self, idx: u32) -> u32 {
        match self.entry_at(idx).map(|entry| &entry.body) {
            Some(Body::Node(node)) if matches!(node.kind, NodeKind::Scene(_)) => idx,
            _ => self.scene[idx as usize],
        }
    }

    /// Sets the cached Scene of every node in the subtree at `root`.
    ///
    /// Stops descending at nodes that already carry `scene`, since their
    /// descendants must too.
    pub(crate) fn set_subtree_scene(&mut self, root: u32, scene: u32) {
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let old = self.scene[idx as usize];
            if old == scene {
                continue;
            }
            self.scene[idx as usize] = scene;
            if old != INVALID {
                self.on_scene_changed(idx, false);
            }
            if scene != INVALID {
                self.on_scene_changed(idx, true);
            }
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }
    }

    /// Tells a View when its anchor enters or leaves a Scene.
    fn on_scene_changed(&mut self, idx: u32, attached: bool) {
        let view = match self.entry_at(idx).map(|entry| &entry.body) {
            Some(Body::Node(node)) => match node.kind {
                NodeKind::ViewNode { view } => view,
                _ => return,
            },
            _ => return,
        };
        if !self.is_alive(view) {
            return;
        }
        if attached {
            let holder = self.parent[idx as usize];
            let properties = if holder == INVALID {
                ViewProperties::default()
            } else {
                self.view_holder(self.handle_at(holder))
                    .map(|holder| holder.properties)
                    .unwrap_or_default()
            };
            self.emit(view, |view_id| SessionEvent::ViewAttachedToScene {
                view_id,
                properties,
            });
        } else {
            self.emit(view, |view_id| SessionEvent::ViewDetachedFromScene { view_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::error::NodeError;
    use crate::koid::ViewRef;
    use crate::node::{Node, NodeKind, SceneData, ShapeNodeData};
    use crate::resource::{Body, Handle, ResourceStore, SessionId, Shape};

    const S: SessionId = SessionId(1);

    fn node(store: &mut ResourceStore, kind: NodeKind) -> Handle {
        store.insert(S, 0, Body::Node(Node::new(kind)))
    }

    fn scene(store: &mut ResourceStore) -> Handle {
        node(
            store,
            NodeKind::Scene(SceneData {
                view_ref: ViewRef::new(),
                lights: Vec::new(),
            }),
        )
    }

    #[test]
    fn scene_propagates_down_and_clears_on_detach() {
        let mut store = ResourceStore::new();
        let s = scene(&mut store);
        let a = node(&mut store, NodeKind::Entity);
        let b = node(&mut store, NodeKind::Entity);
        store.add_child(a, b).unwrap();
        assert_eq!(store.scene_of(b), None);

        store.add_child(s, a).unwrap();
        assert_eq!(store.scene_of(a), Some(s));
        assert_eq!(store.scene_of(b), Some(s));
        assert_eq!(store.scene_of(s), Some(s));

        store.detach(a);
        assert_eq!(store.parent(a), None);
        assert_eq!(store.scene_of(a), None);
        assert_eq!(store.scene_of(b), None);
    }

    #[test]
    fn detach_is_idempotent() {
        let mut store = ResourceStore::new();
        let a = node(&mut store, NodeKind::Entity);
        store.detach(a);
        store.detach(a);
        assert!(store.is_alive(a));
        assert_eq!(store.ref_count(a), 1);
    }

    #[test]
    fn re_adding_to_same_parent_is_a_noop() {
        let mut store = ResourceStore::new();
        let p = node(&mut store, NodeKind::Entity);
        let a = node(&mut store, NodeKind::Entity);
        let b = node(&mut store, NodeKind::Entity);
        store.add_child(p, a).unwrap();
        store.add_child(p, b).unwrap();
        store.add_child(p, a).unwrap();
        let kids: Vec<_> = store.children(p).collect();
        assert_eq!(kids, [a, b], "order unchanged");
        assert_eq!(store.ref_count(a), 2, "no extra reference taken");
    }

    #[test]
    fn reparenting_moves_the_child() {
        let mut store = ResourceStore::new();
        let p1 = node(&mut store, NodeKind::Entity);
        let p2 = node(&mut store, NodeKind::Entity);
        let c = node(&mut store, NodeKind::Entity);
        store.add_child(p1, c).unwrap();
        store.add_child(p2, c).unwrap();
        assert_eq!(store.children(p1).count(), 0);
        assert_eq!(store.parent(c), Some(p2));
        assert_eq!(store.ref_count(c), 2);
    }

    #[test]
    fn non_container_rejects_children_without_mutation() {
        let mut store = ResourceStore::new();
        let shape_node = node(&mut store, NodeKind::Shape(ShapeNodeData::default()));
        let c = node(&mut store, NodeKind::Entity);
        let p = node(&mut store, NodeKind::Entity);
        store.add_child(p, c).unwrap();

        assert!(matches!(
            store.add_child(shape_node, c),
            Err(NodeError::NotContainer(_))
        ));
        assert_eq!(store.parent(c), Some(p));
        assert_eq!(store.children(shape_node).count(), 0);
        assert_eq!(store.ref_count(c), 2);
    }

    #[test]
    fn scene_cannot_be_a_child() {
        let mut store = ResourceStore::new();
        let p = node(&mut store, NodeKind::Entity);
        let s = scene(&mut store);
        assert_eq!(store.add_child(p, s), Err(NodeError::SceneCannotBeChild));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut store = ResourceStore::new();
        let a = node(&mut store, NodeKind::Entity);
        let b = node(&mut store, NodeKind::Entity);
        store.add_child(a, b).unwrap();
        assert_eq!(store.add_child(b, a), Err(NodeError::WouldCreateCycle));
        assert_eq!(store.add_child(a, a), Err(NodeError::WouldCreateCycle));
    }

    #[test]
    fn non_nodes_are_rejected() {
        let mut store = ResourceStore::new();
        let p = node(&mut store, NodeKind::Entity);
        let shape = store.insert(S, 0, Body::Shape(Shape::Circle { radius: 1.0 }));
        assert!(matches!(store.add_child(p, shape), Err(NodeError::NotANode(_))));
    }

    #[test]
    fn detach_children_empties_the_list() {
        let mut store = ResourceStore::new();
        let s = scene(&mut store);
        let kids: Vec<_> = (0..3)
            .map(|_| node(&mut store, NodeKind::Entity))
            .collect();
        for &kid in &kids {
            store.add_child(s, kid).unwrap();
        }
        store.detach_children(s).unwrap();
        assert_eq!(store.children(s).count(), 0);
        for kid in kids {
            assert_eq!(store.parent(kid), None);
            assert_eq!(store.scene_of(kid), None);
        }
    }

    #[test]
    fn detach_children_requires_a_container() {
        let mut store = ResourceStore::new();
        let shape_node = node(&mut store, NodeKind::Shape(ShapeNodeData::default()));
        assert!(matches!(
            store.detach_children(shape_node),
            Err(NodeError::NotContainer(_))
        ));
    }

    #[test]
    fn scene_pointer_always_reaches_a_parentless_scene() {
        let mut store = ResourceStore::new();
        let s = scene(&mut store);
        let mut nodes = vec![s];
        for i in 0..12 {
            let n = node(&mut store, NodeKind::Entity);
            let parent = nodes[i / 2];
            store.add_child(parent, n).unwrap();
            nodes.push(n);
        }
        store.detach(nodes[3]);
        store.add_child(nodes[5], nodes[3]).unwrap();
        store.detach(nodes[2]);

        for &n in &nodes {
            if let Some(found) = store.scene_of(n) {
                let mut cursor = n;
                while let Some(p) = store.parent(cursor) {
                    cursor = p;
                }
                assert_eq!(cursor, found, "walking parents from {n:?} reaches its scene");
                assert_eq!(store.parent(found), None);
            }
        }
    }
}
