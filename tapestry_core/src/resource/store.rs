// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays resource storage with reference counting and node topology.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use tracing::debug;

use crate::koid::Koid;
use crate::linker::ObjectLinker;
use crate::node::{Node, NodeKind};
use crate::session::SessionEvent;
use crate::transform::Transform3d;
use crate::view::{ViewData, ViewHolderData};
use crate::view_tree::ViewTreeUpdate;
use crate::visitor::ResourceVisitor;

use super::body::Body;
use super::camera::{Camera, Light, Renderer};
use super::compositor::{Compositor, Layer, LayerStack};
use super::id::{Handle, INVALID, ResourceId, SessionId};
use super::kind::ResourceKind;
use super::material::{Image, Material, Memory};
use super::shape::Shape;
use super::variable::Variable;

/// A view-tree change produced while mutating the store, addressed to the
/// session whose updater must record it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ViewTreeOp {
    /// Start tracking a connected `ViewHolder`.
    Track { koid: Koid, holder: Handle },
    /// Stop tracking a `ViewHolder`.
    Untrack { koid: Koid },
    /// Record an update verbatim.
    Update(ViewTreeUpdate),
}

/// Side effects produced by store mutations, drained by the engine after
/// every command.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    pub(crate) events: Vec<(SessionId, SessionEvent)>,
    pub(crate) view_tree: Vec<(SessionId, ViewTreeOp)>,
}

impl Outbox {
    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty() && self.view_tree.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) session: SessionId,
    pub(crate) id: ResourceId,
    pub(crate) label: String,
    pub(crate) event_mask: u32,
    pub(crate) body: Body,
}

/// Struct-of-arrays storage for every resource of every session.
///
/// Resources are addressed by generational [`Handle`]s. Each slot carries a
/// reference count; [`release`](Self::release) destroys a resource when its
/// count reaches zero and then releases everything it owned, so dropping the
/// root of a subtree tears the subtree down one reference at a time.
///
/// Nodes additionally occupy the topology arrays: an intrusive, ordered child
/// list (most recently added last), a parent back-reference, and the cached
/// containing Scene.
#[derive(Debug)]
pub struct ResourceStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) scene: Vec<u32>,

    // -- Computed (memoized, cleared top-down on change) --
    pub(crate) world_transform: Vec<Cell<Option<Transform3d>>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) refs: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    live: usize,

    // -- Payload --
    pub(crate) entries: Vec<Option<Entry>>,

    // -- Cross-session plumbing --
    pub(crate) linker: ObjectLinker<Handle, Handle>,
    pub(crate) outbox: Outbox,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            scene: Vec::new(),
            world_transform: Vec::new(),
            generation: Vec::new(),
            refs: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            live: 0,
            entries: Vec::new(),
            linker: ObjectLinker::new(),
            outbox: Outbox::default(),
        }
    }

    // -- Allocation API --

    /// Stores a new resource with a reference count of one, owned by the
    /// caller.
    pub(crate) fn insert(&mut self, session: SessionId, id: ResourceId, body: Body) -> Handle {
        let entry = Entry {
            session,
            id,
            label: String::new(),
            event_mask: 0,
            body,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.scene[i] = INVALID;
            self.world_transform[i].set(None);
            self.refs[i] = 1;
            self.entries[i] = Some(entry);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.scene.push(INVALID);
            self.world_transform.push(Cell::new(None));
            self.generation.push(0);
            self.refs.push(1);
            self.entries.push(Some(entry));
            idx
        };
        self.live += 1;
        self.handle_at(idx)
    }

    /// Adds a reference to a live resource.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn retain(&mut self, handle: Handle) {
        self.validate(handle);
        self.refs[handle.idx as usize] += 1;
    }

    /// Drops one reference, destroying the resource (and cascading into what
    /// it owns) when the count reaches zero.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn release(&mut self, handle: Handle) {
        let mut pending = vec![handle];
        while let Some(h) = pending.pop() {
            self.validate(h);
            let i = h.idx as usize;
            debug_assert!(self.refs[i] > 0, "live resource with zero references");
            self.refs[i] -= 1;
            if self.refs[i] == 0 {
                self.destroy(h, &mut pending);
            }
        }
    }

    /// Releases `old` and retains `new`, for owning fields being reassigned.
    pub(crate) fn replace_ref(&mut self, old: Option<Handle>, new: Option<Handle>) {
        if old == new {
            return;
        }
        if let Some(new) = new {
            self.retain(new);
        }
        if let Some(old) = old {
            self.release(old);
        }
    }

    fn destroy(&mut self, handle: Handle, pending: &mut Vec<Handle>) {
        self.teardown(handle);

        let i = handle.idx as usize;
        let Some(entry) = self.entries[i].take() else {
            return;
        };
        debug!(
            kind = entry.body.kind().name(),
            id = entry.id,
            session = %entry.session,
            "destroying resource"
        );

        // Children are owned through the child list.
        let mut child = self.first_child[i];
        while child != INVALID {
            let next = self.next_sibling[child as usize];
            self.unlink_from_parent(child);
            self.set_subtree_scene(child, INVALID);
            self.invalidate_world_transform(child);
            pending.push(self.handle_at(child));
            child = next;
        }
        debug_assert!(
            self.parent[i] == INVALID,
            "a parented node holds a reference from its parent"
        );

        entry.body.owned_refs(pending);

        self.generation[i] += 1;
        self.scene[i] = INVALID;
        self.world_transform[i].set(None);
        self.free_list.push(handle.idx);
        self.live -= 1;
    }

    /// Kind-specific cleanup that needs the entry still in place.
    fn teardown(&mut self, handle: Handle) {
        let entry = self.entry(handle);
        let session = entry.session;
        match &entry.body {
            Body::Node(node) => {
                let scene_koid = match &node.kind {
                    NodeKind::Scene(scene) => Some(scene.view_ref.koid()),
                    _ => None,
                };
                let is_holder = matches!(node.kind, NodeKind::ViewHolder(_));
                self.unbind_all_variables(handle);
                if is_holder {
                    self.teardown_view_holder(handle);
                }
                if let Some(koid) = scene_koid {
                    self.push_view_tree_update(session, ViewTreeUpdate::DeleteNode { koid });
                }
            }
            Body::View(_) => self.teardown_view(handle),
            _ => {}
        }
    }

    /// Returns whether the given handle refers to a live resource.
    #[must_use]
    pub fn is_alive(&self, handle: Handle) -> bool {
        handle.idx < self.len
            && self.generation[handle.idx as usize] == handle.generation
            && self.entries[handle.idx as usize].is_some()
    }

    /// Number of live resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no resources are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates every live resource in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        (0..self.len)
            .filter(|&idx| self.entries[idx as usize].is_some())
            .map(|idx| self.handle_at(idx))
    }

    // -- Resource getters --

    /// The concrete kind of a resource.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale (as do all getters below).
    #[must_use]
    pub fn kind(&self, handle: Handle) -> ResourceKind {
        self.entry(handle).body.kind()
    }

    /// The session owning a resource.
    #[must_use]
    pub fn session_of(&self, handle: Handle) -> SessionId {
        self.entry(handle).session
    }

    /// The id under which the owning session created the resource, or `0`
    /// for internally created resources.
    #[must_use]
    pub fn resource_id(&self, handle: Handle) -> ResourceId {
        self.entry(handle).id
    }

    /// Debug label.
    #[must_use]
    pub fn label(&self, handle: Handle) -> &str {
        &self.entry(handle).label
    }

    /// Event subscription mask.
    #[must_use]
    pub fn event_mask(&self, handle: Handle) -> u32 {
        self.entry(handle).event_mask
    }

    /// Current number of owning references.
    #[must_use]
    pub fn ref_count(&self, handle: Handle) -> u32 {
        self.validate(handle);
        self.refs[handle.idx as usize]
    }

    /// The resource's payload.
    #[must_use]
    pub fn body(&self, handle: Handle) -> &Body {
        &self.entry(handle).body
    }

    /// The node payload, or `None` if the resource is not a node.
    #[must_use]
    pub fn node(&self, handle: Handle) -> Option<&Node> {
        match self.body(handle) {
            Body::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The View payload, or `None` if the resource is not a View.
    #[must_use]
    pub fn view(&self, handle: Handle) -> Option<&ViewData> {
        match self.body(handle) {
            Body::View(view) => Some(view),
            _ => None,
        }
    }

    /// The `ViewHolder` payload, or `None` if the resource is not a `ViewHolder`.
    #[must_use]
    pub fn view_holder(&self, handle: Handle) -> Option<&ViewHolderData> {
        match self.node(handle).map(Node::kind) {
            Some(NodeKind::ViewHolder(holder)) => Some(holder),
            _ => None,
        }
    }

    /// The shape payload, if the resource is a shape.
    #[must_use]
    pub fn shape(&self, handle: Handle) -> Option<&Shape> {
        match self.body(handle) {
            Body::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    /// The material payload, if the resource is a material.
    #[must_use]
    pub fn material(&self, handle: Handle) -> Option<&Material> {
        match self.body(handle) {
            Body::Material(material) => Some(material),
            _ => None,
        }
    }

    /// The memory payload, if the resource is client memory.
    #[must_use]
    pub fn memory(&self, handle: Handle) -> Option<&Memory> {
        match self.body(handle) {
            Body::Memory(memory) => Some(memory),
            _ => None,
        }
    }

    /// The image payload, if the resource is an image.
    #[must_use]
    pub fn image(&self, handle: Handle) -> Option<&Image> {
        match self.body(handle) {
            Body::Image(image) => Some(image),
            _ => None,
        }
    }

    /// The camera payload, if the resource is a camera.
    #[must_use]
    pub fn camera(&self, handle: Handle) -> Option<&Camera> {
        match self.body(handle) {
            Body::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// The renderer payload, if the resource is a renderer.
    #[must_use]
    pub fn renderer(&self, handle: Handle) -> Option<&Renderer> {
        match self.body(handle) {
            Body::Renderer(renderer) => Some(renderer),
            _ => None,
        }
    }

    /// The light payload, if the resource is a light.
    #[must_use]
    pub fn light(&self, handle: Handle) -> Option<&Light> {
        match self.body(handle) {
            Body::Light(light) => Some(light),
            _ => None,
        }
    }

    /// The layer payload, if the resource is a layer.
    #[must_use]
    pub fn layer(&self, handle: Handle) -> Option<&Layer> {
        match self.body(handle) {
            Body::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    /// The layer-stack payload, if the resource is a layer stack.
    #[must_use]
    pub fn layer_stack(&self, handle: Handle) -> Option<&LayerStack> {
        match self.body(handle) {
            Body::LayerStack(stack) => Some(stack),
            _ => None,
        }
    }

    /// The compositor payload, if the resource is a compositor.
    #[must_use]
    pub fn compositor(&self, handle: Handle) -> Option<&Compositor> {
        match self.body(handle) {
            Body::Compositor(compositor) => Some(compositor),
            _ => None,
        }
    }

    /// The variable payload, if the resource is a variable.
    #[must_use]
    pub fn variable(&self, handle: Handle) -> Option<&Variable> {
        match self.body(handle) {
            Body::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    // -- Topology getters --

    /// The parent of a node, if any.
    #[must_use]
    pub fn parent(&self, handle: Handle) -> Option<Handle> {
        self.validate(handle);
        let p = self.parent[handle.idx as usize];
        (p != INVALID).then(|| self.handle_at(p))
    }

    /// Direct children of a node, in storage order (oldest first). Reverse the
    /// iterator for the canonical front-to-back order.
    #[must_use]
    pub fn children(&self, handle: Handle) -> Children<'_> {
        self.validate(handle);
        let i = handle.idx as usize;
        Children {
            store: self,
            front: self.first_child[i],
            back: self.last_child[i],
        }
    }

    /// The Scene containing a node. A Scene reports itself.
    #[must_use]
    pub fn scene_of(&self, handle: Handle) -> Option<Handle> {
        self.validate(handle);
        if matches!(self.node(handle).map(Node::kind), Some(NodeKind::Scene(_))) {
            return Some(handle);
        }
        let s = self.scene[handle.idx as usize];
        (s != INVALID).then(|| self.handle_at(s))
    }

    // -- Mutation helpers --

    pub(crate) fn set_label(&mut self, handle: Handle, label: String) {
        self.entry_mut(handle).label = label;
    }

    pub(crate) fn set_event_mask(&mut self, handle: Handle, mask: u32) {
        self.entry_mut(handle).event_mask = mask;
    }

    pub(crate) fn body_mut(&mut self, handle: Handle) -> &mut Body {
        &mut self.entry_mut(handle).body
    }

    pub(crate) fn node_mut(&mut self, handle: Handle) -> Option<&mut Node> {
        match self.body_mut(handle) {
            Body::Node(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn view_mut(&mut self, handle: Handle) -> Option<&mut ViewData> {
        match self.body_mut(handle) {
            Body::View(view) => Some(view),
            _ => None,
        }
    }

    pub(crate) fn view_holder_mut(&mut self, handle: Handle) -> Option<&mut ViewHolderData> {
        match self.node_mut(handle).map(|node| &mut node.kind) {
            Some(NodeKind::ViewHolder(holder)) => Some(holder),
            _ => None,
        }
    }

    /// Queues an event for the session owning `target`.
    pub(crate) fn emit(&mut self, target: Handle, event: impl FnOnce(ResourceId) -> SessionEvent) {
        let entry = self.entry(target);
        let session = entry.session;
        let event = event(entry.id);
        self.outbox.events.push((session, event));
    }

    pub(crate) fn push_view_tree_update(&mut self, session: SessionId, update: ViewTreeUpdate) {
        self.outbox
            .view_tree
            .push((session, ViewTreeOp::Update(update)));
    }

    pub(crate) fn take_outbox(&mut self) -> Outbox {
        core::mem::take(&mut self.outbox)
    }

    // -- Visiting --

    /// Dispatches `visitor` on the concrete kind of `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn accept<V: ResourceVisitor + ?Sized>(&self, handle: Handle, visitor: &mut V) {
        match self.body(handle) {
            Body::Node(node) => match node.kind() {
                NodeKind::Entity => visitor.visit_entity_node(self, handle),
                NodeKind::Shape(_) => visitor.visit_shape_node(self, handle),
                NodeKind::Opacity { .. } => visitor.visit_opacity_node(self, handle),
                NodeKind::Scene(_) => visitor.visit_scene(self, handle),
                NodeKind::ViewHolder(_) => visitor.visit_view_holder(self, handle),
                NodeKind::ViewNode { .. } => visitor.visit_view_node(self, handle),
            },
            Body::View(_) => visitor.visit_view(self, handle),
            Body::Shape(_) => visitor.visit_shape(self, handle),
            Body::Material(_) => visitor.visit_material(self, handle),
            Body::Memory(_) => visitor.visit_memory(self, handle),
            Body::Image(_) => visitor.visit_image(self, handle),
            Body::Camera(_) => visitor.visit_camera(self, handle),
            Body::Renderer(_) => visitor.visit_renderer(self, handle),
            Body::Light(_) => visitor.visit_light(self, handle),
            Body::Layer(_) => visitor.visit_layer(self, handle),
            Body::LayerStack(_) => visitor.visit_layer_stack(self, handle),
            Body::Compositor(_) => visitor.visit_compositor(self, handle),
            Body::Variable(_) => visitor.visit_variable(self, handle),
        }
    }

    // -- Internal helpers --

    pub(crate) fn handle_at(&self, idx: u32) -> Handle {
        Handle {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, handle: Handle) {
        assert!(
            handle.idx < self.len && self.generation[handle.idx as usize] == handle.generation,
            "stale Handle: {handle:?} (current gen: {})",
            if handle.idx < self.len {
                self.generation[handle.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    pub(crate) fn entry(&self, handle: Handle) -> &Entry {
        self.validate(handle);
        match &self.entries[handle.idx as usize] {
            Some(entry) => entry,
            None => panic!("stale Handle: {handle:?} (resource is being destroyed)"),
        }
    }

    pub(crate) fn entry_mut(&mut self, handle: Handle) -> &mut Entry {
        self.validate(handle);
        match &mut self.entries[handle.idx as usize] {
            Some(entry) => entry,
            None => panic!("stale Handle: {handle:?} (resource is being destroyed)"),
        }
    }

    /// The entry at `idx` if the slot is live.
    pub(crate) fn entry_at(&self, idx: u32) -> Option<&Entry> {
        self.entries.get(idx as usize).and_then(Option::as_ref)
    }
}

/// An iterator over the direct children of a node.
///
/// Created by [`ResourceStore::children`]. Iterates oldest first; use
/// [`Iterator::rev`] for most recently attached first.
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a ResourceStore,
    front: u32,
    back: u32,
}

impl Iterator for Children<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        if self.front == INVALID {
            return None;
        }
        let idx = self.front;
        if self.front == self.back {
            self.front = INVALID;
            self.back = INVALID;
        } else {
            self.front = self.store.next_sibling[idx as usize];
        }
        Some(self.store.handle_at(idx))
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Handle> {
        if self.back == INVALID {
            return None;
        }
        let idx = self.back;
        if self.front == self.back {
            self.front = INVALID;
            self.back = INVALID;
        } else {
            self.back = self.store.prev_sibling[idx as usize];
        }
        Some(self.store.handle_at(idx))
    }
}
