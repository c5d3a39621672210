// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View/`ViewHolder` linking, layout propagation, and render-readiness.

use alloc::string::String;
use alloc::vec::Vec;

use tracing::{debug, warn};

use crate::error::{CommandError, LinkError};
use crate::koid::{ExportToken, Koid, ViewRef};
use crate::linker::{ExportLink, ImportLink, LinkEvent};
use crate::node::{Node, NodeKind};
use crate::resource::{
    Body, Handle, INVALID, ResourceId, ResourceStore, Rgba8, SessionId, ViewTreeOp,
};
use crate::session::SessionEvent;
use crate::view_tree::ViewTreeUpdate;

use super::{RenderWatch, ViewData, ViewHolderData, ViewProperties};

impl ResourceStore {
    // -- Creation --

    /// Stores an unconnected `ViewHolder` owned by the caller.
    pub(crate) fn create_view_holder(
        &mut self,
        session: SessionId,
        id: ResourceId,
        debug_name: String,
        bounds_color: Rgba8,
    ) -> Handle {
        let data = ViewHolderData::new(debug_name, bounds_color);
        self.insert(
            session,
            id,
            Body::Node(Node::new(NodeKind::ViewHolder(data))),
        )
    }

    /// Binds `holder` to its registered export endpoint and starts tracking
    /// it in the view tree. Must be called exactly once per holder.
    pub(crate) fn connect_view_holder(
        &mut self,
        holder: Handle,
        link: ExportLink,
    ) -> Result<(), LinkError> {
        if self.view_holder(holder).is_none_or(ViewHolderData::is_connected) {
            self.linker.release_export(link);
            return Err(LinkError::AlreadyInitialized);
        }
        if let Err(err) = self.linker.initialize_export(&link, holder) {
            self.linker.release_export(link);
            return Err(err);
        }
        let session = self.session_of(holder);
        let Some(data) = self.view_holder_mut(holder) else {
            return Err(LinkError::AlreadyInitialized);
        };
        data.link = Some(link);
        let koid = data.koid;
        self.outbox
            .view_tree
            .push((session, ViewTreeOp::Track { koid, holder }));
        Ok(())
    }

    /// Stores an unconnected View, together with its anchor node, owned by
    /// the caller.
    pub(crate) fn create_view(
        &mut self,
        session: SessionId,
        id: ResourceId,
        view_ref: ViewRef,
        debug_name: String,
        debug_bounds: bool,
    ) -> Handle {
        let placeholder = Handle {
            idx: INVALID,
            generation: 0,
        };
        let view = self.insert(
            session,
            id,
            Body::View(ViewData::new(view_ref, debug_name, placeholder, debug_bounds)),
        );
        let anchor = self.insert(session, 0, Body::Node(Node::new(NodeKind::ViewNode { view })));
        if let Some(data) = self.view_mut(view) {
            data.anchor = anchor;
        }
        view
    }

    /// Binds `view` to its registered import endpoint and adds it to the view
    /// tree. Must be called exactly once per View.
    pub(crate) fn connect_view(&mut self, view: Handle, link: ImportLink) -> Result<(), LinkError> {
        if self.view(view).is_none_or(ViewData::is_connected) {
            self.linker.release_import(link);
            return Err(LinkError::AlreadyInitialized);
        }
        if let Err(err) = self.linker.initialize_import(&link, view) {
            self.linker.release_import(link);
            return Err(err);
        }
        let session = self.session_of(view);
        let Some(data) = self.view_mut(view) else {
            return Err(LinkError::AlreadyInitialized);
        };
        data.link = Some(link);
        let koid = data.view_ref.koid();
        self.push_view_tree_update(
            session,
            ViewTreeUpdate::NewRefNode {
                koid,
                session,
                may_receive_focus: true,
            },
        );
        Ok(())
    }

    /// Creates a `ViewHolder` owned by `view`, parented to its anchor.
    ///
    /// The new holder copies the layout of the View's own holder and follows
    /// its later changes.
    pub(crate) fn create_annotation_view_holder(
        &mut self,
        view: Handle,
        token: ExportToken,
    ) -> Result<Handle, CommandError> {
        let Some(data) = self.view(view) else {
            return Err(CommandError::InvalidArgument("not a View"));
        };
        let anchor = data.anchor;
        let properties = data
            .holder
            .and_then(|h| self.view_holder(h))
            .map(|h| h.properties);
        let session = self.session_of(view);

        let link = self.linker.create_export(token)?;
        let holder = self.create_view_holder(
            session,
            0,
            String::from("annotation"),
            Rgba8::WHITE,
        );
        if let Some(view_data) = self.view_mut(view) {
            view_data.annotation_holders.push(holder);
        }
        self.connect_view_holder(holder, link)?;
        self.add_child(anchor, holder)?;
        if let Some(properties) = properties {
            self.set_view_properties(holder, properties)?;
        }
        Ok(holder)
    }

    // -- Teardown --

    pub(crate) fn teardown_view_holder(&mut self, holder: Handle) {
        let session = self.session_of(holder);
        let Some(data) = self.view_holder_mut(holder) else {
            return;
        };
        data.render_watch = None;
        data.view = None;
        let koid = data.koid;
        if let Some(link) = data.link.take() {
            self.linker.release_export(link);
            self.outbox
                .view_tree
                .push((session, ViewTreeOp::Untrack { koid }));
        }
    }

    pub(crate) fn teardown_view(&mut self, view: Handle) {
        let session = self.session_of(view);
        let Some(data) = self.view_mut(view) else {
            return;
        };
        let anchor = data.anchor;
        let koid = data.view_ref.koid();
        let link = data.link.take();
        data.holder = None;
        if self.is_alive(anchor) {
            self.detach(anchor);
        }
        if let Some(link) = link {
            self.linker.release_import(link);
            self.push_view_tree_update(session, ViewTreeUpdate::DeleteNode { koid });
        }
    }

    // -- Link events --

    /// Drains the linker and applies every resolution and invalidation.
    ///
    /// Returns the number of events handled.
    pub(crate) fn dispatch_link_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.linker.pop_event() {
            handled += 1;
            match event {
                LinkEvent::Resolved { export, import } => self.on_link_resolved(export, import),
                LinkEvent::ExportInvalidated(holder) => self.on_view_holder_link_invalidated(holder),
                LinkEvent::ImportInvalidated(view) => self.on_view_link_invalidated(view),
            }
        }
        handled
    }

    fn on_link_resolved(&mut self, holder: Handle, view: Handle) {
        if !self.is_alive(holder) || !self.is_alive(view) {
            warn!(?holder, ?view, "link resolved against a destroyed endpoint");
            return;
        }
        debug!(?holder, ?view, "view link resolved");

        let Some(holder_data) = self.view_holder_mut(holder) else {
            return;
        };
        holder_data.view = Some(view);
        let holder_koid = holder_data.koid;
        let focus_change = holder_data.properties.focus_change;
        let Some(view_data) = self.view_mut(view) else {
            return;
        };
        view_data.holder = Some(holder);
        let anchor = view_data.anchor;
        let view_koid = view_data.view_ref.koid();
        let view_session = self.session_of(view);

        let view_id = self.resource_id(view);
        let holder_id = self.resource_id(holder);
        self.emit(holder, |_| SessionEvent::ViewConnected {
            view_holder_id: holder_id,
        });
        self.emit(view, |_| SessionEvent::ViewHolderConnected { view_id });
        self.push_view_tree_update(
            view_session,
            ViewTreeUpdate::ConnectToParent {
                child: view_koid,
                parent: holder_koid,
            },
        );
        if !focus_change {
            self.push_view_tree_update(
                view_session,
                ViewTreeUpdate::SetMayReceiveFocus {
                    koid: view_koid,
                    may_receive_focus: false,
                },
            );
        }

        if let Err(err) = self.add_child(holder, anchor) {
            warn!(%err, "cannot attach a View anchor to its holder");
        }
        if let Some(holder_data) = self.view_holder_mut(holder) {
            holder_data.render_watch = Some(RenderWatch::Armed);
        }
    }

    /// The holder's View went away.
    fn on_view_holder_link_invalidated(&mut self, holder: Handle) {
        if !self.is_alive(holder) {
            return;
        }
        debug!(?holder, "view holder lost its view");
        if self.scene[holder.idx as usize] != INVALID {
            self.emit(holder, |view_holder_id| SessionEvent::ViewStateChanged {
                view_holder_id,
                is_rendering: false,
            });
        }
        let Some(data) = self.view_holder_mut(holder) else {
            return;
        };
        data.view = None;
        data.render_watch = None;
        let children: Vec<Handle> = self.children(holder).collect();
        for child in children {
            self.detach(child);
        }
        self.emit(holder, |view_holder_id| SessionEvent::ViewDisconnected { view_holder_id });
    }

    /// The View's holder went away.
    fn on_view_link_invalidated(&mut self, view: Handle) {
        if !self.is_alive(view) {
            return;
        }
        debug!(?view, "view lost its holder");
        let session = self.session_of(view);
        let Some(data) = self.view_mut(view) else {
            return;
        };
        let previous = data.holder.take();
        let anchor = data.anchor;
        let koid = data.view_ref.koid();
        self.detach(anchor);
        if previous.is_some() {
            self.push_view_tree_update(session, ViewTreeUpdate::DisconnectFromParent { child: koid });
        }
        self.emit(view, |view_id| SessionEvent::ViewHolderDisconnected { view_id });
    }

    // -- Layout and readiness --

    /// Updates a holder's layout. When it changes, recomputes the holder's
    /// clip planes from the inset bounding box and notifies the View and its
    /// annotation holders. A change of `focus_change` is carried over to the
    /// View's view-tree entry.
    pub(crate) fn set_view_properties(
        &mut self,
        holder: Handle,
        properties: ViewProperties,
    ) -> Result<(), CommandError> {
        if properties.is_nan() {
            return Err(CommandError::InvalidArgument("view property component is NaN"));
        }
        let Some(data) = self.view_holder_mut(holder) else {
            return Err(CommandError::InvalidArgument("not a ViewHolder"));
        };
        if data.properties == properties {
            return Ok(());
        }
        let focus_changed = data.properties.focus_change != properties.focus_change;
        data.properties = properties;
        let view = data.view;
        self.set_clip_planes_from_bbox(holder, &properties.inset_bounding_box())?;

        let Some(view) = view else {
            return Ok(());
        };
        if focus_changed && let Some(view_data) = self.view(view) {
            let koid = view_data.view_ref.koid();
            let session = self.session_of(view);
            self.push_view_tree_update(
                session,
                ViewTreeUpdate::SetMayReceiveFocus {
                    koid,
                    may_receive_focus: properties.focus_change,
                },
            );
        }
        self.emit(view, |view_id| SessionEvent::ViewPropertiesChanged {
            view_id,
            properties,
        });
        let annotations = self
            .view(view)
            .map(|v| v.annotation_holders.clone())
            .unwrap_or_default();
        for annotation in annotations {
            self.set_view_properties(annotation, properties)?;
        }
        Ok(())
    }

    /// Reports that `view` has rendered. Fires the holder's armed watch once.
    pub(crate) fn signal_view_rendered(&mut self, view: Handle) -> bool {
        let Some(holder) = self.view(view).and_then(|v| v.holder) else {
            return false;
        };
        let Some(data) = self.view_holder_mut(holder) else {
            return false;
        };
        if data.render_watch != Some(RenderWatch::Armed) {
            return false;
        }
        data.render_watch = Some(RenderWatch::Reported);
        self.emit(holder, |view_holder_id| SessionEvent::ViewStateChanged {
            view_holder_id,
            is_rendering: true,
        });
        true
    }

    pub(crate) fn set_view_debug_bounds(&mut self, view: Handle, enabled: bool) -> bool {
        match self.view_mut(view) {
            Some(data) => {
                data.debug_bounds = enabled;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_view_holder_bounds_color(&mut self, holder: Handle, color: Rgba8) -> bool {
        match self.view_holder_mut(holder) {
            Some(data) => {
                data.bounds_color = color;
                true
            }
            None => false,
        }
    }

    /// The view-tree identity `holder` hangs under within its own session:
    /// the nearest same-session ancestor that is a Scene or a View anchor.
    pub(crate) fn local_root_koid(&self, holder: Handle) -> Option<Koid> {
        let session = self.session_of(holder);
        let mut p = self.parent[holder.idx as usize];
        while p != INVALID {
            let entry = self.entry_at(p)?;
            if entry.session != session {
                return None;
            }
            if let Body::Node(node) = &entry.body {
                match &node.kind {
                    NodeKind::Scene(scene) => return Some(scene.view_ref.koid()),
                    NodeKind::ViewNode { view } => {
                        return self.view(*view).map(|v| v.view_ref.koid());
                    }
                    _ => {}
                }
            }
            p = self.parent[p as usize];
        }
        None
    }
}
