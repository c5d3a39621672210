// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Client sessions and the events they receive.

use alloc::string::String;
use alloc::vec::Vec;

use tracing::warn;

use crate::geometry::Vec3;
use crate::koid::Koid;
use crate::resource::{ResourceId, ResourceTable, SessionId};
use crate::view::ViewProperties;
use crate::view_tree::ViewTreeUpdater;

/// Event-mask bit requesting [`SessionEvent::Metrics`].
pub const METRICS_EVENT_MASK: u32 = 1 << 0;

/// An event delivered to a session.
///
/// Resource ids are the receiving session's ids. Resources created
/// internally (View anchors, annotation `ViewHolder`s) have id `0`.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A `ViewHolder`'s link resolved.
    ViewConnected {
        /// The `ViewHolder`.
        view_holder_id: ResourceId,
    },
    /// A `ViewHolder`'s View went away.
    ViewDisconnected {
        /// The `ViewHolder`.
        view_holder_id: ResourceId,
    },
    /// A View's link resolved.
    ViewHolderConnected {
        /// The View.
        view_id: ResourceId,
    },
    /// A View's `ViewHolder` went away.
    ViewHolderDisconnected {
        /// The View.
        view_id: ResourceId,
    },
    /// A View's anchor entered a Scene.
    ViewAttachedToScene {
        /// The View.
        view_id: ResourceId,
        /// Its holder's current layout.
        properties: ViewProperties,
    },
    /// A View's anchor left its Scene.
    ViewDetachedFromScene {
        /// The View.
        view_id: ResourceId,
    },
    /// A View's holder changed its layout.
    ViewPropertiesChanged {
        /// The View.
        view_id: ResourceId,
        /// The new layout.
        properties: ViewProperties,
    },
    /// A linked View started or stopped rendering.
    ViewStateChanged {
        /// The `ViewHolder`.
        view_holder_id: ResourceId,
        /// Whether the View is rendering.
        is_rendering: bool,
    },
    /// A subscribed node's world scale.
    Metrics {
        /// The node.
        node_id: ResourceId,
        /// Scale along each world axis.
        scale: Vec3,
    },
    /// A View or Scene gained or lost focus.
    Focus {
        /// Identity of the View or Scene.
        view_ref: Koid,
        /// `true` when gaining focus.
        focused: bool,
    },
}

/// One client's state: its resource table, staged view-tree updates, and
/// outgoing events and errors.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    pub(crate) resources: ResourceTable,
    pub(crate) view_tree: ViewTreeUpdater,
    events: Vec<SessionEvent>,
    errors: Vec<String>,
}

impl Session {
    pub(crate) fn new(id: SessionId, max_resources: usize) -> Self {
        Self {
            id,
            resources: ResourceTable::new(max_resources),
            view_tree: ViewTreeUpdater::new(id),
            events: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// This session's id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session's resource table.
    #[must_use]
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Events not yet taken.
    #[must_use]
    pub fn pending_events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub(crate) fn push_event(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<SessionEvent> {
        core::mem::take(&mut self.events)
    }

    /// Records a diagnostic on the session's error channel.
    pub(crate) fn report_error(&mut self, message: String) {
        warn!(session = %self.id, "{message}");
        self.errors.push(message);
    }

    pub(crate) fn take_errors(&mut self) -> Vec<String> {
        core::mem::take(&mut self.errors)
    }
}
