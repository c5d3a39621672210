// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-session log of view-tree changes.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::koid::Koid;
use crate::resource::{Handle, ResourceStore, SessionId};

use super::ViewTreeUpdate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TrackedHolder {
    holder: Handle,
    connected_to: Option<Koid>,
}

/// Accumulates one session's view-tree updates between merges.
///
/// Tracked `ViewHolder`s enter the tree as parentless attach entries. Their
/// connection to a local root (the nearest same-session Scene or View
/// anchor) is recomputed by
/// [`update_view_holder_connections`](Self::update_view_holder_connections)
/// once per cycle, so transient reparenting within a cycle never reaches the
/// global tree.
#[derive(Debug)]
pub struct ViewTreeUpdater {
    session: SessionId,
    tracked: BTreeMap<Koid, TrackedHolder>,
    updates: Vec<ViewTreeUpdate>,
}

impl ViewTreeUpdater {
    /// Creates an empty updater for `session`.
    #[must_use]
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            tracked: BTreeMap::new(),
            updates: Vec::new(),
        }
    }

    /// The owning session.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Number of tracked `ViewHolder`s.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// Updates not yet staged.
    #[must_use]
    pub fn pending(&self) -> &[ViewTreeUpdate] {
        &self.updates
    }

    /// Starts tracking a `ViewHolder` as an attach entry.
    pub fn track_view_holder(&mut self, koid: Koid, holder: Handle) {
        self.tracked.insert(
            koid,
            TrackedHolder {
                holder,
                connected_to: None,
            },
        );
        self.updates.push(ViewTreeUpdate::NewAttachNode { koid });
    }

    /// Stops tracking a `ViewHolder` and removes its entry.
    pub fn untrack_view_holder(&mut self, koid: Koid) {
        self.tracked.remove(&koid);
        self.updates.push(ViewTreeUpdate::DeleteNode { koid });
    }

    /// Records an update verbatim.
    pub fn add_update(&mut self, update: ViewTreeUpdate) {
        self.updates.push(update);
    }

    /// Recomputes the local root of every tracked `ViewHolder` and records a
    /// disconnect and/or connect for each one whose root changed.
    pub fn update_view_holder_connections(&mut self, store: &ResourceStore) {
        for (&koid, tracked) in &mut self.tracked {
            let root = if store.is_alive(tracked.holder) {
                store.local_root_koid(tracked.holder)
            } else {
                None
            };
            if root == tracked.connected_to {
                continue;
            }
            if tracked.connected_to.is_some() {
                self.updates
                    .push(ViewTreeUpdate::DisconnectFromParent { child: koid });
            }
            if let Some(parent) = root {
                self.updates
                    .push(ViewTreeUpdate::ConnectToParent { child: koid, parent });
            }
            tracked.connected_to = root;
        }
    }

    /// Hands over the accumulated log, leaving the updater empty.
    pub fn stage_updates(&mut self) -> Vec<ViewTreeUpdate> {
        core::mem::take(&mut self.updates)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;

    use super::*;
    use crate::koid::ViewRef;
    use crate::node::{Node, NodeKind, SceneData};
    use crate::resource::{Body, Rgba8};

    const S: SessionId = SessionId(1);

    #[test]
    fn connection_transitions_are_logged_once() {
        let mut store = ResourceStore::new();
        let scene_ref = ViewRef::new();
        let scene_koid = scene_ref.koid();
        let scene = store.insert(
            S,
            1,
            Body::Node(Node::new(NodeKind::Scene(SceneData {
                view_ref: scene_ref,
                lights: Vec::new(),
            }))),
        );
        let holder = store.create_view_holder(S, 2, String::new(), Rgba8::WHITE);
        let holder_koid = store.view_holder(holder).unwrap().koid();

        let mut updater = ViewTreeUpdater::new(S);
        updater.track_view_holder(holder_koid, holder);
        updater.update_view_holder_connections(&store);
        assert_eq!(
            updater.stage_updates(),
            vec![ViewTreeUpdate::NewAttachNode { koid: holder_koid }]
        );

        store.add_child(scene, holder).unwrap();
        updater.update_view_holder_connections(&store);
        updater.update_view_holder_connections(&store);
        assert_eq!(
            updater.stage_updates(),
            vec![ViewTreeUpdate::ConnectToParent {
                child: holder_koid,
                parent: scene_koid,
            }]
        );

        store.detach(holder);
        updater.update_view_holder_connections(&store);
        assert_eq!(
            updater.stage_updates(),
            vec![ViewTreeUpdate::DisconnectFromParent { child: holder_koid }]
        );

        updater.untrack_view_holder(holder_koid);
        assert_eq!(updater.tracked_len(), 0);
        assert_eq!(
            updater.stage_updates(),
            vec![ViewTreeUpdate::DeleteNode { koid: holder_koid }]
        );
    }
}
