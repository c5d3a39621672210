// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The canonical view tree.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use tracing::{debug, warn};

use crate::koid::Koid;
use crate::resource::SessionId;

/// One structural change to the view tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewTreeUpdate {
    /// Adds a ref entry for a View or Scene.
    NewRefNode {
        /// Identity of the View or Scene.
        koid: Koid,
        /// Owning session.
        session: SessionId,
        /// Whether the entry accepts focus.
        may_receive_focus: bool,
    },
    /// Adds an attach entry for a `ViewHolder`.
    NewAttachNode {
        /// Identity of the `ViewHolder`.
        koid: Koid,
    },
    /// Removes an entry. Its children become orphans.
    DeleteNode {
        /// The entry to remove.
        koid: Koid,
    },
    /// Changes whether a ref entry accepts focus.
    SetMayReceiveFocus {
        /// The View or Scene.
        koid: Koid,
        /// Whether the entry accepts focus.
        may_receive_focus: bool,
    },
    /// Marks a ref entry as the global root.
    MakeGlobalRoot {
        /// The new root.
        koid: Koid,
    },
    /// Gives an entry a parent.
    ConnectToParent {
        /// The entry gaining a parent.
        child: Koid,
        /// Its new parent.
        parent: Koid,
    },
    /// Removes an entry from its parent.
    DisconnectFromParent {
        /// The entry losing its parent.
        child: Koid,
    },
}

/// What an entry stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewTreeEntryKind {
    /// A View or Scene.
    Ref {
        /// Owning session; focus events are routed here.
        session: SessionId,
        /// Whether the entry accepts focus.
        may_receive_focus: bool,
    },
    /// A `ViewHolder`.
    Attach,
}

/// An entry of the view tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewTreeEntry {
    /// Entry kind.
    pub kind: ViewTreeEntryKind,
    /// Parent entry, if connected.
    pub parent: Option<Koid>,
    /// Child entries in connection order.
    pub children: Vec<Koid>,
}

/// A forest of view-tree entries, one tree of which hangs from the global
/// root.
///
/// Updates are applied destructively, one at a time. An update that does
/// not fit the current state (unknown entry, duplicate creation, a cycle) is
/// logged and skipped.
#[derive(Clone, Debug, Default)]
pub struct ViewTree {
    entries: BTreeMap<Koid, ViewTreeEntry>,
    root: Option<Koid>,
}

impl ViewTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The global root.
    #[must_use]
    pub fn root(&self) -> Option<Koid> {
        self.root
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, koid: Koid) -> Option<&ViewTreeEntry> {
        self.entries.get(&koid)
    }

    /// Returns `true` if `koid` is in the tree.
    #[must_use]
    pub fn contains(&self, koid: Koid) -> bool {
        self.entries.contains_key(&koid)
    }

    /// The session owning a ref entry.
    #[must_use]
    pub fn session_of(&self, koid: Koid) -> Option<SessionId> {
        match self.entries.get(&koid)?.kind {
            ViewTreeEntryKind::Ref { session, .. } => Some(session),
            ViewTreeEntryKind::Attach => None,
        }
    }

    /// Whether a ref entry accepts focus. Attach entries never do.
    #[must_use]
    pub fn may_receive_focus(&self, koid: Koid) -> bool {
        matches!(
            self.entries.get(&koid).map(|e| e.kind),
            Some(ViewTreeEntryKind::Ref {
                may_receive_focus: true,
                ..
            })
        )
    }

    /// Applies one update. Returns `false` if the update was inconsistent
    /// with the current state and skipped.
    pub fn apply(&mut self, update: ViewTreeUpdate) -> bool {
        match update {
            ViewTreeUpdate::NewRefNode {
                koid,
                session,
                may_receive_focus,
            } => self.insert(
                koid,
                ViewTreeEntryKind::Ref {
                    session,
                    may_receive_focus,
                },
            ),
            ViewTreeUpdate::NewAttachNode { koid } => self.insert(koid, ViewTreeEntryKind::Attach),
            ViewTreeUpdate::DeleteNode { koid } => self.delete(koid),
            ViewTreeUpdate::SetMayReceiveFocus {
                koid,
                may_receive_focus: focus,
            } => match self.entries.get_mut(&koid).map(|e| &mut e.kind) {
                Some(ViewTreeEntryKind::Ref {
                    may_receive_focus, ..
                }) => {
                    *may_receive_focus = focus;
                    true
                }
                _ => {
                    warn!(%koid, "focusability applies to existing ref entries only");
                    false
                }
            },
            ViewTreeUpdate::MakeGlobalRoot { koid } => {
                if !matches!(
                    self.entries.get(&koid).map(|e| e.kind),
                    Some(ViewTreeEntryKind::Ref { .. })
                ) {
                    warn!(%koid, "global root must be an existing ref entry");
                    return false;
                }
                self.root = Some(koid);
                true
            }
            ViewTreeUpdate::ConnectToParent { child, parent } => self.connect(child, parent),
            ViewTreeUpdate::DisconnectFromParent { child } => {
                if !self.entries.contains_key(&child) {
                    warn!(%child, "disconnecting an unknown view tree entry");
                    return false;
                }
                self.disconnect(child);
                true
            }
        }
    }

    fn insert(&mut self, koid: Koid, kind: ViewTreeEntryKind) -> bool {
        if self.entries.contains_key(&koid) {
            warn!(%koid, "view tree entry already exists");
            return false;
        }
        self.entries.insert(
            koid,
            ViewTreeEntry {
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        true
    }

    fn delete(&mut self, koid: Koid) -> bool {
        if !self.entries.contains_key(&koid) {
            warn!(%koid, "deleting an unknown view tree entry");
            return false;
        }
        self.disconnect(koid);
        let Some(entry) = self.entries.remove(&koid) else {
            return false;
        };
        for child in entry.children {
            if let Some(child) = self.entries.get_mut(&child) {
                child.parent = None;
            }
        }
        if self.root == Some(koid) {
            self.root = None;
        }
        true
    }

    fn connect(&mut self, child: Koid, parent: Koid) -> bool {
        if !self.entries.contains_key(&child) || !self.entries.contains_key(&parent) {
            warn!(%child, %parent, "connecting unknown view tree entries");
            return false;
        }
        if child == parent || self.is_descendant(child, parent) {
            warn!(%child, %parent, "connection would create a cycle");
            return false;
        }
        self.disconnect(child);
        if let Some(entry) = self.entries.get_mut(&child) {
            entry.parent = Some(parent);
        }
        if let Some(entry) = self.entries.get_mut(&parent) {
            entry.children.push(child);
        }
        true
    }

    fn disconnect(&mut self, child: Koid) {
        let Some(parent) = self.entries.get_mut(&child).and_then(|e| e.parent.take()) else {
            debug!(%child, "view tree entry already has no parent");
            return;
        };
        if let Some(parent) = self.entries.get_mut(&parent) {
            parent.children.retain(|&c| c != child);
        }
    }

    /// Returns `true` if `descendant` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant(&self, ancestor: Koid, descendant: Koid) -> bool {
        let mut cursor = self.entries.get(&descendant).and_then(|e| e.parent);
        while let Some(koid) = cursor {
            if koid == ancestor {
                return true;
            }
            cursor = self.entries.get(&koid).and_then(|e| e.parent);
        }
        false
    }

    /// The nearest ancestor of `koid` that is a ref entry.
    #[must_use]
    pub fn ref_parent(&self, koid: Koid) -> Option<Koid> {
        let mut cursor = self.entries.get(&koid)?.parent;
        while let Some(current) = cursor {
            let entry = self.entries.get(&current)?;
            if matches!(entry.kind, ViewTreeEntryKind::Ref { .. }) {
                return Some(current);
            }
            cursor = entry.parent;
        }
        None
    }

    /// The ref entries from the global root down to `koid`, or `None` if
    /// `koid` is not a ref entry connected to the root.
    #[must_use]
    pub fn focus_path(&self, koid: Koid) -> Option<Vec<Koid>> {
        let root = self.root?;
        if !matches!(self.entries.get(&koid)?.kind, ViewTreeEntryKind::Ref { .. }) {
            return None;
        }
        let mut path = alloc::vec![koid];
        let mut cursor = koid;
        while cursor != root {
            cursor = self.ref_parent(cursor)?;
            path.push(cursor);
        }
        path.reverse();
        Some(path)
    }

    /// The longest prefix of `chain` that is still a valid focus chain.
    ///
    /// A valid chain starts at the global root, each entry is the ref parent
    /// of the next, and its last entry accepts focus unless it is the root.
    /// Entries in the middle of the chain may refuse focus themselves.
    #[must_use]
    pub fn valid_prefix_len(&self, chain: &[Koid]) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut len = 0;
        for (i, &koid) in chain.iter().enumerate() {
            let connected = if i == 0 {
                koid == root
            } else {
                self.ref_parent(koid) == Some(chain[i - 1])
            };
            if !connected {
                break;
            }
            len += 1;
        }
        while len > 1 && !self.may_receive_focus(chain[len - 1]) {
            len -= 1;
        }
        len
    }

    /// Checks the parent/child links for mutual consistency.
    #[must_use]
    pub fn is_state_valid(&self) -> bool {
        self.entries.iter().all(|(&koid, entry)| {
            let parent_ok = entry.parent.is_none_or(|p| {
                self.entries
                    .get(&p)
                    .is_some_and(|parent| parent.children.contains(&koid))
            });
            let children_ok = entry
                .children
                .iter()
                .all(|c| self.entries.get(c).is_some_and(|child| child.parent == Some(koid)));
            parent_ok && children_ok
        }) && self.root.is_none_or(|r| self.entries.contains_key(&r))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    const S: SessionId = SessionId(1);

    fn new_ref(tree: &mut ViewTree, focus: bool) -> Koid {
        let koid = Koid::new();
        assert!(tree.apply(ViewTreeUpdate::NewRefNode {
            koid,
            session: S,
            may_receive_focus: focus,
        }));
        koid
    }

    fn new_attach(tree: &mut ViewTree) -> Koid {
        let koid = Koid::new();
        assert!(tree.apply(ViewTreeUpdate::NewAttachNode { koid }));
        koid
    }

    fn connect(tree: &mut ViewTree, child: Koid, parent: Koid) {
        assert!(tree.apply(ViewTreeUpdate::ConnectToParent { child, parent }));
    }

    #[test]
    fn focus_path_skips_attach_entries() {
        let mut tree = ViewTree::new();
        let scene = new_ref(&mut tree, true);
        let holder = new_attach(&mut tree);
        let view = new_ref(&mut tree, true);
        connect(&mut tree, holder, scene);
        connect(&mut tree, view, holder);

        assert_eq!(tree.focus_path(view), None, "no root yet");
        assert!(tree.apply(ViewTreeUpdate::MakeGlobalRoot { koid: scene }));
        assert_eq!(tree.focus_path(view), Some(vec![scene, view]));
        assert_eq!(tree.focus_path(holder), None);
        assert!(tree.is_descendant(scene, view));
        assert!(tree.is_state_valid());
    }

    #[test]
    fn delete_orphans_children() {
        let mut tree = ViewTree::new();
        let scene = new_ref(&mut tree, true);
        let holder = new_attach(&mut tree);
        let view = new_ref(&mut tree, true);
        connect(&mut tree, holder, scene);
        connect(&mut tree, view, holder);
        tree.apply(ViewTreeUpdate::MakeGlobalRoot { koid: scene });

        assert!(tree.apply(ViewTreeUpdate::DeleteNode { koid: holder }));
        assert_eq!(tree.get(view).unwrap().parent, None);
        assert!(tree.get(scene).unwrap().children.is_empty());
        assert_eq!(tree.focus_path(view), None);
        assert!(tree.is_state_valid());

        assert!(tree.apply(ViewTreeUpdate::DeleteNode { koid: scene }));
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn inconsistent_updates_are_skipped() {
        let mut tree = ViewTree::new();
        let a = new_ref(&mut tree, true);
        let b = new_attach(&mut tree);
        assert!(!tree.apply(ViewTreeUpdate::NewAttachNode { koid: b }));
        assert!(!tree.apply(ViewTreeUpdate::DeleteNode { koid: Koid::new() }));
        assert!(!tree.apply(ViewTreeUpdate::MakeGlobalRoot { koid: b }));
        connect(&mut tree, b, a);
        assert!(!tree.apply(ViewTreeUpdate::ConnectToParent { child: a, parent: b }));
        assert!(tree.is_state_valid());
    }

    #[test]
    fn valid_prefix_ends_at_a_focusable_entry() {
        let mut tree = ViewTree::new();
        let scene = new_ref(&mut tree, true);
        let holder = new_attach(&mut tree);
        let view = new_ref(&mut tree, false);
        connect(&mut tree, holder, scene);
        connect(&mut tree, view, holder);
        tree.apply(ViewTreeUpdate::MakeGlobalRoot { koid: scene });

        assert_eq!(tree.valid_prefix_len(&[scene, view]), 1);
        assert_eq!(tree.valid_prefix_len(&[view]), 0);
    }

    #[test]
    fn focusability_can_change_on_ref_entries_only() {
        let mut tree = ViewTree::new();
        let view = new_ref(&mut tree, true);
        let holder = new_attach(&mut tree);
        assert!(tree.apply(ViewTreeUpdate::SetMayReceiveFocus {
            koid: view,
            may_receive_focus: false,
        }));
        assert!(!tree.may_receive_focus(view));
        assert!(!tree.apply(ViewTreeUpdate::SetMayReceiveFocus {
            koid: holder,
            may_receive_focus: true,
        }));
        assert!(!tree.may_receive_focus(holder));
    }

    #[test]
    fn valid_prefix_passes_through_unfocusable_entries() {
        let mut tree = ViewTree::new();
        let scene = new_ref(&mut tree, true);
        let outer_holder = new_attach(&mut tree);
        let outer = new_ref(&mut tree, false);
        let inner_holder = new_attach(&mut tree);
        let inner = new_ref(&mut tree, true);
        connect(&mut tree, outer_holder, scene);
        connect(&mut tree, outer, outer_holder);
        connect(&mut tree, inner_holder, outer);
        connect(&mut tree, inner, inner_holder);
        tree.apply(ViewTreeUpdate::MakeGlobalRoot { koid: scene });

        let chain = tree.focus_path(inner).unwrap();
        assert_eq!(chain, [scene, outer, inner]);
        assert_eq!(tree.valid_prefix_len(&chain), 3);

        assert!(tree.apply(ViewTreeUpdate::DeleteNode { koid: inner }));
        assert_eq!(tree.valid_prefix_len(&chain), 1, "falls back past `outer`");
    }
}
