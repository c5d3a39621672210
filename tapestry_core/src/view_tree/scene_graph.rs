// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Merging staged updates and arbitrating focus.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use tracing::debug;

use crate::error::FocusChangeDenied;
use crate::koid::Koid;
use crate::resource::SessionId;

use super::{ViewTree, ViewTreeUpdate};

/// Receives every change of the focus chain.
pub trait FocusChainListener {
    /// Called with the new chain, root first. An empty chain means nothing
    /// is focused.
    fn on_focus_chain_changed(&mut self, chain: &[Koid]);
}

/// A focus chain transition, reported after listeners have been notified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusChainChange {
    /// The chain before the change.
    pub old_chain: Vec<Koid>,
    /// The chain after the change.
    pub new_chain: Vec<Koid>,
    /// Session owning the old leaf, which receives a defocus event.
    pub old_leaf_session: Option<SessionId>,
    /// Session owning the new leaf, which receives a focus event.
    pub new_leaf_session: Option<SessionId>,
}

impl FocusChainChange {
    /// The previously focused entry.
    #[must_use]
    pub fn old_leaf(&self) -> Option<Koid> {
        self.old_chain.last().copied()
    }

    /// The newly focused entry.
    #[must_use]
    pub fn new_leaf(&self) -> Option<Koid> {
        self.new_chain.last().copied()
    }
}

/// Summary of one merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Updates applied.
    pub applied: usize,
    /// Updates skipped as inconsistent.
    pub skipped: usize,
    /// Whether the global root changed.
    pub root_changed: bool,
}

/// Owns the canonical [`ViewTree`] and the focus chain.
pub struct SceneGraph {
    view_tree: ViewTree,
    staged: Vec<ViewTreeUpdate>,
    focus_chain: Vec<Koid>,
    leaf_session: Option<SessionId>,
    listeners: Vec<Box<dyn FocusChainListener>>,
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("view_tree", &self.view_tree)
            .field("staged", &self.staged.len())
            .field("focus_chain", &self.focus_chain)
            .field("leaf_session", &self.leaf_session)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view_tree: ViewTree::new(),
            staged: Vec::new(),
            focus_chain: Vec::new(),
            leaf_session: None,
            listeners: Vec::new(),
        }
    }

    /// The canonical view tree.
    #[must_use]
    pub fn view_tree(&self) -> &ViewTree {
        &self.view_tree
    }

    /// The current focus chain, root first.
    #[must_use]
    pub fn focus_chain(&self) -> &[Koid] {
        &self.focus_chain
    }

    /// Number of updates waiting for the next merge.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Registers a listener for focus chain changes.
    pub fn register_focus_chain_listener(&mut self, listener: Box<dyn FocusChainListener>) {
        self.listeners.push(listener);
    }

    /// Queues updates for the next merge.
    pub fn stage_updates(&mut self, updates: impl IntoIterator<Item = ViewTreeUpdate>) {
        self.staged.extend(updates);
    }

    /// Replays every staged update, in staging order, against the view tree.
    pub fn process_updates(&mut self) -> MergeOutcome {
        let root_before = self.view_tree.root();
        let mut outcome = MergeOutcome::default();
        for update in core::mem::take(&mut self.staged) {
            if self.view_tree.apply(update) {
                outcome.applied += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        outcome.root_changed = self.view_tree.root() != root_before;
        if outcome.applied + outcome.skipped > 0 {
            debug!(
                applied = outcome.applied,
                skipped = outcome.skipped,
                root_changed = outcome.root_changed,
                "merged view tree updates"
            );
        }
        outcome
    }

    /// Brings the focus chain back in line with the tree after a merge.
    ///
    /// A new global root resets the chain to the root alone. Otherwise the
    /// chain is cut back to its longest prefix that is still a valid chain,
    /// as defined by [`ViewTree::valid_prefix_len`]. Requests granted by
    /// [`request_focus_change`](Self::request_focus_change) always satisfy
    /// that rule.
    pub fn repair_focus_chain(&mut self, root_changed: bool) -> Option<FocusChainChange> {
        let chain = if root_changed {
            self.view_tree.root().map(|root| vec![root]).unwrap_or_default()
        } else {
            let len = self.view_tree.valid_prefix_len(&self.focus_chain);
            let mut chain = self.focus_chain.clone();
            chain.truncate(len);
            if chain.is_empty()
                && let Some(root) = self.view_tree.root()
            {
                chain.push(root);
            }
            chain
        };
        self.set_focus_chain(chain)
    }

    /// Moves focus from `requestor` to `request`.
    ///
    /// `requestor` must be on the current focus chain and `request` must be
    /// `requestor` itself or a focusable entry connected below it. On success
    /// the focus chain becomes the path from the root to `request`; the
    /// returned change is `None` when that path equals the current chain.
    pub fn request_focus_change(
        &mut self,
        requestor: Koid,
        request: Koid,
    ) -> Result<Option<FocusChainChange>, FocusChangeDenied> {
        if self.focus_chain.is_empty() {
            return Err(FocusChangeDenied::EmptyFocusChain);
        }
        if !self.focus_chain.contains(&requestor) {
            return Err(FocusChangeDenied::RequestorNotOnFocusChain);
        }
        if !self.view_tree.contains(request) {
            return Err(FocusChangeDenied::RequestNotFound);
        }
        let Some(path) = self.view_tree.focus_path(request) else {
            return Err(FocusChangeDenied::RequestNotDescendant);
        };
        if !path.contains(&requestor) {
            return Err(FocusChangeDenied::RequestNotDescendant);
        }
        if !self.view_tree.may_receive_focus(request) {
            return Err(FocusChangeDenied::RequestCannotReceiveFocus);
        }
        Ok(self.set_focus_chain(path))
    }

    fn set_focus_chain(&mut self, chain: Vec<Koid>) -> Option<FocusChainChange> {
        if chain == self.focus_chain {
            return None;
        }
        let new_leaf_session = chain
            .last()
            .and_then(|&leaf| self.view_tree.session_of(leaf));
        let old_leaf_session = self.leaf_session;
        let old_chain = core::mem::replace(&mut self.focus_chain, chain);
        self.leaf_session = new_leaf_session;
        debug!(depth = self.focus_chain.len(), "focus chain changed");
        for listener in &mut self.listeners {
            listener.on_focus_chain_changed(&self.focus_chain);
        }
        Some(FocusChainChange {
            old_chain,
            new_chain: self.focus_chain.clone(),
            old_leaf_session,
            new_leaf_session,
        })
    }
}
