// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The global view tree and focus chain.
//!
//! Every session records structural changes to its Views, Scenes, and
//! `ViewHolder`s as [`ViewTreeUpdate`]s in its own [`ViewTreeUpdater`]. Once per
//! update cycle the engine stages all of them into the [`SceneGraph`], which
//! replays them in order against the single [`ViewTree`] and then repairs
//! the focus chain.
//!
//! The tree has two kinds of entries. *Ref* entries stand for Views and
//! Scenes; they belong to a session and may receive focus. *Attach* entries
//! stand for `ViewHolder`s and sit between a ref entry and the ref entries of
//! the Views embedded through them. Focus chains list ref entries only.

mod scene_graph;
mod tree;
mod updater;

pub use scene_graph::{FocusChainChange, FocusChainListener, MergeOutcome, SceneGraph};
pub use tree::{ViewTree, ViewTreeEntry, ViewTreeEntryKind, ViewTreeUpdate};
pub use updater::ViewTreeUpdater;
