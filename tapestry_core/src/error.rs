// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Each layer of the kernel has its own error enum; [`CommandError`] is the
//! union the command applier reports on a session's error channel.

use thiserror::Error;

use crate::resource::{ResourceId, ResourceKind, TypeFlags};

/// Failures of session resource-table operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The id is already in use in this session.
    #[error("resource id {0} is already in use")]
    DuplicateId(ResourceId),
    /// No resource with this id exists in this session.
    #[error("no resource with id {0}")]
    NotFound(ResourceId),
    /// The resource exists but lacks the required capabilities.
    #[error("resource {id} is a {actual}, expected {expected:?}")]
    WrongType {
        /// The offending id.
        id: ResourceId,
        /// What the resource actually is.
        actual: ResourceKind,
        /// The capabilities that were required.
        expected: TypeFlags,
    },
    /// Id 0 never names a resource.
    #[error("resource id 0 is reserved")]
    ReservedId,
    /// The session already owns the maximum number of resources.
    #[error("session resource limit of {0} reached")]
    LimitExceeded(usize),
}

/// Attempts to break a structural invariant of the node tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The resource is not a node.
    #[error("{0} is not a node")]
    NotANode(ResourceKind),
    /// The parent kind cannot hold children.
    #[error("{0} cannot have children")]
    NotContainer(ResourceKind),
    /// A Scene is always a root.
    #[error("a Scene cannot be the child of another node")]
    SceneCannotBeChild,
    /// A `ViewHolder` only parents the anchor of its linked View.
    #[error("a ViewHolder may only hold the anchor of its linked View")]
    ViewHolderRejectsChild,
    /// A View anchor only lives under a `ViewHolder`.
    #[error("a View anchor may only be attached to a ViewHolder")]
    AnchorOutsideViewHolder,
    /// The child is an ancestor of the parent.
    #[error("adding this child would create a cycle")]
    WouldCreateCycle,
    /// The node kind does not support the requested property.
    #[error("{0} does not support this operation")]
    Unsupported(ResourceKind),
}

/// Link registration failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The other half of the token pair was dropped before this half
    /// registered.
    #[error("the peer token was already closed")]
    PeerClosed,
    /// The endpoint was already bound to an object.
    #[error("the link endpoint is already initialized")]
    AlreadyInitialized,
}

/// Everything a command handler can report.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Resource lookup or table failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Node tree invariant violation.
    #[error(transparent)]
    Node(#[from] NodeError),
    /// Link registration failure.
    #[error(transparent)]
    Link(#[from] LinkError),
    /// A field failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The command is recognized but carries no implementation.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    /// The command is kept for wire compatibility only.
    #[error("{0} is deprecated and has no effect")]
    Deprecated(&'static str),
}

/// Why a focus change request was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum FocusChangeDenied {
    /// There is no focus chain yet (no global root).
    #[error("the focus chain is empty")]
    EmptyFocusChain,
    /// The requestor is not owned by the calling session.
    #[error("the requestor is not owned by the calling session")]
    RequestorNotAuthorized,
    /// The requestor is not on the current focus chain.
    #[error("the requestor is not on the focus chain")]
    RequestorNotOnFocusChain,
    /// The requested view is not in the view tree.
    #[error("the requested view is not in the view tree")]
    RequestNotFound,
    /// The requested view is not the requestor or one of its descendants.
    #[error("the requested view is not a descendant of the requestor")]
    RequestNotDescendant,
    /// The requested view does not accept focus.
    #[error("the requested view cannot receive focus")]
    RequestCannotReceiveFocus,
}
