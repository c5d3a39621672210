// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-graph kernel for a multi-client compositor.
//!
//! `tapestry_core` keeps the retained scene graph that many client sessions
//! build together. It is `no_std` compatible (with `alloc`) and stores every
//! resource in one struct-of-arrays [`ResourceStore`](resource::ResourceStore)
//! addressed by generational handles.
//!
//! # Architecture
//!
//! ```text
//!   Session commands
//!       │
//!       ▼
//!   GfxCommandApplier ──► ResourceStore (resources, node tree, links)
//!                               │ outbox
//!                               ▼
//!   Engine::route_outbox ──► session events + ViewTreeUpdater
//!                                        │ staged updates
//!                                        ▼
//!   Engine::update ──► SceneGraph (ViewTree ──► focus chain)
//! ```
//!
//! **[`resource`]**: The resource store, session resource tables, reference
//! counting, and the closed set of resource kinds.
//!
//! **[`node`]**: Parent/child topology, transforms with variable bindings,
//! clip planes, and per-node ray intersection.
//!
//! **[`view`]** and **[`linker`]**: Cross-session embedding. A `ViewHolder` in
//! one session and a View in another are paired through an
//! [`ObjectLinker`](linker::ObjectLinker) keyed by token identity.
//!
//! **[`view_tree`]**: The global tree of Views, Scenes, and `ViewHolder`s,
//! assembled from per-session updates, and the focus chain derived from it.
//!
//! **[`command`]** and **[`applier`]**: The session command set and its
//! translation into store mutations.
//!
//! **[`visitor`]**: Double dispatch over resource kinds for traversals.
//!
//! **[`engine`]**: Ties the above together into the per-cycle update loop.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! update-cycle instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod applier;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod koid;
pub mod linker;
pub mod node;
pub mod resource;
pub mod session;
pub mod trace;
pub mod transform;
pub mod view;
pub mod view_tree;
pub mod visitor;
