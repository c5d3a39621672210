// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, scene dumps, and JSON snapshots for tapestry
//! diagnostics.
//!
//! This crate provides development tooling on top of [`tapestry_core`]:
//!
//! - [`pretty::PrettyPrintSink`]: a [`TraceSink`](tapestry_core::trace::TraceSink)
//!   writing one line per update-cycle event.
//! - [`dump::DumpVisitor`]: an indented text rendering of a node subtree.
//! - [`audit::ProtectedMemoryVisitor`]: finds content backed by protected
//!   memory.
//! - [`snapshot::SnapshotVisitor`]: a [`serde_json::Value`] tree of a
//!   subtree, for golden tests and inspectors.

pub mod audit;
pub mod dump;
pub mod pretty;
pub mod snapshot;
