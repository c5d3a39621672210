// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource data model.
//!
//! A *resource* is any client-visible object: nodes, shapes, materials,
//! cameras, compositors, views. Every resource has:
//!
//! - An identity: a generational [`Handle`] into the [`ResourceStore`], plus
//!   the client-chosen [`ResourceId`] under which its session's
//!   [`ResourceTable`] knows it.
//! - A [`ResourceKind`] and the capability [`TypeFlags`] derived from it.
//! - A reference count. The session table, a parent's child list, and
//!   cross-references such as a `ShapeNode`'s material each own one reference.
//!   The resource is destroyed when the last one is released, which in turn
//!   releases the references it owns (a pure reference-count cascade).
//!
//! Back-references (a node's parent and containing scene, a `ViewHolder`'s
//! View) never own.

mod body;
mod camera;
mod compositor;
mod id;
mod kind;
mod material;
mod shape;
mod store;
mod table;
mod variable;

pub use body::Body;
pub use camera::{Camera, Light, LightKind, Renderer, ShadowTechnique};
pub use compositor::{ColorConversion, Compositor, Layer, LayerStack};
pub use id::{Handle, INVALID, ResourceId, SessionId};
pub use kind::{ResourceKind, TypeFlags};
pub use material::{Image, Material, Memory, Rgba8};
pub use shape::{Shape, ShapeGeometry};
pub use store::{Children, ResourceStore};
pub use table::ResourceTable;
pub use variable::{Variable, VariableValue};

pub(crate) use store::ViewTreeOp;
