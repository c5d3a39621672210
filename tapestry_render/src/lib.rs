// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-plan extraction for tapestry.
//!
//! This crate turns the retained scene graph of [`tapestry_core`] into the
//! flat list a backend draws from. It defines:
//!
//! - [`RenderItem`]: one shape to draw, with everything resolved to world
//!   space.
//! - [`RenderPlan`]: the camera matrices and ordered items for one layer.
//! - [`RenderVisitor`]: the [`ResourceVisitor`](tapestry_core::visitor::ResourceVisitor)
//!   that walks a Scene and fills a plan.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod plan;
mod visitor;

pub use plan::{CameraMatrices, RenderItem, RenderPlan};
pub use visitor::{RenderVisitor, plan_layer};
