// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Views and `ViewHolder`s.
//!
//! A View is one session's embeddable subtree: it owns an anchor node
//! (a [`NodeKind::ViewNode`](crate::node::NodeKind::ViewNode)) under which the
//! session attaches its content. A `ViewHolder` is a node in another session's
//! tree that may parent exactly one thing: the anchor of the View it is
//! linked to.
//!
//! The two sides pair up through the store's
//! [`ObjectLinker`](crate::linker::ObjectLinker) using the halves of a
//! [`token_pair`](crate::koid::token_pair). Either side may register first,
//! and either side may be destroyed first; in every order the survivor ends
//! up with no back-pointer and receives exactly one disconnected event.

mod link;

use alloc::string::String;
use alloc::vec::Vec;

use crate::geometry::{BoundingBox, Vec3};
use crate::koid::{Koid, ViewRef};
use crate::linker::{ExportLink, ImportLink};
use crate::resource::{Handle, Rgba8};

/// Layout given to a View by its holder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewProperties {
    /// The volume the View may draw into, in the holder's local space.
    pub bounding_box: BoundingBox,
    /// Inset applied to `bounding_box.min`.
    pub inset_from_min: Vec3,
    /// Inset applied to `bounding_box.max`.
    pub inset_from_max: Vec3,
    /// Whether the View may receive focus. Views nested below it are not
    /// affected.
    pub focus_change: bool,
}

impl Default for ViewProperties {
    fn default() -> Self {
        Self {
            bounding_box: BoundingBox::default(),
            inset_from_min: Vec3::default(),
            inset_from_max: Vec3::default(),
            focus_change: true,
        }
    }
}

impl ViewProperties {
    /// Returns `true` if any component is NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.bounding_box.is_nan() || self.inset_from_min.is_nan() || self.inset_from_max.is_nan()
    }

    /// The bounding box shrunk by the insets.
    #[must_use]
    pub fn inset_bounding_box(&self) -> BoundingBox {
        self.bounding_box
            .inset(self.inset_from_min, self.inset_from_max)
    }
}

/// State of a `ViewHolder`'s render-readiness watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderWatch {
    /// Waiting for the View's first rendered frame.
    Armed,
    /// The View has rendered since the watch was armed.
    Reported,
}

/// `ViewHolder` payload.
#[derive(Debug)]
pub struct ViewHolderData {
    pub(crate) koid: Koid,
    pub(crate) debug_name: String,
    pub(crate) link: Option<ExportLink>,
    pub(crate) view: Option<Handle>,
    pub(crate) properties: ViewProperties,
    pub(crate) render_watch: Option<RenderWatch>,
    pub(crate) bounds_color: Rgba8,
}

impl ViewHolderData {
    pub(crate) fn new(debug_name: String, bounds_color: Rgba8) -> Self {
        Self {
            koid: Koid::new(),
            debug_name,
            link: None,
            view: None,
            properties: ViewProperties::default(),
            render_watch: None,
            bounds_color,
        }
    }

    /// Identity of this holder's attach-point entry in the view tree.
    #[must_use]
    pub fn koid(&self) -> Koid {
        self.koid
    }

    /// Name given at creation.
    #[must_use]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Whether the holder has registered with the linker.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// The linked View, once the link has resolved.
    #[must_use]
    pub fn view(&self) -> Option<Handle> {
        self.view
    }

    /// Current layout properties.
    #[must_use]
    pub fn properties(&self) -> &ViewProperties {
        &self.properties
    }

    /// The render-readiness watch, if armed or reported.
    #[must_use]
    pub fn render_watch(&self) -> Option<RenderWatch> {
        self.render_watch
    }

    /// Color used when drawing debug bounds.
    #[must_use]
    pub fn bounds_color(&self) -> Rgba8 {
        self.bounds_color
    }
}

/// View payload.
#[derive(Debug)]
pub struct ViewData {
    pub(crate) view_ref: ViewRef,
    pub(crate) debug_name: String,
    pub(crate) link: Option<ImportLink>,
    pub(crate) anchor: Handle,
    pub(crate) holder: Option<Handle>,
    pub(crate) annotation_holders: Vec<Handle>,
    pub(crate) debug_bounds: bool,
}

impl ViewData {
    pub(crate) fn new(
        view_ref: ViewRef,
        debug_name: String,
        anchor: Handle,
        debug_bounds: bool,
    ) -> Self {
        Self {
            view_ref,
            debug_name,
            link: None,
            anchor,
            holder: None,
            annotation_holders: Vec::new(),
            debug_bounds,
        }
    }

    /// The View's identity in the view tree.
    #[must_use]
    pub fn view_ref(&self) -> &ViewRef {
        &self.view_ref
    }

    /// Name given at creation.
    #[must_use]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Whether the View has registered with the linker.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// The anchor node owned by this View.
    #[must_use]
    pub fn anchor(&self) -> Handle {
        self.anchor
    }

    /// The linked `ViewHolder`, once the link has resolved.
    #[must_use]
    pub fn holder(&self) -> Option<Handle> {
        self.holder
    }

    /// Annotation `ViewHolder`s owned by this View.
    #[must_use]
    pub fn annotation_holders(&self) -> &[Handle] {
        &self.annotation_holders
    }

    /// Whether debug bounds are drawn for this View.
    #[must_use]
    pub fn debug_bounds(&self) -> bool {
        self.debug_bounds
    }
}
