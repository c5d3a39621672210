// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic variables bound to node transform properties.

use alloc::vec::Vec;

use crate::geometry::{Quaternion, Vec3};
use crate::node::TransformProperty;

use super::id::Handle;

/// The value held by a [`Variable`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VariableValue {
    /// A scalar.
    Float(f32),
    /// A 3-vector (translation, scale, anchor).
    Vector3(Vec3),
    /// A rotation.
    Quaternion(Quaternion),
}

impl VariableValue {
    /// Returns `true` if the two values have the same variant.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Returns `true` if any component is NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        match self {
            Self::Float(v) => v.is_nan(),
            Self::Vector3(v) => v.is_nan(),
            Self::Quaternion(q) => q.is_nan(),
        }
    }
}

/// A variable and the node properties that follow it.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// Current value. Its variant never changes after creation.
    pub value: VariableValue,
    /// Nodes whose properties track this variable (non-owning; each bound node
    /// owns a reference to the variable instead).
    pub bindings: Vec<(Handle, TransformProperty)>,
}

impl Variable {
    /// An unbound variable.
    #[must_use]
    pub fn new(value: VariableValue) -> Self {
        Self {
            value,
            bindings: Vec::new(),
        }
    }
}
