// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local transform properties, variable bindings, and the memoized world
//! transform.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{CommandError, NodeError};
use crate::geometry::{Quaternion, Vec3};
use crate::resource::{Body, Handle, INVALID, ResourceStore, VariableValue};
use crate::transform::Transform3d;

use super::{Node, TransformProperty};

impl Node {
    /// The node's transform relative to its parent:
    /// `T(translation + anchor) · R(rotation) · S(scale) · T(-anchor)`.
    #[must_use]
    pub fn local_transform(&self) -> Transform3d {
        Transform3d::from_components(
            self.translation.value,
            self.scale.value,
            self.rotation.value,
            self.anchor.value,
        )
    }

    fn apply_variable_value(&mut self, property: TransformProperty, value: VariableValue) {
        match (property, value) {
            (TransformProperty::Translation, VariableValue::Vector3(v)) => {
                self.translation.value = v;
            }
            (TransformProperty::Scale, VariableValue::Vector3(v)) => self.scale.value = v,
            (TransformProperty::Anchor, VariableValue::Vector3(v)) => self.anchor.value = v,
            (TransformProperty::Rotation, VariableValue::Quaternion(q)) => {
                self.rotation.value = q;
            }
            // Bindings are type-checked when made.
            _ => {}
        }
    }

    fn set_property_variable(&mut self, property: TransformProperty, variable: Option<Handle>) {
        match property {
            TransformProperty::Translation => self.translation.variable = variable,
            TransformProperty::Scale => self.scale.variable = variable,
            TransformProperty::Rotation => self.rotation.variable = variable,
            TransformProperty::Anchor => self.anchor.variable = variable,
        }
    }
}

/// Whether a variable's value can drive `property`.
fn accepts(property: TransformProperty, value: &VariableValue) -> bool {
    match property {
        TransformProperty::Rotation => matches!(value, VariableValue::Quaternion(_)),
        TransformProperty::Translation | TransformProperty::Scale | TransformProperty::Anchor => {
            matches!(value, VariableValue::Vector3(_))
        }
    }
}

impl ResourceStore {
    /// The node's world transform, computed on first read after a change and
    /// cached until the node or an ancestor changes.
    ///
    /// Non-node resources report the identity.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn world_transform(&self, node: Handle) -> Transform3d {
        self.validate(node);
        let mut chain = Vec::new();
        let mut idx = node.idx;
        let mut world = Transform3d::IDENTITY;
        loop {
            if let Some(cached) = self.world_transform[idx as usize].get() {
                world = cached;
                break;
            }
            chain.push(idx);
            let p = self.parent[idx as usize];
            if p == INVALID {
                break;
            }
            idx = p;
        }
        for &idx in chain.iter().rev() {
            world = world * self.local_transform_at(idx);
            self.world_transform[idx as usize].set(Some(world));
        }
        world
    }

    /// Whether the world transform of `node` is currently cached.
    #[must_use]
    pub fn has_cached_world_transform(&self, node: Handle) -> bool {
        self.validate(node);
        self.world_transform[node.idx as usize].get().is_some()
    }

    fn local_transform_at(&self, idx: u32) -> Transform3d {
        match self.entry_at(idx).map(|entry| &entry.body) {
            Some(Body::Node(node)) => node.local_transform(),
            _ => Transform3d::IDENTITY,
        }
    }

    /// Drops the cached world transform of `root` and its descendants.
    ///
    /// A node is only cached if its parent is, so descent stops at the first
    /// uncached node.
    pub(crate) fn invalidate_world_transform(&self, root: u32) {
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if self.world_transform[idx as usize].take().is_none() {
                continue;
            }
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }
    }

    // -- Property setters --

    /// Sets a vector property to a literal, dropping any variable binding.
    pub(crate) fn set_vector_property(
        &mut self,
        node: Handle,
        property: TransformProperty,
        value: Vec3,
    ) -> Result<(), CommandError> {
        if property == TransformProperty::Rotation {
            return Err(CommandError::InvalidArgument("rotation needs a quaternion"));
        }
        if value.is_nan() {
            return Err(CommandError::InvalidArgument("vector component is NaN"));
        }
        self.require_node(node)?;
        self.unbind_property(node, property);
        if let Some(n) = self.node_mut(node) {
            n.apply_variable_value(property, VariableValue::Vector3(value));
        }
        self.invalidate_world_transform(node.idx);
        Ok(())
    }

    /// Sets the rotation to a literal, dropping any variable binding.
    pub(crate) fn set_rotation(
        &mut self,
        node: Handle,
        value: Quaternion,
    ) -> Result<(), CommandError> {
        if value.is_nan() {
            return Err(CommandError::InvalidArgument("quaternion component is NaN"));
        }
        self.require_node(node)?;
        self.unbind_property(node, TransformProperty::Rotation);
        if let Some(n) = self.node_mut(node) {
            n.rotation.value = value;
        }
        self.invalidate_world_transform(node.idx);
        Ok(())
    }

    /// Binds `property` of `node` to `variable`, replacing any previous
    /// literal or binding, and applies the variable's current value.
    ///
    /// The node takes a reference to the variable.
    pub(crate) fn bind_property(
        &mut self,
        node: Handle,
        property: TransformProperty,
        variable: Handle,
    ) -> Result<(), CommandError> {
        let current = self.require_node(node)?.property_variable(property);
        let value = match self.variable(variable) {
            Some(var) => var.value,
            None => return Err(CommandError::InvalidArgument("not a variable")),
        };
        if !accepts(property, &value) {
            return Err(CommandError::InvalidArgument(
                "variable type does not match the property",
            ));
        }
        if current == Some(variable) {
            return Ok(());
        }

        self.retain(variable);
        self.unbind_property(node, property);
        if let Some(n) = self.node_mut(node) {
            n.set_property_variable(property, Some(variable));
            n.apply_variable_value(property, value);
        }
        if let Body::Variable(var) = self.body_mut(variable) {
            var.bindings.push((node, property));
        }
        self.invalidate_world_transform(node.idx);
        Ok(())
    }

    /// Sets a variable and re-applies it to every bound property.
    pub(crate) fn set_variable_value(
        &mut self,
        variable: Handle,
        value: VariableValue,
    ) -> Result<(), CommandError> {
        let bindings = match self.body_mut(variable) {
            Body::Variable(var) => {
                if !var.value.same_type(&value) {
                    return Err(CommandError::InvalidArgument(
                        "a variable's value type cannot change",
                    ));
                }
                if value.is_nan() {
                    return Err(CommandError::InvalidArgument("variable value is NaN"));
                }
                var.value = value;
                var.bindings.clone()
            }
            _ => return Err(CommandError::InvalidArgument("not a variable")),
        };
        for (node, property) in bindings {
            if let Some(n) = self.node_mut(node) {
                n.apply_variable_value(property, value);
            }
            self.invalidate_world_transform(node.idx);
        }
        Ok(())
    }

    /// Drops the binding of one property, releasing the node's reference to
    /// the variable.
    fn unbind_property(&mut self, node: Handle, property: TransformProperty) {
        let Some(variable) = self
            .node_mut(node)
            .and_then(|n| {
                let previous = n.property_variable(property);
                n.set_property_variable(property, None);
                previous
            })
        else {
            return;
        };
        self.remove_binding(variable, node, Some(property));
        self.release(variable);
    }

    /// Removes `node` from the binding lists of every variable it follows.
    ///
    /// The node's references to those variables are left for the caller;
    /// destruction releases them with the rest of the node's owned
    /// references.
    pub(crate) fn unbind_all_variables(&mut self, node: Handle) {
        let variables: Vec<Handle> = match self.node(node) {
            Some(n) => n.bound_variables().collect(),
            None => return,
        };
        for variable in variables {
            self.remove_binding(variable, node, None);
        }
    }

    fn remove_binding(
        &mut self,
        variable: Handle,
        node: Handle,
        property: Option<TransformProperty>,
    ) {
        if !self.is_alive(variable) {
            return;
        }
        if let Body::Variable(var) = self.body_mut(variable) {
            var.bindings
                .retain(|&(n, p)| n != node || property.is_some_and(|prop| prop != p));
        }
    }

    fn require_node(&self, node: Handle) -> Result<&Node, NodeError> {
        self.node(node)
            .ok_or_else(|| NodeError::NotANode(self.kind(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::resource::{SessionId, Variable};

    const S: SessionId = SessionId(1);

    fn entity(store: &mut ResourceStore) -> Handle {
        store.insert(S, 0, Body::Node(Node::new(NodeKind::Entity)))
    }

    fn vector_variable(store: &mut ResourceStore, v: Vec3) -> Handle {
        store.insert(
            S,
            0,
            Body::Variable(Variable::new(VariableValue::Vector3(v))),
        )
    }

    #[test]
    fn world_transform_composes_ancestors() {
        let mut store = ResourceStore::new();
        let parent = entity(&mut store);
        let child = entity(&mut store);
        store.add_child(parent, child).unwrap();
        store
            .set_vector_property(parent, TransformProperty::Translation, Vec3::new(10.0, 0.0, 0.0))
            .unwrap();
        store
            .set_vector_property(child, TransformProperty::Translation, Vec3::new(0.0, 5.0, 0.0))
            .unwrap();

        let p = store.world_transform(child).transform_point(Vec3::ZERO);
        assert_eq!(p, Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn parent_change_invalidates_descendants() {
        let mut store = ResourceStore::new();
        let parent = entity(&mut store);
        let child = entity(&mut store);
        let grandchild = entity(&mut store);
        store.add_child(parent, child).unwrap();
        store.add_child(child, grandchild).unwrap();

        let _ = store.world_transform(grandchild);
        assert!(store.has_cached_world_transform(grandchild));
        assert!(store.has_cached_world_transform(parent));

        store
            .set_vector_property(parent, TransformProperty::Scale, Vec3::new(2.0, 2.0, 2.0))
            .unwrap();
        assert!(!store.has_cached_world_transform(parent));
        assert!(!store.has_cached_world_transform(grandchild));

        let p = store.world_transform(grandchild).transform_point(Vec3::ONE);
        assert_eq!(p, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn detach_invalidates_world_transform() {
        let mut store = ResourceStore::new();
        let parent = entity(&mut store);
        let child = entity(&mut store);
        store
            .set_vector_property(parent, TransformProperty::Translation, Vec3::new(1.0, 1.0, 1.0))
            .unwrap();
        store.add_child(parent, child).unwrap();
        assert_eq!(
            store.world_transform(child).transform_point(Vec3::ZERO),
            Vec3::ONE
        );
        store.detach(child);
        assert!(!store.has_cached_world_transform(child));
        assert_eq!(
            store.world_transform(child).transform_point(Vec3::ZERO),
            Vec3::ZERO
        );
    }

    #[test]
    fn variable_binding_follows_updates() {
        let mut store = ResourceStore::new();
        let node = entity(&mut store);
        let var = vector_variable(&mut store, Vec3::new(1.0, 2.0, 3.0));

        store
            .bind_property(node, TransformProperty::Translation, var)
            .unwrap();
        assert_eq!(store.ref_count(var), 2);
        assert_eq!(
            store.node(node).unwrap().translation().value,
            Vec3::new(1.0, 2.0, 3.0)
        );

        store
            .set_variable_value(var, VariableValue::Vector3(Vec3::new(4.0, 5.0, 6.0)))
            .unwrap();
        assert_eq!(
            store.world_transform(node).transform_point(Vec3::ZERO),
            Vec3::new(4.0, 5.0, 6.0)
        );
    }

    #[test]
    fn literal_replaces_binding() {
        let mut store = ResourceStore::new();
        let node = entity(&mut store);
        let var = vector_variable(&mut store, Vec3::ONE);
        store
            .bind_property(node, TransformProperty::Scale, var)
            .unwrap();
        store
            .set_vector_property(node, TransformProperty::Scale, Vec3::new(3.0, 3.0, 3.0))
            .unwrap();

        assert_eq!(store.ref_count(var), 1);
        assert!(store.variable(var).unwrap().bindings.is_empty());
        store
            .set_variable_value(var, VariableValue::Vector3(Vec3::new(9.0, 9.0, 9.0)))
            .unwrap();
        assert_eq!(
            store.node(node).unwrap().scale().value,
            Vec3::new(3.0, 3.0, 3.0)
        );
    }

    #[test]
    fn mismatched_variable_type_is_rejected() {
        let mut store = ResourceStore::new();
        let node = entity(&mut store);
        let var = vector_variable(&mut store, Vec3::ONE);
        assert!(matches!(
            store.bind_property(node, TransformProperty::Rotation, var),
            Err(CommandError::InvalidArgument(_))
        ));
        assert_eq!(
            store.set_variable_value(var, VariableValue::Float(1.0)),
            Err(CommandError::InvalidArgument(
                "a variable's value type cannot change"
            ))
        );
    }

    #[test]
    fn destroying_a_bound_node_releases_the_variable() {
        let mut store = ResourceStore::new();
        let node = entity(&mut store);
        let var = vector_variable(&mut store, Vec3::ONE);
        store
            .bind_property(node, TransformProperty::Anchor, var)
            .unwrap();
        store.release(node);
        assert_eq!(store.ref_count(var), 1);
        assert!(store.variable(var).unwrap().bindings.is_empty());
    }

    #[test]
    fn nan_literals_are_rejected() {
        let mut store = ResourceStore::new();
        let node = entity(&mut store);
        assert!(
            store
                .set_vector_property(
                    node,
                    TransformProperty::Translation,
                    Vec3::new(f64::NAN, 0.0, 0.0)
                )
                .is_err()
        );
        assert!(
            store
                .set_rotation(node, Quaternion::new(f64::NAN, 0.0, 0.0, 1.0))
                .is_err()
        );
    }
}
