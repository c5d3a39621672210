// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip planes.

use alloc::vec::Vec;

use crate::error::{CommandError, NodeError};
use crate::geometry::{BoundingBox, Plane3, Vec3, is_point_inside_planes};
use crate::resource::{Handle, ResourceStore};

impl ResourceStore {
    /// Replaces the local clip planes of `node`. An empty list disables
    /// plane clipping.
    pub(crate) fn set_clip_planes(
        &mut self,
        node: Handle,
        planes: Vec<Plane3>,
    ) -> Result<(), CommandError> {
        if planes.iter().any(Plane3::is_nan) {
            return Err(CommandError::InvalidArgument("clip plane component is NaN"));
        }
        let kind = self.kind(node);
        let n = self.node_mut(node).ok_or(NodeError::NotANode(kind))?;
        n.clip_planes = planes;
        Ok(())
    }

    /// Replaces the local clip planes of `node` with the six faces of `bbox`.
    ///
    /// An empty box clips everything.
    pub(crate) fn set_clip_planes_from_bbox(
        &mut self,
        node: Handle,
        bbox: &BoundingBox,
    ) -> Result<(), CommandError> {
        self.set_clip_planes(node, bbox.planes().to_vec())
    }

    pub(crate) fn set_clip_to_self(&mut self, node: Handle, clip: bool) -> Result<(), NodeError> {
        let kind = self.kind(node);
        let n = self.node_mut(node).ok_or(NodeError::NotANode(kind))?;
        n.clip_to_self = clip;
        Ok(())
    }

    /// Whether `point`, in the local space of `node`, falls outside a clip
    /// plane of `node` or one of its ancestors.
    #[must_use]
    pub fn is_point_clipped(&self, node: Handle, point: Vec3) -> bool {
        let world = self.world_transform(node).transform_point(point);
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if let Some(n) = self.node(current)
                && !n.clip_planes.is_empty()
            {
                let Some(to_local) = self.world_transform(current).inverse() else {
                    return true;
                };
                if !is_point_inside_planes(to_local.transform_point(world), &n.clip_planes) {
                    return true;
                }
            }
            cursor = self.parent(current);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::node::{Node, NodeKind, TransformProperty};
    use crate::resource::{Body, SessionId};

    fn entity(store: &mut ResourceStore) -> Handle {
        store.insert(SessionId(1), 0, Body::Node(Node::new(NodeKind::Entity)))
    }

    #[test]
    fn empty_list_clears_planes() {
        let mut store = ResourceStore::new();
        let n = entity(&mut store);
        store
            .set_clip_planes(n, vec![Plane3::new(Vec3::new(1.0, 0.0, 0.0), 0.0)])
            .unwrap();
        assert_eq!(store.node(n).unwrap().clip_planes().len(), 1);
        store.set_clip_planes(n, Vec::new()).unwrap();
        assert_eq!(store.node(n).unwrap().clip_planes().len(), 0);
    }

    #[test]
    fn nan_planes_are_rejected() {
        let mut store = ResourceStore::new();
        let n = entity(&mut store);
        let bad = Plane3::new(Vec3::new(f64::NAN, 0.0, 0.0), 0.0);
        assert!(store.set_clip_planes(n, vec![bad]).is_err());
        assert!(store.node(n).unwrap().clip_planes().is_empty());
    }

    #[test]
    fn ancestor_planes_clip_descendants() {
        let mut store = ResourceStore::new();
        let parent = entity(&mut store);
        let child = entity(&mut store);
        store.add_child(parent, child).unwrap();
        let bbox = BoundingBox::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 0.0));
        store.set_clip_planes_from_bbox(parent, &bbox).unwrap();
        store
            .set_vector_property(child, TransformProperty::Translation, Vec3::new(8.0, 0.0, 0.0))
            .unwrap();

        assert!(!store.is_point_clipped(child, Vec3::new(1.0, 1.0, 0.0)));
        assert!(store.is_point_clipped(child, Vec3::new(3.0, 1.0, 0.0)));
    }
}
