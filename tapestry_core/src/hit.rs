// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ray hit testing over a node subtree.
//!
//! The walk goes front to back (most recently attached child first). At each
//! node the world-space ray is pulled into the node's local space; since the
//! transforms are affine, ray parameters agree across spaces and one interval
//! can be narrowed as the walk descends:
//!
//! 1. The node's clip planes cut the interval. A fully clipped node prunes
//!    its subtree.
//! 2. [`ResourceStore::get_intersection`] tests the node's own content and
//!    decides whether to continue into its children.
//!
//! Subtrees whose root has [`HitTestBehavior::Suppress`] are skipped.

use alloc::vec::Vec;

use crate::geometry::{Interval, Ray3};
use crate::node::HitTestBehavior;
use crate::resource::{Handle, ResourceStore};

/// A node struck by a hit-test ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// The node hit.
    pub node: Handle,
    /// The node's tag value at the time of the test.
    pub tag_value: u32,
    /// Ray parameter of the hit point.
    pub distance: f64,
}

/// Collects every node under `root` hit by the world-space `ray`, nearest
/// first. Hits at equal distance keep front-to-back traversal order.
///
/// # Panics
///
/// Panics if `root` is stale.
#[must_use]
pub fn hit_test(store: &ResourceStore, root: Handle, ray: &Ray3) -> Vec<Hit> {
    let mut hits = Vec::new();
    let mut stack = Vec::new();
    stack.push((root, Interval::FORWARD));
    while let Some((node, interval)) = stack.pop() {
        let Some(n) = store.node(node) else {
            continue;
        };
        if n.hit_test_behavior() == HitTestBehavior::Suppress {
            continue;
        }
        let Some(to_local) = store.world_transform(node).inverse() else {
            continue;
        };
        let local_ray = to_local.transform_ray(ray);
        let Some(interval) = n
            .clip_planes()
            .iter()
            .try_fold(interval, |acc, plane| plane.clip_ray(&local_ray, acc))
        else {
            continue;
        };
        let result = store.get_intersection(node, &local_ray, interval);
        if result.did_hit {
            hits.push(Hit {
                node,
                tag_value: n.tag_value(),
                distance: result.distance,
            });
        }
        if result.continue_with_children {
            // Pushed oldest first, so the most recent child pops first.
            for child in store.children(node) {
                stack.push((child, result.interval));
            }
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Plane3, Vec3};
    use crate::node::{Node, NodeKind, ShapeNodeData, TransformProperty};
    use crate::resource::{Body, SessionId, Shape};

    const S: SessionId = SessionId(1);

    fn entity(store: &mut ResourceStore) -> Handle {
        store.insert(S, 0, Body::Node(Node::new(NodeKind::Entity)))
    }

    fn square(store: &mut ResourceStore, tag: u32) -> Handle {
        let shape = store.insert(
            S,
            0,
            Body::Shape(Shape::Rectangle {
                width: 10.0,
                height: 10.0,
            }),
        );
        let node = store.insert(
            S,
            0,
            Body::Node(Node::new(NodeKind::Shape(ShapeNodeData {
                shape: Some(shape),
                material: None,
            }))),
        );
        store.node_mut(node).unwrap().tag_value = tag;
        node
    }

    fn down_ray(x: f64, y: f64) -> Ray3 {
        Ray3::new(Vec3::new(x, y, 100.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn nearer_content_sorts_first() {
        let mut store = ResourceStore::new();
        let root = entity(&mut store);
        let low = square(&mut store, 1);
        let high = square(&mut store, 2);
        store.add_child(root, low).unwrap();
        store.add_child(root, high).unwrap();
        store
            .set_vector_property(high, TransformProperty::Translation, Vec3::new(0.0, 0.0, 10.0))
            .unwrap();

        let hits = hit_test(&store, root, &down_ray(0.0, 0.0));
        let tags: Vec<u32> = hits.iter().map(|h| h.tag_value).collect();
        assert_eq!(tags, [2, 1]);
        assert_eq!(hits[0].distance, 90.0);
        assert_eq!(hits[1].distance, 100.0);
    }

    #[test]
    fn ties_keep_front_to_back_order() {
        let mut store = ResourceStore::new();
        let root = entity(&mut store);
        let first = square(&mut store, 1);
        let second = square(&mut store, 2);
        store.add_child(root, first).unwrap();
        store.add_child(root, second).unwrap();

        let hits = hit_test(&store, root, &down_ray(0.0, 0.0));
        let tags: Vec<u32> = hits.iter().map(|h| h.tag_value).collect();
        assert_eq!(tags, [2, 1], "most recently attached first");
    }

    #[test]
    fn suppressed_subtree_is_skipped() {
        let mut store = ResourceStore::new();
        let root = entity(&mut store);
        let group = entity(&mut store);
        let leaf = square(&mut store, 7);
        store.add_child(root, group).unwrap();
        store.add_child(group, leaf).unwrap();
        assert_eq!(hit_test(&store, root, &down_ray(0.0, 0.0)).len(), 1);

        store.node_mut(group).unwrap().hit_test_behavior = HitTestBehavior::Suppress;
        assert!(hit_test(&store, root, &down_ray(0.0, 0.0)).is_empty());
    }

    #[test]
    fn clip_planes_prune_hits() {
        let mut store = ResourceStore::new();
        let root = entity(&mut store);
        let leaf = square(&mut store, 3);
        store.add_child(root, leaf).unwrap();
        // Keep only x >= 2.
        store
            .set_clip_planes(
                root,
                alloc::vec![Plane3::new(Vec3::new(1.0, 0.0, 0.0), 2.0)],
            )
            .unwrap();

        assert!(hit_test(&store, root, &down_ray(0.0, 0.0)).is_empty());
        assert_eq!(hit_test(&store, root, &down_ray(3.0, 0.0)).len(), 1);
    }
}
