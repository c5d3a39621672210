// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node ray intersection.

use kurbo::Point;

use crate::geometry::{Interval, Ray3};
use crate::resource::{Handle, ResourceStore};

use super::NodeKind;

/// The result of intersecting a ray with one node's own content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Whether the node's content was hit.
    pub did_hit: bool,
    /// Whether the hit tester should descend into the node's children.
    pub continue_with_children: bool,
    /// Ray parameter of the hit. Meaningless unless `did_hit`.
    pub distance: f64,
    /// The ray interval children must be hit within.
    pub interval: Interval,
}

impl Intersection {
    /// No hit here; children see `interval` unchanged.
    #[must_use]
    pub fn pass_through(interval: Interval) -> Self {
        Self {
            did_hit: false,
            continue_with_children: true,
            distance: f64::INFINITY,
            interval,
        }
    }
}

impl ResourceStore {
    /// Intersects `ray` (in the local space of `node`) with the node's own
    /// content, within `parent_interval`.
    ///
    /// Container nodes have no content of their own and pass the interval
    /// through. A `ShapeNode` tests its shape, which lies in the local `z = 0`
    /// plane, and has no children to continue into.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn get_intersection(
        &self,
        node: Handle,
        ray: &Ray3,
        parent_interval: Interval,
    ) -> Intersection {
        let Some(n) = self.node(node) else {
            return Intersection::pass_through(parent_interval);
        };
        let NodeKind::Shape(shape_node) = &n.kind else {
            return Intersection::pass_through(parent_interval);
        };
        let miss = Intersection {
            did_hit: false,
            continue_with_children: false,
            distance: f64::INFINITY,
            interval: parent_interval,
        };
        let Some(shape) = shape_node.shape.and_then(|s| self.shape(s)) else {
            return miss;
        };
        if ray.direction.z == 0.0 {
            return miss;
        }
        let t = -ray.origin.z / ray.direction.z;
        if !parent_interval.contains(t) {
            return miss;
        }
        let p = ray.at(t);
        if !shape.geometry().contains(Point::new(p.x, p.y)) {
            return miss;
        }
        Intersection {
            did_hit: true,
            continue_with_children: false,
            distance: t,
            interval: parent_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::node::{Node, ShapeNodeData};
    use crate::resource::{Body, SessionId, Shape};

    const S: SessionId = SessionId(1);

    fn down_ray(x: f64, y: f64) -> Ray3 {
        Ray3::new(Vec3::new(x, y, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn containers_pass_the_interval_through() {
        let mut store = ResourceStore::new();
        let n = store.insert(S, 0, Body::Node(Node::new(NodeKind::Entity)));
        let interval = Interval::new(1.0, 2.0).unwrap();
        let hit = store.get_intersection(n, &down_ray(0.0, 0.0), interval);
        assert!(!hit.did_hit);
        assert!(hit.continue_with_children);
        assert_eq!(hit.interval, interval);
    }

    #[test]
    fn shape_node_hits_inside_its_shape() {
        let mut store = ResourceStore::new();
        let shape = store.insert(
            S,
            0,
            Body::Shape(Shape::Rectangle {
                width: 4.0,
                height: 2.0,
            }),
        );
        let n = store.insert(
            S,
            0,
            Body::Node(Node::new(NodeKind::Shape(ShapeNodeData {
                shape: Some(shape),
                material: None,
            }))),
        );

        let hit = store.get_intersection(n, &down_ray(1.5, 0.5), Interval::FORWARD);
        assert!(hit.did_hit);
        assert_eq!(hit.distance, 10.0);
        assert!(!hit.continue_with_children);

        let miss = store.get_intersection(n, &down_ray(2.5, 0.0), Interval::FORWARD);
        assert!(!miss.did_hit);

        let narrowed = Interval::new(0.0, 5.0).unwrap();
        assert!(!store.get_intersection(n, &down_ray(0.0, 0.0), narrowed).did_hit);
    }
}
