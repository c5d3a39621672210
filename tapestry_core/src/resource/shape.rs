// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape resources.
//!
//! Shapes are centered at the origin of their node's coordinate space and lie
//! in the `z = 0` plane.

use kurbo::{Circle, Point, Rect, RoundedRect, RoundedRectRadii, Shape as _, Size};

use super::kind::ResourceKind;

/// A planar shape resource.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned rectangle.
    Rectangle {
        /// Extent along x.
        width: f64,
        /// Extent along y.
        height: f64,
    },
    /// Rectangle with independent corner radii.
    RoundedRectangle {
        /// Extent along x.
        width: f64,
        /// Extent along y.
        height: f64,
        /// Top-left corner radius.
        top_left_radius: f64,
        /// Top-right corner radius.
        top_right_radius: f64,
        /// Bottom-right corner radius.
        bottom_right_radius: f64,
        /// Bottom-left corner radius.
        bottom_left_radius: f64,
    },
    /// Circle.
    Circle {
        /// Radius.
        radius: f64,
    },
}

/// A shape expressed as concrete `kurbo` geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeGeometry {
    /// Rectangle geometry.
    Rect(Rect),
    /// Rounded-rectangle geometry.
    RoundedRect(RoundedRect),
    /// Circle geometry.
    Circle(Circle),
}

impl Shape {
    /// The resource kind this shape is created as.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Rectangle { .. } => ResourceKind::Rectangle,
            Self::RoundedRectangle { .. } => ResourceKind::RoundedRectangle,
            Self::Circle { .. } => ResourceKind::Circle,
        }
    }

    /// Returns `true` if every dimension is finite and strictly positive and
    /// every radius is finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let radius = |v: f64| v.is_finite() && v >= 0.0;
        match *self {
            Self::Rectangle { width, height } => positive(width) && positive(height),
            Self::RoundedRectangle {
                width,
                height,
                top_left_radius,
                top_right_radius,
                bottom_right_radius,
                bottom_left_radius,
            } => {
                positive(width)
                    && positive(height)
                    && radius(top_left_radius)
                    && radius(top_right_radius)
                    && radius(bottom_right_radius)
                    && radius(bottom_left_radius)
            }
            Self::Circle { radius: r } => positive(r),
        }
    }

    /// Concrete geometry centered at the origin.
    #[must_use]
    pub fn geometry(&self) -> ShapeGeometry {
        match *self {
            Self::Rectangle { width, height } => {
                ShapeGeometry::Rect(Rect::from_center_size(Point::ORIGIN, Size::new(width, height)))
            }
            Self::RoundedRectangle {
                width,
                height,
                top_left_radius,
                top_right_radius,
                bottom_right_radius,
                bottom_left_radius,
            } => ShapeGeometry::RoundedRect(RoundedRect::from_rect(
                Rect::from_center_size(Point::ORIGIN, Size::new(width, height)),
                RoundedRectRadii::new(
                    top_left_radius,
                    top_right_radius,
                    bottom_right_radius,
                    bottom_left_radius,
                ),
            )),
            Self::Circle { radius } => ShapeGeometry::Circle(Circle::new(Point::ORIGIN, radius)),
        }
    }
}

impl ShapeGeometry {
    /// Returns `true` if the planar point lies inside the shape.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Self::Rect(r) => r.contains(point),
            Self::RoundedRect(r) => r.contains(point),
            Self::Circle(c) => c.contains(point),
        }
    }

    /// Axis-aligned bounds.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(r) => r.rect(),
            Self::Circle(c) => c.bounding_box(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_is_centered() {
        let shape = Shape::Rectangle {
            width: 10.0,
            height: 4.0,
        };
        let bounds = shape.geometry().bounding_box();
        assert_eq!(bounds, Rect::new(-5.0, -2.0, 5.0, 2.0));
        assert!(shape.geometry().contains(Point::new(4.9, 1.9)));
        assert!(!shape.geometry().contains(Point::new(5.1, 0.0)));
    }

    #[test]
    fn rounded_corners_are_excluded() {
        let shape = Shape::RoundedRectangle {
            width: 10.0,
            height: 10.0,
            top_left_radius: 4.0,
            top_right_radius: 4.0,
            bottom_right_radius: 4.0,
            bottom_left_radius: 4.0,
        };
        let geometry = shape.geometry();
        assert!(geometry.contains(Point::ORIGIN));
        assert!(!geometry.contains(Point::new(4.9, 4.9)), "corner is rounded off");
    }

    #[test]
    fn circle_containment() {
        let geometry = Shape::Circle { radius: 2.0 }.geometry();
        assert!(geometry.contains(Point::new(1.0, 1.0)));
        assert!(!geometry.contains(Point::new(1.5, 1.5)));
    }

    #[test]
    fn validity() {
        assert!(Shape::Circle { radius: 1.0 }.is_valid());
        assert!(!Shape::Circle { radius: 0.0 }.is_valid());
        assert!(!Shape::Circle { radius: f64::NAN }.is_valid());
        assert!(
            !Shape::Rectangle {
                width: -1.0,
                height: 1.0
            }
            .is_valid()
        );
    }
}
