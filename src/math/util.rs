use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// A position on the plane together with an altitude and a heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// The planar position in m.
    pub pos: Point2d,
    /// The altitude in m. Carried along, never used for distances.
    pub z: f64,
    /// The heading in radians.
    pub heading: f64,
}

impl Pose {
    /// Creates a new pose.
    pub fn new(x: f64, y: f64, z: f64, heading: f64) -> Self {
        Self {
            pos: Point2d::new(x, y),
            z,
            heading,
        }
    }

    /// The unit vector pointing along the heading.
    pub fn direction(&self) -> Vector2d {
        Vector2d::new(self.heading.cos(), self.heading.sin())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// The Euclidean distance between two points.
#[inline(always)]
pub fn distance(p1: Point2d, p2: Point2d) -> f64 {
    (p2 - p1).magnitude()
}

/// The squared Euclidean distance between two points.
#[inline(always)]
pub fn distance_squared(p1: Point2d, p2: Point2d) -> f64 {
    (p2 - p1).magnitude2()
}

/// Projects a point onto a local coordinate system.
///
/// # Parameters
/// * `point` - The point to project
/// * `origin` - The origin of the coordinate system
/// * `x_axis` - The basis vector pointing in the positive x-axis.
/// * `y_axis` - The basis vector pointing in the positive y-axis.
pub fn project_local(
    point: Point2d,
    origin: Point2d,
    x_axis: Vector2d,
    y_axis: Vector2d,
) -> Point2d {
    let point = point - origin;
    Point2d::new(point.dot(x_axis), point.dot(y_axis))
}

/// Rotates a vector 90 degrees anti-clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}
