//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use angle::*;
pub use circle::{calc_circle_radius, UNDEFINED_RADIUS};
pub use curve::{equidistant_points_along_curve, LineSegment2d, ParametricCurve2d, Polyline2d, QuadraticBezier2d};
pub use transform::Transform2d;
pub use util::*;

mod angle;
mod circle;
mod curve;
mod transform;
mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;
