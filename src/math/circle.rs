use super::{distance, Point2d};

/// Returned by [calc_circle_radius] when the three points are collinear.
pub const UNDEFINED_RADIUS: f64 = -1.0;

const EPSILON: f64 = 1e-9;

/// Computes the radius of the circle passing through three points,
/// from the intersection of the perpendicular bisectors of the two chords.
///
/// Returns [UNDEFINED_RADIUS] if the chord slopes are equal.
pub fn calc_circle_radius(p1: Point2d, p2: Point2d, p3: Point2d) -> f64 {
    let (dx_a, dy_a) = (p2.x - p1.x, p2.y - p1.y);
    let (dx_b, dy_b) = (p3.x - p2.x, p3.y - p2.y);

    // First chord vertical, second horizontal: the bisectors are axis aligned
    if dx_a.abs() <= EPSILON && dy_b.abs() <= EPSILON {
        let center = Point2d::new(0.5 * (p2.x + p3.x), 0.5 * (p1.y + p2.y));
        return distance(center, p1);
    }

    let a_slope = dy_a / dx_a;
    let b_slope = dy_b / dx_b;
    if (a_slope - b_slope).abs() <= EPSILON {
        return UNDEFINED_RADIUS;
    }

    let cx = (a_slope * b_slope * (p1.y - p3.y) + b_slope * (p1.x + p2.x) - a_slope * (p2.x + p3.x))
        / (2.0 * (b_slope - a_slope));
    let cy = -(cx - 0.5 * (p1.x + p2.x)) / a_slope + 0.5 * (p1.y + p2.y);

    distance(Point2d::new(cx, cy), p1)
}
