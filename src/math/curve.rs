use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;
use itertools::Itertools;

/// A parametric curve in 2D space, used to describe lane centre lines.
pub trait ParametricCurve2d {
    /// The point at parameter `t`.
    fn sample(&self, t: f64) -> Point2d;

    /// The range of valid parameters.
    fn bounds(&self) -> Interval<f64>;

    /// The tangent at parameter `t`, by central difference unless overridden.
    fn sample_dt(&self, t: f64) -> Vector2d {
        let h = 0.5e-4 * self.bounds().length();
        (self.sample(t + h) - self.sample(t - h)) / (2.0 * h)
    }
}

impl<T: ParametricCurve2d + ?Sized> ParametricCurve2d for &T {
    fn sample(&self, t: f64) -> Point2d {
        (**self).sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        (**self).bounds()
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        (**self).sample_dt(t)
    }
}

/// A straight line segment.
#[derive(Clone, Copy, Debug)]
pub struct LineSegment2d {
    start: Point2d,
    end: Point2d,
}

impl LineSegment2d {
    pub const fn from_ends(start: Point2d, end: Point2d) -> Self {
        Self { start, end }
    }
}

impl ParametricCurve2d for LineSegment2d {
    fn sample(&self, t: f64) -> Point2d {
        self.start + (self.end - self.start) * t
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, 1.0)
    }

    fn sample_dt(&self, _t: f64) -> Vector2d {
        self.end - self.start
    }
}

/// A quadratic Bezier curve, e.g. for a lane turning through an intersection.
#[derive(Clone, Copy, Debug)]
pub struct QuadraticBezier2d {
    points: [Point2d; 3],
}

impl QuadraticBezier2d {
    pub const fn new(points: &[Point2d; 3]) -> Self {
        Self { points: *points }
    }

    /// The first de Casteljau step: points `t` of the way along each control leg.
    fn hull(&self, t: f64) -> (Point2d, Point2d) {
        let [p0, p1, p2] = self.points;
        (p0 + (p1 - p0) * t, p1 + (p2 - p1) * t)
    }
}

impl ParametricCurve2d for QuadraticBezier2d {
    fn sample(&self, t: f64) -> Point2d {
        let (a, b) = self.hull(t);
        a + (b - a) * t
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, 1.0)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let (a, b) = self.hull(t);
        2.0 * (b - a)
    }
}

/// A piecewise linear curve parameterised by arc length.
#[derive(Clone, Debug)]
pub struct Polyline2d {
    points: Vec<Point2d>,
    /// Cumulative arc length at each point.
    lengths: Vec<f64>,
}

impl Polyline2d {
    /// Creates a polyline through the given points.
    ///
    /// Panics if fewer than two points are given.
    pub fn new(points: Vec<Point2d>) -> Self {
        assert!(points.len() >= 2, "Polyline must contain at least two points");
        let lengths = std::iter::once(0.0)
            .chain(points.windows(2).scan(0.0, |len, w| {
                *len += (w[1] - w[0]).magnitude();
                Some(*len)
            }))
            .collect();
        Self { points, lengths }
    }

    /// The total length of the polyline in m.
    pub fn length(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Finds the segment containing arc length `t`.
    fn segment(&self, t: f64) -> usize {
        let idx = self.lengths.partition_point(|len| *len <= t);
        idx.clamp(1, self.points.len() - 1) - 1
    }
}

impl ParametricCurve2d for Polyline2d {
    fn sample(&self, t: f64) -> Point2d {
        let idx = self.segment(t);
        let (p1, p2) = (self.points[idx], self.points[idx + 1]);
        let len = self.lengths[idx + 1] - self.lengths[idx];
        if len <= 0.0 {
            return p1;
        }
        p1 + (p2 - p1) * ((t - self.lengths[idx]) / len)
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.length())
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let idx = self.segment(t);
        (self.points[idx + 1] - self.points[idx]).normalize()
    }
}

/// Parameter samples per spacing used to bracket each point.
const BRACKET_SAMPLES: f64 = 8.0;

/// Bisection steps used to place each point within its bracket.
const REFINE_STEPS: usize = 50;

/// Places points along a curve so that consecutive points are `dist` apart
/// in a straight line. The curve's end point is always the last point, unless
/// the previous point already lies on it.
///
/// Returns the points and the approximate length of the curve.
pub fn equidistant_points_along_curve(curve: &impl ParametricCurve2d, dist: f64) -> (Vec<Point2d>, f64) {
    let bounds = curve.bounds();
    let start = curve.sample(bounds.min);
    let end = curve.sample(bounds.max);
    let mut points = vec![start];
    if dist <= 0.0 {
        return (points, 0.0);
    }

    let estimate = (0..=32)
        .map(|i| curve.sample(bounds.lerp(i as f64 / 32.0)))
        .tuple_windows()
        .map(|(a, b)| (b - a).magnitude())
        .sum::<f64>();
    let steps = (BRACKET_SAMPLES * estimate / dist).ceil().max(1.0) as usize;

    let mut last = start;
    let mut t0 = bounds.min;
    for i in 1..=steps {
        let t1 = bounds.lerp(i as f64 / steps as f64);
        if (curve.sample(t1) - last).magnitude() < dist {
            t0 = t1;
            continue;
        }
        // The chord from the last point reaches `dist` somewhere in [t0, t1]
        let mut bracket = Interval::new(t0, t1);
        for _ in 0..REFINE_STEPS {
            let mid = bracket.lerp(0.5);
            if (curve.sample(mid) - last).magnitude() < dist {
                bracket.min = mid;
            } else {
                bracket.max = mid;
            }
        }
        last = curve.sample(bracket.max);
        points.push(last);
        t0 = bracket.max;
    }

    let remainder = (end - last).magnitude();
    let mut length = (points.len() - 1) as f64 * dist;
    if remainder > 0.001 * dist {
        length += remainder;
        points.push(end);
    }
    (points, length)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    pub fn equidistant_points_along_curve_is_stable() {
        for i in 0..100 {
            let len = 0.1 * i as f64;
            let (points, length) = equidistant_points_along_curve(
                &LineSegment2d::from_ends(Point2d::new(10.0, 10.0), Point2d::new(10.0 + len, 10.0)),
                0.5,
            );
            assert_approx_eq!(length, len);
            for point in points.into_iter() {
                assert!(!point.x.is_nan() && !point.y.is_nan());
            }
        }
    }

    #[test]
    fn polyline_is_arclength_parameterised() {
        let line = Polyline2d::new(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(3.0, 4.0),
            Point2d::new(3.0, 10.0),
        ]);
        assert_approx_eq!(line.length(), 11.0);
        let p = line.sample(2.5);
        assert_approx_eq!(p.x, 1.5);
        assert_approx_eq!(p.y, 2.0);
        let p = line.sample(8.0);
        assert_approx_eq!(p.x, 3.0);
        assert_approx_eq!(p.y, 7.0);
        let p = line.sample(11.0);
        assert_approx_eq!(p.y, 10.0);
    }

    #[test]
    fn curve_spacing_is_uniform() {
        let curve = QuadraticBezier2d::new(&[
            Point2d::new(10.0, 10.0),
            Point2d::new(60.0, 40.0),
            Point2d::new(100.0, 45.0),
        ]);
        let (points, _) = equidistant_points_along_curve(&curve, 1.0);
        for w in points.windows(2).take(points.len() - 2) {
            assert_approx_eq!((w[1] - w[0]).magnitude(), 1.0, 0.011);
        }
    }

    #[test]
    fn bezier_tangent_matches_central_difference() {
        struct Sampled(QuadraticBezier2d);
        impl ParametricCurve2d for Sampled {
            fn sample(&self, t: f64) -> Point2d {
                self.0.sample(t)
            }
            fn bounds(&self) -> Interval<f64> {
                self.0.bounds()
            }
        }

        let curve = QuadraticBezier2d::new(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 10.0),
        ]);
        for t in [0.1, 0.5, 0.9] {
            let exact = curve.sample_dt(t);
            let approx = Sampled(curve).sample_dt(t);
            assert_approx_eq!(exact.x, approx.x, 1e-4);
            assert_approx_eq!(exact.y, approx.y, 1e-4);
        }
        let mid = curve.sample(0.5);
        assert_approx_eq!(mid.x, 7.5);
        assert_approx_eq!(mid.y, 2.5);
    }
}
