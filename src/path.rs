//! Operations on paths: ordered sequences of [WayPoint]s.
//!
//! Index arguments named `hint` are the starting point of an incremental
//! search, typically the result of the previous planning cycle. A `None`
//! hint means there is no valid starting point yet and the search yields 0.

use crate::config::SmoothingParams;
use crate::math::{
    calc_circle_radius, distance, distance_squared, fix_negative_angle, Point2d, Pose, Transform2d,
    UNDEFINED_RADIUS,
};
use crate::waypoint::WayPoint;
use cgmath::prelude::*;
use itertools::Itertools;
use log::warn;
use std::f64::consts::FRAC_PI_2;

/// Smoothing gives up after this many relaxation sweeps.
pub const MAX_SMOOTHING_ITERATIONS: usize = 10_000;

/// Circumradii above this are treated as straight road, in m.
const MAX_CURVATURE_RADIUS: f64 = 250.0;

/// The number of points kept behind the vehicle when extracting a local path.
const EXTRACT_LOOK_BACK: usize = 5;

/// The result of projecting a pose onto a path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perpendicular {
    /// The foot of the perpendicular, on the path.
    pub point: WayPoint,
    /// The signed lateral offset of the path as seen from the pose.
    /// Negative when the pose is to the left of the path.
    pub lateral: f64,
    /// The distance along the pose's heading to the middle point of the window used.
    pub along: f64,
}

/// Finds the index of the point closest to `pose`, scanning from `hint` to the end.
///
/// Returns 0 for an empty path, a `None` hint or a hint past the end.
pub fn closest_point_index(path: &[WayPoint], pose: &Pose, hint: Option<usize>) -> usize {
    scan_closest(path, pose, hint).unwrap_or(0)
}

/// Like [closest_point_index], but advances one point when `pose` has already
/// passed the closest point, i.e. when the angle between the vector to `pose`
/// and the vector to the following point is at most 90 degrees.
/// The last two points of the path never advance.
pub fn closest_next_point_index(path: &[WayPoint], pose: &Pose, hint: Option<usize>) -> usize {
    let idx = match scan_closest(path, pose, hint) {
        Some(idx) => idx,
        None => return 0,
    };

    if idx + 2 < path.len() {
        let curr = path[idx].pos();
        let v1 = pose.pos - curr;
        let v2 = path[idx + 1].pos() - curr;
        let norms = v1.magnitude() * v2.magnitude();
        if norms > 0.0 {
            let angle = (v1.dot(v2) / norms).clamp(-1.0, 1.0).acos();
            if angle <= FRAC_PI_2 {
                return idx + 1;
            }
        }
    }

    idx
}

fn scan_closest(path: &[WayPoint], pose: &Pose, hint: Option<usize>) -> Option<usize> {
    let start = hint?;
    path.get(start..)?
        .iter()
        .map(|p| distance_squared(p.pos(), pose.pos))
        .position_min_by(|a, b| a.total_cmp(b))
        .map(|idx| start + idx)
}

/// Selects three consecutive points around `pose`, synthesizing a middle
/// point where the path does not provide one. The path must have two or more points.
fn local_window(path: &[WayPoint], pose: &Pose, hint: Option<usize>) -> [WayPoint; 3] {
    let midpoint = |p0: &WayPoint, p2: &WayPoint| {
        p0.with_pose(Pose {
            pos: p0.pos().midpoint(p2.pos()),
            z: 0.5 * (p0.pose.z + p2.pose.z),
            heading: p0.heading(),
        })
    };

    if path.len() == 2 {
        return [path[0], midpoint(&path[0], &path[1]), path[1]];
    }

    let next = closest_next_point_index(path, pose, hint);
    if next == 0 {
        [path[0], path[1], path[2]]
    } else if next < path.len() - 1 {
        [path[next - 1], path[next], path[next + 1]]
    } else {
        [path[next - 1], midpoint(&path[next - 1], &path[next]), path[next]]
    }
}

/// Evaluates, at x = 0, the line through two points given in a local frame.
fn intercept(p0: Point2d, p1: Point2d) -> f64 {
    let m = (p1.y - p0.y) / (p1.x - p0.x);
    let d = p1.y - m * p1.x;
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

/// Projects `pose` onto the path.
///
/// A three point window around the next point index is moved into the pose's
/// frame; the line through its first two points is evaluated where it crosses
/// the pose's lateral axis. Paths of fewer than two points project to the pose itself.
pub fn perpendicular_on_trajectory(path: &[WayPoint], pose: &Pose, hint: Option<usize>) -> Perpendicular {
    if path.len() < 2 {
        return Perpendicular {
            point: WayPoint::from_pose(*pose),
            lateral: 0.0,
            along: 0.0,
        };
    }

    let [p0, p1, _] = local_window(path, pose, hint);
    let to_local = Transform2d::to_local(pose);
    let (l0, l1) = (to_local.apply(p0.pos()), to_local.apply(p1.pos()));

    let lateral = intercept(l0, l1);
    let along = if l1.x.is_finite() { l1.x } else { 0.0 };
    let foot = Transform2d::to_world(pose).apply(Point2d::new(0.0, lateral));

    Perpendicular {
        point: p1.with_pose(Pose { pos: foot, ..p1.pose }),
        lateral,
        along,
    }
}

/// The signed lateral distance from `pose` to the line through two waypoints,
/// measured in a frame aligned with the first waypoint's heading.
pub fn perp_distance_to_vector_simple(p1: &WayPoint, p2: &WayPoint, pose: &Pose) -> f64 {
    let to_local = Transform2d::translation(-pose.pos.x, -pose.pos.y)
        .then(&Transform2d::rotation(-p1.heading()));
    intercept(to_local.apply(p1.pos()), to_local.apply(p2.pos()))
}

/// The signed lateral distance from `pose` to the path, a fast lateral error metric.
/// Returns 0 for paths of fewer than two points.
pub fn perp_distance_to_trajectory_simple(path: &[WayPoint], pose: &Pose, hint: Option<usize>) -> f64 {
    if path.len() < 2 {
        return 0.0;
    }

    let [p0, p1, _] = local_window(path, pose, hint);
    let to_local = Transform2d::translation(-pose.pos.x, -pose.pos.y)
        .then(&Transform2d::rotation(-p1.heading()));
    intercept(to_local.apply(p0.pos()), to_local.apply(p1.pos()))
}

/// Finds the point `distance` metres further along the path from `index`.
///
/// Returns the first point for an out of range index, the last point if the
/// path ends first, and `None` for an empty path.
///
/// Panics if the path contains two coincident consecutive points where interpolation is needed.
pub fn next_point_on_trajectory(path: &[WayPoint], distance: f64, index: usize) -> Option<WayPoint> {
    let first = *path.first()?;
    if index >= path.len() {
        return Some(first);
    }

    let mut idx = index;
    let mut p1 = path[idx];
    let mut d = 0.0;
    while idx < path.len() - 1 && d < distance {
        idx += 1;
        let p2 = p1;
        p1 = path[idx];
        d += crate::math::distance(p1.pos(), p2.pos());
    }

    if idx >= path.len() - 1 {
        return Some(p1);
    }

    let (p2, p1) = (path[idx], path[idx + 1]);
    let dir = p1.pos() - p2.pos();
    let norm = dir.magnitude();
    assert!(norm != 0.0, "Coincident waypoints at index {}", idx);

    Some(p2.with_pose(Pose {
        pos: p2.pos() + dir * ((distance - d) / norm),
        heading: dir.y.atan2(dir.x),
        z: p2.pose.z,
    }))
}

/// The signed arc length from `start` to the point of the path nearest `pose`.
/// Negative if that point lies behind `start`.
pub fn distance_on_trajectory(path: &[WayPoint], start: usize, pose: &Pose) -> f64 {
    if start >= path.len() {
        return 0.0;
    }

    let end = closest_point_index(path, pose, Some(0)).saturating_sub(1);
    let segment_len = |i: usize, j: usize| distance(path[i].pos(), path[j].pos());

    if end >= start {
        let along = (start..end).map(|i| segment_len(i, i + 1)).sum::<f64>();
        along + distance(path[end].pos(), pose.pos)
    } else {
        -(end + 1..=start).map(|i| segment_len(i, i - 1)).sum::<f64>()
    }
}

/// The lowest velocity within `distance` metres ahead of `pose`,
/// or 0 if the path ends first.
pub fn velocity_ahead(path: &[WayPoint], pose: &Pose, distance: f64) -> f64 {
    let start = closest_next_point_index(path, pose, Some(0));
    let mut d = 0.0;
    let mut min_v = f64::INFINITY;
    let mut prev = pose.pos;
    for point in path.iter().skip(start) {
        d += crate::math::distance(prev, point.pos());
        prev = point.pos();
        min_v = min_v.min(point.velocity);
        if d >= distance {
            return min_v;
        }
    }
    0.0
}

/// Returns true if both paths hold the same points with the same velocities.
pub fn compare_trajectories(path1: &[WayPoint], path2: &[WayPoint]) -> bool {
    path1.len() == path2.len()
        && path1.iter().zip(path2).all(|(a, b)| {
            a.velocity == b.velocity && a.pos() == b.pos() && a.pose.z == b.pose.z
        })
}

/// Resamples the path so that consecutive points are `spacing` metres apart.
///
/// Walks the accumulated distance along the path: points closer than the
/// spacing (less a 1% margin) are skipped, a point within the margin is kept,
/// and a gap wider than the margin is filled with interpolated points.
/// An empty path or a zero spacing leaves the path untouched.
pub fn fix_path_density(path: &mut Vec<WayPoint>, spacing: f64) {
    if path.is_empty() || spacing == 0.0 {
        return;
    }

    let margin = spacing * 0.01;
    let mut src = path.clone();
    let mut fixed = vec![src[0]];
    let (mut si, mut ei) = (0, 1);
    let mut d = 0.0;
    let mut remaining = 0.0;

    while ei < src.len() {
        d += distance(src[ei].pos(), src[ei - 1].pos()) + remaining;
        let delta = src[ei].pos() - src[si].pos();
        let (sin, cos) = delta.y.atan2(delta.x).sin_cos();

        if d < spacing - margin {
            ei += 1;
            remaining = 0.0;
        } else if d > spacing + margin {
            let mut pm = src[si];
            let count = (d / spacing) as usize;
            for _ in 0..count {
                pm.pose.pos.x += spacing * cos;
                pm.pose.pos.y += spacing * sin;
                fixed.push(pm);
            }
            remaining = d - count as f64 * spacing;
            src[si] = pm;
            d = 0.0;
            ei += 1;
        } else {
            d = 0.0;
            remaining = 0.0;
            fixed.push(src[ei]);
            ei += 1;
            si = ei - 1;
        }
    }

    *path = fixed;
}

/// Runs the relaxation shared by all smoothing operations on one scalar
/// attribute of the waypoints. The first and last points never move.
fn relax(
    path: &mut [WayPoint],
    weight_data: f64,
    weight_smooth: f64,
    tolerance: f64,
    get: impl Fn(&WayPoint) -> f64,
    set: impl Fn(&mut WayPoint, f64),
) {
    let original = path.iter().map(&get).collect::<Vec<_>>();
    let mut values = original.clone();
    let len = values.len();

    let mut change = tolerance;
    let mut iterations = 0;
    while change >= tolerance {
        if iterations == MAX_SMOOTHING_ITERATIONS {
            warn!("Smoothing stopped after {} iterations, change = {}", iterations, change);
            break;
        }
        change = 0.0;
        for i in 1..len.saturating_sub(1) {
            let before = values[i];
            values[i] += weight_data * (original[i] - values[i]);
            values[i] += weight_smooth * (values[i - 1] + values[i + 1] - 2.0 * values[i]);
            change += (before - values[i]).abs();
        }
        iterations += 1;
    }

    for (point, value) in path.iter_mut().zip(values) {
        set(point, value);
    }
}

/// Smooths the path geometry by repeatedly pulling each interior point towards
/// its original position (`weight_data`) and towards its neighbours (`weight_smooth`)
/// until the total movement of a sweep drops below `tolerance`.
///
/// Paths of two points or fewer are left untouched.
pub fn smooth_path(path: &mut [WayPoint], weight_data: f64, weight_smooth: f64, tolerance: f64) {
    if path.len() <= 2 {
        warn!("Can't smooth path with {} points", path.len());
        return;
    }

    let original = path.to_vec();
    let mut smoothed = original.clone();
    let len = path.len();

    let mut change = tolerance;
    let mut iterations = 0;
    while change >= tolerance {
        if iterations == MAX_SMOOTHING_ITERATIONS {
            warn!("Smoothing stopped after {} iterations, change = {}", iterations, change);
            break;
        }
        change = 0.0;
        for i in 1..len - 1 {
            let before = smoothed[i].pos();
            let prev = smoothed[i - 1].pos().to_vec();
            let next = smoothed[i + 1].pos().to_vec();

            let mut p = before.to_vec();
            p += weight_data * (original[i].pos().to_vec() - p);
            p += weight_smooth * (prev + next - 2.0 * p);
            smoothed[i].pose.pos = Point2d::from_vec(p);

            change += (before.x - p.x).abs() + (before.y - p.y).abs();
        }
        iterations += 1;
    }

    path.copy_from_slice(&smoothed);
}

/// [smooth_path] applied to the velocities.
pub fn smooth_speed_profile(path: &mut [WayPoint], weight_data: f64, weight_smooth: f64, tolerance: f64) {
    relax(path, weight_data, weight_smooth, tolerance, |p| p.velocity, |p, v| p.velocity = v);
}

/// [smooth_path] applied to the costs, used when costs hold curvature.
pub fn smooth_curvature_profile(path: &mut [WayPoint], weight_data: f64, weight_smooth: f64, tolerance: f64) {
    relax(path, weight_data, weight_smooth, tolerance, |p| p.cost, |p, c| p.cost = c);
}

/// [smooth_path] applied to the headings.
pub fn smooth_waypoint_directions(path: &mut [WayPoint], weight_data: f64, weight_smooth: f64, tolerance: f64) {
    relax(path, weight_data, weight_smooth, tolerance, |p| p.heading(), |p, a| p.pose.heading = a);
}

/// Sets each point's heading to the bearing of its successor, in `[0, 2π)`,
/// and its cost to the arc length from the start of the path plus `initial_cost`.
/// The last point copies the heading of the one before it.
///
/// Returns the cost of the last point.
pub fn calc_angle_and_cost(path: &mut [WayPoint], initial_cost: f64) -> f64 {
    let len = path.len();
    match len {
        0 => return initial_cost,
        1 => {
            path[0].cost = initial_cost;
            return initial_cost;
        }
        _ => {}
    }

    path[0].cost = initial_cost;
    for j in 0..len - 1 {
        let delta = path[j + 1].pos() - path[j].pos();
        path[j].pose.heading = fix_negative_angle(delta.y.atan2(delta.x));
        if j > 0 {
            path[j].cost = path[j - 1].cost + distance(path[j - 1].pos(), path[j].pos());
        }
    }
    path[len - 1].pose.heading = path[len - 2].heading();
    path[len - 1].cost = path[len - 2].cost + distance(path[len - 2].pos(), path[len - 1].pos());

    path[len - 1].cost
}

/// Maps a circumradius to a curvature cost in `[0, 10)`; higher is straighter.
fn curvature_cost(radius: f64) -> f64 {
    let k = if radius == UNDEFINED_RADIUS || !radius.is_finite() || radius > MAX_CURVATURE_RADIUS {
        MAX_CURVATURE_RADIUS
    } else {
        radius
    };
    if k < 1.0 {
        0.0
    } else {
        (1.0 - 1.0 / k) * 10.0
    }
}

/// Sets each point's heading like [calc_angle_and_cost], but its cost to a
/// curvature cost derived from the circle through it and its neighbours.
/// Collinear neighbours count as straight road.
///
/// Returns the cost of the last point.
pub fn calc_angle_and_cost_and_curvature(path: &mut [WayPoint]) -> f64 {
    let len = path.len();
    if len == 0 {
        return 0.0;
    }
    calc_angle_and_cost(path, 0.0);
    if len < 3 {
        path.iter_mut().for_each(|p| p.cost = curvature_cost(UNDEFINED_RADIUS));
        return path[len - 1].cost;
    }

    for j in 1..len - 1 {
        let radius = calc_circle_radius(path[j - 1].pos(), path[j].pos(), path[j + 1].pos());
        path[j].cost = curvature_cost(radius);
    }
    path[0].cost = path[1].cost;
    path[len - 1].cost = path[len - 2].cost;

    path[len - 1].cost
}

/// The speed tier, before scaling, for a curvature cost.
fn speed_tier(k_ratio: f64) -> f64 {
    if k_ratio <= 8.0 {
        1.0
    } else if k_ratio <= 8.5 {
        1.5
    } else if k_ratio <= 9.0 {
        2.0
    } else if k_ratio <= 9.2 {
        3.0
    } else if k_ratio <= 9.4 {
        4.0
    } else if k_ratio < 9.6 {
        7.0
    } else if k_ratio < 9.8 {
        10.0
    } else if k_ratio < 9.9 {
        13.0
    } else {
        15.0
    }
}

/// Assigns each point a recommended velocity from a fixed ladder of speed tiers,
/// sharper turns getting lower tiers, scaled by `factor` and capped at `max_speed`.
///
/// Overwrites the costs with curvature costs.
pub fn generate_speed_profile(path: &mut [WayPoint], max_speed: f64, factor: f64) {
    calc_angle_and_cost_and_curvature(path);
    for point in path.iter_mut() {
        point.velocity = (speed_tier(point.cost) * factor).min(max_speed);
    }
}

/// Extracts the part of `path` starting a few points behind `pose` and
/// extending `min_distance` metres, then resamples it to `density`,
/// smooths it and assigns headings and arc length costs.
///
/// Returns an empty path if fewer than two points could be extracted.
pub fn extract_part_from_point_to_distance(
    path: &[WayPoint],
    pose: &Pose,
    min_distance: f64,
    density: f64,
    smoothing: &SmoothingParams,
) -> Vec<WayPoint> {
    if path.len() < 2 {
        warn!("Can't extract from path with {} points", path.len());
        return vec![];
    }

    let start = closest_point_index(path, pose, Some(0)).saturating_sub(EXTRACT_LOOK_BACK);
    let mut extracted = Vec::new();
    let mut d = 0.0;
    for (p1, p2) in path[start..].iter().tuple_windows() {
        extracted.push(*p1);
        d += distance(p1.pos(), p2.pos());
        if d >= min_distance {
            break;
        }
    }
    if let Some(last) = path.get(start + extracted.len()) {
        extracted.push(*last);
    }

    if extracted.len() < 2 {
        warn!("Extracted path is too small, size = {}", extracted.len());
        return vec![];
    }

    fix_path_density(&mut extracted, density);
    smooth_path(
        &mut extracted,
        smoothing.data_weight,
        smoothing.smooth_weight,
        smoothing.tolerance,
    );
    calc_angle_and_cost(&mut extracted, 0.0);
    extracted
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn line(points: &[(f64, f64)]) -> Vec<WayPoint> {
        let mut path = points
            .iter()
            .map(|(x, y)| WayPoint::new(*x, *y, 0.0, 0.0))
            .collect::<Vec<_>>();
        calc_angle_and_cost(&mut path, 0.0);
        path
    }

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::from_seed(*b"Vegemite sandwhich is not fun...")
    }

    #[test]
    fn closest_and_next_on_three_points() {
        let path = line(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let query = Pose::new(4.0, 0.0, 0.0, 0.0);
        assert_eq!(closest_point_index(&path, &query, Some(0)), 0);
        assert_eq!(closest_next_point_index(&path, &query, Some(0)), 1);
    }

    #[test]
    fn closest_with_invalid_hints() {
        let path = line(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let query = Pose::new(19.0, 0.0, 0.0, 0.0);
        assert_eq!(closest_point_index(&path, &query, None), 0);
        assert_eq!(closest_point_index(&path, &query, Some(3)), 0);
        assert_eq!(closest_point_index(&[], &query, Some(0)), 0);
        assert_eq!(closest_next_point_index(&path, &query, None), 0);
        assert_eq!(closest_point_index(&path, &query, Some(1)), 2);
    }

    #[test]
    fn closest_scans_only_the_suffix() {
        let path = line(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        let query = Pose::new(1.0, 0.0, 0.0, 0.0);
        assert_eq!(closest_point_index(&path, &query, Some(2)), 2);
    }

    #[test]
    fn next_does_not_advance_near_the_end() {
        let path = line(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let query = Pose::new(12.0, 0.0, 0.0, 0.0);
        assert_eq!(closest_next_point_index(&path, &query, Some(0)), 1);
        let query = Pose::new(8.0, 0.0, 0.0, 0.0);
        assert_eq!(closest_next_point_index(&path, &query, Some(0)), 1);
    }

    #[test]
    fn no_point_is_strictly_closer() {
        let mut rng = rng();
        for _ in 0..200 {
            let points = (0..rng.gen_range(1..30))
                .map(|_| (rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)))
                .collect::<Vec<_>>();
            let path = line(&points);
            let query = Pose::new(rng.gen_range(-60.0..60.0), rng.gen_range(-60.0..60.0), 0.0, 0.0);
            let idx = closest_point_index(&path, &query, Some(0));
            let best = distance_squared(path[idx].pos(), query.pos);
            assert!(path.iter().all(|p| distance_squared(p.pos(), query.pos) >= best));
        }
    }

    #[test]
    fn perpendicular_to_the_left_of_a_path() {
        let path = line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (15.0, 0.0)]);
        let pose = Pose::new(6.0, 2.0, 0.0, 0.0);
        let perp = perpendicular_on_trajectory(&path, &pose, Some(0));
        assert_approx_eq!(perp.lateral, -2.0);
        assert_approx_eq!(perp.point.pos().x, 6.0);
        assert_approx_eq!(perp.point.pos().y, 0.0);
        assert_approx_eq!(perp_distance_to_trajectory_simple(&path, &pose, Some(0)), -2.0);

        let pose = Pose::new(6.0, -1.5, 0.0, 0.0);
        assert_approx_eq!(perp_distance_to_trajectory_simple(&path, &pose, Some(0)), 1.5);
    }

    #[test]
    fn perpendicular_on_two_point_path() {
        let path = line(&[(0.0, 0.0), (0.0, 10.0)]);
        let pose = Pose::new(1.0, 3.0, 0.0, std::f64::consts::FRAC_PI_2);
        let perp = perpendicular_on_trajectory(&path, &pose, Some(0));
        assert_approx_eq!(perp.lateral, 1.0);
        assert_approx_eq!(perp.point.pos().x, 0.0);
        assert_approx_eq!(perp.point.pos().y, 3.0);
    }

    #[test]
    fn degenerate_line_fit_is_zero() {
        let p = WayPoint::new(3.0, 3.0, 0.0, 0.0);
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(perp_distance_to_vector_simple(&p, &p, &pose), 0.0);

        let path = vec![p, p, p];
        assert_eq!(perp_distance_to_trajectory_simple(&path, &pose, Some(0)), 0.0);
        assert_eq!(perpendicular_on_trajectory(&path, &pose, Some(0)).lateral, 0.0);
        assert_eq!(perp_distance_to_trajectory_simple(&path[..1], &pose, Some(0)), 0.0);
    }

    #[test]
    fn next_point_interpolates() {
        let path = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let p = next_point_on_trajectory(&path, 2.0, 0).unwrap();
        assert_approx_eq!(p.pos().x, 2.0);
        let p = next_point_on_trajectory(&path, 10.0, 1).unwrap();
        assert_approx_eq!(p.pos().x, 4.0);
        let p = next_point_on_trajectory(&path, 1.0, 99).unwrap();
        assert_approx_eq!(p.pos().x, 0.0);
        assert!(next_point_on_trajectory(&[], 1.0, 0).is_none());
    }

    #[test]
    fn signed_distance_on_trajectory() {
        let path = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let ahead = distance_on_trajectory(&path, 0, &Pose::new(3.0, 0.0, 0.0, 0.0));
        assert_approx_eq!(ahead, 3.0);
        let behind = distance_on_trajectory(&path, 4, &Pose::new(1.0, 0.0, 0.0, 0.0));
        assert_approx_eq!(behind, -4.0);
    }

    #[test]
    fn velocity_ahead_is_the_minimum() {
        let mut path = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        for (i, p) in path.iter_mut().enumerate() {
            p.velocity = 10.0 - i as f64;
        }
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0);
        assert_approx_eq!(velocity_ahead(&path, &pose, 2.0), 8.0);
        assert_eq!(velocity_ahead(&path, &pose, 50.0), 0.0);
    }

    #[test]
    fn fix_path_density_is_uniform() {
        let mut rng = rng();
        for _ in 0..100 {
            let spacing = rng.gen_range(0.3..2.0);
            let heading: f64 = rng.gen_range(0.0..6.0);
            let dir = (heading.cos(), heading.sin());
            let mut s = 0.0;
            let points = (0..rng.gen_range(2..40))
                .map(|_| {
                    s += rng.gen_range(0.05..3.0);
                    (s * dir.0, s * dir.1)
                })
                .collect::<Vec<_>>();
            let mut path = line(&points);
            fix_path_density(&mut path, spacing);

            assert!(!path.is_empty());
            for w in path.windows(2) {
                let d = distance(w[0].pos(), w[1].pos());
                assert!(
                    d >= 0.99 * spacing - 1e-9 && d <= 1.01 * spacing + 1e-9,
                    "spacing {} gave {}",
                    spacing,
                    d
                );
            }
        }
    }

    #[test]
    fn fix_path_density_degenerate_inputs() {
        let mut empty = vec![];
        fix_path_density(&mut empty, 1.0);
        assert!(empty.is_empty());

        let mut path = line(&[(0.0, 0.0), (10.0, 0.0)]);
        let before = path.clone();
        fix_path_density(&mut path, 0.0);
        assert_eq!(path, before);

        let mut single = line(&[(1.0, 1.0)]);
        fix_path_density(&mut single, 1.0);
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn fix_path_density_fills_gaps() {
        let mut path = line(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        fix_path_density(&mut path, 1.0);
        assert_eq!(path.len(), 21);
        assert_approx_eq!(path[20].pos().x, 20.0);
    }

    fn noisy_path() -> Vec<WayPoint> {
        let mut rng = rng();
        let noise = Normal::new(0.0, 0.3).unwrap();
        let points = (0..30)
            .map(|i| (i as f64, noise.sample(&mut rng)))
            .collect::<Vec<_>>();
        line(&points)
    }

    fn displacement(a: &[WayPoint], b: &[WayPoint]) -> f64 {
        a.iter().zip(b).map(|(a, b)| distance_squared(a.pos(), b.pos())).sum()
    }

    #[test]
    fn smoothing_keeps_endpoints() {
        let original = noisy_path();
        let mut path = original.clone();
        smooth_path(&mut path, 0.45, 0.25, 0.0001);
        assert_eq!(path[0], original[0]);
        assert_eq!(path[29], original[29]);
        assert!(displacement(&path, &original) > 0.0);
    }

    #[test]
    fn smoothing_displacement_shrinks_with_data_weight() {
        let original = noisy_path();
        let displacements = [0.1, 0.2, 0.4, 0.8]
            .iter()
            .map(|weight_data| {
                let mut path = original.clone();
                smooth_path(&mut path, *weight_data, 0.3, 1e-6);
                displacement(&path, &original)
            })
            .collect::<Vec<_>>();
        for w in displacements.windows(2) {
            assert!(w[1] <= w[0], "{:?}", displacements);
        }
    }

    #[test]
    fn smoothing_short_paths_is_a_no_op() {
        let original = line(&[(0.0, 0.0), (1.0, 5.0)]);
        let mut path = original.clone();
        smooth_path(&mut path, 0.1, 0.4, 0.1);
        assert_eq!(path, original);
    }

    #[test]
    fn smoothing_stops_at_iteration_cap() {
        let original = noisy_path();
        let mut path = original.clone();
        smooth_path(&mut path, 0.3, 0.3, 0.0);
        assert!(path.iter().all(|p| p.pos().y.is_finite()));
    }

    #[test]
    fn speed_smoothing_keeps_ends() {
        let mut path = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        for (p, v) in path.iter_mut().zip([0.0, 10.0, 0.0, 10.0]) {
            p.velocity = v;
        }
        smooth_speed_profile(&mut path, 0.2, 0.3, 0.01);
        assert_eq!(path[0].velocity, 0.0);
        assert_eq!(path[3].velocity, 10.0);
        assert!(path[1].velocity < 10.0);
    }

    #[test]
    fn cost_is_arc_length() {
        let mut rng = rng();
        let points = (0..50)
            .map(|_| (rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0)))
            .collect::<Vec<_>>();
        let mut path = line(&points);
        let last = calc_angle_and_cost(&mut path, 7.0);
        assert_eq!(path[0].cost, 7.0);
        for w in path.windows(2) {
            assert_approx_eq!(w[1].cost - w[0].cost, distance(w[0].pos(), w[1].pos()));
            assert!(w[1].cost >= w[0].cost);
        }
        assert_eq!(last, path[49].cost);
        assert_eq!(path[49].heading(), path[48].heading());
    }

    #[test]
    fn headings_point_at_successors() {
        let path = line(&[(0.0, 0.0), (0.0, 1.0), (-1.0, 1.0), (-1.0, 0.0)]);
        assert_approx_eq!(path[0].heading(), FRAC_PI_2);
        assert_approx_eq!(path[1].heading(), std::f64::consts::PI);
        assert_approx_eq!(path[2].heading(), 3.0 * FRAC_PI_2);
        assert_approx_eq!(path[3].heading(), 3.0 * FRAC_PI_2);
    }

    fn arc(radius: f64, count: usize) -> Vec<WayPoint> {
        let points = (0..count)
            .map(|i| {
                let a = i as f64 / radius;
                (radius * a.cos(), radius * a.sin())
            })
            .collect::<Vec<_>>();
        line(&points)
    }

    #[test]
    fn speed_profile_tiers() {
        let mut straight = line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        generate_speed_profile(&mut straight, 100.0, 1.0);
        assert!(straight.iter().all(|p| p.velocity == 15.0));

        let mut capped = straight.clone();
        generate_speed_profile(&mut capped, 6.0, 2.0);
        assert!(capped.iter().all(|p| p.velocity == 6.0));

        // k = 4 => cost 7.5 => lowest tier
        let mut tight = arc(4.0, 10);
        generate_speed_profile(&mut tight, 100.0, 2.0);
        assert!(tight.iter().all(|p| (p.velocity - 2.0).abs() < 1e-9));

        // k = 40 => cost 9.75 => tier 10
        let mut gentle = arc(40.0, 10);
        generate_speed_profile(&mut gentle, 100.0, 1.0);
        assert!(gentle.iter().all(|p| p.velocity == 10.0));
    }

    #[test]
    fn speed_tier_breakpoints() {
        assert_eq!(speed_tier(8.0), 1.0);
        assert_eq!(speed_tier(8.5), 1.5);
        assert_eq!(speed_tier(9.0), 2.0);
        assert_eq!(speed_tier(9.2), 3.0);
        assert_eq!(speed_tier(9.4), 4.0);
        assert_eq!(speed_tier(9.5), 7.0);
        assert_eq!(speed_tier(9.6), 10.0);
        assert_eq!(speed_tier(9.8), 13.0);
        assert_eq!(speed_tier(9.9), 15.0);
    }

    #[test]
    fn extract_cuts_at_distance() {
        let points = (0..100).map(|i| (i as f64, 0.0)).collect::<Vec<_>>();
        let path = line(&points);
        let smoothing = SmoothingParams::default();
        let pose = Pose::new(20.0, 0.5, 0.0, 0.0);
        let part = extract_part_from_point_to_distance(&path, &pose, 30.0, 0.5, &smoothing);
        assert_approx_eq!(part[0].pos().x, 15.0);
        assert_approx_eq!(part.last().unwrap().pos().x, 45.0, 0.01);
        assert_eq!(part[0].cost, 0.0);

        assert!(extract_part_from_point_to_distance(&path[..1], &pose, 30.0, 0.5, &smoothing).is_empty());
    }

    #[test]
    fn compare() {
        let a = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let mut b = a.clone();
        assert!(compare_trajectories(&a, &b));
        b[1].velocity = 1.0;
        assert!(!compare_trajectories(&a, &b));
        assert!(!compare_trajectories(&a, &a[..1]));
    }
}
