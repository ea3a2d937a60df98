//! Generation of lateral alternatives ("roll-outs") to a reference path.

use crate::config::SmoothingParams;
use crate::math::{distance, rot90, Pose};
use crate::path::{
    closest_next_point_index, closest_point_index, perp_distance_to_trajectory_simple,
    perpendicular_on_trajectory, smooth_path,
};
use crate::waypoint::WayPoint;
use serde::{Deserialize, Serialize};

/// The velocity of every roll-out but the central one is scaled by this factor.
pub const LANE_CHANGE_SPEED_FACTOR: f64 = 0.5;

/// Converts the car tip margin into a number of points kept out of smoothing.
const TIP_POINTS_PER_METRE: f64 = 1.0 / 0.3;

/// Parameters of the roll-out generator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollOutParams {
    /// The length of the roll-outs past the blend, in m.
    pub max_roll_distance: f64,
    /// The distance ahead of the car that the roll-outs stay parallel to the car, in m.
    pub car_tip_margin: f64,
    /// The fixed part of the blend length, in m.
    pub roll_in_margin: f64,
    /// The speed dependent part of the blend length, in s.
    pub roll_in_speed_factor: f64,
    /// The spacing of the reference path, in m.
    pub path_density: f64,
    /// The lateral spacing between neighbouring roll-outs, in m.
    pub roll_out_density: f64,
    /// The number of roll-outs besides the central one.
    pub roll_out_number: usize,
    /// Smoothing applied to each roll-out.
    pub smoothing: SmoothingParams,
    /// Starts each roll-out with a straight segment from the car's position.
    pub heading_smoothing: bool,
}

impl Default for RollOutParams {
    fn default() -> Self {
        Self {
            max_roll_distance: 50.0,
            car_tip_margin: 4.0,
            roll_in_margin: 16.0,
            roll_in_speed_factor: 0.25,
            path_density: 0.5,
            roll_out_density: 0.5,
            roll_out_number: 6,
            smoothing: SmoothingParams::default(),
            heading_smoothing: false,
        }
    }
}

/// A set of roll-outs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RollOuts {
    /// The index of the reference point closest to the car.
    pub start_index: usize,
    /// The index of the reference point where the blend ends.
    pub end_index: usize,
    /// The lateral offset of each roll-out after the blend.
    pub end_laterals: Vec<f64>,
    /// The roll-outs, ordered from left to right.
    pub paths: Vec<Vec<WayPoint>>,
}

impl RollOuts {
    /// The index of the roll-out that follows the reference path.
    pub fn central_index(&self) -> usize {
        self.paths.len().saturating_sub(1) / 2
    }
}

/// Offsets a point to the right of its heading by `lateral` m.
fn offset(point: &WayPoint, lateral: f64) -> WayPoint {
    let mut p = *point;
    p.pose.pos -= lateral * rot90(point.pose.direction());
    p
}

/// Appends a copy of `point`, offset by `lateral(i)`, to each roll-out `i`.
fn push_offset(
    paths: &mut [Vec<WayPoint>],
    point: &WayPoint,
    central: usize,
    lateral: impl Fn(usize) -> f64,
) {
    for (i, path) in paths.iter_mut().enumerate() {
        let mut p = offset(point, lateral(i));
        if i != central {
            p.velocity *= LANE_CHANGE_SPEED_FACTOR;
        }
        path.push(p);
    }
}

/// Advances from `start` until more than `margin` m of the path has been covered,
/// returning the first index past the margin.
fn index_past_margin(center: &[WayPoint], start: usize, margin: f64) -> usize {
    let mut d = 0.0;
    let mut idx = start;
    for i in start..center.len() {
        if i > 0 {
            d += distance(center[i].pos(), center[i - 1].pos());
        }
        if d > margin {
            break;
        }
        idx += 1;
    }
    idx
}

/// Builds a straight run of points from the car, each following the
/// heading of the reference path at its foot point. Empty without a positive density.
fn heading_start_path(center: &[WayPoint], car_pose: &Pose, params: &RollOutParams) -> Vec<WayPoint> {
    if params.path_density <= 0.0 {
        return vec![];
    }
    let count = (params.car_tip_margin / params.path_density) as usize;
    let project = |pose: &Pose| {
        let foot = perpendicular_on_trajectory(center, pose, Some(0)).point;
        foot.with_pose(Pose { pos: pose.pos, ..foot.pose })
    };

    let mut start = vec![project(car_pose)];
    for i in 0..count {
        let prev = start[i].pose;
        let next = Pose {
            pos: prev.pos + params.path_density * prev.direction(),
            ..prev
        };
        start.push(project(&next));
    }
    start
}

/// Generates `roll_out_number + 1` paths parallel to `center`, which blend
/// from the car's current lateral offset to evenly spaced lateral offsets
/// centred on `center`.
///
/// Each roll-out keeps the car's lateral offset over the car tip margin,
/// blends linearly to its end lateral over a distance that grows with
/// `speed`, and then stays parallel to `center` up to the maximum roll
/// distance. All roll-outs but the central one are slowed down by
/// [LANE_CHANGE_SPEED_FACTOR].
pub fn calculate_roll_in_trajectories(
    car_pose: &Pose,
    speed: f64,
    center: &[WayPoint],
    params: &RollOutParams,
) -> RollOuts {
    let count = params.roll_out_number + 1;
    let central = params.roll_out_number / 2;
    let end_laterals = (0..count)
        .map(|i| params.roll_out_density * (i as f64 - central as f64))
        .collect::<Vec<_>>();

    if center.is_empty() {
        return RollOuts {
            end_laterals,
            paths: vec![vec![]; count],
            ..Default::default()
        };
    }

    let limit_index = ((params.car_tip_margin * TIP_POINTS_PER_METRE / params.path_density) as usize)
        .min(center.len() - 1);
    let start_index = closest_point_index(center, car_pose, Some(0));
    let remaining_distance = (start_index..center.len() - 1)
        .filter(|i| *i > 0)
        .map(|i| distance(center[i].pos(), center[i + 1].pos()))
        .sum::<f64>();

    let mut initial_lateral = perp_distance_to_trajectory_simple(center, car_pose, Some(start_index));
    let start_path = if params.heading_smoothing {
        let start_path = heading_start_path(center, car_pose, params);
        if let Some(last) = start_path.last() {
            initial_lateral = perp_distance_to_trajectory_simple(center, &last.pose, Some(start_index));
        }
        start_path
    } else {
        vec![]
    };

    // The blend ends this far ahead of the car
    let blend_distance = (params.roll_in_speed_factor * speed + params.roll_in_margin).min(remaining_distance);
    let mut end_index = start_index;
    let mut d = 0.0;
    for i in start_index..center.len() {
        if i > 0 {
            d += distance(center[i].pos(), center[i - 1].pos());
        }
        if d >= blend_distance {
            end_index = i;
            break;
        }
    }

    let smoothing_start = index_past_margin(center, start_index, params.car_tip_margin);
    let smoothing_end = index_past_margin(center, end_index, params.car_tip_margin);
    let blend_end = end_index.max(smoothing_start);
    let steady_end = smoothing_end.max(blend_end);

    let steps = end_index as f64 - smoothing_start as f64;
    let increments = end_laterals
        .iter()
        .map(|lateral| if steps > 0.0 { (lateral - initial_lateral) / steps } else { 0.0 })
        .collect::<Vec<_>>();

    let mut paths = vec![vec![]; count];
    let mut excluded = vec![vec![]; count];

    // Parallel to the car within the tip margin
    for j in start_index..smoothing_start.min(center.len()) {
        let target = if j < limit_index { &mut excluded } else { &mut paths };
        push_offset(target, &center[j], central, |_| initial_lateral);
    }

    // Linear blend to the end laterals
    for (step, j) in (smoothing_start..blend_end).enumerate() {
        let blend = (step + 1) as f64;
        push_offset(&mut paths, &center[j], central, |i| initial_lateral + blend * increments[i]);
    }

    // Parallel to the reference, smoothed together with the blend
    for j in blend_end..steady_end.min(center.len()) {
        push_offset(&mut paths, &center[j], central, |i| end_laterals[i]);
    }

    for (path, head) in paths.iter_mut().zip(excluded) {
        path.splice(0..0, head);
    }

    if let Some(last) = start_path.last() {
        for path in paths.iter_mut() {
            let cut = closest_next_point_index(path, &last.pose, Some(0));
            path.splice(0..cut, start_path.iter().copied());
        }
    }

    let smoothing = &params.smoothing;
    for path in paths.iter_mut() {
        smooth_path(path, smoothing.data_weight, smoothing.smooth_weight, smoothing.tolerance);
    }

    // Unsmoothed tail
    let mut d = 0.0;
    for j in steady_end..center.len() {
        if j > 0 {
            d += distance(center[j].pos(), center[j - 1].pos());
        }
        if d > params.max_roll_distance {
            break;
        }
        push_offset(&mut paths, &center[j], central, |i| end_laterals[i]);
    }

    RollOuts {
        start_index,
        end_index,
        end_laterals,
        paths,
    }
}
