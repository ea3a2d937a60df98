use crate::math::{distance, project_local, rot90, Point2d, Pose, Transform2d};
use crate::path::closest_point_index;
use crate::rollout::RollOuts;
use crate::util::Interval;
use crate::waypoint::WayPoint;
use serde::{Deserialize, Serialize};

/// An object reported by perception, e.g. another vehicle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectedObject {
    /// The centre of the object's bounding box, with its heading.
    pub center: Pose,
    /// The extent across the heading, in m.
    pub width: f64,
    /// The extent along the heading, in m.
    pub length: f64,
    /// The height, in m.
    pub height: f64,
    /// The speed in m/s.
    pub velocity: f64,
    /// The corners of the bounding box in world coordinates.
    pub contour: Vec<Point2d>,
}

impl DetectedObject {
    /// The points used to test the object against roll-outs.
    fn outline(&self) -> impl Iterator<Item = Point2d> + '_ {
        let centre = self.contour.is_empty().then(|| self.center.pos);
        self.contour.iter().copied().chain(centre)
    }
}

/// Drops the objects further than `filter_distance` from `pose` and computes
/// the bounding box corners of the others.
pub fn calc_contour_points_for_detected_objects(
    pose: &Pose,
    objects: &mut Vec<DetectedObject>,
    filter_distance: f64,
) {
    objects.retain(|obj| distance(obj.center.pos, pose.pos) < filter_distance);
    for obj in objects.iter_mut() {
        let to_world = Transform2d::to_world(&obj.center);
        let (hl, hw) = (0.5 * obj.length, 0.5 * obj.width);
        obj.contour = [(-hl, -hw), (hl, -hw), (hl, hw), (-hl, hw)]
            .into_iter()
            .map(|(x, y)| to_world.apply(Point2d::new(x, y)))
            .collect();
    }
}

/// Parameters of the roll-out cost evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    /// Objects further ahead than this are ignored, in m.
    pub horizon: f64,
    /// The width of the ego vehicle, in m.
    pub vehicle_width: f64,
    /// A roll-out passing an object closer than this is blocked, in m.
    pub lateral_clearance: f64,
    /// Objects further to the side than this add no lateral cost, in m.
    pub lateral_skip_distance: f64,
    /// Objects further than this from the vehicle are discarded, in m.
    pub filter_distance: f64,
    pub priority_weight: f64,
    pub transition_weight: f64,
    pub lateral_weight: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            horizon: 50.0,
            vehicle_width: 2.0,
            lateral_clearance: 0.3,
            lateral_skip_distance: 2.0,
            filter_distance: 100.0,
            priority_weight: 1.0,
            transition_weight: 1.0,
            lateral_weight: 1.0,
        }
    }
}

/// The evaluation of one roll-out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryCost {
    /// The index of the roll-out.
    pub index: usize,
    /// The index relative to the central roll-out; negative on the left.
    pub relative_index: isize,
    /// The distance ahead to the closest object in the roll-out's way.
    pub closest_obj_distance: f64,
    /// The speed of that object.
    pub closest_obj_velocity: f64,
    /// Preference for the central roll-out.
    pub priority_cost: f64,
    /// Preference for the roll-out currently followed.
    pub transition_cost: f64,
    /// Proximity of objects beside the roll-out.
    pub lateral_cost: f64,
    /// The weighted sum of the costs.
    pub cost: f64,
    /// True if an object is in the roll-out's way.
    pub blocked: bool,
}

/// A point in the frame of the reference path: arc length and left offset.
#[derive(Clone, Copy, Debug)]
struct PathCoords {
    along: f64,
    lateral: f64,
}

fn to_path_coords(center: &[WayPoint], point: Point2d) -> PathCoords {
    let pose = Pose { pos: point, ..Default::default() };
    let wp = &center[closest_point_index(center, &pose, Some(0))];
    let tan = wp.pose.direction();
    let local = project_local(point, wp.pos(), rot90(tan), tan);
    PathCoords {
        along: wp.cost + local.y,
        lateral: local.x,
    }
}

/// An object seen from the reference path.
struct ProjectedObject {
    ahead: f64,
    lateral: Interval<f64>,
    velocity: f64,
}

/// Evaluates every roll-out against the detected objects.
///
/// Objects are projected onto `center`, whose costs must hold arc lengths.
/// Each roll-out is treated as a corridor of the vehicle's width at its end
/// lateral offset; objects ahead of the vehicle within the horizon that leave
/// less than the lateral clearance to the corridor block it.
pub fn evaluate_trajectory_costs(
    center: &[WayPoint],
    rollouts: &RollOuts,
    car_pose: &Pose,
    current_index: usize,
    objects: &[DetectedObject],
    params: &CostParams,
) -> Vec<TrajectoryCost> {
    let central = rollouts.central_index();
    let current_lateral = rollouts.end_laterals.get(current_index).copied().unwrap_or(0.0);

    let projected = if center.is_empty() {
        vec![]
    } else {
        let car = to_path_coords(center, car_pose.pos);
        objects
            .iter()
            .filter_map(|obj| {
                let coords = obj.outline().map(|p| to_path_coords(center, p)).collect::<Vec<_>>();
                let ahead = coords.iter().map(|c| c.along).fold(f64::INFINITY, f64::min) - car.along;
                let lateral = coords.iter().fold(None, |acc: Option<Interval<f64>>, c| {
                    Some(match acc {
                        Some(i) => Interval::spanning(i.min.min(c.lateral), i.max.max(c.lateral)),
                        None => Interval::new(c.lateral, c.lateral),
                    })
                })?;
                (ahead >= 0.0 && ahead <= params.horizon).then(|| ProjectedObject {
                    ahead,
                    lateral,
                    velocity: obj.velocity,
                })
            })
            .collect::<Vec<_>>()
    };

    rollouts
        .end_laterals
        .iter()
        .enumerate()
        .map(|(index, end_lateral)| {
            // Roll-outs are offset to the right, path coordinates to the left
            let corridor = Interval::disc(-end_lateral, 0.5 * params.vehicle_width);

            let mut closest = None::<&ProjectedObject>;
            let mut min_clearance = f64::INFINITY;
            for obj in &projected {
                let clearance = corridor.clearance_with(&obj.lateral);
                min_clearance = min_clearance.min(clearance);
                if clearance < params.lateral_clearance && closest.map_or(true, |c| obj.ahead < c.ahead) {
                    closest = Some(obj);
                }
            }

            let priority_cost = end_lateral.abs();
            let transition_cost = (end_lateral - current_lateral).abs();
            let lateral_cost = (params.lateral_skip_distance - min_clearance).max(0.0);
            TrajectoryCost {
                index,
                relative_index: index as isize - central as isize,
                closest_obj_distance: closest.map_or(params.horizon, |c| c.ahead),
                closest_obj_velocity: closest.map_or(0.0, |c| c.velocity),
                priority_cost,
                transition_cost,
                lateral_cost,
                cost: params.priority_weight * priority_cost
                    + params.transition_weight * transition_cost
                    + params.lateral_weight * lateral_cost,
                blocked: closest.is_some(),
            }
        })
        .collect()
}

/// Picks the unblocked roll-out of least cost, or the central one if all are blocked.
pub fn find_safe_trajectory(costs: &[TrajectoryCost]) -> usize {
    costs
        .iter()
        .filter(|c| !c.blocked)
        .min_by(|a, b| a.cost.total_cmp(&b.cost))
        .map(|c| c.index)
        .unwrap_or_else(|| costs.len().saturating_sub(1) / 2)
}
