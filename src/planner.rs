use crate::config::PlannerParams;
use crate::cost::{
    calc_contour_points_for_detected_objects, evaluate_trajectory_costs, find_safe_trajectory, DetectedObject,
    TrajectoryCost,
};
use crate::debug::{debug_path, debug_value};
use crate::error::{PlannerError, Result};
use crate::math::Pose;
use crate::path::{calc_angle_and_cost, extract_part_from_point_to_distance, generate_speed_profile};
use crate::road::RoadNetwork;
use crate::rollout::{calculate_roll_in_trajectories, RollOuts};
use crate::search::SearchTree;
use crate::waypoint::WayPoint;
use log::{debug, warn};

/// The result of one planning cycle.
#[derive(Clone, Debug, Default)]
pub struct PlanOutput {
    /// The path the vehicle should follow, with recommended velocities.
    pub path: Vec<WayPoint>,
    /// The local reference path the roll-outs were generated around.
    pub reference: Vec<WayPoint>,
    /// All the candidate roll-outs.
    pub rollouts: RollOuts,
    /// The evaluation of each roll-out.
    pub costs: Vec<TrajectoryCost>,
    /// The index of the selected roll-out.
    pub selected: usize,
}

impl PlanOutput {
    /// True if an object blocks every roll-out, in which case the path
    /// brings the vehicle to a stop.
    pub fn blocked(&self) -> bool {
        self.costs.get(self.selected).map_or(false, |c| c.blocked)
    }
}

/// Plans routes through a road network and local trajectories around obstacles.
#[derive(Clone, Debug)]
pub struct Planner {
    params: PlannerParams,
    /// The roll-out selected in the previous cycle.
    current_rollout: Option<usize>,
}

impl Planner {
    /// Creates a planner, checking the parameters first.
    pub fn new(params: PlannerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            current_rollout: None,
        })
    }

    /// Gets the planner parameters.
    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    /// Forgets the roll-out selected in the previous cycle.
    pub fn reset(&mut self) {
        self.current_rollout = None;
    }

    /// Finds a path along the lanes of `network` from the waypoint closest to
    /// `pose` to the waypoint closest to `goal`.
    pub fn plan_global(&self, network: &RoadNetwork, pose: &Pose, goal: &Pose) -> Result<Vec<WayPoint>> {
        let search = &self.params.search;
        let start = network
            .closest_waypoint(pose, search.max_start_distance)
            .ok_or(PlannerError::NoWaypointNearPose)?;
        let goal = network
            .closest_waypoint(goal, f64::INFINITY)
            .ok_or(PlannerError::NoWaypointNearPose)?;
        let goal_pose = network.waypoint(goal).pose;

        let preferred_lanes = network.route_lanes(start.lane, goal.lane).unwrap_or_default();
        debug!("Routing through {} lanes", preferred_lanes.len());

        let mut tree = SearchTree::new();
        let outcome =
            tree.build_planning_search_tree(network, start, &goal_pose, &preferred_lanes, search.distance_limit);
        let (head, root) = match (outcome.node(), tree.root()) {
            (Some(head), Some(root)) => (head, root),
            _ => return Err(PlannerError::EmptyPath),
        };

        let mut path = tree.traverse_path_tree_backwards(head, root, &preferred_lanes);
        if path.is_empty() {
            return Err(PlannerError::EmptyPath);
        }
        path.insert(0, tree.node(root).point);
        calc_angle_and_cost(&mut path, 0.0);
        debug_path("global", &path);
        Ok(path)
    }

    /// Plans a local trajectory along `global_path` for a vehicle at `pose`
    /// moving at `speed`, avoiding `objects`.
    pub fn plan_local(
        &mut self,
        global_path: &[WayPoint],
        pose: &Pose,
        speed: f64,
        mut objects: Vec<DetectedObject>,
    ) -> Result<PlanOutput> {
        let params = &self.params;
        let reference = extract_part_from_point_to_distance(
            global_path,
            pose,
            params.search.local_path_length,
            params.search.local_path_density,
            &params.smoothing,
        );
        if reference.is_empty() {
            return Err(PlannerError::EmptyPath);
        }

        let rollouts = calculate_roll_in_trajectories(pose, speed, &reference, &params.rollout);
        calc_contour_points_for_detected_objects(pose, &mut objects, params.cost.filter_distance);
        let current = self
            .current_rollout
            .filter(|idx| *idx < rollouts.paths.len())
            .unwrap_or_else(|| rollouts.central_index());
        let costs = evaluate_trajectory_costs(&reference, &rollouts, pose, current, &objects, &params.cost);
        let selected = find_safe_trajectory(&costs);

        let mut path = rollouts.paths.get(selected).cloned().unwrap_or_default();
        if path.is_empty() {
            return Err(PlannerError::EmptyPath);
        }
        self.assign_speed_profile(&mut path);
        calc_angle_and_cost(&mut path, 0.0);

        let mut output = PlanOutput {
            path,
            reference,
            rollouts,
            costs,
            selected,
        };
        if output.blocked() {
            warn!("All roll-outs blocked, stopping");
            output.path.iter_mut().for_each(|p| p.velocity = 0.0);
        }

        self.current_rollout = Some(selected);
        Ok(self.finish(output))
    }

    /// Plans a route from `pose` to `goal` and a local trajectory along it.
    pub fn plan(
        &mut self,
        network: &RoadNetwork,
        pose: &Pose,
        speed: f64,
        goal: &Pose,
        objects: Vec<DetectedObject>,
    ) -> Result<PlanOutput> {
        let global_path = self.plan_global(network, pose, goal)?;
        self.plan_local(&global_path, pose, speed, objects)
    }

    /// Caps each point's velocity by the curvature speed tiers.
    fn assign_speed_profile(&self, path: &mut [WayPoint]) {
        let limits = path.iter().map(|p| p.velocity).collect::<Vec<_>>();
        generate_speed_profile(path, self.params.max_speed, self.params.speed_profile_factor);
        for (point, limit) in path.iter_mut().zip(limits) {
            if limit > 0.0 {
                point.velocity = point.velocity.min(limit);
            }
        }
    }

    fn finish(&self, output: PlanOutput) -> PlanOutput {
        debug_path("reference", &output.reference);
        for path in &output.rollouts.paths {
            debug_path("rollout", path);
        }
        debug_path("selected", &output.path);
        debug_value("selected_index", output.selected as f64);
        output
    }
}
