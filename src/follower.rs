//! A pure pursuit style controller that follows a planned path.

use crate::math::{split_positive_angle, Pose};
use crate::path::{
    closest_next_point_index, next_point_on_trajectory, perp_distance_to_trajectory_simple,
    perpendicular_on_trajectory, velocity_ahead,
};
use crate::util::Interval;
use crate::waypoint::WayPoint;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// The gains of a PID controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Parameters of the trajectory follower.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerParams {
    /// How far ahead of the vehicle the pursuit point is placed, in m.
    pub pursuit_distance: f64,
    /// The steering angle limit, in radians.
    pub max_steer_angle: f64,
    /// Gains of the steering controller, acting on the heading error.
    pub steer_gains: PidGains,
    /// The distance between the axles, in m.
    pub wheel_base: f64,
    /// The speed limit, in m/s.
    pub max_speed: f64,
    /// The maximum acceleration, in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The comfortable deceleration, in m/s<sup>2</sup>.
    pub comf_deceleration: f64,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            pursuit_distance: 5.0,
            max_steer_angle: 0.45,
            steer_gains: PidGains {
                kp: 1.5,
                ki: 0.0,
                kd: 0.0,
            },
            wheel_base: 2.7,
            max_speed: 15.0,
            max_acceleration: 2.0,
            comf_deceleration: 3.0,
        }
    }
}

/// A PID controller with an optional output limit.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    limit: Option<Interval<f64>>,
    accum_err: f64,
    prev_err: f64,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            limit: None,
            accum_err: 0.0,
            prev_err: 0.0,
        }
    }

    /// Clamps the output to `[lower, upper]`.
    pub fn set_limit(&mut self, upper: f64, lower: f64) {
        self.limit = Some(Interval::spanning(lower, upper));
    }

    /// Clears the integral and derivative state.
    pub fn reset(&mut self) {
        self.accum_err = 0.0;
        self.prev_err = 0.0;
    }

    /// Computes the control output for an error.
    pub fn get_pid(&mut self, err: f64) -> f64 {
        self.accum_err += err;
        let PidGains { kp, ki, kd } = self.gains;
        let out = kp * err + ki * self.accum_err + kd * (err - self.prev_err);
        self.prev_err = err;
        match self.limit {
            Some(limit) => out.clamp(limit.min, limit.max),
            None => out,
        }
    }
}

/// The behaviour requested of the follower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BehaviorState {
    /// Follow the path.
    Forward,
    /// Come to a stop, staying in gear.
    Stopping,
    /// Stand still in neutral.
    #[default]
    Stopped,
}

/// The gear selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shift {
    Drive,
    #[default]
    Neutral,
}

/// The commands sent to the vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleCommand {
    /// The desired speed, in m/s.
    pub speed: f64,
    /// The desired steering angle, in radians.
    pub steer: f64,
    pub shift: Shift,
}

/// Follows a path by steering towards a pursuit point ahead of the vehicle.
#[derive(Clone, Debug)]
pub struct TrajectoryFollower {
    params: ControllerParams,
    path: Vec<WayPoint>,
    pid_steer: PidController,
    prev_steer: f64,
    curr_pose: Pose,
    prev_waypoint: Option<usize>,
    follow_me_point: WayPoint,
    perpendicular_point: WayPoint,
    lateral_error: f64,
    following_distance: f64,
}

impl TrajectoryFollower {
    pub fn new(params: ControllerParams) -> Self {
        let mut pid_steer = PidController::new(params.steer_gains);
        pid_steer.set_limit(params.max_steer_angle, -params.max_steer_angle);
        Self {
            params,
            path: vec![],
            pid_steer,
            prev_steer: 0.0,
            curr_pose: Pose::default(),
            prev_waypoint: None,
            follow_me_point: WayPoint::default(),
            perpendicular_point: WayPoint::default(),
            lateral_error: 0.0,
            following_distance: 0.0,
        }
    }

    /// Replaces the path being followed.
    pub fn update_current_path(&mut self, path: &[WayPoint]) {
        self.path = path.to_vec();
    }

    /// The path being followed.
    pub fn path(&self) -> &[WayPoint] {
        &self.path
    }

    /// The point the vehicle is steering towards.
    pub fn follow_me_point(&self) -> &WayPoint {
        &self.follow_me_point
    }

    /// The foot of the perpendicular from the vehicle to the path.
    pub fn perpendicular_point(&self) -> &WayPoint {
        &self.perpendicular_point
    }

    /// The signed lateral distance between the vehicle and the path.
    pub fn lateral_error(&self) -> f64 {
        self.lateral_error
    }

    /// The distance along the path from the perpendicular point to the pursuit point.
    pub fn following_distance(&self) -> f64 {
        self.following_distance
    }

    /// The index of the path point ahead of the vehicle, as of the last update.
    pub fn next_waypoint_index(&self) -> Option<usize> {
        self.prev_waypoint
    }

    /// Locates the vehicle on the path and places the pursuit point.
    /// Returns false if there is no path.
    pub fn prepare_next_waypoint(&mut self, pose: &Pose) -> bool {
        self.curr_pose = *pose;
        if self.path.is_empty() {
            return false;
        }

        self.following_distance = self.params.pursuit_distance + 1.0;
        let idx = closest_next_point_index(&self.path, pose, Some(0));
        self.prev_waypoint = Some(idx);

        let perp = perpendicular_on_trajectory(&self.path, pose, Some(idx));
        self.perpendicular_point = perp.point;
        self.lateral_error = perp_distance_to_trajectory_simple(&self.path, pose, Some(idx));
        if let Some(point) = next_point_on_trajectory(&self.path, self.following_distance - perp.along, idx) {
            self.follow_me_point = point;
        }
        true
    }

    /// Computes the steering angle towards the pursuit point. Keeps the previous
    /// angle when the pursuit point lies behind the vehicle.
    pub fn steer_controller_update(&mut self) -> f64 {
        if self.path.is_empty() {
            return self.prev_steer;
        }
        let (pose, target) = (self.curr_pose, self.follow_me_point);
        if let Some(steer) = self.steer_controller_part(&pose, &target) {
            self.prev_steer = steer;
        }
        self.prev_steer
    }

    fn steer_controller_part(&mut self, pose: &Pose, target: &WayPoint) -> Option<f64> {
        let current_a = split_positive_angle(pose.heading);
        let delta = target.pos() - pose.pos;
        let target_a = delta.y.atan2(delta.x);
        let e = split_positive_angle(target_a - current_a);
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&e) {
            return None;
        }
        Some(self.pid_steer.get_pid(e))
    }

    /// Computes the speed to drive at: the lowest speed on the path within the
    /// pursuit distance, capped at the speed limit and reached at a bounded rate.
    pub fn velocity_controller_update(&self, dt: f64, current_speed: f64) -> f64 {
        let target = velocity_ahead(&self.path, &self.curr_pose, self.params.pursuit_distance)
            .clamp(0.0, self.params.max_speed);
        let change = Interval::new(-self.params.comf_deceleration * dt, self.params.max_acceleration * dt);
        current_speed + (target - current_speed).clamp(change.min, change.max)
    }

    /// Advances the controller by one step of `dt` seconds.
    pub fn do_one_step(
        &mut self,
        dt: f64,
        behavior: BehaviorState,
        path: &[WayPoint],
        pose: &Pose,
        current_speed: f64,
        new_trajectory: bool,
    ) -> VehicleCommand {
        if new_trajectory && !path.is_empty() {
            self.prev_waypoint = None;
            self.update_current_path(path);
        }

        match behavior {
            BehaviorState::Forward => {
                if !self.prepare_next_waypoint(pose) {
                    return VehicleCommand::default();
                }
                VehicleCommand {
                    speed: self.velocity_controller_update(dt, current_speed),
                    steer: self.steer_controller_update(),
                    shift: Shift::Drive,
                }
            }
            BehaviorState::Stopping => VehicleCommand {
                speed: 0.0,
                steer: self.prev_steer,
                shift: Shift::Drive,
            },
            BehaviorState::Stopped => VehicleCommand {
                speed: 0.0,
                steer: self.prev_steer,
                shift: Shift::Neutral,
            },
        }
    }
}

/// Moves a vehicle forward by `dt` seconds using a kinematic bicycle model.
pub fn predict_motion(pose: &Pose, steering: f64, velocity: f64, wheel_base: f64, dt: f64) -> Pose {
    let step = velocity * dt;
    Pose {
        pos: pose.pos + step * pose.direction(),
        heading: pose.heading + step * steering.tan() / wheel_base,
        z: pose.z,
    }
}
