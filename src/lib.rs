pub use cgmath;
pub use config::{PlannerParams, SearchParams, SmoothingParams};
pub use cost::{CostParams, DetectedObject, TrajectoryCost};
pub use error::{PlannerError, Result};
pub use follower::{BehaviorState, ControllerParams, PidGains, Shift, TrajectoryFollower, VehicleCommand};
pub use lane::{Lane, LaneAttributes};
pub use planner::{PlanOutput, Planner};
pub use road::RoadNetwork;
pub use rollout::{RollOutParams, RollOuts};
pub use search::{SearchOutcome, SearchTree};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use waypoint::{Direction, WayPoint, WaypointRef};

mod config;
pub mod cost;
mod debug;
mod error;
pub mod follower;
mod lane;
pub mod math;
pub mod path;
mod planner;
mod road;
pub mod rollout;
pub mod search;
mod util;
mod waypoint;

#[cfg(feature = "debug")]
pub use debug::take_debug_frame;

new_key_type! {
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a node synthesized during a lane graph search.
    pub struct NodeId;
}
