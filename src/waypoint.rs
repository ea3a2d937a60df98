use crate::math::{Point2d, Pose};
use crate::LaneId;

/// The manoeuvre taken to arrive at a waypoint, as recovered by a backward trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Continued along the same lane.
    #[default]
    Forward,
    /// Changed into the lane on the left.
    ForwardLeft,
    /// Changed into the lane on the right.
    ForwardRight,
}

/// A point on a lane, annotated with a velocity and an accumulated cost.
///
/// Waypoints are plain values: paths handed to consumers are copies and
/// are not tied to the lifetime of the lane graph they were taken from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WayPoint {
    /// The position and heading.
    pub pose: Pose,
    /// The signed speed in m/s.
    pub velocity: f64,
    /// The accumulated cost. Arc length for most path operations.
    pub cost: f64,
    /// The lane this waypoint was taken from, if any.
    pub lane_id: Option<LaneId>,
    /// The index of this waypoint within its lane.
    pub id: usize,
    /// How this waypoint was reached.
    pub dir: Direction,
}

impl WayPoint {
    /// Creates a waypoint with zero velocity and cost.
    pub fn new(x: f64, y: f64, z: f64, heading: f64) -> Self {
        Self::from_pose(Pose::new(x, y, z, heading))
    }

    /// Creates a waypoint at the given pose.
    pub fn from_pose(pose: Pose) -> Self {
        Self {
            pose,
            velocity: 0.0,
            cost: 0.0,
            lane_id: None,
            id: 0,
            dir: Direction::Forward,
        }
    }

    /// The planar position.
    #[inline(always)]
    pub fn pos(&self) -> Point2d {
        self.pose.pos
    }

    /// The heading in radians.
    #[inline(always)]
    pub fn heading(&self) -> f64 {
        self.pose.heading
    }

    /// Returns a copy of this waypoint moved to a new pose, keeping its annotations.
    pub fn with_pose(&self, pose: Pose) -> Self {
        Self { pose, ..*self }
    }

    /// Returns a copy of this waypoint with the given velocity.
    pub fn with_velocity(&self, velocity: f64) -> Self {
        Self { velocity, ..*self }
    }
}

impl Default for WayPoint {
    fn default() -> Self {
        Self::from_pose(Pose::default())
    }
}

/// A non-owning handle to a waypoint of a lane in a [RoadNetwork](crate::RoadNetwork).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaypointRef {
    /// The lane containing the waypoint.
    pub lane: LaneId,
    /// The index of the waypoint within the lane.
    pub index: usize,
}

impl WaypointRef {
    pub const fn new(lane: LaneId, index: usize) -> Self {
        Self { lane, index }
    }
}
