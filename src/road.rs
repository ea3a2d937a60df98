use crate::lane::{Lane, LaneAttributes};
use crate::math::{distance_squared, Pose};
use crate::waypoint::{WayPoint, WaypointRef};
use crate::LaneId;
use slotmap::SlotMap;
use smallvec::SmallVec;

/// Lane changes are weighted by this many metres when routing between lanes.
const LANE_CHANGE_ROUTE_COST: f64 = 10.0;

/// A road network: a set of lanes connected end to start and side by side.
///
/// The network owns the lanes. Waypoint links (fronts, backs, left, right)
/// are derived from lane connectivity on demand and handed out as
/// [WaypointRef] handles.
#[derive(Clone, Debug, Default)]
pub struct RoadNetwork {
    lanes: SlotMap<LaneId, Lane>,
}

impl RoadNetwork {
    /// Creates an empty road network.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a lane to the network.
    pub fn add_lane(&mut self, attributes: &LaneAttributes) -> LaneId {
        self.lanes.insert_with_key(|id| Lane::new(id, attributes))
    }

    /// Specifies that the end of the `from` lane connects to the start of the `to` lane.
    pub fn add_lane_connection(&mut self, from: LaneId, to: LaneId) {
        self.lanes[from].add_lane_out(to);
        self.lanes[to].add_lane_in(from);
    }

    /// Specifies that `left` runs alongside `right`, on its left hand side,
    /// and that lane changes are permitted in both directions.
    pub fn add_adjacent_lanes(&mut self, left: LaneId, right: LaneId) {
        self.lanes[right].set_left(left);
        self.lanes[left].set_right(right);
    }

    /// Gets a reference to the lane with the given ID.
    pub fn get_lane(&self, lane_id: LaneId) -> &Lane {
        &self.lanes[lane_id]
    }

    /// Returns an iterator over all the lanes in the network.
    pub fn iter_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Gets the waypoint referred to by a handle.
    pub fn waypoint(&self, wp: WaypointRef) -> &WayPoint {
        &self.lanes[wp.lane].points()[wp.index]
    }

    /// The waypoints that directly succeed `wp`: the next point on the same lane,
    /// or the first point of every successor lane when `wp` ends its lane.
    pub fn fronts(&self, wp: WaypointRef) -> SmallVec<[WaypointRef; 4]> {
        let lane = &self.lanes[wp.lane];
        if wp.index + 1 < lane.points().len() {
            return smallvec::smallvec![WaypointRef::new(wp.lane, wp.index + 1)];
        }
        lane.lanes_out()
            .iter()
            .filter(|id| !self.lanes[**id].points().is_empty())
            .map(|id| WaypointRef::new(*id, 0))
            .collect()
    }

    /// The waypoints that directly precede `wp`.
    pub fn backs(&self, wp: WaypointRef) -> SmallVec<[WaypointRef; 4]> {
        if wp.index > 0 {
            return smallvec::smallvec![WaypointRef::new(wp.lane, wp.index - 1)];
        }
        self.lanes[wp.lane]
            .lanes_in()
            .iter()
            .filter_map(|id| {
                let len = self.lanes[*id].points().len();
                (len > 0).then(|| WaypointRef::new(*id, len - 1))
            })
            .collect()
    }

    /// The waypoint of the left adjacent lane closest to `wp`.
    pub fn left(&self, wp: WaypointRef) -> Option<WaypointRef> {
        self.lanes[wp.lane]
            .left()
            .and_then(|id| self.closest_on_lane(id, &self.waypoint(wp).pose))
    }

    /// The waypoint of the right adjacent lane closest to `wp`.
    pub fn right(&self, wp: WaypointRef) -> Option<WaypointRef> {
        self.lanes[wp.lane]
            .right()
            .and_then(|id| self.closest_on_lane(id, &self.waypoint(wp).pose))
    }

    /// Finds the waypoint closest to `pose` across the whole network,
    /// provided it lies within `max_distance`.
    pub fn closest_waypoint(&self, pose: &Pose, max_distance: f64) -> Option<WaypointRef> {
        self.lanes
            .keys()
            .filter_map(|id| self.closest_on_lane(id, pose))
            .map(|wp| (wp, distance_squared(self.waypoint(wp).pos(), pose.pos)))
            .filter(|(_, d2)| *d2 <= max_distance * max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(wp, _)| wp)
    }

    /// Finds a sequence of lanes leading from `src` to `dst`, if one exists.
    /// Lanes are weighted by their length, lane changes by a fixed penalty.
    pub fn route_lanes(&self, src: LaneId, dst: LaneId) -> Option<Vec<LaneId>> {
        let result = pathfinding::directed::dijkstra::dijkstra(
            &src,
            |id| self.lane_successors(*id),
            |id| *id == dst,
        );
        result.map(|(route, _)| route)
    }

    fn lane_successors(&self, lane_id: LaneId) -> impl Iterator<Item = (LaneId, u64)> + '_ {
        let lane = &self.lanes[lane_id];
        let forward_cost = to_route_cost(lane.length());
        let change_cost = to_route_cost(LANE_CHANGE_ROUTE_COST);
        let forward = lane.lanes_out().iter().map(move |id| (*id, forward_cost));
        let sideways = lane
            .left()
            .into_iter()
            .chain(lane.right())
            .map(move |id| (id, change_cost));
        forward.chain(sideways)
    }

    fn closest_on_lane(&self, lane_id: LaneId, pose: &Pose) -> Option<WaypointRef> {
        let lane = &self.lanes[lane_id];
        if lane.points().is_empty() {
            return None;
        }
        let idx = lane.closest_point(pose);
        Some(WaypointRef::new(lane_id, idx))
    }
}

/// Converts a distance in m to an integer cost in cm.
fn to_route_cost(dist: f64) -> u64 {
    (100.0 * dist.max(0.0)) as u64
}
