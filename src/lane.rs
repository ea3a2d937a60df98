use crate::math::{equidistant_points_along_curve, ParametricCurve2d, Pose};
use crate::path::{calc_angle_and_cost, closest_point_index};
use crate::waypoint::WayPoint;
use crate::LaneId;
use smallvec::SmallVec;

/// The spacing of the waypoints synthesized along a lane's centre line, in m.
const LANE_POINT_SPACING: f64 = 1.0;

/// A lane represents a single lane of traffic.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// A numeric designator, e.g. the lane's position counted from the kerb.
    num: i32,
    /// The centre line, with headings and arc length costs assigned.
    points: Vec<WayPoint>,
    /// The lanes that precede this one.
    lanes_in: SmallVec<[LaneId; 4]>,
    /// The lanes that succeed this one.
    lanes_out: SmallVec<[LaneId; 4]>,
    /// The adjacent lane on the left, if lane changes into it are allowed.
    left: Option<LaneId>,
    /// The adjacent lane on the right, if lane changes into it are allowed.
    right: Option<LaneId>,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// Width in m.
    width: f64,
}

/// The attributes of a lane.
pub struct LaneAttributes<'a> {
    /// A curve defining the centre line of the lane.
    pub curve: &'a dyn ParametricCurve2d,
    /// The speed limit in m/s.
    pub speed_limit: f64,
    /// The width of the lane in m.
    pub width: f64,
    /// A numeric designator for the lane.
    pub num: i32,
}

impl Lane {
    /// Creates a new lane.
    pub(crate) fn new(id: LaneId, attribs: &LaneAttributes) -> Self {
        let (points, _) = equidistant_points_along_curve(&attribs.curve, LANE_POINT_SPACING);
        let mut points = points
            .into_iter()
            .enumerate()
            .map(|(idx, pos)| WayPoint {
                velocity: attribs.speed_limit,
                lane_id: Some(id),
                id: idx,
                ..WayPoint::new(pos.x, pos.y, 0.0, 0.0)
            })
            .collect::<Vec<_>>();
        calc_angle_and_cost(&mut points, 0.0);

        Self {
            id,
            num: attribs.num,
            points,
            lanes_in: SmallVec::new(),
            lanes_out: SmallVec::new(),
            left: None,
            right: None,
            speed_limit: attribs.speed_limit,
            width: attribs.width,
        }
    }

    /// Gets the lane ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Gets the numeric designator of the lane.
    pub fn num(&self) -> i32 {
        self.num
    }

    /// Gets the length of the lane in m.
    pub fn length(&self) -> f64 {
        self.points.last().map(|p| p.cost).unwrap_or(0.0)
    }

    /// Gets the speed limit in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Gets the width in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Gets the waypoints along the lane's centre line.
    pub fn points(&self) -> &[WayPoint] {
        &self.points
    }

    /// Gets the lanes that succeed this one.
    pub fn lanes_out(&self) -> &[LaneId] {
        &self.lanes_out
    }

    /// Gets the lanes that precede this one.
    pub fn lanes_in(&self) -> &[LaneId] {
        &self.lanes_in
    }

    /// Gets the adjacent lane on the left.
    pub fn left(&self) -> Option<LaneId> {
        self.left
    }

    /// Gets the adjacent lane on the right.
    pub fn right(&self) -> Option<LaneId> {
        self.right
    }

    /// Finds the index of the waypoint closest to the given pose.
    pub fn closest_point(&self, pose: &Pose) -> usize {
        closest_point_index(&self.points, pose, Some(0))
    }

    /// Adds a successor lane.
    pub(crate) fn add_lane_out(&mut self, lane_id: LaneId) {
        self.lanes_out.push(lane_id);
    }

    /// Adds a predecessor lane.
    pub(crate) fn add_lane_in(&mut self, lane_id: LaneId) {
        self.lanes_in.push(lane_id);
    }

    /// Sets the adjacent lane on the left.
    pub(crate) fn set_left(&mut self, lane_id: LaneId) {
        self.left = Some(lane_id);
    }

    /// Sets the adjacent lane on the right.
    pub(crate) fn set_right(&mut self, lane_id: LaneId) {
        self.right = Some(lane_id);
    }
}
