//! Cost guided searches over the lane graph.
//!
//! A search copies the waypoints it reaches into nodes of its own arena, so
//! the lane graph is never mutated. The nodes link back towards the start
//! node, and a path is recovered by following those links from a head node.

use crate::math::{angle_between_two_angles_positive, distance, fix_negative_angle, Pose};
use crate::road::RoadNetwork;
use crate::waypoint::{Direction, WayPoint, WaypointRef};
use crate::{LaneId, NodeId};
use itertools::Itertools;
use log::{debug, trace};
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::FRAC_PI_4;

/// Lane changes are discounted by this many metres, making the search favour them.
pub const LANE_CHANGE_DISCOUNT: f64 = 5.0;

/// A node within this distance of the goal, in m, may be the goal.
const GOAL_DISTANCE_TOLERANCE: f64 = 0.1;

/// A node reached by a search.
#[derive(Clone, Debug)]
pub struct SearchNode {
    /// The lane graph waypoint this node was copied from.
    pub source: WaypointRef,
    /// The copied waypoint, with its cost set to the cost of reaching it.
    pub point: WayPoint,
    /// The nodes this node was reached from by moving forward.
    pub backs: SmallVec<[NodeId; 2]>,
    /// Set when this node was reached by changing lane to the right.
    pub left: Option<NodeId>,
    /// Set when this node was reached by changing lane to the left.
    pub right: Option<NodeId>,
}

impl SearchNode {
    fn new(source: WaypointRef, point: WayPoint, cost: f64) -> Self {
        Self {
            source,
            point: WayPoint { cost, ..point },
            backs: SmallVec::new(),
            left: None,
            right: None,
        }
    }
}

/// The result of a goal search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The node found at the goal.
    GoalReached(NodeId),
    /// The search ran over its distance budget; the node being expanded at the time.
    Fallback(NodeId),
    /// The search ran out of nodes without finding the goal.
    Exhausted,
}

impl SearchOutcome {
    /// The node to trace a path back from, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::GoalReached(id) | Self::Fallback(id) => Some(*id),
            Self::Exhausted => None,
        }
    }
}

/// The arena of nodes produced by a search.
///
/// Dropping the tree releases every node of the search.
#[derive(Clone, Debug, Default)]
pub struct SearchTree {
    nodes: SlotMap<NodeId, SearchNode>,
    /// The node first created for each waypoint reached.
    visited: HashMap<WaypointRef, NodeId>,
    lanes: HashSet<LaneId>,
    root: Option<NodeId>,
    end_nodes: Vec<NodeId>,
}

impl SearchTree {
    /// Creates an empty search tree.
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets a node of the tree.
    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id]
    }

    /// The number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node the last search started from.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The nodes at the horizon of the last [predictive_expand](Self::predictive_expand).
    pub fn end_nodes(&self) -> &[NodeId] {
        &self.end_nodes
    }

    fn reset(&mut self, network: &RoadNetwork, start: WaypointRef) -> NodeId {
        self.nodes.clear();
        self.visited.clear();
        self.lanes.clear();
        self.end_nodes.clear();
        let root = self.insert(SearchNode::new(start, *network.waypoint(start), 0.0));
        self.root = Some(root);
        root
    }

    fn insert(&mut self, node: SearchNode) -> NodeId {
        let source = node.source;
        let id = self.nodes.insert(node);
        self.visited.entry(source).or_insert(id);
        self.lanes.insert(source.lane);
        id
    }

    /// Searches the lane graph from `start` for a waypoint matching `goal`.
    ///
    /// The cheapest node of the frontier is expanded first. Moving forward costs
    /// the distance travelled, changing lane costs the distance less
    /// [LANE_CHANGE_DISCOUNT]. A lane can be changed into only while the tree
    /// holds no node on it, and forward moves are only taken from the lanes in
    /// `preferred_lanes` (any lane if empty).
    ///
    /// Without preferred lanes, the search gives up once the summed cost of
    /// all expansions exceeds `distance_limit`, returning the node being
    /// expanded as a fallback.
    pub fn build_planning_search_tree(
        &mut self,
        network: &RoadNetwork,
        start: WaypointRef,
        goal: &Pose,
        preferred_lanes: &[LaneId],
        distance_limit: f64,
    ) -> SearchOutcome {
        let root = self.reset(network, start);
        let goal_heading = fix_negative_angle(goal.heading);
        let mut frontier = vec![root];
        let mut distance_sum = 0.0;

        while let Some(min_idx) = frontier
            .iter()
            .position_min_by(|a, b| self.nodes[**a].point.cost.total_cmp(&self.nodes[**b].point.cost))
        {
            let head_id = frontier.remove(min_idx);
            let head = self.nodes[head_id].clone();

            let distance_to_goal = distance(head.point.pos(), goal.pos);
            let angle_to_goal =
                angle_between_two_angles_positive(fix_negative_angle(head.point.heading()), goal_heading);
            if distance_to_goal <= GOAL_DISTANCE_TOLERANCE && angle_to_goal < FRAC_PI_4 {
                debug!(
                    "Goal found, lane: {:?}, distance: {:.3}, angle: {:.1}",
                    head.source.lane,
                    distance_to_goal,
                    angle_to_goal.to_degrees()
                );
                return SearchOutcome::GoalReached(head_id);
            }

            let sideways = [
                (network.left(head.source), Direction::ForwardLeft),
                (network.right(head.source), Direction::ForwardRight),
            ];
            for (side, dir) in sideways {
                let side = match side {
                    Some(side) if !self.lanes.contains(&side.lane) => side,
                    _ => continue,
                };
                let point = *network.waypoint(side);
                let d = distance(point.pos(), head.point.pos()) - LANE_CHANGE_DISCOUNT;
                distance_sum += d;
                let mut node = SearchNode::new(side, point, head.point.cost + d);
                match dir {
                    Direction::ForwardLeft => node.right = Some(head_id),
                    _ => node.left = Some(head_id),
                }
                trace!("Lane change {:?} into {:?}, cost {:.2}", dir, side.lane, node.point.cost);
                frontier.push(self.insert(node));
            }

            if preferred_lanes.is_empty() || preferred_lanes.contains(&head.source.lane) {
                for front in network.fronts(head.source) {
                    if let Some(&existing) = self.visited.get(&front) {
                        // A merge: the waypoint keeps the cost of its first arrival
                        if frontier.contains(&existing) && !self.nodes[existing].backs.contains(&head_id) {
                            self.nodes[existing].backs.push(head_id);
                        }
                        continue;
                    }
                    let point = *network.waypoint(front);
                    let d = distance(point.pos(), head.point.pos());
                    distance_sum += d;
                    let mut node = SearchNode::new(front, point, head.point.cost + d);
                    node.backs.push(head_id);
                    frontier.push(self.insert(node));
                }
            }

            if distance_sum > distance_limit && preferred_lanes.is_empty() {
                debug!(
                    "Goal not found, lane: {:?}, distance: {:.1}",
                    head.source.lane, distance_sum
                );
                return SearchOutcome::Fallback(head_id);
            }
        }

        debug!("Goal not found, search exhausted after {} nodes", self.nodes.len());
        SearchOutcome::Exhausted
    }

    /// Expands forward from `start`, breadth first, until each branch reaches a
    /// cost of `distance_limit`. Lane changes are not considered.
    ///
    /// A node that reached the limit with successors left unexplored becomes an
    /// end node. Returns the number of end nodes.
    pub fn predictive_expand(&mut self, network: &RoadNetwork, start: WaypointRef, distance_limit: f64) -> usize {
        let root = self.reset(network, start);
        let mut queue = VecDeque::from([root]);

        while let Some(head_id) = queue.pop_front() {
            let head = self.nodes[head_id].clone();
            for front in network.fronts(head.source) {
                if self.visited.contains_key(&front) {
                    continue;
                }
                if head.point.cost < distance_limit {
                    let point = *network.waypoint(front);
                    let d = distance(point.pos(), head.point.pos());
                    let mut node = SearchNode::new(front, point, head.point.cost + d);
                    node.backs.push(head_id);
                    queue.push_back(self.insert(node));
                } else if !self.end_nodes.contains(&head_id) {
                    self.end_nodes.push(head_id);
                }
            }
        }

        trace!("Predictive expansion found {} end nodes", self.end_nodes.len());
        self.end_nodes.len()
    }

    /// Picks the cheapest of `backs` on one of `allowed_lanes` (any lane if empty),
    /// defaulting to the first when none is allowed.
    fn min_cost_back(&self, backs: &[NodeId], allowed_lanes: &[LaneId]) -> NodeId {
        backs
            .iter()
            .filter(|id| allowed_lanes.is_empty() || allowed_lanes.contains(&self.nodes[**id].source.lane))
            .min_by(|a, b| self.nodes[**a].point.cost.total_cmp(&self.nodes[**b].point.cost))
            .copied()
            .unwrap_or(backs[0])
    }

    /// Recovers the path leading from `start` to `head`, excluding `start`.
    ///
    /// Follows the cheapest back link where there is one; otherwise follows a
    /// lane change link, provided the node's cost is positive. Each waypoint is
    /// tagged with the manoeuvre that reached it. The path is returned in
    /// forward order.
    pub fn traverse_path_tree_backwards(
        &self,
        head: NodeId,
        start: NodeId,
        allowed_lanes: &[LaneId],
    ) -> Vec<WayPoint> {
        let mut path = Vec::new();
        let mut current = head;

        while current != start {
            let node = &self.nodes[current];
            let positive = node.point.cost > 0.0;
            let (next, dir) = if !node.backs.is_empty() {
                (self.min_cost_back(&node.backs, allowed_lanes), Direction::Forward)
            } else if let (Some(left), true) = (node.left, positive) {
                (left, Direction::ForwardRight)
            } else if let (Some(right), true) = (node.right, positive) {
                (right, Direction::ForwardLeft)
            } else {
                break;
            };
            path.push(WayPoint { dir, ..node.point });
            current = next;
        }

        path.reverse();
        path
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lane::LaneAttributes;
    use crate::math::{LineSegment2d, Point2d};
    use assert_approx_eq::assert_approx_eq;

    fn lane(network: &mut RoadNetwork, from: (f64, f64), to: (f64, f64)) -> LaneId {
        network.add_lane(&LaneAttributes {
            curve: &LineSegment2d::from_ends(Point2d::new(from.0, from.1), Point2d::new(to.0, to.1)),
            speed_limit: 10.0,
            width: 3.0,
            num: 0,
        })
    }

    fn last(network: &RoadNetwork, lane: LaneId) -> WaypointRef {
        WaypointRef::new(lane, network.get_lane(lane).points().len() - 1)
    }

    #[test]
    fn single_lane_cost_is_the_distance() {
        let mut network = RoadNetwork::new();
        let a = lane(&mut network, (0.0, 0.0), (20.0, 0.0));
        let goal = network.waypoint(last(&network, a)).pose;

        let mut tree = SearchTree::new();
        let outcome = tree.build_planning_search_tree(&network, WaypointRef::new(a, 0), &goal, &[], 1000.0);
        let goal_id = match outcome {
            SearchOutcome::GoalReached(id) => id,
            other => panic!("{:?}", other),
        };

        let summed = network
            .get_lane(a)
            .points()
            .windows(2)
            .map(|w| distance(w[0].pos(), w[1].pos()))
            .sum::<f64>();
        assert_approx_eq!(tree.node(goal_id).point.cost, summed);

        let path = tree.traverse_path_tree_backwards(goal_id, tree.root().unwrap(), &[]);
        assert_eq!(path.len(), network.get_lane(a).points().len() - 1);
        assert!(path.iter().all(|p| p.dir == Direction::Forward));
        assert_approx_eq!(path.last().unwrap().cost, summed);
        assert_approx_eq!(path[0].pos().x, 1.0);
    }

    #[test]
    fn lane_change_is_tagged() {
        let mut network = RoadNetwork::new();
        let a = lane(&mut network, (0.0, 0.0), (10.0, 0.0));
        let b = lane(&mut network, (0.0, 6.0), (10.0, 6.0));
        network.add_adjacent_lanes(b, a);
        let goal = network.waypoint(last(&network, b)).pose;

        let mut tree = SearchTree::new();
        let outcome = tree.build_planning_search_tree(&network, WaypointRef::new(a, 0), &goal, &[], 1000.0);
        assert!(matches!(outcome, SearchOutcome::GoalReached(_)));

        let path = tree.traverse_path_tree_backwards(outcome.node().unwrap(), tree.root().unwrap(), &[]);
        assert_eq!(path.len(), 11);
        assert_eq!(path[0].dir, Direction::ForwardLeft);
        assert_eq!(path[0].lane_id, Some(b));
        assert!(path[1..].iter().all(|p| p.dir == Direction::Forward && p.lane_id == Some(b)));
        assert_approx_eq!(path[0].cost, 6.0 - LANE_CHANGE_DISCOUNT);
    }

    #[test]
    fn distance_limit_falls_back() {
        let mut network = RoadNetwork::new();
        let a = lane(&mut network, (0.0, 0.0), (100.0, 0.0));
        let goal = Pose::new(500.0, 500.0, 0.0, 0.0);

        let mut tree = SearchTree::new();
        let outcome = tree.build_planning_search_tree(&network, WaypointRef::new(a, 0), &goal, &[], 10.0);
        let id = match outcome {
            SearchOutcome::Fallback(id) => id,
            other => panic!("{:?}", other),
        };
        let cost = tree.node(id).point.cost;
        assert!(cost >= 9.0 && cost <= 11.0, "cost = {}", cost);
    }

    #[test]
    fn loops_terminate() {
        let mut network = RoadNetwork::new();
        let a = lane(&mut network, (0.0, 0.0), (10.0, 0.0));
        let b = lane(&mut network, (10.0, 0.0), (0.0, 0.0));
        network.add_lane_connection(a, b);
        network.add_lane_connection(b, a);
        let goal = Pose::new(50.0, 50.0, 0.0, 0.0);

        let mut tree = SearchTree::new();
        let outcome =
            tree.build_planning_search_tree(&network, WaypointRef::new(a, 0), &goal, &[a, b], f64::INFINITY);
        assert_eq!(outcome, SearchOutcome::Exhausted);
        let points = network.iter_lanes().map(|l| l.points().len()).sum::<usize>();
        assert_eq!(tree.len(), points);
    }

    #[test]
    fn preferred_lanes_restrict_forward_moves() {
        let mut network = RoadNetwork::new();
        let a = lane(&mut network, (0.0, 0.0), (10.0, 0.0));
        let b = lane(&mut network, (10.0, 0.0), (20.0, 0.0));
        network.add_lane_connection(a, b);
        let goal = network.waypoint(last(&network, b)).pose;

        let mut tree = SearchTree::new();
        let outcome = tree.build_planning_search_tree(&network, WaypointRef::new(a, 0), &goal, &[b], 1000.0);
        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(tree.len(), 1);

        let outcome = tree.build_planning_search_tree(&network, WaypointRef::new(a, 0), &goal, &[a, b], 1000.0);
        assert!(matches!(outcome, SearchOutcome::GoalReached(_)));
    }

    #[test]
    fn predictive_expansion_end_nodes() {
        let mut network = RoadNetwork::new();
        let a = lane(&mut network, (0.0, 0.0), (30.0, 0.0));
        let b = lane(&mut network, (30.0, 0.0), (50.0, 0.0));
        let c = lane(&mut network, (30.0, 0.0), (30.0, 20.0));
        network.add_lane_connection(a, b);
        network.add_lane_connection(a, c);

        let mut tree = SearchTree::new();
        assert_eq!(tree.predictive_expand(&network, WaypointRef::new(a, 0), 25.5), 1);
        assert_approx_eq!(tree.node(tree.end_nodes()[0]).point.cost, 26.0);

        assert_eq!(tree.predictive_expand(&network, WaypointRef::new(a, 0), 40.5), 2);
        for id in tree.end_nodes() {
            assert_approx_eq!(tree.node(*id).point.cost, 41.0);
        }

        // Dead ends are not end nodes
        assert_eq!(tree.predictive_expand(&network, WaypointRef::new(a, 0), 1000.0), 0);
    }

    #[test]
    fn merge_keeps_every_predecessor() {
        let mut network = RoadNetwork::new();
        let s = lane(&mut network, (0.0, 0.0), (10.0, 0.0));
        let a = lane(&mut network, (11.0, 1.0), (20.0, 1.0));
        let b = lane(&mut network, (11.0, -1.5), (20.0, -1.5));
        let m = lane(&mut network, (22.0, 0.0), (40.0, 0.0));
        network.add_lane_connection(s, a);
        network.add_lane_connection(s, b);
        network.add_lane_connection(a, m);
        network.add_lane_connection(b, m);
        let goal = network.waypoint(last(&network, m)).pose;

        let mut tree = SearchTree::new();
        let outcome = tree.build_planning_search_tree(&network, WaypointRef::new(s, 0), &goal, &[], 1000.0);
        let head = match outcome {
            SearchOutcome::GoalReached(id) => id,
            other => panic!("{:?}", other),
        };

        let merge = tree
            .nodes
            .values()
            .find(|n| n.source == WaypointRef::new(m, 0))
            .unwrap();
        assert_eq!(merge.backs.len(), 2);
        // The cost comes from the shorter branch
        let via_a = tree.node(merge.backs[0]).point.cost + distance(Point2d::new(20.0, 1.0), Point2d::new(22.0, 0.0));
        assert_approx_eq!(merge.point.cost, via_a, 0.05);

        let root = tree.root().unwrap();
        let cheapest = tree.traverse_path_tree_backwards(head, root, &[]);
        assert!(cheapest.iter().any(|p| p.lane_id == Some(a)));
        assert!(cheapest.iter().all(|p| p.lane_id != Some(b)));

        let preferred = tree.traverse_path_tree_backwards(head, root, &[s, b, m]);
        assert!(preferred.iter().any(|p| p.lane_id == Some(b)));
        assert!(preferred.iter().all(|p| p.lane_id != Some(a)));
        assert_eq!(preferred.first().map(|p| p.lane_id), Some(Some(s)));
        assert_eq!(preferred.last(), cheapest.last());
    }
}
