//! Plain distance-weighted A* over the static graph — the fallback planner.
//!
//! No time dimension: an edge held in the legacy [`SpatialReservationSet`]
//! by another agent is excluded outright, and an edge free at planning time
//! is assumed free for the whole traversal.  That assumption is strictly
//! weaker than the space-time planner's guarantee, which is why the FSM's
//! local avoidance stays on even when every agent planned successfully.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use tracing::instrument;

use agv_core::{AgentId, EdgeKey, NodeId, Tick};
use agv_graph::RouteGraph;
use agv_reserve::SpatialReservationSet;

use crate::error::{PlanError, PlanResult};
use crate::plan::{DEFAULT_REACH_RADIUS, Plan, PlanRequest, limit_waypoints};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Tunables for [`SpatialPlanner`].
#[derive(Clone, Debug, Default)]
pub struct SpatialConfig {
    /// Cap the returned waypoint list via [`limit_waypoints`].  `None`
    /// returns the full node sequence.
    pub max_waypoints: Option<usize>,
}

// ── Open-list entry ───────────────────────────────────────────────────────────

/// Same pinned ordering as the space-time search: f, lowest node id,
/// insertion order.
#[derive(Debug)]
struct OpenNode {
    f: f64,
    g: f64,
    node: NodeId,
    seq: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f
            .total_cmp(&other.f)
            .then_with(|| self.node.0.cmp(&other.node.0))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

// ── Planner ───────────────────────────────────────────────────────────────────

/// Distance-weighted A* avoiding edges held by other agents.
#[derive(Default)]
pub struct SpatialPlanner {
    pub config: SpatialConfig,
}

impl SpatialPlanner {
    pub fn new(config: SpatialConfig) -> Self {
        Self { config }
    }

    /// Plan a route over the static graph and hold its edges in `holds`.
    ///
    /// The returned plan carries no schedule — followers steer through the
    /// waypoints at their own pace.
    #[instrument(skip_all, name = "spatial_plan", fields(agent = req.agent.0), level = "debug")]
    pub fn plan(
        &self,
        graph: &RouteGraph,
        holds: &mut SpatialReservationSet,
        req: &PlanRequest,
    ) -> PlanResult<Plan> {
        let from = graph.nearest_node(req.start).ok_or(PlanError::EmptyGraph)?;
        let to   = graph.nearest_node(req.goal).ok_or(PlanError::EmptyGraph)?;

        let nodes = search(graph, holds, req.agent, from, to, req.start_tick)
            .ok_or(PlanError::NoRoute { from, to })?;

        // Swap the agent's holds for the chosen lanes.
        holds.clear_agent(req.agent);
        holds.reserve_path(&nodes, req.agent, req.start_tick);

        let mut waypoints = Vec::with_capacity(nodes.len() + 2);
        waypoints.push(req.start);
        waypoints.extend(nodes.iter().map(|&n| graph.node_pos(n)));
        waypoints.push(req.goal);

        let waypoints = match self.config.max_waypoints {
            Some(k) => limit_waypoints(&waypoints, k),
            None => waypoints,
        };

        Ok(Plan { waypoints, schedule: None, reach_radius: DEFAULT_REACH_RADIUS })
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

fn search(
    graph: &RouteGraph,
    holds: &SpatialReservationSet,
    agent: AgentId,
    from: NodeId,
    to: NodeId,
    now: Tick,
) -> Option<Vec<NodeId>> {
    let goal_pos = graph.node_pos(to);
    let h = |n: NodeId| graph.node_pos(n).distance(goal_pos) as f64;

    let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut best_g:    HashMap<NodeId, f64>    = HashMap::new();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut seq = 0u64;

    open.push(Reverse(OpenNode { f: h(from), g: 0.0, node: from, seq }));
    best_g.insert(from, 0.0);

    while let Some(Reverse(current)) = open.pop() {
        let OpenNode { g, node, .. } = current;

        if node == to {
            let mut nodes = vec![node];
            let mut cur = node;
            while let Some(&prev) = came_from.get(&cur) {
                nodes.push(prev);
                cur = prev;
            }
            nodes.reverse();
            return Some(nodes);
        }

        // Skip stale heap entries.
        if best_g.get(&node).is_some_and(|&bg| g > bg) {
            continue;
        }

        for (nb, dist) in graph.neighbors(node) {
            if holds.is_edge_blocked(EdgeKey::new(node, nb), agent, now) {
                continue;
            }
            let g2 = g + dist as f64;
            if best_g.get(&nb).is_none_or(|&bg| g2 < bg) {
                best_g.insert(nb, g2);
                came_from.insert(nb, node);
                seq += 1;
                open.push(Reverse(OpenNode { f: g2 + h(nb), g: g2, node: nb, seq }));
            }
        }
    }

    None
}
