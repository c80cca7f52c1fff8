//! Time-indexed A* over the route graph and reservation table.
//!
//! # Search model
//!
//! State = `(node, tick)`.  Two action types:
//!
//! - **WAIT** — stay put for one tick.  Blocked when the node is reserved by
//!   another agent at `t + 1`.
//! - **MOVE** — traverse an edge.  Cost is `ceil(distance / speed)` ticks,
//!   never zero.  Blocked when any tick along the traversal, or the arrival
//!   slot at the destination node, is reserved by another agent.
//!
//! Heuristic: Euclidean distance to the goal divided by speed — admissible
//! because no action sequence covers distance faster than a straight line at
//! full speed.
//!
//! # Commit
//!
//! The search itself never writes.  Once a full schedule exists (including
//! both legs of a detour), [`SpaceTimePlanner::plan`] clears the agent's
//! prior reservations and commits the new ones inside one exclusive borrow
//! of the table, so no observer ever sees a half-reserved plan.
//!
//! # Detours
//!
//! When the direct search exhausts its bounds, the planner retries through a
//! bounded number of intermediate nodes near the start-goal midpoint.  Legs
//! are searched with detours disabled, so the recursion is one level deep.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, instrument, trace};

use agv_core::{AgentId, EdgeKey, NodeId, Tick, Vec2};
use agv_graph::RouteGraph;
use agv_reserve::ReservationTable;

use crate::error::{PlanError, PlanResult};
use crate::plan::{DEFAULT_REACH_RADIUS, Plan, PlanRequest, Schedule, ScheduleEntry};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Tunables for [`SpaceTimePlanner`].  Timeouts are algorithmic — a bounded
/// expansion count and a bounded planning horizon — never wall-clock.
#[derive(Clone, Debug)]
pub struct SpaceTimeConfig {
    /// Upper bound on node expansions per search.
    pub max_expansions: usize,

    /// Prune states further than this many ticks past the departure tick.
    pub horizon_ticks: u64,

    /// Whether a failed direct search retries via midpoint detours.
    pub allow_detours: bool,

    /// How many midpoint-nearest candidate nodes a detour pass tries.
    pub detour_candidates: usize,
}

impl Default for SpaceTimeConfig {
    fn default() -> Self {
        Self {
            max_expansions:    15_000,
            horizon_ticks:     1_200,
            allow_detours:     true,
            detour_candidates: 5,
        }
    }
}

// ── Open-list entry ───────────────────────────────────────────────────────────

/// Open-list entry.  The ordering is load-bearing: ascending f-score, ties by
/// lowest node id, then by insertion order — pinned explicitly so schedules
/// are reproducible across platforms and std versions.
#[derive(Debug)]
struct OpenNode {
    f: f64,
    g: u64,
    node: NodeId,
    tick: Tick,
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

/// Time-aware planner producing schedules that are conflict-free against the
/// reservation table at call time.
#[derive(Default)]
pub struct SpaceTimePlanner {
    pub config: SpaceTimeConfig,
}

impl SpaceTimePlanner {
    pub fn new(config: SpaceTimeConfig) -> Self {
        Self { config }
    }

    /// Plan a conflict-free route and commit its reservations.
    ///
    /// On success the returned [`Plan`] carries the reserved [`Schedule`];
    /// the agent's previous reservations are gone.  On failure the table is
    /// untouched and the caller decides whether to retry, fall back, or
    /// fail-stop.
    #[instrument(skip_all, name = "space_time_plan", fields(agent = req.agent.0), level = "debug")]
    pub fn plan(
        &self,
        graph: &RouteGraph,
        table: &mut ReservationTable,
        req: &PlanRequest,
    ) -> PlanResult<Plan> {
        let from = graph.nearest_node(req.start).ok_or(PlanError::EmptyGraph)?;
        let to   = graph.nearest_node(req.goal).ok_or(PlanError::EmptyGraph)?;
        let speed = req.speed.max(0.1);

        // Entry deferral: the literal start position lies off the graph, so
        // the agent only occupies `from` once the schedule begins.  If
        // another agent holds that slot right now, depart when it frees
        // instead of claiming an occupied slot.
        let mut depart = req.start_tick;
        let horizon_end = req.start_tick + self.config.horizon_ticks;
        while !table.is_node_free(from, depart, req.agent) {
            depart = depart + 1;
            if depart > horizon_end {
                return Err(PlanError::NoRoute { from, to });
            }
        }

        if let Some(entries) = self.search(graph, table, req.agent, from, to, depart, speed) {
            return Ok(commit(graph, table, req, entries));
        }

        if self.config.allow_detours {
            debug!(from = from.0, to = to.0, "no direct window, trying midpoint detours");
            let mid = Vec2::midpoint(req.start, req.goal);
            let candidates: Vec<NodeId> = graph
                .k_nearest_nodes(mid, self.config.detour_candidates + 2)
                .into_iter()
                .filter(|&n| n != from && n != to)
                .take(self.config.detour_candidates)
                .collect();

            for via in candidates {
                let Some(leg1) =
                    self.search(graph, table, req.agent, from, via, depart, speed)
                else {
                    continue;
                };
                let Some(&joint) = leg1.last() else { continue };
                let Some(leg2) =
                    self.search(graph, table, req.agent, via, to, joint.tick, speed)
                else {
                    continue;
                };

                debug!(via = via.0, "detour found");
                let mut entries = leg1;
                entries.extend(leg2.into_iter().skip(1));
                return Ok(commit(graph, table, req, entries));
            }
        }

        Err(PlanError::NoRoute { from, to })
    }

    /// Reservation-respecting A* from `(from, depart)` to `to`.
    ///
    /// Read-only: returns the timed node sequence without committing it.
    fn search(
        &self,
        graph: &RouteGraph,
        table: &ReservationTable,
        agent: AgentId,
        from: NodeId,
        to: NodeId,
        depart: Tick,
        speed: f32,
    ) -> Option<Vec<ScheduleEntry>> {
        let goal_pos = graph.node_pos(to);
        let h = |n: NodeId| (graph.node_pos(n).distance(goal_pos) / speed) as f64;

        let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        let mut best_g:    HashMap<(NodeId, Tick), u64>            = HashMap::new();
        let mut came_from: HashMap<(NodeId, Tick), (NodeId, Tick)> = HashMap::new();
        let mut seq = 0u64;

        open.push(Reverse(OpenNode { f: h(from), g: 0, node: from, tick: depart, seq }));
        best_g.insert((from, depart), 0);

        let mut expansions = 0usize;
        while let Some(Reverse(current)) = open.pop() {
            let OpenNode { g, node, tick, .. } = current;

            expansions += 1;
            if expansions > self.config.max_expansions {
                trace!(expansions, "expansion bound hit");
                break;
            }

            if node == to {
                return Some(reconstruct(&came_from, node, tick));
            }

            // Skip stale heap entries.
            if best_g.get(&(node, tick)).is_some_and(|&bg| g > bg) {
                continue;
            }

            // Prune beyond the planning horizon.
            if tick - depart > self.config.horizon_ticks {
                continue;
            }

            // WAIT: hold this node for one tick.
            let wait_tick = tick + 1;
            if table.is_node_free(node, wait_tick, agent) {
                relax(
                    &mut open, &mut best_g, &mut came_from, &mut seq,
                    node, wait_tick, g + 1, (g + 1) as f64 + h(node), (node, tick),
                );
            }

            // MOVE to each neighbor, respecting edge and arrival reservations.
            for (nb, dist) in graph.neighbors(node) {
                let travel = ((dist / speed).ceil() as u64).max(1);
                let arrive = tick + travel;
                let edge = EdgeKey::new(node, nb);

                let blocked = (tick.0 + 1..=arrive.0)
                    .any(|t| !table.is_edge_free(edge, Tick(t), agent));
                if blocked || !table.is_node_free(nb, arrive, agent) {
                    continue;
                }

                relax(
                    &mut open, &mut best_g, &mut came_from, &mut seq,
                    nb, arrive, g + travel, (g + travel) as f64 + h(nb), (node, tick),
                );
            }
        }

        None
    }
}

// ── Search internals ──────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn relax(
    open: &mut BinaryHeap<Reverse<OpenNode>>,
    best_g: &mut HashMap<(NodeId, Tick), u64>,
    came_from: &mut HashMap<(NodeId, Tick), (NodeId, Tick)>,
    seq: &mut u64,
    node: NodeId,
    tick: Tick,
    g: u64,
    f: f64,
    parent: (NodeId, Tick),
) {
    let key = (node, tick);
    if best_g.get(&key).is_none_or(|&bg| g < bg) {
        best_g.insert(key, g);
        came_from.insert(key, parent);
        *seq += 1;
        open.push(Reverse(OpenNode { f, g, node, tick, seq: *seq }));
    }
}

fn reconstruct(
    came_from: &HashMap<(NodeId, Tick), (NodeId, Tick)>,
    node: NodeId,
    tick: Tick,
) -> Vec<ScheduleEntry> {
    let mut entries = vec![ScheduleEntry { node, tick }];
    let mut cur = (node, tick);
    while let Some(&prev) = came_from.get(&cur) {
        entries.push(ScheduleEntry { node: prev.0, tick: prev.1 });
        cur = prev;
    }
    entries.reverse();
    entries
}

/// Swap the agent's reservations for the new schedule and build the plan.
///
/// One exclusive borrow of the table covers both the clear and every
/// reserve, so the swap is atomic as far as any other code can observe.
fn commit(
    graph: &RouteGraph,
    table: &mut ReservationTable,
    req: &PlanRequest,
    entries: Vec<ScheduleEntry>,
) -> Plan {
    table.clear_agent(req.agent);

    for i in 0..entries.len() {
        let s = entries[i];
        table.reserve_node(s.node, s.tick, req.agent);

        if let Some(&s2) = entries.get(i + 1) {
            if s2.node != s.node {
                // Edge held for every traversal tick (exclusive of departure,
                // inclusive of arrival), plus the arrival slot itself.
                let edge = EdgeKey::new(s.node, s2.node);
                for t in s.tick.0 + 1..=s2.tick.0 {
                    table.reserve_edge(edge, Tick(t), req.agent);
                }
                table.reserve_node(s2.node, s2.tick, req.agent);
            }
        }
    }

    // Waypoints: literal start, node positions with waits collapsed, literal goal.
    let mut waypoints = Vec::with_capacity(entries.len() + 2);
    waypoints.push(req.start);
    let mut last: Option<NodeId> = None;
    for e in &entries {
        if last != Some(e.node) {
            waypoints.push(graph.node_pos(e.node));
            last = Some(e.node);
        }
    }
    waypoints.push(req.goal);

    Plan {
        waypoints,
        schedule: Some(Schedule::new(entries)),
        reach_radius: DEFAULT_REACH_RADIUS,
    }
}
