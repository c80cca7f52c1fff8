//! Unit tests for agv-plan.

use agv_core::{AgentId, NodeId, Tick, Vec2};
use agv_graph::{RouteGraph, RouteGraphBuilder};
use agv_reserve::{ReservationTable, SpatialReservationSet};

use crate::error::PlanError;
use crate::plan::{PlanRequest, Schedule, limit_waypoints};
use crate::space_time::{SpaceTimeConfig, SpaceTimePlanner};
use crate::spatial::SpatialPlanner;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Straight line of `n` nodes spaced 100 apart: 0 — 1 — 2 — …
fn line_graph(n: usize) -> RouteGraph {
    let mut b = RouteGraphBuilder::new();
    let ids: Vec<NodeId> = (0..n)
        .map(|i| b.add_node(Vec2::new(i as f32 * 100.0, 0.0)))
        .collect();
    for pair in ids.windows(2) {
        b.add_link(pair[0], pair[1]);
    }
    b.build()
}

fn request(agent: u32, start: Vec2, goal: Vec2, speed: f32, start_tick: u64) -> PlanRequest {
    PlanRequest {
        agent: AgentId(agent),
        start,
        goal,
        speed,
        start_tick: Tick(start_tick),
    }
}

/// Assert every consecutive schedule step is a legal wait or move.
fn assert_schedule_valid(graph: &RouteGraph, schedule: &Schedule, speed: f32) {
    for pair in schedule.entries.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        assert!(b.tick > a.tick, "ticks must strictly increase");
        if a.node == b.node {
            assert_eq!(b.tick - a.tick, 1, "waits advance exactly one tick");
        } else {
            let dist = graph
                .neighbors(a.node)
                .find(|&(nb, _)| nb == b.node)
                .map(|(_, d)| d)
                .expect("consecutive schedule nodes must be edge-connected");
            let expected = ((dist / speed).ceil() as u64).max(1);
            assert_eq!(b.tick - a.tick, expected, "move duration is ceil(dist/speed)");
        }
    }
}

// ── Space-time planner ────────────────────────────────────────────────────────

#[cfg(test)]
mod space_time {
    use super::*;

    #[test]
    fn two_nodes_schedule_is_exact() {
        // Two nodes 100 apart, one edge, speed 10, start tick 0
        // → schedule [(A, 0), (B, 10)].
        let graph = line_graph(2);
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();

        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 10.0, 0);
        let plan = planner.plan(&graph, &mut table, &req).unwrap();

        let schedule = plan.schedule.unwrap();
        assert_eq!(schedule.entries.len(), 2);
        assert_eq!(schedule.entries[0].node, NodeId(0));
        assert_eq!(schedule.entries[0].tick, Tick(0));
        assert_eq!(schedule.entries[1].node, NodeId(1));
        assert_eq!(schedule.entries[1].tick, Tick(10));
    }

    #[test]
    fn commit_reserves_every_visited_tick() {
        let graph = line_graph(2);
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();

        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 10.0, 0);
        planner.plan(&graph, &mut table, &req).unwrap();

        // Departure and arrival node slots.
        assert_eq!(table.node_holder(NodeId(0), Tick(0)), Some(AgentId(0)));
        assert_eq!(table.node_holder(NodeId(1), Tick(10)), Some(AgentId(0)));
        // Edge slots for ticks 1..=10.
        let edge = agv_core::EdgeKey::new(NodeId(0), NodeId(1));
        for t in 1..=10 {
            assert_eq!(table.edge_holder(edge, Tick(t)), Some(AgentId(0)));
        }
        assert!(table.edge_holder(edge, Tick(11)).is_none());
    }

    #[test]
    fn blocked_slot_forces_wait_and_never_coholds() {
        // Agent 1 holds the middle node at the exact tick agent 2 would
        // arrive.  Agent 2 must wait (or detour) and must never co-hold the
        // slot.
        let graph = line_graph(3);
        let mut table = ReservationTable::new();
        let middle = NodeId(1);
        table.reserve_node(middle, Tick(5), AgentId(1));

        let planner = SpaceTimePlanner::default();
        // Speed 20 → direct arrival at the middle node would be tick 5.
        let req = request(2, Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0), 20.0, 0);
        let plan = planner.plan(&graph, &mut table, &req).unwrap();

        let schedule = plan.schedule.unwrap();
        assert_schedule_valid(&graph, &schedule, 20.0);
        // The contested slot still belongs to agent 1 alone.
        assert_eq!(table.node_holder(middle, Tick(5)), Some(AgentId(1)));
        assert!(!schedule.entries.contains(&crate::plan::ScheduleEntry { node: middle, tick: Tick(5) }));
        // Goal reached.
        assert_eq!(schedule.entries.last().unwrap().node, NodeId(2));
        // Waiting delayed it past the unobstructed 10-tick journey.
        assert!(schedule.duration() > 10);
    }

    #[test]
    fn serialized_plans_never_overlap() {
        // Three agents pushed through the same corridor one after another —
        // the commit of each must be visible to the next (this is the fleet's
        // serialization contract).  Exclusivity also trips the debug_assert
        // in reserve_* if violated.
        let graph = line_graph(4);
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();

        let mut schedules = Vec::new();
        for agent in 0..3u32 {
            let req = request(agent, Vec2::new(0.0, 0.0), Vec2::new(300.0, 0.0), 10.0, 0);
            let plan = planner.plan(&graph, &mut table, &req).unwrap();
            schedules.push(plan.schedule.unwrap());
        }

        for (i, a) in schedules.iter().enumerate() {
            assert_schedule_valid(&graph, a, 10.0);
            for b in schedules.iter().skip(i + 1) {
                for ea in &a.entries {
                    assert!(
                        !b.entries.contains(ea),
                        "two agents share state {ea:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn replan_after_clear_is_idempotent() {
        let graph = line_graph(5);
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();
        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(400.0, 0.0), 10.0, 0);

        let first = planner.plan(&graph, &mut table, &req).unwrap();
        let baseline = first.schedule.unwrap().duration();

        table.clear_agent(AgentId(0));
        let second = planner.plan(&graph, &mut table, &req).unwrap();
        let retry = second.schedule.unwrap().duration();

        // Unchanged world → no worse than the unreserved-graph cost.
        assert!(retry <= baseline);
        assert_eq!(retry, baseline);
    }

    #[test]
    fn same_node_trip_is_single_state() {
        let graph = line_graph(2);
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();

        // Start and goal both snap to node 0.
        let req = request(0, Vec2::new(1.0, 1.0), Vec2::new(2.0, -1.0), 10.0, 7);
        let plan = planner.plan(&graph, &mut table, &req).unwrap();
        let schedule = plan.schedule.unwrap();
        assert_eq!(schedule.entries.len(), 1);
        assert_eq!(schedule.entries[0].tick, Tick(7));
    }

    #[test]
    fn waits_collapse_in_waypoints() {
        let graph = line_graph(3);
        let mut table = ReservationTable::new();
        // Force a wait: block the middle node at the direct arrival tick.
        table.reserve_node(NodeId(1), Tick(10), AgentId(9));

        let planner = SpaceTimePlanner::default();
        // Start and goal slightly off their snap nodes so every waypoint
        // position is distinct.
        let req = request(0, Vec2::new(5.0, 0.0), Vec2::new(195.0, 0.0), 10.0, 0);
        let plan = planner.plan(&graph, &mut table, &req).unwrap();

        let schedule = plan.schedule.as_ref().unwrap();
        assert!(schedule.len() > 3, "blocking forces at least one wait state");

        // Waypoints: start + one position per distinct node + goal, waits gone.
        let mut deduped = plan.waypoints.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), plan.waypoints.len(), "no consecutive duplicates");
        assert_eq!(plan.waypoints.first().copied(), Some(Vec2::new(5.0, 0.0)));
        assert_eq!(plan.waypoints.last().copied(), Some(Vec2::new(195.0, 0.0)));
        assert_eq!(plan.waypoints.len(), 5); // start + 3 nodes + goal
    }

    #[test]
    fn exhausted_search_recovers_via_detour() {
        // An expansion budget too small for the 2-hop direct search still
        // suffices for each 1-hop leg, so the midpoint detour saves the plan.
        let graph = line_graph(3);
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::new(SpaceTimeConfig {
            max_expansions: 2,
            ..SpaceTimeConfig::default()
        });

        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0), 10.0, 0);
        let plan = planner.plan(&graph, &mut table, &req).unwrap();
        let schedule = plan.schedule.unwrap();
        assert_schedule_valid(&graph, &schedule, 10.0);
        assert_eq!(schedule.entries.last().unwrap().node, NodeId(2));
    }

    #[test]
    fn disconnected_graph_is_no_route_not_panic() {
        let mut b = RouteGraphBuilder::new();
        b.add_node(Vec2::new(0.0, 0.0));
        b.add_node(Vec2::new(1000.0, 0.0));
        // No links at all.
        let graph = b.build();

        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();
        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(1000.0, 0.0), 10.0, 0);
        let result = planner.plan(&graph, &mut table, &req);
        assert!(matches!(result, Err(PlanError::NoRoute { .. })));
        // Failure leaves the table untouched.
        assert_eq!(table.node_reservation_count(), 0);
    }

    #[test]
    fn empty_graph_errors() {
        let graph = RouteGraph::empty();
        let mut table = ReservationTable::new();
        let planner = SpaceTimePlanner::default();
        let req = request(0, Vec2::ZERO, Vec2::new(10.0, 0.0), 10.0, 0);
        assert!(matches!(
            planner.plan(&graph, &mut table, &req),
            Err(PlanError::EmptyGraph)
        ));
    }
}

// ── Spatial planner ───────────────────────────────────────────────────────────

#[cfg(test)]
mod spatial {
    use super::*;
    use agv_core::EdgeKey;

    #[test]
    fn straight_route_through_line() {
        let graph = line_graph(4);
        let mut holds = SpatialReservationSet::default();
        let planner = SpatialPlanner::default();

        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(300.0, 0.0), 4.0, 0);
        let plan = planner.plan(&graph, &mut holds, &req).unwrap();

        assert!(plan.schedule.is_none());
        // start + 4 nodes + goal
        assert_eq!(plan.waypoints.len(), 6);
        // The chosen lanes are now held.
        assert!(holds.is_edge_blocked(EdgeKey::new(NodeId(1), NodeId(2)), AgentId(9), Tick(0)));
    }

    #[test]
    fn held_edge_routes_around() {
        // Square: 0-1-3 along the top, 0-2-3 along the bottom.
        let mut b = RouteGraphBuilder::new();
        let n0 = b.add_node(Vec2::new(0.0, 0.0));
        let n1 = b.add_node(Vec2::new(100.0, 0.0));
        let n2 = b.add_node(Vec2::new(0.0, 100.0));
        let n3 = b.add_node(Vec2::new(100.0, 100.0));
        b.add_link(n0, n1);
        b.add_link(n1, n3);
        b.add_link(n0, n2);
        b.add_link(n2, n3);
        let graph = b.build();

        let mut holds = SpatialReservationSet::default();
        // Another agent holds the top-right lane.
        holds.reserve_edge(EdgeKey::new(n1, n3), AgentId(1), Tick(0));

        let planner = SpatialPlanner::default();
        let req = request(2, Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0), 4.0, 0);
        let plan = planner.plan(&graph, &mut holds, &req).unwrap();

        // Route went via n2: its position appears among the waypoints.
        assert!(plan.waypoints.contains(&Vec2::new(0.0, 100.0)));
        assert!(!plan.waypoints.contains(&Vec2::new(100.0, 0.0)));
    }

    #[test]
    fn fully_blocked_is_no_route() {
        let graph = line_graph(3);
        let mut holds = SpatialReservationSet::default();
        holds.reserve_edge(EdgeKey::new(NodeId(0), NodeId(1)), AgentId(1), Tick(0));

        let planner = SpatialPlanner::default();
        let req = request(2, Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0), 4.0, 0);
        assert!(matches!(
            planner.plan(&graph, &mut holds, &req),
            Err(PlanError::NoRoute { .. })
        ));
    }

    #[test]
    fn waypoint_cap_applies() {
        let graph = line_graph(10);
        let mut holds = SpatialReservationSet::default();
        let planner = SpatialPlanner::new(crate::spatial::SpatialConfig {
            max_waypoints: Some(5),
        });

        let req = request(0, Vec2::new(0.0, 0.0), Vec2::new(900.0, 0.0), 4.0, 0);
        let plan = planner.plan(&graph, &mut holds, &req).unwrap();
        assert_eq!(plan.waypoints.len(), 5);
        assert_eq!(plan.waypoints[0], Vec2::new(0.0, 0.0));
        assert_eq!(plan.waypoints[4], Vec2::new(900.0, 0.0));
    }
}

// ── limit_waypoints ───────────────────────────────────────────────────────────

#[cfg(test)]
mod waypoints {
    use super::*;

    fn points(n: usize) -> Vec<Vec2> {
        (0..n).map(|i| Vec2::new(i as f32, 0.0)).collect()
    }

    #[test]
    fn unchanged_when_limit_not_exceeded() {
        let pts = points(5);
        assert_eq!(limit_waypoints(&pts, 5), pts);
        assert_eq!(limit_waypoints(&pts, 8), pts);
    }

    #[test]
    fn exact_count_with_endpoints_kept() {
        let pts = points(20);
        let limited = limit_waypoints(&pts, 7);
        assert_eq!(limited.len(), 7);
        assert_eq!(limited[0], pts[0]);
        assert_eq!(limited[6], pts[19]);
    }

    #[test]
    fn tiny_limit_keeps_endpoints_only() {
        let pts = points(10);
        let limited = limit_waypoints(&pts, 2);
        assert_eq!(limited, vec![pts[0], pts[9]]);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(limit_waypoints(&[], 4).is_empty());
    }

    #[test]
    fn interior_samples_are_monotonic() {
        let pts = points(50);
        let limited = limit_waypoints(&pts, 10);
        for pair in limited.windows(2) {
            assert!(pair[0].x < pair[1].x);
        }
    }
}
