//! The `Fleet` struct and its tick loop.

use tracing::debug;

use agv_agent::{AgentController, AgentSnapshot, AgentState, Neighbor, Task, TickOutcome};
use agv_core::{AgentId, SimClock, SimConfig, SimRng, Tick, Vec2};
use agv_graph::{GridSpec, RandomLayout, RouteGraph, build_grid, build_random};
use agv_plan::{PlanRequest, Schedule, SpaceTimePlanner, SpatialPlanner};
use agv_reserve::{ReservationBackend, ReservationTable, SpatialReservationSet};

use crate::error::{SimError, SimResult};
use crate::observer::FleetObserver;

/// The fleet runner: route graph, reservation stores, planners, and one
/// controller per agent, advanced by a discrete-tick cooperative loop.
///
/// Agents are indexed by `AgentId` — the controller for agent `i` lives at
/// `agents[i]`.  Create via [`FleetBuilder`][crate::FleetBuilder].
pub struct Fleet {
    /// Global configuration (total ticks, seed, snapshot interval, …).
    pub config: SimConfig,

    /// The simulation clock — advanced exactly once per tick.
    pub clock: SimClock,

    /// Route network all planning runs against.  Swapped wholesale by the
    /// rebuild calls, never mutated behind the planners' backs.
    pub graph: RouteGraph,

    /// Space-time reservation table (the time-aware planner's backend).
    pub reservations: ReservationTable,

    /// Legacy fixed-duration holds (the spatial fallback's backend).
    pub spatial_holds: SpatialReservationSet,

    /// Per-agent controllers, indexed by `AgentId`.
    pub agents: Vec<AgentController>,

    pub(crate) space_time: SpaceTimePlanner,
    pub(crate) spatial: SpatialPlanner,
    pub(crate) time_aware: bool,
    pub(crate) rng: SimRng,
}

impl Fleet {
    // ── Task assignment ───────────────────────────────────────────────────

    /// Assign a (pickup, dropoff) job to an idle agent.
    ///
    /// This is the entire dispatcher-facing surface: the core needs only the
    /// two positions.
    pub fn assign_task(&mut self, agent: AgentId, pickup: Vec2, dropoff: Vec2) -> SimResult<()> {
        let controller = self
            .agents
            .get_mut(agent.index())
            .ok_or(SimError::UnknownAgent(agent))?;
        if controller.state() != AgentState::Idle {
            return Err(SimError::AgentBusy(agent));
        }
        controller.assign_task(Task { pickup, dropoff });
        Ok(())
    }

    // ── Run loop ──────────────────────────────────────────────────────────

    /// Run from the current tick to `config.end_tick()`.
    ///
    /// One agent's planning failure never halts the loop — the agent
    /// fail-stops and everyone else keeps moving.
    pub fn run<O: FleetObserver>(&mut self, observer: &mut O) {
        loop {
            let now = self.clock.now();
            if now >= self.config.end_tick() {
                break;
            }
            self.step(now, observer);
        }
        observer.on_sim_end(self.clock.now());
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_ticks<O: FleetObserver>(&mut self, n: u64, observer: &mut O) {
        for _ in 0..n {
            let now = self.clock.now();
            self.step(now, observer);
        }
    }

    fn step<O: FleetObserver>(&mut self, now: Tick, observer: &mut O) {
        observer.on_tick_start(now);
        let planned = self.process_tick(now);
        observer.on_tick_end(now, planned);
        if self.config.snapshot_interval_ticks > 0
            && now.0.is_multiple_of(self.config.snapshot_interval_ticks)
        {
            observer.on_snapshot(now, &self.snapshots());
        }
        self.clock.advance();
    }

    // ── Core tick processing ──────────────────────────────────────────────

    /// Advance every agent once.  Returns the number of plans served.
    fn process_tick(&mut self, now: Tick) -> usize {
        // ── Phase 1: neighbor snapshot ────────────────────────────────────
        //
        // Captured once so every controller steers against the same view,
        // independent of iteration order.
        let neighbors: Vec<Neighbor> = self
            .agents
            .iter()
            .map(|a| Neighbor { id: a.id, pos: a.body.pos, vel: a.body.vel })
            .collect();

        // ── Phase 2: steering/FSM tick (agent-local mutation only) ────────
        let outcomes: Vec<TickOutcome> = {
            let reservations = &self.reservations;
            let nbrs = neighbors.as_slice();

            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                self.agents
                    .par_iter_mut()
                    .map(|a| a.tick(now, nbrs, reservations))
                    .collect()
            }

            #[cfg(not(feature = "parallel"))]
            {
                self.agents
                    .iter_mut()
                    .map(|a| a.tick(now, nbrs, reservations))
                    .collect()
            }
        };

        // ── Phase 3: apply (sequential, ascending AgentId) ────────────────
        //
        // This is the serialization point: each plan commits before the next
        // request runs, so same-tick replans see each other's reservations.
        let mut planned = 0;
        for (i, out) in outcomes.into_iter().enumerate() {
            if out.release {
                let id = self.agents[i].id;
                release_everywhere(
                    &mut [
                        &mut self.reservations as &mut dyn ReservationBackend,
                        &mut self.spatial_holds as &mut dyn ReservationBackend,
                    ],
                    id,
                );
            }
            if out.needs_plan && self.serve_plan(i, now) {
                planned += 1;
            }
        }

        self.spatial_holds.purge_expired(now);
        planned
    }

    /// Serve one plan request.  Returns `true` when a plan was adopted.
    fn serve_plan(&mut self, idx: usize, now: Tick) -> bool {
        let Some(goal) = self.agents[idx].current_goal() else {
            return false;
        };
        let agent = &self.agents[idx];
        let req = PlanRequest {
            agent: agent.id,
            start: agent.body.pos,
            goal,
            speed: agent.config().max_speed,
            start_tick: now,
        };

        // Cancellation is explicit: stale claims never outlive their plan.
        release_everywhere(
            &mut [
                &mut self.reservations as &mut dyn ReservationBackend,
                &mut self.spatial_holds as &mut dyn ReservationBackend,
            ],
            req.agent,
        );

        let result = if self.time_aware {
            self.space_time
                .plan(&self.graph, &mut self.reservations, &req)
                .or_else(|_| self.spatial.plan(&self.graph, &mut self.spatial_holds, &req))
        } else {
            self.spatial.plan(&self.graph, &mut self.spatial_holds, &req)
        };

        match result {
            Ok(plan) => {
                self.agents[idx].adopt_plan(plan);
                true
            }
            Err(e) => {
                debug!(agent = req.agent.0, error = %e, "planning failed");
                self.agents[idx].plan_failed();
                false
            }
        }
    }

    // ── Topology rebuilds ─────────────────────────────────────────────────

    /// Regenerate the route grid at a new density.
    ///
    /// Every plan and reservation dies here, in this call, synchronously —
    /// a plan can never reference nodes of a graph that no longer exists.
    /// Agents replan from scratch on their next tick with a fresh retry
    /// budget.
    pub fn rebuild_grid(&mut self, spec: &GridSpec) {
        self.install_graph(build_grid(spec));
    }

    /// Regenerate a random route core from the fleet's seeded RNG.
    pub fn rebuild_random(&mut self, cfg: &RandomLayout) {
        let graph = build_random(cfg, &mut self.rng);
        self.install_graph(graph);
    }

    fn install_graph(&mut self, graph: RouteGraph) {
        self.graph = graph;
        for backend in [
            &mut self.reservations as &mut dyn ReservationBackend,
            &mut self.spatial_holds as &mut dyn ReservationBackend,
        ] {
            backend.clear_all();
        }
        for controller in &mut self.agents {
            controller.invalidate_plan();
        }
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Snapshot of every agent, in `AgentId` order.
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(|a| a.snapshot()).collect()
    }

    pub fn snapshot(&self, agent: AgentId) -> Option<AgentSnapshot> {
        self.agents.get(agent.index()).map(|a| a.snapshot())
    }

    /// The agent's committed schedule, when its current plan is time-aware.
    pub fn schedule_of(&self, agent: AgentId) -> Option<&Schedule> {
        self.agents.get(agent.index()).and_then(|a| a.schedule())
    }

    /// `(active node reservations, active edge reservations)`.
    pub fn reservation_counts(&self) -> (usize, usize) {
        (
            self.reservations.node_reservation_count(),
            self.reservations.edge_reservation_count(),
        )
    }
}

/// Release one agent's claims in every reservation backend.
fn release_everywhere(backends: &mut [&mut dyn ReservationBackend], agent: AgentId) {
    for backend in backends.iter_mut() {
        backend.clear_agent(agent);
    }
}
