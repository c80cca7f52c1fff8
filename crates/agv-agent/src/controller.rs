//! The per-agent finite-state machine.
//!
//! # States and transitions
//!
//! ```text
//! Idle ──assign_task──▶ Pickup ──at pickup──▶ Dropoff ──at dropoff──▶ Idle
//!                                                      └─(far from home)─▶ Return ──at home──▶ Idle
//! ```
//!
//! Return is policy-configurable and interposed only when the agent ends a
//! delivery farther than `return_home_distance` from its home bay.
//!
//! # Per-tick order of operations
//!
//! 1. Hold position until the schedule's departure tick.
//! 2. Conflict check: a future state of our own schedule now reserved by a
//!    different agent drops the plan, bumps the bounded replan counter, and
//!    stalls this tick.
//! 3. Obstacle avoidance: a neighbor inside the lookahead cone brakes us;
//!    once the lane stays clear for the cooldown window the stale plan is
//!    dropped for a fresh one.
//! 4. Steer toward the current waypoint (arrival deceleration on the last),
//!    advance the cursor inside the reach radius, blend in separation.
//! 5. On reaching the state's final target, transition and release the plan.
//!
//! Exhausting the replan budget fail-stops the agent: it stays put with its
//! `stalled` flag raised instead of hammering the planner forever.

use agv_core::{AgentId, NodeId, Tick, Vec2};
use agv_plan::{Plan, Schedule};
use agv_reserve::ReservationTable;

use crate::snapshot::AgentSnapshot;
use crate::steering::{Body, Neighbor};

/// Residual-drift damping factor while holding position.
const IDLE_DAMPING: f32 = 0.85;

/// Below this distance to the current waypoint the heading is meaningless
/// and obstacle detection is skipped.
const MIN_HEADING_DISTANCE: f32 = 5.0;

// ── Public types ──────────────────────────────────────────────────────────────

/// FSM state of one agent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentState {
    Idle,
    Pickup,
    Dropoff,
    Return,
}

/// A transport job: collect at `pickup`, deposit at `dropoff`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Task {
    pub pickup: Vec2,
    pub dropoff: Vec2,
}

/// Feature flags and thresholds for one controller.
///
/// One FSM serves every configuration — obstacle detection is a flag here,
/// time-aware versus spatial planning a fleet-level choice — rather than a
/// ladder of controller variants.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Top speed in distance/tick.  Also the speed quoted to the planner.
    pub max_speed: f32,
    pub max_force: f32,

    /// Final-target tolerance for state transitions.
    pub target_reach_radius: f32,

    /// Master switch for local obstacle detection.
    pub obstacle_detection: bool,
    /// How far ahead to scan for agents in our lane.
    pub obstacle_lookahead: f32,
    /// Heading-alignment dot-product threshold (≈45° cone at 0.7).
    pub alignment_threshold: f32,
    /// Ticks the lane must stay clear before we resume with a fresh plan.
    pub obstacle_cooldown_ticks: u64,

    /// How far into our own schedule the conflict check looks.
    pub conflict_lookahead_ticks: u64,

    /// Neighbor repulsion radius and blend weight.
    pub separation_radius: f32,
    pub separation_weight: f32,

    /// Replans allowed before the agent fail-stops.
    pub max_replan_attempts: u32,

    /// Whether to return to the home bay after a remote dropoff.
    pub return_home: bool,
    /// Dropoffs farther than this from home trigger the Return leg.
    pub return_home_distance: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_speed:                4.0,
            max_force:                0.2,
            target_reach_radius:      50.0,
            obstacle_detection:       true,
            obstacle_lookahead:       80.0,
            alignment_threshold:      0.7,
            obstacle_cooldown_ticks:  30,
            conflict_lookahead_ticks: 60,
            separation_radius:        60.0,
            separation_weight:        2.5,
            max_replan_attempts:      3,
            return_home:              true,
            return_home_distance:     200.0,
        }
    }
}

/// Fleet-visible effects of one controller tick.
///
/// The controller never touches shared state itself; the fleet applies these
/// in ascending agent order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Serve this agent a plan toward [`AgentController::current_goal`].
    pub needs_plan: bool,
    /// Clear this agent's reservations in every backend.
    pub release: bool,
}

// ── Controller ────────────────────────────────────────────────────────────────

/// All per-agent state: kinematics, FSM, plan, and retry bookkeeping.
pub struct AgentController {
    pub id: AgentId,
    pub body: Body,
    /// Home bay the agent returns to and idles at.
    pub home: Vec2,

    state: AgentState,
    task: Option<Task>,
    plan: Option<Plan>,
    cursor: usize,

    replan_attempts: u32,
    stalled: bool,

    obstacle_stopped: bool,
    cooldown: u64,

    config: AgentConfig,
}

impl AgentController {
    pub fn new(id: AgentId, home: Vec2, config: AgentConfig) -> Self {
        Self {
            id,
            body: Body::new(home, config.max_speed, config.max_force),
            home,
            state: AgentState::Idle,
            task: None,
            plan: None,
            cursor: 0,
            replan_attempts: 0,
            stalled: false,
            obstacle_stopped: false,
            cooldown: 0,
            config,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// The committed schedule, when the current plan is time-aware.
    pub fn schedule(&self) -> Option<&Schedule> {
        self.plan.as_ref().and_then(|p| p.schedule.as_ref())
    }

    pub fn waypoint_cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn replan_attempts(&self) -> u32 {
        self.replan_attempts
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id:              self.id,
            pos:             self.body.pos,
            vel:             self.body.vel,
            state:           self.state,
            waypoint_cursor: self.cursor,
            stalled:         self.stalled,
        }
    }

    /// The position the current state is driving toward, if any.
    pub fn current_goal(&self) -> Option<Vec2> {
        match self.state {
            AgentState::Idle => None,
            AgentState::Pickup => self.task.map(|t| t.pickup),
            AgentState::Dropoff => self.task.map(|t| t.dropoff),
            AgentState::Return => Some(self.home),
        }
    }

    // ── Fleet-driven mutations ────────────────────────────────────────────

    /// Accept a transport job.  The fleet only assigns to idle agents.
    pub fn assign_task(&mut self, task: Task) {
        self.task = Some(task);
        self.state = AgentState::Pickup;
        self.plan = None;
        self.cursor = 0;
        self.replan_attempts = 0;
        self.stalled = false;
        self.obstacle_stopped = false;
        self.cooldown = 0;
    }

    /// Adopt a plan the fleet obtained for us.
    pub fn adopt_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
        self.cursor = 0;
    }

    /// The fleet's planning attempt failed — consume one retry.
    pub fn plan_failed(&mut self) {
        self.note_replan();
    }

    /// Topology rebuild: every node id this plan referenced is now
    /// meaningless.  Reservations are cleared by the fleet in the same
    /// breath; the retry budget starts fresh on the new graph.
    pub fn invalidate_plan(&mut self) {
        self.plan = None;
        self.cursor = 0;
        self.replan_attempts = 0;
        self.stalled = false;
        self.obstacle_stopped = false;
        self.cooldown = 0;
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Advance one tick.  Mutates only agent-local state; effects on shared
    /// stores are returned in the [`TickOutcome`].
    pub fn tick(
        &mut self,
        now: Tick,
        neighbors: &[Neighbor],
        reservations: &ReservationTable,
    ) -> TickOutcome {
        let mut out = TickOutcome::default();

        if self.state == AgentState::Idle || self.stalled {
            self.body.damp(IDLE_DAMPING);
            return out;
        }

        let Some(goal) = self.current_goal() else {
            self.body.damp(IDLE_DAMPING);
            return out;
        };

        // No plan yet (or it was dropped): hold position and ask for one.
        if self.plan.is_none() {
            self.body.damp(IDLE_DAMPING);
            out.needs_plan = true;
            return out;
        }

        // (1) Scheduled departure gating: no movement before the start tick.
        if let Some(start) = self.plan.as_ref().and_then(|p| p.start_tick()) {
            if now < start {
                self.body.halt();
                return out;
            }
        }

        // (2) Conflict detection over our own future schedule.
        let conflicted = self
            .schedule()
            .is_some_and(|s| {
                conflict_ahead(self.id, s, now, self.config.conflict_lookahead_ticks, reservations)
            });
        if conflicted {
            self.plan = None;
            self.cursor = 0;
            out.release = true;
            self.note_replan();
            self.body.halt();
            return out;
        }

        // Resolve the steering target before the obstacle check so both use
        // the same heading.
        let (target, is_last, reach) = {
            let plan = match self.plan.as_ref() {
                Some(p) => p,
                None => return out,
            };
            if self.cursor < plan.waypoints.len() {
                (
                    plan.waypoints[self.cursor],
                    self.cursor + 1 == plan.waypoints.len(),
                    plan.reach_radius,
                )
            } else {
                (goal, true, plan.reach_radius)
            }
        };

        // (3) Local obstacle avoidance.
        if self.config.obstacle_detection {
            let obstacle = self.obstacle_ahead(target, neighbors);
            if obstacle && !self.obstacle_stopped {
                self.body.brake(0.5);
                self.obstacle_stopped = true;
                self.cooldown = 0;
            }
            if self.obstacle_stopped {
                if obstacle {
                    self.cooldown = 0;
                    return out;
                }
                self.cooldown += 1;
                if self.cooldown >= self.config.obstacle_cooldown_ticks {
                    // Lane stayed clear — drop the stale plan and replan
                    // fresh.  Does not consume the retry budget.
                    self.obstacle_stopped = false;
                    self.cooldown = 0;
                    self.plan = None;
                    self.cursor = 0;
                    out.release = true;
                }
                return out;
            }
        }

        // (4) Steer, separate, advance.
        let mut force = if is_last { self.body.arrive(target) } else { self.body.seek(target) };
        force += self.body.separate(self.id, neighbors, self.config.separation_radius)
            * self.config.separation_weight;
        self.body.apply_force(force);
        self.body.integrate();

        if self.body.pos.distance(target) < reach && !is_last {
            self.cursor += 1;
        }

        // (5) Final-target arrival → state transition and release.
        if self.body.pos.distance(goal) < self.config.target_reach_radius {
            self.complete_leg();
            out.release = true;
        }

        out
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn note_replan(&mut self) {
        self.replan_attempts += 1;
        if self.replan_attempts > self.config.max_replan_attempts {
            self.stalled = true;
        }
    }

    fn complete_leg(&mut self) {
        self.plan = None;
        self.cursor = 0;
        self.replan_attempts = 0;
        self.obstacle_stopped = false;
        self.cooldown = 0;

        self.state = match self.state {
            AgentState::Pickup => AgentState::Dropoff,
            AgentState::Dropoff => {
                self.task = None;
                if self.config.return_home
                    && self.body.pos.distance(self.home) > self.config.return_home_distance
                {
                    AgentState::Return
                } else {
                    AgentState::Idle
                }
            }
            AgentState::Return | AgentState::Idle => AgentState::Idle,
        };
    }

    /// `true` when another agent sits in our travel cone.
    fn obstacle_ahead(&self, target: Vec2, neighbors: &[Neighbor]) -> bool {
        let to_target = target - self.body.pos;
        if to_target.length() < MIN_HEADING_DISTANCE {
            return false;
        }
        let heading = to_target.normalized();

        neighbors.iter().any(|other| {
            if other.id == self.id {
                return false;
            }
            let to_other = other.pos - self.body.pos;
            let d = to_other.length();
            d <= self.config.obstacle_lookahead
                && heading.dot(to_other.normalized()) > self.config.alignment_threshold
        })
    }
}

// ── Conflict detection ────────────────────────────────────────────────────────

/// Has a future `(node, tick)` of our own schedule been reserved by someone
/// else since we committed it?
fn conflict_ahead(
    own: AgentId,
    schedule: &Schedule,
    now: Tick,
    lookahead: u64,
    reservations: &ReservationTable,
) -> bool {
    let window_end = now + lookahead;
    schedule.entries.iter().any(|entry| {
        entry.tick >= now
            && entry.tick <= window_end
            && holds_other(reservations, entry.node, entry.tick, own)
    })
}

#[inline]
fn holds_other(table: &ReservationTable, node: NodeId, tick: Tick, own: AgentId) -> bool {
    matches!(table.node_holder(node, tick), Some(holder) if holder != own)
}
