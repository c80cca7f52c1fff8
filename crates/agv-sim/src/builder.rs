//! Fluent builder for constructing a [`Fleet`].

use agv_agent::{AgentConfig, AgentController};
use agv_core::{AgentId, SimClock, SimConfig, SimRng, Vec2};
use agv_graph::RouteGraph;
use agv_plan::{SpaceTimeConfig, SpaceTimePlanner, SpatialConfig, SpatialPlanner};
use agv_reserve::{ReservationTable, SpatialReservationSet};

use crate::fleet::Fleet;

/// Fluent builder for [`Fleet`].
///
/// # Required inputs
///
/// - [`SimConfig`] — total ticks, seed, snapshot interval
/// - [`RouteGraph`] — from a fixture, the builder, or a generator
///
/// # Optional inputs (have defaults)
///
/// | Method                 | Default                              |
/// |------------------------|--------------------------------------|
/// | `.homes(v)`            | no agents                            |
/// | `.agent_config(c)`     | `AgentConfig::default()`             |
/// | `.time_aware(b)`       | `true` (space-time planner first)    |
/// | `.space_time_config(c)`| `SpaceTimeConfig::default()`         |
/// | `.spatial_config(c)`   | `SpatialConfig::default()`           |
///
/// # Example
///
/// ```rust,ignore
/// let mut fleet = FleetBuilder::new(config, graph)
///     .homes(vec![Vec2::new(100.0, 700.0); 4])
///     .time_aware(true)
///     .build();
/// ```
pub struct FleetBuilder {
    config: SimConfig,
    graph: RouteGraph,
    homes: Vec<Vec2>,
    agent_config: AgentConfig,
    time_aware: bool,
    space_time: SpaceTimeConfig,
    spatial: SpatialConfig,
}

impl FleetBuilder {
    pub fn new(config: SimConfig, graph: RouteGraph) -> Self {
        Self {
            config,
            graph,
            homes: Vec::new(),
            agent_config: AgentConfig::default(),
            time_aware: true,
            space_time: SpaceTimeConfig::default(),
            spatial: SpatialConfig::default(),
        }
    }

    /// One home position per agent; the fleet size is this list's length.
    /// Agents start parked at their home with sequential `AgentId`s.
    pub fn homes(mut self, homes: Vec<Vec2>) -> Self {
        self.homes = homes;
        self
    }

    /// Shared controller configuration (speeds, thresholds, retry budget).
    pub fn agent_config(mut self, config: AgentConfig) -> Self {
        self.agent_config = config;
        self
    }

    /// `true` tries the space-time planner first and falls back to the
    /// spatial planner; `false` uses the spatial planner only.
    pub fn time_aware(mut self, on: bool) -> Self {
        self.time_aware = on;
        self
    }

    pub fn space_time_config(mut self, config: SpaceTimeConfig) -> Self {
        self.space_time = config;
        self
    }

    pub fn spatial_config(mut self, config: SpatialConfig) -> Self {
        self.spatial = config;
        self
    }

    /// Assemble the fleet with every agent idle at its home position.
    pub fn build(self) -> Fleet {
        let agents: Vec<AgentController> = self
            .homes
            .iter()
            .enumerate()
            .map(|(i, &home)| AgentController::new(AgentId(i as u32), home, self.agent_config.clone()))
            .collect();

        let rng = SimRng::new(self.config.seed);

        Fleet {
            config: self.config,
            clock: SimClock::new(),
            graph: self.graph,
            reservations: ReservationTable::new(),
            spatial_holds: SpatialReservationSet::default(),
            agents,
            space_time: SpaceTimePlanner::new(self.space_time),
            spatial: SpatialPlanner::new(self.spatial),
            time_aware: self.time_aware,
            rng,
        }
    }
}
