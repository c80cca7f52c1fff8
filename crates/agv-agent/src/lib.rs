//! `agv-agent` — per-agent behavior: steering and the task FSM.
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`steering`]   | `Body` kinematics, seek/arrive/separate, `Neighbor`  |
//! | [`controller`] | `AgentController` FSM, `AgentConfig`, `TickOutcome`  |
//! | [`snapshot`]   | `AgentSnapshot` for rendering/observability layers   |
//!
//! # Split of responsibilities
//!
//! The controller owns everything agent-local — position, velocity, FSM
//! state, the current plan, retry bookkeeping — and mutates it freely each
//! tick.  Everything with fleet-wide effect is *requested*, not performed:
//! [`TickOutcome`] tells the fleet loop to release this agent's reservations
//! or serve it a fresh plan, and the loop applies those effects in a fixed
//! agent order.  That keeps per-agent ticks free of shared-state writes, so
//! they can fan out across threads while planning stays serialized.

pub mod controller;
pub mod snapshot;
pub mod steering;


pub use controller::{AgentConfig, AgentController, AgentState, Task, TickOutcome};
pub use snapshot::AgentSnapshot;
pub use steering::{Body, Neighbor};
