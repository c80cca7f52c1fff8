//! Per-tick agent snapshot for rendering and observability layers.

use agv_core::{AgentId, Vec2};

use crate::controller::AgentState;

/// Read-only copy of one agent's externally relevant state.
///
/// This is the whole contract between the core and any rendering layer: a
/// drawing frontend interpolates from `pos`/`vel`, colours by `state`, and
/// flags `stalled` agents for the operator.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub state: AgentState,
    pub waypoint_cursor: usize,
    pub stalled: bool,
}
