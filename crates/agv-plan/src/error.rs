//! Planner error type.
//!
//! Planning failure is an ordinary value here — the FSM recovers with a
//! bounded retry and fail-stops after that.  A disconnected graph is not
//! distinguished from a fully reserved corridor: both mean "no route within
//! the search bounds".

use thiserror::Error;

use agv_core::NodeId;

/// Errors produced by `agv-plan`.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("route graph has no nodes")]
    EmptyGraph,

    #[error("no conflict-free route from {from} to {to} within search bounds")]
    NoRoute { from: NodeId, to: NodeId },
}

pub type PlanResult<T> = Result<T, PlanError>;
