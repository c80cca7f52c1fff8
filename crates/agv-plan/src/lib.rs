//! `agv-plan` — route planners over the reservation stores.
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`plan`]      | `Plan`, `Schedule`, `PlanRequest`, `limit_waypoints`    |
//! | [`space_time`]| `SpaceTimePlanner` — time-indexed A*, detours, commit   |
//! | [`spatial`]   | `SpatialPlanner` — plain A* fallback, no time axis      |
//! | [`error`]     | `PlanError`, `PlanResult`                               |
//!
//! # Guarantees
//!
//! A successful [`SpaceTimePlanner::plan`] returns a schedule that is
//! conflict-free against every reservation standing at call time, and has
//! already committed the schedule's own reservations — callers never see a
//! half-reserved state.  The guarantee is per plan, not global: schedules
//! are not jointly optimal across agents.
//!
//! [`SpatialPlanner::plan`] is strictly weaker — an edge free "right now" is
//! assumed free for the whole traversal — and exists as the fallback when
//! time-aware planning is disabled or fails.
//!
//! # Determinism
//!
//! Both searches order their open lists by (f-score, lowest node id,
//! insertion order).  The tie-break is part of the contract: tests pin exact
//! schedules, so it must never regress to hash or sort-stability accidents.

pub mod error;
pub mod plan;
pub mod space_time;
pub mod spatial;

#[cfg(test)]
mod tests;

pub use error::{PlanError, PlanResult};
pub use plan::{Plan, PlanRequest, Schedule, ScheduleEntry, limit_waypoints};
pub use space_time::{SpaceTimeConfig, SpaceTimePlanner};
pub use spatial::{SpatialConfig, SpatialPlanner};
