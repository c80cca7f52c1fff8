//! `agv-core` — foundational types for the agv fleet-routing workspace.
//!
//! This crate is a dependency of every other `agv-*` crate.  It intentionally
//! has no `agv-*` dependencies and minimal external ones (only `rand`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                    |
//! |-----------|---------------------------------------------|
//! | [`ids`]   | `AgentId`, `NodeId`, `EdgeKey`              |
//! | [`vec2`]  | planar `Vec2` and its steering algebra      |
//! | [`time`]  | `Tick`, `SimClock`, `SimConfig`             |
//! | [`rng`]   | `SimRng` (seedable, deterministic)          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod ids;
pub mod rng;
pub mod time;
pub mod vec2;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{AgentId, EdgeKey, NodeId};
pub use rng::SimRng;
pub use time::{SimClock, SimConfig, Tick};
pub use vec2::Vec2;
