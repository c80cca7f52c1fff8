//! `agv-sim` — the fleet tick loop.
//!
//! # Three-phase tick
//!
//! ```text
//! for tick in 0..config.total_ticks:
//!   ① Snapshot — capture every agent's (pos, vel) once, so all controllers
//!               steer against the same view.
//!   ② Steer    — AgentController::tick per agent: FSM, conflict check,
//!               obstacle avoidance, steering.  Agent-local mutation only
//!               (parallel with the `parallel` feature).
//!   ③ Apply    — sequential, ascending AgentId:
//!                 release   → clear the agent's claims in every backend
//!                 needs_plan→ run the planner NOW; its commit is visible
//!                             to every later request in the same tick
//! ```
//!
//! The apply phase is the serialization point the reservation invariant
//! depends on: planning calls never interleave, so the table can treat a
//! conflicting write as a logic error rather than a runtime condition.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                              |
//! |------------|-----------------------------------------------------|
//! | `parallel` | Runs the steering phase on Rayon's thread pool.     |
//! | `serde`    | Serde derives on snapshot types.                    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use agv_core::{SimConfig, Vec2};
//! use agv_graph::{GridSpec, Rect, build_grid};
//! use agv_sim::{FleetBuilder, NoopObserver};
//!
//! let graph = build_grid(&GridSpec {
//!     target_points: 60,
//!     areas: vec![Rect::new(0.0, 0.0, 800.0, 600.0)],
//! });
//! let mut fleet = FleetBuilder::new(SimConfig::default(), graph)
//!     .homes(vec![Vec2::new(50.0, 50.0); 4])
//!     .build();
//! fleet.assign_task(agv_core::AgentId(0), pickup, dropoff)?;
//! fleet.run(&mut NoopObserver);
//! ```

pub mod builder;
pub mod csv;
pub mod error;
pub mod fleet;
pub mod observer;


pub use builder::FleetBuilder;
pub use csv::CsvSnapshotWriter;
pub use error::{SimError, SimResult};
pub use fleet::Fleet;
pub use observer::{FleetObserver, NoopObserver};
