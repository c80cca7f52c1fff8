//! `agv-reserve` — the mutual-exclusion primitive over space-time.
//!
//! | Module      | Contents                                               |
//! |-------------|--------------------------------------------------------|
//! | [`table`]   | `ReservationTable` — (node|edge, tick) → holding agent |
//! | [`spatial`] | `SpatialReservationSet` — legacy edge holds, no time axis |
//! | [`backend`] | `ReservationBackend` capability trait                  |
//!
//! # Exclusivity invariant
//!
//! At most one agent holds any (key, tick) slot.  The stores do not defend
//! this with locks or error returns: the fleet serializes every planning
//! call, so a conflicting write can only mean a logic bug upstream and is
//! checked with `debug_assert!`.
//!
//! # Cargo features
//!
//! | Feature   | Effect                                         |
//! |-----------|------------------------------------------------|
//! | `fx-hash` | Use `rustc-hash` maps instead of SipHash.      |

pub mod backend;
pub mod spatial;
pub mod table;


pub use backend::ReservationBackend;
pub use spatial::SpatialReservationSet;
pub use table::ReservationTable;

// Map type shared by both stores, switched by the `fx-hash` feature.
#[cfg(feature = "fx-hash")]
pub(crate) type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;
