//! The legacy `SpatialReservationSet` — edge holds with no time axis.
//!
//! Predecessor of the space-time table, kept as the degraded backend for the
//! plain spatial planner: an edge is held outright for a fixed duration
//! rather than per-tick, so "free right now" is silently assumed to mean
//! "free for the whole traversal".  The FSM's local avoidance is the second
//! line of defense when that assumption breaks.

use agv_core::{AgentId, EdgeKey, NodeId, Tick};

use crate::Map;

/// Default hold duration in ticks (3 seconds at 60 ticks/s).
pub const DEFAULT_HOLD_TICKS: u64 = 180;

#[derive(Copy, Clone, Debug)]
struct Hold {
    agent: AgentId,
    expires: Tick,
}

/// Fixed-duration, whole-edge reservation set.
///
/// Holds expire by timestamp instead of explicit clearing; expired entries
/// are ignored by queries and removed by [`purge_expired`](Self::purge_expired).
pub struct SpatialReservationSet {
    holds: Map<EdgeKey, Hold>,
    hold_ticks: u64,
}

impl SpatialReservationSet {
    pub fn new(hold_ticks: u64) -> Self {
        Self { holds: Map::default(), hold_ticks }
    }

    /// `true` if `edge` is currently held by an agent other than `asking`.
    pub fn is_edge_blocked(&self, edge: EdgeKey, asking: AgentId, now: Tick) -> bool {
        match self.holds.get(&edge) {
            None => false,
            Some(hold) => hold.expires >= now && hold.agent != asking,
        }
    }

    /// Hold `edge` for `agent` until `now + hold_ticks`.
    ///
    /// Re-holding refreshes the expiry; the last writer wins, which is safe
    /// because the spatial planner only commits edges it found unblocked.
    pub fn reserve_edge(&mut self, edge: EdgeKey, agent: AgentId, now: Tick) {
        self.holds.insert(edge, Hold { agent, expires: now.offset(self.hold_ticks) });
    }

    /// Hold every edge along a node path.
    pub fn reserve_path(&mut self, path: &[NodeId], agent: AgentId, now: Tick) {
        for pair in path.windows(2) {
            self.reserve_edge(EdgeKey::new(pair[0], pair[1]), agent, now);
        }
    }

    /// Drop holds belonging to `agent`.
    pub fn clear_agent(&mut self, agent: AgentId) {
        self.holds.retain(|_, hold| hold.agent != agent);
    }

    /// Drop everything (topology rebuild).
    pub fn clear_all(&mut self) {
        self.holds.clear();
    }

    /// Drop holds that expired before `now`.  Queries already ignore them;
    /// this just bounds the map size over long runs.
    pub fn purge_expired(&mut self, now: Tick) {
        self.holds.retain(|_, hold| hold.expires >= now);
    }

    /// Number of holds, including any not yet purged.
    pub fn hold_count(&self) -> usize {
        self.holds.len()
    }
}

impl Default for SpatialReservationSet {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_TICKS)
    }
}
