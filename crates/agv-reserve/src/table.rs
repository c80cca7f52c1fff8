//! The time-aware `ReservationTable`.

use agv_core::{AgentId, EdgeKey, NodeId, Tick};

use crate::Map;

/// Discrete-time occupancy store over nodes and edges.
///
/// A slot is a `(key, tick)` pair holding exactly one `AgentId`.  A slot is
/// *free* for an asking agent when it is unreserved or already held by that
/// same agent — agents never block themselves, which is what lets a replan
/// search through the agent's own standing reservations.
///
/// # Writes
///
/// `reserve_*` commits only slots that are free for the writer.  A write to a
/// slot held by a *different* agent is an invariant violation — the fleet
/// serializes planning precisely so this cannot happen — and trips a
/// `debug_assert!` rather than producing a runtime error.
#[derive(Default)]
pub struct ReservationTable {
    nodes: Map<(NodeId, Tick), AgentId>,
    edges: Map<(EdgeKey, Tick), AgentId>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// `true` if `node` at `tick` is unreserved or held by `asking`.
    #[inline]
    pub fn is_node_free(&self, node: NodeId, tick: Tick, asking: AgentId) -> bool {
        match self.nodes.get(&(node, tick)) {
            None => true,
            Some(&holder) => holder == asking,
        }
    }

    /// `true` if `edge` at `tick` is unreserved or held by `asking`.
    #[inline]
    pub fn is_edge_free(&self, edge: EdgeKey, tick: Tick, asking: AgentId) -> bool {
        match self.edges.get(&(edge, tick)) {
            None => true,
            Some(&holder) => holder == asking,
        }
    }

    /// The agent holding `node` at `tick`, if any.
    #[inline]
    pub fn node_holder(&self, node: NodeId, tick: Tick) -> Option<AgentId> {
        self.nodes.get(&(node, tick)).copied()
    }

    /// The agent holding `edge` at `tick`, if any.
    #[inline]
    pub fn edge_holder(&self, edge: EdgeKey, tick: Tick) -> Option<AgentId> {
        self.edges.get(&(edge, tick)).copied()
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Reserve `node` at `tick` for `agent`.
    pub fn reserve_node(&mut self, node: NodeId, tick: Tick, agent: AgentId) {
        debug_assert!(
            self.is_node_free(node, tick, agent),
            "reservation conflict: node {node} at {tick} already held by {:?} (writer {agent})",
            self.node_holder(node, tick),
        );
        self.nodes.insert((node, tick), agent);
    }

    /// Reserve `edge` at `tick` for `agent`.
    pub fn reserve_edge(&mut self, edge: EdgeKey, tick: Tick, agent: AgentId) {
        debug_assert!(
            self.is_edge_free(edge, tick, agent),
            "reservation conflict: edge {edge} at {tick} already held by {:?} (writer {agent})",
            self.edge_holder(edge, tick),
        );
        self.edges.insert((edge, tick), agent);
    }

    /// Remove every slot held by `agent`.
    pub fn clear_agent(&mut self, agent: AgentId) {
        self.nodes.retain(|_, &mut holder| holder != agent);
        self.edges.retain(|_, &mut holder| holder != agent);
    }

    /// Remove all reservations — used when the topology is rebuilt and every
    /// outstanding `NodeId` becomes meaningless.
    pub fn clear_all(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Number of active node slots.
    pub fn node_reservation_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of active edge slots.
    pub fn edge_reservation_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of slots held by `agent` across both maps.
    pub fn held_by(&self, agent: AgentId) -> usize {
        self.nodes.values().filter(|&&h| h == agent).count()
            + self.edges.values().filter(|&&h| h == agent).count()
    }
}
