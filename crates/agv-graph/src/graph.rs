//! Route network representation and builder.
//!
//! # Data layout
//!
//! Adjacency uses **Compressed Sparse Row (CSR)** format.  Given a `NodeId n`,
//! its neighbors occupy the slice:
//!
//! ```text
//! nbr_node[ out_start[n] .. out_start[n+1] ]   // neighbor ids
//! nbr_dist[ out_start[n] .. out_start[n+1] ]   // Euclidean lengths
//! ```
//!
//! Edges are undirected; each unique link contributes one entry to the edge
//! table and two CSR half-edges.  Iteration over a node's neighbors is a
//! contiguous memory scan — ideal for the planners' inner loops.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps floor positions to the nearest `NodeId`.
//! Used to snap agent positions and task endpoints onto the network.  Ties
//! at equal distance are broken by the lowest id so snapping is
//! deterministic.
//!
//! # Mutation model
//!
//! Unlike a load-once road network, warehouse layouts change: external
//! pickup/dropoff points get attached after generation and the whole core
//! can be regenerated at a different density.  The graph therefore keeps its
//! undirected edge table and re-derives CSR + R-tree on every mutation.
//! Mutations invalidate every outstanding `NodeId` held elsewhere — callers
//! (the fleet) must drop plans and reservations in the same breath.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use agv_core::{EdgeKey, NodeId, Vec2};

/// External attachment fan-out: each attached point is linked to this many
/// nearest existing nodes so one blocked lane cannot orphan it.
pub const ATTACH_NEIGHBORS: usize = 3;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D point with the associated
/// `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2],
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── RouteGraph ────────────────────────────────────────────────────────────────

/// One undirected edge: canonical key plus Euclidean length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeRec {
    pub key: EdgeKey,
    pub length: f32,
}

/// Pairing rule for [`RouteGraph::connect_sets`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pairing {
    /// Each node of the first set links to its nearest node in the second.
    Nearest,
    /// Link first-to-first, second-to-second, … up to the shorter set.
    Index,
}

/// Undirected route graph in CSR format plus a spatial index for snapping.
///
/// Do not construct directly; use [`RouteGraphBuilder`] or the generators in
/// [`crate::grid`].
pub struct RouteGraph {
    /// Floor position of each node.  Indexed by `NodeId`.
    node_pos: Vec<Vec2>,

    /// CSR row pointer.  Neighbors of node `n` are at indices
    /// `out_start[n] .. out_start[n+1]`.  Length = `node_count + 1`.
    out_start: Vec<u32>,

    /// Neighbor node of each half-edge, sorted by source node.
    nbr_node: Vec<NodeId>,

    /// Length of each half-edge, parallel to `nbr_node`.
    nbr_dist: Vec<f32>,

    /// Unique undirected edges — kept so attachment and rebuild can re-derive
    /// the CSR arrays, and for introspection.
    edges: Vec<EdgeRec>,

    spatial_idx: RTree<NodeEntry>,
}

impl RouteGraph {
    /// Construct an empty graph with no nodes or edges.
    ///
    /// Any snap or planning request against it fails cleanly.
    pub fn empty() -> Self {
        RouteGraphBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// The unique undirected edge table.
    pub fn edges(&self) -> &[EdgeRec] {
        &self.edges
    }

    /// Position of `node`.
    ///
    /// # Panics
    /// Panics if `node` is out of range (including `NodeId::INVALID`).
    #[inline]
    pub fn node_pos(&self, node: NodeId) -> Vec2 {
        self.node_pos[node.index()]
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over `(neighbor, distance)` pairs of `node`.
    ///
    /// This is a contiguous index range — no heap allocation.
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f32)> + '_ {
        let start = self.out_start[node.index()] as usize;
        let end   = self.out_start[node.index() + 1] as usize;
        (start..end).map(|i| (self.nbr_node[i], self.nbr_dist[i]))
    }

    /// Degree of `node` (number of incident edges).
    #[inline]
    pub fn degree(&self, node: NodeId) -> usize {
        let start = self.out_start[node.index()] as usize;
        let end   = self.out_start[node.index() + 1] as usize;
        end - start
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the node nearest to `pos`.
    ///
    /// Ties at equal distance are broken by the **lowest id** so results are
    /// reproducible across runs.  Returns `None` only for an empty graph.
    pub fn nearest_node(&self, pos: Vec2) -> Option<NodeId> {
        let query = [pos.x, pos.y];
        let mut iter = self.spatial_idx.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best_d2) = iter.next()?;
        let mut best = first.id;
        for (entry, d2) in iter {
            if d2 > best_d2 {
                break;
            }
            if entry.id < best {
                best = entry.id;
            }
        }
        Some(best)
    }

    /// Return up to `k` nearest nodes to `pos`, by ascending distance.
    pub fn k_nearest_nodes(&self, pos: Vec2, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.x, pos.y])
            .take(k)
            .map(|e| e.id)
            .collect()
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Attach external points (docks, storage slots, parking bays) to the
    /// network.  Each point becomes a new node linked to its
    /// [`ATTACH_NEIGHBORS`] nearest **pre-existing** nodes.
    ///
    /// Returns the new ids in input order.  Rebuilds the CSR arrays and the
    /// spatial index; previously returned `NodeId`s stay valid (nodes are
    /// only appended).
    pub fn attach_external_points(&mut self, points: &[Vec2]) -> Vec<NodeId> {
        let mut nodes = std::mem::take(&mut self.node_pos);
        let mut links: Vec<EdgeKey> = self.edges.iter().map(|e| e.key).collect();
        let mut ids = Vec::with_capacity(points.len());

        for &p in points {
            // Query against the old index: externals attach to the core, not
            // to each other.
            let targets = self.k_nearest_nodes(p, ATTACH_NEIGHBORS);
            let id = NodeId(nodes.len() as u32);
            nodes.push(p);
            for t in targets {
                links.push(EdgeKey::new(id, t));
            }
            ids.push(id);
        }

        *self = assemble(nodes, links);
        ids
    }

    /// Wire two node sets together according to `pairing` (straight aisles
    /// between zone boundaries, dock rows onto the main loop, …).
    pub fn connect_sets(&mut self, a: &[NodeId], b: &[NodeId], pairing: Pairing) {
        let mut links: Vec<EdgeKey> = self.edges.iter().map(|e| e.key).collect();

        match pairing {
            Pairing::Nearest => {
                for &na in a {
                    let pa = self.node_pos(na);
                    let nearest = b
                        .iter()
                        .copied()
                        .filter(|&nb| nb != na)
                        .min_by(|&x, &y| {
                            let dx = pa.distance_sq(self.node_pos(x));
                            let dy = pa.distance_sq(self.node_pos(y));
                            dx.total_cmp(&dy).then(x.cmp(&y))
                        });
                    if let Some(nb) = nearest {
                        links.push(EdgeKey::new(na, nb));
                    }
                }
            }
            Pairing::Index => {
                for (&na, &nb) in a.iter().zip(b.iter()) {
                    if na != nb {
                        links.push(EdgeKey::new(na, nb));
                    }
                }
            }
        }

        let nodes = std::mem::take(&mut self.node_pos);
        *self = assemble(nodes, links);
    }
}

// ── RouteGraphBuilder ─────────────────────────────────────────────────────────

/// Construct a [`RouteGraph`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts nodes and undirected links in any order; duplicate
/// links and self-loops are dropped.  `build()` computes edge lengths,
/// derives the CSR arrays, and bulk-loads the R-tree.
///
/// # Example
///
/// ```
/// use agv_core::Vec2;
/// use agv_graph::RouteGraphBuilder;
///
/// let mut b = RouteGraphBuilder::new();
/// let a = b.add_node(Vec2::new(0.0, 0.0));
/// let c = b.add_node(Vec2::new(100.0, 0.0));
/// b.add_link(a, c);
/// let graph = b.build();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// ```
pub struct RouteGraphBuilder {
    nodes: Vec<Vec2>,
    links: Vec<EdgeKey>,
    seen:  std::collections::HashSet<EdgeKey>,
}

impl RouteGraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            seen:  std::collections::HashSet::new(),
        }
    }

    /// Pre-allocate for the expected number of nodes and links.
    pub fn with_capacity(nodes: usize, links: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            links: Vec::with_capacity(links),
            seen:  std::collections::HashSet::with_capacity(links),
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: Vec2) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add an undirected link between `a` and `b`.
    ///
    /// Self-loops and exact duplicates (in either direction) are ignored.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let key = EdgeKey::new(a, b);
        if self.seen.insert(key) {
            self.links.push(key);
        }
    }

    /// Look up the position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> Vec2 {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Consume the builder and produce a [`RouteGraph`].
    ///
    /// Time complexity: O(E log E) for the half-edge sort + O(N log N) for
    /// the R-tree bulk load.
    pub fn build(self) -> RouteGraph {
        assemble(self.nodes, self.links)
    }
}

impl Default for RouteGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Assembly ──────────────────────────────────────────────────────────────────

/// Derive the CSR arrays, edge table, and R-tree from raw nodes + links.
///
/// Shared by the builder, external attachment, and `connect_sets`.  Links
/// are deduplicated here as well so mutation paths do not need to track a
/// seen-set.
fn assemble(nodes: Vec<Vec2>, links: Vec<EdgeKey>) -> RouteGraph {
    let node_count = nodes.len();

    let mut unique: Vec<EdgeKey> = {
        let mut seen = std::collections::HashSet::with_capacity(links.len());
        links.into_iter().filter(|k| seen.insert(*k)).collect()
    };
    // Stable edge order regardless of insertion history.
    unique.sort_unstable();

    let edges: Vec<EdgeRec> = unique
        .iter()
        .map(|&key| EdgeRec {
            key,
            length: nodes[key.a().index()].distance(nodes[key.b().index()]),
        })
        .collect();

    // Two half-edges per undirected edge, sorted by source for CSR.
    let mut half: Vec<(NodeId, NodeId, f32)> = Vec::with_capacity(edges.len() * 2);
    for e in &edges {
        half.push((e.key.a(), e.key.b(), e.length));
        half.push((e.key.b(), e.key.a(), e.length));
    }
    half.sort_unstable_by_key(|&(from, to, _)| (from.0, to.0));

    let mut out_start = vec![0u32; node_count + 1];
    for &(from, _, _) in &half {
        out_start[from.index() + 1] += 1;
    }
    for i in 1..=node_count {
        out_start[i] += out_start[i - 1];
    }
    debug_assert_eq!(out_start[node_count] as usize, half.len());

    let nbr_node: Vec<NodeId> = half.iter().map(|&(_, to, _)| to).collect();
    let nbr_dist: Vec<f32>    = half.iter().map(|&(_, _, d)| d).collect();

    // Bulk-load R-tree for O(N log N) construction (faster than N inserts).
    let entries: Vec<NodeEntry> = nodes
        .iter()
        .enumerate()
        .map(|(i, &pos)| NodeEntry {
            point: [pos.x, pos.y],
            id: NodeId(i as u32),
        })
        .collect();
    let spatial_idx = RTree::bulk_load(entries);

    RouteGraph {
        node_pos: nodes,
        out_start,
        nbr_node,
        nbr_dist,
        edges,
        spatial_idx,
    }
}
