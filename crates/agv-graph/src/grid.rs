//! Layout generators: structured grids and seeded random cores.
//!
//! # Grid layout
//!
//! Each rectangular area gets a lattice of cell-corner nodes plus one
//! "intersection" node at the centre of every cell:
//!
//! ```text
//! c───c───c        c = corner, i = intersection
//! │╲ ╱│╲ ╱│        corners link E, S, SE, SW;
//! │ i │ i │        each intersection links to its
//! │╱ ╲│╱ ╲│        4 surrounding corners
//! c───c───c
//! ```
//!
//! Corner spacing is found by bisection so the total node count approaches
//! `GridSpec::target_points`.  Adjacent areas are stitched together with a
//! small number of nearest-pair bridge edges.
//!
//! # Random layout
//!
//! The pre-grid layout survives as [`build_random`]: uniform nodes per area,
//! k-nearest wiring, plus probabilistic extra edges.  It takes an explicit
//! `&mut SimRng` — the same seed always reproduces the same network.

use agv_core::{NodeId, SimRng, Vec2};

use crate::graph::{RouteGraph, RouteGraphBuilder};

/// Bridge edges added between each pair of adjacent areas.
pub const BRIDGES_PER_PAIR: usize = 4;

/// Bisection bounds for corner spacing, in floor units.
const SPACING_MIN: f32 = 20.0;
const SPACING_MAX: f32 = 200.0;
const SPACING_FLOOR: f32 = 10.0;
const SPACING_ITERS: usize = 24;

// ── Area rectangles ───────────────────────────────────────────────────────────

/// An axis-aligned rectangular area of the floor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

// ── Grid spec ─────────────────────────────────────────────────────────────────

/// Parameters for [`build_grid`].
#[derive(Clone, Debug)]
pub struct GridSpec {
    /// Desired total node count (corners + intersections across all areas).
    /// The generator approximates this; it does not hit it exactly.
    pub target_points: usize,

    /// One or more rectangular areas to cover.  Adjacent entries are bridged.
    pub areas: Vec<Rect>,
}

/// Generate a structured grid network per `spec`.
///
/// Deterministic: the same spec always yields the same graph (node ids
/// included).
pub fn build_grid(spec: &GridSpec) -> RouteGraph {
    let target = spec.target_points.max(2);
    let spacing = spacing_for_target(target, &spec.areas);

    let mut b = RouteGraphBuilder::new();
    let mut per_area: Vec<Vec<NodeId>> = Vec::with_capacity(spec.areas.len());

    for area in &spec.areas {
        per_area.push(grid_area(&mut b, area, spacing));
    }

    // Stitch adjacent areas together with a few nearest bridges.
    for pair in per_area.windows(2) {
        bridge_areas(&mut b, &pair[0], &pair[1]);
    }

    b.build()
}

/// Lay one area's corners + intersections into `b`; returns all ids created.
fn grid_area(b: &mut RouteGraphBuilder, area: &Rect, spacing: f32) -> Vec<NodeId> {
    let padding = spacing / 2.0;
    let cols = (((area.w - padding * 2.0) / spacing).floor().max(0.0)) as usize;
    let rows = (((area.h - padding * 2.0) / spacing).floor().max(0.0)) as usize;

    // Center the lattice within the area.
    let offset_x = area.x + (area.w - cols as f32 * spacing) / 2.0;
    let offset_y = area.y + (area.h - rows as f32 * spacing) / 2.0;

    let mut created = Vec::with_capacity((rows + 1) * (cols + 1) + rows * cols);

    // Corner lattice, row-major.
    let mut corners = Vec::with_capacity((rows + 1) * (cols + 1));
    for r in 0..=rows {
        for c in 0..=cols {
            let id = b.add_node(Vec2::new(
                offset_x + c as f32 * spacing,
                offset_y + r as f32 * spacing,
            ));
            corners.push(id);
            created.push(id);
        }
    }
    let corner = |r: usize, c: usize| corners[r * (cols + 1) + c];

    // Intersection node at the centre of each cell, linked to its 4 corners.
    for r in 0..rows {
        for c in 0..cols {
            let id = b.add_node(Vec2::new(
                offset_x + c as f32 * spacing + spacing / 2.0,
                offset_y + r as f32 * spacing + spacing / 2.0,
            ));
            b.add_link(id, corner(r, c));
            b.add_link(id, corner(r, c + 1));
            b.add_link(id, corner(r + 1, c));
            b.add_link(id, corner(r + 1, c + 1));
            created.push(id);
        }
    }

    // Corner connectivity: east, south, and both southward diagonals.
    for r in 0..=rows {
        for c in 0..=cols {
            if c < cols {
                b.add_link(corner(r, c), corner(r, c + 1));
            }
            if r < rows {
                b.add_link(corner(r, c), corner(r + 1, c));
                if c < cols {
                    b.add_link(corner(r, c), corner(r + 1, c + 1));
                }
                if c > 0 {
                    b.add_link(corner(r, c), corner(r + 1, c - 1));
                }
            }
        }
    }

    created
}

/// Add the [`BRIDGES_PER_PAIR`] shortest cross-area links between `a` and `b`.
fn bridge_areas(b: &mut RouteGraphBuilder, left: &[NodeId], right: &[NodeId]) {
    let mut pairs: Vec<(f32, NodeId, NodeId)> = Vec::new();
    for &na in left {
        for &nb in right {
            pairs.push((b.node_pos(na).distance(b.node_pos(nb)), na, nb));
        }
    }
    // Distance, then ids — fully deterministic bridge selection.
    pairs.sort_unstable_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));

    let before = b.link_count();
    for &(_, na, nb) in &pairs {
        if b.link_count() - before >= BRIDGES_PER_PAIR {
            break;
        }
        b.add_link(na, nb);
    }
}

// ── Spacing search ────────────────────────────────────────────────────────────

/// Node count a given spacing would produce across `areas`.
pub fn points_for_spacing(spacing: f32, areas: &[Rect]) -> usize {
    let mut total = 0usize;
    for area in areas {
        let padding = spacing / 2.0;
        let cols = (((area.w - padding * 2.0) / spacing).floor().max(0.0)) as usize;
        let rows = (((area.h - padding * 2.0) / spacing).floor().max(0.0)) as usize;
        total += (rows + 1) * (cols + 1) + rows * cols;
    }
    total
}

/// Find a spacing whose node count approximates `target` by bisection.
///
/// Node count decreases monotonically with spacing, so 24 halvings of the
/// [20, 200] range pin the best achievable count.
pub fn spacing_for_target(target: usize, areas: &[Rect]) -> f32 {
    let mut lo = SPACING_MIN;
    let mut hi = SPACING_MAX;
    let mut best = 80.0f32;
    let mut best_diff = usize::MAX;

    for _ in 0..SPACING_ITERS {
        let mid = (lo + hi) / 2.0;
        let count = points_for_spacing(mid, areas);
        let diff = count.abs_diff(target);
        if diff < best_diff {
            best_diff = diff;
            best = mid;
        }
        if count > target {
            // Too many points → widen the spacing.
            lo = mid;
        } else {
            hi = mid;
        }
    }

    best.round().max(SPACING_FLOOR)
}

// ── Random layout ─────────────────────────────────────────────────────────────

/// Parameters for [`build_random`].
#[derive(Clone, Debug)]
pub struct RandomLayout {
    /// Total nodes, split evenly across areas.
    pub node_count: usize,
    pub areas: Vec<Rect>,
    /// Each node links to its `k_nearest` nearest peers.
    pub k_nearest: usize,
    /// Number of extra-edge attempts after the k-nearest pass.
    pub extra_edges: usize,
    /// Probability that each extra-edge attempt actually adds a link.
    pub edge_probability: f64,
}

impl Default for RandomLayout {
    fn default() -> Self {
        Self {
            node_count:       40,
            areas:            vec![Rect::new(300.0, 120.0, 800.0, 700.0)],
            k_nearest:        2,
            extra_edges:      50,
            edge_probability: 0.05,
        }
    }
}

/// Generate a random route core driven by an explicit seeded RNG.
pub fn build_random(cfg: &RandomLayout, rng: &mut SimRng) -> RouteGraph {
    let mut b = RouteGraphBuilder::with_capacity(cfg.node_count, cfg.node_count * cfg.k_nearest);
    let area_count = cfg.areas.len().max(1);
    let per_area = cfg.node_count.div_ceil(area_count);

    for (i, area) in cfg.areas.iter().enumerate() {
        let n = if i == area_count - 1 {
            cfg.node_count - b.node_count()
        } else {
            per_area
        };
        for _ in 0..n {
            b.add_node(Vec2::new(
                rng.gen_range(area.x..area.x + area.w),
                rng.gen_range(area.y..area.y + area.h),
            ));
        }
    }

    // k-nearest wiring.
    let k = cfg.k_nearest.max(1);
    let count = b.node_count();
    for i in 0..count {
        let a = NodeId(i as u32);
        let pa = b.node_pos(a);
        let mut others: Vec<(f32, u32)> = (0..count as u32)
            .filter(|&j| j != i as u32)
            .map(|j| (pa.distance_sq(b.node_pos(NodeId(j))), j))
            .collect();
        others.sort_unstable_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
        for &(_, j) in others.iter().take(k) {
            b.add_link(a, NodeId(j));
        }
    }

    // Extra random edges.
    for _ in 0..cfg.extra_edges {
        if !rng.gen_bool(cfg.edge_probability) {
            continue;
        }
        let i = rng.gen_range(0..count as u32);
        let j = rng.gen_range(0..count as u32);
        if i != j {
            b.add_link(NodeId(i), NodeId(j));
        }
    }

    b.build()
}
