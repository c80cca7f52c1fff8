//! CSV topology fixture loader.
//!
//! Fixed layouts (test benches, hand-drawn depots) live in two CSV files:
//!
//! ```csv
//! node_id,x,y
//! 0,100.0,700.0
//! 1,300.0,750.0
//! ```
//!
//! ```csv
//! from,to
//! 0,1
//! ```
//!
//! `node_id` must be sequential from 0 — node identity is positional, and a
//! gap would silently shift every later id.  Links reference node ids;
//! duplicates and self-loops are dropped by the builder.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use agv_core::NodeId;

use crate::error::{GraphError, GraphResult};
use crate::graph::{RouteGraph, RouteGraphBuilder};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    node_id: u32,
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
struct LinkRecord {
    from: u32,
    to: u32,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`RouteGraph`] from `nodes.csv` + `links.csv` files.
pub fn load_graph_csv(nodes_path: &Path, links_path: &Path) -> GraphResult<RouteGraph> {
    let nodes = std::fs::File::open(nodes_path).map_err(GraphError::Io)?;
    let links = std::fs::File::open(links_path).map_err(GraphError::Io)?;
    load_graph_readers(nodes, links)
}

/// Like [`load_graph_csv`] but accepts any `Read` sources.
///
/// Useful for testing (pass `std::io::Cursor`s) or embedded fixtures.
pub fn load_graph_readers<N: Read, L: Read>(nodes: N, links: L) -> GraphResult<RouteGraph> {
    let mut b = RouteGraphBuilder::new();

    // ── Nodes ─────────────────────────────────────────────────────────────
    let mut node_reader = csv::Reader::from_reader(nodes);
    for result in node_reader.deserialize::<NodeRecord>() {
        let row = result.map_err(|e| GraphError::Parse(e.to_string()))?;
        let expected = b.node_count() as u32;
        if row.node_id != expected {
            return Err(GraphError::NonSequentialNode { expected, got: row.node_id });
        }
        b.add_node(agv_core::Vec2::new(row.x, row.y));
    }
    let count = b.node_count();

    // ── Links ─────────────────────────────────────────────────────────────
    let mut link_reader = csv::Reader::from_reader(links);
    for result in link_reader.deserialize::<LinkRecord>() {
        let row = result.map_err(|e| GraphError::Parse(e.to_string()))?;
        for node in [row.from, row.to] {
            if node as usize >= count {
                return Err(GraphError::UnknownNode { node, count });
            }
        }
        b.add_link(NodeId(row.from), NodeId(row.to));
    }

    Ok(b.build())
}
