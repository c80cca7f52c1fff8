//! `agv-graph` — route network representation and layout generators.
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`graph`]   | `RouteGraph`, `RouteGraphBuilder`, external attachment|
//! | [`grid`]    | structured-grid and seeded-random layout generators   |
//! | [`fixture`] | CSV topology loader for fixed test/demo networks      |
//! | [`error`]   | `GraphError`, `GraphResult`                           |
//!
//! The graph is the static substrate the planners search over: nodes are
//! floor positions with stable integer ids, edges are undirected weighted
//! links.  Topology changes happen only through wholesale rebuilds or the
//! explicit attachment calls — never behind the planners' backs.

pub mod error;
pub mod fixture;
pub mod graph;
pub mod grid;

#[cfg(test)]
mod tests;

pub use error::{GraphError, GraphResult};
pub use fixture::{load_graph_csv, load_graph_readers};
pub use graph::{EdgeRec, Pairing, RouteGraph, RouteGraphBuilder};
pub use grid::{GridSpec, RandomLayout, Rect, build_grid, build_random};
