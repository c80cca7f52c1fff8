//! Graph-subsystem error type.

use thiserror::Error;

/// Errors produced by `agv-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node id {got} out of order in fixture: expected {expected}")]
    NonSequentialNode { expected: u32, got: u32 },

    #[error("link references unknown node {node} (node count {count})")]
    UnknownNode { node: u32, count: usize },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
