use thiserror::Error;

use agv_core::AgentId;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("agent {0} not found")]
    UnknownAgent(AgentId),

    #[error("agent {0} is not idle and cannot accept a task")]
    AgentBusy(AgentId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

pub type SimResult<T> = Result<T, SimError>;
