use thiserror::Error;

use crate::problem::error::ConfigurationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("optimization was cancelled")]
    Cancelled,

    #[error("all search workers failed, last failure: {0}")]
    WorkerFailed(String),

    #[error("result channel closed before the run finished")]
    ChannelClosed,
}
