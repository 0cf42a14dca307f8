use thiserror::Error;

/// Errors surfaced by the write-path core.
///
/// Executors never panic on these; they are caught at the phase boundary and
/// converted into the `(ok=false, reply)` contract described in the reply
/// dictionary (see `crate::reply`).
#[derive(Debug, Error)]
pub enum FkError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("lease lost mid-operation for path {path}")]
    LeaseLost { path: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
