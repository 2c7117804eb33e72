use thiserror::Error;

/// Result type for collective operations.
pub type Result<T> = std::result::Result<T, CoordinationError>;

#[derive(Error, Debug)]
pub enum CoordinationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Group initialization error: {0}")]
    GroupInit(String),

    #[error("Synchronization violation in {operation}: {reason}")]
    SyncViolation {
        operation: String, // e.g., "size exchange" or "dataset define"
        reason: String,
    },

    #[error("Size overflow while {context}")]
    SizeOverflow { context: String },

    #[error("Invalid container '{path}': {reason}")]
    InvalidContainer { path: String, reason: String },

    #[error("Collective {operation} failed on rank(s) {ranks:?}")]
    PeerFailure {
        operation: String,
        ranks: Vec<usize>,
    },

    #[error("Worker {rank} aborted: {reason}")]
    WorkerAborted { rank: usize, reason: String },

    #[error(transparent)]
    Storage(#[from] std::io::Error),
}
