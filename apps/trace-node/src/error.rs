//! Error types for the node.
//!
//! Invocation failures never surface here; they become failure replies.
//! A `NodeError` stops the node.

use thiserror::Error;
use trace_core::CoreError;
use trace_db::DbError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Ledger error: {0}")]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A logged transaction was rejected by the in-memory ledger; the log
    /// and the ledger no longer agree.
    #[error("Transaction {tx_id} logged but not committed: {reason}")]
    Diverged { tx_id: String, reason: String },
}

pub type NodeResult<T> = Result<T, NodeError>;
