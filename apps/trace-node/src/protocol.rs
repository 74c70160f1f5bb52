//! # Wire Protocol
//!
//! One JSON object per line in each direction.
//!
//! ```text
//! stdin   {"identity": "x509::CN=alice,...", "function": "Query", "args": ["{...}"]}
//! stdout  {"ok": true,  "tx_id": null, "payload": {...}}
//!         {"ok": false, "code": "NOT_FOUND", "message": "Product not found: M1/P9"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trace_core::{CoreError, Invocation};
use trace_db::DbError;

/// One invocation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub identity: String,
    #[serde(flatten)]
    pub invocation: Invocation,
}

/// One reply line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Success {
        ok: bool,
        tx_id: Option<String>,
        payload: Value,
    },
    Failure {
        ok: bool,
        code: String,
        message: String,
    },
}

impl Reply {
    pub fn success(tx_id: Option<String>, payload: Value) -> Self {
        Reply::Success {
            ok: true,
            tx_id,
            payload,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Reply::Failure {
            ok: false,
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<CoreError> for Reply {
    fn from(err: CoreError) -> Self {
        Reply::failure(err.kind().code(), err.to_string())
    }
}

impl From<DbError> for Reply {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Transaction log write failed");
        Reply::failure("INTERNAL", "Transaction log write failed")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
