//! # trace-node
//!
//! Serves line-delimited JSON invocations on stdin/stdout.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Load configuration (CLI path or platform default, then TRACE_*)     │
//! │  2. Initialize tracing on stderr                                        │
//! │  3. Open the SQLite log, run migrations                                 │
//! │  4. Replay the log into a fresh in-memory ledger                        │
//! │  5. Serve stdin until EOF, Ctrl+C or SIGTERM                            │
//! │  6. Close the pool                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! trace-node [path/to/node.toml] < requests.jsonl
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{stdin, stdout, BufReader};
use tracing::{info, warn};
use trace_db::Database;
use trace_node::{init_tracing, Node, NodeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = NodeConfig::load(config_path.as_deref()).context("loading configuration")?;

    init_tracing(&config.log_filter);
    info!(
        database = %config.database_path.display(),
        max_connections = config.max_connections,
        "Starting trace node"
    );

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(config.db_config())
        .await
        .context("opening transaction log")?;
    let mut node = Node::open(db.transactions(), config.verify_checksum)
        .await
        .context("replaying transaction log")?;

    let served = node
        .serve(BufReader::new(stdin()), stdout(), shutdown_signal())
        .await;

    db.close().await;
    let served = served.context("serving requests")?;
    info!(served, "Node stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
