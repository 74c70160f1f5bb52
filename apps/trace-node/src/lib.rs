//! # Trace Node Library
//!
//! Process-level wiring around `trace-core` and `trace-db`.
//!
//! ## Module Organization
//! ```text
//! trace_node/
//! ├── lib.rs        ◄─── You are here (tracing setup)
//! ├── config.rs     ◄─── NodeConfig: defaults → TOML → env → validate
//! ├── protocol.rs   ◄─── Request / Reply line format
//! ├── node.rs       ◄─── simulate → log → commit, stdin/stdout loop
//! └── error.rs      ◄─── NodeError
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod protocol;

use tracing_subscriber::EnvFilter;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use node::Node;

/// Initializes structured logging on stderr.
///
/// `RUST_LOG` wins over `default_filter`. Stdout carries replies only.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
