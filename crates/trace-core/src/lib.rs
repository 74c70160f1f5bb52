//! # trace-core: Pure Business Logic for the Traceability Ledger
//!
//! This crate holds the product-traceability state machine. It runs every
//! operation against an abstract [`Ledger`] and never touches a database,
//! the network or the file system.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Traceability Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    trace-node (process)                         │   │
//! │  │    stdin JSON line ──► simulate ──► persist ──► commit ──► reply │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ trace-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ contract  │  │  ledger   │  │hash_chain │  │   text    │  │   │
//! │  │   │ Create    │  │ Ledger    │  │ sha256    │  │  fuzzy    │  │   │
//! │  │   │ Package   │  │ MVCC      │  │ verify    │  │  search   │  │   │
//! │  │   │ Settle    │  │ history   │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • DETERMINISTIC            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   trace-db (Persistence Layer)                  │   │
//! │  │          SQLite transaction log, migrations, log replay         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`contract`] - Operations and the simulate/commit pipeline
//! - [`invocation`] - Function-name dispatch and argument decoding
//! - [`ledger`] - Ledger trait, composite keys, in-memory MVCC ledger
//! - [`context`] - Per-invocation read tracking and write buffering
//! - [`types`] - Ledger records and request payloads
//! - [`hash_chain`] - Rolling record hash
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`identity`], [`text`], [`fuzzy`], [`sequence`], [`batch`] - Helpers
//!
//! ## Example Usage
//!
//! ```rust
//! use trace_core::{Contract, Invocation, MemoryLedger};
//!
//! let mut contract = Contract::new(MemoryLedger::new());
//! let create = Invocation::new(
//!     "Create",
//!     [r#"{"ID":"P1","Manufacturer":"M1","ProductName":"Green Tea"}"#],
//! );
//! let proposal = contract.submit("x509::CN=alice,OU=client", &create).unwrap();
//! assert_eq!(proposal.response["LatestCustodian"], "alice");
//!
//! let query = Invocation::new("Query", [r#"{"ID":"P1","Manufacturer":"M1"}"#]);
//! let proposal = contract.simulate("x509::CN=bob", &query).unwrap();
//! assert!(proposal.transaction.is_none());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod context;
pub mod contract;
pub mod error;
pub mod fuzzy;
pub mod hash_chain;
pub mod identity;
pub mod invocation;
pub mod ledger;
pub mod sequence;
pub mod text;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use contract::{Contract, Proposal};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use invocation::Invocation;
pub use ledger::{Ledger, LedgerError, MemoryLedger, Transaction};
pub use types::*;
