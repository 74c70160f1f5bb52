//! # Repository Module
//!
//! Database repositories for the trace node.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  trace-node                                                            │
//! │       │                                                                 │
//! │       │  db.transactions().append(&tx)                                  │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                 │
//! │  ├── append(&self, tx)                                                  │
//! │  ├── load_all(&self)                                                    │
//! │  ├── checksum(&self)                                                    │
//! │  └── replay_into(&self, ledger)                                         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database (transaction_log)                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TransactionRepository`](transaction::TransactionRepository) - Append-only transaction log

pub mod transaction;
