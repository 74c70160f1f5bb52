//! # Ledger
//!
//! The versioned key-value store every contract operation runs against.
//!
//! ## Commit Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Optimistic Concurrency (MVCC)                       │
//! │                                                                         │
//! │  simulate                          commit                               │
//! │  ────────                          ──────                               │
//! │  read k1 @ v3  ─┐                  k1 still @ v3 ?  ── no ──► Conflict  │
//! │  read k2 @ -   ─┼─► Transaction ─► k2 still absent? ── no ──► Conflict  │
//! │  write k1, k3  ─┘                  yes: height += 1                     │
//! │                                    k1, k3 @ v(height)                   │
//! │                                    history += entries                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All writes of a transaction are applied or none are.
//!
//! ## Composite Keys
//! `composite_key("product", ["M1", "P1"])` encodes to `"\0product\0M1\0P1\0"`.
//! A prefix key omits trailing parts, so scanning `prefix_key("product", ["M1"])`
//! returns every product of manufacturer `M1` and nothing else.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Separator between composite key components.
pub const KEY_SEPARATOR: char = '\u{0}';

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by a ledger implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A key read by the transaction changed since it was read.
    ///
    /// ## When This Occurs
    /// Two invocations touching the same key were simulated against the same
    /// snapshot. The first to commit wins; the other must be resubmitted.
    #[error("Read conflict on key {key}")]
    Conflict { key: String },

    /// The transaction id was already committed.
    #[error("Transaction already committed: {tx_id}")]
    DuplicateTransaction { tx_id: String },

    /// Namespace or part cannot be encoded.
    #[error("Invalid composite key: {reason}")]
    InvalidKey { reason: String },

    /// Storage backend failure.
    #[error("Ledger backend error: {0}")]
    Backend(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Composite Keys
// =============================================================================

/// Encodes a namespace and its parts into one ledger key.
pub fn composite_key(namespace: &str, parts: &[&str]) -> LedgerResult<String> {
    prefix_key(namespace, parts)
}

/// Key prefix covering every composite key that starts with `parts`.
///
/// Identical encoding to [`composite_key`]; the separator after the last part
/// keeps `M1` from matching `M10`.
pub fn prefix_key(namespace: &str, parts: &[&str]) -> LedgerResult<String> {
    if namespace.is_empty() {
        return Err(LedgerError::InvalidKey {
            reason: "namespace must not be empty".to_string(),
        });
    }
    check_component(namespace)?;

    let mut key = String::with_capacity(
        namespace.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>() + 2,
    );
    key.push(KEY_SEPARATOR);
    key.push_str(namespace);
    key.push(KEY_SEPARATOR);
    for part in parts {
        check_component(part)?;
        key.push_str(part);
        key.push(KEY_SEPARATOR);
    }
    Ok(key)
}

fn check_component(component: &str) -> LedgerResult<()> {
    if component.contains(KEY_SEPARATOR) {
        return Err(LedgerError::InvalidKey {
            reason: format!("{component:?} contains the key separator"),
        });
    }
    Ok(())
}

// =============================================================================
// Values, History, Transactions
// =============================================================================

/// Current value of a key together with the height that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: String,
    pub version: u64,
}

/// One version of a key, as returned by [`Ledger::history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub tx_id: String,
    /// `None` when the version is a deletion.
    pub value: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_delete: bool,
}

/// A key observed during simulation and the version it had.
///
/// `version == None` records that the key was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadVersion {
    pub key: String,
    pub version: Option<u64>,
}

/// A staged write. `value == None` deletes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Write {
    pub key: String,
    pub value: Option<String>,
}

/// The unit of atomic commit: read set plus ordered write set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    /// Raw identity of the invoking caller.
    pub creator: String,
    /// Invocation function name.
    pub function: String,
    pub reads: Vec<ReadVersion>,
    pub writes: Vec<Write>,
}

// =============================================================================
// Ledger Trait
// =============================================================================

/// Versioned key-value ledger consumed by the contract.
pub trait Ledger {
    /// Current value and version of a key.
    fn get_state(&self, key: &str) -> LedgerResult<Option<VersionedValue>>;

    /// Every live `(key, value)` whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> LedgerResult<Vec<(String, String)>>;

    /// Every version of a key, oldest first.
    fn history(&self, key: &str) -> LedgerResult<Vec<HistoryEntry>>;

    /// Validates the read set and applies the write set atomically.
    ///
    /// Returns the new ledger height.
    fn commit(&mut self, tx: &Transaction) -> LedgerResult<u64>;
}

// =============================================================================
// Memory Ledger
// =============================================================================

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    version: u64,
}

/// In-memory MVCC ledger.
///
/// The durable transaction log in `trace-db` rebuilds one of these on start-up
/// by replaying every committed transaction in order.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: BTreeMap<String, Slot>,
    history: HashMap<String, Vec<HistoryEntry>>,
    committed: HashSet<String>,
    height: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed transactions.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Snapshot of every live key and value, in key order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.state
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    fn current_version(&self, key: &str) -> Option<u64> {
        self.state.get(key).map(|slot| slot.version)
    }
}

impl Ledger for MemoryLedger {
    fn get_state(&self, key: &str) -> LedgerResult<Option<VersionedValue>> {
        Ok(self.state.get(key).map(|slot| VersionedValue {
            value: slot.value.clone(),
            version: slot.version,
        }))
    }

    fn scan_prefix(&self, prefix: &str) -> LedgerResult<Vec<(String, String)>> {
        Ok(self
            .state
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect())
    }

    fn history(&self, key: &str) -> LedgerResult<Vec<HistoryEntry>> {
        Ok(self.history.get(key).cloned().unwrap_or_default())
    }

    fn commit(&mut self, tx: &Transaction) -> LedgerResult<u64> {
        if self.committed.contains(&tx.tx_id) {
            return Err(LedgerError::DuplicateTransaction {
                tx_id: tx.tx_id.clone(),
            });
        }

        // Validate everything before touching state.
        for read in &tx.reads {
            if self.current_version(&read.key) != read.version {
                return Err(LedgerError::Conflict {
                    key: read.key.clone(),
                });
            }
        }

        self.height += 1;
        let version = self.height;

        for write in &tx.writes {
            match &write.value {
                Some(value) => {
                    self.state.insert(
                        write.key.clone(),
                        Slot {
                            value: value.clone(),
                            version,
                        },
                    );
                }
                None => {
                    self.state.remove(&write.key);
                }
            }
            self.history
                .entry(write.key.clone())
                .or_default()
                .push(HistoryEntry {
                    tx_id: tx.tx_id.clone(),
                    value: write.value.clone(),
                    timestamp: tx.timestamp,
                    is_delete: write.value.is_none(),
                });
        }

        self.committed.insert(tx.tx_id.clone());
        debug!(
            tx_id = %tx.tx_id,
            function = %tx.function,
            writes = tx.writes.len(),
            height = version,
            "Committed transaction"
        );
        Ok(version)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
