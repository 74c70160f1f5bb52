//! # Transaction Context
//!
//! Per-invocation view over one ledger snapshot.
//!
//! Every read records the version it observed; every write is buffered.
//! Nothing reaches the ledger until the resulting [`Transaction`] is
//! committed, so dropping a context on error discards all staged writes.
//!
//! Reads see the context's own staged writes first (read-your-writes), which
//! lets a settlement batch with two lines for the same product accumulate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::identity::CallerIdentity;
use crate::ledger::{HistoryEntry, Ledger, ReadVersion, Transaction, Write};

// =============================================================================
// Header
// =============================================================================

/// Transaction id and timestamp assigned to an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHeader {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
}

impl TxHeader {
    /// Fresh UUID v4 id, current time.
    pub fn new() -> Self {
        TxHeader {
            tx_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Header with a caller-chosen id and time.
    pub fn fixed(tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        TxHeader {
            tx_id: tx_id.into(),
            timestamp,
        }
    }
}

impl Default for TxHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Context
// =============================================================================

pub struct TxContext<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    caller: CallerIdentity,
    header: TxHeader,
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, Option<String>>,
}

impl<'a, L: Ledger + ?Sized> TxContext<'a, L> {
    pub fn new(ledger: &'a L, caller: CallerIdentity, header: TxHeader) -> Self {
        TxContext {
            ledger,
            caller,
            header,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    pub fn header(&self) -> &TxHeader {
        &self.header
    }

    /// Raw value of a key, staged writes first.
    pub fn get_state(&mut self, key: &str) -> CoreResult<Option<String>> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }

        let current = self.ledger.get_state(key)?;
        let version = current.as_ref().map(|v| v.version);
        // Keep the first observed version; the snapshot does not move.
        self.reads.entry(key.to_string()).or_insert(version);
        Ok(current.map(|v| v.value))
    }

    /// True if the key currently holds a value.
    pub fn exists(&mut self, key: &str) -> CoreResult<bool> {
        Ok(self.get_state(key)?.is_some())
    }

    /// Reads and decodes a JSON value.
    pub fn get_json<T: DeserializeOwned>(&mut self, key: &str) -> CoreResult<Option<T>> {
        match self.get_state(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CoreError::Corrupted {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Stages a raw value.
    pub fn put_state(&mut self, key: impl Into<String>, value: String) {
        let key = key.into();
        debug!(key = %key.escape_debug(), "Staged write");
        self.writes.insert(key, Some(value));
    }

    /// Encodes and stages a JSON value.
    pub fn put_json<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> CoreResult<()> {
        let key = key.into();
        let raw = serde_json::to_string(value).map_err(|e| CoreError::Corrupted {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.put_state(key, raw);
        Ok(())
    }

    /// Range scan against the snapshot. Staged writes are not merged in.
    pub fn scan_prefix(&self, prefix: &str) -> CoreResult<Vec<(String, String)>> {
        Ok(self.ledger.scan_prefix(prefix)?)
    }

    pub fn history(&self, key: &str) -> CoreResult<Vec<HistoryEntry>> {
        Ok(self.ledger.history(key)?)
    }

    /// Number of staged writes.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Closes the context.
    ///
    /// Returns `None` for read-only invocations.
    pub fn into_transaction(self, function: &str) -> Option<Transaction> {
        if self.writes.is_empty() {
            return None;
        }
        Some(Transaction {
            tx_id: self.header.tx_id,
            timestamp: self.header.timestamp,
            creator: self.caller.raw().to_string(),
            function: function.to_string(),
            reads: self
                .reads
                .into_iter()
                .map(|(key, version)| ReadVersion { key, version })
                .collect(),
            writes: self
                .writes
                .into_iter()
                .map(|(key, value)| Write { key, value })
                .collect(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    fn ctx(ledger: &MemoryLedger) -> TxContext<'_, MemoryLedger> {
        TxContext::new(
            ledger,
            CallerIdentity::resolve("CN=alice"),
            TxHeader::fixed("tx-1", Utc::now()),
        )
    }

    #[test]
    fn test_read_your_writes() {
        let ledger = MemoryLedger::new();
        let mut ctx = ctx(&ledger);
        assert!(!ctx.exists("k").unwrap());
        ctx.put_state("k", "v".to_string());
        assert_eq!(ctx.get_state("k").unwrap().as_deref(), Some("v"));
        assert!(ledger.get_state("k").unwrap().is_none());
    }

    #[test]
    fn test_transaction_carries_read_set() {
        let ledger = MemoryLedger::new();
        let mut ctx = ctx(&ledger);
        ctx.get_state("absent").unwrap();
        ctx.put_json("k", &vec![1, 2]).unwrap();

        let tx = ctx.into_transaction("Create").unwrap();
        assert_eq!(tx.tx_id, "tx-1");
        assert_eq!(tx.creator, "CN=alice");
        assert_eq!(
            tx.reads,
            vec![ReadVersion {
                key: "absent".to_string(),
                version: None
            }]
        );
        assert_eq!(tx.writes[0].value.as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_read_only_context_has_no_transaction() {
        let ledger = MemoryLedger::new();
        let mut ctx = ctx(&ledger);
        ctx.get_state("k").unwrap();
        assert!(ctx.into_transaction("Query").is_none());
    }

    #[test]
    fn test_corrupted_value() {
        let mut ledger = MemoryLedger::new();
        ledger
            .commit(&Transaction {
                tx_id: "seed".to_string(),
                timestamp: Utc::now(),
                creator: String::new(),
                function: "Seed".to_string(),
                reads: vec![],
                writes: vec![Write {
                    key: "k".to_string(),
                    value: Some("not json".to_string()),
                }],
            })
            .unwrap();
        let mut ctx = ctx(&ledger);
        let err = ctx.get_json::<Vec<i32>>("k").unwrap_err();
        assert!(matches!(err, CoreError::Corrupted { .. }));
    }
}
