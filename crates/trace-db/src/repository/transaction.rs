//! # Transaction Log Repository
//!
//! Append-only storage of committed ledger transactions.
//!
//! ## Write-Ahead Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  simulate ──► Proposal.transaction                                      │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  append(tx): INSERT (tx_id, ..., payload, sha256(payload))              │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  MemoryLedger::commit(tx)                                               │
//! │                                                                         │
//! │  RESTART                                                                │
//! │  load_all() in seq order ──► replay_into(fresh MemoryLedger)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The log checksum chains each stored digest onto the previous value:
//! `c0 = ""`, `cN = sha256(cN-1 || digestN)`.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{debug, info};
use trace_core::{Ledger, MemoryLedger, Transaction};

use crate::error::{DbError, DbResult};

/// One stored log row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LogRow {
    pub seq: i64,
    pub tx_id: String,
    pub function: String,
    pub creator: String,
    pub timestamp: String,
    pub payload: String,
    pub digest: String,
}

/// Repository for the `transaction_log` table.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Appends a transaction and returns its sequence number.
    ///
    /// ## Errors
    /// * `UniqueViolation` - the transaction id is already logged
    pub async fn append(&self, tx: &Transaction) -> DbResult<i64> {
        let payload = serde_json::to_string(tx)?;
        let digest = digest_hex(payload.as_bytes());

        let result = sqlx::query(
            r#"
            INSERT INTO transaction_log (tx_id, function, creator, timestamp, payload, digest)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&tx.tx_id)
        .bind(&tx.function)
        .bind(&tx.creator)
        .bind(tx.timestamp.to_rfc3339())
        .bind(&payload)
        .bind(&digest)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("tx_id", &tx.tx_id),
            other => other,
        })?;

        let seq = result.last_insert_rowid();
        debug!(seq, tx_id = %tx.tx_id, function = %tx.function, "Transaction logged");
        Ok(seq)
    }

    /// Every logged row in commit order.
    pub async fn rows(&self) -> DbResult<Vec<LogRow>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT seq, tx_id, function, creator, timestamp, payload, digest
            FROM transaction_log
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Every logged transaction in commit order.
    ///
    /// Fails if a stored payload no longer matches its digest.
    pub async fn load_all(&self) -> DbResult<Vec<Transaction>> {
        self.rows()
            .await?
            .into_iter()
            .map(|row| {
                if digest_hex(row.payload.as_bytes()) != row.digest {
                    return Err(DbError::Internal(format!(
                        "digest mismatch at seq {} ({})",
                        row.seq, row.tx_id
                    )));
                }
                Ok(serde_json::from_str(&row.payload)?)
            })
            .collect()
    }

    /// Looks up one transaction by id.
    pub async fn get(&self, tx_id: &str) -> DbResult<Transaction> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM transaction_log WHERE tx_id = ?1")
                .bind(tx_id)
                .fetch_optional(&self.pool)
                .await?;
        let payload = payload.ok_or_else(|| DbError::not_found("Transaction", tx_id))?;
        Ok(serde_json::from_str(&payload)?)
    }

    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transaction_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Rolling checksum over every stored digest, in commit order.
    ///
    /// Empty for an empty log.
    pub async fn checksum(&self) -> DbResult<String> {
        let digests: Vec<String> =
            sqlx::query_scalar("SELECT digest FROM transaction_log ORDER BY seq")
                .fetch_all(&self.pool)
                .await?;
        Ok(rolling_checksum(digests.iter().map(String::as_str)))
    }

    /// Rebuilds world state and history by committing every logged
    /// transaction into `ledger`. Returns the number replayed.
    pub async fn replay_into(&self, ledger: &mut MemoryLedger) -> DbResult<usize> {
        let transactions = self.load_all().await?;
        for tx in &transactions {
            ledger.commit(tx)?;
        }
        info!(
            replayed = transactions.len(),
            height = ledger.height(),
            "Transaction log replayed"
        );
        Ok(transactions.len())
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `c0 = ""`, `cN = sha256(cN-1 || digestN)`.
pub fn rolling_checksum<'a>(digests: impl IntoIterator<Item = &'a str>) -> String {
    digests.into_iter().fold(String::new(), |acc, digest| {
        let mut hasher = Sha256::new();
        hasher.update(acc.as_bytes());
        hasher.update(digest.as_bytes());
        hex::encode(hasher.finalize())
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
