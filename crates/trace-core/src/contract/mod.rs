//! # Contract
//!
//! The product-traceability state machine over a [`Ledger`].
//!
//! ## Invocation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller identity + Invocation                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  simulate()                                                             │
//! │   ├── resolve identity (CN=...)                                         │
//! │   ├── TxContext over the current snapshot                               │
//! │   ├── dispatch → product / packaging / transfer / revenue / query       │
//! │   └── Proposal { response, transaction: read set + write set }          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit(transaction)  ── stale read? ──► Conflict (resubmit)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  writes applied atomically, history appended                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Query invocations produce no transaction.
//!
//! ## Product Lifecycle
//! ```text
//!  Create ──► [open] ──Update/Transfer──► [open]
//!                │
//!             Package (codes)
//!                ▼
//!          [in packaging] ──Package──► [in packaging]
//!                │
//!             Package (complete) ──► RevenueRecord created
//!                ▼
//!          [complete]  ◄── Settle decrements revenue quantity
//! ```

pub mod keys;
pub mod packaging;
pub mod product;
pub mod query;
pub mod revenue;
pub mod transfer;

use serde_json::Value;
use tracing::{info, warn};

use crate::context::{TxContext, TxHeader};
use crate::error::{CoreError, CoreResult};
use crate::identity::CallerIdentity;
use crate::invocation::{self, Invocation};
use crate::ledger::{Ledger, Transaction};
use crate::types::{OwnerIndex, ProductRecord};

// =============================================================================
// Proposal
// =============================================================================

/// Result of simulating an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Canonical JSON returned to the caller.
    pub response: Value,
    /// `None` for read-only invocations.
    pub transaction: Option<Transaction>,
}

impl Proposal {
    pub fn tx_id(&self) -> Option<&str> {
        self.transaction.as_ref().map(|tx| tx.tx_id.as_str())
    }
}

// =============================================================================
// Contract
// =============================================================================

/// Owns the ledger and runs invocations against it.
#[derive(Debug)]
pub struct Contract<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> Contract<L> {
    pub fn new(ledger: L) -> Self {
        Contract { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    /// Runs an invocation against the current snapshot without committing.
    pub fn simulate(&self, identity: &str, invocation: &Invocation) -> CoreResult<Proposal> {
        self.simulate_with(identity, invocation, TxHeader::new())
    }

    /// Like [`simulate`](Self::simulate) with a caller-supplied header.
    pub fn simulate_with(
        &self,
        identity: &str,
        invocation: &Invocation,
        header: TxHeader,
    ) -> CoreResult<Proposal> {
        let caller = CallerIdentity::resolve(identity);
        let mut ctx = TxContext::new(&self.ledger, caller, header);

        let response = match invocation::dispatch(&mut ctx, invocation) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    function = %invocation.function,
                    caller = %ctx.caller().username(),
                    code = e.kind().code(),
                    error = %e,
                    "Invocation rejected"
                );
                return Err(e);
            }
        };

        Ok(Proposal {
            response,
            transaction: ctx.into_transaction(&invocation.function),
        })
    }

    /// Validates and applies a simulated transaction.
    pub fn commit(&mut self, tx: &Transaction) -> CoreResult<u64> {
        let height = self.ledger.commit(tx)?;
        info!(
            tx_id = %tx.tx_id,
            function = %tx.function,
            height,
            "Transaction committed"
        );
        Ok(height)
    }

    /// Simulate and commit in one step.
    pub fn submit(&mut self, identity: &str, invocation: &Invocation) -> CoreResult<Proposal> {
        let proposal = self.simulate(identity, invocation)?;
        if let Some(tx) = &proposal.transaction {
            self.commit(tx)?;
        }
        Ok(proposal)
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Loads a product record or fails with NotFound.
pub(crate) fn load_product<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    key: &str,
    manufacturer: &str,
    id: &str,
) -> CoreResult<ProductRecord> {
    ctx.get_json(key)?
        .ok_or_else(|| CoreError::not_found("Product", format!("{manufacturer}/{id}")))
}

/// Records that `owner` touched `product_key`.
///
/// `dedupe == false` appends unconditionally (creation); `true` appends only
/// if absent (transfer). `MostRecentKey` is always refreshed.
pub(crate) fn record_ownership<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    owner: &str,
    product_key: &str,
    dedupe: bool,
) -> CoreResult<OwnerIndex> {
    let index_key = keys::owner_key(owner)?;
    let mut index = ctx
        .get_json::<OwnerIndex>(&index_key)?
        .unwrap_or_else(|| OwnerIndex::new(owner));

    if dedupe {
        index.products.append_if_absent(product_key.to_string());
    } else {
        index.products.append(product_key.to_string());
    }
    index.most_recent_key = product_key.to_string();

    ctx.put_json(index_key, &index)?;
    Ok(index)
}

/// Serializes a record into the response value.
pub(crate) fn to_response<T: serde::Serialize>(value: &T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|e| CoreError::Corrupted {
        key: "response".to_string(),
        reason: e.to_string(),
    })
}
