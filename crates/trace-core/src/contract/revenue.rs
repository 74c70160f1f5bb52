//! # Revenue Ledger
//!
//! Settlement decrements the sellable quantity of revenue records.
//!
//! ## Settle Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Settle([{M1,P1,1}, {M2,P9,3}], "uuid-1")                               │
//! │       │                                                                 │
//! │       ▼  phase 1 (every line)                                           │
//! │  revenue record missing?        → collect key                           │
//! │  existing - requested < 0?      → collect key                           │
//! │       │                                                                 │
//! │       ├── any over-sale?  → QuantityExceeded [keys]   (nothing written) │
//! │       ├── any missing?    → NotFound [keys]           (nothing written) │
//! │       ▼  phase 2 (every line, re-read through the context)              │
//! │  re-check ≥ 0, Quantity -= requested, SettlementUUID = "uuid-1"         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Phase 2 reads the context's own staged writes, so two lines for the same
//! product accumulate; if their sum over-sells, the re-check aborts the whole
//! batch.

use tracing::info;

use crate::batch;
use crate::context::TxContext;
use crate::contract::keys;
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::types::{RevenueRecord, SettlementLine};
use crate::validation::{
    validate_product_key, validate_settlement_id, validate_settlement_quantity,
};

enum Violation {
    Missing(String),
    Exceeded(String),
}

fn line_label(line: &SettlementLine) -> String {
    format!("{}/{}", line.manufacturer, line.id)
}

/// Settles a batch of sold quantities.
///
/// Returns the updated revenue records in batch order.
pub fn settle<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    lines: &[SettlementLine],
    settlement_id: &str,
) -> CoreResult<Vec<RevenueRecord>> {
    validate_settlement_id(settlement_id)?;
    for line in lines {
        validate_product_key(&line.manufacturer, &line.id)?;
        validate_settlement_quantity(line.quantity)?;
    }

    let mut settled = Vec::with_capacity(lines.len());
    batch::run(
        ctx,
        lines,
        |ctx, line| {
            let key = keys::revenue_key(&line.manufacturer, &line.id)?;
            Ok(match ctx.get_json::<RevenueRecord>(&key)? {
                None => vec![Violation::Missing(line_label(line))],
                Some(existing) if existing.quantity - line.quantity < 0 => {
                    vec![Violation::Exceeded(line_label(line))]
                }
                Some(_) => Vec::new(),
            })
        },
        reject,
        |ctx, line| {
            let key = keys::revenue_key(&line.manufacturer, &line.id)?;
            let mut record: RevenueRecord = ctx
                .get_json(&key)?
                .ok_or_else(|| CoreError::not_found("Revenue record", line_label(line)))?;
            if record.quantity - line.quantity < 0 {
                return Err(CoreError::QuantityExceeded {
                    keys: vec![line_label(line)],
                });
            }

            record.quantity -= line.quantity;
            record.settlement_uuid = settlement_id.to_string();
            ctx.put_json(key, &record)?;
            settled.push(record);
            Ok(())
        },
    )?;

    info!(
        settlement_id = %settlement_id,
        lines = lines.len(),
        "Settlement applied"
    );
    Ok(settled)
}

/// Over-sale outranks missing records.
fn reject(violations: Vec<Violation>) -> CoreError {
    let (mut missing, mut exceeded) = (Vec::new(), Vec::new());
    for violation in violations {
        match violation {
            Violation::Missing(key) => missing.push(key),
            Violation::Exceeded(key) => exceeded.push(key),
        }
    }
    if !exceeded.is_empty() {
        CoreError::QuantityExceeded { keys: exceeded }
    } else {
        CoreError::NotFound {
            entity: "Revenue record".to_string(),
            keys: missing,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TxHeader;
    use crate::identity::CallerIdentity;
    use crate::ledger::{MemoryLedger, Transaction, Write};
    use chrono::Utc;

    fn seeded(quantities: &[(&str, i64)]) -> MemoryLedger {
        let mut ledger = MemoryLedger::new();
        let writes = quantities
            .iter()
            .map(|(id, qty)| {
                let record = RevenueRecord {
                    product_name: "Tea".to_string(),
                    id: id.to_string(),
                    manufacturer: "M1".to_string(),
                    timestamp: String::new(),
                    package_code_list: vec![],
                    quantity: *qty,
                    quantity_unit: "box".to_string(),
                    expiry_date: String::new(),
                    settlement_uuid: String::new(),
                };
                Write {
                    key: keys::revenue_key("M1", id).unwrap(),
                    value: Some(serde_json::to_string(&record).unwrap()),
                }
            })
            .collect();
        ledger
            .commit(&Transaction {
                tx_id: "seed".to_string(),
                timestamp: Utc::now(),
                creator: String::new(),
                function: "Seed".to_string(),
                reads: vec![],
                writes,
            })
            .unwrap();
        ledger
    }

    fn line(id: &str, quantity: i64) -> SettlementLine {
        SettlementLine {
            manufacturer: "M1".to_string(),
            id: id.to_string(),
            quantity,
        }
    }

    fn context(ledger: &MemoryLedger) -> TxContext<'_, MemoryLedger> {
        TxContext::new(ledger, CallerIdentity::resolve("CN=shop"), TxHeader::new())
    }

    #[test]
    fn test_settle_decrements_and_stamps() {
        let ledger = seeded(&[("P1", 5)]);
        let mut ctx = context(&ledger);
        let settled = settle(&mut ctx, &[line("P1", 2)], "uuid-1").unwrap();
        assert_eq!(settled[0].quantity, 3);
        assert_eq!(settled[0].settlement_uuid, "uuid-1");
    }

    #[test]
    fn test_over_sale_outranks_missing() {
        let ledger = seeded(&[("P1", 1)]);
        let mut ctx = context(&ledger);
        let err = settle(&mut ctx, &[line("P9", 1), line("P1", 2)], "u").unwrap_err();
        match err {
            CoreError::QuantityExceeded { keys } => assert_eq!(keys, vec!["M1/P1"]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctx.pending_writes(), 0);
    }

    #[test]
    fn test_missing_records_all_listed() {
        let ledger = seeded(&[("P1", 1)]);
        let mut ctx = context(&ledger);
        let err = settle(&mut ctx, &[line("P8", 1), line("P1", 1), line("P9", 1)], "u")
            .unwrap_err();
        match err {
            CoreError::NotFound { keys, .. } => assert_eq!(keys, vec!["M1/P8", "M1/P9"]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctx.pending_writes(), 0);
    }

    #[test]
    fn test_duplicate_lines_accumulate() {
        let ledger = seeded(&[("P1", 3)]);
        let mut ctx = context(&ledger);
        let settled = settle(&mut ctx, &[line("P1", 1), line("P1", 1)], "u").unwrap();
        assert_eq!(settled.last().unwrap().quantity, 1);

        let ledger = seeded(&[("P1", 3)]);
        let mut ctx = context(&ledger);
        let err = settle(&mut ctx, &[line("P1", 2), line("P1", 2)], "u").unwrap_err();
        assert!(matches!(err, CoreError::QuantityExceeded { .. }));
    }

    #[test]
    fn test_negative_quantity_and_empty_id_rejected() {
        let ledger = seeded(&[("P1", 3)]);
        let mut ctx = context(&ledger);
        assert!(matches!(
            settle(&mut ctx, &[line("P1", -1)], "u"),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            settle(&mut ctx, &[line("P1", 1)], ""),
            Err(CoreError::Validation(_))
        ));
    }
}
