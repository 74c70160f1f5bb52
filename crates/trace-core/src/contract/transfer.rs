//! # Ownership Transfer
//!
//! Authorization is checked against the tail of the custody chain, not the
//! caller: the request must name the currently recorded executing party.
//! The caller is then appended to the chain as the approver, and the named
//! party becomes the new executing party.

use tracing::info;

use crate::context::TxContext;
use crate::contract::product::key_label;
use crate::contract::{keys, load_product, record_ownership};
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::types::{ProductRecord, ProductRequest};
use crate::validation::{validate_custodian_name, validate_product_key};

/// Status written by every transfer.
pub const TRANSFER_STATUS: &str = "TRANSFER";

pub fn transfer<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductRequest,
    new_custodian: &str,
) -> CoreResult<ProductRecord> {
    validate_product_key(&request.manufacturer, &request.id)?;
    validate_custodian_name(new_custodian)?;

    let key = keys::product_key(&request.manufacturer, &request.id)?;
    let mut record = load_product(ctx, &key, &request.manufacturer, &request.id)?;

    let tail = record.custody_chain.last().map(String::as_str).unwrap_or("");
    if tail != request.executing_party {
        return Err(CoreError::permission_denied(
            &request.executing_party,
            format!("custody chain ends with {tail:?}"),
        ));
    }
    if let Some(reason) = record.freeze_reason() {
        return Err(CoreError::invalid_state(key_label(&record), reason));
    }

    let caller = ctx.caller().username().to_string();
    record.location = request.location.clone();
    record.timestamp = request.timestamp.clone();
    record.coordinates = request.coordinates.clone();
    record.description = format!("Transferred to {new_custodian}");
    record.status = TRANSFER_STATUS.to_string();
    record.executing_party = new_custodian.to_string();
    record.custody_chain.append(caller.clone());
    record.latest_custodian = caller.clone();
    record.latest_form_id = request.latest_form_id.clone();
    record.form_id_history.append(request.latest_form_id.clone());
    record.offchain_hash = request.offchain_hash.clone();
    record.advance_hash();

    ctx.put_json(key.clone(), &record)?;
    record_ownership(ctx, &caller, &key, true)?;

    info!(
        manufacturer = %record.manufacturer,
        id = %record.id,
        approver = %caller,
        to = %new_custodian,
        "Product transferred"
    );
    Ok(record)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TxHeader;
    use crate::contract::product::create;
    use crate::hash_chain::verify_record;
    use crate::identity::CallerIdentity;
    use crate::ledger::MemoryLedger;
    use crate::types::OwnerIndex;

    fn base() -> ProductRequest {
        ProductRequest {
            id: "P1".to_string(),
            product_name: "Green Tea".to_string(),
            manufacturer: "M1".to_string(),
            latest_form_id: "F1".to_string(),
            ..Default::default()
        }
    }

    fn commit(
        ledger: &mut MemoryLedger,
        who: &str,
        request: &ProductRequest,
        name: Option<&str>,
    ) -> CoreResult<ProductRecord> {
        let (result, tx) = {
            let caller = CallerIdentity::resolve(who);
            let mut ctx = TxContext::new(&*ledger, caller, TxHeader::new());
            let result = match name {
                Some(name) => transfer(&mut ctx, request, name),
                None => create(&mut ctx, request),
            };
            (result, ctx.into_transaction("Test"))
        };
        if let (Ok(_), Some(tx)) = (&result, tx) {
            ledger.commit(&tx).unwrap();
        }
        result
    }

    fn owner_index(ledger: &MemoryLedger, owner: &str) -> OwnerIndex {
        let raw = ledger
            .get_state(&keys::owner_key(owner).unwrap())
            .unwrap()
            .unwrap()
            .value;
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_transfer_requires_chain_tail() {
        let mut ledger = MemoryLedger::new();
        commit(&mut ledger, "CN=alice", &base(), None).unwrap();

        let wrong = ProductRequest {
            executing_party: "bob".to_string(),
            ..base()
        };
        let err = commit(&mut ledger, "CN=alice", &wrong, Some("carol")).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));

        // Any caller may act once the request names the tail.
        let right = ProductRequest {
            executing_party: "alice".to_string(),
            offchain_hash: "off-t".to_string(),
            latest_form_id: "F2".to_string(),
            ..base()
        };
        let record = commit(&mut ledger, "CN=bob", &right, Some("carol")).unwrap();
        assert_eq!(record.custody_chain.as_slice(), &["alice".to_string(), "bob".to_string()]);
        assert_eq!(record.latest_custodian, "bob");
        assert_eq!(record.executing_party, "carol");
        assert_eq!(record.status, TRANSFER_STATUS);
        assert_eq!(record.description, "Transferred to carol");
        assert!(verify_record(&record));

        let index = owner_index(&ledger, "bob");
        assert_eq!(index.products.len(), 1);
        assert_eq!(index.most_recent_key, keys::product_key("M1", "P1").unwrap());
    }

    #[test]
    fn test_transfer_back_does_not_duplicate_index_entry() {
        let mut ledger = MemoryLedger::new();
        commit(&mut ledger, "CN=alice", &base(), None).unwrap();
        let to_bob = ProductRequest {
            executing_party: "alice".to_string(),
            ..base()
        };
        commit(&mut ledger, "CN=alice", &to_bob, Some("bob")).unwrap();

        let index = owner_index(&ledger, "alice");
        assert_eq!(index.products.len(), 1);
    }

    #[test]
    fn test_transfer_rejects_empty_name() {
        let mut ledger = MemoryLedger::new();
        commit(&mut ledger, "CN=alice", &base(), None).unwrap();
        let req = ProductRequest {
            executing_party: "alice".to_string(),
            ..base()
        };
        assert!(matches!(
            commit(&mut ledger, "CN=alice", &req, Some(" ")),
            Err(CoreError::Validation(_))
        ));
    }
}
