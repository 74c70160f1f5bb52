//! # Product Record Store
//!
//! Create and Update.
//!
//! ## Create
//! ```text
//! request ─► key (manufacturer, id) ─► occupied? ── yes ──► AlreadyExists
//!                                          │
//!                                          no
//!                                          ▼
//!   ExecutingParty = Manufacturer, CustodyChain = [caller],
//!   FormIDHistory = [LatestFormID], packaging cleared, genesis hash
//!                                          │
//!                                          ▼
//!              write record + append key to caller's OwnerIndex
//! ```

use tracing::info;

use crate::context::TxContext;
use crate::contract::{keys, load_product, record_ownership};
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::sequence::OrderedSeq;
use crate::types::{ProductRecord, ProductRequest};
use crate::validation::validate_product_key;

/// Creates a new product record owned by the caller.
pub fn create<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductRequest,
) -> CoreResult<ProductRecord> {
    validate_product_key(&request.manufacturer, &request.id)?;
    let key = keys::product_key(&request.manufacturer, &request.id)?;

    if ctx.exists(&key)? {
        return Err(CoreError::AlreadyExists {
            key: format!("{}/{}", request.manufacturer, request.id),
        });
    }

    let caller = ctx.caller().username().to_string();
    let mut record = ProductRecord {
        id: request.id.clone(),
        product_name: request.product_name.clone(),
        manufacturer: request.manufacturer.clone(),
        timestamp: request.timestamp.clone(),
        location: request.location.clone(),
        coordinates: request.coordinates.clone(),
        description: request.description.clone(),
        status: request.status.clone(),
        executing_party: request.manufacturer.clone(),
        custody_chain: OrderedSeq::from(vec![caller.clone()]),
        latest_custodian: caller.clone(),
        form_id_history: OrderedSeq::from(vec![request.latest_form_id.clone()]),
        latest_form_id: request.latest_form_id.clone(),
        latest_package_code: String::new(),
        package_code_list: OrderedSeq::new(),
        packaging_complete: false,
        offchain_hash: request.offchain_hash.clone(),
        hash_value: String::new(),
        previous_hash: String::new(),
        quantity: request.quantity,
        quantity_unit: request.quantity_unit.clone(),
        expiry_date: request.expiry_date.clone(),
    };
    record.seal_genesis();

    ctx.put_json(key.clone(), &record)?;
    record_ownership(ctx, &caller, &key, false)?;

    info!(
        manufacturer = %record.manufacturer,
        id = %record.id,
        owner = %caller,
        "Product created"
    );
    Ok(record)
}

/// Overwrites the descriptive fields of an open record.
///
/// Custody and packaging fields are left alone.
pub fn update<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductRequest,
) -> CoreResult<ProductRecord> {
    validate_product_key(&request.manufacturer, &request.id)?;
    let key = keys::product_key(&request.manufacturer, &request.id)?;
    let mut record = load_product(ctx, &key, &request.manufacturer, &request.id)?;

    let caller = ctx.caller().username();
    if caller != record.latest_custodian {
        return Err(CoreError::permission_denied(
            caller,
            format!("only the latest custodian {} may update", record.latest_custodian),
        ));
    }
    if let Some(reason) = record.freeze_reason() {
        return Err(CoreError::invalid_state(&key_label(&record), reason));
    }

    record.timestamp = request.timestamp.clone();
    record.location = request.location.clone();
    record.coordinates = request.coordinates.clone();
    record.description = request.description.clone();
    record.status = request.status.clone();
    record.executing_party = request.executing_party.clone();
    record.latest_form_id = request.latest_form_id.clone();
    record.form_id_history.append(request.latest_form_id.clone());
    record.offchain_hash = request.offchain_hash.clone();
    record.advance_hash();

    ctx.put_json(key, &record)?;
    info!(manufacturer = %record.manufacturer, id = %record.id, "Product updated");
    Ok(record)
}

/// `manufacturer/id`, used in error messages.
pub(crate) fn key_label(record: &ProductRecord) -> String {
    format!("{}/{}", record.manufacturer, record.id)
}

// =============================================================================
// Unit Tests
// =============================================================================
