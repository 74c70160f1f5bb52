//! # Packaging & Inventory
//!
//! Issues package codes against a product, rolls the quantity up and, on
//! completion, opens the product's revenue record.
//!
//! ## Package Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Package(codes: [C3, C4], complete: true)                               │
//! │       │                                                                 │
//! │       ├── record exists?            no  → NotFound                      │
//! │       ├── caller == custodian?      no  → PermissionDenied              │
//! │       ├── packaging complete?       yes → InvalidState                  │
//! │       │                                                                 │
//! │       ▼  phase 1 (every code)                                           │
//! │  C3 issued before? C4 repeated in batch? → DuplicateCode [all of them]  │
//! │       │                                                                 │
//! │       ▼  phase 2                                                        │
//! │  PackageCodeEntry C3, C4                                                │
//! │  PackageCodeList += [C3, C4]; Quantity = len(PackageCodeList)           │
//! │  hash over ALL codes so far                                             │
//! │       │                                                                 │
//! │       ▼  complete?                                                      │
//! │  RevenueRecord(Quantity = cumulative count)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use tracing::info;

use crate::batch;
use crate::context::TxContext;
use crate::contract::product::key_label;
use crate::contract::{keys, load_product};
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::types::{PackageCodeEntry, ProductRecord, ProductRequest, RevenueRecord};
use crate::validation::{validate_package_codes, validate_product_key};

/// Issues a batch of package codes.
pub fn package<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductRequest,
) -> CoreResult<ProductRecord> {
    validate_product_key(&request.manufacturer, &request.id)?;
    validate_package_codes(&request.package_code_list)?;

    let product_key = keys::product_key(&request.manufacturer, &request.id)?;
    let mut record = load_product(ctx, &product_key, &request.manufacturer, &request.id)?;

    let caller = ctx.caller().username();
    if caller != record.latest_custodian {
        return Err(CoreError::permission_denied(
            caller,
            format!("only the latest custodian {} may package", record.latest_custodian),
        ));
    }
    if record.packaging_complete {
        return Err(CoreError::invalid_state(key_label(&record), "packaging is complete"));
    }

    let mut seen = HashSet::new();
    batch::run(
        ctx,
        &request.package_code_list,
        |ctx, code| {
            let repeated = !seen.insert(code.clone());
            let issued = ctx.exists(&keys::package_key(code)?)?;
            Ok(if repeated || issued {
                vec![code.clone()]
            } else {
                Vec::new()
            })
        },
        |codes| CoreError::DuplicateCode { codes },
        |ctx, code| {
            let entry = PackageCodeEntry {
                key: code.clone(),
                product_key: product_key.clone(),
                id: record.id.clone(),
                manufacturer: record.manufacturer.clone(),
            };
            ctx.put_json(keys::package_key(code)?, &entry)
        },
    )?;

    record.timestamp = request.timestamp.clone();
    record.location = request.location.clone();
    record.coordinates = request.coordinates.clone();
    record.description = request.description.clone();
    record.status = request.status.clone();
    record.executing_party = request.executing_party.clone();
    record.latest_form_id = request.latest_form_id.clone();
    record.form_id_history.append(request.latest_form_id.clone());
    if let Some(last) = request.package_code_list.last() {
        record.latest_package_code = last.clone();
    }
    record
        .package_code_list
        .extend(request.package_code_list.iter().cloned());
    record.quantity = record.package_code_list.len() as i64;
    record.quantity_unit = request.quantity_unit.clone();
    record.expiry_date = request.expiry_date.clone();
    record.packaging_complete = request.packaging_complete;
    record.offchain_hash = request.offchain_hash.clone();
    record.advance_hash();

    ctx.put_json(product_key, &record)?;

    if record.packaging_complete {
        open_revenue_record(ctx, &record)?;
    }

    info!(
        manufacturer = %record.manufacturer,
        id = %record.id,
        issued = request.package_code_list.len(),
        total = record.quantity,
        complete = record.packaging_complete,
        "Package codes issued"
    );
    Ok(record)
}

fn open_revenue_record<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    record: &ProductRecord,
) -> CoreResult<()> {
    let key = keys::revenue_key(&record.manufacturer, &record.id)?;
    if ctx.exists(&key)? {
        return Err(CoreError::AlreadyExists {
            key: format!("{}/revenue", key_label(record)),
        });
    }

    let revenue = RevenueRecord {
        product_name: record.product_name.clone(),
        id: record.id.clone(),
        manufacturer: record.manufacturer.clone(),
        timestamp: record.timestamp.clone(),
        package_code_list: record.package_code_list.as_slice().to_vec(),
        quantity: record.quantity,
        quantity_unit: record.quantity_unit.clone(),
        expiry_date: record.expiry_date.clone(),
        settlement_uuid: String::new(),
    };
    ctx.put_json(key, &revenue)
}

// =============================================================================
// Unit Tests
// =============================================================================
