//! # Queries
//!
//! Read paths: lookups, history replay, owner lists, pagination, fuzzy
//! search and chain verification. None of these stage writes.
//!
//! ## List Responses
//! Owner-list responses lead with a count record and list the most recent
//! product first:
//! ```text
//! [ {"Count": 3}, {"Value": <P3>}, {"Value": <P2>}, {"Value": <P1>} ]
//! ```
//!
//! ## Pagination
//! ```text
//! Products (oldest → newest):  P1 P2 P3 P4 P5 P6 P7     len = 7, size = 3
//!
//! page 1:  end = 7 - 0 - 1 = 6, start = 4   →  P7 P6 P5
//! page 2:  end = 7 - 3 - 1 = 3, start = 1   →  P4 P3 P2
//! page 3:  end = 7 - 6 - 1 = 0, start = 0   →  P1
//! page 4:  end < 0                          →  (count record only)
//! ```

use serde_json::Value;
use tracing::debug;

use crate::context::TxContext;
use crate::contract::{keys, load_product, to_response};
use crate::error::{CoreError, CoreResult};
use crate::fuzzy::{self, FULL_NAME_THRESHOLD, WORD_THRESHOLD};
use crate::hash_chain;
use crate::ledger::{HistoryEntry, Ledger};
use crate::text;
use crate::types::{
    ChainReport, CountRecord, HistoryIndexQuery, HistoryView, ManufacturerQuery, OwnerIndex,
    PackageCodeEntry, PackageCodeQuery, PageQuery, ProductQuery, ProductRecord, RevenueRecord,
    SearchQuery, ValueEntry,
};
use crate::validation::{
    validate_key_component, validate_page, validate_product_key, validate_search_keyword,
};

// =============================================================================
// Lookups
// =============================================================================

/// Single product by `(Manufacturer, ID)`.
pub fn query<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductQuery,
) -> CoreResult<ProductRecord> {
    validate_product_key(&request.manufacturer, &request.id)?;
    let key = keys::product_key(&request.manufacturer, &request.id)?;
    load_product(ctx, &key, &request.manufacturer, &request.id)
}

/// Every product of one manufacturer, in key order.
pub fn query_by_manufacturer<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ManufacturerQuery,
) -> CoreResult<Vec<ValueEntry<Value>>> {
    validate_key_component("Manufacturer", &request.manufacturer)?;
    let prefix = keys::manufacturer_prefix(&request.manufacturer)?;

    ctx.scan_prefix(&prefix)?
        .into_iter()
        .map(|(key, raw)| decode(&key, &raw).map(|value| ValueEntry { value }))
        .collect()
}

/// Revenue record of the product a package code belongs to.
pub fn query_revenue_by_package_code<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &PackageCodeQuery,
) -> CoreResult<RevenueRecord> {
    let entry = resolve_package_code(ctx, &request.key)?;
    let key = keys::revenue_key(&entry.manufacturer, &entry.id)?;
    ctx.get_json(&key)?.ok_or_else(|| {
        CoreError::not_found("Revenue record", format!("{}/{}", entry.manufacturer, entry.id))
    })
}

/// The raw identity of the caller.
pub fn get_id<L: Ledger + ?Sized>(ctx: &TxContext<'_, L>) -> String {
    ctx.caller().raw().to_string()
}

// =============================================================================
// History
// =============================================================================

/// Every version of a product, oldest first. Empty if the product never existed.
pub fn query_history<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductQuery,
) -> CoreResult<Vec<HistoryView>> {
    validate_product_key(&request.manufacturer, &request.id)?;
    let key = keys::product_key(&request.manufacturer, &request.id)?;
    history_views(ctx, &key)
}

/// The version at a zero-based index, as a zero- or one-element list.
pub fn query_history_entry<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &HistoryIndexQuery,
) -> CoreResult<Vec<HistoryView>> {
    validate_product_key(&request.manufacturer, &request.id)?;
    let key = keys::product_key(&request.manufacturer, &request.id)?;

    let Ok(index) = usize::try_from(request.index) else {
        return Ok(Vec::new());
    };
    let history = ctx.history(&key)?;
    history
        .get(index)
        .map(|entry| history_view(&key, entry))
        .into_iter()
        .collect()
}

/// History of the product a package code belongs to.
pub fn query_history_by_package_code<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &PackageCodeQuery,
) -> CoreResult<Vec<HistoryView>> {
    let entry = resolve_package_code(ctx, &request.key)?;
    history_views(ctx, &entry.product_key)
}

/// Replays a product's history through the hash chain.
pub fn verify_history<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &ProductQuery,
) -> CoreResult<ChainReport> {
    validate_product_key(&request.manufacturer, &request.id)?;
    let key = keys::product_key(&request.manufacturer, &request.id)?;
    let history = ctx.history(&key)?;
    if history.is_empty() {
        return Err(CoreError::not_found(
            "Product",
            format!("{}/{}", request.manufacturer, request.id),
        ));
    }

    let mut report = hash_chain::verify_history(&key, &history);
    report.key = format!("{}/{}", request.manufacturer, request.id);
    debug!(
        key = %report.key,
        valid = report.valid,
        versions = report.versions,
        "Chain verified"
    );
    Ok(report)
}

fn history_views<L: Ledger + ?Sized>(
    ctx: &TxContext<'_, L>,
    key: &str,
) -> CoreResult<Vec<HistoryView>> {
    ctx.history(key)?
        .iter()
        .map(|entry| history_view(key, entry))
        .collect()
}

fn history_view(key: &str, entry: &HistoryEntry) -> CoreResult<HistoryView> {
    let value = match &entry.value {
        Some(raw) => decode(key, raw)?,
        None => Value::Null,
    };
    Ok(HistoryView {
        tx_id: entry.tx_id.clone(),
        value,
        timestamp: entry.timestamp.to_rfc3339(),
        is_delete: entry.is_delete,
    })
}

// =============================================================================
// Owner Lists
// =============================================================================

/// Every product in the caller's index, most recent first, count-prefixed.
pub fn list_products<L: Ledger + ?Sized>(ctx: &mut TxContext<'_, L>) -> CoreResult<Value> {
    let index = load_owner_index(ctx)?;
    let total = index.products.len();

    let mut entries = Vec::with_capacity(total);
    for key in index.products.iter_recent_first() {
        entries.push(load_indexed(ctx, key)?.1);
    }
    count_prefixed(total, entries)
}

/// One page of the caller's index. The count is the full index length.
pub fn list_products_page<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &PageQuery,
) -> CoreResult<Value> {
    validate_page(request.page_index, request.page_size)?;
    let index = load_owner_index(ctx)?;
    let total = index.products.len();

    let mut entries = Vec::new();
    if let Some((start, end)) = page_bounds(total, request.page_index, request.page_size) {
        for position in (start..=end).rev() {
            if let Some(key) = index.products.get(position) {
                entries.push(load_indexed(ctx, key)?.1);
            }
        }
    }
    count_prefixed(total, entries)
}

/// Inclusive `(start, end)` positions of a 1-based page, or `None` when the
/// page lies past the oldest entry.
pub fn page_bounds(len: usize, page_index: i64, page_size: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let skipped = page_size.checked_mul(page_index.checked_sub(1)?)?;
    let end = len.checked_sub(skipped)?.checked_sub(1)?;
    if end < 0 {
        return None;
    }
    let start = (end - page_size + 1).max(0);
    let end = end.min(len - 1);
    Some((usize::try_from(start).ok()?, usize::try_from(end).ok()?))
}

/// Fuzzy search over the caller's products by name.
///
/// A product matches if the compacted query scores at least
/// [`FULL_NAME_THRESHOLD`] against the compacted name, or at least
/// [`WORD_THRESHOLD`] against the first word of the name. Later words are
/// never compared.
pub fn search<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    request: &SearchQuery,
) -> CoreResult<Value> {
    let keyword = validate_search_keyword(&request.keyword)?;
    let query = text::normalize_compact(&keyword);
    let index = load_owner_index(ctx)?;

    let mut entries = Vec::new();
    for key in index.products.iter_recent_first() {
        let (record, value) = load_indexed(ctx, key)?;
        if name_matches(&query, &record.product_name) {
            entries.push(value);
        }
    }
    debug!(query = %query, matches = entries.len(), "Search finished");
    count_prefixed(entries.len(), entries)
}

fn name_matches(query: &str, product_name: &str) -> bool {
    let full = text::normalize_compact(product_name);
    if fuzzy::matches(query, &full, FULL_NAME_THRESHOLD) {
        return true;
    }
    text::strip_diacritics(product_name)
        .split(' ')
        .next()
        .is_some_and(|first| fuzzy::matches(query, first, WORD_THRESHOLD))
}

// =============================================================================
// Helpers
// =============================================================================

fn resolve_package_code<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    code: &str,
) -> CoreResult<PackageCodeEntry> {
    validate_key_component("Key", code)?;
    let key = keys::package_key(code)?;
    ctx.get_json(&key)?
        .ok_or_else(|| CoreError::not_found("Package code", code))
}

fn load_owner_index<L: Ledger + ?Sized>(ctx: &mut TxContext<'_, L>) -> CoreResult<OwnerIndex> {
    let owner = ctx.caller().username().to_string();
    let key = keys::owner_key(&owner)?;
    ctx.get_json(&key)?
        .ok_or_else(|| CoreError::not_found("Product list", owner))
}

/// Loads a product referenced by an owner index, as record and `{"Value": …}`.
fn load_indexed<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    key: &str,
) -> CoreResult<(ProductRecord, Value)> {
    let raw = ctx
        .get_state(key)?
        .ok_or_else(|| CoreError::not_found("Product", key.escape_debug().to_string()))?;
    let record: ProductRecord = serde_json::from_str(&raw).map_err(|e| CoreError::Corrupted {
        key: key.escape_debug().to_string(),
        reason: e.to_string(),
    })?;
    let value = to_response(&ValueEntry { value: decode(key, &raw)? })?;
    Ok((record, value))
}

fn decode(key: &str, raw: &str) -> CoreResult<Value> {
    serde_json::from_str(raw).map_err(|e| CoreError::Corrupted {
        key: key.escape_debug().to_string(),
        reason: e.to_string(),
    })
}

fn count_prefixed(count: usize, entries: Vec<Value>) -> CoreResult<Value> {
    let mut items = Vec::with_capacity(entries.len() + 1);
    items.push(to_response(&CountRecord { count })?);
    items.extend(entries);
    Ok(Value::Array(items))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TxHeader;
    use crate::contract::packaging::package;
    use crate::contract::product::create;
    use crate::error::ErrorKind;
    use crate::identity::CallerIdentity;
    use crate::ledger::MemoryLedger;
    use crate::types::ProductRequest;

    fn request(manufacturer: &str, id: &str) -> ProductRequest {
        ProductRequest {
            id: id.to_string(),
            product_name: format!("Product {id}"),
            manufacturer: manufacturer.to_string(),
            latest_form_id: "F1".to_string(),
            ..Default::default()
        }
    }

    fn packing(manufacturer: &str, id: &str, codes: &[&str], complete: bool) -> ProductRequest {
        ProductRequest {
            package_code_list: codes.iter().map(|c| c.to_string()).collect(),
            packaging_complete: complete,
            offchain_hash: "off".to_string(),
            ..request(manufacturer, id)
        }
    }

    fn write(
        ledger: &mut MemoryLedger,
        op: impl FnOnce(&mut TxContext<'_, MemoryLedger>) -> CoreResult<ProductRecord>,
    ) {
        let tx = {
            let mut ctx =
                TxContext::new(&*ledger, CallerIdentity::resolve("CN=alice"), TxHeader::new());
            op(&mut ctx).unwrap();
            ctx.into_transaction("Test").unwrap()
        };
        ledger.commit(&tx).unwrap();
    }

    /// M1/P1 packaged and complete (C1, C2), M1/P2 in packaging (C3), M2/P3.
    fn stocked() -> MemoryLedger {
        let mut ledger = MemoryLedger::new();
        write(&mut ledger, |ctx| create(ctx, &request("M1", "P1")));
        write(&mut ledger, |ctx| create(ctx, &request("M1", "P2")));
        write(&mut ledger, |ctx| create(ctx, &request("M2", "P3")));
        write(&mut ledger, |ctx| package(ctx, &packing("M1", "P1", &["C1", "C2"], true)));
        write(&mut ledger, |ctx| package(ctx, &packing("M1", "P2", &["C3"], false)));
        ledger
    }

    fn read<T>(
        ledger: &MemoryLedger,
        op: impl FnOnce(&mut TxContext<'_, MemoryLedger>) -> T,
    ) -> T {
        let mut ctx = TxContext::new(ledger, CallerIdentity::resolve("CN=alice"), TxHeader::new());
        let result = op(&mut ctx);
        assert_eq!(ctx.pending_writes(), 0);
        result
    }

    fn product(manufacturer: &str, id: &str) -> ProductQuery {
        ProductQuery {
            id: id.to_string(),
            manufacturer: manufacturer.to_string(),
        }
    }

    fn code(key: &str) -> PackageCodeQuery {
        PackageCodeQuery {
            key: key.to_string(),
        }
    }

    #[test]
    fn test_query_single_product() {
        let ledger = stocked();
        let record = read(&ledger, |ctx| query(ctx, &product("M1", "P1"))).unwrap();
        assert_eq!(record.quantity, 2);
        assert!(record.packaging_complete);

        let err = read(&ledger, |ctx| query(ctx, &product("M2", "P1"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_query_by_manufacturer_in_key_order() {
        let ledger = stocked();
        let request = ManufacturerQuery {
            manufacturer: "M1".to_string(),
        };
        let entries = read(&ledger, |ctx| query_by_manufacturer(ctx, &request)).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.value["ID"].clone()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);

        // Revenue and package entries live in other namespaces.
        assert!(entries.iter().all(|e| e.value["ProductName"].is_string()));

        let request = ManufacturerQuery {
            manufacturer: "M9".to_string(),
        };
        assert!(read(&ledger, |ctx| query_by_manufacturer(ctx, &request))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_history_entry_bounds() {
        let ledger = stocked();
        let at = |index: i64| HistoryIndexQuery {
            id: "P1".to_string(),
            manufacturer: "M1".to_string(),
            index,
        };

        let first = read(&ledger, |ctx| query_history_entry(ctx, &at(0))).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].value["PackagingComplete"], false);

        assert!(read(&ledger, |ctx| query_history_entry(ctx, &at(2))).unwrap().is_empty());
        assert!(read(&ledger, |ctx| query_history_entry(ctx, &at(-1))).unwrap().is_empty());
    }

    #[test]
    fn test_history_by_package_code() {
        let ledger = stocked();
        let history = read(&ledger, |ctx| query_history_by_package_code(ctx, &code("C2"))).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].value["LatestPackageCode"], "C2");

        let err = read(&ledger, |ctx| query_history_by_package_code(ctx, &code("C9"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_revenue_by_package_code() {
        let ledger = stocked();
        let revenue = read(&ledger, |ctx| query_revenue_by_package_code(ctx, &code("C1"))).unwrap();
        assert_eq!(revenue.quantity, 2);
        assert_eq!(revenue.package_code_list, vec!["C1", "C2"]);

        // C3 belongs to a product still in packaging.
        let err = read(&ledger, |ctx| query_revenue_by_package_code(ctx, &code("C3"))).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_verify_history_of_unknown_product() {
        let ledger = stocked();
        let report = read(&ledger, |ctx| verify_history(ctx, &product("M1", "P1"))).unwrap();
        assert!(report.valid);
        assert_eq!(report.versions, 2);

        let err = read(&ledger, |ctx| verify_history(ctx, &product("M1", "P9"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(7, 1, 3), Some((4, 6)));
        assert_eq!(page_bounds(7, 2, 3), Some((1, 3)));
        assert_eq!(page_bounds(7, 3, 3), Some((0, 0)));
        assert_eq!(page_bounds(7, 4, 3), None);
        assert_eq!(page_bounds(0, 1, 3), None);
        assert_eq!(page_bounds(2, 1, 10), Some((0, 1)));
        assert_eq!(page_bounds(5, i64::MAX, i64::MAX), None);
    }

    #[test]
    fn test_full_name_match() {
        let query = text::normalize_compact("dien thoai");
        assert!(name_matches(&query, "Điện Thoại ABC"));
        assert!(!name_matches(&text::normalize_compact("x"), "Điện Thoại ABC"));
    }

    #[test]
    fn test_only_first_word_is_compared() {
        // A misspelt query too far from the whole name still matches
        // through the first word...
        let query = text::normalize_compact("zzmsung");
        assert!(name_matches(
            &query,
            "samsung galaxy phone ultra edition limited black version"
        ));

        // ...but the same word in second position is never tried.
        assert!(!name_matches(
            &query,
            "galaxy samsung phone ultra edition limited black version"
        ));
    }

    #[test]
    fn test_first_word_scored_with_long_tolerance() {
        // Whole name scores 0.595; the first word 0.771.
        let query = text::normalize_compact("traca");
        assert!(name_matches(&query, "catrangtra nguyen chat dac biet"));
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let query = text::normalize_compact("traca");
        assert!(!name_matches(&query, "Catrangtra Nguyen Chat Dac Biet"));
    }
}
