//! # Domain Types
//!
//! Records stored on the ledger and the request shapes accepted by the
//! invocation surface. JSON field names are the wire format.
//!
//! ## Record Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Ledger Records                                 │
//! │                                                                         │
//! │  ┌─────────────────┐   code → product    ┌──────────────────┐          │
//! │  │  ProductRecord  │◄────────────────────│ PackageCodeEntry │ (1/code) │
//! │  │  ─────────────  │                     └──────────────────┘          │
//! │  │  ID, Manufacturer│                                                   │
//! │  │  CustodyChain   │   on PackagingComplete                             │
//! │  │  PackageCodeList│────────────────────►┌──────────────────┐          │
//! │  │  HashValue      │                     │  RevenueRecord   │ (once)   │
//! │  └────────▲────────┘                     │  Quantity  ▼ on Settle      │
//! │           │ product keys                 └──────────────────┘          │
//! │  ┌────────┴────────┐                                                    │
//! │  │   OwnerIndex    │ (1/owner)                                          │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::sequence::OrderedSeq;

// =============================================================================
// Product Record
// =============================================================================

/// The canonical unit of traceability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase", default)]
#[ts(export)]
pub struct ProductRecord {
    #[serde(rename = "ID")]
    pub id: String,
    pub product_name: String,
    pub manufacturer: String,
    pub timestamp: String,
    pub location: String,
    pub coordinates: String,
    pub description: String,
    pub status: String,
    pub executing_party: String,

    /// Parties that approved each hand-over; the tail is the current authorizer.
    #[ts(as = "Vec<String>")]
    pub custody_chain: OrderedSeq<String>,
    pub latest_custodian: String,

    #[serde(rename = "FormIDHistory")]
    #[ts(as = "Vec<String>")]
    pub form_id_history: OrderedSeq<String>,
    #[serde(rename = "LatestFormID")]
    pub latest_form_id: String,

    /// Non-empty once packaging has started.
    pub latest_package_code: String,
    #[ts(as = "Vec<String>")]
    pub package_code_list: OrderedSeq<String>,
    pub packaging_complete: bool,

    pub offchain_hash: String,
    pub hash_value: String,
    pub previous_hash: String,

    pub quantity: i64,
    pub quantity_unit: String,
    pub expiry_date: String,
}

impl ProductRecord {
    /// True once the first package code has been issued.
    pub fn in_packaging(&self) -> bool {
        !self.latest_package_code.is_empty()
    }

    /// Why Update/Transfer must be refused, if they must.
    pub fn freeze_reason(&self) -> Option<&'static str> {
        if self.packaging_complete {
            Some("packaging is complete")
        } else if self.in_packaging() {
            Some("record is in packaging")
        } else {
            None
        }
    }
}

// =============================================================================
// Package Code Entry
// =============================================================================

/// Code → product index entry. Written once per code, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export)]
pub struct PackageCodeEntry {
    /// The package code itself.
    pub key: String,
    /// Ledger key of the owning product record.
    pub product_key: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub manufacturer: String,
}

// =============================================================================
// Revenue Record
// =============================================================================

/// Sellable-inventory counter created when packaging completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export)]
pub struct RevenueRecord {
    pub product_name: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub manufacturer: String,
    pub timestamp: String,
    pub package_code_list: Vec<String>,
    /// Remaining units. Never negative.
    pub quantity: i64,
    pub quantity_unit: String,
    pub expiry_date: String,
    /// Id of the last settlement that touched this record.
    #[serde(rename = "SettlementUUID")]
    pub settlement_uuid: String,
}

// =============================================================================
// Owner Index
// =============================================================================

/// Per-owner list of product keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export)]
pub struct OwnerIndex {
    pub owner: String,
    pub most_recent_key: String,
    #[ts(as = "Vec<String>")]
    pub products: OrderedSeq<String>,
}

impl OwnerIndex {
    pub fn new(owner: impl Into<String>) -> Self {
        OwnerIndex {
            owner: owner.into(),
            most_recent_key: String::new(),
            products: OrderedSeq::new(),
        }
    }
}

// =============================================================================
// Response Shapes
// =============================================================================

/// Leading element of every count-prefixed list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export)]
pub struct CountRecord {
    pub count: usize,
}

/// `{"Value": ...}` wrapper used by list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValueEntry<T> {
    pub value: T,
}

/// One version of a product as returned by the history queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryView {
    pub tx_id: String,
    /// Record snapshot, `null` for a deletion.
    pub value: serde_json::Value,
    /// RFC 3339.
    pub timestamp: String,
    pub is_delete: bool,
}

/// Outcome of replaying a product's history through the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export)]
pub struct ChainReport {
    pub key: String,
    pub versions: usize,
    pub valid: bool,
    /// Zero-based index of the first version that fails verification.
    pub broken_at: Option<usize>,
}

// =============================================================================
// Requests
// =============================================================================

/// Payload of Create, Update, Package and Transfer.
///
/// Every field is optional on the wire; each operation reads only the fields
/// it needs. A full [`ProductRecord`] document is accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductRequest {
    #[serde(rename = "ID")]
    pub id: String,
    pub product_name: String,
    pub manufacturer: String,
    pub timestamp: String,
    pub location: String,
    pub coordinates: String,
    pub description: String,
    pub status: String,
    pub executing_party: String,
    #[serde(rename = "LatestFormID")]
    pub latest_form_id: String,
    pub offchain_hash: String,
    /// Codes issued by a Package call, in order.
    pub package_code_list: Vec<String>,
    pub packaging_complete: bool,
    pub quantity: i64,
    pub quantity_unit: String,
    pub expiry_date: String,
}

/// One line of a settlement batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SettlementLine {
    pub manufacturer: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub quantity: i64,
}

/// `{ID, Manufacturer}` lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductQuery {
    #[serde(rename = "ID")]
    pub id: String,
    pub manufacturer: String,
}

/// Manufacturer-wide scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ManufacturerQuery {
    pub manufacturer: String,
}

/// Package-code lookup; the code travels in `Key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PackageCodeQuery {
    pub key: String,
}

/// Single history entry by zero-based index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryIndexQuery {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub index: i64,
}

/// 1-based page of the caller's product list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageQuery {
    #[serde(deserialize_with = "lenient_i64")]
    pub page_index: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub page_size: i64,
}

/// Fuzzy product-name search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SearchQuery {
    pub keyword: String,
}

/// Accepts `3` or `"3"`.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {s:?}"))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
