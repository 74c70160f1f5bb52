//! # Hash Chain
//!
//! Rolling SHA-256 integrity tag over a product record.
//!
//! ```text
//! sha256( ID ‖ ProductName ‖ Manufacturer ‖ Timestamp ‖ Location ‖
//!         Coordinates ‖ Status ‖ <package codes> ‖ PreviousHash ‖ seed )
//! ```
//!
//! `<package codes>` is every code in `PackageCodeList` joined without a
//! separator, or `LatestPackageCode` while the list is still empty.
//!
//! | Version       | PreviousHash        | seed            |
//! |---------------|---------------------|-----------------|
//! | genesis       | `""`                | `""`            |
//! | every later   | prior `HashValue`   | `OffchainHash`  |
//!
//! Each mutation calls [`ProductRecord::advance_hash`], so recomputing any
//! stored version from its own fields reproduces its `HashValue`, and
//! consecutive versions link through `PreviousHash`.

use sha2::{Digest, Sha256};

use crate::ledger::HistoryEntry;
use crate::types::{ChainReport, ProductRecord};

/// Lowercase hex SHA-256 over the chained fields.
pub fn compute_hash(record: &ProductRecord, previous_hash: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    for field in [
        &record.id,
        &record.product_name,
        &record.manufacturer,
        &record.timestamp,
        &record.location,
        &record.coordinates,
        &record.status,
    ] {
        hasher.update(field.as_bytes());
    }
    if record.package_code_list.is_empty() {
        hasher.update(record.latest_package_code.as_bytes());
    } else {
        for code in &record.package_code_list {
            hasher.update(code.as_bytes());
        }
    }
    hasher.update(previous_hash.as_bytes());
    hasher.update(seed.as_bytes());
    hex::encode(hasher.finalize())
}

impl ProductRecord {
    /// Sets the genesis hash.
    pub fn seal_genesis(&mut self) {
        self.previous_hash.clear();
        self.hash_value = compute_hash(self, "", "");
    }

    /// Shifts `HashValue` into `PreviousHash` and recomputes with the stored
    /// `OffchainHash` as seed.
    pub fn advance_hash(&mut self) {
        self.previous_hash = std::mem::take(&mut self.hash_value);
        self.hash_value = compute_hash(self, &self.previous_hash, &self.offchain_hash);
    }
}

/// Recomputes a stored version and compares it with its `HashValue`.
pub fn verify_record(record: &ProductRecord) -> bool {
    let seed = if record.previous_hash.is_empty() {
        ""
    } else {
        record.offchain_hash.as_str()
    };
    compute_hash(record, &record.previous_hash, seed) == record.hash_value
}

/// Replays every version of a product.
///
/// A version is broken if it does not verify on its own, does not decode,
/// or its `PreviousHash` is not the prior version's `HashValue`. Deletions
/// end the chain and reset the link.
pub fn verify_history(key: &str, history: &[HistoryEntry]) -> ChainReport {
    let mut previous: Option<String> = None;
    let mut broken_at = None;

    for (index, entry) in history.iter().enumerate() {
        let Some(raw) = entry.value.as_deref() else {
            previous = None;
            continue;
        };
        let record: ProductRecord = match serde_json::from_str(raw) {
            Ok(record) => record,
            Err(_) => {
                broken_at = Some(index);
                break;
            }
        };

        let linked = match &previous {
            Some(prev) => &record.previous_hash == prev,
            None => record.previous_hash.is_empty(),
        };
        if !linked || !verify_record(&record) {
            broken_at = Some(index);
            break;
        }
        previous = Some(record.hash_value);
    }

    ChainReport {
        key: key.to_string(),
        versions: history.len(),
        valid: broken_at.is_none(),
        broken_at,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample() -> ProductRecord {
        ProductRecord {
            id: "P1".to_string(),
            product_name: "Tea".to_string(),
            manufacturer: "M1".to_string(),
            timestamp: "2024-01-01".to_string(),
            location: "Hanoi".to_string(),
            coordinates: "21.0,105.8".to_string(),
            status: "CREATED".to_string(),
            ..Default::default()
        }
    }

    fn entry(record: &ProductRecord, tx: &str) -> HistoryEntry {
        HistoryEntry {
            tx_id: tx.to_string(),
            value: Some(serde_json::to_string(record).unwrap()),
            timestamp: Utc::now(),
            is_delete: false,
        }
    }

    #[test]
    fn test_genesis_hash_matches_plain_sha256() {
        let mut record = sample();
        record.seal_genesis();
        let expected = hex::encode(Sha256::digest(
            "P1TeaM12024-01-01Hanoi21.0,105.8CREATED".as_bytes(),
        ));
        assert_eq!(record.hash_value, expected);
        assert!(verify_record(&record));
    }

    #[test]
    fn test_package_list_overrides_latest_code() {
        let mut record = sample();
        record.latest_package_code = "C2".to_string();
        let only_latest = compute_hash(&record, "", "");
        record.package_code_list = vec!["C1".to_string(), "C2".to_string()].into();
        assert_ne!(compute_hash(&record, "", ""), only_latest);
    }

    #[test]
    fn test_advance_links_versions() {
        let mut v0 = sample();
        v0.seal_genesis();
        let mut v1 = v0.clone();
        v1.location = "Hue".to_string();
        v1.offchain_hash = "off-1".to_string();
        v1.advance_hash();

        assert_eq!(v1.previous_hash, v0.hash_value);
        assert!(verify_record(&v1));

        let report = verify_history("k", &[entry(&v0, "t0"), entry(&v1, "t1")]);
        assert!(report.valid);
        assert_eq!(report.versions, 2);
        assert_eq!(report.broken_at, None);
    }

    #[test]
    fn test_tampered_field_is_detected() {
        let mut v0 = sample();
        v0.seal_genesis();
        let mut v1 = v0.clone();
        v1.offchain_hash = "off-1".to_string();
        v1.advance_hash();
        v1.location = "Elsewhere".to_string();

        assert!(!verify_record(&v1));
        let report = verify_history("k", &[entry(&v0, "t0"), entry(&v1, "t1")]);
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(1));
    }

    #[test]
    fn test_broken_link_is_detected() {
        let mut v0 = sample();
        v0.seal_genesis();
        let mut v1 = v0.clone();
        v1.hash_value = "forged".to_string();
        v1.advance_hash();

        assert!(verify_record(&v1));
        let report = verify_history("k", &[entry(&v0, "t0"), entry(&v1, "t1")]);
        assert_eq!(report.broken_at, Some(1));
    }
}
