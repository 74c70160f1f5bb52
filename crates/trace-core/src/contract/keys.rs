//! Ledger key derivation.
//!
//! | Record           | Namespace  | Parts                          |
//! |------------------|------------|--------------------------------|
//! | ProductRecord    | `product`  | `[manufacturer, id]`           |
//! | PackageCodeEntry | `package`  | `[code]`                       |
//! | RevenueRecord    | `revenue`  | `[manufacturer, id, "revenue"]`|
//! | OwnerIndex       | `owner`    | `[owner, "products"]`          |

use crate::error::CoreResult;
use crate::ledger::{composite_key, prefix_key};

pub const PRODUCT_NAMESPACE: &str = "product";
pub const PACKAGE_NAMESPACE: &str = "package";
pub const REVENUE_NAMESPACE: &str = "revenue";
pub const OWNER_NAMESPACE: &str = "owner";

const REVENUE_SUFFIX: &str = "revenue";
const OWNER_SUFFIX: &str = "products";

pub fn product_key(manufacturer: &str, id: &str) -> CoreResult<String> {
    Ok(composite_key(PRODUCT_NAMESPACE, &[manufacturer, id])?)
}

pub fn package_key(code: &str) -> CoreResult<String> {
    Ok(composite_key(PACKAGE_NAMESPACE, &[code])?)
}

pub fn revenue_key(manufacturer: &str, id: &str) -> CoreResult<String> {
    Ok(composite_key(REVENUE_NAMESPACE, &[manufacturer, id, REVENUE_SUFFIX])?)
}

pub fn owner_key(owner: &str) -> CoreResult<String> {
    Ok(composite_key(OWNER_NAMESPACE, &[owner, OWNER_SUFFIX])?)
}

/// Prefix covering every product of one manufacturer.
pub fn manufacturer_prefix(manufacturer: &str) -> CoreResult<String> {
    Ok(prefix_key(PRODUCT_NAMESPACE, &[manufacturer])?)
}
