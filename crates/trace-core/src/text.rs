//! # Text Normalizer
//!
//! Accent stripping for product-name search. Case is never changed.
//!
//! The table maps each accented Vietnamese letter to its plain ASCII base
//! letter. Lookup is a direct map from source to destination character;
//! characters outside the table pass through untouched.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const SOURCE_CHARACTERS: &str = "ÀÁÂÃÈÉÊÌÍÒÓÔÕÙÚÝàáâãèéêìíòóôõùúýĂăĐđĨĩŨũƠơƯưẠạẢảẤấẦầẨẩẪẫẬậẮắẰằẲẳẴẵẶặẸẹẺẻẼẽẾếỀềỂểỄễỆệỈỉỊịỌọỎỏỐốỒồỔổỖỗỘộỚớỜờỞởỠỡỢợỤụỦủỨứỪừỬửỮữỰự";
const DESTINATION_CHARACTERS: &str = "AAAAEEEIIOOOOUUYaaaaeeeiioooouuyAaDdIiUuOoUuAaAaAaAaAaAaAaAaAaAaAaAaEeEeEeEeEeEeEeEeIiIiOoOoOoOoOoOoOoOoOoOoOoOoUuUuUuUuUuUuUu";

static DIACRITIC_TABLE: Lazy<HashMap<char, char>> = Lazy::new(|| {
    SOURCE_CHARACTERS
        .chars()
        .zip(DESTINATION_CHARACTERS.chars())
        .collect()
});

/// Replaces every accented character with its plain counterpart.
pub fn strip_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| DIACRITIC_TABLE.get(&c).copied().unwrap_or(c))
        .collect()
}

/// Search form of a string: diacritics stripped, every space removed.
/// Case is kept.
///
/// `"Điện Thoại ABC"` becomes `"DienThoaiABC"`.
pub fn normalize_compact(input: &str) -> String {
    strip_diacritics(input).replace(' ', "")
}

// =============================================================================
// Unit Tests
// =============================================================================
