//! # Fuzzy Matcher
//!
//! Jaro-Winkler similarity in the strcmp95 form, with the two acceptance
//! thresholds used by product search.
//!
//! ```text
//! jaro      = strsim::jaro(query, candidate)
//! jaro > 0.7:
//!   prefix  : up to 4 leading non-digit characters in common
//!             score = jaro + prefix * 0.1 * (1 - jaro)
//!   long    : shortest > 4, common > prefix + 1, 2 * common >= shortest + prefix
//!             score += (1 - score) * (common - prefix - 1)
//!                                  / (len(q) + len(c) - 2 * prefix + 2)
//! ```
//!
//! The long-string adjustment lifts partial matches against longer words,
//! e.g. `"traca"` against `"catrangtra"` scores 0.77 instead of 0.70.

/// Minimum similarity between the query and the whole compacted name.
pub const FULL_NAME_THRESHOLD: f64 = 0.60;

/// Minimum similarity between the query and a single word of the name.
pub const WORD_THRESHOLD: f64 = 0.72;

/// Jaro score above which the prefix and long-string adjustments apply.
const BOOST_THRESHOLD: f64 = 0.7;

const PREFIX_LIMIT: usize = 4;
const PREFIX_SCALE: f64 = 0.1;

/// Jaro-Winkler similarity in `[0.0, 1.0]`, with long-string tolerance.
///
/// Empty input on either side scores `0.0`.
pub fn similarity(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 1.0;
    }

    let jaro = strsim::jaro(query, candidate);
    if jaro <= BOOST_THRESHOLD {
        return jaro;
    }

    let a: Vec<char> = query.chars().collect();
    let b: Vec<char> = candidate.chars().collect();
    let shortest = a.len().min(b.len());

    let prefix = a
        .iter()
        .zip(&b)
        .take(PREFIX_LIMIT)
        .take_while(|(x, y)| x == y && !x.is_ascii_digit())
        .count();
    let mut score = jaro + prefix as f64 * PREFIX_SCALE * (1.0 - jaro);

    let common = common_characters(&a, &b);
    if shortest > PREFIX_LIMIT
        && common > prefix + 1
        && 2 * common >= shortest + prefix
        && !a[0].is_ascii_digit()
    {
        score += (1.0 - score) * ((common - prefix - 1) as f64
            / (a.len() + b.len() - 2 * prefix + 2) as f64);
    }
    score
}

/// True if `similarity(query, candidate) >= threshold`.
pub fn matches(query: &str, candidate: &str, threshold: f64) -> bool {
    similarity(query, candidate) >= threshold
}

/// Characters of `a` matched in `b` within the Jaro search window.
fn common_characters(a: &[char], b: &[char]) -> usize {
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut taken = vec![false; b.len()];
    let mut common = 0;

    for (i, ch) in a.iter().enumerate() {
        let low = i.saturating_sub(window);
        let high = (i + window + 1).min(b.len());
        if let Some(j) = (low..high).find(|&j| !taken[j] && b[j] == *ch) {
            taken[j] = true;
            common += 1;
        }
    }
    common
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_identical_and_empty() {
        assert_close(similarity("abc", "abc"), 1.0);
        assert_close(similarity("", "abc"), 0.0);
        assert_close(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_prefix_scores_high() {
        assert!(matches("dienthoai", "dienthoaiabc", FULL_NAME_THRESHOLD));
        assert_close(similarity("dienthoai", "dienthoaiabc"), 0.9633333333333333);
    }

    #[test]
    fn test_unrelated_scores_low() {
        assert!(!matches("x", "dienthoaiabc", FULL_NAME_THRESHOLD));
        assert!(!matches("x", "dien", WORD_THRESHOLD));
    }

    #[test]
    fn test_long_tolerance_crosses_word_threshold() {
        // Plain Jaro-Winkler gives 0.700 here.
        let score = similarity("traca", "catrangtra");
        assert_close(score, 0.7705882352941177);
        assert!(score >= WORD_THRESHOLD);

        // Plain Jaro-Winkler gives 0.7185.
        assert_close(
            similarity("tracanguyenchat", "catrangtranguyenchatdacbiet"),
            0.8080808080808081,
        );
    }

    #[test]
    fn test_scores_near_full_name_threshold() {
        let above = similarity("zzmsung", "GalaxySamsungPhoneUltraEditionLimitedBlackVersion");
        assert_close(above, 0.6054421768707483);
        assert!(above >= FULL_NAME_THRESHOLD);

        let below = similarity("traca", "catrangtranguyenchatdacbiet");
        assert_close(below, 0.5950617283950618);
        assert!(below < FULL_NAME_THRESHOLD);
    }

    #[test]
    fn test_digits_do_not_count_as_prefix() {
        // A shared numeric prefix earns no boost.
        assert_close(similarity("2024lot", "2024batch"), 0.7566137566137566);
    }

    #[test]
    fn test_case_is_significant() {
        assert_close(similarity("DienThoai", "dienthoai"), 0.8962962962962963);
        assert!(similarity("traca", "Catrangtra") < WORD_THRESHOLD);
    }
}
