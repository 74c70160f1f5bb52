//! # Two-Phase Batch
//!
//! Validate every item, then apply every item.
//!
//! ```text
//! items ──► check(item) for ALL ──► any violations? ── yes ──► reject(violations)
//!                                         │                    (nothing applied)
//!                                         no
//!                                         ▼
//!                                   apply(item) for ALL
//! ```
//!
//! The check phase never exits early, so the rejection lists every violation
//! in the batch. Packaging and settlement both go through [`run`].

use crate::error::{CoreError, CoreResult};

/// Runs a validate-all-then-apply-all batch.
///
/// - `check` returns the violations for one item (empty if it is fine).
/// - `reject` turns the full violation list into the error to return.
/// - `apply` stages the writes for one item; it runs only if `check` found
///   nothing, and may still fail.
pub fn run<S, I, V, C, R, A>(
    state: &mut S,
    items: &[I],
    mut check: C,
    reject: R,
    mut apply: A,
) -> CoreResult<()>
where
    C: FnMut(&mut S, &I) -> CoreResult<Vec<V>>,
    R: FnOnce(Vec<V>) -> CoreError,
    A: FnMut(&mut S, &I) -> CoreResult<()>,
{
    let mut violations = Vec::new();
    for item in items {
        violations.extend(check(state, item)?);
    }
    if !violations.is_empty() {
        return Err(reject(violations));
    }

    for item in items {
        apply(state, item)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
