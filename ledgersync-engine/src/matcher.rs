//! Reference matcher: resolve a bank movement's free text to one document.
//!
//! Strategy chain, first hit wins, no backtracking:
//! 1) exact raw key
//! 2) exact normalized key
//! 3) fuzzy scan: cheap containment prefilter, then `is_good_reference_match`
//!
//! The fuzzy scan prefers the candidate with the longest overlap and, on a
//! tie, the earliest ledger row.

use crate::evaluator::{accepts_direction, evaluate};
use crate::index::ReferenceIndex;
use ledgersync_core::{
    is_good_reference_match, normalize_reference, Direction, DocumentRecord, EntityRole,
    MatchResult, MatchStrategy, MatchingOptions,
};
use tracing::debug;

/// The bank side of a match: amount and direction to gate and classify with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedPayment {
    pub amount_abs: f64,
    pub direction: Direction,
    pub role: EntityRole,
}

/// Find the document a reference points at, without any amount checks.
pub fn find_reference<'a>(
    reference: &str,
    index: &'a ReferenceIndex,
) -> Option<(&'a DocumentRecord, MatchStrategy)> {
    let raw = reference.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(record) = index.get(raw) {
        return Some((record, MatchStrategy::Exact));
    }

    let normalized = normalize_reference(raw);
    if normalized.is_empty() {
        return None;
    }
    if let Some(record) = index.get(&normalized) {
        return Some((record, MatchStrategy::Normalized));
    }

    let mut best: Option<(&DocumentRecord, usize)> = None;
    for (key, record) in index.iter() {
        let probe = if key == record.reference { raw } else { normalized.as_str() };
        if !(key.contains(probe) || probe.contains(key)) {
            continue;
        }
        if !is_good_reference_match(probe, key) {
            continue;
        }
        let overlap = key.chars().count().min(probe.chars().count());
        let better = match best {
            None => true,
            Some((current, current_overlap)) => {
                overlap > current_overlap
                    || (overlap == current_overlap && record.row_number < current.row_number)
            }
        };
        if better {
            best = Some((record, overlap));
        }
    }

    best.map(|(record, _)| (record, MatchStrategy::Fuzzy))
}

/// Resolve `reference` in `index` and classify it. With an expected payment
/// the record must also accept the bank direction, otherwise there is no
/// match in this ledger.
pub fn match_reference(
    reference: &str,
    index: &ReferenceIndex,
    expected: Option<&ExpectedPayment>,
    opts: &MatchingOptions,
) -> Option<MatchResult> {
    let (record, strategy) = find_reference(reference, index)?;

    if let Some(exp) = expected {
        if !accepts_direction(record, exp.direction, exp.role) {
            debug!(
                ledger = %record.document_type,
                row = record.row_number,
                reference = %record.reference,
                direction = ?exp.direction,
                "direction gate rejected match"
            );
            return None;
        }
    }

    Some(MatchResult {
        match_type: evaluate(record, expected.map(|e| e.amount_abs), opts),
        record: record.clone(),
        strategy,
    })
}
