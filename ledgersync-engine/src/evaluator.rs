//! Match evaluation: amount classification and direction gating.
//!
//! Classification with tolerance `t` (0.02) and partial threshold `p` (10 %):
//! - full:      |paid - gross| <= t, or the document is already settled
//! - partial:   paid < gross and the shortfall exceeds gross * p
//! - full:      paid > gross but within t
//! - uncertain: anything else, carrying |paid - gross|

use ledgersync_core::money::round2;
use ledgersync_core::{
    Direction, DocumentRecord, DocumentType, EntityRole, HoldingCategory, MatchType, MatchingOptions,
};

/// Classify a bank amount against a document. `None` means the match was
/// made on the reference alone.
pub fn evaluate(record: &DocumentRecord, paid_abs: Option<f64>, opts: &MatchingOptions) -> MatchType {
    classify(record.gross_abs, record.paid_abs, paid_abs, opts)
}

/// Same as [`evaluate`] on bare amounts; used when instalments are summed.
pub fn classify(
    gross_abs: f64,
    recorded_paid_abs: f64,
    paid_abs: Option<f64>,
    opts: &MatchingOptions,
) -> MatchType {
    let Some(paid) = paid_abs else {
        return MatchType::ReferenceOnly;
    };
    let tolerance = opts.tolerance;

    // compare in whole cents so 100.02 vs 100.00 is not lost to float noise
    if round2((paid - gross_abs).abs()) <= tolerance
        || round2((recorded_paid_abs - gross_abs).abs()) <= tolerance
    {
        return MatchType::FullPayment;
    }
    if paid < gross_abs && round2(gross_abs - paid) > round2(gross_abs * opts.partial_threshold) {
        return MatchType::PartialPayment;
    }
    if paid > gross_abs && round2(paid - gross_abs) <= tolerance {
        return MatchType::FullPayment;
    }
    MatchType::UncertainPayment {
        amount_difference: round2((paid - gross_abs).abs()),
    }
}

/// Bank direction a holding transfer must arrive with.
///
/// | category           | parent  | operating |
/// |--------------------|---------|-----------|
/// | Gewinnübertrag     | inflow  | outflow   |
/// | Kapitalrückführung | outflow | inflow    |
pub fn holding_direction(category: HoldingCategory, role: EntityRole) -> Direction {
    match (category, role) {
        (HoldingCategory::ProfitTransfer, EntityRole::Parent) => Direction::Inflow,
        (HoldingCategory::ProfitTransfer, EntityRole::Operating) => Direction::Outflow,
        (HoldingCategory::CapitalReturn, EntityRole::Parent) => Direction::Outflow,
        (HoldingCategory::CapitalReturn, EntityRole::Operating) => Direction::Inflow,
    }
}

fn sign_direction(amount: f64) -> Option<Direction> {
    if amount > 0.0 {
        Some(Direction::Inflow)
    } else if amount < 0.0 {
        Some(Direction::Outflow)
    } else {
        None
    }
}

/// Whether a bank movement in `direction` may settle `record`.
pub fn accepts_direction(record: &DocumentRecord, direction: Direction, role: EntityRole) -> bool {
    match record.document_type {
        DocumentType::Invoice => {
            let expected = if record.is_credit_note { Direction::Outflow } else { Direction::Inflow };
            direction == expected
        }
        DocumentType::Expense => {
            let expected = if record.is_credit_note { Direction::Inflow } else { Direction::Outflow };
            direction == expected
        }
        DocumentType::SelfReceipt => direction == Direction::Outflow,
        // deposit (> 0) arrives, repayment (< 0) leaves
        DocumentType::ShareholderEntry => sign_direction(record.signed_amount) == Some(direction),
        DocumentType::HoldingTransfer => match HoldingCategory::parse(&record.category) {
            Some(category) => holding_direction(category, role) == direction,
            None => sign_direction(record.signed_amount) == Some(direction),
        },
    }
}
