//! Change detection: diff a matched document row against what the bank
//! movement implies.
//!
//! Every proposal compares against the stored cell, so a row that already
//! carries the bank's values yields nothing and a second run is a no-op.

use ledgersync_core::layout::cell;
use ledgersync_core::money::{parse_amount_or_zero, round2};
use ledgersync_core::time::{canonical_date_cell, format_ledger_date};
use ledgersync_core::{
    BankAssignment, ChangeKind, ChangeProposal, DocumentType, EngineConfig, LedgerLayout,
    LedgerSnapshot, MatchType, MatchingOptions, PaymentStatus, Result, RowError,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Proposals for one matched document row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowReview {
    pub key: String,
    pub document_type: DocumentType,
    pub row_number: usize,
    pub changes: Vec<ChangeProposal>,
}

impl RowReview {
    /// Changes a human has to look at; the reconciliation mark never is one.
    pub fn interactive(&self) -> impl Iterator<Item = &ChangeProposal> {
        self.changes
            .iter()
            .filter(|c| c.kind != ChangeKind::ReconciliationMark)
    }

    pub fn needs_prompt(&self) -> bool {
        self.interactive().next().is_some()
    }

    /// Sorted, de-duplicated kinds of the interactive changes.
    pub fn kinds(&self) -> Vec<ChangeKind> {
        let mut kinds: Vec<ChangeKind> = self.interactive().map(|c| c.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Interactive changes on one line, for bulk prompts.
    pub fn describe(&self) -> String {
        self.interactive()
            .map(|c| c.description.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Paid amount the bank evidence supports, never below what is stored.
pub fn implied_paid(assignment: &BankAssignment, stored_paid_abs: f64) -> f64 {
    let implied = match assignment.match_type {
        MatchType::FullPayment => assignment.gross_abs,
        MatchType::PartialPayment | MatchType::UncertainPayment { .. } => assignment.bank_amount_abs,
        MatchType::ReferenceOnly => stored_paid_abs,
    };
    round2(implied.max(stored_paid_abs))
}

/// Text of the reconciliation mark, e.g. `Bank 05.03.2024 Zeile 7`.
pub fn reconciliation_mark(assignment: &BankAssignment) -> String {
    let rows = assignment
        .bank_rows()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("Bank {} Zeile {}", format_ledger_date(assignment.bank_date), rows)
}

fn proposal(kind: ChangeKind, label: &str, current: &str, bank_value: String) -> ChangeProposal {
    let description = if current.is_empty() {
        format!("{label}: '{bank_value}' eintragen")
    } else {
        format!("{label}: '{current}' → '{bank_value}'")
    };
    ChangeProposal {
        kind,
        field: kind.field(),
        description,
        bank_value,
        current_sheet_value: current.to_string(),
    }
}

/// Proposals for `row` (the document row's cells) under `assignment`.
pub fn detect_changes(
    assignment: &BankAssignment,
    row: &[String],
    layout: &LedgerLayout,
    opts: &MatchingOptions,
) -> Result<Vec<ChangeProposal>> {
    let mut changes = Vec::new();

    let stored_date = cell(row, layout.payment_date).trim();
    let bank_date = format_ledger_date(assignment.bank_date);
    if stored_date.is_empty() || canonical_date_cell(stored_date) != bank_date {
        changes.push(proposal(ChangeKind::Date, "Zahlungsdatum", stored_date, bank_date));
    }

    let stored_category = cell(row, layout.category).trim();
    if !assignment.category.is_empty() && stored_category != assignment.category {
        changes.push(proposal(
            ChangeKind::Category,
            "Kategorie",
            stored_category,
            assignment.category.clone(),
        ));
    }

    let stored_method = cell(row, layout.payment_method).trim();
    if stored_method.is_empty() {
        changes.push(proposal(
            ChangeKind::PaymentMethod,
            "Zahlungsart",
            stored_method,
            opts.bank_transfer_label.clone(),
        ));
    }

    let stored_paid = parse_amount_or_zero(cell(row, layout.paid_amount))?.abs();
    let status = PaymentStatus::compute(
        assignment.document_type,
        implied_paid(assignment, stored_paid),
        assignment.gross_abs,
        opts.tolerance,
    );
    let stored_status = cell(row, layout.payment_status).trim();
    if stored_status != status.label() {
        changes.push(proposal(ChangeKind::Status, "Status", stored_status, status.label().to_string()));
    }

    let stored_mark = cell(row, layout.reconciliation_mark).trim();
    if stored_mark.is_empty() {
        changes.push(proposal(
            ChangeKind::ReconciliationMark,
            "Bankabgleich",
            stored_mark,
            reconciliation_mark(assignment),
        ));
    }

    Ok(changes)
}

/// Review one assignment against its row in the snapshot.
pub fn review_row(
    assignment: &BankAssignment,
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
) -> std::result::Result<RowReview, RowError> {
    let ledger = config.ledger(assignment.document_type);
    let row = snapshot
        .ledger(assignment.document_type)
        .and_then(|sheet| sheet.row(assignment.row_number))
        .ok_or_else(|| RowError::new(&ledger.sheet, assignment.row_number, "row not in snapshot"))?;

    let changes = detect_changes(assignment, row, &ledger.layout, &config.matching)
        .map_err(|e| RowError::new(&ledger.sheet, assignment.row_number, e))?;

    Ok(RowReview {
        key: assignment.key(),
        document_type: assignment.document_type,
        row_number: assignment.row_number,
        changes,
    })
}

/// Review every assignment. Rows that cannot be reviewed are reported and
/// left out of the queue.
pub fn review_all(
    assignments: &BTreeMap<String, BankAssignment>,
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
) -> (Vec<RowReview>, Vec<RowError>) {
    let mut reviews = Vec::new();
    let mut errors = Vec::new();
    for assignment in assignments.values() {
        match review_row(assignment, snapshot, config) {
            Ok(review) => {
                debug!(key = %review.key, changes = review.changes.len(), "reviewed row");
                reviews.push(review);
            }
            Err(e) => {
                warn!(error = %e, "row left out of review");
                errors.push(e);
            }
        }
    }
    (reviews, errors)
}
