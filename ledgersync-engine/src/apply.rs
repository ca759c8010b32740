//! Sync/apply: turn approved assignments into ledger writes.
//!
//! Writes are planned against the snapshot first, then grouped by
//! `(sheet, column, value)` and coalesced into contiguous row ranges. A
//! failed range is retried cell by cell; the first failing cell abandons the
//! rest of that range.

use crate::changes::{implied_paid, RowReview};
use ledgersync_core::layout::cell;
use ledgersync_core::money::{format_amount, parse_amount_or_zero, round2};
use ledgersync_core::{
    references_agree, BankAssignment, EngineConfig, LedgerSnapshot, LedgerStore, RangeWrite,
    RowCategory, SyncOptions,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellWrite {
    pub sheet: String,
    pub row: usize,
    pub column: usize,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowStyle {
    pub sheet: String,
    pub row: usize,
    pub category: RowCategory,
}

/// Everything an apply would do, computed from the snapshot alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritePlan {
    pub cells: Vec<CellWrite>,
    pub styles: Vec<RowStyle>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWrite {
    pub sheet: String,
    pub row: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub range_writes: usize,
    pub cells_written: usize,
    /// Cells written one by one after their range failed
    pub fallback_cells: usize,
    pub failed: Vec<FailedWrite>,
    /// Cells never attempted because an earlier cell of their range failed
    pub abandoned: usize,
    pub skipped: Vec<SkippedRow>,
    pub styled_rows: usize,
}

/// Coloring category of a document row after the payment is recorded.
pub fn row_category(
    is_credit_note: bool,
    paid_abs: f64,
    gross_abs: f64,
    has_bank_match: bool,
    tolerance: f64,
) -> RowCategory {
    if is_credit_note {
        return RowCategory::CreditNote;
    }
    let (paid, gross) = (paid_abs.abs(), gross_abs.abs());
    if paid > tolerance && paid + tolerance >= gross {
        if has_bank_match { RowCategory::PaidWithBankMatch } else { RowCategory::Paid }
    } else if paid > tolerance {
        if has_bank_match {
            RowCategory::PartiallyPaidWithBankMatch
        } else {
            RowCategory::PartiallyPaid
        }
    } else {
        RowCategory::Normal
    }
}

/// Plan the writes of every approved assignment.
pub fn plan_writes(
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
    assignments: &BTreeMap<String, BankAssignment>,
    reviews: &[RowReview],
    approved: &BTreeSet<String>,
) -> WritePlan {
    let reviews: HashMap<&str, &RowReview> = reviews.iter().map(|r| (r.key.as_str(), r)).collect();
    let mut plan = WritePlan::default();

    for key in approved {
        let Some(assignment) = assignments.get(key) else {
            continue;
        };
        let Some(review) = reviews.get(key.as_str()) else {
            plan.skipped.push(SkippedRow {
                key: key.clone(),
                reason: "row was not reviewed".to_string(),
            });
            continue;
        };
        if let Err(reason) = plan_row(snapshot, config, assignment, review, &mut plan) {
            debug!(key = %key, reason = %reason, "skip row");
            plan.skipped.push(SkippedRow { key: key.clone(), reason });
        }
    }

    plan
}

fn plan_row(
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
    assignment: &BankAssignment,
    review: &RowReview,
    plan: &mut WritePlan,
) -> Result<(), String> {
    let ledger = config.ledger(assignment.document_type);
    let layout = &ledger.layout;
    let row = snapshot
        .ledger(assignment.document_type)
        .and_then(|s| s.row(assignment.row_number))
        .ok_or_else(|| "row not in snapshot".to_string())?;

    let current_reference = cell(row, layout.reference).trim();
    if !references_agree(current_reference, &assignment.original_reference) {
        return Err(format!(
            "reference '{}' no longer matches bank text '{}'",
            current_reference, assignment.original_reference
        ));
    }

    let stored_paid = parse_amount_or_zero(cell(row, layout.paid_amount))
        .map_err(|e| e.to_string())?
        .abs();

    let doc_cell = |column: usize, value: String| CellWrite {
        sheet: ledger.sheet.clone(),
        row: assignment.row_number,
        column,
        value,
    };

    for change in &review.changes {
        if let Some(column) = layout.column(change.field) {
            plan.cells.push(doc_cell(column, change.bank_value.clone()));
        }
    }

    let new_paid = implied_paid(assignment, stored_paid);
    if round2(new_paid - stored_paid) > 0.0 {
        let signed = if assignment.is_credit_note { -new_paid } else { new_paid };
        plan.cells.push(doc_cell(layout.paid_amount, format_amount(signed)));
    }

    let bank = snapshot.bank_sheet();
    let bank_layout = &config.bank.layout;
    for bank_row in assignment.bank_rows() {
        let mut bank_cell = |column: usize, value: &str, only_if_empty: bool| {
            let current = bank.cell(bank_row, column).trim();
            let wanted = !value.is_empty()
                && current != value
                && (!only_if_empty || current.is_empty());
            if wanted {
                plan.cells.push(CellWrite {
                    sheet: bank.name.clone(),
                    row: bank_row,
                    column,
                    value: value.to_string(),
                });
            }
        };
        bank_cell(bank_layout.match_info, &assignment.match_description, false);
        bank_cell(bank_layout.debit_account, &assignment.debit_account, false);
        bank_cell(bank_layout.credit_account, &assignment.credit_account, false);
        bank_cell(bank_layout.category, &assignment.category, true);
        bank_cell(bank_layout.transaction_type, &assignment.transaction_label, true);
    }

    plan.styles.push(RowStyle {
        sheet: ledger.sheet.clone(),
        row: assignment.row_number,
        category: row_category(
            assignment.is_credit_note,
            new_paid,
            assignment.gross_abs,
            true,
            config.matching.tolerance,
        ),
    });
    Ok(())
}

/// Group cells by target value and coalesce contiguous rows into ranges.
pub fn coalesce(cells: &[CellWrite]) -> Vec<RangeWrite> {
    let mut groups: BTreeMap<(&str, usize, &str), BTreeSet<usize>> = BTreeMap::new();
    for c in cells {
        groups
            .entry((c.sheet.as_str(), c.column, c.value.as_str()))
            .or_default()
            .insert(c.row);
    }

    let mut ranges = Vec::new();
    for ((sheet, column, value), rows) in groups {
        let mut current: Option<RangeWrite> = None;
        for row in rows {
            if let Some(range) = current.as_mut() {
                if range.last_row() + 1 == row {
                    range.values.push(value.to_string());
                    continue;
                }
            }
            ranges.extend(current.take());
            current = Some(RangeWrite::single(sheet, row, column, value));
        }
        ranges.extend(current);
    }
    ranges
}

fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Write ranges in order, pausing between them. Failed ranges fall back to
/// single-cell writes.
pub fn write_batches(store: &mut dyn LedgerStore, batches: &[RangeWrite], opts: &SyncOptions) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (i, batch) in batches.iter().enumerate() {
        if i > 0 {
            pause(opts.batch_pause_ms);
        }
        match store.write_range(batch) {
            Ok(()) => {
                report.range_writes += 1;
                report.cells_written += batch.values.len();
            }
            Err(e) => {
                warn!(
                    sheet = %batch.sheet,
                    column = batch.column,
                    rows = ?batch.rows(),
                    error = %e,
                    "range write failed, retrying cell by cell"
                );
                write_cells(store, batch, opts, &mut report);
            }
        }
    }

    report
}

fn write_cells(store: &mut dyn LedgerStore, batch: &RangeWrite, opts: &SyncOptions, report: &mut ApplyReport) {
    for (offset, (row, value)) in batch.rows().zip(&batch.values).enumerate() {
        if offset > 0 {
            pause(opts.fallback_pause_ms);
        }
        if let Err(e) = store.write_cell(&batch.sheet, row, batch.column, value) {
            let abandoned = batch.values.len() - offset - 1;
            error!(
                sheet = %batch.sheet,
                row,
                column = batch.column,
                abandoned,
                error = %e,
                "cell write failed, abandoning rest of batch"
            );
            report.failed.push(FailedWrite {
                sheet: batch.sheet.clone(),
                row,
                column: batch.column,
                message: e.to_string(),
            });
            report.abandoned += abandoned;
            return;
        }
        report.cells_written += 1;
        report.fallback_cells += 1;
    }
}

/// Plan, write, and color every approved assignment.
pub fn apply_approved(
    store: &mut dyn LedgerStore,
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
    assignments: &BTreeMap<String, BankAssignment>,
    reviews: &[RowReview],
    approved: &BTreeSet<String>,
) -> ApplyReport {
    let plan = plan_writes(snapshot, config, assignments, reviews, approved);
    let batches = coalesce(&plan.cells);
    let mut report = write_batches(store, &batches, &config.sync);
    report.skipped = plan.skipped;

    for style in &plan.styles {
        match store.set_row_style(&style.sheet, style.row, style.category) {
            Ok(()) => report.styled_rows += 1,
            Err(e) => warn!(sheet = %style.sheet, row = style.row, error = %e, "row style not applied"),
        }
    }

    info!(
        ranges = report.range_writes,
        cells = report.cells_written,
        fallback = report.fallback_cells,
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        "apply finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::Sheet;
    use ledgersync_ingest::MemoryStore;

    fn cell_write(sheet: &str, row: usize, column: usize, value: &str) -> CellWrite {
        CellWrite {
            sheet: sheet.into(),
            row,
            column,
            value: value.into(),
        }
    }

    fn no_pause() -> SyncOptions {
        SyncOptions {
            batch_pause_ms: 0,
            fallback_pause_ms: 0,
            ..SyncOptions::default()
        }
    }

    #[test]
    fn test_coalesce_contiguous_rows_with_same_value() {
        let cells = vec![
            cell_write("A", 2, 11, "Überweisung"),
            cell_write("A", 3, 11, "Überweisung"),
            cell_write("A", 4, 11, "Überweisung"),
            cell_write("A", 6, 11, "Überweisung"),
            cell_write("A", 5, 11, "Lastschrift"),
        ];
        let ranges = coalesce(&cells);
        assert_eq!(ranges.len(), 3);
        let long = ranges.iter().find(|r| r.values.len() == 3).unwrap();
        assert_eq!((long.first_row, long.last_row()), (2, 4));
        assert!(ranges.iter().any(|r| r.first_row == 6 && r.values.len() == 1));
    }

    #[test]
    fn test_row_category() {
        assert_eq!(row_category(false, 500.0, 500.0, true, 0.02), RowCategory::PaidWithBankMatch);
        assert_eq!(row_category(false, 500.0, 500.0, false, 0.02), RowCategory::Paid);
        assert_eq!(row_category(false, 200.0, 500.0, true, 0.02), RowCategory::PartiallyPaidWithBankMatch);
        assert_eq!(row_category(false, 200.0, 500.0, false, 0.02), RowCategory::PartiallyPaid);
        assert_eq!(row_category(true, 119.0, 119.0, true, 0.02), RowCategory::CreditNote);
        assert_eq!(row_category(false, 0.0, 500.0, true, 0.02), RowCategory::Normal);
    }

    fn store_with_column(rows: usize) -> MemoryStore {
        let data = (0..rows).map(|_| vec![String::new(); 3]).collect();
        MemoryStore::new().with_sheet(Sheet::new("S", vec!["h".to_string(); 3], data))
    }

    #[test]
    fn test_batches_are_written_as_ranges() {
        let mut store = store_with_column(4);
        let batches = coalesce(&[cell_write("S", 2, 3, "x"), cell_write("S", 3, 3, "x")]);
        let report = write_batches(&mut store, &batches, &no_pause());
        assert_eq!(report.range_writes, 1);
        assert_eq!(report.cells_written, 2);
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn test_failed_range_falls_back_to_cells() {
        let mut store = store_with_column(4);
        store.fail_multi_row_writes(true);
        let batches = coalesce(&[
            cell_write("S", 2, 3, "x"),
            cell_write("S", 3, 3, "x"),
            cell_write("S", 4, 3, "x"),
        ]);
        let report = write_batches(&mut store, &batches, &no_pause());
        assert_eq!(report.range_writes, 0);
        assert_eq!(report.fallback_cells, 3);
        assert_eq!(store.sheet("S").unwrap().cell(4, 3), "x");
    }

    #[test]
    fn test_failing_cell_abandons_rest_of_batch() {
        let mut store = store_with_column(5);
        store.fail_multi_row_writes(true);
        store.fail_cell("S", 3, 3);
        let batches = coalesce(&[
            cell_write("S", 2, 3, "x"),
            cell_write("S", 3, 3, "x"),
            cell_write("S", 4, 3, "x"),
            cell_write("S", 5, 3, "x"),
        ]);
        let report = write_batches(&mut store, &batches, &no_pause());
        assert_eq!(report.cells_written, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].row, 3);
        assert_eq!(report.abandoned, 2);
        let sheet = store.sheet("S").unwrap();
        assert_eq!(sheet.cell(2, 3), "x");
        assert_eq!(sheet.cell(4, 3), "");
    }
}
