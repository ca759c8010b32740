//! Run report: what one reconciliation run saw, decided and wrote.

use crate::apply::{ApplyReport, FailedWrite, SkippedRow};
use crate::approval::ApprovalOutcome;
use crate::run::PreparedRun;
use ledgersync_core::{BankAssignment, DocumentType, RowError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Two rows claiming the same index key; the later one is unreachable
/// through that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCollision {
    pub document_type: DocumentType,
    pub key: String,
    pub kept_row: usize,
    pub shadowed_row: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub dry_run: bool,
    pub bank_rows_scanned: usize,
    pub bank_rows_matched: usize,
    pub bank_rows_unmatched: usize,
    pub assignments: BTreeMap<String, BankAssignment>,
    /// Rows with at least one proposed change
    pub rows_with_changes: usize,
    pub proposals: usize,
    pub auto_approved: usize,
    pub approved: usize,
    pub rejected: usize,
    pub range_writes: usize,
    pub cells_written: usize,
    pub fallback_cells: usize,
    pub abandoned_cells: usize,
    pub skipped: Vec<SkippedRow>,
    pub failed_writes: Vec<FailedWrite>,
    pub reference_collisions: Vec<ReferenceCollision>,
    pub row_errors: Vec<RowError>,
}

impl RunReport {
    pub fn new(
        prepared: &PreparedRun,
        approval: Option<&ApprovalOutcome>,
        applied: Option<&ApplyReport>,
    ) -> Self {
        let recon = &prepared.reconciliation;
        let mut report = RunReport {
            dry_run: approval.is_none(),
            bank_rows_scanned: recon.scanned,
            bank_rows_matched: recon.matched_bank_rows(),
            bank_rows_unmatched: recon.unmatched_bank_rows.len(),
            assignments: recon.assignments.clone(),
            rows_with_changes: prepared.reviews.iter().filter(|r| !r.changes.is_empty()).count(),
            proposals: prepared.reviews.iter().map(|r| r.changes.len()).sum(),
            reference_collisions: prepared.collisions.clone(),
            row_errors: recon.row_errors.clone(),
            ..Default::default()
        };

        if let Some(outcome) = approval {
            report.auto_approved = outcome.auto_approved;
            report.approved = outcome.approved.len();
            report.rejected = outcome.rejected.len();
        }
        if let Some(applied) = applied {
            report.range_writes = applied.range_writes;
            report.cells_written = applied.cells_written;
            report.fallback_cells = applied.fallback_cells;
            report.abandoned_cells = applied.abandoned;
            report.skipped = applied.skipped.clone();
            report.failed_writes = applied.failed.clone();
        }
        report
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_writes.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Bank rows: {} scanned, {} matched, {} unmatched",
            self.bank_rows_scanned, self.bank_rows_matched, self.bank_rows_unmatched
        )?;
        writeln!(
            f,
            "Assignments: {} ({} rows with changes, {} proposals)",
            self.assignments.len(),
            self.rows_with_changes,
            self.proposals
        )?;
        if !self.dry_run {
            writeln!(
                f,
                "Approval: {} approved ({} automatically), {} rejected",
                self.approved, self.auto_approved, self.rejected
            )?;
            writeln!(
                f,
                "Writes: {} cells in {} ranges, {} via fallback, {} failed, {} abandoned",
                self.cells_written,
                self.range_writes,
                self.fallback_cells,
                self.failed_writes.len(),
                self.abandoned_cells
            )?;
        }
        for s in &self.skipped {
            writeln!(f, "  skipped {}: {}", s.key, s.reason)?;
        }
        for c in &self.reference_collisions {
            writeln!(
                f,
                "  {} key '{}': row {} shadows row {}",
                c.document_type, c.key, c.kept_row, c.shadowed_row
            )?;
        }
        for e in &self.row_errors {
            writeln!(f, "  {e}")?;
        }
        Ok(())
    }
}
