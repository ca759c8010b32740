//! Reference index: one per ledger, keyed by raw and normalized reference.
//!
//! Keys share one map. A row is inserted under its trimmed reference
//! (overwriting an earlier row with the same raw reference) and under its
//! normalized reference only when that slot is still free, so the first row
//! to claim a normalized key keeps it. Both kinds of shadowing are recorded
//! so the run can warn about them.

use ledgersync_core::layout::cell;
use ledgersync_core::money::{gross_abs, parse_amount, parse_amount_or_zero, parse_vat_percent, round2};
use ledgersync_core::{
    normalize_reference, DocumentRecord, DocumentType, LedgerError, LedgerLayout, RowError, Sheet,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A key that pointed at one row but now resolves to another (or never will).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowedKey {
    pub key: String,
    pub kept_row: usize,
    pub shadowed_row: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    records: Vec<DocumentRecord>,
    entries: HashMap<String, usize>,
    /// Keys in first-insertion order, for a deterministic fuzzy scan
    keys: Vec<String>,
    shadowed: Vec<ShadowedKey>,
}

impl ReferenceIndex {
    /// Build the index for one ledger. Rows without a reference are ignored;
    /// rows with unreadable amounts are reported and skipped.
    pub fn build(
        document_type: DocumentType,
        sheet: &Sheet,
        layout: &LedgerLayout,
    ) -> (ReferenceIndex, Vec<RowError>) {
        let mut index = ReferenceIndex::default();
        let mut errors = Vec::new();

        for (row_number, row) in sheet.data_rows() {
            let raw_key = cell(row, layout.reference).trim();
            if raw_key.is_empty() {
                continue;
            }
            match read_record(document_type, row_number, row, layout) {
                Ok(record) => {
                    // Negative self-receipts are corrections, never payable
                    if document_type == DocumentType::SelfReceipt && record.signed_amount < 0.0 {
                        debug!(row = row_number, reference = raw_key, "skip negative self-receipt");
                        continue;
                    }
                    index.insert(record);
                }
                Err(e) => {
                    warn!(sheet = %sheet.name, row = row_number, error = %e, "skip unreadable document row");
                    errors.push(RowError::new(&sheet.name, row_number, e));
                }
            }
        }

        for s in &index.shadowed {
            warn!(
                sheet = %sheet.name,
                key = %s.key,
                kept_row = s.kept_row,
                shadowed_row = s.shadowed_row,
                "reference key collision"
            );
        }

        (index, errors)
    }

    fn insert(&mut self, record: DocumentRecord) {
        let slot = self.records.len();
        let raw_key = record.reference.clone();
        let normalized_key = record.normalized_reference.clone();
        let row = record.row_number;
        self.records.push(record);

        match self.entries.insert(raw_key.clone(), slot) {
            Some(previous) => self.shadowed.push(ShadowedKey {
                key: raw_key,
                kept_row: row,
                shadowed_row: self.records[previous].row_number,
            }),
            None => self.keys.push(raw_key),
        }

        if normalized_key.is_empty() {
            return;
        }
        match self.entries.get(&normalized_key) {
            Some(&holder) if holder != slot => {
                let kept_row = self.records[holder].row_number;
                if kept_row != row {
                    self.shadowed.push(ShadowedKey {
                        key: normalized_key,
                        kept_row,
                        shadowed_row: row,
                    });
                }
            }
            Some(_) => {}
            None => {
                self.entries.insert(normalized_key.clone(), slot);
                self.keys.push(normalized_key);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&DocumentRecord> {
        self.entries.get(key).map(|&i| &self.records[i])
    }

    /// `(key, record)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentRecord)> {
        self.keys
            .iter()
            .filter_map(|k| self.get(k).map(|r| (k.as_str(), r)))
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn shadowed(&self) -> &[ShadowedKey] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn read_record(
    document_type: DocumentType,
    row_number: usize,
    row: &[String],
    layout: &LedgerLayout,
) -> Result<DocumentRecord, LedgerError> {
    let reference = cell(row, layout.reference).trim().to_string();
    let signed_amount = parse_amount(cell(row, layout.amount))?;
    let paid_abs = parse_amount_or_zero(cell(row, layout.paid_amount))?.abs();

    let (vat_rate_percent, gross) = if document_type.has_vat() {
        let vat = match layout.vat_rate {
            Some(col) => parse_vat_percent(cell(row, col))?,
            None => 0.0,
        };
        (vat, gross_abs(signed_amount, vat))
    } else {
        (0.0, round2(signed_amount.abs()))
    };

    let is_credit_note = document_type.has_vat() && signed_amount < 0.0;
    let open = round2(gross - paid_abs);

    Ok(DocumentRecord {
        document_type,
        row_number,
        normalized_reference: normalize_reference(&reference),
        reference,
        signed_amount,
        vat_rate_percent,
        gross_abs: gross,
        paid_abs,
        open_amount: if is_credit_note { -open } else { open },
        is_credit_note,
        category: cell(row, layout.category).trim().to_string(),
        booking_account: layout
            .booking_account
            .map(|c| cell(row, c).trim().to_string())
            .unwrap_or_default(),
    })
}
