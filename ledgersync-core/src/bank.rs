//! Bank movement rows.

use crate::config::BankSheetConfig;
use crate::document::Direction;
use crate::error::{Result, RowError};
use crate::layout::{cell, BankField, BankLayout};
use crate::money::parse_amount;
use crate::time::parse_ledger_date;
use chrono::NaiveDate;
use serde::Serialize;

/// One parsed row of the bank ledger. Re-read every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankMovement {
    pub row_number: usize,
    pub date: NaiveDate,
    pub reference: String,
    pub purpose: String,
    pub booking_text: String,
    pub signed_amount: f64,
    pub transaction_type: String,
    pub category: String,
}

impl BankMovement {
    pub fn from_row(row_number: usize, row: &[String], layout: &BankLayout) -> Result<Self> {
        let get = |field: BankField| cell(row, layout.column(field)).trim().to_string();

        let date = parse_ledger_date(&get(BankField::Date))?;
        let signed_amount = parse_amount(&get(BankField::Amount))?;

        Ok(BankMovement {
            row_number,
            date,
            reference: get(BankField::Reference),
            purpose: get(BankField::Purpose),
            booking_text: get(BankField::BookingText),
            signed_amount,
            transaction_type: get(BankField::TransactionType),
            category: get(BankField::Category),
        })
    }

    pub fn direction(&self) -> Direction {
        Direction::of(self.signed_amount)
    }

    pub fn amount_abs(&self) -> f64 {
        self.signed_amount.abs()
    }

    /// Free text the matcher resolves: the reference column, or the purpose
    /// line when the bank left the reference empty.
    pub fn match_text(&self) -> &str {
        if self.reference.is_empty() {
            &self.purpose
        } else {
            &self.reference
        }
    }
}

/// Parse the bank sheet up to the closing-balance row. Rows whose date or
/// amount cannot be read are reported and skipped.
pub fn parse_bank_rows<I, R>(
    rows: I,
    sheet: &str,
    config: &BankSheetConfig,
) -> (Vec<BankMovement>, Vec<RowError>)
where
    I: IntoIterator<Item = (usize, R)>,
    R: AsRef<[String]>,
{
    let layout = &config.layout;
    let mut movements = Vec::new();
    let mut errors = Vec::new();

    for (row_number, row) in rows {
        let row = row.as_ref();
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let booking_text = cell(row, layout.booking_text).trim();
        if booking_text.eq_ignore_ascii_case(&config.closing_marker) {
            break;
        }
        match BankMovement::from_row(row_number, row, layout) {
            Ok(m) => movements.push(m),
            Err(e) => errors.push(RowError::new(sheet, row_number, e)),
        }
    }

    (movements, errors)
}
