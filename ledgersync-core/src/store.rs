//! The tabular ledger store boundary: named sheets of string cells, read whole
//! and written back as single-column ranges.

use crate::error::Result;
use crate::layout::cell;
use serde::Serialize;

/// Row number of the first data row; row 1 is the header.
pub const FIRST_DATA_ROW: usize = 2;

/// One sheet as read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    /// Data rows, `rows[0]` is sheet row 2
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            header,
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// `(sheet_row_number, cells)` for every data row.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| (i + FIRST_DATA_ROW, r.as_slice()))
    }

    pub fn row(&self, row_number: usize) -> Option<&[String]> {
        row_number
            .checked_sub(FIRST_DATA_ROW)
            .and_then(|i| self.rows.get(i))
            .map(|r| r.as_slice())
    }

    pub fn cell(&self, row_number: usize, column: usize) -> &str {
        self.row(row_number).map(|r| cell(r, column)).unwrap_or("")
    }

    /// Set a 1-based cell, growing the sheet as needed.
    pub fn set_cell(&mut self, row_number: usize, column: usize, value: impl Into<String>) {
        if row_number < FIRST_DATA_ROW || column == 0 {
            return;
        }
        let idx = row_number - FIRST_DATA_ROW;
        if self.rows.len() <= idx {
            self.rows.resize(idx + 1, Vec::new());
        }
        let row = &mut self.rows[idx];
        if row.len() < column {
            row.resize(column, String::new());
        }
        row[column - 1] = value.into();
    }
}

/// Contiguous single-column write: `values[i]` goes to `first_row + i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeWrite {
    pub sheet: String,
    pub column: usize,
    pub first_row: usize,
    pub values: Vec<String>,
}

impl RangeWrite {
    pub fn single(sheet: impl Into<String>, row: usize, column: usize, value: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            column,
            first_row: row,
            values: vec![value.into()],
        }
    }

    pub fn last_row(&self) -> usize {
        self.first_row + self.values.len().saturating_sub(1)
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first_row..=self.last_row()
    }
}

/// Visual review category of a document row. Used for row coloring only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowCategory {
    PaidWithBankMatch,
    Paid,
    PartiallyPaidWithBankMatch,
    PartiallyPaid,
    CreditNote,
    Normal,
}

/// Tabular ledger store. Single-threaded, one caller at a time.
pub trait LedgerStore {
    fn read_sheet(&self, name: &str) -> Result<Sheet>;

    fn write_range(&mut self, write: &RangeWrite) -> Result<()>;

    fn write_cell(&mut self, sheet: &str, row: usize, column: usize, value: &str) -> Result<()> {
        self.write_range(&RangeWrite::single(sheet, row, column, value))
    }

    /// Apply a row coloring. Stores without formatting ignore it.
    fn set_row_style(&mut self, _sheet: &str, _row: usize, _category: RowCategory) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Sheet {
        Sheet::new(
            "Bank",
            vec!["Datum".into(), "Text".into()],
            vec![
                vec!["01.01.2024".into(), "Miete".into()],
                vec!["02.01.2024".into()],
            ],
        )
    }

    #[test]
    fn test_data_rows_are_numbered_from_two() {
        let s = sheet();
        let numbers: Vec<usize> = s.data_rows().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert_eq!(s.cell(2, 2), "Miete");
        assert_eq!(s.cell(3, 2), "");
        assert_eq!(s.cell(1, 1), "");
    }

    #[test]
    fn test_set_cell_grows_sheet() {
        let mut s = sheet();
        s.set_cell(5, 3, "x");
        assert_eq!(s.rows.len(), 4);
        assert_eq!(s.cell(5, 3), "x");
        s.set_cell(1, 1, "header stays");
        assert_eq!(s.cell(2, 1), "01.01.2024");
    }

    #[test]
    fn test_range_write_rows() {
        let w = RangeWrite {
            sheet: "Bank".into(),
            column: 11,
            first_row: 4,
            values: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(w.last_row(), 6);
        assert_eq!(w.rows().count(), 3);
    }
}
