//! In-memory store. Backs dry-runs and tests; records every write and row
//! style and can be told to fail writes.

use ledgersync_core::{LedgerError, LedgerStore, RangeWrite, Result, RowCategory, Sheet};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: HashMap<String, Sheet>,
    writes: Vec<RangeWrite>,
    styles: Vec<(String, usize, RowCategory)>,
    fail_multi_row_writes: bool,
    failing_cells: HashSet<(String, usize, usize)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sheet: Sheet) {
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.insert(sheet);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    /// Successful writes, in order.
    pub fn writes(&self) -> &[RangeWrite] {
        &self.writes
    }

    pub fn styles(&self) -> &[(String, usize, RowCategory)] {
        &self.styles
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.styles.clear();
    }

    /// Make every write spanning more than one row fail.
    pub fn fail_multi_row_writes(&mut self, fail: bool) {
        self.fail_multi_row_writes = fail;
    }

    /// Make any write touching this cell fail.
    pub fn fail_cell(&mut self, sheet: &str, row: usize, column: usize) {
        self.failing_cells.insert((sheet.to_string(), row, column));
    }
}

impl LedgerStore for MemoryStore {
    fn read_sheet(&self, name: &str) -> Result<Sheet> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| LedgerError::MissingSheet(name.to_string()))
    }

    fn write_range(&mut self, write: &RangeWrite) -> Result<()> {
        let fail = |message: &str| LedgerError::Write {
            sheet: write.sheet.clone(),
            message: message.to_string(),
        };

        if self.fail_multi_row_writes && write.values.len() > 1 {
            return Err(fail("range writes disabled"));
        }
        if write
            .rows()
            .any(|row| self.failing_cells.contains(&(write.sheet.clone(), row, write.column)))
        {
            return Err(fail("cell rejected"));
        }

        let sheet = self
            .sheets
            .get_mut(&write.sheet)
            .ok_or_else(|| LedgerError::MissingSheet(write.sheet.clone()))?;
        for (offset, value) in write.values.iter().enumerate() {
            sheet.set_cell(write.first_row + offset, write.column, value.clone());
        }
        self.writes.push(write.clone());
        Ok(())
    }

    fn set_row_style(&mut self, sheet: &str, row: usize, category: RowCategory) -> Result<()> {
        self.styles.push((sheet.to_string(), row, category));
        Ok(())
    }
}
