//! CSV directory store: one `<sheet>.csv` per ledger, first record is the
//! header.
//!
//! Expected layout:
//!   data/Bankbewegungen.csv
//!   data/Einnahmen.csv
//!   data/Ausgaben.csv
//!   ...

use ledgersync_core::{LedgerError, LedgerStore, RangeWrite, Result, Sheet};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
    delimiter: u8,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            delimiter: b',',
        }
    }

    /// German exports usually use `;`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    /// Rewrites go to a temp file next to the ledger that is renamed over it
    /// once complete, so a failed write leaves the old file in place.
    fn save(&self, sheet: &Sheet) -> Result<()> {
        self.replace_file(&self.sheet_path(&sheet.name), |file| {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_writer(file);
            wtr.write_record(&sheet.header)?;
            for row in &sheet.rows {
                wtr.write_record(row)?;
            }
            wtr.flush()?;
            Ok(())
        })
    }

    fn replace_file(
        &self,
        path: &Path,
        fill: impl FnOnce(&mut NamedTempFile) -> Result<()>,
    ) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        fill(&mut tmp)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;
        Ok(())
    }
}

impl LedgerStore for CsvStore {
    fn read_sheet(&self, name: &str) -> Result<Sheet> {
        let path = self.sheet_path(name);
        if !path.exists() {
            return Err(LedgerError::MissingSheet(name.to_string()));
        }

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .has_headers(false)
            .from_path(&path)?;

        let mut records = rdr.records();
        let header: Vec<String> = match records.next() {
            Some(r) => r?.iter().map(|c| c.trim().to_string()).collect(),
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        debug!(sheet = name, rows = rows.len(), "read sheet");
        Ok(Sheet::new(name, header, rows))
    }

    fn write_range(&mut self, write: &RangeWrite) -> Result<()> {
        let mut sheet = self.read_sheet(&write.sheet)?;
        for (offset, value) in write.values.iter().enumerate() {
            sheet.set_cell(write.first_row + offset, write.column, value.clone());
        }
        self.save(&sheet).map_err(|e| LedgerError::Write {
            sheet: write.sheet.clone(),
            message: e.to_string(),
        })?;
        debug!(
            sheet = %write.sheet,
            column = write.column,
            first_row = write.first_row,
            count = write.values.len(),
            "wrote range"
        );
        Ok(())
    }
}
