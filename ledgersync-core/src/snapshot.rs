//! One consistent read of every ledger, taken at the top of a run.
//!
//! Nothing downstream re-queries the store; all matching and change detection
//! is decided against this value.

use crate::bank::{parse_bank_rows, BankMovement};
use crate::config::EngineConfig;
use crate::document::DocumentType;
use crate::error::{LedgerError, Result, RowError};
use crate::store::{LedgerStore, Sheet};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    bank: Sheet,
    movements: Vec<BankMovement>,
    ledgers: BTreeMap<DocumentType, Sheet>,
    row_errors: Vec<RowError>,
}

impl LedgerSnapshot {
    /// Read the bank sheet and all five document ledgers, validating every
    /// configured column before any data row is interpreted.
    pub fn load(store: &dyn LedgerStore, config: &EngineConfig) -> Result<Self> {
        let bank = store.read_sheet(&config.bank.sheet)?;
        let mut ledgers = BTreeMap::new();
        for document_type in DocumentType::ALL {
            let sheet = store.read_sheet(&config.ledger(document_type).sheet)?;
            ledgers.insert(document_type, sheet);
        }
        Self::from_sheets(bank, ledgers, config)
    }

    pub fn from_sheets(
        bank: Sheet,
        ledgers: BTreeMap<DocumentType, Sheet>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.bank.layout.validate(&bank.name, bank.width())?;
        for document_type in DocumentType::ALL {
            let ledger_cfg = config.ledger(document_type);
            let sheet = ledgers
                .get(&document_type)
                .ok_or_else(|| LedgerError::MissingSheet(ledger_cfg.sheet.clone()))?;
            ledger_cfg
                .layout
                .validate(document_type, &sheet.name, sheet.width())?;
        }

        let (movements, row_errors) = parse_bank_rows(bank.data_rows(), &bank.name, &config.bank);

        Ok(LedgerSnapshot {
            bank,
            movements,
            ledgers,
            row_errors,
        })
    }

    pub fn bank_sheet(&self) -> &Sheet {
        &self.bank
    }

    pub fn movements(&self) -> &[BankMovement] {
        &self.movements
    }

    pub fn ledger(&self, document_type: DocumentType) -> Option<&Sheet> {
        self.ledgers.get(&document_type)
    }

    /// Bank rows that could not be parsed.
    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }
}
