//! Engine configuration: sheet names, column layouts, account mapping and
//! matching / sync tuning. Every section has a default so an empty TOML file
//! is a valid configuration.

use crate::document::{DocumentType, EntityRole};
use crate::layout::{BankLayout, LedgerLayout};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Role of the entity whose books these are
    pub role: EntityRole,
    pub bank: BankSheetConfig,
    pub ledgers: LedgersConfig,
    pub accounts: AccountsConfig,
    pub matching: MatchingOptions,
    pub sync: SyncOptions,
}

impl EngineConfig {
    pub fn ledger(&self, document_type: DocumentType) -> &LedgerConfig {
        self.ledgers.get(document_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSheetConfig {
    #[serde(default = "default_bank_sheet")]
    pub sheet: String,
    #[serde(default)]
    pub layout: BankLayout,
    /// Booking text of the closing-balance row that ends the data
    #[serde(default = "default_closing_marker")]
    pub closing_marker: String,
}

fn default_bank_sheet() -> String {
    "Bankbewegungen".to_string()
}

fn default_closing_marker() -> String {
    "Endsaldo".to_string()
}

impl Default for BankSheetConfig {
    fn default() -> Self {
        Self {
            sheet: default_bank_sheet(),
            layout: BankLayout::default(),
            closing_marker: default_closing_marker(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub sheet: String,
    pub layout: LedgerLayout,
}

impl LedgerConfig {
    pub fn default_for(document_type: DocumentType) -> Self {
        Self {
            sheet: document_type.default_sheet().to_string(),
            layout: LedgerLayout::default_for(document_type),
        }
    }
}

/// Ledger sections may set only `sheet` or only `layout`; the rest comes
/// from the built-in defaults of that document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LedgerOverrides", rename_all = "snake_case")]
pub struct LedgersConfig {
    pub invoice: LedgerConfig,
    pub expense: LedgerConfig,
    pub self_receipt: LedgerConfig,
    pub shareholder_entry: LedgerConfig,
    pub holding_transfer: LedgerConfig,
}

impl Default for LedgersConfig {
    fn default() -> Self {
        Self {
            invoice: LedgerConfig::default_for(DocumentType::Invoice),
            expense: LedgerConfig::default_for(DocumentType::Expense),
            self_receipt: LedgerConfig::default_for(DocumentType::SelfReceipt),
            shareholder_entry: LedgerConfig::default_for(DocumentType::ShareholderEntry),
            holding_transfer: LedgerConfig::default_for(DocumentType::HoldingTransfer),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LedgerOverride {
    sheet: Option<String>,
    layout: Option<LedgerLayout>,
}

impl LedgerOverride {
    fn resolve(self, document_type: DocumentType) -> LedgerConfig {
        let defaults = LedgerConfig::default_for(document_type);
        LedgerConfig {
            sheet: self.sheet.unwrap_or(defaults.sheet),
            layout: self.layout.unwrap_or(defaults.layout),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
struct LedgerOverrides {
    invoice: LedgerOverride,
    expense: LedgerOverride,
    self_receipt: LedgerOverride,
    shareholder_entry: LedgerOverride,
    holding_transfer: LedgerOverride,
}

impl From<LedgerOverrides> for LedgersConfig {
    fn from(o: LedgerOverrides) -> Self {
        Self {
            invoice: o.invoice.resolve(DocumentType::Invoice),
            expense: o.expense.resolve(DocumentType::Expense),
            self_receipt: o.self_receipt.resolve(DocumentType::SelfReceipt),
            shareholder_entry: o.shareholder_entry.resolve(DocumentType::ShareholderEntry),
            holding_transfer: o.holding_transfer.resolve(DocumentType::HoldingTransfer),
        }
    }
}

impl LedgersConfig {
    pub fn get(&self, document_type: DocumentType) -> &LedgerConfig {
        match document_type {
            DocumentType::Invoice => &self.invoice,
            DocumentType::Expense => &self.expense,
            DocumentType::SelfReceipt => &self.self_receipt,
            DocumentType::ShareholderEntry => &self.shareholder_entry,
            DocumentType::HoldingTransfer => &self.holding_transfer,
        }
    }
}

/// One category → account pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub category: String,
    pub debit: String,
    pub credit: String,
}

impl AccountEntry {
    fn new(category: &str, debit: &str, credit: &str) -> Self {
        Self {
            category: category.to_string(),
            debit: debit.to_string(),
            credit: credit.to_string(),
        }
    }
}

/// Per-ledger category mappings, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AccountsConfig {
    pub invoice: Vec<AccountEntry>,
    pub expense: Vec<AccountEntry>,
    pub self_receipt: Vec<AccountEntry>,
    pub shareholder_entry: Vec<AccountEntry>,
    pub holding_transfer: Vec<AccountEntry>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        // SKR03 accounts; 1200 is the bank account
        Self {
            invoice: vec![
                AccountEntry::new("Erlöse 19%", "1200", "8400"),
                AccountEntry::new("Erlöse 7%", "1200", "8300"),
                AccountEntry::new("Erlöse steuerfrei", "1200", "8120"),
            ],
            expense: vec![
                AccountEntry::new("Bürobedarf", "4930", "1200"),
                AccountEntry::new("Software", "4964", "1200"),
                AccountEntry::new("Miete", "4210", "1200"),
                AccountEntry::new("Reisekosten", "4670", "1200"),
            ],
            self_receipt: vec![
                AccountEntry::new("Bewirtung", "4650", "1200"),
                AccountEntry::new("Reisekosten", "4670", "1200"),
            ],
            shareholder_entry: vec![
                AccountEntry::new("Einlage", "1200", "0755"),
                AccountEntry::new("Rückzahlung", "0755", "1200"),
            ],
            holding_transfer: vec![
                AccountEntry::new(crate::document::HoldingCategory::PROFIT_TRANSFER, "2790", "1200"),
                AccountEntry::new(crate::document::HoldingCategory::CAPITAL_RETURN, "1200", "0500"),
            ],
        }
    }
}

impl AccountsConfig {
    pub fn get(&self, document_type: DocumentType) -> &[AccountEntry] {
        match document_type {
            DocumentType::Invoice => &self.invoice,
            DocumentType::Expense => &self.expense,
            DocumentType::SelfReceipt => &self.self_receipt,
            DocumentType::ShareholderEntry => &self.shareholder_entry,
            DocumentType::HoldingTransfer => &self.holding_transfer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingOptions {
    /// Absolute amount tolerance in currency units
    pub tolerance: f64,
    /// Shortfall fraction above which a payment counts as partial
    pub partial_threshold: f64,
    /// Payment method written for bank-matched documents
    pub bank_transfer_label: String,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            partial_threshold: 0.10,
            bank_transfer_label: "Überweisung".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Groups larger than this with only simple changes get one bulk prompt
    pub bulk_threshold: usize,
    /// Pause between batched range writes
    pub batch_pause_ms: u64,
    /// Pause between single-cell writes after a failed batch
    pub fallback_pause_ms: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            bulk_threshold: 3,
            batch_pause_ms: 500,
            fallback_pause_ms: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default_config() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.matching.tolerance, 0.02);
        assert_eq!(cfg.sync.bulk_threshold, 3);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cfg: EngineConfig = toml::from_str(
            r#"
role = "parent"

[sync]
batch_pause_ms = 0

[ledgers.invoice]
sheet = "Rechnungen"

[ledgers.invoice.layout]
reference = 1
category = 2
amount = 3
vat_rate = 4
paid_amount = 5
payment_status = 6
payment_method = 7
payment_date = 8
reconciliation_mark = 9
"#,
        )
        .unwrap();
        assert_eq!(cfg.role, EntityRole::Parent);
        assert_eq!(cfg.sync.batch_pause_ms, 0);
        assert_eq!(cfg.sync.fallback_pause_ms, 200);
        assert_eq!(cfg.ledger(DocumentType::Invoice).sheet, "Rechnungen");
        assert_eq!(cfg.ledger(DocumentType::Invoice).layout.gross_amount, None);
        assert_eq!(cfg.ledger(DocumentType::Expense).sheet, "Ausgaben");
    }

    #[test]
    fn test_sheet_only_sections_keep_default_layouts() {
        let cfg: EngineConfig = toml::from_str(
            r#"
[bank]
closing_marker = "Schlusssaldo"

[ledgers.invoice]
sheet = "Rechnungen"
"#,
        )
        .unwrap();
        assert_eq!(cfg.bank.sheet, "Bankbewegungen");
        assert_eq!(cfg.bank.closing_marker, "Schlusssaldo");
        assert_eq!(cfg.ledger(DocumentType::Invoice).sheet, "Rechnungen");
        assert_eq!(
            cfg.ledger(DocumentType::Invoice).layout,
            LedgerLayout::default_for(DocumentType::Invoice)
        );
        assert_eq!(cfg.ledger(DocumentType::Expense), &LedgerConfig::default_for(DocumentType::Expense));
    }

    #[test]
    fn test_default_config_survives_toml_round_trip() {
        let text = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        let cfg: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }
}
