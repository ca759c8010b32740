//! Document ledger types: the five known ledgers and the denormalized record
//! the matcher works on.

use crate::normalize::normalize_reference;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five document ledgers a bank movement can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    /// Revenue ledger (outgoing invoices and credit notes)
    Invoice,
    Expense,
    /// Employee-paid, reimbursable expenses
    SelfReceipt,
    /// Shareholder loan account movements
    ShareholderEntry,
    /// Inter-company transfers between parent and operating entity
    HoldingTransfer,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::Invoice,
        DocumentType::Expense,
        DocumentType::SelfReceipt,
        DocumentType::ShareholderEntry,
        DocumentType::HoldingTransfer,
    ];

    /// Stable key used in assignment ids (`invoice#12`).
    pub fn key(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Expense => "expense",
            DocumentType::SelfReceipt => "selfReceipt",
            DocumentType::ShareholderEntry => "shareholderEntry",
            DocumentType::HoldingTransfer => "holdingTransfer",
        }
    }

    /// Default sheet name of the ledger.
    pub fn default_sheet(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "Einnahmen",
            DocumentType::Expense => "Ausgaben",
            DocumentType::SelfReceipt => "Eigenbelege",
            DocumentType::ShareholderEntry => "Gesellschafterkonto",
            DocumentType::HoldingTransfer => "Holding Transfers",
        }
    }

    /// Ledgers whose amount column is net and needs a VAT column.
    pub fn has_vat(&self) -> bool {
        matches!(
            self,
            DocumentType::Invoice | DocumentType::Expense | DocumentType::SelfReceipt
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which side of the group the local books belong to. Flips the expected
/// direction of holding transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    Parent,
    #[default]
    Operating,
}

/// Direction of a bank movement, derived from its sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    pub fn of(amount: f64) -> Direction {
        if amount < 0.0 { Direction::Outflow } else { Direction::Inflow }
    }
}

/// The two canonical inter-company transfer categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingCategory {
    ProfitTransfer,
    CapitalReturn,
}

impl HoldingCategory {
    pub const PROFIT_TRANSFER: &'static str = "Gewinnübertrag";
    pub const CAPITAL_RETURN: &'static str = "Kapitalrückführung";

    /// Recognize a category cell, tolerant to case and umlaut spelling.
    pub fn parse(category: &str) -> Option<HoldingCategory> {
        match normalize_reference(category).as_str() {
            "gewinnubertrag" | "gewinnuebertrag" => Some(HoldingCategory::ProfitTransfer),
            "kapitalruckfuhrung" | "kapitalrueckfuehrung" => Some(HoldingCategory::CapitalReturn),
            _ => None,
        }
    }
}

/// Snapshot of one document row, built fresh each run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_type: DocumentType,
    /// 1-based sheet row
    pub row_number: usize,
    /// Trimmed reference as written in the ledger
    pub reference: String,
    pub normalized_reference: String,
    /// Net amount (VAT ledgers) or raw amount (shareholder / holding), signed
    pub signed_amount: f64,
    pub vat_rate_percent: f64,
    pub gross_abs: f64,
    pub paid_abs: f64,
    /// `gross - paid`, negative for credit notes
    pub open_amount: f64,
    pub is_credit_note: bool,
    pub category: String,
    pub booking_account: String,
}

impl DocumentRecord {
    pub fn is_settled(&self, tolerance: f64) -> bool {
        (self.paid_abs - self.gross_abs).abs() <= tolerance
    }
}
