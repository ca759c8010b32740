//! Column layouts. Positions are configuration (1-based, like the sheets
//! themselves), never hard-coded in the engine.

use crate::document::DocumentType;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Fields the engine reads or writes on a document ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerField {
    Reference,
    Category,
    Amount,
    VatRate,
    PaidAmount,
    GrossAmount,
    PaymentStatus,
    PaymentMethod,
    PaymentDate,
    ReconciliationMark,
    BookingAccount,
}

impl LedgerField {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerField::Reference => "reference",
            LedgerField::Category => "category",
            LedgerField::Amount => "amount",
            LedgerField::VatRate => "vatRate",
            LedgerField::PaidAmount => "paidAmount",
            LedgerField::GrossAmount => "grossAmount",
            LedgerField::PaymentStatus => "paymentStatus",
            LedgerField::PaymentMethod => "paymentMethod",
            LedgerField::PaymentDate => "paymentDate",
            LedgerField::ReconciliationMark => "bankReconciliationMark",
            LedgerField::BookingAccount => "bookingAccount",
        }
    }
}

/// Column positions of one document ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLayout {
    pub reference: usize,
    pub category: usize,
    /// Net amount for VAT ledgers, raw amount otherwise
    pub amount: usize,
    #[serde(default)]
    pub vat_rate: Option<usize>,
    pub paid_amount: usize,
    #[serde(default)]
    pub gross_amount: Option<usize>,
    pub payment_status: usize,
    pub payment_method: usize,
    pub payment_date: usize,
    pub reconciliation_mark: usize,
    #[serde(default)]
    pub booking_account: Option<usize>,
}

impl LedgerLayout {
    /// Built-in layout of the standard ledger templates.
    pub fn default_for(document_type: DocumentType) -> Self {
        if document_type.has_vat() {
            // Datum | Nr. | Kategorie | Partner | Netto | MwSt % | MwSt | Brutto |
            // Bezahlt | Status | Zahlungsart | Zahlungsdatum | Bankabgleich | Konto
            LedgerLayout {
                reference: 2,
                category: 3,
                amount: 5,
                vat_rate: Some(6),
                paid_amount: 9,
                gross_amount: Some(8),
                payment_status: 10,
                payment_method: 11,
                payment_date: 12,
                reconciliation_mark: 13,
                booking_account: Some(14),
            }
        } else {
            // Datum | Referenz | Kategorie | Beschreibung | Betrag | Bezahlt |
            // Status | Zahlungsart | Zahlungsdatum | Bankabgleich | Konto
            LedgerLayout {
                reference: 2,
                category: 3,
                amount: 5,
                vat_rate: None,
                paid_amount: 6,
                gross_amount: None,
                payment_status: 7,
                payment_method: 8,
                payment_date: 9,
                reconciliation_mark: 10,
                booking_account: Some(11),
            }
        }
    }

    pub fn column(&self, field: LedgerField) -> Option<usize> {
        match field {
            LedgerField::Reference => Some(self.reference),
            LedgerField::Category => Some(self.category),
            LedgerField::Amount => Some(self.amount),
            LedgerField::VatRate => self.vat_rate,
            LedgerField::PaidAmount => Some(self.paid_amount),
            LedgerField::GrossAmount => self.gross_amount,
            LedgerField::PaymentStatus => Some(self.payment_status),
            LedgerField::PaymentMethod => Some(self.payment_method),
            LedgerField::PaymentDate => Some(self.payment_date),
            LedgerField::ReconciliationMark => Some(self.reconciliation_mark),
            LedgerField::BookingAccount => self.booking_account,
        }
    }

    /// Check every configured column against the sheet header width.
    pub fn validate(&self, document_type: DocumentType, sheet: &str, width: usize) -> Result<()> {
        const FIELDS: [LedgerField; 11] = [
            LedgerField::Reference,
            LedgerField::Category,
            LedgerField::Amount,
            LedgerField::VatRate,
            LedgerField::PaidAmount,
            LedgerField::GrossAmount,
            LedgerField::PaymentStatus,
            LedgerField::PaymentMethod,
            LedgerField::PaymentDate,
            LedgerField::ReconciliationMark,
            LedgerField::BookingAccount,
        ];

        if document_type.has_vat() && self.vat_rate.is_none() {
            return Err(LedgerError::MissingColumn {
                sheet: sheet.to_string(),
                field: LedgerField::VatRate.name(),
                column: 0,
                width,
            });
        }
        for field in FIELDS {
            if let Some(column) = self.column(field) {
                check_column(sheet, field.name(), column, width)?;
            }
        }
        Ok(())
    }
}

/// Fields of the bank movement ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BankField {
    Date,
    BookingText,
    Amount,
    RunningBalance,
    TransactionType,
    Category,
    DebitAccount,
    CreditAccount,
    Reference,
    Purpose,
    MatchInfo,
}

/// Column positions of the bank ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankLayout {
    pub date: usize,
    pub booking_text: usize,
    pub amount: usize,
    pub running_balance: usize,
    pub transaction_type: usize,
    pub category: usize,
    pub debit_account: usize,
    pub credit_account: usize,
    pub reference: usize,
    pub purpose: usize,
    pub match_info: usize,
}

impl Default for BankLayout {
    fn default() -> Self {
        BankLayout {
            date: 1,
            booking_text: 2,
            amount: 3,
            running_balance: 4,
            transaction_type: 5,
            category: 6,
            debit_account: 7,
            credit_account: 8,
            reference: 9,
            purpose: 10,
            match_info: 11,
        }
    }
}

impl BankLayout {
    pub fn column(&self, field: BankField) -> usize {
        match field {
            BankField::Date => self.date,
            BankField::BookingText => self.booking_text,
            BankField::Amount => self.amount,
            BankField::RunningBalance => self.running_balance,
            BankField::TransactionType => self.transaction_type,
            BankField::Category => self.category,
            BankField::DebitAccount => self.debit_account,
            BankField::CreditAccount => self.credit_account,
            BankField::Reference => self.reference,
            BankField::Purpose => self.purpose,
            BankField::MatchInfo => self.match_info,
        }
    }

    pub fn validate(&self, sheet: &str, width: usize) -> Result<()> {
        let fields = [
            ("date", self.date),
            ("bookingText", self.booking_text),
            ("amount", self.amount),
            ("runningBalance", self.running_balance),
            ("transactionType", self.transaction_type),
            ("category", self.category),
            ("debitAccount", self.debit_account),
            ("creditAccount", self.credit_account),
            ("reference", self.reference),
            ("purpose", self.purpose),
            ("matchInfo", self.match_info),
        ];
        for (name, column) in fields {
            check_column(sheet, name, column, width)?;
        }
        Ok(())
    }
}

fn check_column(sheet: &str, field: &'static str, column: usize, width: usize) -> Result<()> {
    if column == 0 || column > width {
        return Err(LedgerError::MissingColumn {
            sheet: sheet.to_string(),
            field,
            column,
            width,
        });
    }
    Ok(())
}

/// Read a 1-based cell from a row; missing trailing cells read as empty.
pub fn cell(row: &[String], column: usize) -> &str {
    column
        .checked_sub(1)
        .and_then(|i| row.get(i))
        .map(|s| s.as_str())
        .unwrap_or("")
}
