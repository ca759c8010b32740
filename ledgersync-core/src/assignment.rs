//! Match results, bank assignments and change proposals: the values that flow
//! from the matcher through review to the apply step.

use crate::document::{DocumentRecord, DocumentType};
use crate::layout::LedgerField;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// How the reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    Exact,
    Normalized,
    Fuzzy,
}

/// Relationship between the bank amount and the document amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MatchType {
    ReferenceOnly,
    FullPayment,
    PartialPayment,
    #[serde(rename_all = "camelCase")]
    UncertainPayment { amount_difference: f64 },
}

impl MatchType {
    pub fn label(&self) -> &'static str {
        match self {
            MatchType::ReferenceOnly => "Referenz",
            MatchType::FullPayment => "vollständig bezahlt",
            MatchType::PartialPayment => "Teilzahlung",
            MatchType::UncertainPayment { .. } => "unsicher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub record: DocumentRecord,
    pub match_type: MatchType,
    pub strategy: MatchStrategy,
}

/// Durable output of the matching pass, keyed by `"{documentType}#{rowNumber}"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAssignment {
    pub document_type: DocumentType,
    pub row_number: usize,
    pub bank_row_number: usize,
    /// Further bank rows paying the same document (instalments)
    pub extra_bank_rows: Vec<usize>,
    pub bank_date: NaiveDate,
    pub bank_amount_abs: f64,
    pub match_type: MatchType,
    pub match_description: String,
    pub transaction_label: String,
    pub category: String,
    pub source_category: String,
    pub debit_account: String,
    pub credit_account: String,
    pub is_credit_note: bool,
    pub is_shareholder_deposit: bool,
    /// Bank reference text the match was made from
    pub original_reference: String,
    /// Document reference at match time
    pub document_reference: String,
    pub gross_abs: f64,
}

impl BankAssignment {
    pub fn key(&self) -> String {
        assignment_key(self.document_type, self.row_number)
    }

    /// Every bank row consumed by this assignment.
    pub fn bank_rows(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.bank_row_number).chain(self.extra_bank_rows.iter().copied())
    }
}

pub fn assignment_key(document_type: DocumentType, row_number: usize) -> String {
    format!("{}#{}", document_type.key(), row_number)
}

/// Kinds of field change a bank match can imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Category,
    Date,
    PaymentMethod,
    ReconciliationMark,
    Status,
}

impl ChangeKind {
    pub fn key(&self) -> &'static str {
        match self {
            ChangeKind::Category => "category",
            ChangeKind::Date => "date",
            ChangeKind::PaymentMethod => "paymentMethod",
            ChangeKind::ReconciliationMark => "reconciliationMark",
            ChangeKind::Status => "status",
        }
    }

    /// Changes safe enough for a single bulk approval.
    pub fn is_simple(&self) -> bool {
        matches!(self, ChangeKind::Date | ChangeKind::PaymentMethod)
    }

    pub fn field(&self) -> LedgerField {
        match self {
            ChangeKind::Category => LedgerField::Category,
            ChangeKind::Date => LedgerField::PaymentDate,
            ChangeKind::PaymentMethod => LedgerField::PaymentMethod,
            ChangeKind::ReconciliationMark => LedgerField::ReconciliationMark,
            ChangeKind::Status => LedgerField::PaymentStatus,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeProposal {
    pub kind: ChangeKind,
    pub field: LedgerField,
    pub description: String,
    pub bank_value: String,
    pub current_sheet_value: String,
}

/// Stored payment status of a document row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
    Open,
    PartiallyPaid,
    Paid,
    PartiallyRefunded,
    Refunded,
}

impl PaymentStatus {
    /// Status implied by `paid` vs `gross`. Self-receipts are refunds to the
    /// employee and use the refund wording.
    pub fn compute(document_type: DocumentType, paid_abs: f64, gross_abs: f64, tolerance: f64) -> Self {
        let refund = document_type == DocumentType::SelfReceipt;
        let (paid, gross) = (paid_abs.abs(), gross_abs.abs());
        if paid > tolerance && paid + tolerance >= gross {
            if refund { PaymentStatus::Refunded } else { PaymentStatus::Paid }
        } else if paid > tolerance {
            if refund { PaymentStatus::PartiallyRefunded } else { PaymentStatus::PartiallyPaid }
        } else {
            PaymentStatus::Open
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Open => "Offen",
            PaymentStatus::PartiallyPaid => "Teilbezahlt",
            PaymentStatus::Paid => "Bezahlt",
            PaymentStatus::PartiallyRefunded => "Teilerstattet",
            PaymentStatus::Refunded => "Erstattet",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
