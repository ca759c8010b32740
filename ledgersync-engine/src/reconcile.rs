//! The matching pass: one walk over the bank ledger producing the
//! `documentType#row → BankAssignment` map.
//!
//! Each movement is routed through the ledgers that can take its direction,
//! first match wins. A movement is consumed by at most one document; a
//! document hit by several movements accumulates them.

use crate::cache::RunCache;
use crate::evaluator::classify;
use crate::index::ReferenceIndex;
use crate::matcher::{match_reference, ExpectedPayment};
use ledgersync_core::money::{format_amount, round2};
use ledgersync_core::{
    assignment_key, AccountMapping, BankAssignment, BankMovement, Direction, DocumentRecord, DocumentType,
    EngineConfig, HoldingCategory, LedgerSnapshot, MatchResult, MatchType, RowError,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const INFLOW_ORDER: [DocumentType; 4] = [
    DocumentType::Invoice,
    DocumentType::ShareholderEntry,
    DocumentType::HoldingTransfer,
    DocumentType::Expense,
];

const OUTFLOW_ORDER: [DocumentType; 5] = [
    DocumentType::Expense,
    DocumentType::SelfReceipt,
    DocumentType::Invoice,
    DocumentType::ShareholderEntry,
    DocumentType::HoldingTransfer,
];

/// Ledgers a movement is tried against, in order.
pub fn ledger_order(direction: Direction) -> &'static [DocumentType] {
    match direction {
        Direction::Inflow => &INFLOW_ORDER,
        Direction::Outflow => &OUTFLOW_ORDER,
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// Bank rows read before the closing row
    pub scanned: usize,
    pub assignments: BTreeMap<String, BankAssignment>,
    pub unmatched_bank_rows: Vec<usize>,
    pub row_errors: Vec<RowError>,
}

impl Reconciliation {
    pub fn matched_bank_rows(&self) -> usize {
        self.assignments.values().map(|a| 1 + a.extra_bank_rows.len()).sum()
    }
}

/// Match every bank movement of `snapshot`. Indexes come from `cache`, which
/// the caller resets at the start of the run.
pub fn reconcile(
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
    accounts: &AccountMapping,
    cache: &mut RunCache,
) -> Reconciliation {
    let mut result = Reconciliation {
        scanned: snapshot.movements().len() + snapshot.row_errors().len(),
        ..Default::default()
    };
    // recorded paid amount per assigned document, for re-classifying instalments
    let mut recorded_paid: HashMap<String, f64> = HashMap::new();

    for movement in snapshot.movements() {
        if movement.match_text().is_empty() || movement.amount_abs() == 0.0 {
            debug!(row = movement.row_number, "bank row has nothing to match");
            result.unmatched_bank_rows.push(movement.row_number);
            continue;
        }

        let Some(hit) = route(movement, snapshot, config, cache) else {
            debug!(row = movement.row_number, text = movement.match_text(), "no document matched");
            result.unmatched_bank_rows.push(movement.row_number);
            continue;
        };

        let key = assignment_key(hit.record.document_type, hit.record.row_number);
        match result.assignments.get_mut(&key) {
            Some(existing) => {
                let paid = recorded_paid.get(&key).copied().unwrap_or(hit.record.paid_abs);
                accumulate(existing, movement, paid, config);
                debug!(key = %key, row = movement.row_number, "instalment added to assignment");
            }
            None => {
                recorded_paid.insert(key.clone(), hit.record.paid_abs);
                let assignment = assign(movement, &hit, config, accounts);
                result.assignments.insert(key, assignment);
            }
        }
    }

    result.row_errors.extend(snapshot.row_errors().iter().cloned());
    result.row_errors.extend(cache.row_errors());

    info!(
        scanned = result.scanned,
        assignments = result.assignments.len(),
        unmatched = result.unmatched_bank_rows.len(),
        row_errors = result.row_errors.len(),
        "matching pass finished"
    );
    result
}

fn route(
    movement: &BankMovement,
    snapshot: &LedgerSnapshot,
    config: &EngineConfig,
    cache: &mut RunCache,
) -> Option<MatchResult> {
    let expected = ExpectedPayment {
        amount_abs: movement.amount_abs(),
        direction: movement.direction(),
        role: config.role,
    };

    for &document_type in ledger_order(expected.direction) {
        let index = cache.index_or_build(document_type, || match snapshot.ledger(document_type) {
            Some(sheet) => ReferenceIndex::build(document_type, sheet, &config.ledger(document_type).layout),
            None => Default::default(),
        });
        if let Some(hit) =
            match_reference(movement.match_text(), index, Some(&expected), &config.matching)
        {
            debug!(
                row = movement.row_number,
                ledger = %document_type,
                document_row = hit.record.row_number,
                strategy = ?hit.strategy,
                match_type = hit.match_type.label(),
                "bank row matched"
            );
            return Some(hit);
        }
    }
    None
}

fn assign(
    movement: &BankMovement,
    hit: &MatchResult,
    config: &EngineConfig,
    accounts: &AccountMapping,
) -> BankAssignment {
    let record = &hit.record;
    let category = if movement.category.is_empty() {
        record.category.clone()
    } else {
        movement.category.clone()
    };

    let (debit_account, credit_account) = match accounts.lookup(record.document_type, &category) {
        Some(pair) if reverses_accounts(record) => {
            let r = pair.reversed();
            (r.debit, r.credit)
        }
        Some(pair) => (pair.debit.clone(), pair.credit.clone()),
        None => (String::new(), String::new()),
    };

    let mut assignment = BankAssignment {
        document_type: record.document_type,
        row_number: record.row_number,
        bank_row_number: movement.row_number,
        extra_bank_rows: Vec::new(),
        bank_date: movement.date,
        bank_amount_abs: round2(movement.amount_abs()),
        match_type: hit.match_type,
        match_description: String::new(),
        transaction_label: transaction_label(record),
        category,
        source_category: record.category.clone(),
        debit_account,
        credit_account,
        is_credit_note: record.is_credit_note,
        is_shareholder_deposit: record.document_type == DocumentType::ShareholderEntry
            && record.signed_amount > 0.0,
        original_reference: movement.match_text().to_string(),
        document_reference: record.reference.clone(),
        gross_abs: record.gross_abs,
    };
    assignment.match_description = describe(&assignment, config);
    assignment
}

fn accumulate(existing: &mut BankAssignment, movement: &BankMovement, recorded_paid: f64, config: &EngineConfig) {
    existing.extra_bank_rows.push(movement.row_number);
    existing.bank_amount_abs = round2(existing.bank_amount_abs + movement.amount_abs());
    existing.bank_date = existing.bank_date.max(movement.date);
    existing.match_type = classify(
        existing.gross_abs,
        recorded_paid,
        Some(existing.bank_amount_abs),
        &config.matching,
    );
    existing.match_description = describe(existing, config);
}

/// Refunds of expenses and payouts of credit notes book the other way round.
fn reverses_accounts(record: &DocumentRecord) -> bool {
    matches!(record.document_type, DocumentType::Invoice | DocumentType::Expense)
        && record.is_credit_note
}

fn transaction_label(record: &DocumentRecord) -> String {
    let label = match record.document_type {
        DocumentType::Invoice if record.is_credit_note => "Gutschrift",
        DocumentType::Invoice => "Einnahme",
        DocumentType::Expense if record.is_credit_note => "Erstattung",
        DocumentType::Expense => "Ausgabe",
        DocumentType::SelfReceipt => "Eigenbeleg",
        DocumentType::ShareholderEntry if record.signed_amount > 0.0 => "Gesellschaftereinlage",
        DocumentType::ShareholderEntry => "Gesellschafterrückzahlung",
        DocumentType::HoldingTransfer => match HoldingCategory::parse(&record.category) {
            Some(HoldingCategory::ProfitTransfer) => HoldingCategory::PROFIT_TRANSFER,
            Some(HoldingCategory::CapitalReturn) => HoldingCategory::CAPITAL_RETURN,
            None => "Holding Transfer",
        },
    };
    label.to_string()
}

/// Text written to the bank row's match column, e.g.
/// `Einnahmen RE100 Zeile 2: vollständig bezahlt`.
fn describe(assignment: &BankAssignment, config: &EngineConfig) -> String {
    let sheet = &config.ledger(assignment.document_type).sheet;
    let detail = match assignment.match_type {
        MatchType::PartialPayment => {
            format!(", offen {}", format_amount(assignment.gross_abs - assignment.bank_amount_abs))
        }
        MatchType::UncertainPayment { amount_difference } => {
            format!(", Differenz {}", format_amount(amount_difference))
        }
        MatchType::ReferenceOnly | MatchType::FullPayment => String::new(),
    };
    let instalments = if assignment.extra_bank_rows.is_empty() {
        String::new()
    } else {
        format!(" ({} Zahlungen)", 1 + assignment.extra_bank_rows.len())
    };
    format!(
        "{} {} Zeile {}: {}{}{}",
        sheet,
        assignment.document_reference,
        assignment.row_number,
        assignment.match_type.label(),
        detail,
        instalments
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::Sheet;

    fn bank_row(row: [&str; 4]) -> Vec<String> {
        // date | text | amount | reference
        let mut r = vec![String::new(); 11];
        r[0] = row[0].into();
        r[1] = row[1].into();
        r[2] = row[2].into();
        r[8] = row[3].into();
        r
    }

    fn vat_row(reference: &str, net: &str, category: &str) -> Vec<String> {
        let mut r = vec![String::new(); 14];
        r[1] = reference.into();
        r[2] = category.into();
        r[4] = net.into();
        r[5] = "19".into();
        r
    }

    fn plain_row(reference: &str, amount: &str, category: &str) -> Vec<String> {
        let mut r = vec![String::new(); 11];
        r[1] = reference.into();
        r[2] = category.into();
        r[4] = amount.into();
        r
    }

    fn snapshot(bank: Vec<Vec<String>>, docs: &[(DocumentType, Vec<Vec<String>>)]) -> LedgerSnapshot {
        let config = EngineConfig::default();
        let mut ledgers = BTreeMap::new();
        for t in DocumentType::ALL {
            let width = if t.has_vat() { 14 } else { 11 };
            let rows = docs
                .iter()
                .find(|(d, _)| *d == t)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            ledgers.insert(t, Sheet::new(t.default_sheet(), vec!["h".to_string(); width], rows));
        }
        let bank = Sheet::new("Bankbewegungen", vec!["h".to_string(); 11], bank);
        LedgerSnapshot::from_sheets(bank, ledgers, &config).unwrap()
    }

    fn run(snap: &LedgerSnapshot) -> Reconciliation {
        let config = EngineConfig::default();
        let accounts = AccountMapping::collect(&config.accounts);
        let mut cache = RunCache::new();
        reconcile(snap, &config, &accounts, &mut cache)
    }

    #[test]
    fn test_invoice_payment_assignment() {
        let snap = snapshot(
            vec![bank_row(["05.03.2024", "Gutschrift", "500,00", "RE100"])],
            &[(DocumentType::Invoice, vec![vat_row("RE100", "420,17", "Erlöse 19%")])],
        );
        let rec = run(&snap);
        let a = &rec.assignments["invoice#2"];
        assert_eq!(a.match_type, MatchType::FullPayment);
        assert_eq!(a.bank_row_number, 2);
        assert_eq!(a.transaction_label, "Einnahme");
        assert_eq!((a.debit_account.as_str(), a.credit_account.as_str()), ("1200", "8400"));
        assert_eq!(a.match_description, "Einnahmen RE100 Zeile 2: vollständig bezahlt");
        assert!(rec.unmatched_bank_rows.is_empty());
    }

    #[test]
    fn test_outflow_goes_to_expense_first() {
        let snap = snapshot(
            vec![bank_row(["05.03.2024", "Lastschrift", "-59,50", "X-4711"])],
            &[
                (DocumentType::Invoice, vec![vat_row("X-4711", "50,00", "Erlöse 19%")]),
                (DocumentType::Expense, vec![vat_row("X-4711", "50,00", "Software")]),
            ],
        );
        let rec = run(&snap);
        assert!(rec.assignments.contains_key("expense#2"));
        assert!(!rec.assignments.contains_key("invoice#2"));
        let a = &rec.assignments["expense#2"];
        assert_eq!((a.debit_account.as_str(), a.credit_account.as_str()), ("4964", "1200"));
    }

    #[test]
    fn test_credit_note_refund_reverses_accounts() {
        let snap = snapshot(
            vec![bank_row(["05.03.2024", "Überweisung", "-119,00", "GS-1"])],
            &[(DocumentType::Invoice, vec![vat_row("GS-1", "-100,00", "Erlöse 19%")])],
        );
        let rec = run(&snap);
        let a = &rec.assignments["invoice#2"];
        assert!(a.is_credit_note);
        assert_eq!(a.transaction_label, "Gutschrift");
        assert_eq!((a.debit_account.as_str(), a.credit_account.as_str()), ("8400", "1200"));
    }

    #[test]
    fn test_each_bank_row_consumed_once() {
        // the same reference exists in two inflow ledgers; only the first takes it
        let snap = snapshot(
            vec![bank_row(["05.03.2024", "Gutschrift", "1000,00", "GK-2024-01"])],
            &[
                (DocumentType::ShareholderEntry, vec![plain_row("GK-2024-01", "1000,00", "Einlage")]),
                (DocumentType::HoldingTransfer, vec![plain_row("GK-2024-01", "1000,00", "Umlage")]),
            ],
        );
        let rec = run(&snap);
        assert_eq!(rec.assignments.len(), 1);
        let a = &rec.assignments["shareholderEntry#2"];
        assert!(a.is_shareholder_deposit);
        assert_eq!(a.transaction_label, "Gesellschaftereinlage");
        assert_eq!(rec.matched_bank_rows(), 1);
    }

    #[test]
    fn test_instalments_accumulate() {
        let snap = snapshot(
            vec![
                bank_row(["01.03.2024", "Gutschrift", "200,00", "RE7"]),
                bank_row(["15.03.2024", "Gutschrift", "300,00", "RE7"]),
            ],
            &[(DocumentType::Invoice, vec![vat_row("RE7", "420,17", "")])],
        );
        let rec = run(&snap);
        let a = &rec.assignments["invoice#2"];
        assert_eq!(a.bank_amount_abs, 500.0);
        assert_eq!(a.extra_bank_rows, vec![3]);
        assert_eq!(a.match_type, MatchType::FullPayment);
        assert_eq!(a.bank_date.to_string(), "2024-03-15");
        assert_eq!(rec.matched_bank_rows(), 2);
    }

    #[test]
    fn test_first_instalment_alone_is_partial() {
        let snap = snapshot(
            vec![bank_row(["01.03.2024", "Gutschrift", "200,00", "RE7"])],
            &[(DocumentType::Invoice, vec![vat_row("RE7", "420,17", "")])],
        );
        let rec = run(&snap);
        let a = &rec.assignments["invoice#2"];
        assert_eq!(a.match_type, MatchType::PartialPayment);
        assert!(a.match_description.ends_with("Teilzahlung, offen 300,00"));
    }

    #[test]
    fn test_unmatched_and_reference_less_rows() {
        let snap = snapshot(
            vec![
                bank_row(["01.03.2024", "Gebühren", "-5,00", ""]),
                bank_row(["02.03.2024", "Gutschrift", "10,00", "UNBEKANNT"]),
            ],
            &[],
        );
        let rec = run(&snap);
        assert!(rec.assignments.is_empty());
        assert_eq!(rec.unmatched_bank_rows, vec![2, 3]);
    }

    #[test]
    fn test_ledger_order_per_direction() {
        assert_eq!(ledger_order(Direction::Inflow)[0], DocumentType::Invoice);
        assert_eq!(ledger_order(Direction::Outflow)[0], DocumentType::Expense);
        assert!(!ledger_order(Direction::Inflow).contains(&DocumentType::SelfReceipt));
    }
}
