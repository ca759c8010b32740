use ledgersync_core::{
    DocumentType, EngineConfig, EntityRole, LedgerError, MatchType, RowCategory, Sheet,
    SyncOptions,
};
use ledgersync_engine::apply::apply_approved;
use ledgersync_engine::approval::{Approver, AutoApprove, GroupPrompt, ItemPrompt};
use ledgersync_engine::{prepare, run, RunCache};
use ledgersync_ingest::MemoryStore;
use std::collections::BTreeSet;

const BANK_HEADER: [&str; 11] = [
    "Datum", "Buchungstext", "Betrag", "Saldo", "Transaktionstyp", "Kategorie", "Soll", "Haben",
    "Referenz", "Verwendungszweck", "Abgleich",
];

const VAT_HEADER: [&str; 14] = [
    "Datum", "Nr.", "Kategorie", "Partner", "Netto", "MwSt %", "MwSt", "Brutto", "Bezahlt", "Status",
    "Zahlungsart", "Zahlungsdatum", "Bankabgleich", "Konto",
];

const PLAIN_HEADER: [&str; 11] = [
    "Datum", "Referenz", "Kategorie", "Beschreibung", "Betrag", "Bezahlt", "Status", "Zahlungsart",
    "Zahlungsdatum", "Bankabgleich", "Konto",
];

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

/// date, booking text, amount, reference, purpose
fn bank(date: &str, text: &str, amount: &str, reference: &str, purpose: &str) -> Vec<String> {
    let mut r = vec![String::new(); 11];
    r[0] = date.into();
    r[1] = text.into();
    r[2] = amount.into();
    r[8] = reference.into();
    r[9] = purpose.into();
    r
}

fn closing() -> Vec<String> {
    bank("31.03.2024", "Endsaldo", "0,00", "", "")
}

fn vat_doc(reference: &str, category: &str, net: &str) -> Vec<String> {
    let mut r = vec![String::new(); 14];
    r[0] = "01.03.2024".into();
    r[1] = reference.into();
    r[2] = category.into();
    r[4] = net.into();
    r[5] = "19".into();
    r
}

fn plain_doc(reference: &str, category: &str, amount: &str) -> Vec<String> {
    let mut r = vec![String::new(); 11];
    r[0] = "01.03.2024".into();
    r[1] = reference.into();
    r[2] = category.into();
    r[4] = amount.into();
    r
}

fn store_with(
    bank_rows: Vec<Vec<String>>,
    invoices: Vec<Vec<String>>,
    expenses: Vec<Vec<String>>,
    self_receipts: Vec<Vec<String>>,
    shareholder: Vec<Vec<String>>,
    holding: Vec<Vec<String>>,
) -> MemoryStore {
    MemoryStore::new()
        .with_sheet(Sheet::new("Bankbewegungen", header(&BANK_HEADER), bank_rows))
        .with_sheet(Sheet::new("Einnahmen", header(&VAT_HEADER), invoices))
        .with_sheet(Sheet::new("Ausgaben", header(&VAT_HEADER), expenses))
        .with_sheet(Sheet::new("Eigenbelege", header(&VAT_HEADER), self_receipts))
        .with_sheet(Sheet::new("Gesellschafterkonto", header(&PLAIN_HEADER), shareholder))
        .with_sheet(Sheet::new("Holding Transfers", header(&PLAIN_HEADER), holding))
}

fn quiet_config() -> EngineConfig {
    EngineConfig {
        sync: SyncOptions {
            batch_pause_ms: 0,
            fallback_pause_ms: 0,
            ..SyncOptions::default()
        },
        ..EngineConfig::default()
    }
}

/// A month of activity across all five ledgers.
fn month_store() -> MemoryStore {
    store_with(
        vec![
            bank("05.03.2024", "Gutschrift", "500,00", "RE100", ""),
            bank("06.03.2024", "Lastschrift", "-59,50", "", "Lizenz ER-2024-15"),
            bank("07.03.2024", "Gutschrift", "200,00", "RE7", ""),
            bank("08.03.2024", "Gutschrift", "1.000,00", "GK-1", "Einlage"),
            bank("09.03.2024", "Gutschrift", "5.000,00", "HT-2024-01", ""),
            bank("10.03.2024", "Überweisung", "-35,70", "EB-9", ""),
            bank("11.03.2024", "Kontoführung", "-9,90", "", ""),
            closing(),
        ],
        vec![
            vat_doc("RE100", "Erlöse 19%", "420,17"),
            vat_doc("RE7", "Erlöse 19%", "420,17"),
        ],
        vec![vat_doc("ER-2024-15", "Software", "50,00")],
        vec![vat_doc("EB-9", "Bewirtung", "-30,00")],
        vec![plain_doc("GK-1", "Einlage", "1.000,00")],
        vec![plain_doc("HT-2024-01", "Kapitalrückführung", "-5.000,00")],
    )
}

/// Approves everything and remembers what it was asked.
#[derive(Default)]
struct Recorder {
    groups: Vec<GroupPrompt>,
    items: Vec<ItemPrompt>,
    reject: BTreeSet<String>,
}

impl Approver for Recorder {
    fn approve_group(&mut self, prompt: &GroupPrompt) -> bool {
        self.groups.push(prompt.clone());
        true
    }

    fn approve_item(&mut self, prompt: &ItemPrompt) -> bool {
        self.items.push(prompt.clone());
        !self.reject.contains(&prompt.key)
    }
}

#[test]
fn test_invoice_scenario_end_to_end() {
    let mut store = month_store();
    let config = quiet_config();
    let mut cache = RunCache::new();

    let prepared = prepare(&store, &config, &mut cache).unwrap();
    let a = &prepared.reconciliation.assignments["invoice#2"];
    assert_eq!(a.match_type, MatchType::FullPayment);
    assert_eq!(a.gross_abs, 500.0);

    let review = prepared.reviews.iter().find(|r| r.key == "invoice#2").unwrap();
    let value = |field: &str| {
        review
            .changes
            .iter()
            .find(|c| c.kind.key() == field)
            .map(|c| c.bank_value.clone())
    };
    assert_eq!(value("status").as_deref(), Some("Bezahlt"));
    assert_eq!(value("paymentMethod").as_deref(), Some("Überweisung"));
    assert_eq!(value("date").as_deref(), Some("05.03.2024"));

    let report = run(&mut store, &config, &mut cache, &mut AutoApprove).unwrap();
    assert!(!report.has_failures());

    let invoices = store.sheet("Einnahmen").unwrap();
    assert_eq!(invoices.cell(2, 9), "500,00");
    assert_eq!(invoices.cell(2, 10), "Bezahlt");
    assert_eq!(invoices.cell(2, 11), "Überweisung");
    assert_eq!(invoices.cell(2, 12), "05.03.2024");
    assert_eq!(invoices.cell(2, 13), "Bank 05.03.2024 Zeile 2");

    let bank = store.sheet("Bankbewegungen").unwrap();
    assert_eq!(bank.cell(2, 5), "Einnahme");
    assert_eq!(bank.cell(2, 6), "Erlöse 19%");
    assert_eq!(bank.cell(2, 7), "1200");
    assert_eq!(bank.cell(2, 8), "8400");
    assert_eq!(bank.cell(2, 11), "Einnahmen RE100 Zeile 2: vollständig bezahlt");

    assert!(
        store
            .styles()
            .contains(&("Einnahmen".to_string(), 2, RowCategory::PaidWithBankMatch))
    );
}

#[test]
fn test_every_ledger_gets_its_movement() {
    let store = month_store();
    let mut cache = RunCache::new();
    let prepared = prepare(&store, &quiet_config(), &mut cache).unwrap();
    let recon = &prepared.reconciliation;

    let keys: Vec<&str> = recon.assignments.keys().map(|k| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["expense#2", "holdingTransfer#2", "invoice#2", "invoice#3", "shareholderEntry#2"]
    );
    assert_eq!(recon.assignments["invoice#3"].match_type, MatchType::PartialPayment);
    assert_eq!(recon.assignments["holdingTransfer#2"].transaction_label, "Kapitalrückführung");
    assert_eq!(recon.assignments["holdingTransfer#2"].debit_account, "1200");
    assert!(recon.assignments["shareholderEntry#2"].is_shareholder_deposit);
    // the negative self-receipt and the fee stay unmatched
    assert_eq!(recon.unmatched_bank_rows, vec![7, 8]);
    assert_eq!(recon.scanned, 7);
}

#[test]
fn test_second_run_is_a_no_op() {
    let mut store = month_store();
    let config = quiet_config();
    let mut cache = RunCache::new();

    let first = run(&mut store, &config, &mut cache, &mut AutoApprove).unwrap();
    assert!(first.cells_written > 0);
    store.clear_log();

    let second = run(&mut store, &config, &mut cache, &mut AutoApprove).unwrap();
    assert_eq!(second.assignments, first.assignments);
    assert_eq!(second.proposals, 0);
    assert_eq!(second.cells_written, 0);
    assert!(store.writes().is_empty());
}

#[test]
fn test_bank_rows_are_never_counted_twice() {
    let store = month_store();
    let mut cache = RunCache::new();
    let prepared = prepare(&store, &quiet_config(), &mut cache).unwrap();

    let mut seen = BTreeSet::new();
    for a in prepared.reconciliation.assignments.values() {
        for row in a.bank_rows() {
            assert!(seen.insert(row), "bank row {row} assigned twice");
        }
    }
}

#[test]
fn test_negative_self_receipt_is_never_matched() {
    let store = store_with(
        vec![bank("10.03.2024", "Überweisung", "-35,70", "EB-9", ""), closing()],
        vec![],
        vec![],
        vec![vat_doc("EB-9", "Bewirtung", "-30,00")],
        vec![],
        vec![],
    );
    let mut cache = RunCache::new();
    let prepared = prepare(&store, &quiet_config(), &mut cache).unwrap();
    assert!(prepared.reconciliation.assignments.is_empty());
    assert!(cache.get(DocumentType::SelfReceipt).unwrap().is_empty());
}

#[test]
fn test_capital_return_depends_on_role() {
    let rows = || {
        store_with(
            vec![bank("09.03.2024", "Gutschrift", "5.000,00", "HT-2024-01", ""), closing()],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![plain_doc("HT-2024-01", "Kapitalrückführung", "-5.000,00")],
        )
    };
    let mut cache = RunCache::new();

    let operating = prepare(&rows(), &quiet_config(), &mut cache).unwrap();
    assert_eq!(operating.reconciliation.assignments.len(), 1);

    let parent = EngineConfig {
        role: EntityRole::Parent,
        ..quiet_config()
    };
    let prepared = prepare(&rows(), &parent, &mut cache).unwrap();
    assert!(prepared.reconciliation.assignments.is_empty());
}

fn paid_invoices_store() -> MemoryStore {
    // already paid on the document side; only date and method are missing
    let invoice = |reference: &str| {
        let mut r = vat_doc(reference, "Erlöse 19%", "100,00");
        r[8] = "119,00".into();
        r[9] = "Bezahlt".into();
        r[12] = "manuell".into();
        r
    };
    store_with(
        vec![
            bank("12.03.2024", "Gutschrift", "119,00", "RE-2024-001", ""),
            bank("12.03.2024", "Gutschrift", "119,00", "RE-2024-002", ""),
            bank("12.03.2024", "Gutschrift", "119,00", "RE-2024-003", ""),
            bank("12.03.2024", "Gutschrift", "119,00", "RE-2024-004", ""),
            closing(),
        ],
        vec![
            invoice("RE-2024-001"),
            invoice("RE-2024-002"),
            invoice("RE-2024-003"),
            invoice("RE-2024-004"),
        ],
        vec![],
        vec![],
        vec![],
        vec![],
    )
}

#[test]
fn test_simple_group_is_bulk_approved_and_coalesced() {
    let mut store = paid_invoices_store();
    let mut approver = Recorder::default();
    let report = run(&mut store, &quiet_config(), &mut RunCache::new(), &mut approver).unwrap();

    assert_eq!(approver.groups.len(), 1);
    assert_eq!(approver.groups[0].key, "date+paymentMethod");
    assert_eq!(approver.groups[0].size, 4);
    assert!(approver.items.is_empty());
    assert_eq!(report.approved, 4);

    // one range per (column, value): date, method, match info, debit, credit, category, type
    let invoice_ranges: Vec<_> = store.writes().iter().filter(|w| w.sheet == "Einnahmen").collect();
    assert_eq!(invoice_ranges.len(), 2);
    assert!(invoice_ranges.iter().all(|w| w.values.len() == 4));
}

#[test]
fn test_failed_ranges_fall_back_to_single_cells() {
    let mut store = paid_invoices_store();
    store.fail_multi_row_writes(true);
    let report = run(&mut store, &quiet_config(), &mut RunCache::new(), &mut AutoApprove).unwrap();

    // only the per-row match info went through as (single-row) ranges
    assert_eq!(report.range_writes, 4);
    assert_eq!(report.fallback_cells, 24);
    assert!(report.failed_writes.is_empty());
    let invoices = store.sheet("Einnahmen").unwrap();
    for row in 2..=5 {
        assert_eq!(invoices.cell(row, 11), "Überweisung");
        assert_eq!(invoices.cell(row, 12), "12.03.2024");
    }
}

#[test]
fn test_failing_cell_is_reported_and_run_continues() {
    let mut store = paid_invoices_store();
    store.fail_multi_row_writes(true);
    store.fail_cell("Einnahmen", 3, 11);
    let report = run(&mut store, &quiet_config(), &mut RunCache::new(), &mut AutoApprove).unwrap();

    assert_eq!(report.failed_writes.len(), 1);
    assert_eq!(report.abandoned_cells, 2);
    let invoices = store.sheet("Einnahmen").unwrap();
    assert_eq!(invoices.cell(2, 11), "Überweisung");
    assert_eq!(invoices.cell(4, 11), "");
    // other columns were unaffected
    assert_eq!(invoices.cell(5, 12), "12.03.2024");
}

#[test]
fn test_rejected_rows_are_not_written() {
    let mut store = month_store();
    let mut approver = Recorder::default();
    approver.reject.insert("invoice#3".to_string());
    let report = run(&mut store, &quiet_config(), &mut RunCache::new(), &mut approver).unwrap();

    assert_eq!(report.rejected, 1);
    let invoices = store.sheet("Einnahmen").unwrap();
    assert_eq!(invoices.cell(3, 9), "");
    assert_eq!(invoices.cell(3, 13), "");
    assert_eq!(store.sheet("Bankbewegungen").unwrap().cell(4, 11), "");
}

#[test]
fn test_changed_reference_is_skipped_on_apply() {
    let mut store = month_store();
    let config = quiet_config();
    let mut cache = RunCache::new();
    let mut prepared = prepare(&store, &config, &mut cache).unwrap();

    prepared
        .reconciliation
        .assignments
        .get_mut("invoice#2")
        .unwrap()
        .original_reference = "GS-999".to_string();
    let approved: BTreeSet<String> = prepared.reconciliation.assignments.keys().cloned().collect();

    let report = apply_approved(
        &mut store,
        &prepared.snapshot,
        &config,
        &prepared.reconciliation.assignments,
        &prepared.reviews,
        &approved,
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "invoice#2");
    assert_eq!(store.sheet("Einnahmen").unwrap().cell(2, 10), "");
    assert_eq!(store.sheet("Einnahmen").unwrap().cell(3, 10), "Teilbezahlt");
}

#[test]
fn test_missing_column_aborts_before_writing() {
    let mut store = month_store();
    let mut config = quiet_config();
    config.ledgers.expense.layout.reconciliation_mark = 20;

    let err = run(&mut store, &config, &mut RunCache::new(), &mut AutoApprove).unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, LedgerError::MissingColumn { ref sheet, .. } if sheet == "Ausgaben"));
    assert!(store.writes().is_empty());
}

#[test]
fn test_report_serializes_to_json() {
    let mut store = month_store();
    let report = run(&mut store, &quiet_config(), &mut RunCache::new(), &mut AutoApprove).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["bankRowsUnmatched"], 2);
    assert_eq!(json["assignments"]["invoice#2"]["matchType"]["kind"], "fullPayment");
}
