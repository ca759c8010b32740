//! One reconciliation run: snapshot, match, review, approve, apply.
//!
//! `prepare` is read-only and stops at the review queue (dry-runs end
//! there). `run` carries on through approval and the writes.

use crate::apply::apply_approved;
use crate::approval::{run_approval, Approver};
use crate::cache::RunCache;
use crate::changes::{review_all, RowReview};
use crate::reconcile::{reconcile, Reconciliation};
use crate::report::{ReferenceCollision, RunReport};
use ledgersync_core::{AccountMapping, DocumentType, EngineConfig, LedgerSnapshot, LedgerStore, Result};
use tracing::{info, warn};

/// Output of the read-only half of a run.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub snapshot: LedgerSnapshot,
    pub reconciliation: Reconciliation,
    pub reviews: Vec<RowReview>,
    pub collisions: Vec<ReferenceCollision>,
}

/// Read the ledgers once and build the review queue. Only configuration
/// errors fail; row problems end up in `reconciliation.row_errors`.
pub fn prepare(store: &dyn LedgerStore, config: &EngineConfig, cache: &mut RunCache) -> Result<PreparedRun> {
    cache.reset();

    let snapshot = LedgerSnapshot::load(store, config)?;
    info!(bank_rows = snapshot.movements().len(), "ledger snapshot loaded");

    let accounts = AccountMapping::collect(&config.accounts);
    if accounts.is_empty() {
        warn!("no account mapping configured, debit/credit columns stay empty");
    }

    let mut reconciliation = reconcile(&snapshot, config, &accounts, cache);
    let (reviews, errors) = review_all(&reconciliation.assignments, &snapshot, config);
    reconciliation.row_errors.extend(errors);

    let collisions = DocumentType::ALL
        .iter()
        .filter_map(|&t| cache.get(t).map(|index| (t, index)))
        .flat_map(|(t, index)| {
            index.shadowed().iter().map(move |s| ReferenceCollision {
                document_type: t,
                key: s.key.clone(),
                kept_row: s.kept_row,
                shadowed_row: s.shadowed_row,
            })
        })
        .collect();

    Ok(PreparedRun {
        snapshot,
        reconciliation,
        reviews,
        collisions,
    })
}

/// A full run against `store`.
pub fn run(
    store: &mut dyn LedgerStore,
    config: &EngineConfig,
    cache: &mut RunCache,
    approver: &mut dyn Approver,
) -> Result<RunReport> {
    let prepared = prepare(&*store, config, cache)?;
    let outcome = run_approval(&prepared.reviews, &config.sync, approver);
    let applied = apply_approved(
        store,
        &prepared.snapshot,
        config,
        &prepared.reconciliation.assignments,
        &prepared.reviews,
        &outcome.approved,
    );
    Ok(RunReport::new(&prepared, Some(&outcome), Some(&applied)))
}
