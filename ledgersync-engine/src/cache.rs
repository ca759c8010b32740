//! Run-scoped cache of reference indexes, one per ledger type.
//!
//! Owned by the caller and passed into the run; `reset()` is called once at
//! the start of every run so nothing survives from a previous snapshot.

use crate::index::ReferenceIndex;
use ledgersync_core::{DocumentType, RowError};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Default)]
pub struct RunCache {
    indexes: HashMap<DocumentType, (ReferenceIndex, Vec<RowError>)>,
    builds: usize,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.indexes.clear();
        self.builds = 0;
    }

    /// Cached index for `document_type`, built with `build` on first use.
    pub fn index_or_build<F>(&mut self, document_type: DocumentType, build: F) -> &ReferenceIndex
    where
        F: FnOnce() -> (ReferenceIndex, Vec<RowError>),
    {
        let builds = &mut self.builds;
        let (index, _) = self.indexes.entry(document_type).or_insert_with(|| {
            *builds += 1;
            let (index, errors) = build();
            info!(ledger = %document_type, entries = index.len(), errors = errors.len(), "built reference index");
            (index, errors)
        });
        index
    }

    pub fn get(&self, document_type: DocumentType) -> Option<&ReferenceIndex> {
        self.indexes.get(&document_type).map(|(index, _)| index)
    }

    /// Row errors of every index built in this run, in ledger order.
    pub fn row_errors(&self) -> Vec<RowError> {
        DocumentType::ALL
            .iter()
            .filter_map(|t| self.indexes.get(t))
            .flat_map(|(_, errors)| errors.iter().cloned())
            .collect()
    }

    /// Number of index builds since the last reset.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
