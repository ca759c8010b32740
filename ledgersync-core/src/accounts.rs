//! Category → (debit, credit) account lookup.
//!
//! The engine never invents account codes. Lookup order:
//! 1) exact category of the document type
//! 2) first pair configured for that document type
//! 3) first pair configured at all (global fallback)

use crate::config::AccountsConfig;
use crate::document::DocumentType;
use crate::normalize::normalize_reference;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountPair {
    pub debit: String,
    pub credit: String,
}

impl AccountPair {
    /// Same accounts, opposite sides (refunds, credit notes).
    pub fn reversed(&self) -> AccountPair {
        AccountPair {
            debit: self.credit.clone(),
            credit: self.debit.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountMapping {
    by_category: HashMap<(DocumentType, String), AccountPair>,
    first_of_type: HashMap<DocumentType, AccountPair>,
    global_fallback: Option<AccountPair>,
}

impl AccountMapping {
    /// Flatten the per-ledger configuration into one lookup table.
    pub fn collect(config: &AccountsConfig) -> Self {
        let mut mapping = AccountMapping::default();

        for document_type in DocumentType::ALL {
            for entry in config.get(document_type) {
                let pair = AccountPair {
                    debit: entry.debit.trim().to_string(),
                    credit: entry.credit.trim().to_string(),
                };
                if mapping.global_fallback.is_none() {
                    mapping.global_fallback = Some(pair.clone());
                }
                mapping
                    .first_of_type
                    .entry(document_type)
                    .or_insert_with(|| pair.clone());
                mapping
                    .by_category
                    .entry((document_type, normalize_reference(&entry.category)))
                    .or_insert(pair);
            }
        }

        mapping
    }

    pub fn lookup(&self, document_type: DocumentType, category: &str) -> Option<&AccountPair> {
        self.by_category
            .get(&(document_type, normalize_reference(category)))
            .or_else(|| self.first_of_type.get(&document_type))
            .or(self.global_fallback.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.global_fallback.is_none()
    }
}
