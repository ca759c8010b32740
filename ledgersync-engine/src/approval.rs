//! Approval grouping and the accept/reject loop.
//!
//! Reviews are partitioned by document type, then by the sorted set of change
//! kinds they carry. Rows with nothing to ask about are approved without a
//! prompt. A group larger than the bulk threshold whose kinds are all simple
//! (date, payment method) gets one bulk prompt; a declined bulk prompt falls
//! back to asking per row.

use crate::changes::RowReview;
use ledgersync_core::{ChangeKind, DocumentType, SyncOptions};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub const NO_CHANGES: &str = "no_changes";

/// Group key of a sorted kind set, e.g. `date+paymentMethod`.
pub fn group_key(kinds: &[ChangeKind]) -> String {
    if kinds.is_empty() {
        return NO_CHANGES.to_string();
    }
    kinds.iter().map(|k| k.key()).collect::<Vec<_>>().join("+")
}

#[derive(Debug, Clone)]
pub struct ApprovalGroup<'a> {
    pub document_type: DocumentType,
    pub key: String,
    pub kinds: Vec<ChangeKind>,
    pub members: Vec<&'a RowReview>,
}

impl ApprovalGroup<'_> {
    pub fn is_bulk_eligible(&self, bulk_threshold: usize) -> bool {
        self.members.len() > bulk_threshold
            && !self.kinds.is_empty()
            && self.kinds.iter().all(ChangeKind::is_simple)
    }
}

/// Partition reviews into approval groups, ordered by document type and key.
pub fn group_reviews(reviews: &[RowReview]) -> Vec<ApprovalGroup<'_>> {
    let mut groups: BTreeMap<(DocumentType, String), ApprovalGroup<'_>> = BTreeMap::new();
    for review in reviews {
        let kinds = review.kinds();
        let key = group_key(&kinds);
        groups
            .entry((review.document_type, key.clone()))
            .or_insert_with(|| ApprovalGroup {
                document_type: review.document_type,
                key,
                kinds,
                members: Vec::new(),
            })
            .members
            .push(review);
    }
    groups.into_values().collect()
}

/// What a bulk prompt shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPrompt {
    pub document_type: DocumentType,
    pub key: String,
    pub size: usize,
    pub lines: Vec<String>,
}

/// What a per-row prompt shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPrompt {
    pub key: String,
    pub document_type: DocumentType,
    pub row_number: usize,
    pub lines: Vec<String>,
}

/// The human in the loop. Each call is one binary decision.
pub trait Approver {
    fn approve_group(&mut self, prompt: &GroupPrompt) -> bool;
    fn approve_item(&mut self, prompt: &ItemPrompt) -> bool;
}

/// Accepts everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Approver for AutoApprove {
    fn approve_group(&mut self, _prompt: &GroupPrompt) -> bool {
        true
    }

    fn approve_item(&mut self, _prompt: &ItemPrompt) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    /// Keys cleared for writing, including auto-approved ones
    pub approved: BTreeSet<String>,
    pub rejected: BTreeSet<String>,
    pub auto_approved: usize,
    pub bulk_prompts: usize,
    pub item_prompts: usize,
}

fn item_prompt(review: &RowReview) -> ItemPrompt {
    ItemPrompt {
        key: review.key.clone(),
        document_type: review.document_type,
        row_number: review.row_number,
        lines: review.interactive().map(|c| c.description.clone()).collect(),
    }
}

pub fn run_approval(
    reviews: &[RowReview],
    opts: &SyncOptions,
    approver: &mut dyn Approver,
) -> ApprovalOutcome {
    let mut outcome = ApprovalOutcome::default();

    for group in group_reviews(reviews) {
        if group.key == NO_CHANGES {
            outcome.auto_approved += group.members.len();
            outcome
                .approved
                .extend(group.members.iter().map(|r| r.key.clone()));
            continue;
        }

        if group.is_bulk_eligible(opts.bulk_threshold) {
            outcome.bulk_prompts += 1;
            let prompt = GroupPrompt {
                document_type: group.document_type,
                key: group.key.clone(),
                size: group.members.len(),
                lines: group
                    .members
                    .iter()
                    .map(|r| format!("{}: {}", r.key, r.describe()))
                    .collect(),
            };
            if approver.approve_group(&prompt) {
                debug!(ledger = %group.document_type, group = %group.key, size = prompt.size, "bulk approved");
                outcome
                    .approved
                    .extend(group.members.iter().map(|r| r.key.clone()));
                continue;
            }
            debug!(ledger = %group.document_type, group = %group.key, "bulk declined, asking per row");
        }

        for review in &group.members {
            outcome.item_prompts += 1;
            if approver.approve_item(&item_prompt(review)) {
                outcome.approved.insert(review.key.clone());
            } else {
                outcome.rejected.insert(review.key.clone());
            }
        }
    }

    info!(
        approved = outcome.approved.len(),
        auto_approved = outcome.auto_approved,
        rejected = outcome.rejected.len(),
        "approval finished"
    );
    outcome
}
