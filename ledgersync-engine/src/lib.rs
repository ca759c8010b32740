//! ledgersync-engine: bank reconciliation matching engine
//!
//! index → matcher/evaluator → reconcile → changes → approval → apply

pub mod apply;
pub mod approval;
pub mod cache;
pub mod changes;
pub mod evaluator;
pub mod index;
pub mod matcher;
pub mod reconcile;
pub mod report;
pub mod run;

pub use apply::{apply_approved, coalesce, plan_writes, row_category, ApplyReport, WritePlan};
pub use approval::{run_approval, Approver, AutoApprove, GroupPrompt, ItemPrompt};
pub use cache::RunCache;
pub use changes::{detect_changes, RowReview};
pub use evaluator::{accepts_direction, evaluate, holding_direction};
pub use index::ReferenceIndex;
pub use matcher::{find_reference, match_reference, ExpectedPayment};
pub use reconcile::{reconcile, Reconciliation};
pub use report::RunReport;
pub use run::{prepare, run, PreparedRun};
