//! ledgersync-core: ledger domain types, cell parsing, layouts and the store
//! boundary shared by the matching engine and the CLI.

pub mod accounts;
pub mod assignment;
pub mod bank;
pub mod config;
pub mod document;
pub mod error;
pub mod layout;
pub mod money;
pub mod normalize;
pub mod snapshot;
pub mod store;
pub mod time;

pub use accounts::{AccountMapping, AccountPair};
pub use assignment::{
    assignment_key, BankAssignment, ChangeKind, ChangeProposal, MatchResult, MatchStrategy,
    MatchType, PaymentStatus,
};
pub use bank::BankMovement;
pub use config::{EngineConfig, LedgerConfig, MatchingOptions, SyncOptions};
pub use document::{Direction, DocumentRecord, DocumentType, EntityRole, HoldingCategory};
pub use error::{LedgerError, Result, RowError};
pub use layout::{BankField, BankLayout, LedgerField, LedgerLayout};
pub use normalize::{is_good_reference_match, normalize_reference, references_agree};
pub use snapshot::LedgerSnapshot;
pub use store::{LedgerStore, RangeWrite, RowCategory, Sheet};
