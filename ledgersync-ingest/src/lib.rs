//! ledgersync-ingest: ledger store implementations (CSV directory, in-memory).

pub mod csv_store;
pub mod memory;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;
