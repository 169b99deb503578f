pub mod normalize;
pub mod merge;
pub mod persistence;
pub mod store;

pub use normalize::*;
pub use merge::*;
pub use persistence::*;
pub use store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record index {index} is out of range (store has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid status '{0}' (expected Executed, Curative, Title issue or Pending Review)")]
    InvalidStatus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Stored snapshot is corrupt: {0}")]
    Corrupt(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
