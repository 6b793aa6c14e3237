//! Dashboard stores and value domains
//!
//! Concrete collaborators for `ds-core`: loaders and persistence sinks backed
//! by a directory of container files or by memory, and a value domain
//! provider that reads distinct column values from CSV files.

pub mod config;
pub mod sources;
pub mod store;

use ds_core::LoadError;
use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use config::{NullConfig, StoreConfig, ValueDomainConfig};
pub use sources::CsvValueDomain;
pub use store::{InMemoryStore, LocalFileStore};

/// Errors that can occur in store and value domain operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("dashboard '{0}' not found")]
    NotFound(String),

    #[error("invalid dashboard name '{0}'")]
    InvalidName(String),

    #[error("no CSV file configured for data source {0:?}")]
    NoSource(Option<String>),

    #[error("column '{column}' not found in {file}")]
    UnknownColumn { column: String, file: String },

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<csv::Error> for StoreError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => StoreError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => StoreError::Csv(error.to_string()),
        }
    }
}

impl From<StoreError> for LoadError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Load(err) => err,
            StoreError::NotFound(id) => LoadError::new(format!("dashboard '{}' not found in store", id)),
            other => LoadError::new(other.to_string()),
        }
    }
}
