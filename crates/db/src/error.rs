use thiserror::Error;

/// Failures surfaced by a document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate value for unique field '{field}'")]
    Duplicate { field: &'static str },

    /// The backend could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be decoded into its model.
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
