//! Error types for table decoding, encoding and loading.

use thiserror::Error;

/// A wire table that cannot be turned into a usable lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("postcode_keys has {keys} entries but value_key has {values}")]
    LengthMismatch { keys: usize, values: usize },

    #[error("postcode key overflowed u64 at index {index}")]
    KeyOverflow { index: usize },

    #[error("postcode keys are not sorted at index {index}: prev={prev}, next={next}")]
    NotSorted { index: usize, prev: u64, next: u64 },

    #[error("decoded value key {value} at index {index} is below -1")]
    InvalidValueKey { index: usize, value: i64 },
}

/// Rows or sequences that cannot be expressed in the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("keys are not sorted at index {index}: prev={prev}, next={next}")]
    NotSorted { index: usize, prev: u64, next: u64 },

    #[error("value key {value} at index {index} is below -1")]
    InvalidIndex { index: usize, value: i64 },

    #[error("gap marker at index {index} does not repeat the entry two back")]
    UnrepresentableGap { index: usize },

    #[error("invalid postcode: {0:?}")]
    InvalidPostcode(String),

    #[error("duplicate postcode: {0}")]
    DuplicatePostcode(String),
}

/// Failure to fetch, read or parse an encoded table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse table JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed table: {0}")]
    Table(#[from] TableError),
}
