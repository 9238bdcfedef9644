//! Error types for turbfeat operations.

use thiserror::Error;

/// Result type alias using turbfeat Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting features.
///
/// Only structural problems are errors. Near-zero denominators inside the
/// feature formulas are floored locally and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory input field is absent at the requested snapshot.
    #[error("required field '{name}' missing at time {time}")]
    MissingField { name: String, time: String },

    /// A field does not cover every location of the discretization.
    #[error("field '{name}' has {found} values, expected {expected}")]
    FieldLength {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A field exists but holds a different algebraic kind than requested.
    #[error("field '{name}' is a {found} field, expected {expected}")]
    FieldKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A feature table asked for a field the set does not hold.
    #[error("feature field '{0}' not found")]
    UnknownFeature(String),

    /// Discretization construction errors.
    #[error("grid error: {0}")]
    Grid(String),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dedicated worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O errors (configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn missing(name: &str, time: &str) -> Self {
        Error::MissingField {
            name: name.to_string(),
            time: time.to_string(),
        }
    }

    /// Fail with [`Error::FieldLength`] unless `found == expected`.
    pub(crate) fn check_len(name: &str, expected: usize, found: usize) -> Result<()> {
        if expected != found {
            return Err(Error::FieldLength {
                name: name.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }
}
