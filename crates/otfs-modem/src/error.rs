//! Error types shared by the OTFS core.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, OtfsError>;

/// Structural failures reported before any numeric work starts.
///
/// Non-finite values produced by interpolation are not reported here; the
/// estimator replaces them with zero.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OtfsError {
    /// A grid or buffer does not have the dimensions the caller agreed on.
    #[error("{what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: String,
        actual: String,
    },

    /// Invalid static configuration. The message names the parameter.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl OtfsError {
    pub(crate) fn shape(
        what: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        OtfsError::Shape {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        OtfsError::Configuration(msg.into())
    }
}
