use std::io;

use thiserror::Error;

/// Errors surfaced by parameter validation, rate derivation, simulation and
/// table export.
#[derive(Debug, Error)]
pub enum ChimeError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("numeric instability: {0}")]
    NumericInstability(String),
    #[error("failed to parse table: {0}")]
    ParseTable(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ChimeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ChimeError::InvalidParameters(message.into())
    }

    pub(crate) fn unstable(message: impl Into<String>) -> Self {
        ChimeError::NumericInstability(message.into())
    }
}

/// Fails with `NumericInstability` when `value` is NaN or infinite.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64, ChimeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ChimeError::unstable(format!("{name} is not finite ({value})")))
    }
}
