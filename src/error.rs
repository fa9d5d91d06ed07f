use thiserror::Error;

/// Errors raised by the structuring engine.
///
/// Only malformed inputs are errors. Layout problems found while structuring a
/// page are reported as [`crate::anomaly::Anomaly`] values instead.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to read rules: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse rules: {0}")]
    Rules(#[from] serde_json::Error),
}

impl StructureError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StructureError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StructureError>;
