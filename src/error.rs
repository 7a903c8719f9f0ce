//! Terrain Error Handling
//!
//! Library-level error types. Precondition violations (missing root node,
//! rechunking while the pipeline is busy) are programmer errors and assert
//! instead of returning these.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type TerrainResult<T> = Result<T, TerrainError>;

#[derive(Debug, Error)]
pub enum TerrainError {
    /// A configuration field failed validation at construction time.
    #[error("invalid config: {field}: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// The mesh sink refused an operation; the pipeline retries next tick.
    #[error("mesh sink unavailable for section {section}")]
    SinkUnavailable { section: u32 },
}

impl TerrainError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
