//! Error taxonomy for mirror operations

use crate::domain::{Dimension, DomainPolicy};
use crate::engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    /// A required reference dimension has no usable values; nothing was written
    #[error(
        "insufficient reference domain under {policy} policy: no usable {}",
        dimension_names(.missing)
    )]
    DomainInsufficient {
        policy: DomainPolicy,
        missing: Vec<Dimension>,
    },

    /// The deletion range is implausibly large; nothing was deleted
    #[error("refusing to delete: current max identifier {current_max} exceeds sanity limit {limit}")]
    IntegrityGuard { current_max: u64, limit: u64 },

    #[error("invalid count: {0}")]
    InvalidCount(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl MirrorError {
    /// Precondition failures and refusals (the HTTP 400 class)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MirrorError::DomainInsufficient { .. }
                | MirrorError::IntegrityGuard { .. }
                | MirrorError::InvalidCount(_)
        )
    }
}

fn dimension_names(missing: &[Dimension]) -> String {
    missing
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;
