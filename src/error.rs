//! Planner error taxonomy.
//!
//! Structural and configuration failures are permanent; provider failures
//! carry the collaborator's own error through unchanged.

use thiserror::Error;

/// Errors raised while planning a keyed join distribution.
///
/// Every variant except [`PlanError::Provider`] reflects a permanently
/// malformed dataset definition or request; none are retried.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Flat file used as an index (or vice versa), inconsistent super-index
    /// sub-files, or a local super-index narrower/wider than the cluster.
    #[error("structural mismatch in '{file}': {reason}")]
    StructuralMismatch { file: String, reason: String },

    /// Request settings disagree with the published file, e.g. a missing
    /// encryption key for an encrypted file.
    #[error("configuration mismatch for '{file}': {reason}")]
    ConfigurationMismatch { file: String, reason: String },

    /// A combination of inputs the planner does not support.
    #[error("unsupported: {0}")]
    UnsupportedCombination(String),

    /// No copy of a top-level-key part exists anywhere.
    #[error("top level key part does not exist, for key: {0}")]
    TopLevelKeyMissing(String),

    /// A required (non-optional) file could not be resolved.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Published record layout differs from the one the join was compiled for.
    #[error("record format mismatch for '{file}': expected crc {expected:#010x}, found {found:#010x}")]
    FormatMismatch {
        file: String,
        expected: u32,
        found: u32,
    },

    #[error("worker {worker} is outside the node group of {group_size} workers")]
    InvalidWorker { worker: usize, group_size: usize },

    /// Per-worker plan encoding or decoding failed.
    #[error("plan codec error: {0}")]
    Codec(String),

    /// Failure reported by the file catalog or another external collaborator.
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl PlanError {
    pub(crate) fn structural(file: &str, reason: impl Into<String>) -> Self {
        Self::StructuralMismatch {
            file: file.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<postcard::Error> for PlanError {
    fn from(e: postcard::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Planner result alias.
pub type Result<T> = std::result::Result<T, PlanError>;
