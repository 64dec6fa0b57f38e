//! Planning error types.

use thiserror::Error;

use beatcut_catalog::CatalogError;
use beatcut_models::{AnalysisError, StyleError};

/// Result type for planning and selection.
pub type PlanResult<T> = Result<T, PlanError>;

/// Fatal planning errors.
///
/// A slot that finds no clip is not an error; it is reported as `None`.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("beats_per_clip must be at least 1, got {0}")]
    InvalidBeatsPerClip(usize),

    #[error("duration variation must be in [0, 1), got {0}")]
    InvalidDurationVariation(f64),

    #[error("Timeline is empty: {beats} beats cannot fill a {beats_per_clip}-beat slot")]
    EmptyTimeline { beats: usize, beats_per_clip: usize },

    #[error("Invalid style configuration: {0}")]
    Style(#[from] StyleError),

    #[error("Invalid audio analysis: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl PlanError {
    /// Whether the error comes from configuration rather than input data or I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidBeatsPerClip(_) | Self::InvalidDurationVariation(_) | Self::Style(_)
        )
    }
}
