//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

use beatcut_catalog::CatalogError;
use beatcut_media::MediaError;
use beatcut_ml_client::MlError;
use beatcut_models::AnalysisError;
use beatcut_planner::PlanError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Audio file not found: {0}")]
    AudioNotFound(PathBuf),

    #[error("Audio analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Invalid audio analysis: {0}")]
    InvalidAnalysis(#[from] AnalysisError),

    #[error("No clips found in the catalog for any of the {slots} slots")]
    NoClipsSelected { slots: usize },

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] MlError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    /// Whether the run failed because of malformed configuration.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::ConfigLoad(_) => true,
            Self::Plan(e) => e.is_configuration(),
            _ => false,
        }
    }

    /// Process exit code: 2 for configuration problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            2
        } else {
            1
        }
    }
}
