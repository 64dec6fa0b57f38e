//! Beat-synchronized montage pipeline.
//!
//! Wires the planner, catalog, embedding client and renderer into one run:
//! audio analysis in, rendered montage and JSON report out.

pub mod analysis;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod report;

pub use analysis::{sidecar_path, AudioAnalyzer, CommandAnalyzer, JsonAnalysisFile};
pub use config::{ConfigOverrides, PipelineConfig};
pub use embeddings::{precompute_embeddings, SharedEmbeddings};
pub use error::{PipelineError, PipelineResult};
pub use logging::{init_tracing, RunLogger};
pub use processor::{MontagePipeline, RunOutcome, RunRequest};
pub use report::RunReport;
