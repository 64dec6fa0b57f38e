//! Shared data models for the beatcut montage pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Beat and structure analysis results
//! - Timeline slots and montage plans
//! - Clip queries, catalog records and selected clips
//! - Style tables mapping musical sections to selection constraints
//! - Render profiles and ordered render segments

pub mod analysis;
pub mod clip;
pub mod encoding;
pub mod plan;
pub mod query;
pub mod segment;
pub mod style;
pub mod timeline;

// Re-export common types
pub use analysis::{AnalysisError, AudioAnalysis, BeatAnalysis, Section, StructureAnalysis};
pub use clip::{ClipId, ClipRecord, ClipSignals, SelectedClip};
pub use encoding::RenderProfile;
pub use plan::MontageSlot;
pub use query::ClipQuery;
pub use segment::RenderSegment;
pub use style::{normalize_label, SelectionThresholds, StyleDescriptor, StyleError, StyleTable};
pub use timeline::TimelineSlot;
