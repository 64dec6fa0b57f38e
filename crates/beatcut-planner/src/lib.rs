//! Montage planning and clip selection.
//!
//! This crate turns beat and section analysis into a playback list:
//! - Timeline building: beats grouped into jittered slots
//! - Section mapping: each slot labelled by the section under its midpoint
//! - Style resolution: section label to a declarative clip query
//! - Montage planning: the three steps above composed
//! - Clip selection: repository queries with relaxation and repetition avoidance
//! - Duration reconciliation: round-robin filler so video covers the audio
//!
//! Everything here is synchronous. Randomness flows through a single
//! [`SelectionRng`] so a seeded run is reproducible end to end.

pub mod error;
pub mod plan;
pub mod reconcile;
pub mod rng;
pub mod sections;
pub mod selector;
pub mod style;
pub mod timeline;

pub use error::{PlanError, PlanResult};
pub use plan::{distinct_semantic_queries, MontagePlanner};
pub use reconcile::{reconcile_duration, ReconciledTimeline, DEFAULT_FILLER_EPSILON};
pub use rng::SelectionRng;
pub use sections::{map_sections, section_at};
pub use selector::{ClipSelector, MissingFilePolicy, MontageSelection, SelectionSummary};
pub use style::StyleResolver;
pub use timeline::TimelineBuilder;
