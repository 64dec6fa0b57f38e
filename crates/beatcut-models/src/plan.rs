//! Montage plan entries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::query::ClipQuery;
use crate::timeline::TimelineSlot;

/// One timeline slot with its fully resolved clip query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MontageSlot {
    pub timeline_slot: TimelineSlot,
    pub query: ClipQuery,
    /// Section label the slot fell into, e.g. "drop"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<String>,
}

impl MontageSlot {
    /// Duration the selected clip should fill.
    pub fn target_duration(&self) -> f64 {
        self.timeline_slot.duration
    }
}
