//! Clip identifiers, catalog records and selected clips.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a catalog clip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Generate a new random clip ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-clip signal scores computed at indexing time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipSignals {
    /// 0.0 = static, 1.0 = high motion
    pub motion_score: f64,
    /// 0.0 = no silence, 1.0 = all silence
    pub silence_ratio: f64,
    /// Proxy for audio activity
    #[serde(default)]
    pub noise_level: f64,
    /// Image entropy (visual complexity)
    pub brightness_entropy: f64,
}

/// A clip as returned by the content repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecord {
    pub clip_id: ClipId,
    /// Path as stored in the catalog; may be relative to the clips directory
    pub filepath: String,
    /// Native clip duration in seconds
    pub duration: f64,
    /// Source tag, e.g. "archive" or "youtube"
    pub source: String,
    /// Identifier of the source video the clip was cut from
    #[serde(default)]
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Offset of the clip within its source video
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    /// Tag name to similarity score
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, f64>,
    /// Entity name to detection confidence
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<ClipSignals>,
    /// Cosine similarity to the semantic query, when one was ranked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

impl ClipRecord {
    /// Minimal record; the remaining fields can be filled with the `with_*` setters.
    pub fn new(
        clip_id: impl Into<ClipId>,
        filepath: impl Into<String>,
        duration: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            clip_id: clip_id.into(),
            filepath: filepath.into(),
            duration,
            source: source.into(),
            video_id: String::new(),
            year: None,
            start_time: 0.0,
            end_time: duration,
            tags: BTreeMap::new(),
            entities: BTreeMap::new(),
            signals: None,
            similarity: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, score: f64) -> Self {
        self.tags.insert(tag.into(), score);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>, confidence: f64) -> Self {
        self.entities.insert(entity.into(), confidence);
        self
    }

    pub fn with_signals(mut self, signals: ClipSignals) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn with_video(mut self, video_id: impl Into<String>, start_time: f64) -> Self {
        self.video_id = video_id.into();
        self.start_time = start_time;
        self.end_time = start_time + self.duration;
        self
    }
}

impl From<String> for ClipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A clip chosen for one montage slot, with its trim window.
///
/// `trim_start + trim_duration <= duration` holds for every value built by the
/// selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectedClip {
    pub clip_id: ClipId,
    /// Resolved on-disk path
    pub filepath: String,
    /// Native clip duration in seconds
    pub duration: f64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub start_time: f64,
    pub end_time: f64,
    /// Where to start inside the clip
    pub trim_start: f64,
    /// How much of the clip to use
    pub trim_duration: f64,
}

impl SelectedClip {
    pub fn trim_end(&self) -> f64 {
        self.trim_start + self.trim_duration
    }

    /// Whether the trim window lies inside the clip, allowing `epsilon` of slack.
    pub fn trim_within_bounds(&self, epsilon: f64) -> bool {
        self.trim_start >= 0.0 && self.trim_duration >= 0.0 && self.trim_end() <= self.duration + epsilon
    }
}
