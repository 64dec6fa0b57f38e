//! Ordered render segments handed to the render service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::clip::{ClipId, SelectedClip};

/// One trimmed piece of source video in final playback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSegment {
    pub clip_id: ClipId,
    pub filepath: PathBuf,
    pub trim_start: f64,
    pub trim_duration: f64,
    /// Appended to cover the gap between planned video and audio length
    #[serde(default)]
    pub filler: bool,
}

impl RenderSegment {
    /// Segment covering a selected clip's own trim window.
    pub fn from_selected(clip: &SelectedClip) -> Self {
        Self {
            clip_id: clip.clip_id.clone(),
            filepath: PathBuf::from(&clip.filepath),
            trim_start: clip.trim_start,
            trim_duration: clip.trim_duration,
            filler: false,
        }
    }

    /// Filler segment reusing `clip` from its trim start for `duration` seconds.
    pub fn filler(clip: &SelectedClip, duration: f64) -> Self {
        Self {
            trim_duration: duration,
            filler: true,
            ..Self::from_selected(clip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> SelectedClip {
        SelectedClip {
            clip_id: ClipId::from_string("c1"),
            filepath: "/data/clips/c1.mp4".to_string(),
            duration: 5.0,
            source: "archive".to_string(),
            year: Some(1991),
            start_time: 0.0,
            end_time: 5.0,
            trim_start: 1.25,
            trim_duration: 2.0,
        }
    }

    #[test]
    fn test_filler_keeps_trim_start() {
        let segment = RenderSegment::filler(&clip(), 0.5);
        assert!(segment.filler);
        assert_eq!(segment.trim_start, 1.25);
        assert_eq!(segment.trim_duration, 0.5);
        assert!(!RenderSegment::from_selected(&clip()).filler);
    }
}
