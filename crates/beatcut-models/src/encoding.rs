//! Render profile used to normalize every montage segment.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec for the final mux
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 18;
/// Default pixel format
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Output frame geometry and rate
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_FPS: u32 = 30;

/// Encoding settings shared by segment normalization, concat and mux.
///
/// Segments are re-encoded to one geometry and constant frame rate so the
/// concat demuxer sees monotonic timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RenderProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Video codec (e.g., "libx264", "h264_nvenc")
    pub codec: String,
    /// Encoding preset (e.g., "veryfast", "medium")
    pub preset: String,
    /// Constant Rate Factor (quality, 0-51, lower is better)
    pub crf: u8,
    pub pixel_format: String,
    pub audio_codec: String,
    /// Kill FFmpeg after this many seconds per invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            timeout_secs: None,
        }
    }
}

impl RenderProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new profile with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Video filter chain that scales, crops, fixes the frame rate and resets PTS.
    pub fn normalize_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps},setpts=PTS-STARTPTS",
            w = self.width,
            h = self.height,
            fps = self.fps
        )
    }

    /// Video encoding arguments.
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = RenderProfile::default();
        assert_eq!(profile.codec, "libx264");
        assert_eq!(profile.crf, 18);
        assert_eq!(profile.fps, 30);
    }

    #[test]
    fn test_normalize_filter() {
        let filter = RenderProfile::default().normalize_filter();
        assert!(filter.starts_with("scale=1920:1080:force_original_aspect_ratio=increase"));
        assert!(filter.contains("crop=1920:1080"));
        assert!(filter.ends_with("setpts=PTS-STARTPTS"));
    }

    #[test]
    fn test_video_args() {
        let args = RenderProfile::default().with_crf(23).video_args();
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"23".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
    }

    #[test]
    fn test_partial_profile_deserializes_with_defaults() {
        let profile: RenderProfile = serde_json::from_str(r#"{"crf": 20}"#).unwrap();
        assert_eq!(profile.crf, 20);
        assert_eq!(profile.width, 1920);
    }
}
