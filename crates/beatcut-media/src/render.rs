//! Montage rendering.
//!
//! Each segment is trimmed and normalized to the render profile, the pieces
//! are joined with the concat demuxer, and the result is muxed with the audio
//! track. Intermediate files live in the work directory and are removed once
//! the output exists.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use beatcut_models::{RenderProfile, RenderSegment};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

const CONCAT_LIST: &str = "concat.txt";
const CONCAT_OUTPUT: &str = "montage_video.mp4";

/// Everything the renderer needs for one montage.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Playback order; fillers follow the primary segments
    pub segments: Vec<RenderSegment>,
    pub audio: PathBuf,
    pub output: PathBuf,
    /// Scratch directory for trimmed segments
    pub work_dir: PathBuf,
    pub profile: RenderProfile,
}

/// What actually made it into the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOutcome {
    pub output: PathBuf,
    pub segments_rendered: usize,
    /// Primary segments whose trim failed
    pub segments_skipped: usize,
    /// Fillers not rendered because an earlier filler trim failed
    pub fillers_dropped: usize,
    pub elapsed_secs: f64,
}

/// Produces a video file from an ordered segment list and an audio track.
#[async_trait]
pub trait MontageRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> MediaResult<RenderOutcome>;
}

/// Renderer driving the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    runner: FfmpegRunner,
    keep_temp: bool,
}

impl FfmpegRenderer {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self {
            runner,
            keep_temp: false,
        }
    }

    /// Leave intermediate files in the work directory.
    pub fn keep_temp(mut self, keep: bool) -> Self {
        self.keep_temp = keep;
        self
    }

    async fn render_segments(
        &self,
        request: &RenderRequest,
        work_dir: &Path,
    ) -> MediaResult<(Vec<PathBuf>, usize, usize)> {
        let mut rendered = Vec::with_capacity(request.segments.len());
        let mut skipped = 0;
        let mut fillers_dropped = 0;

        for (index, segment) in request.segments.iter().enumerate() {
            let output = work_dir.join(format!("segment_{index:04}.mp4"));
            let cmd = trim_command(segment, &output, &request.profile);

            match self.runner.run(&cmd).await {
                Ok(()) => rendered.push(output),
                Err(e) if segment.filler => {
                    fillers_dropped = request.segments[index..].iter().filter(|s| s.filler).count();
                    warn!(
                        clip_id = %segment.clip_id,
                        error = %e,
                        fillers_dropped,
                        "Filler trim failed, not appending further fillers"
                    );
                    break;
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        clip_id = %segment.clip_id,
                        filepath = %segment.filepath.display(),
                        error = %e,
                        "Segment trim failed, skipping"
                    );
                }
            }
        }

        Ok((rendered, skipped, fillers_dropped))
    }

    async fn cleanup(&self, paths: &[PathBuf]) {
        if self.keep_temp {
            return;
        }
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                debug!(path = %path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

#[async_trait]
impl MontageRenderer for FfmpegRenderer {
    async fn render(&self, request: &RenderRequest) -> MediaResult<RenderOutcome> {
        if request.segments.is_empty() {
            return Err(MediaError::NoSegments);
        }
        if !request.audio.exists() {
            return Err(MediaError::FileNotFound(request.audio.clone()));
        }

        let started = Instant::now();
        tokio::fs::create_dir_all(&request.work_dir).await?;
        // concat resolves relative entries against the list file's directory
        let work_dir = tokio::fs::canonicalize(&request.work_dir).await?;
        if let Some(parent) = request.output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!(
            segments = request.segments.len(),
            work_dir = %work_dir.display(),
            "Rendering montage segments"
        );
        let (rendered, segments_skipped, fillers_dropped) = self.render_segments(request, &work_dir).await?;
        if rendered.is_empty() {
            return Err(MediaError::NoSegments);
        }

        let list_path = work_dir.join(CONCAT_LIST);
        tokio::fs::write(&list_path, concat_list(&rendered)).await?;

        let video_path = work_dir.join(CONCAT_OUTPUT);
        let mut temp_files = rendered.clone();
        temp_files.push(list_path.clone());
        temp_files.push(video_path.clone());

        let result = async {
            self.runner
                .run(&concat_command(&list_path, &video_path, &request.profile))
                .await?;
            self.runner
                .run(&mux_command(&video_path, &request.audio, &request.output, &request.profile))
                .await
        }
        .await;
        self.cleanup(&temp_files).await;
        result?;

        let outcome = RenderOutcome {
            output: request.output.clone(),
            segments_rendered: rendered.len(),
            segments_skipped,
            fillers_dropped,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            output = %outcome.output.display(),
            segments_rendered = outcome.segments_rendered,
            segments_skipped,
            fillers_dropped,
            elapsed_secs = outcome.elapsed_secs,
            "Montage rendered"
        );
        Ok(outcome)
    }
}

/// Trim one segment and normalize geometry, frame rate and timestamps.
pub fn trim_command(segment: &RenderSegment, output: &Path, profile: &RenderProfile) -> FfmpegCommand {
    FfmpegCommand::new(&segment.filepath, output)
        .seek(segment.trim_start)
        .duration(segment.trim_duration)
        .video_filter(profile.normalize_filter())
        .no_audio()
        .output_args(["-vsync", "cfr"])
        .output_args(profile.video_args())
}

/// Join trimmed segments listed in `list` into one video-only file.
pub fn concat_command(list: &Path, output: &Path, profile: &RenderProfile) -> FfmpegCommand {
    FfmpegCommand::new(list, output)
        .format("concat")
        .input_arg("-safe")
        .input_arg("0")
        .no_audio()
        .output_args(profile.video_args())
}

/// Combine the montage video with the audio track, ending at the shorter one.
pub fn mux_command(video: &Path, audio: &Path, output: &Path, profile: &RenderProfile) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .add_input(audio)
        .video_codec("copy")
        .audio_codec(profile.audio_codec.clone())
        .map("0:v:0")
        .map("1:a:0")
        .shortest()
}

/// Concat demuxer list: one `file '<path>'` line per segment.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}
