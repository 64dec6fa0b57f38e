//! FFmpeg CLI wrapper for montage rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - A runner with stderr capture and optional timeout
//! - FFprobe duration probing
//! - The `MontageRenderer` trait and its FFmpeg implementation

pub mod command;
pub mod error;
pub mod probe;
pub mod render;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use render::{FfmpegRenderer, MontageRenderer, RenderOutcome, RenderRequest};
