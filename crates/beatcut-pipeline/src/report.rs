//! JSON run report written next to the rendered montage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beatcut_models::{AudioAnalysis, ClipId, MontageSlot, SelectedClip};
use beatcut_planner::{ReconciledTimeline, SelectionSummary};

use crate::error::PipelineResult;

/// Section as reported: label, start and end in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(rename = "type")]
    pub section_type: String,
    pub start: f64,
    pub end: f64,
}

/// One clip that made it into the primary timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportClip {
    pub clip_id: ClipId,
    pub filepath: String,
    pub duration: f64,
    pub trim_start: f64,
    pub trim_duration: f64,
    pub section_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportCounters {
    pub slots: usize,
    pub primary_hits: usize,
    pub relaxed_hits: usize,
    pub repetition_retries: usize,
    pub misses: usize,
    pub missing_files: usize,
    pub fillers: usize,
    pub segments_skipped: usize,
    pub fillers_dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub audio_file: PathBuf,
    pub output_file: PathBuf,
    pub seed: Option<u64>,
    pub bpm: f64,
    pub beats_count: usize,
    pub sections: Vec<ReportSection>,
    pub counters: ReportCounters,
    pub audio_duration: f64,
    /// Sum of the primary clips' trim durations
    pub planned_duration: f64,
    /// Planned duration plus fillers
    pub total_duration: f64,
    pub selected_clips: Vec<ReportClip>,
}

/// Inputs gathered over one run.
#[derive(Debug)]
pub struct ReportInput<'a> {
    pub run_id: &'a str,
    pub audio: &'a Path,
    pub output: &'a Path,
    pub seed: Option<u64>,
    pub analysis: &'a AudioAnalysis,
    pub audio_duration: f64,
    pub plan: &'a [MontageSlot],
    pub clips: &'a [Option<SelectedClip>],
    pub summary: &'a SelectionSummary,
    pub timeline: &'a ReconciledTimeline,
    pub segments_skipped: usize,
    pub fillers_dropped: usize,
}

impl RunReport {
    pub fn build(input: ReportInput<'_>) -> Self {
        let sections = input
            .analysis
            .structure
            .sections
            .iter()
            .map(|s| ReportSection {
                section_type: s.label.clone(),
                start: s.start,
                end: s.end,
            })
            .collect();

        let selected_clips = input
            .plan
            .iter()
            .zip(input.clips)
            .filter_map(|(slot, clip)| {
                clip.as_ref().map(|clip| ReportClip {
                    clip_id: clip.clip_id.clone(),
                    filepath: clip.filepath.clone(),
                    duration: clip.duration,
                    trim_start: clip.trim_start,
                    trim_duration: clip.trim_duration,
                    section_type: slot.section_type.clone(),
                })
            })
            .collect();

        let summary = input.summary;
        Self {
            run_id: input.run_id.to_string(),
            generated_at: Utc::now(),
            audio_file: input.audio.to_path_buf(),
            output_file: input.output.to_path_buf(),
            seed: input.seed,
            bpm: input.analysis.rhythm.tempo,
            beats_count: input.analysis.rhythm.len(),
            sections,
            counters: ReportCounters {
                slots: summary.slots,
                primary_hits: summary.primary_hits,
                relaxed_hits: summary.relaxed_hits,
                repetition_retries: summary.repetition_retries,
                misses: summary.misses,
                missing_files: summary.missing_files,
                fillers: input.timeline.filler_count,
                segments_skipped: input.segments_skipped,
                fillers_dropped: input.fillers_dropped,
            },
            audio_duration: input.audio_duration,
            planned_duration: input.timeline.planned_duration,
            total_duration: input.timeline.total_duration,
            selected_clips,
        }
    }

    /// `<output>` with its extension replaced by `json`.
    pub fn path_for(output: &Path) -> PathBuf {
        output.with_extension("json")
    }

    /// Write the report next to the output and return its path.
    pub async fn write(&self) -> PipelineResult<PathBuf> {
        let path = Self::path_for(&self.output_file);
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}
