//! Run metrics.
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the host
//! process installs a recorder.

use metrics::{counter, gauge, histogram};

use beatcut_planner::{ReconciledTimeline, SelectionSummary};

/// Metric names as constants for consistency.
pub mod names {
    // Planning
    pub const SLOTS_PLANNED_TOTAL: &str = "beatcut_slots_planned_total";
    pub const SEMANTIC_QUERIES: &str = "beatcut_semantic_queries";

    // Selection
    pub const SLOTS_MISSED_TOTAL: &str = "beatcut_slots_missed_total";
    pub const PRIMARY_HITS_TOTAL: &str = "beatcut_primary_hits_total";
    pub const RELAXED_HITS_TOTAL: &str = "beatcut_relaxed_hits_total";
    pub const REPETITION_RETRIES_TOTAL: &str = "beatcut_repetition_retries_total";
    pub const MISSING_FILES_TOTAL: &str = "beatcut_missing_files_total";

    // Reconciliation and rendering
    pub const FILLER_SEGMENTS_TOTAL: &str = "beatcut_filler_segments_total";
    pub const DURATION_GAP_SECONDS: &str = "beatcut_duration_gap_seconds";
    pub const RENDER_DURATION_SECONDS: &str = "beatcut_render_duration_seconds";
    pub const SEGMENTS_SKIPPED_TOTAL: &str = "beatcut_segments_skipped_total";

    // Runs
    pub const RUNS_TOTAL: &str = "beatcut_runs_total";
}

pub fn record_plan(slots: usize, semantic_queries: usize) {
    counter!(names::SLOTS_PLANNED_TOTAL).increment(slots as u64);
    gauge!(names::SEMANTIC_QUERIES).set(semantic_queries as f64);
}

/// Record the selector's per-montage counters.
pub fn record_selection(summary: &SelectionSummary) {
    counter!(names::PRIMARY_HITS_TOTAL).increment(summary.primary_hits as u64);
    counter!(names::RELAXED_HITS_TOTAL).increment(summary.relaxed_hits as u64);
    counter!(names::REPETITION_RETRIES_TOTAL).increment(summary.repetition_retries as u64);
    counter!(names::SLOTS_MISSED_TOTAL).increment(summary.misses as u64);
    counter!(names::MISSING_FILES_TOTAL).increment(summary.missing_files as u64);
}

pub fn record_fillers(timeline: &ReconciledTimeline, audio_duration: f64) {
    counter!(names::FILLER_SEGMENTS_TOTAL).increment(timeline.filler_count as u64);
    gauge!(names::DURATION_GAP_SECONDS).set(audio_duration - timeline.total_duration);
}

pub fn record_render(duration_secs: f64, segments_skipped: usize) {
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
    counter!(names::SEGMENTS_SKIPPED_TOTAL).increment(segments_skipped as u64);
}

/// Record a finished run, `status` being "success" or "failure".
pub fn record_run(status: &str) {
    let labels = [("status", status.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
}
