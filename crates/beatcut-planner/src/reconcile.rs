//! Duration reconciliation between selected clips and the audio track.

use beatcut_models::{RenderSegment, SelectedClip};

/// Gap below which no filler is appended (seconds).
pub const DEFAULT_FILLER_EPSILON: f64 = 0.05;
/// Filler length used when a clip reports neither trim nor native duration.
pub const FALLBACK_FILLER_DURATION: f64 = 1.0;

/// Ordered playback list plus the numbers reported about it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledTimeline {
    pub segments: Vec<RenderSegment>,
    /// Sum of the selected clips' trim durations
    pub planned_duration: f64,
    /// Planned duration plus fillers
    pub total_duration: f64,
    pub filler_count: usize,
    /// Slots that had no clip
    pub skipped: usize,
}

impl ReconciledTimeline {
    pub fn primary_count(&self) -> usize {
        self.segments.len() - self.filler_count
    }
}

/// Append round-robin filler segments until the video covers `audio_duration`
/// within `epsilon`.
///
/// `None` entries are skipped. Fillers reuse each clip's own trim start and
/// are cut to the remaining gap.
pub fn reconcile_duration(
    clips: &[Option<SelectedClip>],
    audio_duration: f64,
    epsilon: f64,
) -> ReconciledTimeline {
    let mut segments = Vec::with_capacity(clips.len());
    let mut selected: Vec<&SelectedClip> = Vec::with_capacity(clips.len());
    let mut skipped = 0;

    for (index, clip) in clips.iter().enumerate() {
        match clip {
            Some(clip) => {
                segments.push(RenderSegment::from_selected(clip));
                selected.push(clip);
            }
            None => {
                skipped += 1;
                tracing::warn!(slot = index, "Skipping slot without a clip");
            }
        }
    }

    let planned_duration: f64 = selected.iter().map(|c| c.trim_duration).sum();
    let mut total_duration = planned_duration;
    let mut filler_count = 0;

    if !selected.is_empty() {
        let mut next = 0;
        while audio_duration - total_duration > epsilon {
            let clip = selected[next % selected.len()];
            next += 1;

            let gap = audio_duration - total_duration;
            let length = filler_length(clip).min(gap);
            let extended = total_duration + length;
            if length <= 0.0 || extended <= total_duration {
                break;
            }

            segments.push(RenderSegment::filler(clip, length));
            total_duration = extended;
            filler_count += 1;
        }
    }

    if filler_count > 0 {
        tracing::info!(
            filler_count,
            planned_duration,
            audio_duration,
            "Appended filler segments to cover audio"
        );
    }

    ReconciledTimeline {
        segments,
        planned_duration,
        total_duration,
        filler_count,
        skipped,
    }
}

fn filler_length(clip: &SelectedClip) -> f64 {
    if clip.trim_duration > 0.0 {
        clip.trim_duration
    } else if clip.duration > 0.0 {
        clip.duration
    } else {
        FALLBACK_FILLER_DURATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatcut_models::ClipId;

    fn clip(id: &str, trim_start: f64, trim_duration: f64) -> SelectedClip {
        SelectedClip {
            clip_id: ClipId::from_string(id),
            filepath: format!("/clips/{id}.mp4"),
            duration: 5.0,
            source: "archive".to_string(),
            year: None,
            start_time: 0.0,
            end_time: 5.0,
            trim_start,
            trim_duration,
        }
    }

    #[test]
    fn test_no_fillers_when_long_enough() {
        let clips = vec![Some(clip("a", 0.0, 2.0)), Some(clip("b", 0.0, 2.0))];
        let result = reconcile_duration(&clips, 3.98, DEFAULT_FILLER_EPSILON);
        assert_eq!(result.filler_count, 0);
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.total_duration, 4.0);
    }

    #[test]
    fn test_fillers_cover_audio_round_robin() {
        let clips = vec![Some(clip("a", 1.0, 1.0)), None, Some(clip("b", 0.5, 2.0))];
        let result = reconcile_duration(&clips, 10.0, DEFAULT_FILLER_EPSILON);

        assert_eq!(result.skipped, 1);
        assert_eq!(result.planned_duration, 3.0);
        assert!(result.total_duration >= 10.0 - DEFAULT_FILLER_EPSILON);
        assert!(result.total_duration <= 10.0 + 1e-9);

        let fillers: Vec<&RenderSegment> = result.segments.iter().filter(|s| s.filler).collect();
        assert_eq!(fillers.len(), result.filler_count);
        assert_eq!(fillers[0].clip_id.as_str(), "a");
        assert_eq!(fillers[1].clip_id.as_str(), "b");
        assert_eq!(fillers[2].clip_id.as_str(), "a");
        assert_eq!(fillers[0].trim_start, 1.0);
        assert_eq!(fillers[1].trim_start, 0.5);
        assert_eq!(result.primary_count(), 2);
    }

    #[test]
    fn test_last_filler_cut_to_gap() {
        let clips = vec![Some(clip("a", 0.0, 2.0))];
        let result = reconcile_duration(&clips, 5.0, DEFAULT_FILLER_EPSILON);
        let last = result.segments.last().unwrap();
        assert!(last.filler);
        assert!((last.trim_duration - 1.0).abs() < 1e-9);
        assert!((result.total_duration - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_yields_nothing() {
        let result = reconcile_duration(&[None, None], 10.0, DEFAULT_FILLER_EPSILON);
        assert!(result.segments.is_empty());
        assert_eq!(result.skipped, 2);
        assert_eq!(result.total_duration, 0.0);
    }

    #[test]
    fn test_zero_length_clip_uses_fallback() {
        let mut empty = clip("a", 0.0, 0.0);
        empty.duration = 0.0;
        let result = reconcile_duration(&[Some(empty)], 2.5, 0.0);
        assert_eq!(result.filler_count, 3);
        assert!((result.total_duration - 2.5).abs() < 1e-9);
    }
}
