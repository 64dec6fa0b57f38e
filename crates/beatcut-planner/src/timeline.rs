//! Beat grouping into timeline slots.

use beatcut_models::{BeatAnalysis, TimelineSlot};

use crate::error::{PlanError, PlanResult};
use crate::rng::SelectionRng;

/// Jittered durations never drop below this.
pub const MIN_SLOT_DURATION: f64 = 0.1;
/// Duration of the single slot built from a one-beat track.
pub const SINGLE_BEAT_DURATION: f64 = 1.0;

/// Groups every `beats_per_clip` beats into one slot and jitters its length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineBuilder {
    beats_per_clip: usize,
    duration_variation: f64,
}

impl TimelineBuilder {
    pub fn new(beats_per_clip: usize, duration_variation: f64) -> PlanResult<Self> {
        if beats_per_clip == 0 {
            return Err(PlanError::InvalidBeatsPerClip(beats_per_clip));
        }
        if !duration_variation.is_finite() || !(0.0..1.0).contains(&duration_variation) {
            return Err(PlanError::InvalidDurationVariation(duration_variation));
        }
        Ok(Self {
            beats_per_clip,
            duration_variation,
        })
    }

    pub fn beats_per_clip(&self) -> usize {
        self.beats_per_clip
    }

    pub fn duration_variation(&self) -> f64 {
        self.duration_variation
    }

    /// Slots in beat order. Jitter is drawn from `rng` once per slot.
    pub fn build(&self, analysis: &BeatAnalysis, rng: &mut SelectionRng) -> Vec<TimelineSlot> {
        let beats = &analysis.beats;
        let n = beats.len();
        let b = self.beats_per_clip;

        match n {
            0 => return Vec::new(),
            1 => return vec![TimelineSlot::new(beats[0], SINGLE_BEAT_DURATION, 0)],
            _ if n < b => return Vec::new(),
            _ => {}
        }

        let mean_interval = analysis.mean_interval();
        (0..=n - b)
            .step_by(b)
            .map(|i| {
                let start = beats[i];
                let nominal = match beats.get(i + b) {
                    Some(end) => end - start,
                    None => mean_interval * b as f64,
                };
                let duration = self.jitter(nominal, rng).max(MIN_SLOT_DURATION);
                TimelineSlot::new(start, duration, i)
            })
            .collect()
    }

    fn jitter(&self, nominal: f64, rng: &mut SelectionRng) -> f64 {
        if self.duration_variation == 0.0 {
            return nominal;
        }
        let spread = nominal.abs() * self.duration_variation;
        nominal + rng.uniform(-spread, spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_timeline(
        analysis: &BeatAnalysis,
        beats_per_clip: usize,
        duration_variation: f64,
        rng: &mut SelectionRng,
    ) -> PlanResult<Vec<TimelineSlot>> {
        Ok(TimelineBuilder::new(beats_per_clip, duration_variation)?.build(analysis, rng))
    }

    fn rng() -> SelectionRng {
        SelectionRng::seeded(42)
    }

    #[test]
    fn test_slot_count_follows_grouping() {
        let beats = BeatAnalysis::constant(120.0, 120, 0.5);
        for b in 1..=7 {
            let slots = build_timeline(&beats, b, 0.1, &mut rng()).unwrap();
            assert_eq!(slots.len(), (120 - b) / b + 1, "beats_per_clip={b}");
        }
    }

    #[test]
    fn test_slots_are_ordered_and_positive() {
        let beats = BeatAnalysis::new(100.0, vec![0.0, 0.4, 1.1, 1.5, 2.2, 2.2, 3.0]);
        let slots = build_timeline(&beats, 1, 0.5, &mut rng()).unwrap();
        assert_eq!(slots.len(), 7);
        for pair in slots.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!(pair[0].beat_index < pair[1].beat_index);
        }
        assert!(slots.iter().all(|s| s.duration >= MIN_SLOT_DURATION));
    }

    #[test]
    fn test_no_variation_gives_nominal_durations() {
        let beats = BeatAnalysis::constant(120.0, 120, 0.5);
        let slots = build_timeline(&beats, 2, 0.0, &mut rng()).unwrap();
        assert_eq!(slots.len(), 60);
        assert!(slots.iter().all(|s| (s.duration - 1.0).abs() < 1e-9));
        // last slot has no closing beat and falls back to the mean interval
        assert_eq!(slots.last().unwrap().beat_index, 118);
    }

    #[test]
    fn test_jitter_stays_within_fraction() {
        let beats = BeatAnalysis::constant(120.0, 40, 0.5);
        let slots = build_timeline(&beats, 2, 0.1, &mut rng()).unwrap();
        assert!(slots.iter().all(|s| (0.9 - 1e-9..=1.1 + 1e-9).contains(&s.duration)));
    }

    #[test]
    fn test_edge_cases() {
        let empty = BeatAnalysis::new(0.0, Vec::new());
        assert!(build_timeline(&empty, 1, 0.1, &mut rng()).unwrap().is_empty());

        let single = BeatAnalysis::new(60.0, vec![2.5]);
        let slots = build_timeline(&single, 4, 0.5, &mut rng()).unwrap();
        assert_eq!(slots, vec![TimelineSlot::new(2.5, SINGLE_BEAT_DURATION, 0)]);

        let short = BeatAnalysis::constant(120.0, 3, 0.5);
        assert!(build_timeline(&short, 4, 0.1, &mut rng()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_configuration() {
        let beats = BeatAnalysis::constant(120.0, 8, 0.5);
        assert!(matches!(
            build_timeline(&beats, 0, 0.1, &mut rng()),
            Err(PlanError::InvalidBeatsPerClip(0))
        ));
        assert!(matches!(
            build_timeline(&beats, 1, 1.0, &mut rng()),
            Err(PlanError::InvalidDurationVariation(_))
        ));
        assert!(build_timeline(&beats, 1, -0.1, &mut rng()).is_err());
    }

    #[test]
    fn test_same_seed_same_timeline() {
        let beats = BeatAnalysis::constant(120.0, 64, 0.5);
        let a = build_timeline(&beats, 2, 0.3, &mut SelectionRng::seeded(5)).unwrap();
        let b = build_timeline(&beats, 2, 0.3, &mut SelectionRng::seeded(5)).unwrap();
        assert_eq!(a, b);
    }
}
