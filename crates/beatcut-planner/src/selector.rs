//! Clip selection against a content repository.
//!
//! Per slot the selector queries the repository, relaxes the query when
//! nothing matches, prefers clips long enough to fill the slot, then picks one
//! at random and trims it to the slot duration. Across a montage it tracks the
//! clips already used so they are not repeated while alternatives exist.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use beatcut_catalog::{CandidateRequest, ClipRepository, DataLayout};
use beatcut_models::{ClipId, ClipQuery, ClipRecord, MontageSlot, SelectedClip};

use crate::error::PlanResult;
use crate::rng::SelectionRng;

/// Candidates requested for the primary query.
pub const CANDIDATE_LIMIT: usize = 100;
/// Candidates requested for the relaxed query.
pub const RELAXED_CANDIDATE_LIMIT: usize = 200;
/// Pool size used when no candidate is long enough for the slot.
pub const SHORT_CANDIDATE_POOL: usize = 50;

/// What to do when the chosen clip's file is missing on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFilePolicy {
    /// The slot ends without a clip.
    #[default]
    GiveUp,
    /// Try the rest of the preferred pool, then the remaining candidates.
    NextCandidate,
}

/// Counters describing one montage selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub slots: usize,
    /// Slots filled by the primary query
    pub primary_hits: usize,
    /// Slots filled only after relaxing the query
    pub relaxed_hits: usize,
    /// Slots that were retried with repetition allowed
    pub repetition_retries: usize,
    /// Slots left without a clip
    pub misses: usize,
    /// Chosen clips whose file could not be found
    pub missing_files: usize,
}

impl SelectionSummary {
    pub fn hits(&self) -> usize {
        self.primary_hits + self.relaxed_hits
    }
}

/// Result of selecting clips for a whole montage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MontageSelection {
    /// One entry per plan slot, in plan order
    pub clips: Vec<Option<SelectedClip>>,
    pub summary: SelectionSummary,
}

impl MontageSelection {
    pub fn all_missed(&self) -> bool {
        self.clips.iter().all(Option::is_none)
    }
}

struct SlotPick {
    clip: Option<SelectedClip>,
    relaxed: bool,
    missing_files: usize,
}

/// Picks and trims clips for montage slots.
#[derive(Debug, Clone)]
pub struct ClipSelector<R> {
    repository: R,
    layout: DataLayout,
    missing_file_policy: MissingFilePolicy,
}

impl<R: ClipRepository> ClipSelector<R> {
    pub fn new(repository: R, layout: DataLayout) -> Self {
        Self {
            repository,
            layout,
            missing_file_policy: MissingFilePolicy::default(),
        }
    }

    pub fn with_missing_file_policy(mut self, policy: MissingFilePolicy) -> Self {
        self.missing_file_policy = policy;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Select one clip for a slot of `target_duration` seconds.
    ///
    /// `Ok(None)` means nothing suitable was found; repository failures are
    /// returned as errors.
    pub fn select_for_slot(
        &self,
        query: &ClipQuery,
        target_duration: f64,
        excluded: &BTreeSet<ClipId>,
        rng: &mut SelectionRng,
    ) -> PlanResult<Option<SelectedClip>> {
        Ok(self.pick(query, target_duration, excluded, rng)?.clip)
    }

    /// Select clips for every slot, in order.
    ///
    /// With `avoid_repetition`, clips already used are excluded; a slot that
    /// finds nothing is retried once with repetition allowed.
    pub fn select_for_montage(
        &self,
        slots: &[MontageSlot],
        avoid_repetition: bool,
        rng: &mut SelectionRng,
    ) -> PlanResult<MontageSelection> {
        let no_exclusions = BTreeSet::new();
        let mut used: BTreeSet<ClipId> = BTreeSet::new();
        let mut summary = SelectionSummary {
            slots: slots.len(),
            ..SelectionSummary::default()
        };
        let mut clips = Vec::with_capacity(slots.len());

        for (index, slot) in slots.iter().enumerate() {
            let target = slot.target_duration();
            let excluded = if avoid_repetition { &used } else { &no_exclusions };
            let mut pick = self.pick(&slot.query, target, excluded, rng)?;

            if pick.clip.is_none() && avoid_repetition && !used.is_empty() {
                debug!(slot = index, used = used.len(), "Retrying slot with repetition allowed");
                summary.repetition_retries += 1;
                summary.missing_files += pick.missing_files;
                pick = self.pick(&slot.query, target, &no_exclusions, rng)?;
            }
            summary.missing_files += pick.missing_files;

            match &pick.clip {
                Some(clip) => {
                    if pick.relaxed {
                        summary.relaxed_hits += 1;
                    } else {
                        summary.primary_hits += 1;
                    }
                    if avoid_repetition {
                        used.insert(clip.clip_id.clone());
                    }
                }
                None => {
                    summary.misses += 1;
                    warn!(
                        slot = index,
                        section = slot.section_type.as_deref().unwrap_or("-"),
                        target_duration = target,
                        "No clip found for slot"
                    );
                }
            }
            clips.push(pick.clip);
        }

        Ok(MontageSelection { clips, summary })
    }

    fn pick(
        &self,
        query: &ClipQuery,
        target_duration: f64,
        excluded: &BTreeSet<ClipId>,
        rng: &mut SelectionRng,
    ) -> PlanResult<SlotPick> {
        let request = CandidateRequest::random(query.excluding(excluded), CANDIDATE_LIMIT, rng.next_seed());
        let mut candidates = self.repository.query_clips(&request)?;
        let mut relaxed = false;

        if candidates.is_empty() {
            debug!(target_duration, "No candidates for query, relaxing filters");
            let request = CandidateRequest::random(query.relaxed(), RELAXED_CANDIDATE_LIMIT, rng.next_seed());
            candidates = self.repository.query_clips(&request)?;
            relaxed = true;
        }

        if candidates.is_empty() {
            return Ok(SlotPick {
                clip: None,
                relaxed,
                missing_files: 0,
            });
        }

        let (mut pool, mut rest): (Vec<ClipRecord>, Vec<ClipRecord>) = candidates
            .into_iter()
            .partition(|c| c.duration >= target_duration);
        if pool.is_empty() {
            let split = rest.len().min(SHORT_CANDIDATE_POOL);
            pool = rest.drain(..split).collect();
        }

        let mut missing_files = 0;
        for mut group in [pool, rest] {
            while let Some(index) = rng.index(group.len()) {
                let record = group.swap_remove(index);
                let (trim_start, trim_duration) = trim_window(record.duration, target_duration, rng);

                match self.layout.resolve(&record.filepath) {
                    Some(path) => {
                        let clip = SelectedClip {
                            clip_id: record.clip_id,
                            filepath: path.to_string_lossy().into_owned(),
                            duration: record.duration,
                            source: record.source,
                            year: record.year,
                            start_time: record.start_time,
                            end_time: record.end_time,
                            trim_start,
                            trim_duration,
                        };
                        return Ok(SlotPick {
                            clip: Some(clip),
                            relaxed,
                            missing_files,
                        });
                    }
                    None => {
                        missing_files += 1;
                        warn!(
                            clip_id = %record.clip_id,
                            filepath = %record.filepath,
                            "Clip file missing on disk"
                        );
                        if self.missing_file_policy == MissingFilePolicy::GiveUp {
                            return Ok(SlotPick {
                                clip: None,
                                relaxed,
                                missing_files,
                            });
                        }
                    }
                }
            }
        }

        Ok(SlotPick {
            clip: None,
            relaxed,
            missing_files,
        })
    }
}

/// Trim window for a clip of `duration` filling `target` seconds.
fn trim_window(duration: f64, target: f64, rng: &mut SelectionRng) -> (f64, f64) {
    if duration > target {
        (rng.uniform(0.0, duration - target), target)
    } else {
        (0.0, duration)
    }
}
