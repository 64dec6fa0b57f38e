//! Filter and ordering semantics shared by every catalog backend.
//!
//! Tags and entities are any-of: a clip passes when at least one requested
//! name is present at or above the threshold. A clip with no signal scores
//! fails every signal filter, and a clip with no year fails any year bound.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use beatcut_models::{ClipQuery, ClipRecord};

use crate::repository::CandidateOrder;
use crate::semantic::cosine_similarity;

/// Whether `record` satisfies every filter in `query`.
pub fn matches(query: &ClipQuery, record: &ClipRecord) -> bool {
    matches_scope(query, record)
        && matches_signals(query, record)
        && matches_named(&query.tags, query.min_tag_score, |name| record.tags.get(name))
        && matches_named(&query.entities, query.min_entity_confidence, |name| {
            record.entities.get(name)
        })
}

/// Source, year range and exclusion checks.
pub fn matches_scope(query: &ClipQuery, record: &ClipRecord) -> bool {
    if query.excludes(&record.clip_id) {
        return false;
    }
    if let Some(source) = &query.source {
        if &record.source != source {
            return false;
        }
    }
    if let Some(year_min) = query.year_min {
        if !record.year.is_some_and(|y| y >= year_min) {
            return false;
        }
    }
    if let Some(year_max) = query.year_max {
        if !record.year.is_some_and(|y| y <= year_max) {
            return false;
        }
    }
    true
}

fn matches_signals(query: &ClipQuery, record: &ClipRecord) -> bool {
    if !query.needs_signals() {
        return true;
    }
    let Some(signals) = record.signals else {
        return false;
    };
    query.min_motion.map_or(true, |min| signals.motion_score >= min)
        && query.max_motion.map_or(true, |max| signals.motion_score <= max)
        && query.max_silence.map_or(true, |max| signals.silence_ratio <= max)
        && query
            .min_brightness
            .map_or(true, |min| signals.brightness_entropy >= min)
}

fn matches_named<'a, F>(wanted: &[String], threshold: f64, score_of: F) -> bool
where
    F: Fn(&str) -> Option<&'a f64>,
{
    wanted.is_empty()
        || wanted
            .iter()
            .any(|name| score_of(name).is_some_and(|score| *score >= threshold))
}

/// Apply `order` then truncate to `limit`.
///
/// `records` must arrive in a stable order (insertion or primary key) so that
/// a given seed always produces the same shuffle.
pub fn order_candidates(mut records: Vec<ClipRecord>, order: CandidateOrder, limit: usize) -> Vec<ClipRecord> {
    match order {
        CandidateOrder::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            records.shuffle(&mut rng);
        }
        CandidateOrder::Newest => records.reverse(),
    }
    records.truncate(limit);
    records
}

/// Rank records by cosine similarity to `query_vector`, best first.
///
/// Records without an embedding are dropped. Ties break on clip id.
pub fn rank_by_similarity<'a, F>(
    records: Vec<ClipRecord>,
    query_vector: &[f32],
    embedding_of: F,
    limit: usize,
) -> Vec<ClipRecord>
where
    F: Fn(&ClipRecord) -> Option<&'a [f32]>,
{
    let mut scored: Vec<ClipRecord> = records
        .into_iter()
        .filter_map(|mut record| {
            let embedding = embedding_of(&record)?;
            record.similarity = Some(cosine_similarity(query_vector, embedding)?);
            Some(record)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.clip_id.cmp(&b.clip_id))
    });
    scored.truncate(limit);
    scored
}
