//! Repository abstraction queried by the clip selector.

use beatcut_models::{ClipQuery, ClipRecord};

use crate::error::CatalogResult;

/// Ordering of the returned candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrder {
    /// Shuffled with a generator seeded from `seed`, so callers holding a
    /// seeded RNG get reproducible candidate lists.
    Random { seed: u64 },
    /// Most recently indexed first.
    Newest,
}

/// One candidate lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRequest {
    pub query: ClipQuery,
    /// Maximum number of records to return
    pub limit: usize,
    /// Ignored when the query is ranked semantically
    pub order: CandidateOrder,
}

impl CandidateRequest {
    pub fn random(query: ClipQuery, limit: usize, seed: u64) -> Self {
        Self {
            query,
            limit,
            order: CandidateOrder::Random { seed },
        }
    }

    pub fn newest(query: ClipQuery, limit: usize) -> Self {
        Self {
            query,
            limit,
            order: CandidateOrder::Newest,
        }
    }
}

/// A queryable store of tagged clips.
///
/// Calls are synchronous and may block on disk I/O.
pub trait ClipRepository {
    /// Clips matching every filter of `request.query`, at most `request.limit`.
    fn query_clips(&self, request: &CandidateRequest) -> CatalogResult<Vec<ClipRecord>>;

    /// Total number of clips in the store.
    fn clip_count(&self) -> CatalogResult<usize>;
}

impl<T: ClipRepository + ?Sized> ClipRepository for &T {
    fn query_clips(&self, request: &CandidateRequest) -> CatalogResult<Vec<ClipRecord>> {
        (**self).query_clips(request)
    }

    fn clip_count(&self) -> CatalogResult<usize> {
        (**self).clip_count()
    }
}

impl<T: ClipRepository + ?Sized> ClipRepository for Box<T> {
    fn query_clips(&self, request: &CandidateRequest) -> CatalogResult<Vec<ClipRecord>> {
        (**self).query_clips(request)
    }

    fn clip_count(&self) -> CatalogResult<usize> {
        (**self).clip_count()
    }
}
