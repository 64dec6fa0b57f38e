//! In-memory catalog backed by a vector of records.

use std::collections::HashMap;
use std::sync::Arc;

use beatcut_models::{ClipId, ClipRecord};

use crate::error::{CatalogError, CatalogResult};
use crate::filter::{matches, order_candidates, rank_by_similarity};
use crate::repository::{CandidateRequest, ClipRepository};
use crate::semantic::TextEmbedder;

/// Catalog held entirely in memory.
///
/// Records keep insertion order, which is the base order the seeded shuffle
/// starts from; `Newest` treats the last inserted clip as the newest.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    records: Vec<ClipRecord>,
    embeddings: HashMap<ClipId, Vec<f32>>,
    embedder: Option<Arc<dyn TextEmbedder + Send + Sync>>,
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCatalog")
            .field("records", &self.records.len())
            .field("embeddings", &self.embeddings.len())
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ClipRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Attach the embedder used for semantic queries.
    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder + Send + Sync>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Add a record, replacing any record with the same id.
    pub fn insert(&mut self, record: ClipRecord) -> CatalogResult<()> {
        validate_record(&record)?;
        self.records.retain(|r| r.clip_id != record.clip_id);
        self.records.push(record);
        Ok(())
    }

    pub fn insert_embedding(&mut self, clip_id: ClipId, embedding: Vec<f32>) {
        self.embeddings.insert(clip_id, embedding);
    }

    pub fn records(&self) -> &[ClipRecord] {
        &self.records
    }

    fn query_vector(&self, request: &CandidateRequest) -> Option<Vec<f32>> {
        let text = request.query.semantic_text()?;
        match &self.embedder {
            Some(embedder) => {
                let vector = embedder.embed(text);
                if vector.is_none() {
                    tracing::debug!(text, "No embedding for semantic query, using filter order");
                }
                vector
            }
            None => {
                tracing::debug!(text, "Semantic query ignored: no embedder configured");
                None
            }
        }
    }
}

impl ClipRepository for InMemoryCatalog {
    fn query_clips(&self, request: &CandidateRequest) -> CatalogResult<Vec<ClipRecord>> {
        let filtered: Vec<ClipRecord> = self
            .records
            .iter()
            .filter(|record| matches(&request.query, record))
            .cloned()
            .collect();

        let candidates = match self.query_vector(request) {
            Some(vector) => rank_by_similarity(
                filtered,
                &vector,
                |record| self.embeddings.get(&record.clip_id).map(Vec::as_slice),
                request.limit,
            ),
            None => order_candidates(filtered, request.order, request.limit),
        };
        Ok(candidates)
    }

    fn clip_count(&self) -> CatalogResult<usize> {
        Ok(self.records.len())
    }
}

pub(crate) fn validate_record(record: &ClipRecord) -> CatalogResult<()> {
    if record.clip_id.as_str().trim().is_empty() {
        return Err(CatalogError::invalid_record("clip id is empty"));
    }
    if record.filepath.trim().is_empty() {
        return Err(CatalogError::invalid_record(format!(
            "clip {} has no filepath",
            record.clip_id
        )));
    }
    if !record.duration.is_finite() || record.duration < 0.0 {
        return Err(CatalogError::invalid_record(format!(
            "clip {} has invalid duration {}",
            record.clip_id, record.duration
        )));
    }
    Ok(())
}
