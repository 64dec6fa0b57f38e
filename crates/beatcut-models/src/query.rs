//! Declarative clip selection queries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::clip::ClipId;

/// Default minimum tag similarity when a style does not set one.
pub const DEFAULT_MIN_TAG_SCORE: f64 = 0.3;
/// Default minimum entity confidence when a style does not set one.
pub const DEFAULT_MIN_ENTITY_CONFIDENCE: f64 = 0.3;

/// Filter predicates over catalog clip attributes.
///
/// An unset (`None` / empty) field leaves that dimension unconstrained; it is
/// never read as a zero bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipQuery {
    /// Clip must carry at least one of these tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Clip must carry at least one of these entities
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
    pub min_tag_score: f64,
    pub min_entity_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_motion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_motion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_silence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_brightness: Option<f64>,
    /// Free-text description ranked by embedding similarity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exclude_clip_ids: BTreeSet<ClipId>,
}

impl Default for ClipQuery {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            entities: Vec::new(),
            min_tag_score: DEFAULT_MIN_TAG_SCORE,
            min_entity_confidence: DEFAULT_MIN_ENTITY_CONFIDENCE,
            min_motion: None,
            max_motion: None,
            max_silence: None,
            min_brightness: None,
            semantic_query: None,
            year_min: None,
            year_max: None,
            source: None,
            exclude_clip_ids: BTreeSet::new(),
        }
    }
}

impl ClipQuery {
    /// A query that matches every clip.
    pub fn any() -> Self {
        Self::default()
    }

    /// Copy of this query that additionally excludes `ids`.
    pub fn excluding<'a, I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a ClipId>,
    {
        let mut query = self.clone();
        query.exclude_clip_ids.extend(ids.into_iter().cloned());
        query
    }

    /// Degraded query that keeps only coarse scope filters (source, year range).
    ///
    /// Tags, entities, signal ranges, semantic text and exclusions are dropped.
    pub fn relaxed(&self) -> Self {
        Self {
            min_tag_score: 0.0,
            min_entity_confidence: 0.0,
            year_min: self.year_min,
            year_max: self.year_max,
            source: self.source.clone(),
            ..Self::default()
        }
    }

    /// Whether any signal range filter is set.
    pub fn needs_signals(&self) -> bool {
        self.min_motion.is_some()
            || self.max_motion.is_some()
            || self.max_silence.is_some()
            || self.min_brightness.is_some()
    }

    /// Semantic text, ignoring blank strings.
    pub fn semantic_text(&self) -> Option<&str> {
        self.semantic_query
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn excludes(&self, id: &ClipId) -> bool {
        self.exclude_clip_ids.contains(id)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_years(mut self, year_min: Option<i32>, year_max: Option<i32>) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxed_keeps_only_scope() {
        let query = ClipQuery::any()
            .with_tags(["surveillance"])
            .with_source("archive")
            .with_years(Some(1980), Some(1999));
        let query = ClipQuery {
            max_motion: Some(0.3),
            semantic_query: Some("grainy cctv".to_string()),
            ..query
        }
        .excluding([&ClipId::from_string("a")]);

        let relaxed = query.relaxed();
        assert!(relaxed.tags.is_empty());
        assert!(relaxed.max_motion.is_none());
        assert!(relaxed.semantic_query.is_none());
        assert!(relaxed.exclude_clip_ids.is_empty());
        assert_eq!(relaxed.source.as_deref(), Some("archive"));
        assert_eq!(relaxed.year_min, Some(1980));
        assert_eq!(relaxed.year_max, Some(1999));
        assert_eq!(relaxed.min_tag_score, 0.0);
    }

    #[test]
    fn test_excluding_does_not_mutate_original() {
        let query = ClipQuery::any();
        let excluded = query.excluding([&ClipId::from_string("a"), &ClipId::from_string("b")]);
        assert!(query.exclude_clip_ids.is_empty());
        assert_eq!(excluded.exclude_clip_ids.len(), 2);
    }

    #[test]
    fn test_semantic_text_ignores_blank() {
        let query = ClipQuery {
            semantic_query: Some("   ".to_string()),
            ..ClipQuery::any()
        };
        assert!(query.semantic_text().is_none());
    }

    #[test]
    fn test_unset_filters_are_not_serialized() {
        let json = serde_json::to_value(ClipQuery::any()).unwrap();
        assert!(json.get("max_motion").is_none());
        assert!(json.get("tags").is_none());
    }
}
