//! Section label to clip query resolution.

use beatcut_models::{ClipQuery, SelectionThresholds, StyleDescriptor, StyleTable};

use crate::error::PlanResult;

/// Resolves section labels against a validated style table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleResolver {
    table: StyleTable,
    thresholds: SelectionThresholds,
}

impl StyleResolver {
    /// Validates the table and the global thresholds.
    pub fn new(table: StyleTable, thresholds: SelectionThresholds) -> PlanResult<Self> {
        table.validate()?;
        thresholds.validate()?;
        Ok(Self { table, thresholds })
    }

    /// Resolver over the built-in table with default thresholds.
    pub fn builtin() -> Self {
        Self {
            table: StyleTable::builtin(),
            thresholds: SelectionThresholds::default(),
        }
    }

    pub fn table(&self) -> &StyleTable {
        &self.table
    }

    pub fn thresholds(&self) -> SelectionThresholds {
        self.thresholds
    }

    /// Query for a section label. Unknown or missing labels yield an
    /// unconstrained query with the global thresholds.
    pub fn resolve(&self, label: Option<&str>) -> ClipQuery {
        let empty = StyleDescriptor::default();
        let descriptor = label.and_then(|l| self.table.get(l)).unwrap_or(&empty);

        ClipQuery {
            tags: descriptor.tags.clone().unwrap_or_default(),
            entities: descriptor.entities.clone().unwrap_or_default(),
            min_tag_score: descriptor
                .min_tag_score
                .unwrap_or(self.thresholds.min_tag_score),
            min_entity_confidence: descriptor
                .min_entity_confidence
                .unwrap_or(self.thresholds.min_entity_confidence),
            min_motion: descriptor.min_motion,
            max_motion: descriptor.max_motion,
            max_silence: descriptor.max_silence,
            min_brightness: descriptor.min_brightness,
            semantic_query: descriptor
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            ..ClipQuery::default()
        }
    }
}
