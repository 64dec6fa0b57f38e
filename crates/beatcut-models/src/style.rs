//! Style table: which clips suit which musical section.
//!
//! Every descriptor field is optional. An unset field means "no filter on that
//! dimension"; the resolver must never read it as a zero bound.
//!
//! Section labels are matched case-insensitively: the table stores them
//! trimmed and lowercased, and lookups normalize the same way.

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::query::{DEFAULT_MIN_ENTITY_CONFIDENCE, DEFAULT_MIN_TAG_SCORE};

/// Clip-selection constraints attached to one section label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StyleDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    /// Free-text description used for semantic ranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_motion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_motion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_silence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_brightness: Option<f64>,
    /// Overrides the global tag threshold for this section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tag_score: Option<f64>,
    /// Overrides the global entity threshold for this section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_entity_confidence: Option<f64>,
}

impl StyleDescriptor {
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(&self, label: &str) -> Result<(), StyleError> {
        let bounded = [
            ("min_motion", self.min_motion),
            ("max_motion", self.max_motion),
            ("max_silence", self.max_silence),
            ("min_brightness", self.min_brightness),
            ("min_tag_score", self.min_tag_score),
            ("min_entity_confidence", self.min_entity_confidence),
        ];
        for (field, value) in bounded {
            if let Some(value) = value {
                check_unit_range(label, field, value)?;
            }
        }

        if let (Some(min), Some(max)) = (self.min_motion, self.max_motion) {
            if min > max {
                return Err(StyleError::InvertedRange {
                    label: label.to_string(),
                    min,
                    max,
                });
            }
        }

        let blank_tag = self.tags.iter().flatten().any(|t| t.trim().is_empty());
        let blank_entity = self.entities.iter().flatten().any(|e| e.trim().is_empty());
        if blank_tag || blank_entity {
            return Err(StyleError::BlankName {
                label: label.to_string(),
            });
        }

        Ok(())
    }
}

/// Section label to style descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct StyleTable(BTreeMap<String, StyleDescriptor>);

/// Canonical form of a section label.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

impl<'de> Deserialize<'de> for StyleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, StyleDescriptor>::deserialize(deserializer)?;
        let mut table = Self::new();
        for (label, descriptor) in raw {
            let key = normalize_label(&label);
            if table.0.insert(key.clone(), descriptor).is_some() {
                return Err(de::Error::custom(format!("duplicate style label '{key}'")));
            }
        }
        Ok(table)
    }
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table used when the configuration carries no style section.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "intro",
            StyleDescriptor {
                max_motion: Some(0.3),
                max_silence: Some(0.8),
                ..Default::default()
            }
            .with_tags(["religious", "low motion"]),
        );
        table.insert(
            "drop",
            StyleDescriptor {
                min_motion: Some(0.6),
                ..Default::default()
            }
            .with_tags(["night vision", "authority"]),
        );
        table.insert(
            "breakdown",
            StyleDescriptor {
                max_silence: Some(0.5),
                ..Default::default()
            }
            .with_tags(["surveillance"]),
        );
        table.insert(
            "outro",
            StyleDescriptor {
                max_motion: Some(0.4),
                ..Default::default()
            }
            .with_tags(["low motion"]),
        );
        table
    }

    pub fn insert(&mut self, label: impl AsRef<str>, descriptor: StyleDescriptor) {
        self.0.insert(normalize_label(label.as_ref()), descriptor);
    }

    pub fn get(&self, label: &str) -> Option<&StyleDescriptor> {
        self.0.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Check every descriptor for out-of-range or contradictory bounds.
    pub fn validate(&self) -> Result<(), StyleError> {
        for (label, descriptor) in &self.0 {
            if label.trim().is_empty() {
                return Err(StyleError::BlankLabel);
            }
            descriptor.validate(label)?;
        }
        Ok(())
    }
}

/// Global fallbacks for the two confidence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionThresholds {
    pub min_tag_score: f64,
    pub min_entity_confidence: f64,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            min_tag_score: DEFAULT_MIN_TAG_SCORE,
            min_entity_confidence: DEFAULT_MIN_ENTITY_CONFIDENCE,
        }
    }
}

impl SelectionThresholds {
    pub fn validate(&self) -> Result<(), StyleError> {
        check_unit_range("<global>", "min_tag_score", self.min_tag_score)?;
        check_unit_range("<global>", "min_entity_confidence", self.min_entity_confidence)
    }
}

fn check_unit_range(label: &str, field: &'static str, value: f64) -> Result<(), StyleError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(StyleError::OutOfRange {
            label: label.to_string(),
            field,
            value,
        })
    }
}

/// Malformed style configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("style '{label}': {field} = {value} is outside [0, 1]")]
    OutOfRange {
        label: String,
        field: &'static str,
        value: f64,
    },

    #[error("style '{label}': min_motion {min} exceeds max_motion {max}")]
    InvertedRange { label: String, min: f64, max: f64 },

    #[error("style '{label}': tag and entity names must not be blank")]
    BlankName { label: String },

    #[error("style table contains a blank section label")]
    BlankLabel,
}
