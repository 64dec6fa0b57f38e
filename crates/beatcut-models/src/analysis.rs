//! Audio analysis results consumed by the planner.
//!
//! Beat tracking and section detection happen outside this workspace; these
//! types describe the fixed data shape the analyzer hands back.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Beat tracking output for one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BeatAnalysis {
    /// Tempo in beats per minute
    #[serde(alias = "bpm")]
    pub tempo: f64,
    /// Beat timestamps in seconds, non-decreasing
    pub beats: Vec<f64>,
    /// Bar boundaries, when the analyzer could detect them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downbeats: Option<Vec<f64>>,
}

impl BeatAnalysis {
    /// Create an analysis without downbeats.
    pub fn new(tempo: f64, beats: Vec<f64>) -> Self {
        Self {
            tempo,
            beats,
            downbeats: None,
        }
    }

    /// Evenly spaced beats, useful for fixtures and click tracks.
    pub fn constant(tempo: f64, count: usize, interval: f64) -> Self {
        let beats = (0..count).map(|i| i as f64 * interval).collect();
        Self::new(tempo, beats)
    }

    /// Number of detected beats.
    pub fn len(&self) -> usize {
        self.beats.len()
    }

    /// Whether no beat was detected.
    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Mean spacing between consecutive beats over the whole track.
    ///
    /// Returns 0.0 for fewer than two beats.
    pub fn mean_interval(&self) -> f64 {
        match (self.beats.first(), self.beats.last()) {
            (Some(first), Some(last)) if self.beats.len() > 1 => {
                (last - first) / (self.beats.len() - 1) as f64
            }
            _ => 0.0,
        }
    }

    /// Check that timestamps are finite, non-negative and non-decreasing.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let mut previous = 0.0_f64;
        for (index, &beat) in self.beats.iter().enumerate() {
            if !beat.is_finite() || beat < 0.0 {
                return Err(AnalysisError::InvalidBeat { index, value: beat });
            }
            if index > 0 && beat < previous {
                return Err(AnalysisError::UnorderedBeats { index });
            }
            previous = beat;
        }
        Ok(())
    }
}

/// A labeled structural region of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// Musical role, e.g. "intro", "drop", "breakdown", "outro"
    #[serde(alias = "type")]
    pub label: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Section {
    pub fn new(label: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Whether `t` lies inside the section, bounds included.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Section detection output for one audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructureAnalysis {
    /// Sections ordered by start time
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Normalized RMS energy curve (0.0-1.0)
    #[serde(default)]
    pub energy: Vec<f64>,
    /// Total audio duration in seconds
    pub duration: f64,
}

impl StructureAnalysis {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(AnalysisError::InvalidDuration(self.duration));
        }
        for (index, section) in self.sections.iter().enumerate() {
            if !(section.start.is_finite() && section.end.is_finite()) || section.end < section.start {
                return Err(AnalysisError::InvalidSection {
                    index,
                    label: section.label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Combined analyzer output as exchanged with the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioAnalysis {
    pub rhythm: BeatAnalysis,
    pub structure: StructureAnalysis,
}

impl AudioAnalysis {
    /// Total audio duration reported by the structure analyzer.
    pub fn duration(&self) -> f64 {
        self.structure.duration
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.rhythm.validate()?;
        self.structure.validate()
    }
}

/// Structurally invalid analyzer output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("beat {index} has invalid timestamp {value}")]
    InvalidBeat { index: usize, value: f64 },

    #[error("beat {index} is earlier than the beat before it")]
    UnorderedBeats { index: usize },

    #[error("section {index} ({label}) has an invalid interval")]
    InvalidSection { index: usize, label: String },

    #[error("invalid audio duration: {0}")]
    InvalidDuration(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_interval() {
        let analysis = BeatAnalysis::constant(120.0, 5, 0.5);
        assert!((analysis.mean_interval() - 0.5).abs() < 1e-9);
        assert_eq!(BeatAnalysis::new(120.0, vec![1.0]).mean_interval(), 0.0);
        assert_eq!(BeatAnalysis::new(120.0, vec![]).mean_interval(), 0.0);
    }

    #[test]
    fn test_validate_rejects_unordered_beats() {
        let analysis = BeatAnalysis::new(100.0, vec![0.0, 1.0, 0.5]);
        assert_eq!(
            analysis.validate(),
            Err(AnalysisError::UnorderedBeats { index: 2 })
        );
        assert!(BeatAnalysis::new(100.0, vec![0.0, 0.0, 1.0]).validate().is_ok());
    }

    #[test]
    fn test_section_contains_is_inclusive() {
        let section = Section::new("drop", 10.0, 20.0);
        assert!(section.contains(10.0));
        assert!(section.contains(20.0));
        assert!(!section.contains(20.01));
    }

    #[test]
    fn test_deserialize_analyzer_output() {
        let json = r#"{
            "rhythm": {"bpm": 128.0, "beats": [0.0, 0.47, 0.94]},
            "structure": {
                "sections": [{"type": "intro", "start": 0.0, "end": 12.5}],
                "duration": 180.0
            }
        }"#;
        let analysis: AudioAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.rhythm.tempo, 128.0);
        assert_eq!(analysis.structure.sections[0].label, "intro");
        assert!(analysis.structure.energy.is_empty());
        assert!(analysis.validate().is_ok());
    }
}
