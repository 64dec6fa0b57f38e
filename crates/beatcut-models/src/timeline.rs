//! Timeline slot model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time interval in the output montage awaiting a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSlot {
    /// Start time in the montage (seconds)
    pub start: f64,
    /// Slot duration after jitter (seconds)
    pub duration: f64,
    /// Index of the first beat of the originating beat group
    pub beat_index: usize,
}

impl TimelineSlot {
    pub fn new(start: f64, duration: f64, beat_index: usize) -> Self {
        Self {
            start,
            duration,
            beat_index,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Point used to decide which section a slot belongs to.
    pub fn midpoint(&self) -> f64 {
        self.start + self.duration / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        let slot = TimelineSlot::new(4.0, 1.0, 8);
        assert!((slot.midpoint() - 4.5).abs() < f64::EPSILON);
        assert!((slot.end() - 5.0).abs() < f64::EPSILON);
    }
}
