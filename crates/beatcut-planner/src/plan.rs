//! Montage planning: timeline, sections and styles composed.

use std::collections::BTreeSet;

use beatcut_models::{AudioAnalysis, MontageSlot, Section, TimelineSlot};

use crate::error::{PlanError, PlanResult};
use crate::rng::SelectionRng;
use crate::sections::map_sections;
use crate::style::StyleResolver;
use crate::timeline::TimelineBuilder;

/// Emits one [`MontageSlot`] per timeline slot, in order.
#[derive(Debug, Clone)]
pub struct MontagePlanner {
    timeline: TimelineBuilder,
    styles: StyleResolver,
}

impl MontagePlanner {
    pub fn new(timeline: TimelineBuilder, styles: StyleResolver) -> Self {
        Self { timeline, styles }
    }

    pub fn styles(&self) -> &StyleResolver {
        &self.styles
    }

    /// Build the plan for an analyzed track.
    ///
    /// Fails when the analysis is malformed or yields no slot at all.
    pub fn create_plan(&self, analysis: &AudioAnalysis, rng: &mut SelectionRng) -> PlanResult<Vec<MontageSlot>> {
        analysis.validate()?;

        let slots = self.timeline.build(&analysis.rhythm, rng);
        if slots.is_empty() {
            return Err(PlanError::EmptyTimeline {
                beats: analysis.rhythm.len(),
                beats_per_clip: self.timeline.beats_per_clip(),
            });
        }

        let plan = self.plan_slots(&slots, &analysis.structure.sections);
        tracing::debug!(
            slots = plan.len(),
            mapped = plan.iter().filter(|s| s.section_type.is_some()).count(),
            "Montage plan created"
        );
        Ok(plan)
    }

    /// Attach section labels and resolved queries to existing slots.
    pub fn plan_slots(&self, slots: &[TimelineSlot], sections: &[Section]) -> Vec<MontageSlot> {
        map_sections(slots, sections)
            .into_iter()
            .map(|(timeline_slot, section_type)| MontageSlot {
                timeline_slot,
                query: self.styles.resolve(section_type.as_deref()),
                section_type,
            })
            .collect()
    }
}

/// Every distinct semantic query text in the plan, sorted.
pub fn distinct_semantic_queries(plan: &[MontageSlot]) -> Vec<String> {
    plan.iter()
        .filter_map(|slot| slot.query.semantic_text())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatcut_models::{BeatAnalysis, StructureAnalysis, StyleDescriptor, StyleTable, SelectionThresholds};

    fn analysis(beats: usize) -> AudioAnalysis {
        AudioAnalysis {
            rhythm: BeatAnalysis::constant(120.0, beats, 0.5),
            structure: StructureAnalysis {
                sections: vec![Section::new("intro", 0.0, 10.0), Section::new("drop", 10.0, 60.0)],
                energy: Vec::new(),
                duration: beats as f64 * 0.5,
            },
        }
    }

    fn planner(beats_per_clip: usize) -> MontagePlanner {
        MontagePlanner::new(
            TimelineBuilder::new(beats_per_clip, 0.1).unwrap(),
            StyleResolver::builtin(),
        )
    }

    #[test]
    fn test_plan_has_one_entry_per_slot() {
        let plan = planner(2)
            .create_plan(&analysis(120), &mut SelectionRng::seeded(1))
            .unwrap();
        assert_eq!(plan.len(), 60);
        assert_eq!(plan[0].section_type.as_deref(), Some("intro"));
        assert_eq!(plan[0].query.max_motion, Some(0.3));
        assert_eq!(plan[59].section_type.as_deref(), Some("drop"));
        assert_eq!(plan[59].query.min_motion, Some(0.6));
        for pair in plan.windows(2) {
            assert!(pair[0].timeline_slot.start <= pair[1].timeline_slot.start);
        }
    }

    #[test]
    fn test_plan_slots_keeps_analyzer_label_and_matches_style() {
        let slots = [TimelineSlot::new(0.0, 1.0, 0), TimelineSlot::new(20.0, 1.0, 1)];
        let sections = [Section::new("Drop", 0.0, 10.0)];
        let plan = planner(1).plan_slots(&slots, &sections);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].section_type.as_deref(), Some("Drop"));
        assert_eq!(plan[0].query.min_motion, Some(0.6));
        assert_eq!(plan[1].timeline_slot, slots[1]);
        assert!(plan[1].section_type.is_none());
        assert!(plan[1].query.min_motion.is_none());
    }

    #[test]
    fn test_empty_timeline_is_an_error() {
        let err = planner(4)
            .create_plan(&analysis(3), &mut SelectionRng::seeded(1))
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::EmptyTimeline {
                beats: 3,
                beats_per_clip: 4
            }
        ));
    }

    #[test]
    fn test_malformed_analysis_is_rejected() {
        let mut bad = analysis(8);
        bad.rhythm.beats[3] = f64::NAN;
        let err = planner(1)
            .create_plan(&bad, &mut SelectionRng::seeded(1))
            .unwrap_err();
        assert!(matches!(err, PlanError::Analysis(_)));
    }

    #[test]
    fn test_distinct_semantic_queries() {
        let mut table = StyleTable::new();
        table.insert("intro", StyleDescriptor::default().with_description("candle light"));
        table.insert("drop", StyleDescriptor::default().with_description("police chase"));
        let planner = MontagePlanner::new(
            TimelineBuilder::new(1, 0.0).unwrap(),
            StyleResolver::new(table, SelectionThresholds::default()).unwrap(),
        );
        let plan = planner
            .create_plan(&analysis(40), &mut SelectionRng::seeded(1))
            .unwrap();
        assert_eq!(
            distinct_semantic_queries(&plan),
            vec!["candle light".to_string(), "police chase".to_string()]
        );
    }
}
