//! Slot to musical section assignment.

use beatcut_models::{Section, TimelineSlot};

/// Section covering the slot midpoint. Bounds are inclusive and the first
/// matching section in the given order wins.
pub fn section_at<'a>(slot: &TimelineSlot, sections: &'a [Section]) -> Option<&'a Section> {
    let mid = slot.midpoint();
    sections.iter().find(|section| section.contains(mid))
}

/// Label every slot, preserving timeline order. Unmapped slots get `None`.
pub fn map_sections(slots: &[TimelineSlot], sections: &[Section]) -> Vec<(TimelineSlot, Option<String>)> {
    slots
        .iter()
        .map(|slot| (*slot, section_at(slot, sections).map(|s| s.label.clone())))
        .collect()
}
