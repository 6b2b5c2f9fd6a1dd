//! Vertical extend/shrink: growing a key into the row above or below,
//! and taking such a member away again.
//!
//! Both tools mutate only at commit; the drag just picks the end of the
//! key being worked on (and, for extend, previews the prospective
//! member). Cancel before commit therefore has nothing to undo.

use super::PointerEvent;
use crate::arena::SegmentId;
use crate::layout::{Align, Hit, Layout, Rect, SegmentKind};
use crate::units::{DEFAULT_ROW_HEIGHT, UNIT_EPSILON};

/// Which end of the key a vertical tool works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum End {
    Top,
    Bottom,
}

/// Grow a multirow ring by one member.
#[derive(Debug)]
pub(crate) struct ExtendState {
    parent: SegmentId,
    target: Option<End>,
}

impl ExtendState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        Some(Self {
            parent: layout.ring_parent(segment),
            target: None,
        })
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        self.target = self.classify(layout, event.y);
    }

    /// A drag above the key extends at the top, below it at the bottom;
    /// anywhere inside the key keeps the tool idle.
    fn classify(&self, layout: &Layout, y: f64) -> Option<End> {
        let members = layout.ring_members(self.parent);
        let (first_row, _) = layout.position_of(self.parent)?;
        let (last_row, _) = layout.position_of(*members.last().expect("ring has members"))?;
        let top = layout.row_top(first_row);
        let bottom = layout.row_top(last_row) + layout.row_at(last_row).height;
        if y < top {
            Some(End::Top)
        } else if y >= bottom {
            Some(End::Bottom)
        } else {
            None
        }
    }

    pub(crate) fn commit(&self, layout: &mut Layout) {
        match self.target {
            None => {}
            Some(End::Bottom) => self.extend_bottom(layout),
            Some(End::Top) => self.extend_top(layout),
        }
    }

    fn extend_bottom(&self, layout: &mut Layout) {
        let members = layout.ring_members(self.parent);
        let last = *members.last().expect("ring has members");
        let (last_row, last_idx) = layout
            .position_of(last)
            .expect("ring member not in any row");
        let left = layout
            .segment_rect(last)
            .map_or(0.0, |rect| rect.x);

        let target_row = last_row + 1;
        if target_row == layout.row_count() {
            layout.push_row(DEFAULT_ROW_HEIGHT);
        }
        let row_id = layout.row_ids()[target_row];
        let at = insertion_index(layout, target_row, left, last_row, last_idx);
        let new_member = layout.insert_key(row_id, at, 0, 0.0, 0.0);
        layout.seg_mut(new_member).kind = SegmentKind::Member;
        layout.ring_insert_after(last, new_member);
        layout.recompute_glue();
    }

    /// Extending upward hands the parent role to the new top member so
    /// ring order stays row order.
    fn extend_top(&self, layout: &mut Layout) {
        let members = layout.ring_members(self.parent);
        let last = *members.last().expect("ring has members");
        let (first_row, first_idx) = layout
            .position_of(self.parent)
            .expect("parent not in any row");
        let left = layout
            .segment_rect(self.parent)
            .map_or(0.0, |rect| rect.x);

        let target_row = if first_row == 0 {
            layout.insert_row(0, DEFAULT_ROW_HEIGHT);
            0
        } else {
            first_row - 1
        };
        let row_id = layout.row_ids()[target_row];
        let at = insertion_index(layout, target_row, left, first_row + usize::from(first_row == 0), first_idx);

        let (keycode, width, user_glue, kind) = {
            let old = layout.seg(self.parent);
            (old.keycode, old.width, old.user_glue, old.kind)
        };
        let new_parent = layout.insert_key(row_id, at, 0, width, user_glue);
        layout.seg_mut(new_parent).kind = match kind {
            SegmentKind::Pressed => SegmentKind::Pressed,
            _ => SegmentKind::Default,
        };
        layout.seg_mut(new_parent).keycode = keycode;
        {
            let old = layout.seg_mut(self.parent);
            old.kind = SegmentKind::Member;
            old.width = 0.0;
            old.user_glue = 0.0;
            old.keycode = 0;
        }
        layout.ring_insert_after(last, new_parent);
        layout.reindex_parent(keycode, new_parent);
        layout.recompute_glue();
    }

    pub(crate) fn cancel(&self) {
        // Nothing mutated before commit.
    }

    pub(crate) fn grab(&self) -> SegmentId {
        self.parent
    }

    /// Ghost rectangle of the prospective member.
    pub(crate) fn preview(&self, layout: &Layout) -> Option<Rect> {
        let end = self.target?;
        let members = layout.ring_members(self.parent);
        let (edge_member, row_index) = match end {
            End::Top => {
                let (row, _) = layout.position_of(self.parent)?;
                (self.parent, row)
            }
            End::Bottom => {
                let last = *members.last().expect("ring has members");
                let (row, _) = layout.position_of(last)?;
                (last, row)
            }
        };
        let rect = layout.segment_rect(edge_member)?;
        let (y, height) = match end {
            End::Top => {
                let height = if row_index == 0 {
                    DEFAULT_ROW_HEIGHT
                } else {
                    layout.row_at(row_index - 1).height
                };
                (layout.row_top(row_index) - height, height)
            }
            End::Bottom => {
                let below = row_index + 1;
                let height = if below == layout.row_count() {
                    DEFAULT_ROW_HEIGHT
                } else {
                    layout.row_at(below).height
                };
                (layout.row_top(row_index) + layout.row_at(row_index).height, height)
            }
        };
        Some(Rect {
            x: rect.x,
            y,
            width: rect.width,
            height,
        })
    }
}

/// Remove the top or bottom member of a multirow ring.
#[derive(Debug)]
pub(crate) struct ShrinkState {
    parent: SegmentId,
    end: End,
}

impl ShrinkState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        let parent = layout.ring_parent(segment);
        if !layout.is_multirow(parent) {
            return None;
        }
        let mut state = Self {
            parent,
            end: End::Bottom,
        };
        state.end = state.classify(layout, event.y);
        Some(state)
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        self.end = self.classify(layout, event.y);
    }

    /// The end nearer the pointer is the one taken away.
    fn classify(&self, layout: &Layout, y: f64) -> End {
        let members = layout.ring_members(self.parent);
        let last = *members.last().expect("ring has members");
        let Some((first_row, _)) = layout.position_of(self.parent) else {
            return End::Bottom;
        };
        let Some((last_row, _)) = layout.position_of(last) else {
            return End::Bottom;
        };
        let top = layout.row_top(first_row);
        let bottom = layout.row_top(last_row) + layout.row_at(last_row).height;
        if y < (top + bottom) / 2.0 {
            End::Top
        } else {
            End::Bottom
        }
    }

    pub(crate) fn commit(&self, layout: &mut Layout) {
        match self.end {
            End::Bottom => self.shrink_bottom(layout),
            End::Top => self.shrink_top(layout),
        }
        layout.compact_rows();
        layout.recompute_glue();
    }

    fn shrink_bottom(&self, layout: &mut Layout) {
        let members = layout.ring_members(self.parent);
        let last = *members.last().expect("ring has members");
        let remaining_min = min_internal_glue(layout, &members[..members.len() - 1]);
        layout.ring_remove(last);
        layout.discard_segment(last);
        // The removed member may have been the supporting one; promoting
        // the surviving minimum into user glue keeps the key in place.
        layout.seg_mut(self.parent).user_glue += remaining_min;
    }

    fn shrink_top(&self, layout: &mut Layout) {
        let members = layout.ring_members(self.parent);
        let new_parent = members[1];
        let remaining_min = min_internal_glue(layout, &members[1..]);
        let (keycode, user_glue, kind) = {
            let old = layout.seg(self.parent);
            (old.keycode, old.user_glue, old.kind)
        };
        let width = layout.effective_width(new_parent);
        layout.ring_remove(self.parent);
        layout.discard_segment(self.parent);
        {
            let record = layout.seg_mut(new_parent);
            record.kind = match kind {
                SegmentKind::Pressed => SegmentKind::Pressed,
                _ => SegmentKind::Default,
            };
            record.align = Align::Left;
            record.width = width;
            record.keycode = keycode;
            record.user_glue = user_glue + remaining_min;
        }
        layout.reindex_parent(keycode, new_parent);
    }

    pub(crate) fn cancel(&self) {
        // Nothing mutated before commit.
    }

    pub(crate) fn grab(&self) -> SegmentId {
        self.parent
    }
}

/// Index in `target_row` where the new ring member belongs.
///
/// Plain segments order by laid-out position. Other multirow members
/// order by the ring threading instead: a member whose ring also runs
/// through the anchor row must keep the same relative order there, or
/// the save form would bind the rings to the wrong members on reload.
fn insertion_index(
    layout: &Layout,
    target_row: usize,
    left: f64,
    anchor_row: usize,
    anchor_idx: usize,
) -> usize {
    let mut index = 0;
    for (i, extent) in layout.row_extents(target_row).iter().enumerate() {
        let comes_first = if layout.is_multirow(extent.seg) {
            match member_index_in_row(layout, extent.seg, anchor_row) {
                Some(j) => j < anchor_idx,
                None => extent.left < left - UNIT_EPSILON,
            }
        } else {
            extent.left < left - UNIT_EPSILON
        };
        if comes_first {
            index = i + 1;
        } else {
            break;
        }
    }
    index
}

/// Index within `row` of the member of `seg`'s ring occupying that row.
fn member_index_in_row(layout: &Layout, seg: SegmentId, row: usize) -> Option<usize> {
    for member in layout.ring_members(seg) {
        if let Some((r, i)) = layout.position_of(member) {
            if r == row {
                return Some(i);
            }
        }
    }
    None
}

fn min_internal_glue(layout: &Layout, members: &[SegmentId]) -> f64 {
    members
        .iter()
        .map(|&m| layout.seg(m).internal_glue)
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{load, save};
    use crate::units::units_eq;

    fn pointer(x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(x, y)
    }

    #[test]
    fn test_extend_down_into_new_row_then_shrink_back() {
        let mut layout = load("K(50, UG: 0.5);\n").unwrap();
        let baseline = layout.clone();
        let parent = layout.find_keycode(50).unwrap();

        let mut extend = ExtendState::begin(&layout, &pointer(0.7, 0.5)).unwrap();
        extend.update(&mut layout, &pointer(0.7, 1.6));
        extend.commit(&mut layout);

        assert_eq!(layout.row_count(), 2);
        assert!(layout.is_multirow(parent));
        assert_eq!(layout.ring_len(parent), 2);

        let shrink = ShrinkState::begin(&layout, &pointer(0.7, 1.5)).unwrap();
        assert_eq!(shrink.end, End::Bottom);
        shrink.commit(&mut layout);

        assert!(layout.same_structure(&baseline));
        assert_eq!(save(&layout), "K(50, UG: 0.5);\n");
    }

    #[test]
    fn test_extend_top_hands_over_parent_role() {
        let mut layout = load("K(1);\nK(2) K(60, W: 1.5, UG: 0.25);\n").unwrap();
        let old_parent = layout.find_keycode(60).unwrap();

        let mut extend = ExtendState::begin(&layout, &pointer(1.5, 1.5)).unwrap();
        extend.update(&mut layout, &pointer(1.5, 0.5));
        extend.commit(&mut layout);

        let new_parent = layout.find_keycode(60).unwrap();
        assert_ne!(new_parent, old_parent);
        let record = layout.seg(new_parent);
        assert_eq!(record.kind, SegmentKind::Default);
        assert!(units_eq(record.width, 1.5));
        assert!(units_eq(record.user_glue, 0.25));
        let old = layout.seg(old_parent);
        assert_eq!(old.kind, SegmentKind::Member);
        assert_eq!(old.keycode, 0);
        // Ring order is row order: new parent first, old member second.
        assert_eq!(layout.ring_members(new_parent), vec![new_parent, old_parent]);
        layout.debug_validate();
    }

    #[test]
    fn test_extend_above_first_row_creates_row() {
        let mut layout = load("K(30);\n").unwrap();
        let mut extend = ExtendState::begin(&layout, &pointer(0.5, 0.5)).unwrap();
        extend.update(&mut layout, &pointer(0.5, -0.5));
        assert!(extend.preview(&layout).is_some());
        extend.commit(&mut layout);
        assert_eq!(layout.row_count(), 2);
        let parent = layout.find_keycode(30).unwrap();
        let (row, _) = layout.position_of(parent).unwrap();
        assert_eq!(row, 0);
    }

    #[test]
    fn test_shrink_top_promotes_member() {
        let mut layout = load("K(2) P(60, W: 1.5, UG: 0.25);\nE();\n").unwrap();
        let old_parent = layout.find_keycode(60).unwrap();
        let member = layout.ring_members(old_parent)[1];

        let shrink = ShrinkState::begin(&layout, &pointer(2.0, 0.5)).unwrap();
        assert_eq!(shrink.end, End::Top);
        shrink.commit(&mut layout);

        let new_parent = layout.find_keycode(60).unwrap();
        assert_eq!(new_parent, member);
        assert!(!layout.is_multirow(new_parent));
        let record = layout.seg(new_parent);
        assert_eq!(record.keycode, 60);
        assert!(units_eq(record.width, 1.5));
        // The member was floating on 1.25 units of derived glue (behind
        // K(2) plus the parent's own gap); shrinking folds it into user
        // glue so the key stays put.
        assert!(units_eq(record.user_glue, 0.25 + 1.25));
        // The old parent's row still holds K(2), so no row is collected.
        assert_eq!(layout.row_count(), 2);
        layout.debug_validate();
    }

    #[test]
    fn test_shrink_single_row_key_is_noop_begin() {
        let layout = load("K(30);\n").unwrap();
        assert!(ShrinkState::begin(&layout, &pointer(0.5, 0.5)).is_none());
    }

    #[test]
    fn test_extend_inside_key_commits_nothing() {
        let mut layout = load("K(30);\n").unwrap();
        let baseline = layout.clone();
        let mut extend = ExtendState::begin(&layout, &pointer(0.5, 0.5)).unwrap();
        extend.update(&mut layout, &pointer(0.9, 0.5));
        extend.commit(&mut layout);
        assert!(layout.same_structure(&baseline));
    }
}
