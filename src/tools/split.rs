//! Split tool: one key becomes two.
//!
//! A single-row key splits vertically at the snapped click offset; the
//! drag moves the cut until release. A multirow key splits along the
//! horizontal ring edge nearest the click: the members below the edge
//! become a fresh key of their own. Either way the original keeps its
//! keycode and its gap, and the new key starts unassigned.

use super::PointerEvent;
use crate::arena::{ArenaMark, SegmentId};
use crate::layout::{Align, Hit, Layout, Rect, SegmentKind};
use crate::units::{MIN_KEY_WIDTH, snap};

#[derive(Debug)]
pub(crate) enum SplitState {
    Rect(RectSplit),
    Ring(RingSplit),
}

impl SplitState {
    pub(crate) fn begin(layout: &mut Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        if layout.is_multirow(segment) {
            RingSplit::begin(layout, segment, event).map(Self::Ring)
        } else {
            RectSplit::begin(layout, segment, event).map(Self::Rect)
        }
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        match self {
            Self::Rect(split) => split.update(layout, event),
            // The ring edge is fixed at begin; the pointer only previews.
            Self::Ring(_) => {}
        }
    }

    pub(crate) fn cancel(&self, layout: &mut Layout) {
        match self {
            Self::Rect(split) => split.cancel(layout),
            Self::Ring(split) => split.cancel(layout),
        }
    }

    pub(crate) fn grab(&self) -> SegmentId {
        match self {
            Self::Rect(split) => split.parent,
            Self::Ring(split) => split.upper_parent,
        }
    }

    pub(crate) fn preview(&self, layout: &Layout) -> Option<Rect> {
        match self {
            Self::Rect(split) => {
                let rect = layout.segment_rect(split.parent)?;
                Some(Rect {
                    x: rect.x + rect.width,
                    y: rect.y,
                    width: 0.0,
                    height: rect.height,
                })
            }
            Self::Ring(split) => {
                let rect = layout.segment_rect(split.lower_parent)?;
                Some(Rect {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: 0.0,
                })
            }
        }
    }
}

/// Vertical cut through a single-row key.
#[derive(Debug)]
pub(crate) struct RectSplit {
    parent: SegmentId,
    new_seg: SegmentId,
    mark: ArenaMark,
    key_left: f64,
    orig_width: f64,
}

impl RectSplit {
    fn begin(layout: &mut Layout, parent: SegmentId, event: &PointerEvent) -> Option<Self> {
        let orig_width = layout.seg(parent).width;
        if orig_width < 2.0 * MIN_KEY_WIDTH {
            return None;
        }
        let rect = layout.segment_rect(parent)?;
        let mark = layout.arena().mark();
        let offset = cut_offset(event, rect.x, orig_width);
        let (row_index, seg_index) = layout.position_of(parent)?;
        let row = layout.row_ids()[row_index];
        layout.seg_mut(parent).width = offset;
        let new_seg = layout.insert_key(row, seg_index + 1, 0, orig_width - offset, 0.0);
        layout.recompute_glue();
        Some(Self {
            parent,
            new_seg,
            mark,
            key_left: rect.x,
            orig_width,
        })
    }

    fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        let offset = cut_offset(event, self.key_left, self.orig_width);
        layout.seg_mut(self.parent).width = offset;
        layout.seg_mut(self.new_seg).width = self.orig_width - offset;
        layout.recompute_glue();
    }

    fn cancel(&self, layout: &mut Layout) {
        layout.detach_segment(self.new_seg);
        layout.release_arena(&self.mark);
        layout.seg_mut(self.parent).width = self.orig_width;
        layout.recompute_glue();
    }
}

/// Where the cut lands inside the key, clamped so both halves stay legal.
fn cut_offset(event: &PointerEvent, key_left: f64, width: f64) -> f64 {
    snap(event.x - key_left).clamp(MIN_KEY_WIDTH, width - MIN_KEY_WIDTH)
}

/// Cut along a ring edge of a multirow key.
#[derive(Debug)]
pub(crate) struct RingSplit {
    upper_parent: SegmentId,
    /// The member below the cut, promoted to parent of the new key.
    lower_parent: SegmentId,
    /// Last member above the cut.
    pred: SegmentId,
    /// Last member of the original ring.
    last: SegmentId,
    orig_kind: SegmentKind,
    orig_align: Align,
    orig_raw_width: f64,
}

impl RingSplit {
    fn begin(layout: &mut Layout, segment: SegmentId, event: &PointerEvent) -> Option<Self> {
        let upper_parent = layout.ring_parent(segment);
        let members = layout.ring_members(upper_parent);
        debug_assert!(members.len() >= 2);

        // Pick the horizontal member boundary nearest the click.
        let mut cut = 1;
        let mut best = f64::INFINITY;
        for k in 1..members.len() {
            let (row_index, _) = layout.position_of(members[k])?;
            let boundary = layout.row_top(row_index);
            let distance = (event.y - boundary).abs();
            if distance < best {
                best = distance;
                cut = k;
            }
        }

        let lower_parent = members[cut];
        let pred = members[cut - 1];
        let last = *members.last().expect("ring has members");
        let record = layout.seg(lower_parent);
        let orig_kind = record.kind;
        let orig_align = record.align;
        let orig_raw_width = record.width;
        let width = layout.effective_width(lower_parent);
        let glue = layout.seg(lower_parent).internal_glue;

        layout.seg_mut(pred).next_in_ring = upper_parent;
        layout.seg_mut(last).next_in_ring = lower_parent;
        {
            let record = layout.seg_mut(lower_parent);
            record.kind = SegmentKind::Default;
            record.width = width;
            // The cut key absorbs its derived spacing so it stays put.
            record.user_glue = glue;
        }
        layout.recompute_glue();
        Some(Self {
            upper_parent,
            lower_parent,
            pred,
            last,
            orig_kind,
            orig_align,
            orig_raw_width,
        })
    }

    fn cancel(&self, layout: &mut Layout) {
        {
            let record = layout.seg_mut(self.lower_parent);
            record.kind = self.orig_kind;
            record.align = self.orig_align;
            record.width = self.orig_raw_width;
            record.user_glue = 0.0;
        }
        layout.seg_mut(self.pred).next_in_ring = self.lower_parent;
        layout.seg_mut(self.last).next_in_ring = self.upper_parent;
        layout.recompute_glue();
    }
}
