//! Add-key, push-right and delete-key tools.
//!
//! Add and delete are one-shot: the drag picks the spot, commit does the
//! work, cancel before commit has nothing to undo. Push-right applies
//! live during the drag, recomputing from the glue values captured at
//! begin so the gesture stays exactly reversible.

use super::PointerEvent;
use crate::arena::SegmentId;
use crate::layout::{Hit, Layout, Rect};
use crate::units::{DEFAULT_KEY_WIDTH, DEFAULT_ROW_HEIGHT, UNIT_EPSILON, snap};

/// Where the new key goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AddTarget {
    /// Into an existing row, before the segment at `before`.
    Gap { row: usize, before: usize },
    /// Into a fresh row above the keyboard.
    NewRowTop,
    /// Into a fresh row below the keyboard.
    NewRowBottom,
}

/// Insert a fresh single-row key.
#[derive(Debug)]
pub(crate) struct AddKeyState {
    target: Option<AddTarget>,
    x: f64,
}

impl AddKeyState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let mut state = Self {
            target: None,
            x: 0.0,
        };
        state.update_target(layout, event);
        state.target?;
        Some(state)
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        self.update_target(layout, event);
    }

    fn update_target(&mut self, layout: &Layout, event: &PointerEvent) {
        self.x = event.snapped_x();
        self.target = match layout.locate(event.x, event.y) {
            Hit::Glue { row, before } => Some(AddTarget::Gap { row, before }),
            Hit::OutsideTop => Some(AddTarget::NewRowTop),
            Hit::OutsideBottom => Some(AddTarget::NewRowBottom),
            // Dragging across a key keeps the last valid spot.
            Hit::Key { .. } => self.target,
        };
    }

    pub(crate) fn commit(&self, layout: &mut Layout) {
        let Some(target) = self.target else { return };
        match target {
            AddTarget::Gap { row, before } => self.insert_into_gap(layout, row, before),
            AddTarget::NewRowTop => {
                layout.insert_row(0, DEFAULT_ROW_HEIGHT);
                let row_id = layout.row_ids()[0];
                layout.push_key(row_id, 0, DEFAULT_KEY_WIDTH, self.x.max(0.0));
            }
            AddTarget::NewRowBottom => {
                let row_id = layout.push_row(DEFAULT_ROW_HEIGHT);
                layout.push_key(row_id, 0, DEFAULT_KEY_WIDTH, self.x.max(0.0));
            }
        }
        layout.recompute_glue();
    }

    fn insert_into_gap(&self, layout: &mut Layout, row: usize, before: usize) {
        let row_id = layout.row_ids()[row];
        if before < layout.row_at(row).segments.len() {
            // Split the following key's gap in two at step precision.
            let following = layout.row_at(row).segments[before];
            let gap = if layout.seg(following).is_parent() {
                layout.seg(following).user_glue
            } else {
                // A gap in front of a multirow member is derived spacing;
                // there is no user glue to split.
                0.0
            };
            let half = snap(gap / 2.0);
            if gap > 0.0 {
                layout.seg_mut(following).user_glue = gap - half;
            }
            layout.insert_key(row_id, before, 0, DEFAULT_KEY_WIDTH, half);
        } else {
            // After the last key: the pointer offset becomes the gap.
            let right = layout
                .row_extents(row)
                .last()
                .map_or(0.0, |extent| extent.right);
            let glue = (self.x - right).max(0.0);
            layout.push_key(row_id, 0, DEFAULT_KEY_WIDTH, glue);
        }
    }

    pub(crate) fn preview(&self, layout: &Layout) -> Option<Rect> {
        let target = self.target?;
        let (x, y, height) = match target {
            AddTarget::Gap { row, before } => {
                let extents = layout.row_extents(row);
                let x = if before < extents.len() {
                    let start = if before == 0 {
                        0.0
                    } else {
                        extents[before - 1].right
                    };
                    start
                } else {
                    self.x.max(extents.last().map_or(0.0, |e| e.right))
                };
                (x, layout.row_top(row), layout.row_at(row).height)
            }
            AddTarget::NewRowTop => (self.x.max(0.0), -DEFAULT_ROW_HEIGHT, DEFAULT_ROW_HEIGHT),
            AddTarget::NewRowBottom => {
                let (_, height) = layout.bounding_size();
                (self.x.max(0.0), height, DEFAULT_ROW_HEIGHT)
            }
        };
        Some(Rect {
            x,
            y,
            width: DEFAULT_KEY_WIDTH,
            height,
        })
    }
}

/// Adjust the gap in front of a key, then even out the keyboard's left
/// margin.
#[derive(Debug)]
pub(crate) struct PushRightState {
    parent: SegmentId,
    start_x: f64,
    orig_user_glue: f64,
    /// Row-leading glue carriers and their values at begin.
    leading: Vec<(SegmentId, f64)>,
    /// Left margin at begin. Only margin growth beyond this is evened
    /// out during the drag, so a zero delta stays the identity.
    orig_margin: f64,
}

impl PushRightState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        let parent = layout.ring_parent(segment);
        let leading = leading_glue_carriers(layout);
        Some(Self {
            parent,
            start_x: event.x,
            orig_user_glue: layout.seg(parent).user_glue,
            leading,
            orig_margin: left_margin(layout),
        })
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        let dx = event.delta_x(self.start_x);
        for &(seg, orig) in &self.leading {
            layout.seg_mut(seg).user_glue = orig;
        }
        layout.seg_mut(self.parent).user_glue = (self.orig_user_glue + dx).max(0.0);
        layout.recompute_glue();

        let margin = left_margin(layout) - self.orig_margin;
        if margin > UNIT_EPSILON {
            for &(seg, _) in &self.leading {
                let glue = layout.seg(seg).user_glue;
                layout.seg_mut(seg).user_glue = (glue - margin).max(0.0);
            }
            layout.recompute_glue();
        }
    }

    pub(crate) fn cancel(&self, layout: &mut Layout) {
        for &(seg, orig) in &self.leading {
            layout.seg_mut(seg).user_glue = orig;
        }
        layout.seg_mut(self.parent).user_glue = self.orig_user_glue;
        layout.recompute_glue();
    }

    pub(crate) fn grab(&self) -> SegmentId {
        self.parent
    }
}

/// Every row's first segment that carries user glue (parents only;
/// multirow members get their spacing from the solver).
fn leading_glue_carriers(layout: &Layout) -> Vec<(SegmentId, f64)> {
    let mut carriers = Vec::new();
    for row_index in 0..layout.row_count() {
        if let Some(&first) = layout.row_at(row_index).segments.first() {
            if layout.seg(first).is_parent() {
                carriers.push((first, layout.seg(first).user_glue));
            }
        }
    }
    carriers
}

/// Smallest leading offset across all rows.
fn left_margin(layout: &Layout) -> f64 {
    let mut margin = f64::INFINITY;
    for row_index in 0..layout.row_count() {
        if let Some(first) = layout.row_extents(row_index).first() {
            margin = margin.min(first.left);
        }
    }
    if margin.is_finite() { margin } else { 0.0 }
}

/// Remove a whole key.
#[derive(Debug)]
pub(crate) struct DeleteKeyState {
    parent: SegmentId,
}

impl DeleteKeyState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        Some(Self {
            parent: layout.ring_parent(segment),
        })
    }

    pub(crate) fn commit(&self, layout: &mut Layout) {
        layout.remove_key(self.parent);
        layout.compact_rows();
        layout.recompute_glue();
    }

    pub(crate) fn grab(&self) -> SegmentId {
        self.parent
    }
}
