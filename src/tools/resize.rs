//! Resize tools: key edge, single segment, row height.
//!
//! Every update recomputes the affected fields from the values captured
//! at begin plus the current pointer delta. Nothing is accumulated
//! between updates, so driving the delta back to zero reproduces the
//! pre-begin structure exactly — cancel is just that, followed by
//! dropping the captured state.
//!
//! Growing an edge first consumes the neighboring key's user glue down
//! to zero, then pushes into the neighbor's width. Shrinking plays the
//! same mapping backwards: width is restored before glue starts growing
//! again. The capture records the growth threshold where pushing starts
//! so the two phases stay separated across direction changes.

use super::PointerEvent;
use crate::arena::{RowId, SegmentId};
use crate::layout::{Align, Hit, Layout, SegmentKind};
use crate::units::{MIN_KEY_WIDTH, MIN_ROW_HEIGHT};

/// Which edge of a key or segment is being dragged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Captured state of the key whose gap the drag may consume.
#[derive(Clone, Copy, Debug)]
struct NeighborPush {
    seg: SegmentId,
    orig_width: f64,
    orig_user_glue: f64,
    /// Growth at which gap consumption ends and pushing begins.
    push_threshold: f64,
}

impl NeighborPush {
    fn capture(layout: &Layout, seg: SegmentId) -> Self {
        let record = layout.seg(seg);
        Self {
            seg,
            orig_width: record.width,
            orig_user_glue: record.user_glue,
            push_threshold: record.user_glue,
        }
    }

    /// Apply a growth `dx` of the dragged key against this neighbor.
    fn apply(&self, layout: &mut Layout, dx: f64) {
        let (width, user_glue) = if dx >= 0.0 {
            let consumed = dx.min(self.push_threshold);
            let pushed = dx - consumed;
            (self.orig_width - pushed, self.orig_user_glue - consumed)
        } else {
            // Shrinking past the start leaves the neighbor in place by
            // widening the gap in front of it.
            (self.orig_width, self.orig_user_glue - dx)
        };
        let record = layout.seg_mut(self.seg);
        record.width = width;
        record.user_glue = user_glue;
    }

    /// Largest growth this neighbor can absorb.
    // TODO: chain pushing is not implemented; once this neighbor reaches
    // minimum width the drag clamps instead of pushing the key after it.
    fn max_growth(&self) -> f64 {
        self.push_threshold + (self.orig_width - MIN_KEY_WIDTH).max(0.0)
    }

    fn restore(&self, layout: &mut Layout) {
        self.apply(layout, 0.0);
    }
}

/// Dragging one edge of a whole key.
#[derive(Debug)]
pub(crate) struct ResizeEdgeState {
    parent: SegmentId,
    side: Side,
    start_x: f64,
    orig_width: f64,
    orig_user_glue: f64,
    neighbor: Option<NeighborPush>,
}

impl ResizeEdgeState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        let parent = layout.ring_parent(segment);
        let rect = layout.segment_rect(segment)?;
        let side = if event.x >= rect.x + rect.width / 2.0 {
            Side::Right
        } else {
            Side::Left
        };
        let record = layout.seg(parent);
        let neighbor = match side {
            // Only a key that owns its spacing can be pushed; growth
            // against a multirow member shifts its whole key through the
            // glue solver instead.
            Side::Right => following_neighbor(layout, parent)
                .filter(|&n| layout.seg(n).is_parent())
                .map(|n| NeighborPush::capture(layout, n)),
            // TODO: growing the left edge should push the previous key
            // once the dragged key's own glue runs out; the drag clamps
            // there instead.
            Side::Left => None,
        };
        Some(Self {
            parent,
            side,
            start_x: event.x,
            orig_width: record.width,
            orig_user_glue: record.user_glue,
            neighbor,
        })
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        let dx = event.delta_x(self.start_x);
        self.apply(layout, dx);
    }

    pub(crate) fn cancel(&self, layout: &mut Layout) {
        self.apply_clamped(layout, 0.0);
    }

    pub(crate) fn grab(&self) -> SegmentId {
        self.parent
    }

    fn apply(&self, layout: &mut Layout, dx: f64) {
        self.apply_clamped(layout, self.clamp(dx));
    }

    fn clamp(&self, dx: f64) -> f64 {
        match self.side {
            Side::Right => {
                // A key already narrower than the minimum may stay as it
                // is, it just cannot shrink further.
                let mut dx = dx.max((MIN_KEY_WIDTH - self.orig_width).min(0.0));
                if let Some(neighbor) = &self.neighbor {
                    dx = dx.min(neighbor.max_growth());
                }
                dx
            }
            Side::Left => dx.clamp(
                -self.orig_user_glue,
                (self.orig_width - MIN_KEY_WIDTH).max(0.0),
            ),
        }
    }

    fn apply_clamped(&self, layout: &mut Layout, dx: f64) {
        match self.side {
            Side::Right => {
                layout.seg_mut(self.parent).width = self.orig_width + dx;
                if let Some(neighbor) = &self.neighbor {
                    neighbor.apply(layout, dx);
                }
            }
            Side::Left => {
                // The right edge stays put: width and the key's own gap
                // trade against each other.
                let record = layout.seg_mut(self.parent);
                record.width = self.orig_width - dx;
                record.user_glue = self.orig_user_glue + dx;
            }
        }
        layout.recompute_glue();
    }
}

/// Dragging one edge of a single segment of a multirow key.
///
/// An inheriting member has no width of its own to change, so the first
/// off-zero update materializes it into a sized member pinned to the
/// edge opposite the drag; a zero delta (and cancel) restores the
/// inherited kind.
#[derive(Debug)]
pub(crate) struct ResizeSegmentState {
    seg: SegmentId,
    side: Side,
    start_x: f64,
    orig_width: f64,
    orig_kind: SegmentKind,
    orig_align: Align,
    orig_raw_width: f64,
    orig_user_glue: f64,
    neighbor: Option<NeighborPush>,
}

impl ResizeSegmentState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let Hit::Key { segment, .. } = layout.locate(event.x, event.y) else {
            return None;
        };
        let rect = layout.segment_rect(segment)?;
        let side = if event.x >= rect.x + rect.width / 2.0 {
            Side::Right
        } else {
            Side::Left
        };
        let record = layout.seg(segment);
        let neighbor = match side {
            Side::Right => following_neighbor(layout, segment)
                .filter(|&n| layout.seg(n).is_parent())
                .map(|n| NeighborPush::capture(layout, n)),
            Side::Left => None,
        };
        Some(Self {
            seg: segment,
            side,
            start_x: event.x,
            orig_width: layout.effective_width(segment),
            orig_kind: record.kind,
            orig_align: record.align,
            orig_raw_width: record.width,
            orig_user_glue: record.user_glue,
            neighbor,
        })
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        let dx = self.clamp(event.delta_x(self.start_x));
        if dx == 0.0 {
            self.restore(layout);
            layout.recompute_glue();
            return;
        }
        if self.orig_kind == SegmentKind::Member {
            // Pin the edge opposite the drag to the ring predecessor.
            let record = layout.seg_mut(self.seg);
            record.kind = SegmentKind::MemberSized;
            record.align = match self.side {
                Side::Right => Align::Left,
                Side::Left => Align::Right,
            };
        }
        let width = match self.side {
            Side::Right => self.orig_width + dx,
            Side::Left => self.orig_width - dx,
        };
        layout.seg_mut(self.seg).width = width;
        if self.orig_kind.is_parent() && self.side == Side::Left {
            layout.seg_mut(self.seg).user_glue = self.orig_user_glue + dx;
        }
        if let Some(neighbor) = &self.neighbor {
            neighbor.apply(layout, dx);
        }
        layout.recompute_glue();
    }

    pub(crate) fn cancel(&self, layout: &mut Layout) {
        self.restore(layout);
        layout.recompute_glue();
    }

    fn restore(&self, layout: &mut Layout) {
        {
            let record = layout.seg_mut(self.seg);
            record.kind = self.orig_kind;
            record.align = self.orig_align;
            record.width = self.orig_raw_width;
            record.user_glue = self.orig_user_glue;
        }
        if let Some(neighbor) = &self.neighbor {
            neighbor.restore(layout);
        }
    }

    pub(crate) fn grab(&self, layout: &Layout) -> SegmentId {
        layout.ring_parent(self.seg)
    }

    fn clamp(&self, dx: f64) -> f64 {
        match self.side {
            Side::Right => {
                let mut dx = dx.max((MIN_KEY_WIDTH - self.orig_width).min(0.0));
                if let Some(neighbor) = &self.neighbor {
                    dx = dx.min(neighbor.max_growth());
                }
                dx
            }
            Side::Left => {
                let max = if self.orig_kind.is_parent() {
                    // A parent's left edge trades width for its own glue.
                    self.orig_user_glue
                } else {
                    // A member's left growth is bounded by the glue solver,
                    // which shifts the whole key right when rows collide.
                    f64::INFINITY
                };
                dx.clamp(-max, (self.orig_width - MIN_KEY_WIDTH).max(0.0))
            }
        }
    }
}

/// Dragging a row's top or bottom boundary.
#[derive(Debug)]
pub(crate) struct ResizeRowState {
    row: RowId,
    /// Dragging the top boundary inverts the delta's effect.
    from_top: bool,
    start_y: f64,
    orig_height: f64,
}

impl ResizeRowState {
    pub(crate) fn begin(layout: &Layout, event: &PointerEvent) -> Option<Self> {
        let row_index = match layout.locate(event.x, event.y) {
            Hit::Key { row, .. } | Hit::Glue { row, .. } => row,
            Hit::OutsideTop | Hit::OutsideBottom => return None,
        };
        let row = layout.row_ids()[row_index];
        let top = layout.row_top(row_index);
        let height = layout.row(row).height;
        Some(Self {
            row,
            from_top: event.y < top + height / 2.0,
            start_y: event.y,
            orig_height: height,
        })
    }

    pub(crate) fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        let mut dy = event.delta_y(self.start_y);
        if self.from_top {
            dy = -dy;
        }
        let height = (self.orig_height + dy).max(MIN_ROW_HEIGHT);
        layout.row_mut(self.row).height = height;
    }

    pub(crate) fn cancel(&self, layout: &mut Layout) {
        layout.row_mut(self.row).height = self.orig_height;
    }
}

/// The segment after `seg` in its row, if any.
fn following_neighbor(layout: &Layout, seg: SegmentId) -> Option<SegmentId> {
    let (row_index, seg_index) = layout.position_of(seg)?;
    layout
        .row_at(row_index)
        .segments
        .get(seg_index + 1)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Modifiers;
    use crate::units::units_eq;

    fn row_of_two() -> Layout {
        let mut layout = Layout::new();
        let r0 = layout.push_row(1.0);
        layout.push_key(r0, 30, 1.0, 0.0);
        layout.push_key(r0, 31, 1.0, 0.5);
        layout.recompute_glue();
        layout
    }

    fn pointer(x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(x, y)
    }

    #[test]
    fn test_grow_right_consumes_glue_then_pushes() {
        let mut layout = row_of_two();
        let mut state =
            ResizeEdgeState::begin(&layout, &pointer(0.9, 0.5)).expect("hit the first key");

        // Growth of 0.25 eats half the 0.5 gap.
        state.update(&mut layout, &pointer(1.15, 0.5));
        let first = layout.row_at(0).segments[0];
        let second = layout.row_at(0).segments[1];
        assert!(units_eq(layout.seg(first).width, 1.25));
        assert!(units_eq(layout.seg(second).user_glue, 0.25));
        assert!(units_eq(layout.seg(second).width, 1.0));

        // Growth of 0.75 exhausts the gap and pushes 0.25 into the neighbor.
        state.update(&mut layout, &pointer(1.65, 0.5));
        assert!(units_eq(layout.seg(first).width, 1.75));
        assert!(units_eq(layout.seg(second).user_glue, 0.0));
        assert!(units_eq(layout.seg(second).width, 0.75));
    }

    #[test]
    fn test_shrink_after_push_restores_neighbor_first() {
        let mut layout = row_of_two();
        let baseline = layout.clone();
        let mut state = ResizeEdgeState::begin(&layout, &pointer(0.9, 0.5)).unwrap();

        state.update(&mut layout, &pointer(1.65, 0.5)); // push phase
        state.update(&mut layout, &pointer(1.15, 0.5)); // back into the gap phase
        let second = layout.row_at(0).segments[1];
        assert!(units_eq(layout.seg(second).width, 1.0));
        assert!(units_eq(layout.seg(second).user_glue, 0.25));

        // Driving the delta to zero is the pre-begin structure.
        state.update(&mut layout, &pointer(0.9, 0.5));
        assert!(layout.same_structure(&baseline));
    }

    #[test]
    fn test_push_clamps_at_neighbor_minimum() {
        let mut layout = row_of_two();
        let mut state = ResizeEdgeState::begin(&layout, &pointer(0.9, 0.5)).unwrap();
        state.update(&mut layout, &pointer(9.0, 0.5));
        let second = layout.row_at(0).segments[1];
        assert!(units_eq(layout.seg(second).width, MIN_KEY_WIDTH));
        let first = layout.row_at(0).segments[0];
        // 1.0 own + 0.5 gap + 0.75 pushed out of the neighbor.
        assert!(units_eq(layout.seg(first).width, 2.25));
    }

    #[test]
    fn test_cancel_is_exact() {
        let mut layout = row_of_two();
        let baseline = layout.clone();
        let mut state = ResizeEdgeState::begin(&layout, &pointer(0.9, 0.5)).unwrap();
        state.update(&mut layout, &pointer(1.4, 0.5));
        state.update(&mut layout, &pointer(0.4, 0.5));
        state.cancel(&mut layout);
        assert!(layout.same_structure(&baseline));
    }

    #[test]
    fn test_left_drag_trades_width_for_glue() {
        let mut layout = row_of_two();
        let second_id = layout.row_at(0).segments[1];
        let mut state =
            ResizeEdgeState::begin(&layout, &pointer(1.6, 0.5)).expect("hit the second key");
        assert_eq!(state.grab(), second_id);

        // Dragging right shrinks the key and widens its gap.
        state.update(&mut layout, &pointer(1.85, 0.5));
        assert!(units_eq(layout.seg(second_id).width, 0.75));
        assert!(units_eq(layout.seg(second_id).user_glue, 0.75));

        // Dragging left grows the key into its own gap, clamped there.
        state.update(&mut layout, &pointer(0.2, 0.5));
        assert!(units_eq(layout.seg(second_id).width, 1.5));
        assert!(units_eq(layout.seg(second_id).user_glue, 0.0));
    }

    #[test]
    fn test_unsnapped_drag_with_shift() {
        let mut layout = row_of_two();
        let mut state = ResizeEdgeState::begin(&layout, &pointer(0.9, 0.5)).unwrap();
        let event = PointerEvent::with_modifiers(0.93, 0.5, Modifiers::SHIFT);
        state.update(&mut layout, &event);
        let first = layout.row_at(0).segments[0];
        assert!(units_eq(layout.seg(first).width, 1.03));
    }

    #[test]
    fn test_resize_segment_materializes_member() {
        let mut layout = crate::format::load("P(30, W: 2);\nE();\n").unwrap();
        let parent = layout.find_keycode(30).unwrap();
        let child = layout.ring_members(parent)[1];
        let baseline = layout.clone();

        let mut state =
            ResizeSegmentState::begin(&layout, &pointer(1.8, 1.5)).expect("hit the child");
        assert_eq!(state.grab(&layout), parent);

        // The first real drag turns the inheriting member into a sized one.
        state.update(&mut layout, &pointer(2.3, 1.5));
        assert_eq!(layout.seg(child).kind, SegmentKind::MemberSized);
        assert_eq!(layout.seg(child).align, Align::Left);
        assert!(units_eq(layout.seg(child).width, 2.5));

        // Back at the begin position the member inherits again.
        state.update(&mut layout, &pointer(1.8, 1.5));
        assert!(layout.same_structure(&baseline));
        assert_eq!(layout.seg(child).kind, SegmentKind::Member);

        state.update(&mut layout, &pointer(2.3, 1.5));
        state.cancel(&mut layout);
        assert!(layout.same_structure(&baseline));
    }

    #[test]
    fn test_resize_row() {
        let mut layout = row_of_two();
        let row = layout.row_ids()[0];
        let mut state = ResizeRowState::begin(&layout, &pointer(0.5, 0.9)).unwrap();
        assert!(!state.from_top);
        state.update(&mut layout, &pointer(0.5, 1.4));
        assert!(units_eq(layout.row(row).height, 1.5));
        state.update(&mut layout, &pointer(0.5, -5.0));
        assert!(units_eq(layout.row(row).height, MIN_ROW_HEIGHT));
        state.cancel(&mut layout);
        assert!(units_eq(layout.row(row).height, 1.0));
    }
}
