//! Internal-glue computation for multirow keys.
//!
//! Every segment is placed left to right at
//! `cursor + user_glue + internal_glue`. For plain keys the internal glue
//! is always zero. For a multirow key the members of its ring must line
//! up across rows according to their alignment flags, so the solver picks
//! the leftmost horizontal position the most constraining row permits and
//! gives every other member exactly the internal glue needed to meet it.
//! At least one member therefore ends up with zero internal glue: the
//! supporting segment that keeps the key from floating.
//!
//! The sweep is a single conceptual left-to-right, top-to-bottom pass.
//! Each row keeps a cursor (accumulated width plus the index of its next
//! unplaced segment). A row stops at a multirow member whose ring is not
//! finished yet; once the ring's last member is reached the key's
//! position is fixed, every occupied row's cursor jumps past the key, and
//! those rows resume where they stopped. In-flight keys live in a small
//! linearly scanned table: rings are bounded by the row count and real
//! keyboards carry a handful of multirow keys.

use super::{Align, Layout, SegmentKind};
use crate::arena::SegmentId;
use crate::units::UNIT_EPSILON;

#[derive(Clone, Copy, Debug, Default)]
struct RowCursor {
    /// Accumulated x position of everything placed so far.
    x: f64,
    /// Index of the next unplaced segment in the row.
    next: usize,
}

#[derive(Clone, Copy, Debug)]
struct MemberGeom {
    seg: SegmentId,
    /// Left edge relative to the parent's left edge, fixed by the
    /// alignment chain.
    delta: f64,
    width: f64,
}

/// Per-key solver state while the sweep is inside the key's rows.
#[derive(Debug)]
struct KeyState {
    /// Ring members in ring order with their ring-relative geometry.
    members: Vec<MemberGeom>,
    /// How many members have contributed a bound so far.
    recorded: usize,
    /// Tightest left edge seen so far for the parent.
    parent_left: f64,
    /// (row index, segment index) of each recorded member.
    places: Vec<(usize, usize)>,
}

impl Layout {
    /// Recompute every segment's `internal_glue`.
    ///
    /// Assumes the ring structure is well formed (one parent per ring,
    /// members in consecutive rows); malformed structure is a programming
    /// error caught by debug assertions, not a runtime error.
    pub fn recompute_glue(&mut self) {
        let row_segs: Vec<Vec<SegmentId>> = self
            .rows
            .iter()
            .map(|&rid| self.arena.row(rid).segments.clone())
            .collect();
        let mut cursors = vec![RowCursor::default(); row_segs.len()];
        let mut states: Vec<KeyState> = Vec::new();

        loop {
            let mut progressed = false;
            for r in 0..row_segs.len() {
                progressed |= self.advance_row(r, &row_segs, &mut cursors, &mut states);
            }
            if !progressed {
                break;
            }
        }

        debug_assert!(states.is_empty(), "multirow ring never closed");
        debug_assert!(
            cursors
                .iter()
                .zip(&row_segs)
                .all(|(c, segs)| c.next == segs.len()),
            "glue sweep stalled before the end of a row"
        );
    }

    /// Place segments of row `r` until the row ends or blocks on an
    /// unfinished multirow key. Returns whether anything was placed.
    fn advance_row(
        &mut self,
        r: usize,
        row_segs: &[Vec<SegmentId>],
        cursors: &mut [RowCursor],
        states: &mut Vec<KeyState>,
    ) -> bool {
        let mut progressed = false;
        while cursors[r].next < row_segs[r].len() {
            let seg_id = row_segs[r][cursors[r].next];
            let (user_glue, width, is_parent) = {
                let seg = self.seg(seg_id);
                (seg.user_glue, seg.width, seg.is_parent())
            };

            if !self.is_multirow(seg_id) {
                self.seg_mut(seg_id).internal_glue = 0.0;
                cursors[r].x += user_glue + width;
                cursors[r].next += 1;
                progressed = true;
                continue;
            }

            let state_idx = match states
                .iter()
                .position(|s| s.members.iter().any(|m| m.seg == seg_id))
            {
                Some(i) => i,
                None => {
                    debug_assert!(is_parent, "multirow child reached before its parent");
                    states.push(self.open_key_state(seg_id));
                    states.len() - 1
                }
            };

            let state = &mut states[state_idx];
            let member_idx = state
                .members
                .iter()
                .position(|m| m.seg == seg_id)
                .expect("state matched but member missing");
            if member_idx < state.recorded {
                // Bound already taken; still waiting for lower rows.
                break;
            }
            debug_assert_eq!(member_idx, state.recorded, "ring member out of sweep order");

            let bound = cursors[r].x + user_glue - state.members[member_idx].delta;
            state.parent_left = state.parent_left.max(bound);
            state.places.push((r, cursors[r].next));
            state.recorded += 1;
            progressed = true;

            if state.recorded == state.members.len() {
                let done = states.swap_remove(state_idx);
                self.finalize_key(&done, cursors);
                // The cursor for this row has jumped past the key; keep going.
                continue;
            }
            break;
        }
        progressed
    }

    /// Walk a ring once, fixing each member's geometry relative to the
    /// parent's left edge.
    fn open_key_state(&self, parent: SegmentId) -> KeyState {
        let mut members = vec![MemberGeom {
            seg: parent,
            delta: 0.0,
            width: self.seg(parent).width,
        }];
        let mut prev_left = 0.0;
        let mut prev_width = self.seg(parent).width;
        let mut cur = self.seg(parent).next_in_ring;
        while cur != parent {
            let seg = self.seg(cur);
            let (left, width) = match seg.kind {
                SegmentKind::Member => (prev_left, prev_width),
                SegmentKind::MemberSized => match seg.align {
                    Align::Left => (prev_left, seg.width),
                    Align::Right => (prev_left + prev_width - seg.width, seg.width),
                },
                SegmentKind::Default | SegmentKind::Pressed => {
                    unreachable!("second parent inside a ring")
                }
            };
            members.push(MemberGeom {
                seg: cur,
                delta: left,
                width,
            });
            prev_left = left;
            prev_width = width;
            cur = seg.next_in_ring;
        }
        KeyState {
            members,
            recorded: 0,
            parent_left: f64::NEG_INFINITY,
            places: Vec::new(),
        }
    }

    /// Second pass over a solved key: assign internal glue and advance
    /// every occupied row's cursor to the key's right edge in that row.
    fn finalize_key(&mut self, state: &KeyState, cursors: &mut [RowCursor]) {
        for (k, member) in state.members.iter().enumerate() {
            let (r, idx) = state.places[k];
            let user_glue = self.seg(member.seg).user_glue;
            let glue = state.parent_left + member.delta - cursors[r].x - user_glue;
            debug_assert!(glue >= -UNIT_EPSILON, "solver produced negative internal glue");
            self.seg_mut(member.seg).internal_glue = glue.max(0.0);
            cursors[r].x = state.parent_left + member.delta + member.width;
            cursors[r].next = idx + 1;
        }
    }

    /// Smallest internal glue across a ring. Zero after
    /// [`Layout::recompute_glue`] (the supporting segment).
    #[must_use]
    pub fn ring_min_glue(&self, id: SegmentId) -> f64 {
        self.ring_members(id)
            .iter()
            .map(|&m| self.seg(m).internal_glue)
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::units_eq;

    /// Row 0: `K(1) P(40, W:1.5)` / Row 1: `K(2, W:2) E(W:1, R)`.
    fn iso_enter() -> (Layout, SegmentId) {
        let mut layout = Layout::new();
        let r0 = layout.push_row(1.0);
        let r1 = layout.push_row(1.0);
        layout.push_key(r0, 1, 1.0, 0.0);
        let parent = layout.push_key(r0, 40, 1.5, 0.0);
        layout.push_key(r1, 2, 2.0, 0.0);
        let child = layout.insert_key(r1, 1, 0, 1.0, 0.0);
        {
            let seg = layout.seg_mut(child);
            seg.kind = SegmentKind::MemberSized;
            seg.align = Align::Right;
        }
        layout.ring_insert_after(parent, child);
        layout.recompute_glue();
        (layout, parent)
    }

    #[test]
    fn test_plain_segments_have_zero_glue() {
        let mut layout = Layout::new();
        let r0 = layout.push_row(1.0);
        layout.push_key(r0, 1, 1.0, 0.5);
        layout.push_key(r0, 2, 1.5, 0.0);
        layout.recompute_glue();
        for &seg in &layout.row_at(0).segments {
            assert_eq!(layout.seg(seg).internal_glue, 0.0);
        }
    }

    #[test]
    fn test_most_constraining_row_wins() {
        let (layout, parent) = iso_enter();
        // Row 1 holds 2.0 units before the member whose left edge sits at
        // parent_left + 0.5, so the parent is pushed to 1.5 and floats
        // 0.5 past the 1-unit key in its own row.
        assert!(units_eq(layout.seg(parent).internal_glue, 0.5));
        let child = layout.ring_members(parent)[1];
        assert!(units_eq(layout.seg(child).internal_glue, 0.0));
    }

    #[test]
    fn test_supporting_segment_exists() {
        let (layout, parent) = iso_enter();
        assert!(units_eq(layout.ring_min_glue(parent), 0.0));
    }

    #[test]
    fn test_left_aligned_wide_member() {
        // Row 0: P(30)  /  Row 1: E(W:2, L) — nothing constrains either
        // row, so the key hugs the left edge and both members rest at 0.
        let mut layout = Layout::new();
        let r0 = layout.push_row(1.0);
        let r1 = layout.push_row(1.0);
        let parent = layout.push_key(r0, 30, 1.0, 0.0);
        let child = layout.push_key(r1, 0, 2.0, 0.0);
        {
            let seg = layout.seg_mut(child);
            seg.kind = SegmentKind::MemberSized;
            seg.align = Align::Left;
        }
        layout.ring_insert_after(parent, child);
        layout.recompute_glue();
        assert!(units_eq(layout.seg(parent).internal_glue, 0.0));
        assert!(units_eq(layout.seg(child).internal_glue, 0.0));
    }

    #[test]
    fn test_user_glue_offsets_bound() {
        // A parent with user glue asks for its gap on top of whatever the
        // constraint forces; the gap never collapses into internal glue.
        let mut layout = Layout::new();
        let r0 = layout.push_row(1.0);
        let r1 = layout.push_row(1.0);
        let parent = layout.push_key(r0, 30, 1.0, 0.5);
        let child = layout.push_key(r1, 0, 0.0, 0.0);
        layout.seg_mut(child).kind = SegmentKind::Member;
        layout.ring_insert_after(parent, child);
        layout.recompute_glue();
        // Parent row: left edge at 0.5 (its own glue). Child row is empty
        // before the member, so the child needs 0.5 internal glue.
        assert!(units_eq(layout.seg(parent).internal_glue, 0.0));
        assert!(units_eq(layout.seg(child).internal_glue, 0.5));
    }

    #[test]
    fn test_two_keys_interleaved_resume() {
        // Row 0: P(1) P(2)  /  Row 1: E() E() — closing the first ring
        // resumes row 0 so the second ring can open where it stopped.
        let mut layout = Layout::new();
        let r0 = layout.push_row(1.0);
        let r1 = layout.push_row(1.0);
        let p1 = layout.push_key(r0, 1, 1.0, 0.0);
        let p2 = layout.push_key(r0, 2, 1.0, 0.0);
        let c1 = layout.push_key(r1, 0, 0.0, 0.0);
        let c2 = layout.push_key(r1, 0, 0.0, 0.0);
        layout.seg_mut(c1).kind = SegmentKind::Member;
        layout.seg_mut(c2).kind = SegmentKind::Member;
        layout.ring_insert_after(p1, c1);
        layout.ring_insert_after(p2, c2);
        layout.recompute_glue();
        for id in [p1, p2, c1, c2] {
            assert!(units_eq(layout.seg(id).internal_glue, 0.0));
        }
        layout.debug_validate();
    }
}
