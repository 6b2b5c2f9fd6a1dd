//! Keyboard geometry model: rows, segments, and multirow rings.
//!
//! A keyboard is a top-to-bottom list of rows; a row is a left-to-right
//! list of segments. A segment is one axis-aligned rectangle. A physical
//! key spanning several rows owns one segment per row, linked into a
//! cyclic *ring* through [`Segment::next_in_ring`]; a single-row key is a
//! ring of one (the link points at itself).
//!
//! One ring member — the **parent** — carries the authoritative keycode,
//! width and user glue for the whole key. The other members either
//! inherit the width of the nearest preceding sized member
//! ([`SegmentKind::Member`]) or declare their own width plus which edge
//! they share with their ring predecessor ([`SegmentKind::MemberSized`]).
//!
//! # Invariants
//!
//! - Every ring has exactly one parent; children carry keycode 0 and no
//!   user glue.
//! - Ring order is row order: the parent sits in the topmost occupied
//!   row, each following member exactly one row further down.
//! - The keycode index maps a keycode to the parent of the ring holding
//!   it, or holds no entry.
//! - `internal_glue` is derived state owned by [`recompute_glue`]
//!   (`Layout::recompute_glue`); everything else is mutated only by the
//!   edit tools and the parser.
//! - Rows may become empty mid-edit; [`Layout::compact_rows`] collects
//!   them before the edit commits.

mod glue;
mod locate;

pub use locate::{Hit, Rect, SegmentExtent};

use crate::arena::{Arena, ArenaMark, RowId, SegmentId};
use crate::units::{self, DEFAULT_KEY_WIDTH, DEFAULT_ROW_HEIGHT};
use std::collections::HashMap;

/// Hardware keycode. 0 means unassigned.
pub type Keycode = u32;

/// Which edge a sized multirow member shares with its ring predecessor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Right,
}

/// Render/kind tag of a segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentKind {
    /// Parent segment (single-row key or head of a multirow ring).
    #[default]
    Default,
    /// Parent segment currently grabbed by a tool. Render state only:
    /// geometry and persistence treat it as [`SegmentKind::Default`].
    Pressed,
    /// Multirow member inheriting width from the nearest preceding sized
    /// ring member.
    Member,
    /// Multirow member with its own width and an edge alignment.
    MemberSized,
}

impl SegmentKind {
    /// Whether this kind marks the ring parent.
    #[must_use]
    pub fn is_parent(self) -> bool {
        matches!(self, Self::Default | Self::Pressed)
    }
}

/// One rectangular cell of a physical key.
#[derive(Clone, Debug)]
pub struct Segment {
    pub keycode: Keycode,
    pub width: f64,
    /// Extra spacing before the key, requested by the user. Parent-only;
    /// always ≥ 0.
    pub user_glue: f64,
    /// Spacing derived by the glue engine to satisfy multirow alignment.
    /// Always ≥ 0; zero for every non-multirow segment.
    pub internal_glue: f64,
    pub kind: SegmentKind,
    /// Shared edge for [`SegmentKind::MemberSized`]; ignored otherwise.
    pub align: Align,
    /// Next member of this key's ring; self for a single-row key.
    pub next_in_ring: SegmentId,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            keycode: 0,
            width: DEFAULT_KEY_WIDTH,
            user_glue: 0.0,
            internal_glue: 0.0,
            kind: SegmentKind::Default,
            align: Align::Left,
            // Placeholder: Arena::alloc_segment points this at the
            // segment's own slot immediately after allocation.
            next_in_ring: SegmentId(0),
        }
    }
}

impl Segment {
    /// Whether this segment is the parent of its ring.
    #[must_use]
    pub fn is_parent(&self) -> bool {
        self.kind.is_parent()
    }
}

/// One keyboard row: a height and an ordered segment list.
#[derive(Clone, Debug)]
pub struct Row {
    /// Row height in key units.
    pub height: f64,
    /// Segments, left to right.
    pub segments: Vec<SegmentId>,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            height: DEFAULT_ROW_HEIGHT,
            segments: Vec::new(),
        }
    }
}

/// The whole keyboard geometry.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    arena: Arena,
    rows: Vec<RowId>,
    index: HashMap<Keycode, SegmentId>,
}

impl Layout {
    /// Create an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, top to bottom.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Row handles, top to bottom.
    #[must_use]
    pub fn row_ids(&self) -> &[RowId] {
        &self.rows
    }

    /// Read a row record.
    #[must_use]
    pub fn row(&self, id: RowId) -> &Row {
        self.arena.row(id)
    }

    /// Row record at a top-to-bottom index.
    #[must_use]
    pub fn row_at(&self, index: usize) -> &Row {
        self.arena.row(self.rows[index])
    }

    /// Read a segment record.
    #[must_use]
    pub fn seg(&self, id: SegmentId) -> &Segment {
        self.arena.segment(id)
    }

    /// Write access to a segment record.
    pub fn seg_mut(&mut self, id: SegmentId) -> &mut Segment {
        self.arena.segment_mut(id)
    }

    /// Write access to a row record.
    pub fn row_mut(&mut self, id: RowId) -> &mut Row {
        self.arena.row_mut(id)
    }

    /// Shared access to the arena, for diagnostics.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Parent segment currently holding `keycode`, if any.
    #[must_use]
    pub fn find_keycode(&self, keycode: Keycode) -> Option<SegmentId> {
        self.index.get(&keycode).copied()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Append a row at the bottom.
    pub fn push_row(&mut self, height: f64) -> RowId {
        self.insert_row(self.rows.len(), height)
    }

    /// Insert a row at a top-to-bottom index.
    pub fn insert_row(&mut self, index: usize, height: f64) -> RowId {
        let id = self.arena.alloc_row();
        self.arena.row_mut(id).height = height;
        self.rows.insert(index, id);
        id
    }

    /// Append a single-row key to a row.
    pub fn push_key(
        &mut self,
        row: RowId,
        keycode: Keycode,
        width: f64,
        user_glue: f64,
    ) -> SegmentId {
        let at = self.arena.row(row).segments.len();
        self.insert_key(row, at, keycode, width, user_glue)
    }

    /// Insert a single-row key into a row at a segment index.
    pub fn insert_key(
        &mut self,
        row: RowId,
        at: usize,
        keycode: Keycode,
        width: f64,
        user_glue: f64,
    ) -> SegmentId {
        let id = self.arena.alloc_segment();
        let seg = self.arena.segment_mut(id);
        seg.keycode = keycode;
        seg.width = width;
        seg.user_glue = user_glue;
        self.arena.row_mut(row).segments.insert(at, id);
        if keycode != 0 {
            self.index.insert(keycode, id);
        }
        id
    }

    /// Move the keycode of a key, updating the index.
    pub fn assign_keycode(&mut self, parent: SegmentId, keycode: Keycode) {
        debug_assert!(self.seg(parent).is_parent());
        let old = self.seg(parent).keycode;
        if old != 0 {
            self.index.remove(&old);
        }
        self.seg_mut(parent).keycode = keycode;
        if keycode != 0 {
            self.index.insert(keycode, parent);
        }
    }

    /// Re-point the index entry for a key at a new parent segment.
    ///
    /// Used when a ring edit hands the parent role to another member.
    pub fn reindex_parent(&mut self, keycode: Keycode, parent: SegmentId) {
        if keycode != 0 {
            self.index.insert(keycode, parent);
        }
    }

    /// Flip the pressed render tag on a parent segment.
    pub fn set_pressed(&mut self, parent: SegmentId, pressed: bool) {
        let seg = self.seg_mut(parent);
        seg.kind = match (seg.kind, pressed) {
            (SegmentKind::Default, true) => SegmentKind::Pressed,
            (SegmentKind::Pressed, false) => SegmentKind::Default,
            (kind, _) => kind,
        };
    }

    // ------------------------------------------------------------------
    // Rings
    // ------------------------------------------------------------------

    /// Whether this segment belongs to a multirow key.
    #[must_use]
    pub fn is_multirow(&self, id: SegmentId) -> bool {
        self.seg(id).next_in_ring != id
    }

    /// Number of members in this segment's ring.
    #[must_use]
    pub fn ring_len(&self, id: SegmentId) -> usize {
        let mut len = 1;
        let mut cur = self.seg(id).next_in_ring;
        while cur != id {
            len += 1;
            cur = self.seg(cur).next_in_ring;
        }
        len
    }

    /// The parent member of this segment's ring.
    #[must_use]
    pub fn ring_parent(&self, id: SegmentId) -> SegmentId {
        let mut cur = id;
        loop {
            if self.seg(cur).is_parent() {
                return cur;
            }
            cur = self.seg(cur).next_in_ring;
            debug_assert_ne!(cur, id, "multirow ring has no parent");
        }
    }

    /// All ring members in ring order (parent first, then row order).
    #[must_use]
    pub fn ring_members(&self, id: SegmentId) -> Vec<SegmentId> {
        let parent = self.ring_parent(id);
        let mut members = vec![parent];
        let mut cur = self.seg(parent).next_in_ring;
        while cur != parent {
            members.push(cur);
            cur = self.seg(cur).next_in_ring;
        }
        members
    }

    /// Splice `new` into a ring directly after `prev`.
    pub fn ring_insert_after(&mut self, prev: SegmentId, new: SegmentId) {
        debug_assert_eq!(self.seg(new).next_in_ring, new, "segment already in a ring");
        let next = self.seg(prev).next_in_ring;
        self.seg_mut(new).next_in_ring = next;
        self.seg_mut(prev).next_in_ring = new;
    }

    /// Unlink a segment from its ring, leaving it a self-ring.
    pub fn ring_remove(&mut self, id: SegmentId) {
        let next = self.seg(id).next_in_ring;
        if next == id {
            return;
        }
        let mut prev = next;
        while self.seg(prev).next_in_ring != id {
            prev = self.seg(prev).next_in_ring;
        }
        self.seg_mut(prev).next_in_ring = next;
        self.seg_mut(id).next_in_ring = id;
    }

    /// Width this segment occupies, resolving [`SegmentKind::Member`]
    /// inheritance from the nearest preceding sized ring member.
    #[must_use]
    pub fn effective_width(&self, id: SegmentId) -> f64 {
        let seg = self.seg(id);
        match seg.kind {
            SegmentKind::Default | SegmentKind::Pressed | SegmentKind::MemberSized => seg.width,
            SegmentKind::Member => {
                let parent = self.ring_parent(id);
                let mut width = self.seg(parent).width;
                let mut cur = parent;
                loop {
                    cur = self.seg(cur).next_in_ring;
                    if cur == id {
                        return width;
                    }
                    let s = self.seg(cur);
                    if s.kind == SegmentKind::MemberSized {
                        width = s.width;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Location and removal
    // ------------------------------------------------------------------

    /// Find the (row index, segment index) of a segment.
    #[must_use]
    pub fn position_of(&self, id: SegmentId) -> Option<(usize, usize)> {
        for (r, &row_id) in self.rows.iter().enumerate() {
            if let Some(i) = self.arena.row(row_id).segments.iter().position(|&s| s == id) {
                return Some((r, i));
            }
        }
        None
    }

    /// Remove a whole key: every ring member leaves its row, the index
    /// entry is dropped, the records are recycled.
    ///
    /// Rows left empty are collected by the next [`Layout::compact_rows`].
    pub fn remove_key(&mut self, id: SegmentId) {
        let members = self.ring_members(id);
        let keycode = self.seg(members[0]).keycode;
        if keycode != 0 {
            self.index.remove(&keycode);
        }
        for member in members {
            let (r, i) = self
                .position_of(member)
                .expect("ring member not present in any row");
            let row_id = self.rows[r];
            self.arena.row_mut(row_id).segments.remove(i);
            self.arena.recycle_segment(member);
        }
    }

    /// Discard everything built since `mark`: rows, index entries and
    /// arena records. Error path of the parser, which builds
    /// speculatively into an otherwise empty layout.
    pub(crate) fn rollback_parse(&mut self, mark: &ArenaMark) {
        self.rows.clear();
        self.index.clear();
        self.arena.release(mark);
    }

    /// Remove a segment from its row without recycling the record.
    ///
    /// Pair with [`Layout::release_arena`] when the record was allocated
    /// inside a speculative region.
    pub(crate) fn detach_segment(&mut self, id: SegmentId) {
        let (r, i) = self
            .position_of(id)
            .expect("detached segment not present in any row");
        let row_id = self.rows[r];
        self.arena.row_mut(row_id).segments.remove(i);
    }

    /// Release arena allocations made since `mark`.
    pub(crate) fn release_arena(&mut self, mark: &ArenaMark) {
        self.arena.release(mark);
    }

    /// Detach a segment from its row and recycle its record.
    pub(crate) fn discard_segment(&mut self, id: SegmentId) {
        self.detach_segment(id);
        self.arena.recycle_segment(id);
    }

    /// Garbage-collect empty rows.
    pub fn compact_rows(&mut self) {
        let mut kept = Vec::with_capacity(self.rows.len());
        for &row_id in &self.rows {
            if self.arena.row(row_id).segments.is_empty() {
                self.arena.recycle_row(row_id);
            } else {
                kept.push(row_id);
            }
        }
        self.rows = kept;
    }

    // ------------------------------------------------------------------
    // Comparison and validation
    // ------------------------------------------------------------------

    /// Structural equality: same rows, same segment fields, same ring
    /// shapes. Arena slot numbers are irrelevant; the pressed render tag
    /// compares equal to the default tag.
    #[must_use]
    pub fn same_structure(&self, other: &Self) -> bool {
        if self.rows.len() != other.rows.len() {
            return false;
        }
        let pos_a = self.position_map();
        let pos_b = other.position_map();
        for (&ra, &rb) in self.rows.iter().zip(&other.rows) {
            let (row_a, row_b) = (self.arena.row(ra), other.arena.row(rb));
            if !units::units_eq(row_a.height, row_b.height)
                || row_a.segments.len() != row_b.segments.len()
            {
                return false;
            }
            for (&sa, &sb) in row_a.segments.iter().zip(&row_b.segments) {
                let (a, b) = (self.seg(sa), other.seg(sb));
                let kind_a = normalize_kind(a.kind);
                let kind_b = normalize_kind(b.kind);
                if kind_a != kind_b
                    || a.keycode != b.keycode
                    || !units::units_eq(a.user_glue, b.user_glue)
                    || !units::units_eq(a.internal_glue, b.internal_glue)
                {
                    return false;
                }
                if kind_a != SegmentKind::Member && !units::units_eq(a.width, b.width) {
                    return false;
                }
                if kind_a == SegmentKind::MemberSized && a.align != b.align {
                    return false;
                }
                if pos_a[&a.next_in_ring] != pos_b[&b.next_in_ring] {
                    return false;
                }
            }
        }
        true
    }

    fn position_map(&self) -> HashMap<SegmentId, (usize, usize)> {
        let mut map = HashMap::new();
        for (r, &row_id) in self.rows.iter().enumerate() {
            for (i, &seg) in self.arena.row(row_id).segments.iter().enumerate() {
                map.insert(seg, (r, i));
            }
        }
        map
    }

    /// Assert the structural invariants in debug builds.
    pub fn debug_validate(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let positions = self.position_map();
        let mut seen = std::collections::HashSet::new();
        for (r, &row_id) in self.rows.iter().enumerate() {
            for &seg_id in &self.arena.row(row_id).segments {
                if !seen.insert(seg_id) {
                    continue;
                }
                let seg = self.seg(seg_id);
                if seg.is_parent() {
                    let members = self.ring_members(seg_id);
                    // One parent per ring, members in consecutive rows.
                    for (offset, &member) in members.iter().enumerate() {
                        let m = self.seg(member);
                        if offset > 0 {
                            debug_assert!(!m.is_parent(), "ring with two parents");
                            debug_assert_eq!(m.keycode, 0, "child segment holds a keycode");
                            debug_assert_eq!(m.user_glue, 0.0, "child segment holds user glue");
                        }
                        debug_assert_eq!(
                            positions[&member].0,
                            r + offset,
                            "ring member out of row order"
                        );
                        seen.insert(member);
                    }
                    if seg.keycode != 0 {
                        debug_assert_eq!(
                            self.index.get(&seg.keycode),
                            Some(&seg_id),
                            "keycode index does not point at ring parent"
                        );
                    }
                    debug_assert!(seg.user_glue >= 0.0, "negative user glue");
                }
                debug_assert!(seg.internal_glue >= -units::UNIT_EPSILON, "negative internal glue");
            }
        }
        for (&kc, &parent) in &self.index {
            debug_assert_eq!(self.seg(parent).keycode, kc, "stale keycode index entry");
            debug_assert!(self.seg(parent).is_parent(), "keycode index points at a child");
        }
    }
}

fn normalize_kind(kind: SegmentKind) -> SegmentKind {
    match kind {
        SegmentKind::Pressed => SegmentKind::Default,
        other => other,
    }
}
