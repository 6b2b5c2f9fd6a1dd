//! Slot arenas for row and segment records.
//!
//! All geometry records live in two slabs owned by an [`Arena`]: one for
//! rows, one for segments. Records are addressed by [`RowId`] /
//! [`SegmentId`] handles, never by reference, which keeps the multirow
//! ring links (segment → segment cycles) representable without
//! self-referential pointers.
//!
//! # Design
//!
//! - Allocation pops a per-kind LIFO free list before growing the slab;
//!   it never fails (the slab grows until the allocator aborts).
//! - [`Arena::recycle_segment`] marks a slot free but leaves the record's
//!   link fields readable until the slot is reused, so a caller can keep
//!   walking a ring it is in the middle of dismantling.
//! - [`Arena::mark`] / [`Arena::release`] bracket a speculative build
//!   region: `release` discards every allocation made since the mark.
//!   The region must not recycle records allocated before the mark.
//! - Handle misuse (accessing a freed or out-of-range slot) is a
//!   programming error and panics; it is not a recoverable condition.

use crate::layout::{Row, Segment};

/// Handle to a row record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowId(pub(crate) u32);

/// Handle to a segment record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId(pub(crate) u32);

impl RowId {
    /// Raw slot index, for debug output.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SegmentId {
    /// Raw slot index, for debug output.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Slot<T> {
    record: T,
    free: bool,
}

#[derive(Clone, Debug, Default)]
struct Slab<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T: Default> Slab<T> {
    fn alloc(&mut self) -> u32 {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.free, "free list entry points at a live slot");
            slot.record = T::default();
            slot.free = false;
            index
        } else {
            let index = u32::try_from(self.slots.len()).expect("arena slot count overflow");
            self.slots.push(Slot {
                record: T::default(),
                free: false,
            });
            index
        }
    }

    fn recycle(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        assert!(!slot.free, "double recycle of arena slot {index}");
        // The record itself is left intact: ring traversal through a
        // just-recycled segment must keep working until the slot is reused.
        slot.free = true;
        self.free.push(index);
    }

    fn get(&self, index: u32) -> &T {
        let slot = &self.slots[index as usize];
        assert!(!slot.free, "access to freed arena slot {index}");
        &slot.record
    }

    /// Read a record even if its slot has been recycled (mid-removal ring
    /// traversal). Panics only on out-of-range handles.
    fn get_raw(&self, index: u32) -> &T {
        &self.slots[index as usize].record
    }

    fn get_mut(&mut self, index: u32) -> &mut T {
        let slot = &mut self.slots[index as usize];
        assert!(!slot.free, "access to freed arena slot {index}");
        &mut slot.record
    }

    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Snapshot of arena occupancy for [`Arena::release`].
#[derive(Clone, Debug)]
pub struct ArenaMark {
    rows_len: usize,
    segments_len: usize,
    rows_free: Vec<u32>,
    segments_free: Vec<u32>,
}

/// Occupancy counters, mainly for tests and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub rows_total: usize,
    pub rows_free: usize,
    pub segments_total: usize,
    pub segments_free: usize,
}

/// Bump-style allocator with per-kind free lists for geometry records.
#[derive(Clone, Debug, Default)]
pub struct Arena {
    rows: Slab<Row>,
    segments: Slab<Segment>,
}

impl Arena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a row record with default fields.
    pub fn alloc_row(&mut self) -> RowId {
        RowId(self.rows.alloc())
    }

    /// Allocate a segment record with default fields.
    ///
    /// The new segment's ring link points at itself: a freshly allocated
    /// segment is a well-formed single-row key.
    pub fn alloc_segment(&mut self) -> SegmentId {
        let id = SegmentId(self.segments.alloc());
        self.segments.get_mut(id.0).next_in_ring = id;
        id
    }

    /// Return a row record to the free list.
    pub fn recycle_row(&mut self, id: RowId) {
        self.rows.recycle(id.0);
    }

    /// Return a segment record to the free list.
    pub fn recycle_segment(&mut self, id: SegmentId) {
        self.segments.recycle(id.0);
    }

    /// Read access to a row record.
    #[must_use]
    pub fn row(&self, id: RowId) -> &Row {
        self.rows.get(id.0)
    }

    /// Write access to a row record.
    pub fn row_mut(&mut self, id: RowId) -> &mut Row {
        self.rows.get_mut(id.0)
    }

    /// Read access to a segment record.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> &Segment {
        self.segments.get(id.0)
    }

    /// Read access to a segment record that may already be recycled.
    ///
    /// Used while dismantling a ring, where links must stay readable after
    /// the record they live in has been freed.
    #[must_use]
    pub fn segment_raw(&self, id: SegmentId) -> &Segment {
        self.segments.get_raw(id.0)
    }

    /// Write access to a segment record.
    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        self.segments.get_mut(id.0)
    }

    /// Begin a speculative build region.
    #[must_use]
    pub fn mark(&self) -> ArenaMark {
        ArenaMark {
            rows_len: self.rows.slots.len(),
            segments_len: self.segments.slots.len(),
            rows_free: self.rows.free.clone(),
            segments_free: self.segments.free.clone(),
        }
    }

    /// Discard every allocation made since `mark`.
    pub fn release(&mut self, mark: &ArenaMark) {
        debug_assert!(self.rows.slots.len() >= mark.rows_len);
        debug_assert!(self.segments.slots.len() >= mark.segments_len);
        self.rows.slots.truncate(mark.rows_len);
        self.segments.slots.truncate(mark.segments_len);
        for &index in &mark.rows_free {
            self.rows.slots[index as usize].free = true;
        }
        for &index in &mark.segments_free {
            self.segments.slots[index as usize].free = true;
        }
        self.rows.free = mark.rows_free.clone();
        self.segments.free = mark.segments_free.clone();
    }

    /// Drop every record.
    pub fn reset(&mut self) {
        self.rows = Slab::default();
        self.segments = Slab::default();
    }

    /// Number of live row records.
    #[must_use]
    pub fn live_rows(&self) -> usize {
        self.rows.live()
    }

    /// Number of live segment records.
    #[must_use]
    pub fn live_segments(&self) -> usize {
        self.segments.live()
    }

    /// Occupancy counters.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            rows_total: self.rows.slots.len(),
            rows_free: self.rows.free.len(),
            segments_total: self.segments.slots.len(),
            segments_free: self.segments.free.len(),
        }
    }
}
