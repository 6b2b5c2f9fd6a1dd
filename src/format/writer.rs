//! Text emission for the keyboard format.
//!
//! The canonical form elides every field equal to its default (`W:` at 1,
//! `UG:` at 0, row height at 1) and omits derived state entirely; loading
//! it re-derives internal glue. The debug form adds the kind tags and
//! `IG:` values so a dump shows exactly what the glue engine decided.

use crate::arena::SegmentId;
use crate::layout::{Align, Layout, SegmentKind};
use crate::units::{DEFAULT_KEY_WIDTH, DEFAULT_ROW_HEIGHT, format_units, units_eq};
use std::fmt::Write as _;

/// Serialize a layout to the canonical save form.
#[must_use]
pub fn save(layout: &Layout) -> String {
    write_document(layout, false)
}

/// Serialize a layout to the verbose debug form.
#[must_use]
pub fn save_debug(layout: &Layout) -> String {
    write_document(layout, true)
}

fn write_document(layout: &Layout, debug: bool) -> String {
    let mut out = String::new();
    for row_index in 0..layout.row_count() {
        let row = layout.row_at(row_index);
        if !units_eq(row.height, DEFAULT_ROW_HEIGHT) {
            out.push_str(&format_units(row.height));
            out.push(' ');
        }
        for (i, &seg_id) in row.segments.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            write_key(layout, seg_id, debug, &mut out);
        }
        out.push_str(";\n");
    }
    out
}

fn write_key(layout: &Layout, seg_id: SegmentId, debug: bool, out: &mut String) {
    let seg = layout.seg(seg_id);
    match seg.kind {
        SegmentKind::Default | SegmentKind::Pressed => {
            let letter = if layout.is_multirow(seg_id) { 'P' } else { 'K' };
            let _ = write!(out, "{letter}({}", seg.keycode);
            if !units_eq(seg.width, DEFAULT_KEY_WIDTH) {
                let _ = write!(out, ", W: {}", format_units(seg.width));
            }
            if !units_eq(seg.user_glue, 0.0) {
                let _ = write!(out, ", UG: {}", format_units(seg.user_glue));
            }
            if debug {
                if seg.kind == SegmentKind::Pressed {
                    out.push_str(", P");
                }
                let _ = write!(out, ", IG: {}", format_units(seg.internal_glue));
            }
            out.push(')');
        }
        SegmentKind::Member => {
            out.push(member_letter(layout, seg_id));
            out.push('(');
            if debug {
                let _ = write!(out, "MSEG, IG: {}", format_units(seg.internal_glue));
            }
            out.push(')');
        }
        SegmentKind::MemberSized => {
            out.push(member_letter(layout, seg_id));
            let align = match seg.align {
                Align::Left => 'L',
                Align::Right => 'R',
            };
            let _ = write!(out, "(W: {}, {align}", format_units(seg.width));
            if debug {
                let _ = write!(out, ", MSIZ, IG: {}", format_units(seg.internal_glue));
            }
            out.push(')');
        }
    }
}

/// `E` for the member whose ring link returns to the parent, `S` otherwise.
fn member_letter(layout: &Layout, seg_id: SegmentId) -> char {
    let next = layout.seg(seg_id).next_in_ring;
    if layout.seg(next).is_parent() { 'E' } else { 'S' }
}
