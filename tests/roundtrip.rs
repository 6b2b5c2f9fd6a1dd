//! Concrete round-trip cases: real keyboard shapes through save/load.

use keyplane::format::{load, save, save_debug};
use keyplane::units::units_eq;

/// A 60%-ish board: stepped widths, a gap cluster, an ISO-style enter
/// spanning two rows, and a tall left-side key.
const BOARD: &str = "\
K(41) K(10) K(11) K(12) K(13) K(14, UG: 0.25) K(22, W: 2);\n\
K(23, W: 1.5) K(24) K(25) K(26) P(36, W: 1.5, UG: 0.25);\n\
K(66, W: 1.75) K(38) K(39) K(40) E(W: 1.25, R);\n\
0.5 K(65, W: 7, UG: 1);\n";

#[test]
fn full_board_round_trips() {
    let layout = load(BOARD).unwrap();
    let saved = save(&layout);
    let reparsed = load(&saved).unwrap();
    assert!(layout.same_structure(&reparsed));
    assert_eq!(save(&reparsed), saved);
}

#[test]
fn full_board_save_matches_input() {
    // The fixture is already in canonical form, so emission reproduces
    // it byte for byte.
    let layout = load(BOARD).unwrap();
    assert_eq!(save(&layout), BOARD);
}

#[test]
fn debug_form_is_loadable_and_equivalent() {
    let layout = load(BOARD).unwrap();
    let debug = save_debug(&layout);
    let reparsed = load(&debug).unwrap();
    assert!(layout.same_structure(&reparsed));
}

#[test]
fn iso_enter_geometry_survives() {
    let layout = load(BOARD).unwrap();
    let parent = layout.find_keycode(36).unwrap();
    assert_eq!(layout.ring_len(parent), 2);

    // The enter key hangs from the most constraining of its two rows.
    let reparsed = load(&save(&layout)).unwrap();
    let reparsed_parent = reparsed.find_keycode(36).unwrap();
    assert!(units_eq(
        layout.seg(parent).internal_glue,
        reparsed.seg(reparsed_parent).internal_glue
    ));

    let (width, height) = layout.bounding_size();
    let (rw, rh) = reparsed.bounding_size();
    assert!(units_eq(width, rw));
    assert!(units_eq(height, rh));
    assert!(units_eq(height, 3.5));
}

#[test]
fn empty_document_round_trips() {
    let layout = load("").unwrap();
    assert_eq!(save(&layout), "");
    assert_eq!(layout.bounding_size(), (0.0, 0.0));
}

#[test]
fn unassigned_keys_round_trip() {
    let text = "K(0) K(0, W: 2) K(30);\n";
    let layout = load(text).unwrap();
    assert_eq!(save(&layout), text);
    assert_eq!(layout.find_keycode(0), None);
}
