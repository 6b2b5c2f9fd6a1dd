//! Property-based tests for the save/load round trip.
//!
//! Uses proptest to verify that every well-formed document survives a
//! full parse → emit → parse cycle with identical structure, and that
//! the canonical emission is byte-stable.

mod common;

use keyplane::format::{load, save, save_debug};
use proptest::prelude::*;

proptest! {
    /// `load(save(M))` is structurally `M`.
    #[test]
    fn roundtrip_preserves_structure(text in common::doc_strategy()) {
        let layout = load(&text).expect("generated document parses");
        let saved = save(&layout);
        let reparsed = load(&saved).expect("canonical form parses");
        prop_assert!(layout.same_structure(&reparsed), "structure drifted:\n{saved}");
    }

    /// Canonical emission is a fixed point of parse → emit.
    #[test]
    fn save_is_byte_stable(text in common::doc_strategy()) {
        let layout = load(&text).expect("generated document parses");
        let saved = save(&layout);
        let again = save(&load(&saved).expect("canonical form parses"));
        prop_assert_eq!(saved, again);
    }

    /// The verbose debug form carries the same structure.
    #[test]
    fn debug_form_roundtrips(text in common::doc_strategy()) {
        let layout = load(&text).expect("generated document parses");
        let debug = save_debug(&layout);
        let reparsed = load(&debug).expect("debug form parses");
        prop_assert!(layout.same_structure(&reparsed), "debug form drifted:\n{debug}");
    }

    /// Loading never inflates the arena beyond what the document needs.
    #[test]
    fn load_allocates_exactly(text in common::doc_strategy()) {
        let layout = load(&text).expect("generated document parses");
        let stats = layout.arena().stats();
        prop_assert_eq!(stats.rows_free, 0);
        prop_assert_eq!(stats.segments_free, 0);
        prop_assert_eq!(stats.rows_total, layout.row_count());
    }
}
