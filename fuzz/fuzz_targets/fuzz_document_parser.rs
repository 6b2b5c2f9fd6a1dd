//! Fuzz target for the document parser.
//!
//! Tests that `load` handles arbitrary text without panicking: saved
//! layouts come from disk and may be damaged or hostile. Whatever does
//! parse must survive a save/load cycle with identical structure.

#![no_main]

use keyplane::format::{load, save};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(layout) = load(data) {
        let saved = save(&layout);
        let reparsed = load(&saved).expect("canonical emission must parse");
        assert!(
            layout.same_structure(&reparsed),
            "round trip changed the structure"
        );
    }
});
