//! Persistence: the compact text form of a keyboard layout.
//!
//! A layout saves to a line-oriented text document, one row per line,
//! with every default value elided; loading re-derives the fields the
//! glue engine owns. The encoding is deterministic: saving, loading and
//! saving again reproduces the bytes, which is what lets autosave diff
//! cheaply and version control stay quiet.
//!
//! # Examples
//!
//! ```
//! use keyplane::format::{load, save};
//!
//! let layout = load("K(30) K(31, W: 1.5);\n").unwrap();
//! assert_eq!(save(&layout), "K(30) K(31, W: 1.5);\n");
//! ```

mod parser;
mod writer;

pub use parser::{ParseError, load};
pub use writer::{save, save_debug};

use crate::error::Result;
use crate::layout::Layout;
use std::path::Path;

/// Load a layout from a file.
pub fn read_file(path: &Path) -> Result<Layout> {
    let text = std::fs::read_to_string(path)?;
    load(&text)
}

/// Write a layout's canonical form to a file.
///
/// An I/O failure leaves the in-memory layout untouched; the caller
/// reports it to the user and keeps editing.
pub fn write_file(layout: &Layout, path: &Path) -> Result<()> {
    std::fs::write(path, save(layout))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.kbd");
        let layout = load("P(30, W: 2);\nE();\nK(31);\n").unwrap();
        write_file(&layout, &path).unwrap();
        let loaded = read_file(&path).unwrap();
        assert!(layout.same_structure(&loaded));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = read_file(Path::new("/nonexistent/layout.kbd")).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
