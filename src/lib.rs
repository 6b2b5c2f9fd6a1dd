//! `keyplane` - keyboard geometry engine
//!
//! An in-memory, editable model of a physical keyboard's key layout: the
//! row/segment structure with multirow rings, the glue solver that keeps
//! multirow keys aligned while the user drags things around, a family of
//! exactly reversible edit tools, and the compact text format the whole
//! structure round-trips through byte for byte.
//!
//! The GTK shell, cairo rendering, XKB name tables and system
//! installation live in the host application; this crate is the part
//! that has to be right.
//!
//! # Examples
//!
//! ```
//! use keyplane::{EditorSession, PointerEvent, ToolKind, format};
//!
//! // Load, split the first key in half, save.
//! let layout = format::load("K(30, W: 2) K(31);\n").unwrap();
//! let mut session = EditorSession::new(layout);
//! session.begin_tool(ToolKind::Split, &PointerEvent::new(1.0, 0.5));
//! session.commit_tool().unwrap();
//! assert_eq!(format::save(session.layout()), "K(30) K(0) K(31);\n");
//! ```

// Crate-level lint configuration
#![warn(unsafe_code)]
#![allow(clippy::cast_possible_truncation)] // Intentional handle index casts
#![allow(clippy::cast_precision_loss)] // Intentional for unit math
#![allow(clippy::module_name_repetitions)] // Allow layout::Layout etc
#![allow(clippy::missing_errors_doc)] // Docs WIP
#![allow(clippy::missing_panics_doc)] // Docs WIP
#![allow(clippy::float_cmp)] // Unit values are exact binary fractions
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::use_self)] // Allow explicit type names in impl blocks
#![allow(clippy::items_after_statements)] // Common pattern in tests
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer

pub mod arena;
pub mod error;
pub mod event;
pub mod format;
pub mod layout;
pub mod tools;
pub mod units;

// Re-export core types at crate root
pub use arena::{Arena, ArenaMark, ArenaStats, RowId, SegmentId};
pub use error::{Error, Result};
pub use event::{LogLevel, emit_event, emit_log, set_event_callback, set_log_callback};
pub use format::ParseError;
pub use layout::{Align, Hit, Keycode, Layout, Rect, Row, Segment, SegmentExtent, SegmentKind};
pub use tools::{EditorSession, Modifiers, PointerEvent, ToolKind};
