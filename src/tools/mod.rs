//! Interactive edit tools and the session driving them.
//!
//! Every tool follows the same protocol: *begin* on a pointer press
//! captures state, zero or more *updates* on pointer motion preview the
//! result, and *commit* (release) or *cancel* (Escape) finalizes or
//! perfectly reverts. The session owns the layout, at most one active
//! tool, and the autosave sink fired on every commit.
//!
//! Reversibility is the load-bearing property here: tools that mutate
//! during the drag always recompute from the state captured at begin, so
//! a zero-delta update — and therefore cancel — reproduces the pre-begin
//! structure bit for bit.
//!
//! # Examples
//!
//! ```
//! use keyplane::{EditorSession, PointerEvent, ToolKind, format};
//!
//! let layout = format::load("K(30) K(31);\n").unwrap();
//! let mut session = EditorSession::new(layout);
//!
//! session.begin_tool(ToolKind::Split, &PointerEvent::new(0.5, 0.5));
//! session.cancel_tool();
//! assert_eq!(format::save(session.layout()), "K(30) K(31);\n");
//! ```

mod insert;
mod resize;
mod split;
mod vertical;

use crate::arena::SegmentId;
use crate::error::{Error, Result};
use crate::event::{LogLevel, emit_event, emit_log};
use crate::format;
use crate::layout::{Layout, Rect};
use crate::units::snap;
use bitflags::bitflags;
use std::io;

bitflags! {
    /// Modifier flags delivered with pointer events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift: disable grid snapping for the current gesture.
        const SHIFT = 0b0000_0001;
        /// Control key.
        const CTRL = 0b0000_0010;
        /// Alt/Option key.
        const ALT = 0b0000_0100;
        /// Super/Meta key.
        const SUPER = 0b0000_1000;
    }
}

/// A normalized pointer event in key units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Event with no modifiers.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            modifiers: Modifiers::empty(),
        }
    }

    /// Event with modifier flags.
    #[must_use]
    pub fn with_modifiers(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self { x, y, modifiers }
    }

    fn snapping(&self) -> bool {
        !self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Horizontal delta from a gesture start, snapped to the edit grid
    /// unless SHIFT is held.
    #[must_use]
    pub fn delta_x(&self, start: f64) -> f64 {
        let dx = self.x - start;
        if self.snapping() { snap(dx) } else { dx }
    }

    /// Vertical delta from a gesture start, snapped like [`delta_x`](Self::delta_x).
    #[must_use]
    pub fn delta_y(&self, start: f64) -> f64 {
        let dy = self.y - start;
        if self.snapping() { snap(dy) } else { dy }
    }

    /// The x position snapped to the edit grid unless SHIFT is held.
    #[must_use]
    pub fn snapped_x(&self) -> f64 {
        if self.snapping() { snap(self.x) } else { self.x }
    }
}

/// The tool the host has selected. Selection happens while idle; the
/// active gesture keeps the tool it began with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    ResizeEdge,
    ResizeSegment,
    ResizeRow,
    Split,
    VerticalExtend,
    VerticalShrink,
    AddKey,
    PushRight,
    DeleteKey,
}

impl ToolKind {
    fn name(self) -> &'static str {
        match self {
            Self::ResizeEdge => "resize-edge",
            Self::ResizeSegment => "resize-segment",
            Self::ResizeRow => "resize-row",
            Self::Split => "split",
            Self::VerticalExtend => "vertical-extend",
            Self::VerticalShrink => "vertical-shrink",
            Self::AddKey => "add-key",
            Self::PushRight => "push-right",
            Self::DeleteKey => "delete-key",
        }
    }
}

/// Captured state of the active gesture, one variant per tool.
#[derive(Debug)]
enum ActiveTool {
    ResizeEdge(resize::ResizeEdgeState),
    ResizeSegment(resize::ResizeSegmentState),
    ResizeRow(resize::ResizeRowState),
    Split(split::SplitState),
    VerticalExtend(vertical::ExtendState),
    VerticalShrink(vertical::ShrinkState),
    AddKey(insert::AddKeyState),
    PushRight(insert::PushRightState),
    DeleteKey(insert::DeleteKeyState),
}

impl ActiveTool {
    fn update(&mut self, layout: &mut Layout, event: &PointerEvent) {
        match self {
            Self::ResizeEdge(state) => state.update(layout, event),
            Self::ResizeSegment(state) => state.update(layout, event),
            Self::ResizeRow(state) => state.update(layout, event),
            Self::Split(state) => state.update(layout, event),
            Self::VerticalExtend(state) => state.update(layout, event),
            Self::VerticalShrink(state) => state.update(layout, event),
            Self::AddKey(state) => state.update(layout, event),
            Self::PushRight(state) => state.update(layout, event),
            Self::DeleteKey(_) => {}
        }
    }

    fn commit(&self, layout: &mut Layout) {
        match self {
            // Drag tools apply during update; commit just keeps the result.
            Self::ResizeEdge(_)
            | Self::ResizeSegment(_)
            | Self::ResizeRow(_)
            | Self::Split(_)
            | Self::PushRight(_) => {}
            Self::VerticalExtend(state) => state.commit(layout),
            Self::VerticalShrink(state) => state.commit(layout),
            Self::AddKey(state) => state.commit(layout),
            Self::DeleteKey(state) => state.commit(layout),
        }
    }

    fn cancel(&self, layout: &mut Layout) {
        match self {
            Self::ResizeEdge(state) => state.cancel(layout),
            Self::ResizeSegment(state) => state.cancel(layout),
            Self::ResizeRow(state) => state.cancel(layout),
            Self::Split(state) => state.cancel(layout),
            Self::VerticalExtend(state) => state.cancel(),
            Self::VerticalShrink(state) => state.cancel(),
            Self::PushRight(state) => state.cancel(layout),
            // One-shot tools mutate nothing before commit.
            Self::AddKey(_) | Self::DeleteKey(_) => {}
        }
    }

    /// The parent segment the gesture grabbed, if any.
    fn grab(&self, layout: &Layout) -> Option<SegmentId> {
        match self {
            Self::ResizeEdge(state) => Some(state.grab()),
            Self::ResizeSegment(state) => Some(state.grab(layout)),
            Self::ResizeRow(_) | Self::AddKey(_) => None,
            Self::Split(state) => Some(state.grab()),
            Self::VerticalExtend(state) => Some(state.grab()),
            Self::VerticalShrink(state) => Some(state.grab()),
            Self::PushRight(state) => Some(state.grab()),
            Self::DeleteKey(state) => Some(state.grab()),
        }
    }

    /// Rectangle the renderer should highlight for this gesture.
    fn preview(&self, layout: &Layout) -> Option<Rect> {
        match self {
            Self::Split(state) => state.preview(layout),
            Self::VerticalExtend(state) => state.preview(layout),
            Self::AddKey(state) => state.preview(layout),
            other => other
                .grab(layout)
                .and_then(|seg| layout.segment_rect(seg)),
        }
    }
}

type AutosaveSink = Box<dyn FnMut(&str) -> io::Result<()> + Send>;

/// The editor: a layout, the active tool, and the autosave hook.
///
/// All state lives here; operations take the session explicitly, and two
/// sessions never share anything.
#[derive(Default)]
pub struct EditorSession {
    layout: Layout,
    active: Option<ActiveTool>,
    autosave: Option<AutosaveSink>,
}

impl EditorSession {
    /// Create a session around a layout.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            active: None,
            autosave: None,
        }
    }

    /// The current layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Take the layout out of the session.
    #[must_use]
    pub fn into_layout(self) -> Layout {
        self.layout
    }

    /// Whether a gesture is in flight.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.active.is_some()
    }

    /// Install the autosave sink called with the canonical text after
    /// every committed edit.
    pub fn set_autosave<F>(&mut self, sink: F)
    where
        F: FnMut(&str) -> io::Result<()> + Send + 'static,
    {
        self.autosave = Some(Box::new(sink));
    }

    /// Start a gesture. Returns whether the event engaged the tool; a
    /// begin while another gesture is active is a defensive no-op.
    pub fn begin_tool(&mut self, kind: ToolKind, event: &PointerEvent) -> bool {
        if self.active.is_some() {
            return false;
        }
        let active = match kind {
            ToolKind::ResizeEdge => {
                resize::ResizeEdgeState::begin(&self.layout, event).map(ActiveTool::ResizeEdge)
            }
            ToolKind::ResizeSegment => {
                resize::ResizeSegmentState::begin(&self.layout, event)
                    .map(ActiveTool::ResizeSegment)
            }
            ToolKind::ResizeRow => {
                resize::ResizeRowState::begin(&self.layout, event).map(ActiveTool::ResizeRow)
            }
            ToolKind::Split => {
                split::SplitState::begin(&mut self.layout, event).map(ActiveTool::Split)
            }
            ToolKind::VerticalExtend => {
                vertical::ExtendState::begin(&self.layout, event).map(ActiveTool::VerticalExtend)
            }
            ToolKind::VerticalShrink => {
                vertical::ShrinkState::begin(&self.layout, event).map(ActiveTool::VerticalShrink)
            }
            ToolKind::AddKey => {
                insert::AddKeyState::begin(&self.layout, event).map(ActiveTool::AddKey)
            }
            ToolKind::PushRight => {
                insert::PushRightState::begin(&self.layout, event).map(ActiveTool::PushRight)
            }
            ToolKind::DeleteKey => {
                insert::DeleteKeyState::begin(&self.layout, event).map(ActiveTool::DeleteKey)
            }
        };
        let Some(active) = active else {
            return false;
        };
        if let Some(grab) = active.grab(&self.layout) {
            self.layout.set_pressed(grab, true);
        }
        emit_event("tool", kind.name());
        emit_log(LogLevel::Debug, &format!("begin {}", kind.name()));
        self.active = Some(active);
        true
    }

    /// Feed pointer motion into the active gesture. No-op while idle.
    pub fn update_tool(&mut self, event: &PointerEvent) {
        if let Some(mut active) = self.active.take() {
            active.update(&mut self.layout, event);
            self.active = Some(active);
        }
    }

    /// Finish the active gesture, autosaving the result.
    ///
    /// The edit is committed even when the autosave sink fails; the error
    /// is returned so the host can tell the user, and the in-memory
    /// layout is not touched by the failure.
    pub fn commit_tool(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        if let Some(grab) = active.grab(&self.layout) {
            self.layout.set_pressed(grab, false);
        }
        active.commit(&mut self.layout);
        self.layout.compact_rows();
        self.layout.debug_validate();
        self.autosave()
    }

    /// Abort the active gesture, restoring the pre-begin structure.
    pub fn cancel_tool(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Some(grab) = active.grab(&self.layout) {
            self.layout.set_pressed(grab, false);
        }
        active.cancel(&mut self.layout);
        self.layout.debug_validate();
    }

    /// Preview rectangle of the active gesture for the renderer.
    #[must_use]
    pub fn preview(&self) -> Option<Rect> {
        self.active.as_ref().and_then(|a| a.preview(&self.layout))
    }

    fn autosave(&mut self) -> Result<()> {
        let text = format::save(&self.layout);
        emit_event("autosave", &text);
        if let Some(sink) = &mut self.autosave {
            sink(&text).map_err(Error::Io)?;
        }
        Ok(())
    }
}
