//! Parser for the line-oriented keyboard text format.
//!
//! One row per line, terminated by `;`:
//!
//! ```text
//! document   := row_line*
//! row_line   := [height] key (' ' key)* ';'
//! key        := 'K(' kc [', W:' w] [', UG:' g] ')'        plain key
//!             | 'P(' kc [', W:' w] [', UG:' g] ')'        multirow parent
//!             | 'S(' ['W:' w [', ' align]] ')'            multirow member
//!             | 'E(' ['W:' w [', ' align]] ')'            member closing the ring
//! align      := 'L' | 'R'
//! ```
//!
//! Decimals always use the POSIX `.` separator. The debug save form adds
//! `P`, `MSEG`, `MSIZ` and `IG: <float>` tokens inside the parentheses;
//! they are accepted anywhere after the first field and never required.
//!
//! Multirow rings thread across lines by order: a `P(` opens a ring, and
//! on every following line the `S(`/`E(` tokens bind to the still-open
//! rings left to right in the order they were opened; `E(` closes its
//! ring. An `S`/`E` with no ring to bind to, or a later line that leaves
//! an open ring unserviced, is a malformed document, reported as
//! [`Error::Malformed`] rather than a scan error. A ring still open when
//! the input ends closes implicitly: the final member of a key may be
//! written `S(...)` on the last line it occupies.
//!
//! Parsing is fail-fast: the first error aborts with the scanner's
//! position and the partially built model is discarded.

use crate::arena::SegmentId;
use crate::error::{Error, Result};
use crate::layout::{Align, Layout, SegmentKind};
use crate::units::{MAX_ROW_SEGMENTS, MAX_ROWS};
use std::fmt;

/// Error type for document parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    line: u32,
    column: u32,
}

impl ParseError {
    /// Create a parse error at a 1-based line/column position.
    #[must_use]
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Human-readable description without the position.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line of the offending input.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column of the offending input.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

/// Parse a document into a fresh layout.
///
/// Derived fields (`internal_glue`) are recomputed after the full parse;
/// `IG:` values in debug-form input are accepted and discarded.
pub fn load(text: &str) -> Result<Layout> {
    let mut layout = Layout::new();
    let mut parser = Parser::new(text);
    match parser.parse_into(&mut layout) {
        Ok(()) => {
            layout.recompute_glue();
            layout.debug_validate();
            Ok(layout)
        }
        Err(e) => Err(e),
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    /// Skip spaces and tabs (not line breaks).
    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.bump();
        }
    }

    /// Skip any whitespace including line breaks.
    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse(ParseError::new(message, self.line, self.column))
    }

    fn malformed(&self, message: impl Into<String>) -> Error {
        Error::Malformed(format!("{} (line {})", message.into(), self.line))
    }

    /// Decimal with POSIX `.` separator.
    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        if self.eat(b'.') {
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        if self.pos == start {
            return Err(self.error("expected number"));
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("digits are ASCII");
        text.parse::<f64>()
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }

    fn integer(&mut self) -> Result<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected keycode"));
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("digits are ASCII");
        text.parse::<u32>()
            .map_err(|_| self.error(format!("keycode '{text}' out of range")))
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(b'A'..=b'Z' | b'a'..=b'z')) {
            self.bump();
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }
}

/// Fields collected from inside one `X(...)` group.
#[derive(Debug, Default)]
struct KeyFields {
    width: Option<f64>,
    user_glue: Option<f64>,
    align: Option<Align>,
    pressed: bool,
}

/// A ring opened by `P(` that still expects members on following lines.
struct OpenRing {
    parent: SegmentId,
    last: SegmentId,
}

struct Parser<'a> {
    scanner: Scanner<'a>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
        }
    }

    fn parse_into(&mut self, layout: &mut Layout) -> Result<()> {
        debug_assert_eq!(layout.row_count(), 0, "parse target must be empty");
        let mark = layout.arena().mark();
        let result = self.parse_document(layout);
        if result.is_err() {
            // Discard the speculative build so a reused arena stays clean.
            layout.rollback_parse(&mark);
        }
        result
    }

    fn parse_document(&mut self, layout: &mut Layout) -> Result<()> {
        let mut open: Vec<OpenRing> = Vec::new();
        self.scanner.skip_whitespace();
        while self.scanner.peek().is_some() {
            if layout.row_count() == MAX_ROWS {
                return Err(self.scanner.malformed(format!("more than {MAX_ROWS} rows")));
            }
            open = self.parse_row_line(layout, open)?;
            self.scanner.skip_whitespace();
        }
        // Rings still open here close implicitly: end of input ends the key.
        Ok(())
    }

    /// Parse one `row_line`, consuming the pending open rings and
    /// returning the rings still open after this row.
    fn parse_row_line(
        &mut self,
        layout: &mut Layout,
        mut pending: Vec<OpenRing>,
    ) -> Result<Vec<OpenRing>> {
        let mut height = 1.0;
        if matches!(self.scanner.peek(), Some(b'0'..=b'9' | b'.')) {
            height = self.scanner.number()?;
            if height <= 0.0 {
                return Err(self.scanner.error("row height must be positive"));
            }
        }
        let row = layout.push_row(height);
        let mut still_open: Vec<OpenRing> = Vec::new();

        loop {
            self.scanner.skip_blanks();
            let Some(byte) = self.scanner.peek() else {
                return Err(self.scanner.error("expected key or ';'"));
            };
            match byte {
                b';' => {
                    self.scanner.bump();
                    break;
                }
                b'K' | b'P' => {
                    self.scanner.bump();
                    let (keycode, fields) = self.parse_assigned_key(byte)?;
                    if layout.row(row).segments.len() == MAX_ROW_SEGMENTS {
                        return Err(self
                            .scanner
                            .malformed(format!("more than {MAX_ROW_SEGMENTS} keys in a row")));
                    }
                    if keycode != 0 && layout.find_keycode(keycode).is_some() {
                        return Err(self
                            .scanner
                            .malformed(format!("keycode {keycode} assigned twice")));
                    }
                    let width = fields.width.unwrap_or(1.0);
                    let user_glue = fields.user_glue.unwrap_or(0.0);
                    let at = layout.row(row).segments.len();
                    let seg = layout.insert_key(row, at, keycode, width, user_glue);
                    if fields.pressed {
                        layout.set_pressed(seg, true);
                    }
                    if byte == b'P' {
                        still_open.push(OpenRing {
                            parent: seg,
                            last: seg,
                        });
                    }
                }
                b'S' | b'E' => {
                    self.scanner.bump();
                    let fields = self.parse_member_key()?;
                    if pending.is_empty() {
                        return Err(self
                            .scanner
                            .malformed("multirow member with no open ring"));
                    }
                    let mut ring = pending.remove(0);
                    let at = layout.row(row).segments.len();
                    let width = fields.width.unwrap_or(0.0);
                    let seg = layout.insert_key(row, at, 0, width, 0.0);
                    {
                        let record = layout.seg_mut(seg);
                        if fields.width.is_some() {
                            record.kind = SegmentKind::MemberSized;
                            record.align = fields.align.unwrap_or(Align::Left);
                        } else {
                            record.kind = SegmentKind::Member;
                        }
                    }
                    layout.ring_insert_after(ring.last, seg);
                    if byte == b'S' {
                        ring.last = seg;
                        still_open.push(ring);
                    }
                }
                other => {
                    return Err(self
                        .scanner
                        .error(format!("unexpected character '{}'", other as char)));
                }
            }
        }

        if !pending.is_empty() {
            return Err(self
                .scanner
                .malformed("row skips an open multirow ring"));
        }
        if layout.row(row).segments.is_empty() {
            return Err(self.scanner.error("row line without keys"));
        }
        Ok(still_open)
    }

    /// `K(...)` / `P(...)` body: keycode then optional fields.
    fn parse_assigned_key(&mut self, letter: u8) -> Result<(u32, KeyFields)> {
        self.scanner.expect(b'(')?;
        self.scanner.skip_blanks();
        let keycode = self.scanner.integer()?;
        let fields = self.parse_fields()?;
        if fields.align.is_some() {
            return Err(self.scanner.error(format!(
                "alignment flag not allowed in '{}' key",
                letter as char
            )));
        }
        Ok((keycode, fields))
    }

    /// `S(...)` / `E(...)` body: every field optional.
    fn parse_member_key(&mut self) -> Result<KeyFields> {
        self.scanner.expect(b'(')?;
        self.scanner.skip_blanks();
        // First field, if any, comes without a leading comma.
        if self.scanner.eat(b')') {
            return Ok(KeyFields::default());
        }
        let mut fields = KeyFields::default();
        self.parse_field(&mut fields)?;
        let fields = self.parse_fields_from(fields)?;
        if fields.user_glue.is_some() {
            return Err(self.scanner.error("user glue not allowed on a member"));
        }
        if fields.pressed {
            return Err(self.scanner.error("pressed tag not allowed on a member"));
        }
        if fields.align.is_some() && fields.width.is_none() {
            return Err(self.scanner.error("alignment requires a width"));
        }
        Ok(fields)
    }

    /// Comma-separated fields up to `)`.
    fn parse_fields(&mut self) -> Result<KeyFields> {
        self.parse_fields_from(KeyFields::default())
    }

    fn parse_fields_from(&mut self, mut fields: KeyFields) -> Result<KeyFields> {
        loop {
            self.scanner.skip_blanks();
            if self.scanner.eat(b')') {
                return Ok(fields);
            }
            self.scanner.expect(b',')?;
            self.scanner.skip_blanks();
            self.parse_field(&mut fields)?;
        }
    }

    /// A single field: `W: f`, `UG: f`, `L`, `R`, or a debug token
    /// (`P`, `MSEG`, `MSIZ`, `IG: f` — accepted, not required).
    fn parse_field(&mut self, fields: &mut KeyFields) -> Result<()> {
        let name = self.scanner.ident();
        match name.as_str() {
            "W" => {
                self.scanner.expect(b':')?;
                self.scanner.skip_blanks();
                let width = self.scanner.number()?;
                if width <= 0.0 {
                    return Err(self.scanner.error("width must be positive"));
                }
                fields.width = Some(width);
            }
            "UG" => {
                self.scanner.expect(b':')?;
                self.scanner.skip_blanks();
                fields.user_glue = Some(self.scanner.number()?);
            }
            "IG" => {
                // Debug form only; the value is re-derived after parsing.
                self.scanner.expect(b':')?;
                self.scanner.skip_blanks();
                let _ = self.scanner.number()?;
            }
            "L" => fields.align = Some(Align::Left),
            "R" => fields.align = Some(Align::Right),
            "P" => fields.pressed = true,
            "MSEG" | "MSIZ" => {
                // Debug kind tags carry no information the letter and the
                // width field do not already encode.
            }
            "" => return Err(self.scanner.error("expected field name")),
            other => {
                return Err(self.scanner.error(format!("unknown field '{other}'")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::units_eq;

    #[test]
    fn test_parse_single_row() {
        let layout = load("K(30) K(31, W: 1.5) K(32, UG: 0.5);\n").unwrap();
        assert_eq!(layout.row_count(), 1);
        let row = layout.row_at(0);
        assert_eq!(row.segments.len(), 3);
        assert_eq!(layout.seg(row.segments[0]).keycode, 30);
        assert!(units_eq(layout.seg(row.segments[1]).width, 1.5));
        assert!(units_eq(layout.seg(row.segments[2]).user_glue, 0.5));
    }

    #[test]
    fn test_parse_row_height_and_multirow() {
        let layout = load("1.5 P(30, W: 2) K(31);\nS(W: 1, L) K(32) K(33);\n").unwrap();
        assert_eq!(layout.row_count(), 2);
        assert!(units_eq(layout.row_at(0).height, 1.5));
        let parent = layout.find_keycode(30).unwrap();
        assert!(layout.is_multirow(parent));
        let members = layout.ring_members(parent);
        assert_eq!(members.len(), 2);
        let child = layout.seg(members[1]);
        assert_eq!(child.kind, SegmentKind::MemberSized);
        assert_eq!(child.align, Align::Left);
        assert!(units_eq(child.width, 1.0));
    }

    #[test]
    fn test_open_ring_at_eof_closes_implicitly() {
        let layout = load("P(30);\nS();\n").unwrap();
        let parent = layout.find_keycode(30).unwrap();
        assert_eq!(layout.ring_len(parent), 2);
    }

    #[test]
    fn test_ring_closed_by_e() {
        let layout = load("P(30);\nE();\n").unwrap();
        let parent = layout.find_keycode(30).unwrap();
        assert_eq!(layout.ring_len(parent), 2);
    }

    #[test]
    fn test_member_without_ring_is_malformed() {
        let err = load("K(30) E();\n").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_row_skipping_ring_is_malformed() {
        let err = load("P(30);\nK(31);\n").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_duplicate_keycode_is_malformed() {
        let err = load("K(30) K(30);\n").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_scan_error_has_position() {
        let err = load("K(30) K(31;\n").unwrap_err();
        let Error::Parse(parse) = err else {
            panic!("expected scan error");
        };
        assert_eq!(parse.line(), 1);
        assert!(parse.column() > 1);
    }

    #[test]
    fn test_missing_semicolon() {
        assert!(matches!(load("K(30)\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_comma_decimal_rejected() {
        assert!(matches!(load("K(30, W: 1,5);\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_debug_tokens_accepted() {
        let layout = load("P(30, W: 2, IG: 0) K(31, P);\nE(W: 2, L, MSIZ, IG: 0.5);\n").unwrap();
        let parent = layout.find_keycode(30).unwrap();
        assert_eq!(layout.ring_len(parent), 2);
        // Pressed tag survives the parse as the render kind.
        let pressed = layout.find_keycode(31).unwrap();
        assert_eq!(layout.seg(pressed).kind, SegmentKind::Pressed);
        // IG from the input is discarded and re-derived.
        let child = layout.ring_members(parent)[1];
        assert!(units_eq(layout.seg(child).internal_glue, 0.0));
    }

    #[test]
    fn test_empty_document() {
        let layout = load("").unwrap();
        assert_eq!(layout.row_count(), 0);
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(load("K(30, Q: 1);\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_row_limit_enforced() {
        let mut text = String::new();
        for kc in 0..=MAX_ROWS {
            text.push_str(&format!("K({});\n", kc + 10));
        }
        let err = load(&text).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
