//! Error types for keyplane.

use crate::format::ParseError;
use std::fmt;
use std::io;

/// Result type alias for keyplane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for keyplane operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error reading or writing a saved layout.
    Io(io::Error),
    /// Text could not be parsed into a layout.
    Parse(ParseError),
    /// Text parsed but the resulting structure is inconsistent
    /// (e.g. a multirow ring left open at end of input).
    Malformed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Malformed(msg) => write!(f, "malformed document: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
