//! Source positions for the Slate compiler.

/// A location in the source text.
///
/// Lines and columns are 1-based, the way editors print them. `len`
/// is the byte length of the region the span covers and drives the
/// caret underline in rendered diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub len: u32,
}

impl Span {
    pub fn new(line: u32, col: u32, len: u32) -> Span {
        Span { line, col, len }
    }

    /// The very start of a file, used when no better position is
    /// known.
    pub fn start() -> Span {
        Span {
            line: 1,
            col: 1,
            len: 0,
        }
    }
}
