//! Source location tracking for diagnostics and debug info.
//!
//! Every AST and IR node carries a [`FileLocation`]. The filename is shared
//! behind an `Rc` so the per-node cost is a pointer copy, not a string copy.

use std::fmt;
use std::rc::Rc;

/// A position in a source file.
///
/// Diagnostics render this as `filename(line,column)`, the format the
/// engine's own tooling uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    filename: Rc<str>,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (0-indexed, reset on every new line).
    pub column: u32,
}

/// A location without the filename.
///
/// Parsers thread this across token boundaries so they don't copy the
/// filename into every token; it is merged back into a [`FileLocation`]
/// with [`FileLocation::with_partial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartialLocation {
    pub line: u32,
    pub column: u32,
}

impl FileLocation {
    pub fn new(filename: impl Into<Rc<str>>, line: u32, column: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Advance to the start of the next line.
    pub fn next_line(&mut self) {
        self.line += 1;
        self.column = 0;
    }

    /// The `(line, column)` view of this location.
    pub fn partial(&self) -> PartialLocation {
        PartialLocation {
            line: self.line,
            column: self.column,
        }
    }

    /// This location's file combined with `part`'s position.
    pub fn with_partial(&self, part: PartialLocation) -> FileLocation {
        FileLocation {
            filename: Rc::clone(&self.filename),
            line: part.line,
            column: part.column,
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.filename, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let loc = FileLocation::new("Actor.psc", 12, 4);
        assert_eq!(format!("{}", loc), "Actor.psc(12,4)");
    }

    #[test]
    fn next_line_resets_column() {
        let mut loc = FileLocation::new("a.psc", 3, 17);
        loc.next_line();
        assert_eq!(loc.line, 4);
        assert_eq!(loc.column, 0);
    }

    #[test]
    fn partial_round_trip() {
        let loc = FileLocation::new("a.psc", 5, 9);
        let part = loc.partial();
        assert_eq!(part.line, 5);
        assert_eq!(part.column, 9);

        let other = FileLocation::new("a.psc", 1, 0);
        let merged = other.with_partial(part);
        assert_eq!(merged, loc);
    }

    #[test]
    fn with_partial_keeps_filename() {
        let loc = FileLocation::new("Quest.psc", 1, 0);
        let merged = loc.with_partial(PartialLocation { line: 40, column: 2 });
        assert_eq!(merged.filename(), "Quest.psc");
        assert_eq!(merged.line, 40);
    }

    #[test]
    fn clone_shares_filename() {
        let loc = FileLocation::new("a.psc", 1, 0);
        let copy = loc.clone();
        assert_eq!(loc.filename(), copy.filename());
    }
}
