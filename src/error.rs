//! Parsing diagnostics: errors, warnings and their rendering.
use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::pragma::{Pragma, PragmaAction};

/// Position inside the parsed text.
///
/// Lines and columns are 1-based, the way patch authors read them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number, counted in characters. Tabs count as one.
    pub column: u32,
    /// Byte offset from the beginning of the input.
    pub offset: usize,
}

impl Location {
    pub(crate) fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

/// A diagnostic produced while parsing a patch.
///
/// The same type carries both warnings and errors; the severity is intrinsic
/// to the kind of diagnostic and is reflected in [`ParseError::is_warning`]
/// and in which list of the parse result the value ends up in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    kind: ErrorKind,
    loc: Location,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, loc: Location) -> Self {
        Self { kind, loc }
    }

    /// Location of the diagnostic in the input.
    #[must_use]
    pub fn location(&self) -> Location {
        self.loc
    }

    /// Human-readable message, without the location suffix.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.message()
    }

    /// Supplementary hint, shown on its own line when present.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        self.kind.hint()
    }

    /// Whether this diagnostic is a warning rather than an error.
    ///
    /// Warnings never make a parse result invalid.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.kind.is_warning()
    }

    /// Convert to a [`Diagnostic`].
    ///
    /// This can be used to display the diagnostic in a user-friendly manner.
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic<()> {
        let diag = if self.kind.is_warning() {
            Diagnostic::warning()
        } else {
            Diagnostic::error()
        };
        let diag = diag.with_message(self.kind.message()).with_labels(vec![
            Label::primary((), self.loc.offset..(self.loc.offset + 1)),
        ]);
        match self.kind.hint() {
            Some(hint) => diag.with_notes(vec![hint]),
            None => diag,
        }
    }

    /// Render a plain-text excerpt of `text` pinpointing this diagnostic.
    ///
    /// See [`code_frame`].
    #[must_use]
    pub fn code_frame(&self, text: &str) -> String {
        code_frame(text, self.loc.line, self.loc.column)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at line {} col {}",
            self.kind.message(),
            self.loc.line,
            self.loc.column
        )?;
        if let Some(hint) = self.kind.hint() {
            write!(f, "\n{hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

const WRONG_DIGITS_HINT: &str = "Must be: 3 (for BYTE), 5 (for WORD), 8 (for 3 BYTES), \
10 (for DWORD), 13 (for 5 BYTES), 15 (for 6 BYTES),  17 (for 7 BYTES), 20 (for 8 BYTES).\
Use leading zeroes to match the number of digits.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// A token no rule knows what to do with.
    Syntax,

    /// An address with no data list at all.
    EmptyRecord,

    /// Raw hex data with an odd number of digits.
    HexDataOddLength { data: String },

    /// A numeric literal with an unrecognized shape.
    InvalidNumber { literal: String },

    /// An unsigned `0i` literal outside the range of its width class.
    UnsignedRange { literal: String, max: u64 },

    /// A signed `0i` literal outside the range of its width class.
    ///
    /// The negative bound equals the positive one.
    SignedRange { literal: String, max: i64 },

    /// A `0x` literal wider than 32 bits.
    HexRange { literal: String },

    /// A `0n` literal wider than 32 bits.
    BinRange { literal: String },

    /// A `0i` literal not zero-padded to its width class digit count.
    WrongDigitCount { literal: String },

    /// An address token whose hex part cannot be parsed.
    InvalidAddress { text: String },

    /// An address above FFFFFFFF.
    AddressRange { text: String },

    /// An offset token whose hex part cannot be parsed.
    InvalidOffset { text: String },

    /// An offset whose magnitude is above FFFFFFFF.
    OffsetRange { text: String },

    /// A `#pragma` directive with an unknown action or name.
    InvalidPragma { text: String },

    /// A string literal containing a bare comment marker.
    UnescapedCommentMarker { marker: String, literal: String },

    /// A `\xNN` escape outside the single-byte encoding range.
    BadEscape { sequence: String },

    /// An escape sequence with no meaning.
    UnknownEscape { sequence: String },

    /// A comment glued right after a number literal.
    NumberTouchesComment,

    /// A placeholder found in new data while placeholders are not allowed.
    PlaceholderInData,

    /// Old data shorter than the new data it is supposed to undo.
    OldDataTooShort { old: usize, new: usize },

    /// Warning: a `/* ...` comment running to the end of input.
    UnfinishedComment,

    /// Warning: a stray `*/`.
    TrailingCommentEnd,

    /// Warning: a pragma directive that does not change anything.
    UselessPragma { action: PragmaAction, name: Pragma },

    /// Warning: a pragma left differing from its default at end of patch.
    UncanceledPragma { name: Pragma, enabled: bool },

    /// Warning: a non-zero offset corrector left active at end of patch.
    UncanceledOffset { text: String },

    /// Warning: a record without old data, making undo impossible.
    MissingOldData,
}

impl ErrorKind {
    pub(crate) fn message(&self) -> String {
        match self {
            Self::Syntax => "Syntax error".to_owned(),
            Self::EmptyRecord => "Empty patch data record!".to_owned(),
            Self::HexDataOddLength { data } => {
                format!("Hex data ({data}) must be even length")
            }
            Self::InvalidNumber { literal } => format!("Invalid number: {literal}"),
            Self::UnsignedRange { literal, max } => {
                format!("Number {literal} exceeds allowed range 0 ... {max}")
            }
            Self::SignedRange { literal, max } => {
                format!("Number {literal} exceeds allowed range -{max} ... +{max}")
            }
            Self::HexRange { literal } => {
                format!("Number {literal} exceeds allowed range 0x00000000 ... 0xFFFFFFFF")
            }
            Self::BinRange { literal } => format!(
                "Number {literal} exceeds allowed range 0n0 ... \
                 0n11111111111111111111111111111111"
            ),
            Self::WrongDigitCount { literal } => {
                format!("The wrong number of digits in integer ({literal})")
            }
            Self::InvalidAddress { text } => format!("Invalid address: {text}"),
            Self::AddressRange { text } => {
                format!("Address {text} exceeds allowed range 00000000 ... FFFFFFFF")
            }
            Self::InvalidOffset { text } => format!("Invalid offset: {text}"),
            Self::OffsetRange { text } => {
                format!("Offset {text} exceeds allowed range 00000000 ... FFFFFFFF")
            }
            Self::InvalidPragma { text } => format!("Invalid PRAGMA: {text}"),
            Self::UnescapedCommentMarker { marker, literal } => {
                format!("Unescaped {marker} is not allowed in string: {literal}")
            }
            Self::BadEscape { sequence } => format!("Bad escape sequence ({sequence})"),
            Self::UnknownEscape { sequence } => {
                format!("Unknown escape sequence ({sequence})")
            }
            Self::NumberTouchesComment => {
                "No whitespace between number and comment".to_owned()
            }
            Self::PlaceholderInData => {
                "Found placeholder instead of real patch data".to_owned()
            }
            Self::OldDataTooShort { old, new } => {
                format!("Old data ({old} bytes) is less than new data ({new} bytes)")
            }
            Self::UnfinishedComment => "Unfinished multiline comment".to_owned(),
            Self::TrailingCommentEnd => "Trailing multiline comment end".to_owned(),
            Self::UselessPragma { action, name } => {
                format!("Useless \"#pragma {action} {name}\" has no effect")
            }
            Self::UncanceledPragma { name, .. } => {
                format!("Uncanceled pragma \"{name}\"")
            }
            Self::UncanceledOffset { text } => format!("Uncanceled offset {text}"),
            Self::MissingOldData => "Old data is not specified".to_owned(),
        }
    }

    pub(crate) fn hint(&self) -> Option<String> {
        match self {
            Self::WrongDigitCount { .. } => Some(WRONG_DIGITS_HINT.to_owned()),
            Self::UnescapedCommentMarker { .. } => Some(
                "Escape these ambiguous characters like this: \\/* or \\/\\/.".to_owned(),
            ),
            Self::BadEscape { .. } => Some("Allowed range: \\x00-\\x7F.".to_owned()),
            Self::UselessPragma { .. } => {
                Some("You can safely remove this line.".to_owned())
            }
            Self::UncanceledPragma { name, enabled } => {
                let action = if *enabled {
                    PragmaAction::Disable
                } else {
                    PragmaAction::Enable
                };
                Some(format!(
                    "Please put \"#pragma {action} {name}\" at the end of the patch."
                ))
            }
            Self::UncanceledOffset { .. } => {
                Some("Please put \"+0\" at the end of the patch.".to_owned())
            }
            Self::MissingOldData => Some("Undo operation is impossible!".to_owned()),
            _ => None,
        }
    }

    pub(crate) fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::UnfinishedComment
                | Self::TrailingCommentEnd
                | Self::UselessPragma { .. }
                | Self::UncanceledPragma { .. }
                | Self::UncanceledOffset { .. }
                | Self::MissingOldData
        )
    }
}

/// Render a plain-text excerpt of `text` around the 1-based `line`/`column`.
///
/// Shows up to 3 lines of context on each side of the target line. Every
/// line is prefixed with a right-aligned line number, the target line with a
/// leading `>`, and is followed by a caret line pointing at the column. Tabs
/// are expanded to 4-column stops, consistently between a content line and
/// its caret line.
#[must_use]
pub fn code_frame(text: &str, line: u32, column: u32) -> String {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let num_width = lines.len().to_string().len() + 1;

    let mut out = String::new();
    for (n, l) in (1u32..).zip(&lines) {
        if n.abs_diff(line) > 3 {
            continue;
        }
        let marker = if n == line { '>' } else { ' ' };
        out.push_str(&format!("{marker}{n:>num_width$} | {}\n", tabs_to_spaces(l)));
        if n == line {
            let prefix: String = l.chars().take(column.saturating_sub(1) as usize).collect();
            let pad: String = tabs_to_spaces(&prefix).chars().map(|_| ' ').collect();
            out.push_str(&format!(" {:num_width$} | {pad}^\n", ""));
        }
    }
    out
}

/// Compute the 1-based line/column of a byte offset in `text`.
///
/// An offset past the end of the text resolves to the last line with a
/// column of 1.
#[must_use]
pub fn loc_from_offset(text: &str, offset: usize) -> Location {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in text.char_indices() {
        if i >= offset {
            return Location {
                line,
                column,
                offset,
            };
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Location {
        line,
        column: 1,
        offset,
    }
}

fn tabs_to_spaces(line: &str) -> String {
    let mut out = String::new();
    let mut width = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = 4 - width % 4;
            for _ in 0..spaces {
                out.push(' ');
            }
            width += spaces;
        } else {
            width += 1;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_type_traits;

    #[test]
    fn test_display() {
        let err = ParseError::new(
            ErrorKind::HexDataOddLength {
                data: "B".to_owned(),
            },
            Location {
                line: 1,
                column: 10,
                offset: 9,
            },
        );
        assert_eq!(
            err.to_string(),
            "Hex data (B) must be even length at line 1 col 10"
        );
        assert!(!err.is_warning());

        let warn = ParseError::new(
            ErrorKind::MissingOldData,
            Location {
                line: 2,
                column: 7,
                offset: 9,
            },
        );
        assert_eq!(
            warn.to_string(),
            "Old data is not specified at line 2 col 7\nUndo operation is impossible!"
        );
        assert!(warn.is_warning());
    }

    #[test]
    fn test_to_diagnostic() {
        let err = ParseError::new(
            ErrorKind::Syntax,
            Location {
                line: 1,
                column: 3,
                offset: 2,
            },
        );
        let diag = err.to_diagnostic();
        assert_eq!(diag.message, "Syntax error");
        assert_eq!(diag.labels[0].range, 2..3);
    }

    #[test]
    fn test_code_frame() {
        let text = "AA: BB\nCC: DD EE\nEE: FF";
        assert_eq!(
            code_frame(text, 2, 5),
            "  1 | AA: BB\n\
             > 2 | CC: DD EE\n\
             \x20   |     ^\n\
             \x20 3 | EE: FF\n"
        );
    }

    #[test]
    fn test_code_frame_tabs() {
        // Tab expansion must stay consistent between the content line and
        // the caret line.
        let text = "\tAA: BB";
        assert_eq!(
            code_frame(text, 1, 2),
            "> 1 |     AA: BB\n\
             \x20   |     ^\n"
        );
    }

    #[test]
    fn test_code_frame_window() {
        let text = "1\n2\n3\n4\n5\n6\n7\n8\n9";
        let frame = code_frame(text, 5, 1);
        assert!(frame.contains("> 5 | 5\n"));
        assert!(frame.contains("  2 | 2\n"));
        assert!(frame.contains("  8 | 8\n"));
        assert!(!frame.contains("1 | 1"));
        assert!(!frame.contains("9 | 9"));
    }

    #[test]
    fn test_loc_from_offset() {
        let text = "AA: BB\nCC: DD";
        assert_eq!(
            loc_from_offset(text, 0),
            Location {
                line: 1,
                column: 1,
                offset: 0
            }
        );
        assert_eq!(
            loc_from_offset(text, 8),
            Location {
                line: 2,
                column: 2,
                offset: 8
            }
        );
        // Past the end of text: the column falls back to 1.
        assert_eq!(
            loc_from_offset(text, 100),
            Location {
                line: 2,
                column: 1,
                offset: 100
            }
        );
    }

    #[test]
    fn test_public_types() {
        test_type_traits(ParseError::new(ErrorKind::Syntax, Location::start()));
        test_type_traits(Location::start());
    }
}
