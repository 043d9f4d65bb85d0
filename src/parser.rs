//! Event-driven parser over the token stream.
//!
//! [`parse_raw`] walks the tokens with one token of lookahead and reports
//! every construct through the [`VkpEvents`] trait. Errors are confined to
//! the line they occur on: the parser skips to the next newline and keeps
//! going, so one bad line cannot hide the rest of the patch.
use crate::error::{ErrorKind, Location, ParseError};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::number::{
    decode_address, decode_hex_data, decode_number, decode_offset, decode_placeholder,
};
use crate::pragma::{decode_pragma, PragmaDirective};
use crate::string::decode_string;

/// A `#pragma` directive line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PragmaNode {
    /// The decoded directive.
    pub directive: PragmaDirective,
    /// Trailing comment text, empty if none.
    pub comment: String,
}

/// An offset corrector line, eg `+0x10`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetNode {
    /// The raw token text, kept for diagnostics.
    pub text: String,
    /// The signed corrector value.
    pub offset: i64,
    /// Trailing comment text, empty if none.
    pub comment: String,
}

/// One decoded data list of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchData {
    /// Location of the first data token.
    pub loc: Location,
    /// The concatenated bytes of the list.
    pub data: Vec<u8>,
    /// How many placeholder tokens contributed to the bytes.
    pub placeholders: usize,
}

/// A patch record: an address followed by one or two data lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataNode {
    /// The record address.
    pub address: u32,
    /// Trailing comment text, empty if none.
    pub comment: String,
    /// The expected old data, absent in the short record form.
    pub old: Option<PatchData>,
    /// The data to write.
    pub new: PatchData,
}

/// Receiver for parse events.
///
/// All methods default to doing nothing, implement only the ones needed.
pub trait VkpEvents {
    /// A `#pragma` line was parsed.
    fn on_pragma(&mut self, node: PragmaNode, loc: Location) {
        let _ = (node, loc);
    }

    /// A patch record was parsed.
    fn on_patch_data(&mut self, node: DataNode, loc: Location) {
        let _ = (node, loc);
    }

    /// An offset corrector line was parsed.
    fn on_offset(&mut self, node: OffsetNode, loc: Location) {
        let _ = (node, loc);
    }

    /// A run of standalone comments was parsed.
    fn on_comments(&mut self, comments: Vec<String>, loc: Location) {
        let _ = (comments, loc);
    }

    /// A non-fatal oddity was found.
    fn on_warning(&mut self, warning: ParseError) {
        let _ = warning;
    }

    /// A line failed to parse. `resume` is where parsing picks up again.
    fn on_error(&mut self, error: ParseError, resume: Location) {
        let _ = (error, resume);
    }
}

/// Parse the patch text, reporting constructs and diagnostics to `events`.
pub fn parse_raw<E: VkpEvents>(text: &str, events: &mut E) {
    Parser {
        lexer: Lexer::new(text),
        token: None,
        prev: None,
        events,
    }
    .run();
}

struct Parser<'a, E: VkpEvents> {
    lexer: Lexer<'a>,
    /// One token of lookahead.
    token: Option<Token<'a>>,
    /// The most recently consumed token.
    prev: Option<Token<'a>>,
    events: &'a mut E,
}

impl<'a, E: VkpEvents> Parser<'a, E> {
    fn run(&mut self) {
        while let Some(token) = self.peek() {
            let result = match token.kind {
                TokenKind::Address => self
                    .parse_record(token)
                    .map(|node| self.events.on_patch_data(node, token.loc)),
                TokenKind::Pragma => self
                    .parse_pragma(token)
                    .map(|node| self.events.on_pragma(node, token.loc)),
                TokenKind::Offset => self
                    .parse_offset(token)
                    .map(|node| self.events.on_offset(node, token.loc)),
                TokenKind::Newline | TokenKind::Whitespace => {
                    self.bump();
                    Ok(())
                }
                TokenKind::Comment
                | TokenKind::MultilineComment
                | TokenKind::UnfinishedComment => {
                    let comments = self.parse_comments();
                    self.events.on_comments(comments, token.loc);
                    Ok(())
                }
                TokenKind::TrailingCommentEnd => {
                    self.events
                        .on_warning(ParseError::new(ErrorKind::TrailingCommentEnd, token.loc));
                    self.bump();
                    Ok(())
                }
                _ => Err(ParseError::new(ErrorKind::Syntax, token.loc)),
            };

            if let Err(error) = result {
                // Drop the rest of the line and resume on the next one.
                let resume = self.location();
                while let Some(token) = self.peek() {
                    self.bump();
                    if token.kind == TokenKind::Newline {
                        break;
                    }
                }
                self.events.on_error(error, resume);
            }
        }
    }

    fn peek(&mut self) -> Option<Token<'a>> {
        if self.token.is_none() {
            self.token = self.lexer.next_token();
        }
        self.token
    }

    fn bump(&mut self) {
        self.prev = self.peek();
        self.token = self.lexer.next_token();
    }

    /// Location of the lookahead token, or the start of the text at EOF.
    fn location(&mut self) -> Location {
        self.peek().map_or_else(Location::start, |token| token.loc)
    }

    fn parse_pragma(&mut self, token: Token<'a>) -> Result<PragmaNode, ParseError> {
        let directive = decode_pragma(token.text, token.loc)?;
        self.bump();
        let comment = self.parse_comments_after_expr()?;
        Ok(PragmaNode { directive, comment })
    }

    fn parse_offset(&mut self, token: Token<'a>) -> Result<OffsetNode, ParseError> {
        let offset = decode_offset(token.text, token.loc)?;
        self.bump();
        let comment = self.parse_comments_after_expr()?;
        Ok(OffsetNode {
            text: token.text.to_owned(),
            offset,
            comment,
        })
    }

    fn parse_record(&mut self, token: Token<'a>) -> Result<DataNode, ParseError> {
        let address = decode_address(token.text, token.loc)?;
        self.bump();

        if !self.parse_record_separator()? {
            return Err(ParseError::new(ErrorKind::EmptyRecord, self.location()));
        }
        let first = self.parse_patch_data()?;
        let second = if self.parse_record_separator()? {
            Some(self.parse_patch_data()?)
        } else {
            None
        };
        let comment = self.parse_comments_after_expr()?;

        // With a single list the record has no old data to check against.
        let (old, new) = match second {
            Some(second) => (Some(first), second),
            None => (None, first),
        };
        Ok(DataNode {
            address,
            comment,
            old,
            new,
        })
    }

    /// One data list: items separated by commas or escaped line breaks,
    /// ending at whitespace, a newline or a comment.
    fn parse_patch_data(&mut self) -> Result<PatchData, ParseError> {
        let loc = self.location();
        let mut data = Vec::new();
        let mut placeholders = 0;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Comma | TokenKind::LineEscape => {
                    self.bump();
                }
                TokenKind::Data => {
                    data.extend(decode_hex_data(token.text, token.loc)?);
                    self.bump();
                }
                TokenKind::Placeholder => {
                    data.extend(decode_placeholder(token.text, token.loc)?);
                    placeholders += 1;
                    self.bump();
                }
                TokenKind::Number => {
                    data.extend(decode_number(token.text, token.loc)?);
                    self.bump();
                }
                TokenKind::String => {
                    data.extend(decode_string(token.text, token.loc)?);
                    self.bump();
                }
                TokenKind::Whitespace | TokenKind::Newline => break,
                TokenKind::Comment
                | TokenKind::MultilineComment
                | TokenKind::UnfinishedComment => {
                    // `0x12// c` is ambiguous to the eye, require a blank.
                    if self.prev.is_some_and(|prev| prev.kind == TokenKind::Number) {
                        return Err(ParseError::new(ErrorKind::NumberTouchesComment, token.loc));
                    }
                    break;
                }
                _ => return Err(ParseError::new(ErrorKind::Syntax, token.loc)),
            }
        }
        Ok(PatchData {
            loc,
            data,
            placeholders,
        })
    }

    /// Skip blanks between data lists. True if another list follows on the
    /// same logical line.
    fn parse_record_separator(&mut self) -> Result<bool, ParseError> {
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Newline
                | TokenKind::Comment
                | TokenKind::MultilineComment
                | TokenKind::UnfinishedComment => return Ok(false),
                TokenKind::Data
                | TokenKind::Placeholder
                | TokenKind::Number
                | TokenKind::String => return Ok(true),
                TokenKind::Whitespace | TokenKind::LineEscape => {
                    self.bump();
                }
                _ => return Err(ParseError::new(ErrorKind::Syntax, token.loc)),
            }
        }
        Ok(false)
    }

    /// Standalone comments up to and including the end of the line.
    fn parse_comments(&mut self) -> Vec<String> {
        let mut comments = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Newline => {
                    self.bump();
                    break;
                }
                TokenKind::Whitespace => {
                    self.bump();
                }
                TokenKind::Comment
                | TokenKind::MultilineComment
                | TokenKind::UnfinishedComment => {
                    if token.kind == TokenKind::UnfinishedComment {
                        self.events
                            .on_warning(ParseError::new(ErrorKind::UnfinishedComment, token.loc));
                    }
                    comments.push(comment_text(token.text));
                    self.bump();
                }
                _ => break,
            }
        }
        comments
    }

    /// The tail of an expression line: only comments may follow, joined
    /// into a single string.
    fn parse_comments_after_expr(&mut self) -> Result<String, ParseError> {
        let mut comments = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Newline => {
                    self.bump();
                    break;
                }
                TokenKind::Whitespace => {
                    self.bump();
                }
                TokenKind::Comment
                | TokenKind::MultilineComment
                | TokenKind::UnfinishedComment => {
                    if token.kind == TokenKind::UnfinishedComment {
                        self.events
                            .on_warning(ParseError::new(ErrorKind::UnfinishedComment, token.loc));
                    }
                    comments.push(comment_text(token.text));
                    self.bump();
                }
                _ => return Err(ParseError::new(ErrorKind::Syntax, token.loc)),
            }
        }
        Ok(comments.join(" "))
    }
}

/// Strip the comment markers from a comment token.
fn comment_text(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("//") {
        rest.to_owned()
    } else if let Some(rest) = text.strip_prefix([';', '#']) {
        rest.to_owned()
    } else if let Some(inner) = text.strip_prefix("/*") {
        // An unfinished comment has no closing marker but still loses its
        // last two characters.
        let mut chars = inner.chars();
        let _ = chars.next_back();
        let _ = chars.next_back();
        chars.as_str().to_owned()
    } else {
        text.to_owned()
    }
}
