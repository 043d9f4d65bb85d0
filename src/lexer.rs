//! Tokenization of the patch text.
//!
//! The lexer covers the whole input: every byte belongs to exactly one
//! token, with an error token as catch-all, so the parser can report bad
//! lines and keep going instead of aborting.
//!
//! Matching is first-match-wins over an ordered set of patterns. The order
//! matters: a `#pragma` directive must be recognized before the generic
//! line comment that also starts with `#`.
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_until, take_while, take_while1};
use nom::character::complete::{char, digit1, hex_digit1, one_of};
use nom::combinator::{opt, recognize, rest};
use nom::error::{Error as NomError, ErrorKind as NomErrorKind};
use nom::sequence::preceded;
use nom::Parser;

use crate::error::Location;

/// Kind of a lexed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Whitespace,
    Pragma,
    Comment,
    Offset,
    Address,
    Number,
    Data,
    Placeholder,
    String,
    Comma,
    LineEscape,
    MultilineComment,
    UnfinishedComment,
    TrailingCommentEnd,
    Newline,
    Error,
}

/// A token with its raw text and starting location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub loc: Location,
}

/// Lazy tokenizer over the patch text.
pub(crate) struct Lexer<'a> {
    rest: &'a str,
    loc: Location,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            rest: text,
            loc: Location::start(),
        }
    }

    pub(crate) fn next_token(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        let (kind, text) = scan(self.rest);
        let loc = self.loc;
        self.rest = &self.rest[text.len()..];
        for c in text.chars() {
            if c == '\n' {
                self.loc.line += 1;
                self.loc.column = 1;
            } else {
                self.loc.column += 1;
            }
        }
        self.loc.offset += text.len();
        Some(Token { kind, text, loc })
    }
}

type LexResult<'a> = nom::IResult<&'a str, &'a str>;

fn scan(input: &str) -> (TokenKind, &str) {
    if let Ok((_, m)) = whitespace(input) {
        return (TokenKind::Whitespace, m);
    }
    if let Ok((_, m)) = pragma(input) {
        return (TokenKind::Pragma, m);
    }
    if let Ok((_, m)) = comment(input) {
        return (TokenKind::Comment, m);
    }
    if let Ok((_, m)) = offset(input) {
        return (TokenKind::Offset, m);
    }
    if let Ok((_, m)) = address(input) {
        return (TokenKind::Address, m);
    }
    if let Ok((_, m)) = number(input) {
        return (TokenKind::Number, m);
    }
    if let Ok((_, m)) = data(input) {
        return (TokenKind::Data, m);
    }
    if let Ok((_, m)) = placeholder(input) {
        return (TokenKind::Placeholder, m);
    }
    if let Ok((_, m)) = string_lit(input) {
        return (TokenKind::String, m);
    }
    if let Ok((_, m)) = comma(input) {
        return (TokenKind::Comma, m);
    }
    if let Ok((_, m)) = line_escape(input) {
        return (TokenKind::LineEscape, m);
    }
    if let Ok((_, m)) = multiline_comment(input) {
        return (TokenKind::MultilineComment, m);
    }
    if let Ok((_, m)) = unfinished_comment(input) {
        return (TokenKind::UnfinishedComment, m);
    }
    if let Ok((_, m)) = trailing_comment_end(input) {
        return (TokenKind::TrailingCommentEnd, m);
    }
    if let Ok((_, m)) = newline(input) {
        return (TokenKind::Newline, m);
    }
    if let Ok((_, m)) = error_run(input) {
        return (TokenKind::Error, m);
    }
    // A lone carriage return or similar right before a newline. Consume one
    // character so the lexer always makes progress.
    let len = input.chars().next().map_or(0, char::len_utf8);
    (TokenKind::Error, &input[..len])
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn next_is_word(rest: &str) -> bool {
    rest.chars().next().is_some_and(is_word)
}

/// Fail the recognizer without consuming anything.
fn no_match(input: &str) -> nom::Err<NomError<&str>> {
    nom::Err::Error(NomError::new(input, NomErrorKind::Fail))
}

/// Accepts the inner recognizer only when not followed by a word character,
/// like a `\b` boundary in a regex.
fn word_bounded<'a, F>(mut inner: F) -> impl FnMut(&'a str) -> LexResult<'a>
where
    F: Parser<&'a str, Output = &'a str, Error = NomError<&'a str>>,
{
    move |input| {
        let (remaining, matched) = inner.parse(input)?;
        if next_is_word(remaining) {
            Err(no_match(remaining))
        } else {
            Ok((remaining, matched))
        }
    }
}

fn whitespace(input: &str) -> LexResult {
    take_while1(|c| c == ' ' || c == '\t').parse(input)
}

fn pragma(input: &str) -> LexResult {
    recognize(preceded(
        tag("#pragma"),
        take_while1(|c: char| c == ' ' || c == '\t' || is_word(c)),
    ))
    .parse(input)
}

fn comment(input: &str) -> LexResult {
    recognize(preceded(
        alt((tag("//"), tag(";"), tag("#"))),
        take_while(|c| c != '\n'),
    ))
    .parse(input)
}

fn offset(input: &str) -> LexResult {
    recognize((
        one_of("+-"),
        alt((preceded(tag_no_case("0x"), hex_digit1), hex_digit1)),
    ))
    .parse(input)
}

fn address(input: &str) -> LexResult {
    alt((
        recognize((tag_no_case("0x"), hex_digit1, char(':'))),
        recognize((hex_digit1, char(':'))),
    ))
    .parse(input)
}

fn number(input: &str) -> LexResult {
    alt((
        word_bounded(recognize(preceded(tag("0x"), hex_digit1))),
        word_bounded(recognize(preceded(
            tag("0n"),
            take_while1(|c| c == '0' || c == '1'),
        ))),
        word_bounded(recognize((tag("0i"), opt(one_of("+-")), digit1))),
    ))
    .parse(input)
}

fn data(input: &str) -> LexResult {
    word_bounded(hex_digit1)(input)
}

/// Wildcard markers allowed inside hex placeholder data.
const WILDCARD_MARKERS: [&str; 14] = [
    "XX", "xx", "YY", "yy", "ZZ", "zz", "HH", "hh", "nn", "NN", "Nn", "MS", "ML", "??",
];

fn placeholder(input: &str) -> LexResult {
    if let Some(len) = placeholder_hex(input) {
        return Ok((&input[len..], &input[..len]));
    }
    if let Some(len) = placeholder_dec(input) {
        return Ok((&input[len..], &input[..len]));
    }
    Err(no_match(input))
}

/// Hex data with wildcard markers, eg `AAXX12` or `0x??12`.
fn placeholder_hex(input: &str) -> Option<usize> {
    // Both with and without the 0x prefix, the way the pattern backtracks.
    for prefix in [2usize, 0] {
        if prefix == 2 && !input.starts_with("0x") {
            continue;
        }
        let body = &input[prefix..];

        // Greedy scan, remembering every cut that already saw a marker.
        let mut pos = 0;
        let mut cuts = Vec::new();
        loop {
            if let Some(marker) = WILDCARD_MARKERS
                .iter()
                .find(|marker| body[pos..].starts_with(**marker))
            {
                pos += marker.len();
                cuts.push(pos);
            } else if body[pos..].starts_with(|c: char| c.is_ascii_hexdigit()) {
                pos += 1;
                if !cuts.is_empty() {
                    cuts.push(pos);
                }
            } else {
                break;
            }
        }
        // Longest cut not followed by a word character wins.
        if let Some(pos) = cuts
            .into_iter()
            .rev()
            .find(|pos| !next_is_word(&body[*pos..]))
        {
            return Some(prefix + pos);
        }
    }
    None
}

/// A `0i` decimal literal with wildcard digits, eg `0i1x?2`.
fn placeholder_dec(input: &str) -> Option<usize> {
    let body = input.strip_prefix("0i")?;
    let sign = usize::from(matches!(body.as_bytes().first(), Some(b'+' | b'-')));
    let body = &body[sign..];

    let mut pos = 0;
    let mut cuts = Vec::new();
    for c in body.chars() {
        if matches!(c, 'x' | 'y' | 'z' | '?') {
            pos += 1;
            cuts.push(pos);
        } else if c.is_ascii_digit() {
            pos += 1;
            if !cuts.is_empty() {
                cuts.push(pos);
            }
        } else {
            break;
        }
    }
    cuts.into_iter()
        .rev()
        .find(|pos| !next_is_word(&body[*pos..]))
        .map(|pos| 2 + sign + pos)
}

/// A quoted string. Double or single quote, backslash escapes, may span
/// lines. Escape decoding happens later; here only the extent matters.
fn string_lit(input: &str) -> LexResult {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('"' | '\''))) => c,
        _ => return Err(no_match(input)),
    };
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            let end = i + c.len_utf8();
            return Ok((&input[end..], &input[..end]));
        }
    }
    Err(no_match(input))
}

fn comma(input: &str) -> LexResult {
    tag(",").parse(input)
}

fn line_escape(input: &str) -> LexResult {
    alt((tag("\\\r\n"), tag("\\\n"))).parse(input)
}

fn multiline_comment(input: &str) -> LexResult {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

fn unfinished_comment(input: &str) -> LexResult {
    recognize(preceded(tag("/*"), rest)).parse(input)
}

fn trailing_comment_end(input: &str) -> LexResult {
    tag("*/").parse(input)
}

fn newline(input: &str) -> LexResult {
    alt((tag("\r\n"), tag("\n"))).parse(input)
}

/// Catch-all: anything up to the end of the line.
fn error_run(input: &str) -> LexResult {
    let end = input.find('\n').unwrap_or(input.len());
    if end == 0 {
        Err(no_match(input))
    } else {
        Ok((&input[end..], &input[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn lex(input: &str) -> Vec<(TokenKind, &str)> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        let mut consumed = 0;
        while let Some(token) = lexer.next_token() {
            // No gaps, no overlaps.
            assert_eq!(token.loc.offset, consumed);
            consumed += token.text.len();
            out.push((token.kind, token.text));
        }
        assert_eq!(consumed, input.len());
        out
    }

    use super::TokenKind as K;

    #[test]
    fn test_record_line() {
        assert_eq!(
            lex("A8123456: AA BB ; done\n"),
            vec![
                (K::Address, "A8123456:"),
                (K::Whitespace, " "),
                (K::Data, "AA"),
                (K::Whitespace, " "),
                (K::Data, "BB"),
                (K::Whitespace, " "),
                (K::Comment, "; done"),
                (K::Newline, "\n"),
            ]
        );
    }

    #[test]
    fn test_pragma_before_comment() {
        assert_eq!(
            lex("#pragma enable undo"),
            vec![(K::Pragma, "#pragma enable undo")]
        );
        assert_eq!(lex("# plain comment"), vec![(K::Comment, "# plain comment")]);
        // Without a body the directive degrades to a comment.
        assert_eq!(lex("#pragma"), vec![(K::Comment, "#pragma")]);
        // A trailing comment is not part of the pragma token.
        assert_eq!(
            lex("#pragma enable undo ; ok"),
            vec![(K::Pragma, "#pragma enable undo "), (K::Comment, "; ok")]
        );
    }

    #[test]
    fn test_offsets_and_addresses() {
        assert_eq!(lex("+123450"), vec![(K::Offset, "+123450")]);
        assert_eq!(lex("-0x1F"), vec![(K::Offset, "-0x1F")]);
        assert_eq!(lex("0x1F:"), vec![(K::Address, "0x1F:")]);
        assert_eq!(lex("AA:"), vec![(K::Address, "AA:")]);
        // No digits after the 0x prefix: the prefix digit is the offset.
        assert_eq!(lex("+0x"), vec![(K::Offset, "+0"), (K::Error, "x")]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("0x12"), vec![(K::Number, "0x12")]);
        assert_eq!(lex("0n1101"), vec![(K::Number, "0n1101")]);
        assert_eq!(lex("0i-123"), vec![(K::Number, "0i-123")]);
        assert_eq!(lex("0i+0"), vec![(K::Number, "0i+0")]);
        // A number must end on a word boundary.
        assert_eq!(lex("0x12g"), vec![(K::Error, "0x12g")]);
        assert_eq!(lex("0n1234"), vec![(K::Error, "0n1234")]);
        // ... but a comma is fine.
        assert_eq!(
            lex("0x12,0x34"),
            vec![(K::Number, "0x12"), (K::Comma, ","), (K::Number, "0x34")]
        );
    }

    #[test]
    fn test_data() {
        assert_eq!(lex("DEAD926E"), vec![(K::Data, "DEAD926E")]);
        assert_eq!(lex("ABr"), vec![(K::Error, "ABr")]);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(lex("XX"), vec![(K::Placeholder, "XX")]);
        assert_eq!(lex("AAXX12"), vec![(K::Placeholder, "AAXX12")]);
        assert_eq!(lex("0x??12"), vec![(K::Placeholder, "0x??12")]);
        assert_eq!(lex("0xXX"), vec![(K::Placeholder, "0xXX")]);
        assert_eq!(lex("0i1x?2"), vec![(K::Placeholder, "0i1x?2")]);
        assert_eq!(lex("0i-12x"), vec![(K::Placeholder, "0i-12x")]);
        // Backtracks to end on a non-word character.
        assert_eq!(
            lex("XX??Z"),
            vec![(K::Placeholder, "XX"), (K::Error, "??Z")]
        );
        // A wildcard marker is required.
        assert_eq!(lex("A?B"), vec![(K::Error, "A?B")]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex("\"abc\""), vec![(K::String, "\"abc\"")]);
        assert_eq!(lex("'abc'"), vec![(K::String, "'abc'")]);
        assert_eq!(lex(r#""a\"b""#), vec![(K::String, r#""a\"b""#)]);
        assert_eq!(lex("\"a\nb\""), vec![(K::String, "\"a\nb\"")]);
        // Unterminated: falls through to the error token.
        assert_eq!(lex("\"abc"), vec![(K::Error, "\"abc")]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("// c\n; c\n/* c */*/"),
            vec![
                (K::Comment, "// c"),
                (K::Newline, "\n"),
                (K::Comment, "; c"),
                (K::Newline, "\n"),
                (K::MultilineComment, "/* c */"),
                (K::TrailingCommentEnd, "*/"),
            ]
        );
        assert_eq!(
            lex("/* a\nb"),
            vec![(K::UnfinishedComment, "/* a\nb")]
        );
    }

    #[test]
    fn test_line_escape() {
        assert_eq!(
            lex("AA \\\nBB"),
            vec![
                (K::Data, "AA"),
                (K::Whitespace, " "),
                (K::LineEscape, "\\\n"),
                (K::Data, "BB"),
            ]
        );
    }

    #[test]
    fn test_locations() {
        let mut lexer = Lexer::new("AA: BB\n\tCC");
        let locs: Vec<(u32, u32)> = std::iter::from_fn(|| lexer.next_token())
            .map(|t| (t.loc.line, t.loc.column))
            .collect();
        // Tabs count as a single column.
        assert_eq!(locs, vec![(1, 1), (1, 4), (1, 5), (1, 7), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_lone_carriage_return() {
        assert_eq!(lex("\rAA"), vec![(K::Error, "\rAA")]);
    }
}
