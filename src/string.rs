//! Decoding of string literals into encoded byte buffers.
//!
//! Double-quoted strings encode to Windows-1251, single-quoted ones to
//! UTF-16LE. Escape sequences producing raw bytes bypass the encoding.
use crate::error::{ErrorKind, Location, ParseError};

/// Decode a `STRING` token, quotes included, into its bytes.
///
/// `loc` is the location of the opening quote and is used to position
/// escape-sequence diagnostics inside the literal.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn decode_string(raw: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    // Comment markers inside a string would change meaning if the text were
    // ever reformatted, so they must be escaped.
    if let Some(marker) = ["/*", "*/", "//"]
        .into_iter()
        .filter(|marker| raw.contains(*marker))
        .min_by_key(|marker| raw.find(marker).unwrap_or(usize::MAX))
    {
        return Err(ParseError::new(
            ErrorKind::UnescapedCommentMarker {
                marker: marker.to_owned(),
                literal: raw.to_owned(),
            },
            loc,
        ));
    }

    let unicode = raw.starts_with('\'');
    let text: Vec<(usize, char)> = raw[1..raw.len() - 1].char_indices().collect();

    // Position of the i-th inner character: the column moves by characters,
    // the offset by bytes past the opening quote.
    let str_loc = |i: usize| Location {
        line: loc.line,
        column: loc.column + i as u32,
        offset: loc.offset + 1 + text.get(i).map_or(raw.len() - 1, |(b, _)| *b),
    };
    let unknown_escape = |sequence: String, i: usize| {
        ParseError::new(ErrorKind::UnknownEscape { sequence }, str_loc(i))
    };

    let mut out = Vec::new();
    let mut run = String::new();
    let mut flush = |run: &mut String, out: &mut Vec<u8>| {
        if !run.is_empty() {
            encode_run(run, unicode, out);
            run.clear();
        }
    };

    let mut i = 0;
    while i < text.len() {
        let c = text[i].1;
        if c != '\\' {
            run.push(c);
            i += 1;
            continue;
        }

        // Escape sequence; i points at the character after the backslash.
        i += 1;
        let Some(&(_, c)) = text.get(i) else {
            break;
        };
        match c {
            // Escaped line break, swallowed.
            '\r' => {
                i += 1;
                if text.get(i).is_some_and(|&(_, c)| c == '\n') {
                    i += 1;
                }
            }
            '\n' => i += 1,
            'x' => {
                let hex: String = text[i + 1..].iter().take(2).map(|&(_, c)| c).collect();
                let value = (hex.len() == 2)
                    .then(|| u8::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .ok_or_else(|| unknown_escape(format!("\\x{hex}"), i))?;
                flush(&mut run, &mut out);
                if unicode {
                    out.extend_from_slice(&[value, 0x00]);
                } else {
                    if value >= 0x7F {
                        return Err(ParseError::new(
                            ErrorKind::BadEscape {
                                sequence: format!("\\x{hex}"),
                            },
                            str_loc(i),
                        ));
                    }
                    out.push(value);
                }
                i += 3;
            }
            'u' => {
                let hex: String = text[i + 1..].iter().take(4).map(|&(_, c)| c).collect();
                if hex.len() != 4 || !unicode {
                    return Err(unknown_escape(format!("\\u{hex}"), i));
                }
                let value = u16::from_str_radix(&hex, 16)
                    .map_err(|_| unknown_escape(format!("\\u{hex}"), i))?;
                flush(&mut run, &mut out);
                out.extend_from_slice(&value.to_le_bytes());
                i += 5;
            }
            '0'..='7' => {
                let digits: String = text[i..]
                    .iter()
                    .take(3)
                    .map(|&(_, c)| c)
                    .take_while(|c| ('0'..='7').contains(c))
                    .collect();
                let value = u32::from_str_radix(&digits, 8)
                    .ok()
                    .filter(|v| *v <= 0xFF)
                    .ok_or_else(|| unknown_escape(format!("\\{digits}"), i))?;
                flush(&mut run, &mut out);
                if unicode {
                    out.extend_from_slice(&[value as u8, 0x00]);
                } else {
                    out.push(value as u8);
                }
                i += digits.len();
            }
            _ => {
                match escape_char(c) {
                    Some(escaped) => run.push(escaped),
                    None => return Err(unknown_escape(format!("\\{c}"), i)),
                }
                i += 1;
            }
        }
    }

    flush(&mut run, &mut out);
    Ok(out)
}

/// Single-character escapes, appended to the text run so they go through
/// the string encoding like ordinary characters.
fn escape_char(c: char) -> Option<char> {
    Some(match c {
        'a' => '\x07',
        'b' => '\x08',
        't' => '\t',
        'r' => '\r',
        'n' => '\n',
        'v' => '\x0B',
        'f' => '\x0C',
        'e' => '\x1B',
        '\\' | '/' | '*' | '"' | '\'' | '`' | ' ' => c,
        _ => return None,
    })
}

/// Encode a run of text, UTF-16LE for unicode strings and Windows-1251
/// otherwise. Characters with no Windows-1251 mapping become `?`.
fn encode_run(run: &str, unicode: bool, out: &mut Vec<u8>) {
    if unicode {
        for unit in run.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    } else {
        let mut buf = [0_u8; 4];
        for c in run.chars() {
            let (bytes, _, unmappable) =
                encoding_rs::WINDOWS_1251.encode(c.encode_utf8(&mut buf));
            if unmappable {
                out.push(b'?');
            } else {
                out.extend_from_slice(&bytes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn decode_ok(raw: &str, expected: &[u8]) {
        assert_eq!(decode_string(raw, Location::start()).unwrap(), expected, "{raw}");
    }

    #[track_caller]
    fn decode_err(raw: &str, display: &str) {
        let err = decode_string(raw, Location::start()).unwrap_err();
        assert_eq!(err.to_string(), display, "{raw}");
    }

    #[test]
    fn test_plain_strings() {
        decode_ok("\"ABC\"", b"ABC");
        decode_ok("''", b"");
        decode_ok("'AB'", &[0x41, 0x00, 0x42, 0x00]);
    }

    #[test]
    fn test_cp1251() {
        decode_ok("\"Привет\"", &[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        // No mapping: replaced with a question mark.
        decode_ok("\"a\u{2603}b\"", b"a?b");
    }

    #[test]
    fn test_utf16() {
        decode_ok("'Ж'", &[0x16, 0x04]);
        decode_ok("'\u{2603}'", &[0x03, 0x26]);
    }

    #[test]
    fn test_char_escapes() {
        decode_ok("\"a\\tb\"", &[0x61, 0x09, 0x62]);
        decode_ok("\"\\a\\e\"", &[0x07, 0x1B]);
        decode_ok("\"\\\\\\\"\"", b"\\\"");
        decode_ok("'\\n'", &[0x0A, 0x00]);
        decode_err(
            "\"\\q\"",
            "Unknown escape sequence (\\q) at line 1 col 2",
        );
    }

    #[test]
    fn test_hex_escapes() {
        decode_ok("\"\\x41\"", &[0x41]);
        decode_ok("\"\\x00\"", &[0x00]);
        // No range limit in unicode strings, and a zero high byte is added.
        decode_ok("'\\xFF'", &[0xFF, 0x00]);
        decode_err(
            "\"\\x7F\"",
            "Bad escape sequence (\\x7F) at line 1 col 2\nAllowed range: \\x00-\\x7F.",
        );
        decode_err(
            "\"\\xG1\"",
            "Unknown escape sequence (\\xG1) at line 1 col 2",
        );
        decode_err("\"\\x4\"", "Unknown escape sequence (\\x4) at line 1 col 2");
    }

    #[test]
    fn test_unicode_escapes() {
        decode_ok("'\\u0416'", &[0x16, 0x04]);
        decode_err(
            "\"\\u0416\"",
            "Unknown escape sequence (\\u0416) at line 1 col 2",
        );
        decode_err("'\\u041'", "Unknown escape sequence (\\u041) at line 1 col 2");
    }

    #[test]
    fn test_octal_escapes() {
        decode_ok("\"\\101\"", &[0x41]);
        decode_ok("\"\\0\"", &[0x00]);
        decode_ok("\"\\78\"", &[0x07, 0x38]);
        decode_ok("'\\101'", &[0x41, 0x00]);
        decode_err("\"\\777\"", "Unknown escape sequence (\\777) at line 1 col 2");
    }

    #[test]
    fn test_line_continuation() {
        decode_ok("\"a\\\nb\"", b"ab");
        decode_ok("\"a\\\r\nb\"", b"ab");
    }

    #[test]
    fn test_comment_markers() {
        decode_err(
            "\"a//b\"",
            "Unescaped // is not allowed in string: \"a//b\" at line 1 col 1\n\
             Escape these ambiguous characters like this: \\/* or \\/\\/.",
        );
        decode_err(
            "\"/*b\"",
            "Unescaped /* is not allowed in string: \"/*b\" at line 1 col 1\n\
             Escape these ambiguous characters like this: \\/* or \\/\\/.",
        );
        // Escaping does not help, the marker check looks at the raw text.
        decode_err(
            "\"\\/\\*/b\"",
            "Unescaped */ is not allowed in string: \"\\/\\*/b\" at line 1 col 1\n\
             Escape these ambiguous characters like this: \\/* or \\/\\/.",
        );
    }

    #[test]
    fn test_escape_error_location() {
        let loc = Location {
            line: 3,
            column: 10,
            offset: 50,
        };
        let err = decode_string("\"ab\\x7F\"", loc).unwrap_err();
        // Column of the escape letter, counted from the opening quote.
        assert_eq!(err.location().line, 3);
        assert_eq!(err.location().column, 13);
        assert_eq!(err.location().offset, 54);
    }
}
