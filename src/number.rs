//! Decoding of numeric tokens into little-endian byte buffers.
//!
//! Every decoder takes the raw token text plus its location and returns
//! either the encoded bytes or a positioned diagnostic.
use crate::error::{ErrorKind, Location, ParseError};

/// Digit-count thresholds for `0i` literals, mapped to the encoded width.
///
/// A literal is assigned the first class whose digit count is big enough;
/// apart from the byte class, the digits must then be zero-padded to exactly
/// the threshold.
const INT_WIDTHS: [(usize, usize); 8] = [
    (3, 1),
    (5, 2),
    (8, 3),
    (10, 4),
    (13, 5),
    (15, 6),
    (17, 7),
    (20, 8),
];

/// Decode a run of raw hex data, eg `DEAD926E`, into its bytes.
pub(crate) fn decode_hex_data(data: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    if data.len() % 2 != 0 {
        return Err(ParseError::new(
            ErrorKind::HexDataOddLength {
                data: data.to_owned(),
            },
            loc,
        ));
    }
    data.as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            // The lexer only emits hex digits here, but the conversion is
            // kept fallible to avoid trusting the caller.
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| {
                    ParseError::new(
                        ErrorKind::InvalidNumber {
                            literal: data.to_owned(),
                        },
                        loc,
                    )
                })
        })
        .collect()
}

/// Decode a `0x`/`0n`/`0i` literal into little-endian bytes.
///
/// The byte width is derived from the literal itself: the hex digit count
/// for `0x`, the bit count for `0n`, and the digit-count class for `0i`.
pub(crate) fn decode_number(literal: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    if let Some(rest) = literal.strip_prefix("0i") {
        if rest.starts_with(['+', '-']) && rest.len() > 1 && is_decimal(&rest[1..]) {
            return decode_signed(literal, rest, loc);
        }
        if !rest.is_empty() && is_decimal(rest) {
            return decode_unsigned(literal, rest, loc);
        }
    } else if let Some(digits) = literal.strip_prefix("0x") {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return decode_hex_number(literal, digits, loc);
        }
    } else if let Some(bits) = literal.strip_prefix("0n") {
        if !bits.is_empty() && bits.bytes().all(|b| b == b'0' || b == b'1') {
            return decode_bin_number(literal, bits, loc);
        }
    }

    Err(ParseError::new(
        ErrorKind::InvalidNumber {
            literal: literal.to_owned(),
        },
        loc,
    ))
}

fn is_decimal(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn invalid_number(literal: &str, loc: Location) -> ParseError {
    ParseError::new(
        ErrorKind::InvalidNumber {
            literal: literal.to_owned(),
        },
        loc,
    )
}

/// A `0i` literal with an explicit sign. `signed` includes the sign.
#[allow(clippy::cast_possible_truncation)]
fn decode_signed(literal: &str, signed: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    let digits = signed.len() - 1;
    for (threshold, size) in INT_WIDTHS {
        if digits > threshold {
            continue;
        }
        let max: i128 = if size == 8 {
            i128::from(i64::MAX)
        } else {
            (1 << (size * 8 - 1)) - 1
        };
        let value: i128 = signed.parse().map_err(|_| invalid_number(literal, loc))?;
        if value < -max || value > max {
            return Err(ParseError::new(
                ErrorKind::SignedRange {
                    literal: literal.to_owned(),
                    max: max as i64,
                },
                loc,
            ));
        }
        if digits < threshold && threshold > 3 {
            return Err(ParseError::new(
                ErrorKind::WrongDigitCount {
                    literal: literal.to_owned(),
                },
                loc,
            ));
        }
        // Range-checked above, so the value fits in an i64; the two's
        // complement little-endian bytes are then truncated to the width.
        return Ok((value as i64).to_le_bytes()[..size].to_vec());
    }
    Err(invalid_number(literal, loc))
}

/// A `0i` literal without a sign.
#[allow(clippy::cast_possible_truncation)]
fn decode_unsigned(literal: &str, digits: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    for (threshold, size) in INT_WIDTHS {
        if digits.len() > threshold {
            continue;
        }
        let max: u128 = if size == 8 {
            u128::from(u64::MAX)
        } else {
            (1 << (size * 8)) - 1
        };
        let value: u128 = digits.parse().map_err(|_| invalid_number(literal, loc))?;
        if value > max {
            return Err(ParseError::new(
                ErrorKind::UnsignedRange {
                    literal: literal.to_owned(),
                    max: max as u64,
                },
                loc,
            ));
        }
        if digits.len() < threshold && threshold > 3 {
            return Err(ParseError::new(
                ErrorKind::WrongDigitCount {
                    literal: literal.to_owned(),
                },
                loc,
            ));
        }
        return Ok((value as u64).to_le_bytes()[..size].to_vec());
    }
    Err(invalid_number(literal, loc))
}

/// A `0x` literal. At most 32 bits; an odd digit count is padded.
fn decode_hex_number(literal: &str, digits: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    let padded_len = digits.len() + digits.len() % 2;
    if padded_len > 8 {
        return Err(ParseError::new(
            ErrorKind::HexRange {
                literal: literal.to_owned(),
            },
            loc,
        ));
    }
    let value =
        u32::from_str_radix(digits, 16).map_err(|_| invalid_number(literal, loc))?;
    Ok(value.to_le_bytes()[..padded_len / 2].to_vec())
}

/// A `0n` binary literal. At most 32 bits; the width rounds up to bytes.
fn decode_bin_number(literal: &str, bits: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    if bits.len() > 32 {
        return Err(ParseError::new(
            ErrorKind::BinRange {
                literal: literal.to_owned(),
            },
            loc,
        ));
    }
    let value = u32::from_str_radix(bits, 2).map_err(|_| invalid_number(literal, loc))?;
    Ok(value.to_le_bytes()[..bits.len().div_ceil(8)].to_vec())
}

/// Decode an `ADDRESS` token (trailing `:`, optional `0x`) into a `u32`.
pub(crate) fn decode_address(text: &str, loc: Location) -> Result<u32, ParseError> {
    let invalid = || {
        ParseError::new(
            ErrorKind::InvalidAddress {
                text: text.to_owned(),
            },
            loc,
        )
    };

    let digits = text.strip_suffix(':').ok_or_else(invalid)?;
    let digits = strip_hex_prefix(digits);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 8 {
        return Err(ParseError::new(
            ErrorKind::AddressRange {
                text: text.to_owned(),
            },
            loc,
        ));
    }
    u32::from_str_radix(digits, 16).map_err(|_| invalid())
}

/// Decode an `OFFSET` token (`+`/`-`, optional `0x`, hex digits).
///
/// The magnitude must fit in 32 bits; the signed result is returned as an
/// `i64` so a negative corrector keeps its sign.
pub(crate) fn decode_offset(text: &str, loc: Location) -> Result<i64, ParseError> {
    let invalid = || {
        ParseError::new(
            ErrorKind::InvalidOffset {
                text: text.to_owned(),
            },
            loc,
        )
    };

    let (negative, rest) = match text.as_bytes().first() {
        Some(b'+') => (false, &text[1..]),
        Some(b'-') => (true, &text[1..]),
        _ => return Err(invalid()),
    };
    let digits = strip_hex_prefix(rest);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 8 {
        return Err(ParseError::new(
            ErrorKind::OffsetRange {
                text: text.to_owned(),
            },
            loc,
        ));
    }
    let magnitude = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    let magnitude = i64::from(magnitude);
    Ok(if negative { -magnitude } else { magnitude })
}

/// Decode a `PLACEHOLDER` token by substituting every wildcard character
/// with a zero digit and decoding the result as the matching token kind.
pub(crate) fn decode_placeholder(text: &str, loc: Location) -> Result<Vec<u8>, ParseError> {
    let zeroed = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_hexdigit() { c } else { '0' })
            .collect()
    };

    if let Some(rest) = text.strip_prefix("0i") {
        // The sign is not a wildcard, keep it out of the substitution.
        let (sign, body) = match rest.as_bytes().first() {
            Some(b'+') => ("+", &rest[1..]),
            Some(b'-') => ("-", &rest[1..]),
            _ => ("", rest),
        };
        decode_number(&format!("0i{sign}{}", zeroed(body)), loc)
    } else if let Some(rest) = text.strip_prefix("0x") {
        decode_number(&format!("0x{}", zeroed(rest)), loc)
    } else {
        decode_hex_data(&zeroed(text), loc)
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}
