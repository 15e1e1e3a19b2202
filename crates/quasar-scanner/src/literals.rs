//! Literal value parsing.
//!
//! The scanner validates literal *structure*; these functions compute the
//! *value* from a token's logical text (unicode escapes already decoded via
//! [`crate::Scanner::token_text`]). Backslash escapes are handled here, so a
//! `\u005C` that decoded into a backslash participates in escape processing
//! the way the language requires.

use std::ops::Range;

use quasar_core::DiagnosticKind;

use crate::token::TokenKind;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
}

/// A malformed literal, with the diagnostic kind to report and the byte range
/// within the literal text (not file offsets).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?} in literal at {span:?}")]
pub struct LiteralError {
    pub kind: DiagnosticKind,
    pub span: Range<usize>,
}

fn err(kind: DiagnosticKind, span: Range<usize>) -> LiteralError {
    LiteralError { kind, span }
}

pub fn parse_literal(kind: TokenKind, text: &str) -> Result<LiteralValue, LiteralError> {
    match kind {
        TokenKind::IntLiteral => Ok(LiteralValue::Int(parse_int_literal(text)?)),
        TokenKind::LongLiteral => Ok(LiteralValue::Long(parse_long_literal(text)?)),
        TokenKind::FloatLiteral => Ok(LiteralValue::Float(parse_float_literal(text)?)),
        TokenKind::DoubleLiteral => Ok(LiteralValue::Double(parse_double_literal(text)?)),
        TokenKind::CharLiteral => Ok(LiteralValue::Char(unescape_char_literal(text)?)),
        TokenKind::StringLiteral => Ok(LiteralValue::String(unescape_string_literal(text)?)),
        TokenKind::TextBlock => Ok(LiteralValue::String(unescape_text_block(text)?)),
        _ => Err(err(DiagnosticKind::InvalidInput, 0..text.len())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IntegerShape {
    base: u32,
    digits_start: usize,
    /// Decimal literals are range-limited to the signed maximum; the other
    /// bases accept the full unsigned range (two's complement).
    decimal: bool,
}

fn integer_shape(bytes: &[u8], end: usize) -> Result<IntegerShape, LiteralError> {
    if end == 0 {
        return Err(err(DiagnosticKind::InvalidDigit, 0..0));
    }
    if bytes[0] != b'0' || end == 1 {
        return Ok(IntegerShape {
            base: 10,
            digits_start: 0,
            decimal: true,
        });
    }
    match bytes[1] {
        b'x' | b'X' => Ok(IntegerShape {
            base: 16,
            digits_start: 2,
            decimal: false,
        }),
        b'b' | b'B' => Ok(IntegerShape {
            base: 2,
            digits_start: 2,
            decimal: false,
        }),
        _ => Ok(IntegerShape {
            base: 8,
            digits_start: 1,
            decimal: false,
        }),
    }
}

fn accumulate_integer(
    bytes: &[u8],
    shape: IntegerShape,
    end: usize,
    limit: u64,
) -> Result<u64, LiteralError> {
    if shape.digits_start >= end {
        return Err(err(DiagnosticKind::InvalidDigit, shape.digits_start..end));
    }
    if bytes[shape.digits_start] == b'_' {
        return Err(err(
            DiagnosticKind::InvalidUnderscore,
            shape.digits_start..shape.digits_start + 1,
        ));
    }
    if bytes[end - 1] == b'_' {
        return Err(err(DiagnosticKind::InvalidUnderscore, end - 1..end));
    }

    let mut value: u64 = 0;
    let mut seen_digit = false;
    for (idx, &b) in bytes[..end].iter().enumerate().skip(shape.digits_start) {
        if b == b'_' {
            continue;
        }
        let digit = (b as char)
            .to_digit(shape.base)
            .ok_or_else(|| err(DiagnosticKind::InvalidDigit, idx..idx + 1))?
            as u64;
        seen_digit = true;
        value = value
            .checked_mul(shape.base as u64)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| err(DiagnosticKind::InvalidDigit, 0..end))?;
        if value > limit {
            return Err(err(DiagnosticKind::InvalidDigit, 0..end));
        }
    }
    if !seen_digit {
        return Err(err(DiagnosticKind::InvalidDigit, shape.digits_start..end));
    }
    Ok(value)
}

pub fn parse_int_literal(text: &str) -> Result<i32, LiteralError> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Err(err(DiagnosticKind::InvalidDigit, 0..0));
    }
    let end = bytes.len();
    if matches!(bytes[end - 1], b'l' | b'L') {
        return Err(err(DiagnosticKind::InvalidDigit, end - 1..end));
    }
    let shape = integer_shape(bytes, end)?;
    let limit = if shape.decimal {
        i32::MAX as u64
    } else {
        u32::MAX as u64
    };
    let value = accumulate_integer(bytes, shape, end, limit)?;
    Ok(value as u32 as i32)
}

pub fn parse_long_literal(text: &str) -> Result<i64, LiteralError> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Err(err(DiagnosticKind::InvalidDigit, 0..0));
    }
    let suffix = bytes.len() - 1;
    if !matches!(bytes[suffix], b'l' | b'L') {
        return Err(err(DiagnosticKind::InvalidDigit, suffix..suffix + 1));
    }
    if suffix == 0 {
        return Err(err(DiagnosticKind::InvalidDigit, 0..text.len()));
    }
    if bytes[suffix - 1] == b'_' {
        return Err(err(DiagnosticKind::InvalidUnderscore, suffix - 1..suffix));
    }
    let shape = integer_shape(bytes, suffix)?;
    let limit = if shape.decimal { i64::MAX as u64 } else { u64::MAX };
    let value = accumulate_integer(bytes, shape, suffix, limit)?;
    Ok(value as i64)
}

pub fn parse_float_literal(text: &str) -> Result<f32, LiteralError> {
    let main = strip_float_suffix(text, &[b'f', b'F'])?;
    Ok(parse_floating(main)? as f32)
}

pub fn parse_double_literal(text: &str) -> Result<f64, LiteralError> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Err(err(DiagnosticKind::InvalidFloat, 0..0));
    }
    let main = if matches!(bytes[bytes.len() - 1], b'd' | b'D') {
        strip_float_suffix(text, &[b'd', b'D'])?
    } else {
        if matches!(bytes[bytes.len() - 1], b'f' | b'F') {
            return Err(err(
                DiagnosticKind::InvalidFloat,
                bytes.len() - 1..bytes.len(),
            ));
        }
        text
    };
    parse_floating(main)
}

fn strip_float_suffix<'t>(text: &'t str, suffixes: &[u8]) -> Result<&'t str, LiteralError> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Err(err(DiagnosticKind::InvalidFloat, 0..0));
    }
    let last = bytes.len() - 1;
    if !suffixes.contains(&bytes[last]) {
        return Err(err(DiagnosticKind::InvalidFloat, last..last + 1));
    }
    if last > 0 && bytes[last - 1] == b'_' {
        return Err(err(DiagnosticKind::InvalidUnderscore, last - 1..last));
    }
    Ok(&text[..last])
}

fn parse_floating(main: &str) -> Result<f64, LiteralError> {
    if main.is_empty() {
        return Err(err(DiagnosticKind::InvalidFloat, 0..0));
    }
    if main.starts_with("0x") || main.starts_with("0X") {
        parse_hex_floating(main)
    } else {
        validate_decimal_floating(main)?;
        let sanitized: String = main.chars().filter(|&ch| ch != '_').collect();
        sanitized
            .parse::<f64>()
            .map_err(|_| err(DiagnosticKind::InvalidFloat, 0..main.len()))
    }
}

fn validate_decimal_floating(main: &str) -> Result<(), LiteralError> {
    let bytes = main.as_bytes();
    let mut dot_idx: Option<usize> = None;
    let mut exp_idx: Option<usize> = None;

    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'0'..=b'9' => {}
            b'_' => {
                let prev = idx.checked_sub(1).map(|i| bytes[i]);
                let next = bytes.get(idx + 1).copied();
                let bad = |c: Option<u8>| {
                    matches!(c, Some(b'.') | Some(b'e') | Some(b'E') | Some(b'+') | Some(b'-') | None)
                };
                if bad(prev) || bad(next) {
                    return Err(err(DiagnosticKind::InvalidUnderscore, idx..idx + 1));
                }
            }
            b'.' => {
                if exp_idx.is_some() || dot_idx.replace(idx).is_some() {
                    return Err(err(DiagnosticKind::InvalidFloat, idx..idx + 1));
                }
            }
            b'e' | b'E' => {
                if exp_idx.replace(idx).is_some() {
                    return Err(err(DiagnosticKind::InvalidFloat, idx..idx + 1));
                }
            }
            b'+' | b'-' => match exp_idx {
                Some(e) if idx == e + 1 => {}
                _ => return Err(err(DiagnosticKind::InvalidFloat, idx..idx + 1)),
            },
            _ => return Err(err(DiagnosticKind::InvalidFloat, idx..idx + 1)),
        }
    }

    let sig_end = exp_idx.unwrap_or(bytes.len());
    let has_digit = bytes[..sig_end].iter().any(|b| b.is_ascii_digit());
    if !has_digit {
        return Err(err(DiagnosticKind::InvalidFloat, 0..sig_end));
    }
    if let Some(e) = exp_idx {
        let mut exp_start = e + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        if !bytes[exp_start..].iter().any(|b| b.is_ascii_digit()) {
            return Err(err(DiagnosticKind::InvalidFloat, e..e + 1));
        }
    }
    Ok(())
}

/// Hexadecimal floating point: `0x` hex-significand (`p`|`P`) signed decimal
/// exponent. The value is the significand scaled by two to the exponent,
/// adjusted for fractional hex digits.
fn parse_hex_floating(main: &str) -> Result<f64, LiteralError> {
    let bytes = main.as_bytes();
    let p_idx = bytes
        .iter()
        .position(|b| matches!(b, b'p' | b'P'))
        .ok_or_else(|| err(DiagnosticKind::InvalidFloat, 0..main.len()))?;

    let mut significand = 0f64;
    let mut frac_digits = 0i32;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (idx, &b) in bytes[2..p_idx].iter().enumerate() {
        match b {
            b'_' => {}
            b'.' => {
                if seen_dot {
                    return Err(err(DiagnosticKind::InvalidFloat, idx + 2..idx + 3));
                }
                seen_dot = true;
            }
            _ => {
                let digit = (b as char)
                    .to_digit(16)
                    .ok_or_else(|| err(DiagnosticKind::InvalidFloat, idx + 2..idx + 3))?;
                significand = significand * 16.0 + digit as f64;
                if seen_dot {
                    frac_digits += 1;
                }
                seen_digit = true;
            }
        }
    }
    if !seen_digit {
        return Err(err(DiagnosticKind::InvalidHexLiteral, 2..p_idx));
    }

    let exp_part = &bytes[p_idx + 1..];
    if exp_part.is_empty() {
        return Err(err(DiagnosticKind::InvalidFloat, p_idx..p_idx + 1));
    }
    let (sign, digits) = match exp_part[0] {
        b'+' => (1i32, &exp_part[1..]),
        b'-' => (-1i32, &exp_part[1..]),
        _ => (1i32, exp_part),
    };
    let mut exponent = 0i32;
    let mut exp_digits = false;
    for &b in digits {
        if b == b'_' {
            continue;
        }
        if !b.is_ascii_digit() {
            return Err(err(DiagnosticKind::InvalidFloat, p_idx..main.len()));
        }
        exp_digits = true;
        exponent = exponent.saturating_mul(10).saturating_add((b - b'0') as i32);
    }
    if !exp_digits {
        return Err(err(DiagnosticKind::InvalidFloat, p_idx..main.len()));
    }

    let scale = sign.saturating_mul(exponent).saturating_sub(frac_digits * 4);
    Ok(significand * 2f64.powi(scale))
}

pub fn unescape_char_literal(text: &str) -> Result<char, LiteralError> {
    let bytes = text.as_bytes();
    if bytes.len() < 3 || bytes.first() != Some(&b'\'') || bytes.last() != Some(&b'\'') {
        return Err(err(DiagnosticKind::InvalidCharacterConstant, 0..text.len()));
    }
    let mut out = String::new();
    unescape_content(text, 1, text.len() - 1, &mut out)?;
    let mut chars = out.chars();
    let ch = chars
        .next()
        .ok_or_else(|| err(DiagnosticKind::InvalidCharacterConstant, 0..text.len()))?;
    if chars.next().is_some() {
        return Err(err(DiagnosticKind::InvalidCharacterConstant, 0..text.len()));
    }
    Ok(ch)
}

pub fn unescape_string_literal(text: &str) -> Result<String, LiteralError> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 || bytes.first() != Some(&b'"') || bytes.last() != Some(&b'"') {
        return Err(err(DiagnosticKind::UnterminatedString, 0..text.len()));
    }
    let mut out = String::new();
    unescape_content(text, 1, text.len() - 1, &mut out)?;
    Ok(out)
}

fn unescape_content(
    text: &str,
    start: usize,
    end: usize,
    out: &mut String,
) -> Result<(), LiteralError> {
    let bytes = text.as_bytes();
    let mut idx = start;
    while idx < end {
        let b = bytes[idx];
        match b {
            b'\\' => idx = unescape_one(text, idx, end, out)?,
            b'\n' | b'\r' => {
                return Err(err(DiagnosticKind::UnterminatedString, idx..idx + 1));
            }
            _ if b < 0x80 => {
                out.push(b as char);
                idx += 1;
            }
            _ => {
                let ch = text[idx..end].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                idx += ch.len_utf8();
            }
        }
    }
    Ok(())
}

/// Decode one backslash escape at `idx`, returning the index just past it.
///
/// Octal escapes take up to three digits; a run containing `8`/`9` or a value
/// above 255 is rejected, so `\377` is the largest accepted form and `\378`
/// is an error rather than `\37` plus a literal digit.
fn unescape_one(
    text: &str,
    idx: usize,
    end: usize,
    out: &mut String,
) -> Result<usize, LiteralError> {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes[idx], b'\\');
    if idx + 1 >= end {
        return Err(err(DiagnosticKind::InvalidEscape, idx..end));
    }
    match bytes[idx + 1] {
        b'b' => {
            out.push('\u{0008}');
            Ok(idx + 2)
        }
        b't' => {
            out.push('\t');
            Ok(idx + 2)
        }
        b'n' => {
            out.push('\n');
            Ok(idx + 2)
        }
        b'f' => {
            out.push('\u{000C}');
            Ok(idx + 2)
        }
        b'r' => {
            out.push('\r');
            Ok(idx + 2)
        }
        b's' => {
            out.push(' ');
            Ok(idx + 2)
        }
        b'"' => {
            out.push('"');
            Ok(idx + 2)
        }
        b'\'' => {
            out.push('\'');
            Ok(idx + 2)
        }
        b'\\' => {
            out.push('\\');
            Ok(idx + 2)
        }
        b'0'..=b'9' => {
            let mut value = 0u32;
            let mut j = idx + 1;
            let mut bad_digit = false;
            while j < end && j - idx <= 3 && bytes[j].is_ascii_digit() {
                if matches!(bytes[j], b'8' | b'9') {
                    bad_digit = true;
                }
                value = value * 8 + (bytes[j] - b'0') as u32;
                j += 1;
            }
            if bad_digit || value > 255 {
                return Err(err(DiagnosticKind::InvalidEscape, idx..j));
            }
            // Octal escapes are Latin-1 scalar values by construction.
            out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
            Ok(j)
        }
        other => Err(err(
            DiagnosticKind::InvalidEscape,
            idx..idx + 1 + (other as char).len_utf8(),
        )),
    }
}

/// Decode a text block: strip the delimiters, the incidental indentation
/// determined by the closing delimiter line, and process escapes including
/// line continuations.
pub fn unescape_text_block(text: &str) -> Result<String, LiteralError> {
    if !text.starts_with("\"\"\"") || !text.ends_with("\"\"\"") || text.len() < 6 {
        return Err(err(DiagnosticKind::UnterminatedTextBlock, 0..text.len()));
    }
    let bytes = text.as_bytes();
    let closing_start = text.len() - 3;

    // Content starts after optional whitespace and a mandatory line
    // terminator following the opening delimiter.
    let mut content_start = 3usize;
    while content_start < closing_start && matches!(bytes[content_start], b' ' | b'\t') {
        content_start += 1;
    }
    match bytes.get(content_start) {
        Some(b'\n') => content_start += 1,
        Some(b'\r') => {
            content_start += 1;
            if bytes.get(content_start) == Some(&b'\n') {
                content_start += 1;
            }
        }
        _ => {
            return Err(err(
                DiagnosticKind::InvalidCharacterConstant,
                3..content_start + 1,
            ))
        }
    }

    // Incidental indentation is the whitespace prefix of the closing line.
    let mut closing_line_start = content_start;
    for i in (content_start..closing_start).rev() {
        if matches!(bytes[i], b'\n' | b'\r') {
            closing_line_start = i + 1;
            break;
        }
    }
    let mut indent = 0usize;
    while closing_line_start + indent < closing_start
        && matches!(bytes[closing_line_start + indent], b' ' | b'\t')
    {
        indent += 1;
    }

    let mut out = String::new();
    let mut idx = content_start;
    let mut at_line_start = true;
    while idx < closing_start {
        if at_line_start {
            let mut stripped = 0usize;
            while stripped < indent
                && idx < closing_start
                && matches!(bytes[idx], b' ' | b'\t')
            {
                idx += 1;
                stripped += 1;
            }
            at_line_start = false;
            continue;
        }
        match bytes[idx] {
            b'\\' => {
                if idx + 1 < closing_start && matches!(bytes[idx + 1], b'\n' | b'\r') {
                    // Line continuation removes the terminator.
                    idx += 2;
                    if bytes[idx - 1] == b'\r' && bytes.get(idx) == Some(&b'\n') {
                        idx += 1;
                    }
                    at_line_start = true;
                } else {
                    idx = unescape_one(text, idx, closing_start, &mut out)?;
                }
            }
            b'\n' => {
                out.push('\n');
                idx += 1;
                at_line_start = true;
            }
            b'\r' => {
                out.push('\n');
                idx += 1;
                if bytes.get(idx) == Some(&b'\n') {
                    idx += 1;
                }
                at_line_start = true;
            }
            b if b < 0x80 => {
                out.push(b as char);
                idx += 1;
            }
            _ => {
                let ch = text[idx..closing_start].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                idx += ch.len_utf8();
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_literals_by_base() {
        assert_eq!(parse_int_literal("2147483647").unwrap(), i32::MAX);
        assert!(parse_int_literal("2147483648").is_err());
        assert_eq!(parse_int_literal("0xFFFF_FFFF").unwrap(), -1);
        assert_eq!(parse_int_literal("0x8000_0000").unwrap(), i32::MIN);
        assert_eq!(parse_int_literal("017").unwrap(), 15);
        assert_eq!(parse_int_literal("0b101").unwrap(), 5);
        assert_eq!(parse_int_literal("0").unwrap(), 0);
    }

    #[test]
    fn long_literals_require_suffix() {
        assert_eq!(parse_long_literal("9223372036854775807L").unwrap(), i64::MAX);
        assert!(parse_long_literal("9223372036854775808L").is_err());
        assert_eq!(parse_long_literal("0xFFFF_FFFF_FFFF_FFFFL").unwrap(), -1);
        assert!(parse_long_literal("42").is_err());
    }

    #[test]
    fn underscore_placement() {
        assert_eq!(parse_int_literal("1_000_000").unwrap(), 1_000_000);
        assert!(parse_int_literal("0x_FF").is_err());
        assert!(parse_long_literal("1_L").is_err());
        assert!(parse_double_literal("1._5").is_err());
        assert!(parse_double_literal("1_.5").is_err());
    }

    #[test]
    fn floating_literals() {
        assert_eq!(parse_float_literal("1f").unwrap(), 1.0f32);
        assert_eq!(parse_double_literal("1.").unwrap(), 1.0f64);
        assert_eq!(parse_double_literal(".5").unwrap(), 0.5f64);
        assert_eq!(parse_double_literal("1e2").unwrap(), 100.0f64);
        assert_eq!(parse_double_literal("0x1p1").unwrap(), 2.0f64);
        assert_eq!(parse_double_literal("0x1.8p1").unwrap(), 3.0f64);
        assert_eq!(parse_double_literal("0xFp-1").unwrap(), 7.5f64);
        assert!(parse_double_literal("0x1p").is_err());
    }

    #[test]
    fn string_and_char_escapes() {
        assert_eq!(unescape_char_literal("'a'").unwrap(), 'a');
        assert_eq!(unescape_char_literal("'\\n'").unwrap(), '\n');
        assert_eq!(unescape_string_literal("\"a\\tb\"").unwrap(), "a\tb");
        assert_eq!(unescape_string_literal("\"\\141\"").unwrap(), "a");
        assert_eq!(unescape_string_literal("\"\\0\"").unwrap(), "\u{0}");
        assert_eq!(unescape_string_literal("\"\\377\"").unwrap(), "\u{FF}");
    }

    #[test]
    fn octal_escape_range_is_enforced() {
        assert!(unescape_string_literal("\"\\378\"").is_err());
        assert!(unescape_string_literal("\"\\400\"").is_err());
        assert!(unescape_string_literal("\"\\q\"").is_err());
    }

    #[test]
    fn char_literal_must_hold_one_char() {
        assert!(unescape_char_literal("''").is_err());
        assert!(unescape_char_literal("'ab'").is_err());
    }

    #[test]
    fn text_blocks_strip_incidental_indentation() {
        let text = "\"\"\"\n    hi\n    there\n    \"\"\"";
        assert_eq!(unescape_text_block(text).unwrap(), "hi\nthere\n");
        assert!(unescape_text_block("\"\"\"hi\"\"\"").is_err());
    }
}
