use quasar_core::{CompilerOptions, Span};
use quasar_scanner::{lex_with_errors, Token, TokenKind};

/// The cursor sits somewhere no completion is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCursorLocation {
    #[error("cursor is inside a string or character literal")]
    InsideString,
    #[error("cursor is inside a comment")]
    InsideComment,
    #[error("cursor is inside a unicode escape")]
    InsideUnicode,
    #[error("cursor is inside a numeric literal")]
    InsideNumber,
}

/// Tokens of the unit plus the cursor's classification against them.
#[derive(Debug)]
pub(crate) struct CursorTokens {
    pub tokens: Vec<Token>,
    /// Index of the token the cursor touches (inside or at its end).
    pub at: Option<usize>,
}

/// Validate the cursor position and tokenize the unit.
///
/// A cursor strictly inside a string/char/text-block, comment, numeric
/// literal or `\uXXXX` escape is a distinguished no-completion condition, not
/// an assist request. Sitting at a token boundary is fine.
pub(crate) fn classify_cursor(
    source: &str,
    options: &CompilerOptions,
    offset: usize,
) -> Result<CursorTokens, InvalidCursorLocation> {
    if inside_unicode_escape(source, offset) {
        return Err(InvalidCursorLocation::InsideUnicode);
    }

    let (tokens, _) = lex_with_errors(source, options.clone());
    let mut at = None;
    for (index, token) in tokens.iter().enumerate() {
        let span = token.span;
        if offset <= span.start {
            break;
        }
        let strictly_inside = span.start < offset && offset < span.end;
        match token.kind {
            TokenKind::StringLiteral | TokenKind::CharLiteral | TokenKind::TextBlock
                if strictly_inside =>
            {
                return Err(InvalidCursorLocation::InsideString);
            }
            TokenKind::LineComment | TokenKind::BlockComment if strictly_inside => {
                return Err(InvalidCursorLocation::InsideComment);
            }
            kind if kind.is_numeric_literal() && strictly_inside => {
                return Err(InvalidCursorLocation::InsideNumber);
            }
            _ => {}
        }
        if span.start < offset && offset <= span.end {
            at = Some(index);
        }
    }
    Ok(CursorTokens { tokens, at })
}

/// Whether `offset` falls strictly inside a `\uXXXX` escape run.
fn inside_unicode_escape(source: &str, offset: usize) -> bool {
    let bytes = source.as_bytes();
    // Find a candidate backslash within the longest possible escape prefix
    // before the cursor (`\uuuu....XXXX` runs are legal).
    let scan_start = offset.saturating_sub(16);
    for start in (scan_start..offset.min(bytes.len())).rev() {
        if bytes[start] != b'\\' {
            continue;
        }
        // Even number of preceding backslashes makes this one active.
        let mut preceding = 0usize;
        while start > preceding && bytes[start - preceding - 1] == b'\\' {
            preceding += 1;
        }
        if preceding % 2 == 1 {
            continue;
        }
        let mut j = start + 1;
        if bytes.get(j) != Some(&b'u') {
            continue;
        }
        while bytes.get(j) == Some(&b'u') {
            j += 1;
        }
        let mut digits = 0;
        while digits < 4 && bytes.get(j).is_some_and(|b| b.is_ascii_hexdigit()) {
            j += 1;
            digits += 1;
        }
        if start < offset && offset < j {
            return true;
        }
    }
    false
}

/// The doc comment whose span strictly contains `offset`, if any.
pub(crate) fn doc_comment_containing(tokens: &[Token], offset: usize) -> Option<Span> {
    tokens
        .iter()
        .find(|t| {
            t.kind == TokenKind::DocComment && t.span.start < offset && offset < t.span.end
        })
        .map(|t| t.span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_inside_number_is_invalid() {
        let err = classify_cursor("int x = 123;", &CompilerOptions::default(), 9).unwrap_err();
        assert_eq!(err, InvalidCursorLocation::InsideNumber);
    }

    #[test]
    fn cursor_inside_string_and_comment() {
        let err = classify_cursor("String s = \"abc\";", &CompilerOptions::default(), 13)
            .unwrap_err();
        assert_eq!(err, InvalidCursorLocation::InsideString);

        let err = classify_cursor("// hello", &CompilerOptions::default(), 4).unwrap_err();
        assert_eq!(err, InvalidCursorLocation::InsideComment);
    }

    #[test]
    fn cursor_inside_unicode_escape() {
        let err = classify_cursor("String \\u0061bc = null;", &CompilerOptions::default(), 10)
            .unwrap_err();
        assert_eq!(err, InvalidCursorLocation::InsideUnicode);
    }

    #[test]
    fn cursor_at_identifier_end_is_valid() {
        let cursor = classify_cursor("foo", &CompilerOptions::default(), 3).unwrap();
        assert!(cursor.at.is_some());
    }
}
