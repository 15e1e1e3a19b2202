use std::borrow::Cow;

use quasar_core::{CompilerOptions, DiagnosticKind, Span};

use crate::comments::{CommentTable, TaskTag};
use crate::line_ends::LineEnds;
use crate::token::{keyword_kind, KeywordLookup, Token, TokenKind};

/// A lexical error, identified by its diagnostic kind and source span.
///
/// The parser converts these into error tokens plus diagnostics and keeps
/// going; a scan error never aborts a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?} at {span:?}")]
pub struct ScanError {
    pub kind: DiagnosticKind,
    pub span: Span,
}

/// Opaque scanner snapshot; see [`Scanner::state`].
#[derive(Debug, Clone, Copy)]
pub struct ScannerState {
    pos: usize,
    comments: usize,
    line_ends: usize,
    task_tags: usize,
}

impl ScanError {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn into_diagnostic(self) -> quasar_core::Diagnostic {
        quasar_core::Diagnostic::new(self.kind, self.span)
    }
}

/// The lexical scanner: one instance per compilation unit.
///
/// Produces one token per [`Scanner::next_token`] call, including trivia
/// (whitespace and comments), so that concatenating raw token spans
/// reconstructs the source exactly. Unicode escapes (`\uXXXX`) are decoded
/// transparently: tokens carry raw spans, and [`Scanner::token_text`] returns
/// the logical (de-escaped) text.
///
/// Scratch state (line ends, comment tables, the de-escape buffer) is owned
/// by the instance and reused across tokens; [`Scanner::set_source`] resets
/// it for the next unit.
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    options: CompilerOptions,
    line_ends: LineEnds,
    comments: CommentTable,
    task_tags: Vec<TaskTag>,
    used_reserved_word: bool,
    scratch: String,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, options: CompilerOptions) -> Self {
        Self {
            source,
            pos: 0,
            options,
            line_ends: LineEnds::new(),
            comments: CommentTable::new(),
            task_tags: Vec::new(),
            used_reserved_word: false,
            scratch: String::new(),
        }
    }

    /// Point the scanner at the next unit, resetting all per-unit state.
    pub fn set_source(&mut self, source: &'a str) {
        self.source = source;
        self.pos = 0;
        self.line_ends.clear();
        self.comments.clear();
        self.task_tags.clear();
        self.used_reserved_word = false;
        self.scratch.clear();
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn comments(&self) -> &CommentTable {
        &self.comments
    }

    pub fn task_tags(&self) -> &[TaskTag] {
        &self.task_tags
    }

    pub fn line_number(&self, offset: usize) -> usize {
        self.line_ends.line_number(offset)
    }

    pub fn column(&self, offset: usize) -> usize {
        self.line_ends.column(offset)
    }

    pub fn line_ends(&self) -> &LineEnds {
        &self.line_ends
    }

    /// Whether a level-gated reserved word (`assert`, `enum`) was scanned as
    /// a plain identifier since the last [`Scanner::set_source`].
    pub fn used_reserved_word(&self) -> bool {
        self.used_reserved_word
    }

    // --- logical character access -------------------------------------------

    /// Decode the logical character at `pos`: either a `\uXXXX` escape (with
    /// any number of `u`s, active only after an even number of preceding
    /// backslashes) or a plain char. Returns the char and the byte length
    /// consumed.
    fn decode_at(&self, pos: usize) -> Option<Result<(char, usize), ScanError>> {
        let bytes = self.source.as_bytes();
        let &b = bytes.get(pos)?;
        if b == b'\\' {
            if let Some(result) = self.unicode_escape_at(pos) {
                return Some(result);
            }
            return Some(Ok(('\\', 1)));
        }
        if b < 0x80 {
            return Some(Ok((b as char, 1)));
        }
        let ch = self.source[pos..].chars().next()?;
        Some(Ok((ch, ch.len_utf8())))
    }

    fn unicode_escape_at(&self, pos: usize) -> Option<Result<(char, usize), ScanError>> {
        let bytes = self.source.as_bytes();
        if bytes.get(pos) != Some(&b'\\') || bytes.get(pos + 1) != Some(&b'u') {
            return None;
        }
        // A backslash opens an escape only when preceded by an even number of
        // backslashes.
        let mut preceding = 0usize;
        while pos > preceding && bytes[pos - preceding - 1] == b'\\' {
            preceding += 1;
        }
        if preceding % 2 == 1 {
            return None;
        }
        let mut j = pos + 1;
        while bytes.get(j) == Some(&b'u') {
            j += 1;
        }
        let mut value = 0u32;
        for k in 0..4 {
            let digit = bytes
                .get(j + k)
                .and_then(|&b| (b as char).to_digit(16));
            match digit {
                Some(d) => value = (value << 4) | d,
                None => {
                    return Some(Err(ScanError::new(
                        DiagnosticKind::InvalidUnicodeEscape,
                        Span::new(pos, (j + k + 1).min(self.source.len())),
                    )))
                }
            }
        }
        match char::from_u32(value) {
            Some(ch) => Some(Ok((ch, j + 4 - pos))),
            None => Some(Err(ScanError::new(
                DiagnosticKind::InvalidUnicodeEscape,
                Span::new(pos, j + 4),
            ))),
        }
    }

    fn peek(&self) -> Result<Option<(char, usize)>, ScanError> {
        self.decode_at(self.pos).transpose()
    }

    /// Consume one logical character, recording line ends.
    fn bump(&mut self) -> Result<Option<char>, ScanError> {
        let Some((ch, len)) = self.peek()? else {
            return Ok(None);
        };
        let at = self.pos;
        self.pos += len;
        match ch {
            '\n' => self.line_ends.push(at),
            // CR+LF records once, at the LF.
            '\r' if self.source.as_bytes().get(self.pos) != Some(&b'\n') => {
                self.line_ends.push(at)
            }
            _ => {}
        }
        Ok(Some(ch))
    }

    fn peek_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.source.as_bytes().get(pos).copied()
    }

    // --- token text ---------------------------------------------------------

    /// Logical text of a span: raw source unless the span contains a unicode
    /// escape, in which case a decoded copy is returned.
    pub fn text_in(&self, span: Span) -> Cow<'a, str> {
        let end = span.end.min(self.source.len());
        let raw = &self.source[span.start..end];
        if !raw.contains("\\u") {
            return Cow::Borrowed(raw);
        }
        let mut out = String::with_capacity(raw.len());
        let mut pos = span.start;
        while pos < end {
            match self.decode_at(pos) {
                Some(Ok((ch, len))) => {
                    out.push(ch);
                    pos += len;
                }
                Some(Err(_)) => {
                    out.push('\\');
                    pos += 1;
                }
                None => break,
            }
        }
        Cow::Owned(out)
    }

    pub fn token_text(&self, token: &Token) -> Cow<'a, str> {
        self.text_in(token.span)
    }

    // --- main dispatch ------------------------------------------------------

    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        let start = self.pos;
        let Some((ch, _)) = self.peek()? else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        match ch {
            ' ' | '\t' | '\x0c' | '\n' | '\r' => self.scan_whitespace(start),
            '/' => match self.byte_at(self.pos + 1) {
                Some(b'/') => self.scan_line_comment(start),
                Some(b'*') => self.scan_block_comment(start),
                Some(b'=') => self.op(start, 2, TokenKind::SlashEq),
                _ => self.op(start, 1, TokenKind::Slash),
            },
            '"' => {
                if self.byte_at(self.pos + 1) == Some(b'"')
                    && self.byte_at(self.pos + 2) == Some(b'"')
                {
                    self.scan_text_block(start)
                } else {
                    self.scan_string(start)
                }
            }
            '\'' => self.scan_char_literal(start),
            '0'..='9' => self.scan_number(start),
            '.' => {
                if self.byte_at(self.pos + 1).is_some_and(|b| b.is_ascii_digit()) {
                    self.scan_number(start)
                } else if self.byte_at(self.pos + 1) == Some(b'.')
                    && self.byte_at(self.pos + 2) == Some(b'.')
                {
                    self.op(start, 3, TokenKind::Ellipsis)
                } else {
                    self.op(start, 1, TokenKind::Dot)
                }
            }
            c if is_identifier_start(c) => self.scan_identifier(start),
            _ => self.scan_operator(start, ch),
        }
    }

    fn op(&mut self, start: usize, chars: usize, kind: TokenKind) -> Result<Token, ScanError> {
        for _ in 0..chars {
            self.bump()?;
        }
        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_whitespace(&mut self, start: usize) -> Result<Token, ScanError> {
        while let Some((ch, _)) = self.peek()? {
            if matches!(ch, ' ' | '\t' | '\x0c' | '\n' | '\r') {
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(Token::new(TokenKind::Whitespace, Span::new(start, self.pos)))
    }

    fn scan_identifier(&mut self, start: usize) -> Result<Token, ScanError> {
        let mut buf = std::mem::take(&mut self.scratch);
        buf.clear();
        let mut has_escape = false;

        while let Some((ch, len)) = self.peek()? {
            let part = if self.pos == start {
                is_identifier_start(ch)
            } else {
                is_identifier_part(ch)
            };
            if !part {
                break;
            }
            if len > 1 && ch.len_utf8() != len {
                // Unicode escape: switch to the decoded buffer, copying the
                // plain prefix first.
                if !has_escape {
                    buf.push_str(&self.source[start..self.pos]);
                    has_escape = true;
                }
            }
            if has_escape {
                buf.push(ch);
            }
            self.bump()?;
        }

        let span = Span::new(start, self.pos);
        let kind = {
            let text: &str = if has_escape {
                &buf
            } else {
                &self.source[start..self.pos]
            };
            match keyword_kind(text, self.options.source_level) {
                KeywordLookup::Keyword(kind) => kind,
                KeywordLookup::ReservedAtHigherLevel => {
                    self.used_reserved_word = true;
                    TokenKind::Identifier
                }
                KeywordLookup::NotKeyword => TokenKind::Identifier,
            }
        };
        self.scratch = buf;
        Ok(Token::new(kind, span))
    }

    // --- numeric literals ---------------------------------------------------

    fn scan_number(&mut self, start: usize) -> Result<Token, ScanError> {
        let first = self.peek_byte();
        if first == Some(b'0') {
            match self.byte_at(self.pos + 1) {
                Some(b'x' | b'X') => return self.scan_hex_number(start),
                Some(b'b' | b'B')
                    if self
                        .byte_at(self.pos + 2)
                        .is_some_and(|b| matches!(b, b'0' | b'1' | b'_')) =>
                {
                    return self.scan_binary_number(start)
                }
                _ => {}
            }
        }

        let mut saw_underscore = false;
        let mut is_floating = false;

        if first != Some(b'.') {
            saw_underscore |= self.take_decimal_digits()?;
        }

        if self.peek_byte() == Some(b'.')
            && !matches!(self.byte_at(self.pos + 1), Some(b'.'))
        {
            // A dot only continues the literal when followed by a digit,
            // exponent, suffix, or end of the literal (`1.` is valid).
            let after = self.byte_at(self.pos + 1);
            let continues = match after {
                Some(b) => {
                    b.is_ascii_digit()
                        || matches!(b, b'e' | b'E' | b'f' | b'F' | b'd' | b'D')
                        || !is_identifier_part_byte(b)
                }
                None => true,
            };
            if continues {
                is_floating = true;
                self.bump()?; // '.'
                saw_underscore |= self.take_decimal_digits()?;
            }
        }

        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            is_floating = true;
            self.bump()?;
            if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                self.bump()?;
            }
            let had = self.take_decimal_digits_required(DiagnosticKind::InvalidFloat, start)?;
            saw_underscore |= had;
        }

        self.check_underscores(saw_underscore, start)?;

        let kind = match self.peek_byte() {
            Some(b'f' | b'F') => {
                self.bump()?;
                TokenKind::FloatLiteral
            }
            Some(b'd' | b'D') => {
                self.bump()?;
                TokenKind::DoubleLiteral
            }
            Some(b'l' | b'L') if !is_floating => {
                self.bump()?;
                TokenKind::LongLiteral
            }
            _ if is_floating => TokenKind::DoubleLiteral,
            _ => TokenKind::IntLiteral,
        };
        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_hex_number(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?; // 0
        self.bump()?; // x
        let mut saw_underscore = false;
        let mut digits = 0usize;
        while let Some(b) = self.peek_byte() {
            match b {
                b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => {
                    digits += 1;
                    self.bump()?;
                }
                b'_' => {
                    saw_underscore = true;
                    self.bump()?;
                }
                _ => break,
            }
        }

        if matches!(self.peek_byte(), Some(b'.' | b'p' | b'P')) {
            return self.scan_hex_float(start, digits, saw_underscore);
        }

        if digits == 0 {
            return Err(ScanError::new(
                DiagnosticKind::InvalidHexLiteral,
                Span::new(start, self.pos),
            ));
        }
        self.check_underscores(saw_underscore, start)?;

        let kind = if matches!(self.peek_byte(), Some(b'l' | b'L')) {
            self.bump()?;
            TokenKind::LongLiteral
        } else {
            TokenKind::IntLiteral
        };
        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_hex_float(
        &mut self,
        start: usize,
        mut digits: usize,
        mut saw_underscore: bool,
    ) -> Result<Token, ScanError> {
        if self.peek_byte() == Some(b'.') {
            self.bump()?;
            while let Some(b) = self.peek_byte() {
                match b {
                    b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => {
                        digits += 1;
                        self.bump()?;
                    }
                    b'_' => {
                        saw_underscore = true;
                        self.bump()?;
                    }
                    _ => break,
                }
            }
        }
        if digits == 0 {
            return Err(ScanError::new(
                DiagnosticKind::InvalidHexLiteral,
                Span::new(start, self.pos),
            ));
        }

        // A hexadecimal floating literal is only well-formed with a binary
        // exponent.
        if !matches!(self.peek_byte(), Some(b'p' | b'P')) {
            return Err(ScanError::new(
                DiagnosticKind::InvalidFloat,
                Span::new(start, self.pos),
            ));
        }
        self.bump()?;
        if matches!(self.peek_byte(), Some(b'+' | b'-')) {
            self.bump()?;
        }
        let had = self.take_decimal_digits_required(DiagnosticKind::InvalidFloat, start)?;
        saw_underscore |= had;

        if !self.options.source_level.supports_hex_floats() {
            return Err(ScanError::new(
                DiagnosticKind::FeatureNotAvailable,
                Span::new(start, self.pos),
            ));
        }
        self.check_underscores(saw_underscore, start)?;

        let kind = match self.peek_byte() {
            Some(b'f' | b'F') => {
                self.bump()?;
                TokenKind::FloatLiteral
            }
            Some(b'd' | b'D') => {
                self.bump()?;
                TokenKind::DoubleLiteral
            }
            _ => TokenKind::DoubleLiteral,
        };
        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_binary_number(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?; // 0
        self.bump()?; // b
        if !self.options.source_level.supports_binary_literals() {
            // Consume the digits so the error spans the whole literal.
            while self
                .peek_byte()
                .is_some_and(|b| b.is_ascii_digit() || b == b'_')
            {
                self.bump()?;
            }
            return Err(ScanError::new(
                DiagnosticKind::FeatureNotAvailable,
                Span::new(start, self.pos),
            ));
        }
        let mut saw_underscore = false;
        let mut digits = 0usize;
        while let Some(b) = self.peek_byte() {
            match b {
                b'0' | b'1' => {
                    digits += 1;
                    self.bump()?;
                }
                b'_' => {
                    saw_underscore = true;
                    self.bump()?;
                }
                b'2'..=b'9' => {
                    return Err(ScanError::new(
                        DiagnosticKind::InvalidBinaryLiteral,
                        Span::new(start, self.pos + 1),
                    ))
                }
                _ => break,
            }
        }
        if digits == 0 {
            return Err(ScanError::new(
                DiagnosticKind::InvalidBinaryLiteral,
                Span::new(start, self.pos),
            ));
        }
        self.check_underscores(saw_underscore, start)?;

        let kind = if matches!(self.peek_byte(), Some(b'l' | b'L')) {
            self.bump()?;
            TokenKind::LongLiteral
        } else {
            TokenKind::IntLiteral
        };
        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    /// Consume `[0-9_]*`; returns whether an underscore was seen.
    fn take_decimal_digits(&mut self) -> Result<bool, ScanError> {
        let mut saw_underscore = false;
        while let Some(b) = self.peek_byte() {
            match b {
                b'0'..=b'9' => {
                    self.bump()?;
                }
                b'_' => {
                    saw_underscore = true;
                    self.bump()?;
                }
                _ => break,
            }
        }
        Ok(saw_underscore)
    }

    fn take_decimal_digits_required(
        &mut self,
        kind: DiagnosticKind,
        start: usize,
    ) -> Result<bool, ScanError> {
        let before = self.pos;
        let saw_underscore = self.take_decimal_digits()?;
        let digits = self.source[before..self.pos]
            .bytes()
            .any(|b| b.is_ascii_digit());
        if !digits {
            return Err(ScanError::new(kind, Span::new(start, self.pos)));
        }
        Ok(saw_underscore)
    }

    fn check_underscores(&self, saw_underscore: bool, start: usize) -> Result<(), ScanError> {
        if !saw_underscore {
            return Ok(());
        }
        if !self.options.source_level.supports_underscores_in_literals() {
            return Err(ScanError::new(
                DiagnosticKind::FeatureNotAvailable,
                Span::new(start, self.pos),
            ));
        }
        // Placement details (leading/trailing/adjacent to dot) are validated
        // when the literal's value is parsed; the scanner only rejects a
        // trailing underscore, which would otherwise merge into a suffix.
        if self.byte_at(self.pos.saturating_sub(1)) == Some(b'_') {
            return Err(ScanError::new(
                DiagnosticKind::InvalidUnderscore,
                Span::new(self.pos - 1, self.pos),
            ));
        }
        Ok(())
    }

    // --- string / char literals --------------------------------------------

    fn scan_string(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?; // opening quote
        loop {
            let Some((ch, _)) = self.peek()? else {
                return Err(ScanError::new(
                    DiagnosticKind::UnterminatedString,
                    Span::new(start, self.pos),
                ));
            };
            match ch {
                '"' => {
                    self.bump()?;
                    return Ok(Token::new(
                        TokenKind::StringLiteral,
                        Span::new(start, self.pos),
                    ));
                }
                '\n' | '\r' => {
                    return Err(ScanError::new(
                        DiagnosticKind::UnterminatedString,
                        Span::new(start, self.pos),
                    ));
                }
                '\\' => {
                    self.bump()?;
                    self.scan_escape()?;
                }
                _ => {
                    self.bump()?;
                }
            }
        }
    }

    fn scan_char_literal(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?; // opening quote
        let mut content = 0usize;
        loop {
            let Some((ch, _)) = self.peek()? else {
                return Err(ScanError::new(
                    DiagnosticKind::UnterminatedCharacter,
                    Span::new(start, self.pos),
                ));
            };
            match ch {
                '\'' => {
                    self.bump()?;
                    if content != 1 {
                        return Err(ScanError::new(
                            DiagnosticKind::InvalidCharacterConstant,
                            Span::new(start, self.pos),
                        ));
                    }
                    return Ok(Token::new(
                        TokenKind::CharLiteral,
                        Span::new(start, self.pos),
                    ));
                }
                '\n' | '\r' => {
                    return Err(ScanError::new(
                        DiagnosticKind::UnterminatedCharacter,
                        Span::new(start, self.pos),
                    ));
                }
                '\\' => {
                    self.bump()?;
                    self.scan_escape()?;
                    content += 1;
                }
                _ => {
                    self.bump()?;
                    content += 1;
                }
            }
        }
    }

    /// Validate the escape sequence following an already-consumed backslash.
    ///
    /// Octal escapes accept up to three digits; a digit run containing `8` or
    /// `9`, or a value above 255, is an invalid escape (`\377` is the largest
    /// accepted form).
    fn scan_escape(&mut self) -> Result<(), ScanError> {
        let escape_start = self.pos.saturating_sub(1);
        let Some((ch, _)) = self.peek()? else {
            return Err(ScanError::new(
                DiagnosticKind::InvalidEscape,
                Span::new(escape_start, self.pos),
            ));
        };
        match ch {
            'b' | 't' | 'n' | 'f' | 'r' | '"' | '\'' | '\\' => {
                self.bump()?;
                Ok(())
            }
            's' if self.options.source_level.supports_text_blocks() => {
                self.bump()?;
                Ok(())
            }
            '0'..='9' => {
                let mut value = 0u32;
                let mut bad_digit = false;
                let mut count = 0;
                while count < 3 {
                    let Some((d, _)) = self.peek()? else { break };
                    if !d.is_ascii_digit() {
                        break;
                    }
                    if matches!(d, '8' | '9') {
                        bad_digit = true;
                    }
                    value = value * 8 + d.to_digit(10).unwrap_or(0);
                    self.bump()?;
                    count += 1;
                }
                if bad_digit || value > 255 {
                    return Err(ScanError::new(
                        DiagnosticKind::InvalidEscape,
                        Span::new(escape_start, self.pos),
                    ));
                }
                Ok(())
            }
            _ => {
                self.bump()?;
                Err(ScanError::new(
                    DiagnosticKind::InvalidEscape,
                    Span::new(escape_start, self.pos),
                ))
            }
        }
    }

    fn scan_text_block(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?;
        self.bump()?;
        self.bump()?;
        if !self.options.source_level.supports_text_blocks() {
            return Err(ScanError::new(
                DiagnosticKind::FeatureNotAvailable,
                Span::new(start, self.pos),
            ));
        }
        loop {
            let Some((ch, _)) = self.peek()? else {
                return Err(ScanError::new(
                    DiagnosticKind::UnterminatedTextBlock,
                    Span::new(start, self.pos),
                ));
            };
            match ch {
                '"' => {
                    if self.byte_at(self.pos + 1) == Some(b'"')
                        && self.byte_at(self.pos + 2) == Some(b'"')
                    {
                        self.bump()?;
                        self.bump()?;
                        self.bump()?;
                        return Ok(Token::new(
                            TokenKind::TextBlock,
                            Span::new(start, self.pos),
                        ));
                    }
                    self.bump()?;
                }
                '\\' => {
                    self.bump()?;
                    // Any escape (including `\"` and line continuations) is
                    // structurally fine inside a text block; content decoding
                    // validates the details.
                    self.bump()?;
                }
                _ => {
                    self.bump()?;
                }
            }
        }
    }

    // --- comments -----------------------------------------------------------

    fn scan_line_comment(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?; // /
        self.bump()?; // /
        let mut last_content = self.pos.saturating_sub(1);
        while let Some((ch, _)) = self.peek()? {
            if matches!(ch, '\n' | '\r') {
                break;
            }
            last_content = self.pos;
            self.bump()?;
        }
        self.comments.push_line(start, last_content);
        self.scan_task_tags(Span::new(start + 2, self.pos));
        Ok(Token::new(TokenKind::LineComment, Span::new(start, self.pos)))
    }

    fn scan_block_comment(&mut self, start: usize) -> Result<Token, ScanError> {
        self.bump()?; // /
        self.bump()?; // *
        let doc = self.peek_byte() == Some(b'*') && self.byte_at(self.pos + 1) != Some(b'/');
        let mut prev_star = false;
        loop {
            let Some(ch) = self.bump()? else {
                self.comments.push_block(start, doc, None);
                return Err(ScanError::new(
                    DiagnosticKind::UnterminatedComment,
                    Span::new(start, self.pos),
                ));
            };
            if prev_star && ch == '/' {
                let stop = self.pos;
                self.comments.push_block(start, doc, Some(stop));
                self.scan_task_tags(Span::new(start + 2, stop - 2));
                let kind = if doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::BlockComment
                };
                return Ok(Token::new(kind, Span::new(start, stop)));
            }
            prev_star = ch == '*';
        }
    }

    /// Scan the content span of a comment for configured task tags.
    ///
    /// Matching honors `task_case_sensitive`; an occurrence immediately
    /// preceded by `@` is skipped so javadoc tag text never registers a task.
    fn scan_task_tags(&mut self, content: Span) {
        if self.options.task_tags.is_empty() || content.is_empty() {
            return;
        }
        let text = &self.source[content.start..content.end];
        let case_sensitive = self.options.task_case_sensitive;

        let mut found: Vec<(usize, usize, usize)> = Vec::new(); // (start, len, tag index)
        let mut i = 0;
        'outer: while i < text.len() {
            for (tag_index, tag) in self.options.task_tags.iter().enumerate() {
                if tag.is_empty() || i + tag.len() > text.len() {
                    continue;
                }
                let candidate = &text[i..i + tag.len()];
                let matches = if case_sensitive {
                    candidate == tag.as_str()
                } else {
                    candidate.eq_ignore_ascii_case(tag)
                };
                if !matches {
                    continue;
                }
                let abs = content.start + i;
                if abs > 0 && self.byte_at(abs - 1) == Some(b'@') {
                    continue;
                }
                found.push((abs, tag.len(), tag_index));
                i += tag.len();
                continue 'outer;
            }
            i += 1;
        }

        for (idx, &(abs, len, tag_index)) in found.iter().enumerate() {
            let message_start = abs + len;
            let mut message_end = match found.get(idx + 1) {
                Some(&(next_start, _, _)) => next_start,
                None => content.end,
            };
            // A task message never crosses a line terminator.
            if let Some(nl) = self.source[message_start..message_end]
                .bytes()
                .position(|b| b == b'\n' || b == b'\r')
            {
                message_end = message_start + nl;
            }
            self.task_tags.push(TaskTag {
                tag: Span::new(abs, abs + len),
                message: Span::new(message_start, message_end),
                priority: self.options.task_priority(tag_index),
            });
        }
    }

    // --- diet mode ----------------------------------------------------------

    /// Skip a method body without tokenizing it, by brace counting.
    ///
    /// The caller has already consumed the opening `{`. String, char,
    /// text-block and comment contents are honored so braces inside them do
    /// not count. Line ends are still recorded. Returns the span from the
    /// first skipped character to just past the closing `}`.
    pub fn skip_method_body(&mut self) -> Result<Span, ScanError> {
        let start = self.pos;
        tracing::trace!(start, "diet-skipping method body");
        let mut depth = 1usize;
        loop {
            let Some((ch, _)) = self.peek()? else {
                return Err(ScanError::new(
                    DiagnosticKind::UnmatchedBracket,
                    Span::new(start, self.pos),
                ));
            };
            match ch {
                '{' => {
                    depth += 1;
                    self.bump()?;
                }
                '}' => {
                    self.bump()?;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Span::new(start, self.pos));
                    }
                }
                '"' | '\'' => {
                    // Re-use the literal scanners; their errors surface as-is.
                    let literal_start = self.pos;
                    if ch == '\''
                    {
                        self.scan_char_literal(literal_start)?;
                    } else if self.byte_at(self.pos + 1) == Some(b'"')
                        && self.byte_at(self.pos + 2) == Some(b'"')
                    {
                        self.scan_text_block(literal_start)?;
                    } else {
                        self.scan_string(literal_start)?;
                    }
                }
                '/' => match self.byte_at(self.pos + 1) {
                    Some(b'/') => {
                        self.scan_line_comment(self.pos)?;
                    }
                    Some(b'*') => {
                        self.scan_block_comment(self.pos)?;
                    }
                    _ => {
                        self.bump()?;
                    }
                },
                _ => {
                    self.bump()?;
                }
            }
        }
    }

    /// Snapshot for speculative parsing; [`Scanner::restore`] rewinds the
    /// position and truncates the side tables back to the snapshot, so a
    /// rolled-back trial leaves no duplicate line-end/comment records.
    pub fn state(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            comments: self.comments.len(),
            line_ends: self.line_ends.count(),
            task_tags: self.task_tags.len(),
        }
    }

    pub fn restore(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.comments.truncate(state.comments);
        self.line_ends.truncate(state.line_ends);
        self.task_tags.truncate(state.task_tags);
    }

    /// Advance past one character after an error that consumed no input, so
    /// a caller looping on [`Scanner::next_token`] always makes progress.
    pub fn skip_one(&mut self) {
        match self.decode_at(self.pos) {
            Some(Ok((_, len))) => self.pos += len,
            Some(Err(_)) => self.pos = (self.pos + 1).min(self.source.len()),
            None => {}
        }
    }

    // --- operators ----------------------------------------------------------

    fn scan_operator(&mut self, start: usize, ch: char) -> Result<Token, ScanError> {
        use TokenKind::*;
        let next = |s: &Self, n: usize| s.byte_at(s.pos + n);
        let token = match ch {
            '(' => (1, LParen),
            ')' => (1, RParen),
            '{' => (1, LBrace),
            '}' => (1, RBrace),
            '[' => (1, LBracket),
            ']' => (1, RBracket),
            ';' => (1, Semicolon),
            ',' => (1, Comma),
            '@' => (1, At),
            '~' => (1, Tilde),
            '?' => (1, Question),
            ':' => match next(self, 1) {
                Some(b':') => (2, ColonColon),
                _ => (1, Colon),
            },
            '=' => match next(self, 1) {
                Some(b'=') => (2, EqEq),
                _ => (1, Eq),
            },
            '!' => match next(self, 1) {
                Some(b'=') => (2, NotEq),
                _ => (1, Bang),
            },
            '<' => match (next(self, 1), next(self, 2)) {
                (Some(b'='), _) => (2, LtEq),
                (Some(b'<'), Some(b'=')) => (3, ShlEq),
                (Some(b'<'), _) => (2, Shl),
                _ => (1, Lt),
            },
            '>' => match (next(self, 1), next(self, 2), next(self, 3)) {
                (Some(b'='), _, _) => (2, GtEq),
                (Some(b'>'), Some(b'>'), Some(b'=')) => (4, UShrEq),
                (Some(b'>'), Some(b'>'), _) => (3, UShr),
                (Some(b'>'), Some(b'='), _) => (3, ShrEq),
                (Some(b'>'), _, _) => (2, Shr),
                _ => (1, Gt),
            },
            '+' => match next(self, 1) {
                Some(b'+') => (2, PlusPlus),
                Some(b'=') => (2, PlusEq),
                _ => (1, Plus),
            },
            '-' => match next(self, 1) {
                Some(b'-') => (2, MinusMinus),
                Some(b'=') => (2, MinusEq),
                Some(b'>') => (2, Arrow),
                _ => (1, Minus),
            },
            '*' => match next(self, 1) {
                Some(b'=') => (2, StarEq),
                _ => (1, Star),
            },
            '%' => match next(self, 1) {
                Some(b'=') => (2, PercentEq),
                _ => (1, Percent),
            },
            '&' => match next(self, 1) {
                Some(b'&') => (2, AmpAmp),
                Some(b'=') => (2, AmpEq),
                _ => (1, Amp),
            },
            '|' => match next(self, 1) {
                Some(b'|') => (2, PipePipe),
                Some(b'=') => (2, PipeEq),
                _ => (1, Pipe),
            },
            '^' => match next(self, 1) {
                Some(b'=') => (2, CaretEq),
                _ => (1, Caret),
            },
            _ => {
                self.bump()?;
                return Err(ScanError::new(
                    DiagnosticKind::InvalidInput,
                    Span::new(start, self.pos),
                ));
            }
        };
        self.op(start, token.0, token.1)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_ident::is_xid_start(ch)
}

fn is_identifier_part(ch: char) -> bool {
    ch == '$' || unicode_ident::is_xid_continue(ch)
}

fn is_identifier_part_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}
