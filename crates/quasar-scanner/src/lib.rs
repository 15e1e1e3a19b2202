//! Lexical scanner for Java source.
//!
//! One [`Scanner`] instance serves one compilation unit. It produces tokens
//! lazily (including whitespace/comment trivia, so raw spans concatenate back
//! to the original text), decodes `\uXXXX` escapes transparently, records
//! line ends and comment positions in growable side tables, extracts task
//! tags from comments, and can skip method bodies by brace counting ("diet"
//! scanning).

mod comments;
mod line_ends;
mod literals;
mod scanner;
mod token;

pub use comments::{CommentKind, CommentTable, TaskTag};
pub use line_ends::LineEnds;
pub use literals::{
    parse_double_literal, parse_float_literal, parse_int_literal, parse_literal,
    parse_long_literal, unescape_char_literal, unescape_string_literal, unescape_text_block,
    LiteralError, LiteralValue,
};
pub use scanner::{ScanError, Scanner, ScannerState};
pub use token::{restricted_keyword, Token, TokenKind};

use quasar_core::CompilerOptions;

/// Tokenize a whole input with default options, mapping scan errors to
/// `TokenKind::Error` tokens. Convenience for tests and tools.
pub fn lex(input: &str) -> Vec<Token> {
    lex_with_errors(input, CompilerOptions::default()).0
}

/// Tokenize a whole input, collecting scan errors alongside the tokens.
pub fn lex_with_errors(input: &str, options: CompilerOptions) -> (Vec<Token>, Vec<ScanError>) {
    let mut scanner = Scanner::new(input, options);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    loop {
        let start = scanner.position();
        match scanner.next_token() {
            Ok(token) => {
                if token.kind == TokenKind::Eof {
                    tokens.push(token);
                    break;
                }
                tokens.push(token);
            }
            Err(error) => {
                if scanner.position() == start {
                    scanner.skip_one();
                }
                errors.push(error);
                tokens.push(Token::new(
                    TokenKind::Error,
                    quasar_core::Span::new(start, scanner.position()),
                ));
            }
        }
    }
    (tokens, errors)
}
