use pretty_assertions::assert_eq;

use quasar_core::{CompilerOptions, DiagnosticKind, JavaLanguageLevel, TaskPriority};
use quasar_scanner::{lex, lex_with_errors, CommentKind, Scanner, Token, TokenKind};

fn kinds(input: &str) -> Vec<TokenKind> {
    lex(input)
        .into_iter()
        .filter(|t| !t.is_trivia() && t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

fn lex_at(input: &str, level: JavaLanguageLevel) -> (Vec<Token>, Vec<quasar_scanner::ScanError>) {
    lex_with_errors(input, CompilerOptions::at_level(level))
}

#[test]
fn raw_spans_concatenate_back_to_the_source() {
    let input = "class A { int x = 0xFF; // trailing\n  String s = \"hi\\n\"; }";
    let tokens = lex(input);
    let mut rebuilt = String::new();
    for token in &tokens {
        rebuilt.push_str(&input[token.span.start..token.span.end]);
    }
    assert_eq!(rebuilt, input);
}

#[test]
fn unicode_escaped_identifier_scans_as_its_plain_spelling() {
    let input = "\\u0061bc";
    let options = CompilerOptions::default();
    let mut scanner = Scanner::new(input, options);
    let token = scanner.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Identifier);
    assert_eq!(scanner.token_text(&token), "abc");
    // The raw span still covers the escaped spelling.
    assert_eq!(&input[token.span.start..token.span.end], "\\u0061bc");
}

#[test]
fn escaped_backslash_does_not_open_a_unicode_escape() {
    // Four backslashes in source = two literal backslashes; the `u` that
    // follows is plain content.
    let (tokens, errors) = lex_at("\"\\\\u\"", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors, Vec::new());
    assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
}

#[test]
fn keyword_gating_for_assert_and_enum() {
    let (tokens, _) = lex_at("assert", JavaLanguageLevel::JAVA_1_3);
    assert_eq!(tokens[0].kind, TokenKind::Identifier);

    let (tokens, _) = lex_at("assert", JavaLanguageLevel::JAVA_1_4);
    assert_eq!(tokens[0].kind, TokenKind::AssertKw);

    let (tokens, _) = lex_at("enum", JavaLanguageLevel::JAVA_1_4);
    assert_eq!(tokens[0].kind, TokenKind::Identifier);

    let (tokens, _) = lex_at("enum", JavaLanguageLevel::JAVA_1_5);
    assert_eq!(tokens[0].kind, TokenKind::EnumKw);
}

#[test]
fn reserved_word_as_identifier_sets_the_side_flag() {
    let mut scanner = Scanner::new(
        "assert x;",
        CompilerOptions::at_level(JavaLanguageLevel::JAVA_1_3),
    );
    let token = scanner.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Identifier);
    assert!(scanner.used_reserved_word());
}

#[test]
fn numeric_literal_kinds() {
    assert_eq!(
        kinds("0 1L 0x10 0x10L 1f 1.5 1.5d 1e3 0b101 1_000"),
        vec![
            TokenKind::IntLiteral,
            TokenKind::LongLiteral,
            TokenKind::IntLiteral,
            TokenKind::LongLiteral,
            TokenKind::FloatLiteral,
            TokenKind::DoubleLiteral,
            TokenKind::DoubleLiteral,
            TokenKind::DoubleLiteral,
            TokenKind::IntLiteral,
            TokenKind::IntLiteral,
        ]
    );
}

#[test]
fn hex_float_requires_binary_exponent() {
    let (_, errors) = lex_at("0x1.8", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::InvalidFloat);

    let (tokens, errors) = lex_at("0x1.8p1", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors, Vec::new());
    assert_eq!(tokens[0].kind, TokenKind::DoubleLiteral);
}

#[test]
fn hex_floats_and_underscores_are_level_gated() {
    let (_, errors) = lex_at("0x1p1", JavaLanguageLevel::JAVA_1_4);
    assert_eq!(errors[0].kind, DiagnosticKind::FeatureNotAvailable);

    let (_, errors) = lex_at("1_000", JavaLanguageLevel::JAVA_6);
    assert_eq!(errors[0].kind, DiagnosticKind::FeatureNotAvailable);

    let (_, errors) = lex_at("0b11", JavaLanguageLevel::JAVA_6);
    assert_eq!(errors[0].kind, DiagnosticKind::FeatureNotAvailable);
}

#[test]
fn unterminated_string_is_distinct_from_invalid_escape() {
    let (_, errors) = lex_at("\"abc\ndef\"", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors[0].kind, DiagnosticKind::UnterminatedString);

    let (_, errors) = lex_at("\"\\q\"", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors[0].kind, DiagnosticKind::InvalidEscape);
}

#[test]
fn octal_escapes_up_to_377() {
    let (tokens, errors) = lex_at("\"\\377\"", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors, Vec::new());
    assert_eq!(tokens[0].kind, TokenKind::StringLiteral);

    let (_, errors) = lex_at("\"\\378\"", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors[0].kind, DiagnosticKind::InvalidEscape);
}

#[test]
fn comment_table_classification() {
    let input = "// line\n/* block */ /** doc */ int x;";
    let mut scanner = Scanner::new(input, CompilerOptions::default());
    loop {
        match scanner.next_token() {
            Ok(t) if t.kind == TokenKind::Eof => break,
            Ok(_) => {}
            Err(e) => panic!("unexpected scan error: {e}"),
        }
    }
    let comments = scanner.comments();
    assert_eq!(comments.len(), 3);
    assert_eq!(comments.kind(0), CommentKind::Line);
    assert_eq!(comments.kind(1), CommentKind::Block);
    assert_eq!(comments.kind(2), CommentKind::Doc);
    let doc = comments.span(2).unwrap();
    assert_eq!(&input[doc.start..doc.end], "/** doc */");
}

#[test]
fn unterminated_block_comment_reports_and_records() {
    let (_, errors) = lex_at("/* open", JavaLanguageLevel::JAVA_8);
    assert_eq!(errors[0].kind, DiagnosticKind::UnterminatedComment);
}

#[test]
fn task_tags_in_comments() {
    let input = "// TODO: fix overflow\n/* FIXME here */";
    let mut scanner = Scanner::new(input, CompilerOptions::default());
    while let Ok(t) = scanner.next_token() {
        if t.kind == TokenKind::Eof {
            break;
        }
    }
    let tags = scanner.task_tags();
    assert_eq!(tags.len(), 2);
    assert_eq!(&input[tags[0].tag.start..tags[0].tag.end], "TODO");
    assert_eq!(
        input[tags[0].message.start..tags[0].message.end].trim(),
        ": fix overflow"
    );
    assert_eq!(tags[1].priority, TaskPriority::High);
}

#[test]
fn task_tag_suppressed_after_at_sign() {
    let input = "/** @TODO not a task */";
    let mut scanner = Scanner::new(input, CompilerOptions::default());
    while let Ok(t) = scanner.next_token() {
        if t.kind == TokenKind::Eof {
            break;
        }
    }
    assert_eq!(scanner.task_tags(), &[]);
}

#[test]
fn task_tag_case_sensitivity_is_configurable() {
    let options = CompilerOptions {
        task_case_sensitive: false,
        ..CompilerOptions::default()
    };
    let mut scanner = Scanner::new("// todo lower", options);
    while let Ok(t) = scanner.next_token() {
        if t.kind == TokenKind::Eof {
            break;
        }
    }
    assert_eq!(scanner.task_tags().len(), 1);
}

#[test]
fn line_numbers_merge_crlf() {
    let input = "a\r\nb\nc";
    let mut scanner = Scanner::new(input, CompilerOptions::default());
    while let Ok(t) = scanner.next_token() {
        if t.kind == TokenKind::Eof {
            break;
        }
    }
    assert_eq!(scanner.line_number(0), 1); // a
    assert_eq!(scanner.line_number(3), 2); // b
    assert_eq!(scanner.line_number(5), 3); // c
}

#[test]
fn diet_mode_skips_a_body_with_tricky_contents() {
    let input = "{ String s = \"}\"; // }\n char c = '}'; { } } int after;";
    let mut scanner = Scanner::new(input, CompilerOptions::default());
    // Consume the opening brace, then skip.
    let open = scanner.next_token().unwrap();
    assert_eq!(open.kind, TokenKind::LBrace);
    let skipped = scanner.skip_method_body().unwrap();
    assert_eq!(&input[skipped.end - 1..skipped.end], "}");
    let next = loop {
        let t = scanner.next_token().unwrap();
        if !t.is_trivia() {
            break t;
        }
    };
    assert_eq!(next.kind, TokenKind::IntKw);
}

#[test]
fn operators_scan_greedily() {
    assert_eq!(
        kinds("a >>>= b >> c >= d -> e::f"),
        vec![
            TokenKind::Identifier,
            TokenKind::UShrEq,
            TokenKind::Identifier,
            TokenKind::Shr,
            TokenKind::Identifier,
            TokenKind::GtEq,
            TokenKind::Identifier,
            TokenKind::Arrow,
            TokenKind::Identifier,
            TokenKind::ColonColon,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn scanner_reset_clears_unit_state() {
    let mut scanner = Scanner::new("// TODO one\nclass A {}", CompilerOptions::default());
    while let Ok(t) = scanner.next_token() {
        if t.kind == TokenKind::Eof {
            break;
        }
    }
    assert_eq!(scanner.comments().len(), 1);
    assert_eq!(scanner.task_tags().len(), 1);

    scanner.set_source("class B {}");
    assert!(scanner.comments().is_empty());
    assert!(scanner.task_tags().is_empty());
    assert_eq!(scanner.position(), 0);
    let first = scanner.next_token().unwrap();
    assert_eq!(first.kind, TokenKind::ClassKw);
}
