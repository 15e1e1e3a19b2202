//! Recursive-descent parser over the scanner's token stream.
//!
//! The grammar is permissive: unexpected input reports a diagnostic and
//! recovers at a boundary set (class-member boundaries inside type bodies,
//! the [`crate::recovery`] machine inside statement blocks) rather than
//! aborting. A "diet" parse skips method bodies by brace counting and keeps
//! only signatures.

use std::borrow::Cow;
use std::collections::VecDeque;

use quasar_core::{
    CompilerOptions, Diagnostic, DiagnosticBag, DiagnosticKind, DiagnosticSink, Span,
};
use quasar_scanner::{Scanner, ScannerState, Token, TokenKind};

use crate::ast::*;
use crate::javadoc::{DocComment, JavadocParser};
use crate::recovery::{Fragment, Recovery};

/// What the parser produced for one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub unit: CompilationUnit,
    pub diagnostics: Vec<Diagnostic>,
    /// A level-gated reserved word was used as an identifier somewhere.
    pub used_reserved_word: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Skip method bodies (signatures only).
    pub diet: bool,
}

pub fn parse_java(source: &str, options: CompilerOptions) -> ParseResult {
    Parser::new(source, options, ParseOptions::default()).parse()
}

pub fn parse_java_with_options(
    source: &str,
    options: CompilerOptions,
    parse_options: ParseOptions,
) -> ParseResult {
    Parser::new(source, options, parse_options).parse()
}

/// Parse a standalone expression; convenience for tests and the assist layer.
pub fn parse_expression(source: &str, options: CompilerOptions) -> (Expr, Vec<Diagnostic>) {
    let mut parser = Parser::new(source, options, ParseOptions::default());
    let expr = parser.parse_expr();
    (expr, parser.diagnostics.take())
}

/// Parse a standalone block (`{ ... }`); convenience for tests.
pub fn parse_block_fragment(source: &str, options: CompilerOptions) -> (Block, Vec<Diagnostic>) {
    let mut parser = Parser::new(source, options, ParseOptions::default());
    let block = if parser.at(TokenKind::LBrace) {
        parser.parse_block()
    } else {
        Block {
            statements: Vec::new(),
            range: Span::at(0),
        }
    };
    (block, parser.diagnostics.take())
}

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    peeked: VecDeque<Token>,
    pub(crate) diagnostics: DiagnosticBag,
    parse_options: ParseOptions,
    /// Span of the doc comment immediately preceding the current token.
    pending_doc: Option<Span>,
    /// End offset of the most recently consumed token.
    last_end: usize,
    source_len: usize,
}

#[derive(Debug)]
struct Checkpoint {
    scanner: ScannerState,
    current: Token,
    peeked: VecDeque<Token>,
    pending_doc: Option<Span>,
    last_end: usize,
    diagnostics: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: CompilerOptions, parse_options: ParseOptions) -> Self {
        let scanner = Scanner::new(source, options);
        let mut parser = Self {
            scanner,
            current: Token::new(TokenKind::Eof, Span::at(0)),
            peeked: VecDeque::new(),
            diagnostics: DiagnosticBag::new(),
            parse_options,
            pending_doc: None,
            last_end: 0,
            source_len: source.len(),
        };
        parser.current = parser.pull_token();
        parser
    }

    pub fn scanner(&self) -> &Scanner<'a> {
        &self.scanner
    }

    pub fn parse(mut self) -> ParseResult {
        tracing::debug!(len = self.source_len, "parsing compilation unit");
        let unit = self.parse_compilation_unit();
        ParseResult {
            unit,
            used_reserved_word: self.scanner.used_reserved_word(),
            diagnostics: self.diagnostics.take(),
        }
    }

    // --- token plumbing -----------------------------------------------------

    /// Pull the next non-trivia token from the scanner, tracking doc comments
    /// and converting scan errors into error tokens plus diagnostics.
    fn pull_token(&mut self) -> Token {
        loop {
            let start = self.scanner.position();
            match self.scanner.next_token() {
                Ok(token) if token.kind == TokenKind::DocComment => {
                    self.pending_doc = Some(token.span);
                }
                Ok(token) if token.is_trivia() => {}
                Ok(token) => return token,
                Err(error) => {
                    if self.scanner.position() == start {
                        self.scanner.skip_one();
                    }
                    self.diagnostics.report(error.clone().into_diagnostic());
                    return Token::new(
                        TokenKind::Error,
                        Span::new(start, self.scanner.position()),
                    );
                }
            }
        }
    }

    fn bump(&mut self) -> Token {
        let token = self.current;
        self.last_end = token.span.end;
        self.current = match self.peeked.pop_front() {
            Some(token) => token,
            None => self.pull_token(),
        };
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    fn nth(&mut self, n: usize) -> TokenKind {
        if n == 0 {
            return self.current.kind;
        }
        while self.peeked.len() < n {
            let token = self.pull_token();
            self.peeked.push_back(token);
        }
        self.peeked[n - 1].kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.diagnostics.report(
            Diagnostic::new(DiagnosticKind::ExpectedToken, self.current.span).with_arg(what),
        );
        false
    }

    fn error_here(&mut self, kind: DiagnosticKind, arg: &str) {
        self.diagnostics
            .report(Diagnostic::new(kind, self.current.span).with_arg(arg));
    }

    fn text(&self, token: &Token) -> Cow<'a, str> {
        self.scanner.token_text(token)
    }

    fn current_text(&self) -> Cow<'a, str> {
        self.text(&self.current)
    }

    fn at_contextual(&self, word: &str) -> bool {
        self.at(TokenKind::Identifier) && self.current_text() == word
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            scanner: self.scanner.state(),
            current: self.current,
            peeked: self.peeked.clone(),
            pending_doc: self.pending_doc,
            last_end: self.last_end,
            diagnostics: self.diagnostics.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        // Diagnostics reported during the trial are rolled back with it.
        let kept = self.diagnostics.take();
        let mut bag = DiagnosticBag::new();
        for diagnostic in kept.into_iter().take(checkpoint.diagnostics) {
            bag.report(diagnostic);
        }
        self.diagnostics = bag;
        self.scanner.restore(checkpoint.scanner);
        self.current = checkpoint.current;
        self.peeked = checkpoint.peeked;
        self.pending_doc = checkpoint.pending_doc;
        self.last_end = checkpoint.last_end;
    }

    fn take_doc(&mut self, before: usize) -> Option<DocComment> {
        let span = self.pending_doc.take()?;
        if span.end > before || !self.scanner.options().doc_comment_support {
            return None;
        }
        let parser = JavadocParser::new(self.scanner.source(), self.scanner.options());
        let mut sink = DiagnosticBag::new();
        let doc = parser.parse(span.start, span.end, &mut sink);
        for diagnostic in sink.take() {
            self.diagnostics.report(diagnostic);
        }
        Some(doc)
    }

    // --- compilation unit ---------------------------------------------------

    fn parse_compilation_unit(&mut self) -> CompilationUnit {
        let mut unit = CompilationUnit {
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
            range: Span::new(0, self.source_len),
        };

        if self.at(TokenKind::PackageKw) {
            let start = self.current.span.start;
            self.bump();
            let name = self.parse_qualified_name();
            self.expect(TokenKind::Semicolon, "`;`");
            unit.package = Some(PackageDecl {
                name,
                range: Span::new(start, self.prev_end(start)),
            });
        }

        while self.at(TokenKind::ImportKw) {
            let start = self.current.span.start;
            self.bump();
            let is_static = self.eat(TokenKind::StaticKw);
            let path = self.parse_qualified_name();
            let is_star = if self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Star {
                self.bump();
                self.bump();
                true
            } else {
                false
            };
            self.expect(TokenKind::Semicolon, "`;`");
            unit.imports.push(ImportDecl {
                is_static,
                is_star,
                path,
                range: Span::new(start, self.prev_end(start)),
            });
        }

        while !self.at_eof() {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            match self.try_parse_type_declaration() {
                Some(decl) => unit.types.push(decl),
                None => {
                    // Top-level junk: report once and resynchronize.
                    self.error_here(DiagnosticKind::SyntaxError, "type declaration");
                    self.recover_to_top_level();
                }
            }
        }

        unit
    }

    fn recover_to_top_level(&mut self) {
        let mut depth = 0usize;
        // Always consume the offending token first so recovery progresses.
        self.bump();
        while !self.at_eof() {
            match self.current.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth > 0 => depth -= 1,
                TokenKind::ClassKw
                | TokenKind::InterfaceKw
                | TokenKind::EnumKw
                | TokenKind::PackageKw
                | TokenKind::ImportKw
                    if depth == 0 =>
                {
                    return
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// End offset of the token just consumed, with `fallback` for empty runs.
    fn prev_end(&self, fallback: usize) -> usize {
        self.last_end.max(fallback).min(self.source_len)
    }

    fn parse_qualified_name(&mut self) -> String {
        let mut name = String::new();
        if self.at(TokenKind::Identifier) {
            name.push_str(&self.current_text());
            self.bump();
        } else {
            self.error_here(DiagnosticKind::ExpectedToken, "name");
            return name;
        }
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
            self.bump();
            name.push('.');
            name.push_str(&self.current_text());
            self.bump();
        }
        name
    }

    // --- modifiers & annotations -------------------------------------------

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        let start = self.current.span.start;
        let mut end = start;
        loop {
            let kind = self.current.kind;
            let modifier = match kind {
                TokenKind::PublicKw => Some(Modifier::Public),
                TokenKind::ProtectedKw => Some(Modifier::Protected),
                TokenKind::PrivateKw => Some(Modifier::Private),
                TokenKind::StaticKw => Some(Modifier::Static),
                TokenKind::AbstractKw => Some(Modifier::Abstract),
                TokenKind::FinalKw => Some(Modifier::Final),
                TokenKind::NativeKw => Some(Modifier::Native),
                TokenKind::SynchronizedKw if self.nth(1) != TokenKind::LParen => {
                    Some(Modifier::Synchronized)
                }
                TokenKind::TransientKw => Some(Modifier::Transient),
                TokenKind::VolatileKw => Some(Modifier::Volatile),
                TokenKind::StrictfpKw => Some(Modifier::Strictfp),
                TokenKind::DefaultKw if self.nth(1) != TokenKind::Colon => {
                    Some(Modifier::Default)
                }
                TokenKind::At if self.nth(1) == TokenKind::Identifier => {
                    let annotation = self.parse_annotation();
                    end = annotation.range.end;
                    modifiers.annotations.push(annotation);
                    continue;
                }
                TokenKind::Identifier => {
                    let level = self.scanner.options().source_level;
                    let text = self.current_text();
                    if text == "sealed" && level.supports_sealed() {
                        Some(Modifier::Sealed)
                    } else if text == "non"
                        && level.supports_sealed()
                        && self.nth(1) == TokenKind::Minus
                        && self.nth(2) == TokenKind::Identifier
                    {
                        // `non-sealed` is three tokens; only this spelling is
                        // a modifier.
                        let sealed_follows = {
                            let token = self.peeked[1];
                            self.text(&token) == "sealed"
                        };
                        if sealed_follows {
                            self.bump();
                            self.bump();
                            Some(Modifier::NonSealed)
                        } else {
                            None
                        }
                    } else {
                        None
                    }
                }
                _ => None,
            };
            let Some(modifier) = modifier else { break };
            end = self.current.span.end;
            self.bump();
            modifiers.insert(modifier);
        }
        modifiers.range = Span::new(start, end.max(start));
        modifiers
    }

    fn parse_annotation(&mut self) -> Annotation {
        let start = self.current.span.start;
        self.bump(); // @
        let name = self.parse_qualified_name();
        let mut args = Vec::new();
        if self.at(TokenKind::LParen) {
            args = self.parse_argument_list();
        }
        Annotation {
            name,
            args,
            range: Span::new(start, self.prev_end(start)),
        }
    }

    // --- type declarations --------------------------------------------------

    fn at_type_declaration_start(&mut self) -> bool {
        match self.current.kind {
            TokenKind::ClassKw | TokenKind::InterfaceKw | TokenKind::EnumKw => true,
            TokenKind::At => self.nth(1) == TokenKind::InterfaceKw,
            TokenKind::Identifier => {
                let level = self.scanner.options().source_level;
                let text = self.current_text();
                if text == "record" {
                    return level.supports_records()
                        && self.nth(1) == TokenKind::Identifier
                        && self.nth(2) == TokenKind::LParen;
                }
                if text == "sealed" {
                    return level.supports_sealed();
                }
                // `non-sealed` spelled as three tokens.
                text == "non"
                    && level.supports_sealed()
                    && self.nth(1) == TokenKind::Minus
                    && self.nth(2) == TokenKind::Identifier
            }
            kind => {
                kind.is_modifier_keyword()
                    || (kind == TokenKind::At && self.nth(1) == TokenKind::Identifier)
            }
        }
    }

    fn try_parse_type_declaration(&mut self) -> Option<TypeDecl> {
        if !self.at_type_declaration_start() {
            return None;
        }
        let start = self.current.span.start;
        let doc = self.take_doc(start);
        let modifiers = self.parse_modifiers();
        self.parse_type_declaration_after_modifiers(modifiers, doc)
    }

    fn parse_type_declaration_after_modifiers(
        &mut self,
        modifiers: Modifiers,
        doc: Option<DocComment>,
    ) -> Option<TypeDecl> {
        let kind = self.current.kind;
        match kind {
            TokenKind::ClassKw => Some(self.parse_class_decl(modifiers, doc)),
            TokenKind::InterfaceKw => Some(self.parse_interface_decl(modifiers, doc)),
            TokenKind::EnumKw => Some(self.parse_enum_decl(modifiers, doc)),
            TokenKind::At if self.nth(1) == TokenKind::InterfaceKw => {
                Some(self.parse_annotation_decl(modifiers, doc))
            }
            TokenKind::Identifier
                if self.current_text() == "record"
                    && self.scanner.options().source_level.supports_records()
                    && self.nth(1) == TokenKind::Identifier =>
            {
                Some(self.parse_record_decl(modifiers, doc))
            }
            _ => None,
        }
    }

    fn parse_type_name(&mut self) -> (String, Span) {
        if self.at(TokenKind::Identifier) {
            let span = self.current.span;
            let name = self.current_text().into_owned();
            self.bump();
            (name, span)
        } else {
            self.error_here(DiagnosticKind::ExpectedToken, "type name");
            (String::new(), self.current.span)
        }
    }

    fn parse_class_decl(&mut self, modifiers: Modifiers, doc: Option<DocComment>) -> TypeDecl {
        let start = modifiers_start(&modifiers, self.current.span.start);
        self.bump(); // class
        let (name, name_range) = self.parse_type_name();
        let type_parameters = self.parse_type_parameters_opt();
        let extends = if self.eat(TokenKind::ExtendsKw) {
            Some(self.parse_type())
        } else {
            None
        };
        let implements = if self.eat(TokenKind::ImplementsKw) {
            self.parse_type_list()
        } else {
            Vec::new()
        };
        let permits = self.parse_permits_opt();
        let (members, body_range) = self.parse_class_body();
        TypeDecl::Class(ClassDecl {
            modifiers,
            name,
            name_range,
            type_parameters,
            extends,
            implements,
            permits,
            members,
            doc,
            body_range,
            range: Span::new(start, body_range.end.max(start)),
        })
    }

    fn parse_interface_decl(&mut self, modifiers: Modifiers, doc: Option<DocComment>) -> TypeDecl {
        let start = modifiers_start(&modifiers, self.current.span.start);
        self.bump(); // interface
        let (name, name_range) = self.parse_type_name();
        let type_parameters = self.parse_type_parameters_opt();
        let extends = if self.eat(TokenKind::ExtendsKw) {
            self.parse_type_list()
        } else {
            Vec::new()
        };
        let permits = self.parse_permits_opt();
        let (members, body_range) = self.parse_class_body();
        TypeDecl::Interface(InterfaceDecl {
            modifiers,
            name,
            name_range,
            type_parameters,
            extends,
            permits,
            members,
            doc,
            body_range,
            range: Span::new(start, body_range.end.max(start)),
        })
    }

    fn parse_enum_decl(&mut self, modifiers: Modifiers, doc: Option<DocComment>) -> TypeDecl {
        let start = modifiers_start(&modifiers, self.current.span.start);
        self.bump(); // enum
        let (name, name_range) = self.parse_type_name();
        let implements = if self.eat(TokenKind::ImplementsKw) {
            self.parse_type_list()
        } else {
            Vec::new()
        };

        let body_start = self.current.span.start;
        self.expect(TokenKind::LBrace, "`{`");
        let mut constants = Vec::new();
        while self.at(TokenKind::Identifier) {
            let const_start = self.current.span.start;
            let name_range = self.current.span;
            let const_name = self.current_text().into_owned();
            self.bump();
            let args = if self.at(TokenKind::LParen) {
                self.parse_argument_list()
            } else {
                Vec::new()
            };
            let body = if self.at(TokenKind::LBrace) {
                let (members, _) = self.parse_class_body();
                Some(members)
            } else {
                None
            };
            constants.push(EnumConstant {
                name: const_name,
                name_range,
                args,
                body,
                range: Span::new(const_start, self.prev_end(const_start)),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let mut members = Vec::new();
        if self.eat(TokenKind::Semicolon) {
            while !self.at(TokenKind::RBrace) && !self.at_eof() {
                if let Some(member) = self.parse_class_member() {
                    members.push(member);
                }
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let body_range = Span::new(body_start, self.prev_end(body_start));
        TypeDecl::Enum(EnumDecl {
            modifiers,
            name,
            name_range,
            implements,
            constants,
            members,
            doc,
            body_range,
            range: Span::new(start, body_range.end.max(start)),
        })
    }

    fn parse_record_decl(&mut self, modifiers: Modifiers, doc: Option<DocComment>) -> TypeDecl {
        let start = modifiers_start(&modifiers, self.current.span.start);
        self.bump(); // `record` (contextual)
        let (name, name_range) = self.parse_type_name();
        let type_parameters = self.parse_type_parameters_opt();
        let components = if self.at(TokenKind::LParen) {
            self.parse_parameter_list()
        } else {
            self.error_here(DiagnosticKind::ExpectedToken, "record header");
            Vec::new()
        };
        let implements = if self.eat(TokenKind::ImplementsKw) {
            self.parse_type_list()
        } else {
            Vec::new()
        };
        let (members, body_range) = self.parse_class_body();
        TypeDecl::Record(RecordDecl {
            modifiers,
            name,
            name_range,
            type_parameters,
            components,
            implements,
            members,
            doc,
            body_range,
            range: Span::new(start, body_range.end.max(start)),
        })
    }

    fn parse_annotation_decl(&mut self, modifiers: Modifiers, doc: Option<DocComment>) -> TypeDecl {
        let start = modifiers_start(&modifiers, self.current.span.start);
        self.bump(); // @
        self.expect(TokenKind::InterfaceKw, "`interface`");
        let (name, name_range) = self.parse_type_name();
        let (members, body_range) = self.parse_class_body();
        TypeDecl::Annotation(AnnotationDecl {
            modifiers,
            name,
            name_range,
            members,
            doc,
            body_range,
            range: Span::new(start, body_range.end.max(start)),
        })
    }

    fn parse_permits_opt(&mut self) -> Vec<TypeRef> {
        if self.at_contextual("permits")
            && self.scanner.options().source_level.supports_sealed()
        {
            self.bump();
            self.parse_type_list()
        } else {
            Vec::new()
        }
    }

    // --- class bodies -------------------------------------------------------

    fn parse_class_body(&mut self) -> (Vec<MemberDecl>, Span) {
        let body_start = self.current.span.start;
        if !self.expect(TokenKind::LBrace, "`{`") {
            return (Vec::new(), Span::new(body_start, body_start));
        }
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            if let Some(member) = self.parse_class_member() {
                members.push(member);
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        (members, Span::new(body_start, self.prev_end(body_start)))
    }

    fn parse_class_member(&mut self) -> Option<MemberDecl> {
        let start = self.current.span.start;
        let doc = self.take_doc(start);
        let modifiers = self.parse_modifiers();

        // Initializer blocks.
        if self.at(TokenKind::LBrace) {
            let body = self.parse_block();
            let range = Span::new(
                modifiers_start(&modifiers, body.range.start),
                body.range.end,
            );
            return Some(MemberDecl::Initializer(InitializerDecl {
                is_static: modifiers.contains(Modifier::Static),
                body,
                range,
            }));
        }

        // Empty declaration.
        if self.eat(TokenKind::Semicolon) {
            return None;
        }

        // Nested types.
        if let Some(decl) = self.parse_type_declaration_after_modifiers(modifiers.clone(), doc.clone())
        {
            return Some(MemberDecl::Type(decl));
        }

        // Generic method type parameters.
        let type_parameters = if self.at(TokenKind::Lt) {
            self.parse_type_parameters_opt()
        } else {
            Vec::new()
        };

        // Constructor: Ident `(`.
        if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::LParen {
            let (name, name_range) = self.parse_type_name();
            let params = self.parse_parameter_list();
            let throws = self.parse_throws_opt();
            let body = self.parse_method_body_opt().0;
            let range = Span::new(
                modifiers_start(&modifiers, name_range.start),
                self.prev_end(name_range.start),
            );
            return Some(MemberDecl::Constructor(ConstructorDecl {
                modifiers,
                type_parameters,
                name,
                name_range,
                params,
                throws,
                body,
                doc,
                range,
            }));
        }

        // Method or field: return type first.
        if self.at(TokenKind::VoidKw)
            || self.current.kind.is_primitive_type_keyword()
            || self.at(TokenKind::Identifier)
        {
            let ty = self.parse_type();
            if !self.at(TokenKind::Identifier) {
                self.error_here(DiagnosticKind::SyntaxError, "member name");
                self.recover_to_class_member_boundary();
                return None;
            }
            let name_range = self.current.span;
            let name = self.current_text().into_owned();
            self.bump();

            if self.at(TokenKind::LParen) {
                let params = self.parse_parameter_list();
                let mut extra_dims = 0u8;
                while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
                    self.bump();
                    self.bump();
                    extra_dims += 1;
                }
                let throws = self.parse_throws_opt();
                let (body, body_range) = self.parse_method_body_opt();
                let mut return_ty = ty;
                return_ty.dimensions = return_ty.dimensions.saturating_add(extra_dims);
                let range = Span::new(
                    modifiers_start(&modifiers, return_ty.range.start),
                    self.prev_end(name_range.start),
                );
                return Some(MemberDecl::Method(MethodDecl {
                    modifiers,
                    type_parameters,
                    return_ty,
                    name,
                    name_range,
                    params,
                    throws,
                    body,
                    body_range,
                    doc,
                    range,
                }));
            }

            // Field declarator list; each declarator becomes its own node.
            return Some(self.parse_field_rest(modifiers, doc, ty, name, name_range));
        }

        // Give up on this member.
        self.error_here(DiagnosticKind::SyntaxError, "class member");
        self.recover_to_class_member_boundary();
        None
    }

    fn parse_field_rest(
        &mut self,
        modifiers: Modifiers,
        doc: Option<DocComment>,
        ty: TypeRef,
        first_name: String,
        first_name_range: Span,
    ) -> MemberDecl {
        let start = modifiers_start(&modifiers, ty.range.start);
        let mut ty = ty;
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            ty.dimensions = ty.dimensions.saturating_add(1);
        }
        let initializer = if self.eat(TokenKind::Eq) {
            Some(self.parse_variable_initializer())
        } else {
            None
        };
        // Only the first declarator is modeled; the rest of the list is
        // consumed permissively below.
        let field = FieldDecl {
            modifiers,
            ty,
            name: first_name,
            name_range: first_name_range,
            initializer,
            doc,
            range: Span::new(start, self.prev_end(start)),
        };
        // Swallow `, b = ...` declarators permissively.
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::Identifier) {
                self.bump();
                while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
                    self.bump();
                    self.bump();
                }
                if self.eat(TokenKind::Eq) {
                    let _ = self.parse_variable_initializer();
                }
            } else {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, "`;`");
        MemberDecl::Field(field)
    }

    fn recover_to_class_member_boundary(&mut self) {
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current.kind {
                TokenKind::Semicolon if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.bump();
        }
    }

    fn parse_method_body_opt(&mut self) -> (Option<Block>, Option<Span>) {
        if self.at(TokenKind::LBrace) {
            if self.parse_options.diet && self.peeked.is_empty() {
                // The scanner sits just past the `{` held in `current`; skip
                // the body there and resynchronize the token stream after it.
                let open = self.current.span;
                match self.scanner.skip_method_body() {
                    Ok(span) => {
                        self.last_end = span.end;
                        self.current = self.pull_token();
                        return (None, Some(Span::new(open.start, span.end)));
                    }
                    Err(error) => {
                        self.diagnostics.report(error.into_diagnostic());
                        self.last_end = self.source_len;
                        self.current = self.pull_token();
                        return (None, Some(Span::new(open.start, self.source_len)));
                    }
                }
            }
            (Some(self.parse_block()), None)
        } else {
            self.expect(TokenKind::Semicolon, "`;` or method body");
            (None, None)
        }
    }

    // --- types --------------------------------------------------------------

    fn at_type_start(&self) -> bool {
        self.current.kind.is_primitive_type_keyword()
            || self.at(TokenKind::Identifier)
            || self.at(TokenKind::VoidKw)
    }

    pub(crate) fn parse_type(&mut self) -> TypeRef {
        let start = self.current.span.start;
        let mut name = String::new();
        if self.at(TokenKind::VoidKw) {
            name.push_str("void");
            self.bump();
        } else if self.current.kind.is_primitive_type_keyword() {
            name.push_str(&self.current_text());
            self.bump();
        } else if self.at(TokenKind::Identifier) {
            name = self.parse_qualified_name_with_generics_prefix();
        } else {
            self.error_here(DiagnosticKind::ExpectedToken, "type");
            return TypeRef {
                name,
                type_args: Vec::new(),
                dimensions: 0,
                range: Span::at(start),
            };
        }

        let type_args = if self.at(TokenKind::Lt) && self.type_args_follow() {
            self.parse_type_arguments()
        } else {
            Vec::new()
        };

        let mut dimensions = 0u8;
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            dimensions = dimensions.saturating_add(1);
        }

        TypeRef {
            name,
            type_args,
            dimensions,
            range: Span::new(start, self.prev_end(start)),
        }
    }

    /// Dotted name without consuming a trailing generic argument list; the
    /// caller parses that.
    fn parse_qualified_name_with_generics_prefix(&mut self) -> String {
        let mut name = String::new();
        name.push_str(&self.current_text());
        self.bump();
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
            self.bump();
            name.push('.');
            name.push_str(&self.current_text());
            self.bump();
        }
        name
    }

    /// Whether a `<` at the current position opens type arguments rather than
    /// a less-than comparison: a conservative scan for the matching `>`.
    fn type_args_follow(&mut self) -> bool {
        debug_assert!(self.at(TokenKind::Lt));
        let mut n = 1;
        let mut depth = 1i32;
        // Bounded lookahead keeps this cheap on pathological input.
        while n < 64 {
            let kind = self.nth(n);
            match kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth -= 1,
                TokenKind::Shr => depth -= 2,
                TokenKind::UShr => depth -= 3,
                TokenKind::Identifier
                | TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::Question
                | TokenKind::ExtendsKw
                | TokenKind::SuperKw
                | TokenKind::LBracket
                | TokenKind::RBracket => {}
                kind if kind.is_primitive_type_keyword() => {}
                _ => return false,
            }
            if depth <= 0 {
                return true;
            }
            n += 1;
        }
        false
    }

    fn parse_type_arguments(&mut self) -> Vec<TypeRef> {
        let mut args = Vec::new();
        self.bump(); // <
        if self.close_type_args_if_possible() {
            return args; // diamond
        }
        loop {
            if self.at(TokenKind::Question) {
                let start = self.current.span;
                self.bump();
                if self.eat(TokenKind::ExtendsKw) || self.eat(TokenKind::SuperKw) {
                    let bound = self.parse_type();
                    args.push(TypeRef {
                        name: format!("? {}", bound.name),
                        type_args: bound.type_args,
                        dimensions: bound.dimensions,
                        range: Span::new(start.start, bound.range.end),
                    });
                } else {
                    args.push(TypeRef {
                        name: "?".to_string(),
                        type_args: Vec::new(),
                        dimensions: 0,
                        range: start,
                    });
                }
            } else {
                args.push(self.parse_type());
            }
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.close_type_args_if_possible();
            break;
        }
        args
    }

    /// Consume one level of `>` closure, splitting `>>`/`>>>` tokens.
    fn close_type_args_if_possible(&mut self) -> bool {
        match self.current.kind {
            TokenKind::Gt => {
                self.bump();
                true
            }
            TokenKind::Shr => {
                // Split: consume one `>`, leave a `>` behind.
                let span = self.current.span;
                self.current = Token::new(TokenKind::Gt, Span::new(span.start + 1, span.end));
                true
            }
            TokenKind::UShr => {
                let span = self.current.span;
                self.current = Token::new(TokenKind::Shr, Span::new(span.start + 1, span.end));
                true
            }
            _ => false,
        }
    }

    fn parse_type_list(&mut self) -> Vec<TypeRef> {
        let mut types = vec![self.parse_type()];
        while self.eat(TokenKind::Comma) {
            types.push(self.parse_type());
        }
        types
    }

    fn parse_type_parameters_opt(&mut self) -> Vec<TypeParameter> {
        if !self.at(TokenKind::Lt) {
            return Vec::new();
        }
        self.bump();
        let mut params = Vec::new();
        loop {
            if !self.at(TokenKind::Identifier) {
                break;
            }
            let start = self.current.span.start;
            let name = self.current_text().into_owned();
            self.bump();
            let mut bounds = Vec::new();
            if self.eat(TokenKind::ExtendsKw) {
                bounds.push(self.parse_type());
                while self.eat(TokenKind::Amp) {
                    bounds.push(self.parse_type());
                }
            }
            params.push(TypeParameter {
                name,
                bounds,
                range: Span::new(start, self.prev_end(start)),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.close_type_args_if_possible();
        params
    }

    fn parse_throws_opt(&mut self) -> Vec<TypeRef> {
        if self.eat(TokenKind::ThrowsKw) {
            self.parse_type_list()
        } else {
            Vec::new()
        }
    }

    fn parse_parameter_list(&mut self) -> Vec<ParamDecl> {
        let mut params = Vec::new();
        if !self.expect(TokenKind::LParen, "`(`") {
            return params;
        }
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            let start = self.current.span.start;
            let mut modifiers = Modifiers::default();
            while self.at(TokenKind::FinalKw)
                || (self.at(TokenKind::At) && self.nth(1) == TokenKind::Identifier)
            {
                if self.at(TokenKind::FinalKw) {
                    self.bump();
                    modifiers.insert(Modifier::Final);
                } else {
                    let annotation = self.parse_annotation();
                    modifiers.annotations.push(annotation);
                }
            }
            if !self.at_type_start() {
                self.error_here(DiagnosticKind::ExpectedToken, "parameter type");
                break;
            }
            let mut ty = self.parse_type();
            let varargs = self.eat(TokenKind::Ellipsis);
            let (name, name_range) = if self.at(TokenKind::Identifier) {
                let span = self.current.span;
                let name = self.current_text().into_owned();
                self.bump();
                (name, span)
            } else {
                self.error_here(DiagnosticKind::ExpectedToken, "parameter name");
                (String::new(), self.current.span)
            };
            while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
                self.bump();
                self.bump();
                ty.dimensions = ty.dimensions.saturating_add(1);
            }
            params.push(ParamDecl {
                modifiers,
                ty,
                name,
                name_range,
                varargs,
                range: Span::new(start, self.prev_end(start)),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        params
    }

    // --- statements ---------------------------------------------------------

    pub(crate) fn parse_block(&mut self) -> Block {
        let start = self.current.span.start;
        self.expect(TokenKind::LBrace, "`{`");
        let mut statements = Vec::new();
        loop {
            if self.eat(TokenKind::RBrace) {
                return Block {
                    statements,
                    range: Span::new(start, self.prev_end(start)),
                };
            }
            if self.at_eof() {
                // Unclosed block: hand everything to the recovery machine so
                // the fully-parsed statements survive reconciliation.
                self.diagnostics.report(
                    Diagnostic::new(DiagnosticKind::UnmatchedBracket, Span::at(start))
                        .with_arg("`}`"),
                );
                return self.recover_block(start, statements);
            }
            if !self.at_statement_start() {
                self.error_here(DiagnosticKind::SyntaxError, "statement");
                return self.recover_block(start, statements);
            }
            statements.push(self.parse_statement());
        }
    }

    /// Drive the recovery machine over the remaining tokens of a broken
    /// block.
    fn recover_block(&mut self, start: usize, parsed: Vec<Stmt>) -> Block {
        let mut recovery = Recovery::for_body(start);
        for stmt in parsed {
            recovery.add(Fragment::Statement(stmt), 1);
        }
        while !self.at_eof() && !recovery.is_closed() {
            let kind = self.current.kind;
            match kind {
                TokenKind::LBrace => {
                    let offset = self.current.span.start;
                    self.bump();
                    recovery.on_opening_brace(offset);
                }
                TokenKind::RBrace => {
                    let offset = self.current.span.start;
                    self.bump();
                    recovery.on_closing_brace(offset);
                }
                _ if self.at_statement_start() => {
                    let stmt = self.parse_statement();
                    recovery.add(Fragment::Statement(stmt), 1);
                }
                _ => {
                    self.bump();
                }
            }
        }
        recovery.updated_block(self.prev_end(start))
    }

    fn at_statement_start(&mut self) -> bool {
        match self.current.kind {
            TokenKind::LBrace
            | TokenKind::Semicolon
            | TokenKind::IfKw
            | TokenKind::WhileKw
            | TokenKind::DoKw
            | TokenKind::ForKw
            | TokenKind::ReturnKw
            | TokenKind::AssertKw
            | TokenKind::ThrowKw
            | TokenKind::TryKw
            | TokenKind::SwitchKw
            | TokenKind::BreakKw
            | TokenKind::ContinueKw
            | TokenKind::SynchronizedKw
            | TokenKind::ClassKw
            | TokenKind::AbstractKw
            | TokenKind::FinalKw
            | TokenKind::NewKw
            | TokenKind::ThisKw
            | TokenKind::SuperKw
            | TokenKind::Identifier
            | TokenKind::At
            | TokenKind::LParen
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus => true,
            kind if kind.is_primitive_type_keyword() => true,
            kind if kind.is_literal() => true,
            _ => false,
        }
    }

    pub(crate) fn parse_statement(&mut self) -> Stmt {
        let start = self.current.span.start;
        let kind = self.current.kind;
        match kind {
            TokenKind::LBrace => Stmt::Block(self.parse_block()),
            TokenKind::Semicolon => {
                self.bump();
                Stmt::Empty(Span::new(start, self.prev_end(start)))
            }
            TokenKind::IfKw => self.parse_if(),
            TokenKind::WhileKw => self.parse_while(),
            TokenKind::DoKw => self.parse_do_while(),
            TokenKind::ForKw => self.parse_for(),
            TokenKind::ReturnKw => {
                self.bump();
                let expr = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.expect(TokenKind::Semicolon, "`;`");
                Stmt::Return(ReturnStmt {
                    expr,
                    range: Span::new(start, self.prev_end(start)),
                })
            }
            TokenKind::AssertKw => {
                self.bump();
                let condition = self.parse_expr();
                let detail = if self.eat(TokenKind::Colon) {
                    Some(self.parse_expr())
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "`;`");
                Stmt::Assert(AssertStmt {
                    condition,
                    detail,
                    range: Span::new(start, self.prev_end(start)),
                })
            }
            TokenKind::ThrowKw => {
                self.bump();
                let expr = self.parse_expr();
                self.expect(TokenKind::Semicolon, "`;`");
                Stmt::Throw(ThrowStmt {
                    expr,
                    range: Span::new(start, self.prev_end(start)),
                })
            }
            TokenKind::TryKw => self.parse_try(),
            TokenKind::SwitchKw => self.parse_switch(),
            TokenKind::BreakKw | TokenKind::ContinueKw => {
                let is_break = self.at(TokenKind::BreakKw);
                self.bump();
                let label = if self.at(TokenKind::Identifier) {
                    let label = self.current_text().into_owned();
                    self.bump();
                    Some(label)
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "`;`");
                let stmt = BranchStmt {
                    label,
                    range: Span::new(start, self.prev_end(start)),
                };
                if is_break {
                    Stmt::Break(stmt)
                } else {
                    Stmt::Continue(stmt)
                }
            }
            TokenKind::SynchronizedKw => {
                self.bump();
                self.expect(TokenKind::LParen, "`(`");
                let monitor = self.parse_expr();
                self.expect(TokenKind::RParen, "`)`");
                let body = self.parse_block();
                Stmt::Synchronized(SynchronizedStmt {
                    monitor,
                    body,
                    range: Span::new(start, self.prev_end(start)),
                })
            }
            TokenKind::ClassKw | TokenKind::FinalKw | TokenKind::AbstractKw => {
                self.parse_local_type_or_var()
            }
            TokenKind::Identifier
                if self.at_contextual("yield") && self.nth(1) != TokenKind::Eq =>
            {
                self.bump();
                let expr = Some(self.parse_expr());
                self.expect(TokenKind::Semicolon, "`;`");
                Stmt::Yield(ReturnStmt {
                    expr,
                    range: Span::new(start, self.prev_end(start)),
                })
            }
            kind if kind.is_primitive_type_keyword() => self.parse_local_var_statement(),
            TokenKind::Identifier if self.local_var_follows() => self.parse_local_var_statement(),
            _ => {
                let expr = self.parse_expr();
                self.expect(TokenKind::Semicolon, "`;`");
                Stmt::Expr(ExprStmt {
                    expr,
                    range: Span::new(start, self.prev_end(start)),
                })
            }
        }
    }

    fn parse_local_type_or_var(&mut self) -> Stmt {
        let checkpoint = self.checkpoint();
        let modifiers = self.parse_modifiers();
        if let Some(decl) = self.parse_type_declaration_after_modifiers(modifiers, None) {
            return Stmt::LocalType(decl);
        }
        self.restore(checkpoint);
        self.parse_local_var_statement()
    }

    /// Lookahead: `Identifier ...` starts a local variable declaration when a
    /// second identifier follows the type spelling (`Foo x`, `Foo<T> x`,
    /// `Foo[] x`, `foo.Bar x`, `var x`).
    fn local_var_follows(&mut self) -> bool {
        if self.at_contextual("var")
            && self.scanner.options().source_level.supports_var_local_inference()
            && self.nth(1) == TokenKind::Identifier
        {
            return true;
        }
        let mut n = 1;
        loop {
            match self.nth(n) {
                TokenKind::Dot => {
                    if self.nth(n + 1) == TokenKind::Identifier {
                        n += 2;
                    } else {
                        return false;
                    }
                }
                TokenKind::Lt => {
                    // Generic type spelling; scan to the close.
                    let mut depth = 1i32;
                    n += 1;
                    while depth > 0 && n < 64 {
                        match self.nth(n) {
                            TokenKind::Lt => depth += 1,
                            TokenKind::Gt => depth -= 1,
                            TokenKind::Shr => depth -= 2,
                            TokenKind::UShr => depth -= 3,
                            TokenKind::Eof => return false,
                            TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => {
                                return false
                            }
                            _ => {}
                        }
                        n += 1;
                    }
                }
                TokenKind::LBracket => {
                    if self.nth(n + 1) == TokenKind::RBracket {
                        n += 2;
                    } else {
                        return false;
                    }
                }
                TokenKind::Identifier => return true,
                _ => return false,
            }
        }
    }

    fn parse_local_var_statement(&mut self) -> Stmt {
        let start = self.current.span.start;
        let modifiers = Modifiers::default();
        let ty = self.parse_type();
        let (name, name_range) = if self.at(TokenKind::Identifier) {
            let span = self.current.span;
            let name = self.current_text().into_owned();
            self.bump();
            (name, span)
        } else {
            self.error_here(DiagnosticKind::ExpectedToken, "variable name");
            (String::new(), self.current.span)
        };
        let initializer = if self.eat(TokenKind::Eq) {
            Some(self.parse_variable_initializer())
        } else {
            None
        };
        // Additional declarators are swallowed permissively.
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::Identifier) {
                self.bump();
                if self.eat(TokenKind::Eq) {
                    let _ = self.parse_variable_initializer();
                }
            } else {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, "`;`");
        Stmt::LocalVar(LocalVarStmt {
            modifiers,
            ty,
            name,
            name_range,
            initializer,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_variable_initializer(&mut self) -> Expr {
        if self.at(TokenKind::LBrace) {
            let start = self.current.span.start;
            self.bump();
            let mut elements = Vec::new();
            while !self.at(TokenKind::RBrace) && !self.at_eof() {
                elements.push(self.parse_variable_initializer());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "`}`");
            Expr::ArrayInit(ArrayInitExpr {
                elements,
                range: Span::new(start, self.prev_end(start)),
            })
        } else {
            self.parse_expr()
        }
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.current.span.start;
        self.bump();
        self.expect(TokenKind::LParen, "`(`");
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        let then_branch = Box::new(self.parse_statement());
        let else_branch = if self.eat(TokenKind::ElseKw) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };
        Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_while(&mut self) -> Stmt {
        let start = self.current.span.start;
        self.bump();
        self.expect(TokenKind::LParen, "`(`");
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        let body = Box::new(self.parse_statement());
        Stmt::While(WhileStmt {
            condition,
            body,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_do_while(&mut self) -> Stmt {
        let start = self.current.span.start;
        self.bump();
        let body = Box::new(self.parse_statement());
        self.expect(TokenKind::WhileKw, "`while`");
        self.expect(TokenKind::LParen, "`(`");
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        self.expect(TokenKind::Semicolon, "`;`");
        Stmt::DoWhile(DoWhileStmt {
            body,
            condition,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_for(&mut self) -> Stmt {
        let start = self.current.span.start;
        self.bump();
        self.expect(TokenKind::LParen, "`(`");

        let mut init = Vec::new();
        if !self.at(TokenKind::Semicolon) {
            let stmt_start = self.current.span.start;
            if self.current.kind.is_primitive_type_keyword() || self.local_var_follows() {
                // Enhanced-for detection: `Type name : expr`.
                let ty = self.parse_type();
                let name_range = self.current.span;
                let name = if self.at(TokenKind::Identifier) {
                    let name = self.current_text().into_owned();
                    self.bump();
                    name
                } else {
                    String::new()
                };
                if self.eat(TokenKind::Colon) {
                    let iterable = self.parse_expr();
                    self.expect(TokenKind::RParen, "`)`");
                    let body = Box::new(self.parse_statement());
                    // Modeled as a for with a single declaration init and the
                    // iterable as condition.
                    return Stmt::For(ForStmt {
                        init: vec![Stmt::LocalVar(LocalVarStmt {
                            modifiers: Modifiers::default(),
                            ty,
                            name,
                            name_range,
                            initializer: None,
                            range: Span::new(stmt_start, name_range.end),
                        })],
                        condition: Some(iterable),
                        update: Vec::new(),
                        body,
                        range: Span::new(start, self.prev_end(start)),
                    });
                }
                let initializer = if self.eat(TokenKind::Eq) {
                    Some(self.parse_variable_initializer())
                } else {
                    None
                };
                init.push(Stmt::LocalVar(LocalVarStmt {
                    modifiers: Modifiers::default(),
                    ty,
                    name,
                    name_range,
                    initializer,
                    range: Span::new(stmt_start, self.prev_end(stmt_start)),
                }));
            } else {
                let expr = self.parse_expr();
                init.push(Stmt::Expr(ExprStmt {
                    range: expr.range(),
                    expr,
                }));
            }
            while self.eat(TokenKind::Comma) {
                let expr = self.parse_expr();
                init.push(Stmt::Expr(ExprStmt {
                    range: expr.range(),
                    expr,
                }));
            }
        }
        self.expect(TokenKind::Semicolon, "`;`");

        let condition = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semicolon, "`;`");

        let mut update = Vec::new();
        if !self.at(TokenKind::RParen) {
            update.push(self.parse_expr());
            while self.eat(TokenKind::Comma) {
                update.push(self.parse_expr());
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        let body = Box::new(self.parse_statement());
        Stmt::For(ForStmt {
            init,
            condition,
            update,
            body,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_try(&mut self) -> Stmt {
        let start = self.current.span.start;
        self.bump();
        let mut resources = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) && !self.at_eof() {
                resources.push(self.parse_local_var_statement_no_semi());
                if !self.eat(TokenKind::Semicolon) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "`)`");
        }
        let body = self.parse_block();
        let mut catches = Vec::new();
        while self.at(TokenKind::CatchKw) {
            let catch_start = self.current.span.start;
            self.bump();
            self.expect(TokenKind::LParen, "`(`");
            let param_start = self.current.span.start;
            let mut modifiers = Modifiers::default();
            if self.eat(TokenKind::FinalKw) {
                modifiers.insert(Modifier::Final);
            }
            let mut ty = self.parse_type();
            // Multi-catch folds the alternatives into the spelling.
            while self.eat(TokenKind::Pipe) {
                let alt = self.parse_type();
                ty.name.push('|');
                ty.name.push_str(&alt.name);
                ty.range = ty.range.cover(alt.range);
            }
            let (name, name_range) = if self.at(TokenKind::Identifier) {
                let span = self.current.span;
                let name = self.current_text().into_owned();
                self.bump();
                (name, span)
            } else {
                self.error_here(DiagnosticKind::ExpectedToken, "catch parameter");
                (String::new(), self.current.span)
            };
            self.expect(TokenKind::RParen, "`)`");
            let catch_body = self.parse_block();
            catches.push(CatchClause {
                param: ParamDecl {
                    modifiers,
                    ty,
                    name,
                    name_range,
                    varargs: false,
                    range: Span::new(param_start, name_range.end),
                },
                range: Span::new(catch_start, catch_body.range.end),
                body: catch_body,
            });
        }
        let finally = if self.eat(TokenKind::FinallyKw) {
            Some(self.parse_block())
        } else {
            None
        };
        Stmt::Try(TryStmt {
            resources,
            body,
            catches,
            finally,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_local_var_statement_no_semi(&mut self) -> Stmt {
        let start = self.current.span.start;
        let ty = self.parse_type();
        let (name, name_range) = if self.at(TokenKind::Identifier) {
            let span = self.current.span;
            let name = self.current_text().into_owned();
            self.bump();
            (name, span)
        } else {
            (String::new(), self.current.span)
        };
        let initializer = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr())
        } else {
            None
        };
        Stmt::LocalVar(LocalVarStmt {
            modifiers: Modifiers::default(),
            ty,
            name,
            name_range,
            initializer,
            range: Span::new(start, self.prev_end(start)),
        })
    }

    fn parse_switch(&mut self) -> Stmt {
        let start = self.current.span.start;
        self.bump();
        self.expect(TokenKind::LParen, "`(`");
        let selector = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        // The switch body is consumed by brace matching; case arms are not
        // modeled structurally.
        let body_start = self.current.span.start;
        let mut depth = 0usize;
        if self.expect(TokenKind::LBrace, "`{`") {
            depth = 1;
            while depth > 0 && !self.at_eof() {
                match self.current.kind {
                    TokenKind::LBrace => depth += 1,
                    TokenKind::RBrace => depth -= 1,
                    _ => {}
                }
                self.bump();
            }
        }
        Stmt::Switch(SwitchStmt {
            selector,
            body_range: Span::new(body_start, self.prev_end(body_start)),
            range: Span::new(start, self.prev_end(start)),
        })
    }

    // --- expressions --------------------------------------------------------

    pub(crate) fn parse_expr(&mut self) -> Expr {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Expr {
        let lhs = self.parse_conditional();
        let op = match self.current.kind {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::Add),
            TokenKind::MinusEq => Some(AssignOp::Sub),
            TokenKind::StarEq => Some(AssignOp::Mul),
            TokenKind::SlashEq => Some(AssignOp::Div),
            TokenKind::PercentEq => Some(AssignOp::Rem),
            TokenKind::AmpEq => Some(AssignOp::And),
            TokenKind::PipeEq => Some(AssignOp::Or),
            TokenKind::CaretEq => Some(AssignOp::Xor),
            TokenKind::ShlEq => Some(AssignOp::Shl),
            TokenKind::ShrEq => Some(AssignOp::Shr),
            TokenKind::UShrEq => Some(AssignOp::UShr),
            _ => None,
        };
        let Some(op) = op else { return lhs };
        self.bump();
        let rhs = self.parse_assignment();
        let range = lhs.range().cover(rhs.range());
        Expr::Assign(AssignExpr {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            range,
        })
    }

    fn parse_conditional(&mut self) -> Expr {
        let condition = self.parse_binary(0);
        if !self.at(TokenKind::Question) {
            return condition;
        }
        self.bump();
        let then_expr = self.parse_expr();
        self.expect(TokenKind::Colon, "`:`");
        let else_expr = self.parse_conditional();
        let range = condition.range().cover(else_expr.range());
        Expr::Conditional(ConditionalExpr {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            range,
        })
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match self.current.kind {
            TokenKind::PipePipe => (BinaryOp::Or, 1),
            TokenKind::AmpAmp => (BinaryOp::And, 2),
            TokenKind::Pipe => (BinaryOp::BitOr, 3),
            TokenKind::Caret => (BinaryOp::BitXor, 4),
            TokenKind::Amp => (BinaryOp::BitAnd, 5),
            TokenKind::EqEq => (BinaryOp::Eq, 6),
            TokenKind::NotEq => (BinaryOp::Ne, 6),
            TokenKind::Lt => (BinaryOp::Lt, 7),
            TokenKind::Gt => (BinaryOp::Gt, 7),
            TokenKind::LtEq => (BinaryOp::Le, 7),
            TokenKind::GtEq => (BinaryOp::Ge, 7),
            TokenKind::Shl => (BinaryOp::Shl, 8),
            TokenKind::Shr => (BinaryOp::Shr, 8),
            TokenKind::UShr => (BinaryOp::UShr, 8),
            TokenKind::Plus => (BinaryOp::Add, 9),
            TokenKind::Minus => (BinaryOp::Sub, 9),
            TokenKind::Star => (BinaryOp::Mul, 10),
            TokenKind::Slash => (BinaryOp::Div, 10),
            TokenKind::Percent => (BinaryOp::Rem, 10),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            if self.at(TokenKind::InstanceofKw) && min_precedence <= 7 {
                self.bump();
                let ty = self.parse_type();
                let binding = if self.at(TokenKind::Identifier) {
                    let name = self.current_text().into_owned();
                    self.bump();
                    Some(name)
                } else {
                    None
                };
                let range = lhs.range().cover(ty.range);
                lhs = Expr::InstanceOf(InstanceOfExpr {
                    expr: Box::new(lhs),
                    ty,
                    binding,
                    range,
                });
                continue;
            }
            let Some((op, precedence)) = self.binary_op() else { break };
            if precedence < min_precedence {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(precedence + 1);
            let range = lhs.range().cover(rhs.range());
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                range,
            });
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        let start = self.current.span.start;
        let op = match self.current.kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::PlusPlus => Some(UnaryOp::PreInc),
            TokenKind::MinusMinus => Some(UnaryOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let expr = self.parse_unary();
            let range = Span::new(start, expr.range().end);
            return Expr::Unary(UnaryExpr {
                op,
                expr: Box::new(expr),
                range,
            });
        }
        if self.at(TokenKind::LParen) {
            if let Some(expr) = self.try_parse_cast() {
                return expr;
            }
            if let Some(expr) = self.try_parse_lambda() {
                return expr;
            }
        }
        self.parse_postfix()
    }

    /// `(Type) unary`, speculative: rolls back when the parenthesized run is
    /// not a cast.
    fn try_parse_cast(&mut self) -> Option<Expr> {
        let checkpoint = self.checkpoint();
        let start = self.current.span.start;
        self.bump(); // (
        if !self.at_type_start() || self.at(TokenKind::VoidKw) {
            self.restore(checkpoint);
            return None;
        }
        let is_primitive = self.current.kind.is_primitive_type_keyword();
        let ty = self.parse_type();
        if !self.at(TokenKind::RParen) {
            self.restore(checkpoint);
            return None;
        }
        let cast_target_follows = matches!(
            self.nth(1),
            TokenKind::Identifier
                | TokenKind::LParen
                | TokenKind::NewKw
                | TokenKind::ThisKw
                | TokenKind::SuperKw
                | TokenKind::Bang
                | TokenKind::Tilde
        ) || self.nth(1).is_literal()
            || (is_primitive
                && matches!(self.nth(1), TokenKind::Plus | TokenKind::Minus));
        if !cast_target_follows {
            self.restore(checkpoint);
            return None;
        }
        self.bump(); // )
        let expr = self.parse_unary();
        let range = Span::new(start, expr.range().end);
        Some(Expr::Cast(CastExpr {
            ty,
            expr: Box::new(expr),
            range,
        }))
    }

    /// `(params) -> body`, speculative: rolls back when `->` does not follow
    /// the closing paren.
    fn try_parse_lambda(&mut self) -> Option<Expr> {
        let checkpoint = self.checkpoint();
        let start = self.current.span.start;
        let mut depth = 0i32;
        let mut n = 0usize;
        // Find the token after the matching `)`.
        loop {
            match self.nth(n) {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof | TokenKind::LBrace | TokenKind::Semicolon => return None,
                _ => {}
            }
            n += 1;
            if n > 128 {
                return None;
            }
        }
        if self.nth(n + 1) != TokenKind::Arrow {
            return None;
        }

        self.bump(); // (
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            let param_start = self.current.span.start;
            // Typed or untyped parameter.
            let (ty, name, name_range) =
                if self.at(TokenKind::Identifier) && matches!(self.nth(1), TokenKind::Comma | TokenKind::RParen) {
                    let span = self.current.span;
                    let name = self.current_text().into_owned();
                    self.bump();
                    (
                        TypeRef {
                            name: String::new(),
                            type_args: Vec::new(),
                            dimensions: 0,
                            range: Span::at(span.start),
                        },
                        name,
                        span,
                    )
                } else {
                    let ty = self.parse_type();
                    let span = self.current.span;
                    let name = if self.at(TokenKind::Identifier) {
                        let name = self.current_text().into_owned();
                        self.bump();
                        name
                    } else {
                        String::new()
                    };
                    (ty, name, span)
                };
            params.push(ParamDecl {
                modifiers: Modifiers::default(),
                ty,
                name,
                name_range,
                varargs: false,
                range: Span::new(param_start, name_range.end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::RParen, "`)`") {
            self.restore(checkpoint);
            return None;
        }
        if !self.eat(TokenKind::Arrow) {
            self.restore(checkpoint);
            return None;
        }
        let body = if self.at(TokenKind::LBrace) {
            LambdaBody::Block(self.parse_block())
        } else {
            LambdaBody::Expr(Box::new(self.parse_expr()))
        };
        let end = match &body {
            LambdaBody::Block(block) => block.range.end,
            LambdaBody::Expr(expr) => expr.range().end,
        };
        Some(Expr::Lambda(LambdaExpr {
            params,
            body,
            range: Span::new(start, end),
        }))
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    if self.nth(1) == TokenKind::ClassKw {
                        // `Type.class` on a name expression.
                        if let Expr::Name(name) = &expr {
                            let ty = TypeRef {
                                name: name.name.clone(),
                                type_args: Vec::new(),
                                dimensions: 0,
                                range: name.range,
                            };
                            self.bump();
                            let end = self.current.span.end;
                            self.bump();
                            expr = Expr::ClassLiteral(ClassLiteralExpr {
                                ty,
                                range: Span::new(expr.range().start, end),
                            });
                            continue;
                        }
                    }
                    self.bump();
                    if self.at(TokenKind::Identifier) {
                        let name_range = self.current.span;
                        let name = self.current_text().into_owned();
                        self.bump();
                        let range = Span::new(expr.range().start, name_range.end);
                        expr = Expr::FieldAccess(FieldAccessExpr {
                            receiver: Box::new(expr),
                            name,
                            name_range,
                            range,
                        });
                    } else if self.at(TokenKind::ThisKw) {
                        let end = self.current.span.end;
                        self.bump();
                        let range = Span::new(expr.range().start, end);
                        expr = Expr::FieldAccess(FieldAccessExpr {
                            receiver: Box::new(expr),
                            name: "this".to_string(),
                            name_range: Span::new(end, end),
                            range,
                        });
                    } else {
                        self.error_here(DiagnosticKind::ExpectedToken, "member name");
                        let range = expr.range();
                        expr = Expr::FieldAccess(FieldAccessExpr {
                            receiver: Box::new(expr),
                            name: String::new(),
                            name_range: Span::at(range.end),
                            range,
                        });
                        break;
                    }
                }
                TokenKind::ColonColon => {
                    self.bump();
                    let (name, end) = if self.at(TokenKind::Identifier) || self.at(TokenKind::NewKw)
                    {
                        let end = self.current.span.end;
                        let name = self.current_text().into_owned();
                        self.bump();
                        (name, end)
                    } else {
                        self.error_here(DiagnosticKind::ExpectedToken, "method reference");
                        (String::new(), expr.range().end)
                    };
                    let range = Span::new(expr.range().start, end);
                    expr = Expr::MethodRef(MethodRefExpr {
                        receiver: Box::new(expr),
                        name,
                        range,
                    });
                }
                TokenKind::LParen => {
                    let args = self.parse_argument_list();
                    let range = Span::new(expr.range().start, self.prev_end(expr.range().start));
                    expr = Expr::Call(CallExpr {
                        callee: Box::new(expr),
                        type_args: Vec::new(),
                        args,
                        range,
                    });
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expr();
                    self.expect(TokenKind::RBracket, "`]`");
                    let range = Span::new(expr.range().start, self.prev_end(expr.range().start));
                    expr = Expr::ArrayAccess(ArrayAccessExpr {
                        receiver: Box::new(expr),
                        index: Box::new(index),
                        range,
                    });
                }
                TokenKind::PlusPlus => {
                    let end = self.current.span.end;
                    self.bump();
                    let range = Span::new(expr.range().start, end);
                    expr = Expr::Unary(UnaryExpr {
                        op: UnaryOp::PostInc,
                        expr: Box::new(expr),
                        range,
                    });
                }
                TokenKind::MinusMinus => {
                    let end = self.current.span.end;
                    self.bump();
                    let range = Span::new(expr.range().start, end);
                    expr = Expr::Unary(UnaryExpr {
                        op: UnaryOp::PostDec,
                        expr: Box::new(expr),
                        range,
                    });
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_argument_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if !self.expect(TokenKind::LParen, "`(`") {
            return args;
        }
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            args.push(self.parse_expr());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        args
    }

    fn parse_primary(&mut self) -> Expr {
        let start = self.current.span.start;
        match self.current.kind {
            TokenKind::IntLiteral => self.literal(LiteralKind::Int),
            TokenKind::LongLiteral => self.literal(LiteralKind::Long),
            TokenKind::FloatLiteral => self.literal(LiteralKind::Float),
            TokenKind::DoubleLiteral => self.literal(LiteralKind::Double),
            TokenKind::CharLiteral => self.literal(LiteralKind::Char),
            TokenKind::StringLiteral => self.literal(LiteralKind::String),
            TokenKind::TextBlock => self.literal(LiteralKind::TextBlock),
            TokenKind::TrueKw | TokenKind::FalseKw => self.literal(LiteralKind::Bool),
            TokenKind::NullKw => self.literal(LiteralKind::Null),
            TokenKind::ThisKw => {
                let span = self.current.span;
                self.bump();
                Expr::This(span)
            }
            TokenKind::SuperKw => {
                let span = self.current.span;
                self.bump();
                Expr::Super(span)
            }
            TokenKind::Identifier => {
                let span = self.current.span;
                let name = self.current_text().into_owned();
                self.bump();
                // `name -> body` single-parameter lambda.
                if self.at(TokenKind::Arrow) {
                    self.bump();
                    let body = if self.at(TokenKind::LBrace) {
                        LambdaBody::Block(self.parse_block())
                    } else {
                        LambdaBody::Expr(Box::new(self.parse_expr()))
                    };
                    let end = match &body {
                        LambdaBody::Block(block) => block.range.end,
                        LambdaBody::Expr(expr) => expr.range().end,
                    };
                    return Expr::Lambda(LambdaExpr {
                        params: vec![ParamDecl {
                            modifiers: Modifiers::default(),
                            ty: TypeRef {
                                name: String::new(),
                                type_args: Vec::new(),
                                dimensions: 0,
                                range: Span::at(span.start),
                            },
                            name: name.clone(),
                            name_range: span,
                            varargs: false,
                            range: span,
                        }],
                        body,
                        range: Span::new(span.start, end),
                    });
                }
                Expr::Name(NameExpr { name, range: span })
            }
            kind if kind.is_primitive_type_keyword() => {
                // `int.class`, `int[].class`.
                let ty = self.parse_type();
                if self.eat(TokenKind::Dot) {
                    let end = self.current.span.end;
                    self.expect(TokenKind::ClassKw, "`class`");
                    Expr::ClassLiteral(ClassLiteralExpr {
                        ty,
                        range: Span::new(start, end),
                    })
                } else {
                    self.error_here(DiagnosticKind::SyntaxError, "expression");
                    Expr::Missing(Span::new(start, self.prev_end(start)))
                }
            }
            TokenKind::NewKw => self.parse_new(),
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr();
                self.expect(TokenKind::RParen, "`)`");
                Expr::Paren(ParenExpr {
                    expr: Box::new(inner),
                    range: Span::new(start, self.prev_end(start)),
                })
            }
            TokenKind::SwitchKw => {
                // Switch expression: reuse the statement parse, surface as a
                // missing-value placeholder expression carrying its span.
                let stmt = self.parse_switch();
                Expr::Missing(stmt.range())
            }
            _ => {
                self.error_here(DiagnosticKind::SyntaxError, "expression");
                let span = self.current.span;
                self.bump();
                Expr::Missing(span)
            }
        }
    }

    fn literal(&mut self, kind: LiteralKind) -> Expr {
        let span = self.current.span;
        let text = self.current_text().into_owned();
        self.bump();
        Expr::Literal(LiteralExpr {
            kind,
            text,
            range: span,
        })
    }

    fn parse_new(&mut self) -> Expr {
        let start = self.current.span.start;
        self.bump(); // new
        if !self.at_type_start() {
            self.error_here(DiagnosticKind::ExpectedToken, "type");
            return Expr::Missing(Span::new(start, self.prev_end(start)));
        }
        let ty = self.parse_type();
        if ty.dimensions > 0 || self.at(TokenKind::LBracket) {
            // Array creation: `new T[expr]...` or `new T[] { ... }`; empty
            // bracket pairs may already have been folded into the type.
            let mut dimension_exprs = Vec::new();
            let mut ty = ty;
            while self.eat(TokenKind::LBracket) {
                if self.at(TokenKind::RBracket) {
                    ty.dimensions = ty.dimensions.saturating_add(1);
                    self.bump();
                } else {
                    dimension_exprs.push(self.parse_expr());
                    self.expect(TokenKind::RBracket, "`]`");
                }
            }
            let initializer = if self.at(TokenKind::LBrace) {
                Some(Box::new(self.parse_variable_initializer()))
            } else {
                None
            };
            return Expr::NewArray(NewArrayExpr {
                ty,
                dimension_exprs,
                initializer,
                range: Span::new(start, self.prev_end(start)),
            });
        }
        let args = if self.at(TokenKind::LParen) {
            self.parse_argument_list()
        } else {
            self.error_here(DiagnosticKind::ExpectedToken, "`(`");
            Vec::new()
        };
        let anonymous_body = if self.at(TokenKind::LBrace) {
            let (members, _) = self.parse_class_body();
            Some(members)
        } else {
            None
        };
        Expr::New(NewExpr {
            ty,
            args,
            anonymous_body,
            range: Span::new(start, self.prev_end(start)),
        })
    }
}

fn modifiers_start(modifiers: &Modifiers, fallback: usize) -> usize {
    if modifiers.is_empty() {
        fallback
    } else {
        modifiers.range.start
    }
}
