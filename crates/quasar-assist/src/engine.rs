use quasar_core::{CompilerOptions, Span};
use quasar_parser::ast::{MemberDecl, TypeDecl};
use quasar_parser::{block_tags_for_level, parse_java, ParseResult};
use quasar_scanner::{Token, TokenKind};

use crate::cursor::{classify_cursor, doc_comment_containing, InvalidCursorLocation};
use crate::nodes::AssistNode;

/// Cursor-derived context carried alongside the assist node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistContext {
    pub after_dot: bool,
    pub between_new_and_left_bracket: bool,
    pub between_catch_and_right_paren: bool,
    pub empty_completion_identifier: bool,
    pub in_javadoc: bool,
    pub enclosing_type: Option<String>,
    pub enclosing_method: Option<String>,
}

/// A successful completion request: the synthesized node plus its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub node: AssistNode,
    pub context: AssistContext,
}

/// Compute the assist node for `offset`, or the distinguished
/// no-completion-possible condition.
pub fn complete(
    source: &str,
    options: &CompilerOptions,
    offset: usize,
) -> Result<Completion, InvalidCursorLocation> {
    let cursor = classify_cursor(source, options, offset)?;
    tracing::debug!(offset, "computing completion");

    if let Some(doc) = doc_comment_containing(&cursor.tokens, offset) {
        return Ok(javadoc_completion(source, options, doc, offset));
    }

    let engine = Engine {
        source,
        tokens: significant(&cursor.tokens),
        offset,
    };
    let (node, mut context) = engine.compute();

    let parsed = parse_java(source, options.clone());
    fill_enclosing(&parsed, offset, &mut context);

    // A bare name directly at class-member level is a field-type position.
    let node = match node {
        AssistNode::OnName { partial, span }
            if context.enclosing_type.is_some() && context.enclosing_method.is_none() =>
        {
            AssistNode::OnFieldType { partial, span }
        }
        node => node,
    };
    Ok(Completion { node, context })
}

/// A token kind that can end a type spelling in a declaration header.
fn is_type_end(kind: TokenKind) -> bool {
    kind == TokenKind::Identifier
        || kind.is_primitive_type_keyword()
        || matches!(kind, TokenKind::VoidKw | TokenKind::Gt | TokenKind::RBracket)
}

fn significant(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .filter(|t| !t.is_trivia() && t.kind != TokenKind::Eof)
        .copied()
        .collect()
}

struct Engine<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    offset: usize,
}

impl<'a> Engine<'a> {
    fn compute(&self) -> (AssistNode, AssistContext) {
        let mut context = AssistContext::default();

        // The partial identifier under or ending at the cursor.
        let (partial, partial_span, before) = self.partial_identifier();
        context.empty_completion_identifier = partial.is_empty();

        let prev = before.map(|i| self.tokens[i]);

        // `@partial` annotation name.
        if prev.is_some_and(|t| t.kind == TokenKind::At) {
            return (
                AssistNode::OnAnnotationName {
                    partial,
                    span: partial_span,
                },
                context,
            );
        }

        // `package` / `import` statement prefix.
        if let Some(node) = self.import_or_package(&partial, partial_span, before) {
            return (node, context);
        }

        // Member access after `.`; with a `(` already sitting after the
        // typed selector this is the selector of an existing message send.
        if prev.is_some_and(|t| t.kind == TokenKind::Dot) {
            context.after_dot = true;
            let dot = before.unwrap_or(0);
            if !partial.is_empty()
                && self
                    .tokens
                    .get(dot + 2)
                    .is_some_and(|t| t.kind == TokenKind::LParen)
            {
                let receiver_start = self.receiver_start(dot);
                let receiver = self.source[receiver_start..self.tokens[dot].span.start]
                    .trim()
                    .to_string();
                let open = dot + 2;
                // Collect up to the call's closing paren, if it exists yet.
                let mut depth = 0i32;
                let mut until = self.source.len();
                for token in &self.tokens[open..] {
                    match token.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                until = token.span.start;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let args_so_far = self.collected_arguments(open, until);
                return (
                    AssistNode::OnMessageSend {
                        receiver: (!receiver.is_empty()).then_some(receiver),
                        selector: partial,
                        args_so_far,
                        span: partial_span,
                    },
                    context,
                );
            }
            return (
                self.member_access(dot, partial, partial_span),
                context,
            );
        }

        // `new Foo` before any bracket.
        if let Some(node) = self.allocation(&partial, partial_span, before) {
            context.between_new_and_left_bracket = true;
            return (node, context);
        }

        // `catch (partial`.
        if self.in_catch_header(before) {
            context.between_catch_and_right_paren = true;
            return (
                AssistNode::OnCatchType {
                    partial,
                    span: partial_span,
                },
                context,
            );
        }

        // Type reference clauses.
        if prev.is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::ExtendsKw | TokenKind::ImplementsKw | TokenKind::ThrowsKw
            )
        }) {
            return (
                AssistNode::OnTypeReference {
                    partial,
                    span: partial_span,
                },
                context,
            );
        }

        // Inside an argument list.
        if let Some(node) = self.argument_position(&partial, partial_span, before) {
            return (node, context);
        }

        // `Type partial` at a declaration site: a parameter name inside a
        // declaration header, or a variable name elsewhere.
        if partial.is_empty() {
            if let Some(prev) = prev {
                if prev.kind == TokenKind::Identifier || prev.kind.is_primitive_type_keyword() {
                    if self.in_declaration_header(before) {
                        return (
                            AssistNode::OnParameterName {
                                type_name: self.token_text(&prev),
                                span: partial_span,
                            },
                            context,
                        );
                    }
                    let two_back = before
                        .and_then(|i| i.checked_sub(1))
                        .map(|i| self.tokens[i].kind);
                    if matches!(
                        two_back,
                        None | Some(
                            TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace
                        )
                    ) || two_back.is_some_and(|k| k.is_modifier_keyword())
                    {
                        return (
                            AssistNode::OnVariableName {
                                type_name: self.token_text(&prev),
                                span: partial_span,
                            },
                            context,
                        );
                    }
                }
            }
        }

        // A keyword prefix right after modifiers completes keywords.
        if !partial.is_empty() && prev.is_some_and(|t| t.kind.is_modifier_keyword()) {
            return (
                AssistNode::OnKeyword {
                    partial,
                    span: partial_span,
                },
                context,
            );
        }

        (
            AssistNode::OnName {
                partial,
                span: partial_span,
            },
            context,
        )
    }

    fn token_text(&self, token: &Token) -> String {
        self.source[token.span.start..token.span.end.min(self.source.len())].to_string()
    }

    /// The identifier prefix at the cursor: `(partial, its span, index of the
    /// significant token before it)`.
    fn partial_identifier(&self) -> (String, Span, Option<usize>) {
        for (index, token) in self.tokens.iter().enumerate() {
            if token.span.start < self.offset && self.offset <= token.span.end {
                if token.kind == TokenKind::Identifier || token.kind.is_keyword() {
                    let text = self.source[token.span.start..self.offset].to_string();
                    return (
                        text,
                        Span::new(token.span.start, self.offset),
                        index.checked_sub(1),
                    );
                }
                return (String::new(), Span::at(self.offset), Some(index));
            }
        }
        // Cursor between tokens: find the last token ending at or before it.
        let before = self
            .tokens
            .iter()
            .rposition(|t| t.span.end <= self.offset);
        (String::new(), Span::at(self.offset), before)
    }

    /// `receiver.partial`: inspects the receiver run before the dot.
    fn member_access(&self, dot: usize, partial: String, span: Span) -> AssistNode {
        // `int[].` / `String[].`: array-before-dot completes `.class`.
        if dot >= 2
            && self.tokens[dot - 1].kind == TokenKind::RBracket
            && self.tokens[dot - 2].kind == TokenKind::LBracket
        {
            let mut base = dot - 2;
            let mut dimensions = 1u8;
            while base >= 2
                && self.tokens[base - 1].kind == TokenKind::RBracket
                && self.tokens[base - 2].kind == TokenKind::LBracket
            {
                base -= 2;
                dimensions += 1;
            }
            if base >= 1 {
                let base_token = self.tokens[base - 1];
                if base_token.kind.is_primitive_type_keyword() {
                    return AssistNode::OnClassLiteral {
                        type_name: self.token_text(&base_token),
                        dimensions,
                        primitive: true,
                        span,
                    };
                }
                if base_token.kind == TokenKind::Identifier {
                    return AssistNode::OnClassLiteral {
                        type_name: self.token_text(&base_token),
                        dimensions,
                        primitive: false,
                        span,
                    };
                }
            }
        }

        let receiver_start = self.receiver_start(dot);
        let receiver = self.source[receiver_start..self.tokens[dot].span.start]
            .trim()
            .to_string();

        // Qualified type/package names look like `a.b.partial` with a plain
        // dotted-identifier receiver.
        let receiver_is_dotted_name = self.dotted_name_only(receiver_start, dot);
        if receiver_is_dotted_name && receiver.chars().next().is_some_and(char::is_uppercase) {
            return AssistNode::OnQualifiedType {
                qualifier: receiver,
                partial,
                span,
            };
        }

        AssistNode::OnMemberAccess {
            receiver,
            partial,
            span,
        }
    }

    fn dotted_name_only(&self, receiver_start: usize, dot: usize) -> bool {
        self.tokens[..dot]
            .iter()
            .rev()
            .take_while(|t| t.span.start >= receiver_start)
            .all(|t| matches!(t.kind, TokenKind::Identifier | TokenKind::Dot))
    }

    /// Start offset of the primary expression ending just before token `dot`.
    fn receiver_start(&self, dot: usize) -> usize {
        let mut i = dot;
        let mut paren_depth = 0i32;
        let mut bracket_depth = 0i32;
        while i > 0 {
            let kind = self.tokens[i - 1].kind;
            match kind {
                TokenKind::RParen => paren_depth += 1,
                TokenKind::LParen => {
                    if paren_depth == 0 {
                        break;
                    }
                    paren_depth -= 1;
                }
                TokenKind::RBracket => bracket_depth += 1,
                TokenKind::LBracket => {
                    if bracket_depth == 0 {
                        break;
                    }
                    bracket_depth -= 1;
                }
                TokenKind::Identifier
                | TokenKind::Dot
                | TokenKind::ThisKw
                | TokenKind::SuperKw
                | TokenKind::ClassKw
                | TokenKind::NewKw
                | TokenKind::StringLiteral => {}
                kind if kind.is_primitive_type_keyword() => {}
                _ if paren_depth > 0 || bracket_depth > 0 => {}
                _ => break,
            }
            i -= 1;
        }
        self.tokens[i].span.start
    }

    /// `new partial` with no bracket yet: the allocation-type completion. Any
    /// `(`/`[`/`{` after the `new` resets the context.
    fn allocation(&self, partial: &str, span: Span, before: Option<usize>) -> Option<AssistNode> {
        let mut i = before?;
        loop {
            let token = self.tokens[i];
            match token.kind {
                TokenKind::NewKw => {
                    return Some(AssistNode::OnAllocation {
                        partial: partial.to_string(),
                        span,
                    });
                }
                TokenKind::Identifier | TokenKind::Dot | TokenKind::Lt | TokenKind::Gt
                | TokenKind::Comma => {}
                _ => return None,
            }
            i = i.checked_sub(1)?;
        }
    }

    fn in_catch_header(&self, before: Option<usize>) -> bool {
        let Some(mut i) = before else { return false };
        loop {
            match self.tokens[i].kind {
                TokenKind::RParen => return false,
                TokenKind::LParen => {
                    return i > 0 && self.tokens[i - 1].kind == TokenKind::CatchKw;
                }
                TokenKind::Identifier
                | TokenKind::Dot
                | TokenKind::Pipe
                | TokenKind::FinalKw => {}
                _ => return false,
            }
            let Some(next) = i.checked_sub(1) else { return false };
            i = next;
        }
    }

    /// Completion inside an argument list: `foo(<cursor>`, `foo(a, <cursor>`,
    /// `new Foo(<cursor>`, `this(<cursor>`, `super(<cursor>`.
    fn argument_position(
        &self,
        partial: &str,
        span: Span,
        before: Option<usize>,
    ) -> Option<AssistNode> {
        let mut i = before?;
        let mut depth = 0i32;
        // Find the unmatched `(` to the left.
        let open = loop {
            match self.tokens[i].kind {
                TokenKind::RParen => depth += 1,
                TokenKind::LParen => {
                    if depth == 0 {
                        break i;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => return None,
                _ => {}
            }
            i = i.checked_sub(1)?;
        };

        let args_so_far = self.collected_arguments(open, span.start);
        let callee = self.tokens.get(open.checked_sub(1)?)?;
        match callee.kind {
            TokenKind::ThisKw | TokenKind::SuperKw => {
                // Explicit constructor call when the keyword starts the
                // statement.
                let stmt_start = open
                    .checked_sub(2)
                    .map(|i| self.tokens[i].kind)
                    .is_none_or(|k| {
                        matches!(k, TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace)
                    });
                if stmt_start {
                    return Some(AssistNode::OnExplicitConstructorCall {
                        is_super: callee.kind == TokenKind::SuperKw,
                        span,
                    });
                }
                None
            }
            TokenKind::Identifier => {
                // `Type name(` is a declaration header, not a call.
                if open >= 2 && is_type_end(self.tokens[open - 2].kind) {
                    return None;
                }
                let selector = self.token_text(callee);
                // Allocation argument when a `new` chain precedes the type
                // name.
                let mut j = open - 1;
                while j > 0
                    && matches!(
                        self.tokens[j - 1].kind,
                        TokenKind::Identifier | TokenKind::Dot
                    )
                {
                    j -= 1;
                }
                if j > 0 && self.tokens[j - 1].kind == TokenKind::NewKw {
                    let type_start = self.tokens[j].span.start;
                    let type_name = self.source[type_start..callee.span.end].to_string();
                    return Some(AssistNode::OnAllocationArgument {
                        type_name,
                        args_so_far,
                        span,
                    });
                }
                if partial.is_empty() {
                    Some(AssistNode::OnArgument {
                        selector,
                        args_so_far,
                        span,
                    })
                } else {
                    // Typing a name inside the argument list.
                    None
                }
            }
            _ => None,
        }
    }

    /// Whether the unmatched `(` to the left opens a declaration header
    /// (`Type name(`), which makes the cursor a parameter-name position.
    fn in_declaration_header(&self, before: Option<usize>) -> bool {
        let Some(mut i) = before else { return false };
        let mut depth = 0i32;
        let open = loop {
            match self.tokens[i].kind {
                TokenKind::RParen => depth += 1,
                TokenKind::LParen => {
                    if depth == 0 {
                        break i;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => return false,
                _ => {}
            }
            let Some(next) = i.checked_sub(1) else { return false };
            i = next;
        };
        open >= 2
            && self.tokens[open - 1].kind == TokenKind::Identifier
            && is_type_end(self.tokens[open - 2].kind)
    }

    /// Raw source snippets of the comma-separated arguments between the open
    /// paren and the cursor.
    fn collected_arguments(&self, open: usize, until: usize) -> Vec<String> {
        let start = self.tokens[open].span.end;
        let slice = &self.source[start..until.min(self.source.len())];
        slice
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn import_or_package(
        &self,
        _partial: &str,
        span: Span,
        before: Option<usize>,
    ) -> Option<AssistNode> {
        let mut i = before?;
        // Walk back over the dotted prefix.
        let mut prefix_start = None;
        let mut is_static = false;
        loop {
            match self.tokens[i].kind {
                TokenKind::Identifier | TokenKind::Dot | TokenKind::Star => {
                    prefix_start = Some(self.tokens[i].span.start);
                }
                TokenKind::StaticKw => is_static = true,
                TokenKind::ImportKw => {
                    let prefix = prefix_start
                        .map(|s| self.source[s..span.start].trim().trim_end_matches('.').to_string())
                        .unwrap_or_default();
                    return Some(AssistNode::OnImport {
                        prefix,
                        is_static,
                        span,
                    });
                }
                TokenKind::PackageKw => {
                    let prefix = prefix_start
                        .map(|s| self.source[s..span.start].trim().trim_end_matches('.').to_string())
                        .unwrap_or_default();
                    return Some(AssistNode::OnPackage { prefix, span });
                }
                _ => return None,
            }
            i = i.checked_sub(1)?;
        }
    }
}

/// Javadoc cursor: tag-name, param-name, or reference completion.
fn javadoc_completion(
    source: &str,
    options: &CompilerOptions,
    doc: Span,
    offset: usize,
) -> Completion {
    let bytes = source.as_bytes();
    let mut context = AssistContext {
        in_javadoc: true,
        ..AssistContext::default()
    };

    // The word fragment before the cursor.
    let mut word_start = offset;
    while word_start > doc.start
        && bytes[word_start - 1].is_ascii_alphanumeric()
    {
        word_start -= 1;
    }
    let partial = source[word_start..offset].to_string();
    let span = Span::new(word_start, offset);
    context.empty_completion_identifier = partial.is_empty();

    // `@partial`: tag name.
    if word_start > doc.start && bytes[word_start - 1] == b'@' {
        let candidates = if partial.is_empty() {
            block_tags_for_level(options)
        } else {
            Vec::new()
        };
        return Completion {
            node: AssistNode::OnJavadocTagName {
                partial,
                candidates,
                span,
            },
            context,
        };
    }

    // Inside `{@link ...}` / `{@linkplain ...}` / after `@see`. The line
    // prefix never includes the `/**` opener.
    let line_start = source[doc.start..word_start]
        .rfind('\n')
        .map(|p| doc.start + p + 1)
        .unwrap_or(doc.start)
        .max(doc.start + 3);
    let line = &source[line_start.min(word_start)..word_start];
    if let Some(brace) = line.rfind("{@") {
        let after = &line[brace..];
        if !after.contains('}')
            && (after.starts_with("{@link") || after.starts_with("{@value"))
        {
            return Completion {
                node: AssistNode::OnJavadocReference { partial, span },
                context,
            };
        }
    }
    if line.trim_start_matches([' ', '\t', '*']).trim_start().starts_with("@see") {
        return Completion {
            node: AssistNode::OnJavadocReference { partial, span },
            context,
        };
    }

    // `@param partial`.
    if line
        .trim_start_matches([' ', '\t', '*'])
        .trim_start()
        .starts_with("@param")
    {
        return Completion {
            node: AssistNode::OnJavadocParamName { partial, span },
            context,
        };
    }

    Completion {
        node: AssistNode::OnJavadocReference { partial, span },
        context,
    }
}

fn fill_enclosing(parsed: &ParseResult, offset: usize, context: &mut AssistContext) {
    for decl in &parsed.unit.types {
        fill_from_type(decl, offset, context);
    }
}

fn fill_from_type(decl: &TypeDecl, offset: usize, context: &mut AssistContext) {
    let range = decl.range();
    if !(range.start <= offset && offset <= range.end) {
        return;
    }
    context.enclosing_type = Some(decl.name().to_string());
    for member in decl.members() {
        match member {
            MemberDecl::Type(nested) => fill_from_type(nested, offset, context),
            MemberDecl::Method(method) => {
                if method.range.start <= offset && offset <= method.range.end {
                    context.enclosing_method = Some(method.name.clone());
                }
            }
            MemberDecl::Constructor(ctor) => {
                if ctor.range.start <= offset && offset <= ctor.range.end {
                    context.enclosing_method = Some(ctor.name.clone());
                }
            }
            _ => {}
        }
    }
}
