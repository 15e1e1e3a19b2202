//! Javadoc tag extraction.
//!
//! A [`JavadocParser`] runs over one `/** ... */` span and classifies block
//! tags (`@param`, `@return`, `@throws`/`@exception`, `@see`, `@deprecated`)
//! and inline tags (`{@link}`, `{@linkplain}`, `{@value}`, `{@inheritDoc}`).
//! Inline tags are only recognized inside `{...}`; `@link` outside an inline
//! context and `@value` below source level 5 are reportable-but-recoverable.
//!
//! Param names, throws references and see references are pushed onto one
//! interleaved stack in encounter order and redistributed into the three
//! typed lists by a single linear pass at the end, so relative order within
//! each kind is preserved without sorting.

use quasar_core::{CompilerOptions, Diagnostic, DiagnosticKind, DiagnosticSink, Span};

/// Structured result of parsing one doc comment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocComment {
    pub params: Vec<DocParam>,
    /// `@param` tags appearing after a `@throws`: recorded, not trusted.
    pub invalid_params: Vec<DocParam>,
    pub throws: Vec<DocReference>,
    pub sees: Vec<DocReference>,
    pub links: Vec<DocReference>,
    pub has_return: bool,
    pub return_empty: bool,
    pub deprecated: bool,
    pub inherit_doc: bool,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocParam {
    pub name: String,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocReference {
    pub text: String,
    pub range: Span,
}

/// Block tags recognized at a given source level; the assist variant offers
/// these as completions on a bare `@`.
pub fn block_tags_for_level(options: &CompilerOptions) -> Vec<&'static str> {
    let mut tags = vec![
        "@author",
        "@deprecated",
        "@exception",
        "@param",
        "@return",
        "@see",
        "@serial",
        "@since",
        "@throws",
        "@version",
    ];
    if options.source_level.major >= 5 {
        tags.push("@code");
        tags.push("@literal");
        tags.push("@value");
    }
    tags.sort_unstable();
    tags
}

enum StackEntry {
    Param(DocParam),
    Throws(DocReference),
    See(DocReference),
}

pub struct JavadocParser<'a> {
    source: &'a str,
    options: &'a CompilerOptions,
}

impl<'a> JavadocParser<'a> {
    pub fn new(source: &'a str, options: &'a CompilerOptions) -> Self {
        Self { source, options }
    }

    /// Parse the doc comment spanning `[start, end)` (including the
    /// delimiters). Malformed tags report through `sink` and never abort.
    pub fn parse(&self, start: usize, end: usize, sink: &mut dyn DiagnosticSink) -> DocComment {
        let mut doc = DocComment {
            range: Span::new(start, end),
            ..DocComment::default()
        };
        let bytes = self.source.as_bytes();
        let content_start = (start + 3).min(end); // past "/**"
        let content_end = end.saturating_sub(2).max(content_start); // before "*/"

        let mut stack: Vec<StackEntry> = Vec::new();
        let mut seen_throws = false;
        let mut return_span: Option<Span> = None;

        let mut i = content_start;
        while i < content_end {
            match bytes[i] {
                b'{' => {
                    i = self.parse_inline_tag(i, content_end, &mut doc, sink);
                }
                b'@' if self.at_block_tag_position(i, content_start) => {
                    i = self.parse_block_tag(
                        i,
                        content_end,
                        &mut doc,
                        &mut stack,
                        &mut seen_throws,
                        &mut return_span,
                        sink,
                    );
                }
                b'@' => {
                    // An inline-only tag in block position.
                    let (word, word_end) = read_word(self.source, i + 1, content_end);
                    if matches!(word, "link" | "linkplain" | "value" | "inheritDoc") {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::JavadocUnexpectedTag,
                            Span::new(i, word_end),
                        ));
                    }
                    i = word_end.max(i + 1);
                }
                _ => i += 1,
            }
        }

        // Redistribute the interleaved stack into the three typed lists.
        for entry in stack {
            match entry {
                StackEntry::Param(param) => doc.params.push(param),
                StackEntry::Throws(reference) => doc.throws.push(reference),
                StackEntry::See(reference) => doc.sees.push(reference),
            }
        }

        if let Some(span) = return_span {
            doc.has_return = true;
            doc.return_empty = self.return_is_empty(span.end, content_end);
            if doc.return_empty {
                sink.report(Diagnostic::new(DiagnosticKind::JavadocEmptyReturn, span));
            }
        }

        doc
    }

    /// A `@` opens a block tag only at the start of a comment line, i.e.
    /// preceded by nothing but whitespace and leading `*`s on its line.
    fn at_block_tag_position(&self, at: usize, content_start: usize) -> bool {
        let bytes = self.source.as_bytes();
        let mut i = at;
        while i > content_start {
            i -= 1;
            match bytes[i] {
                b'\n' | b'\r' => return true,
                b' ' | b'\t' | b'*' => {}
                _ => return false,
            }
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_block_tag(
        &self,
        at: usize,
        content_end: usize,
        doc: &mut DocComment,
        stack: &mut Vec<StackEntry>,
        seen_throws: &mut bool,
        return_span: &mut Option<Span>,
        sink: &mut dyn DiagnosticSink,
    ) -> usize {
        let (tag, tag_end) = read_word(self.source, at + 1, content_end);
        match tag {
            "param" => {
                let (name, name_end) = self.read_reference(tag_end, content_end);
                if name.is_empty() {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::JavadocMissingReference,
                        Span::new(at, tag_end),
                    ));
                    return tag_end;
                }
                let param = DocParam {
                    name,
                    range: Span::new(at, name_end),
                };
                if *seen_throws {
                    // Out of order: keep it, separately, and report.
                    sink.report(Diagnostic::new(
                        DiagnosticKind::JavadocMisplacedParam,
                        param.range,
                    ));
                    doc.invalid_params.push(param);
                } else {
                    stack.push(StackEntry::Param(param));
                }
                name_end
            }
            "throws" | "exception" => {
                let (text, ref_end) = self.read_reference(tag_end, content_end);
                if text.is_empty() {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::JavadocMissingReference,
                        Span::new(at, tag_end),
                    ));
                    return tag_end;
                }
                *seen_throws = true;
                stack.push(StackEntry::Throws(DocReference {
                    text,
                    range: Span::new(at, ref_end),
                }));
                ref_end
            }
            "see" => {
                let (text, ref_end) = self.read_reference(tag_end, content_end);
                if text.is_empty() {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::JavadocMissingReference,
                        Span::new(at, tag_end),
                    ));
                    return tag_end;
                }
                stack.push(StackEntry::See(DocReference {
                    text,
                    range: Span::new(at, ref_end),
                }));
                ref_end
            }
            "return" => {
                let span = Span::new(at, tag_end);
                if return_span.is_some() {
                    sink.report(Diagnostic::new(DiagnosticKind::JavadocDuplicateReturn, span));
                } else {
                    *return_span = Some(span);
                }
                tag_end
            }
            "deprecated" => {
                doc.deprecated = true;
                tag_end
            }
            _ => tag_end.max(at + 1),
        }
    }

    fn parse_inline_tag(
        &self,
        at: usize,
        content_end: usize,
        doc: &mut DocComment,
        sink: &mut dyn DiagnosticSink,
    ) -> usize {
        let bytes = self.source.as_bytes();
        if bytes.get(at + 1) != Some(&b'@') {
            return at + 1;
        }
        let (tag, tag_end) = read_word(self.source, at + 2, content_end);
        let close = self.source[tag_end..content_end]
            .as_bytes()
            .iter()
            .position(|&b| b == b'}')
            .map(|p| tag_end + p);
        let close_end = close.map(|c| c + 1).unwrap_or(content_end);
        match tag {
            "link" | "linkplain" => {
                let inner_end = close.unwrap_or(content_end);
                let (text, _) = self.read_reference(tag_end, inner_end);
                if text.is_empty() {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::JavadocMissingReference,
                        Span::new(at, tag_end),
                    ));
                } else {
                    doc.links.push(DocReference {
                        text,
                        range: Span::new(at, close_end),
                    });
                }
            }
            "value" => {
                if self.options.source_level.major < 5 {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::JavadocInvalidTag,
                        Span::new(at, tag_end),
                    ));
                }
            }
            "inheritDoc" => doc.inherit_doc = true,
            _ => {}
        }
        close_end
    }

    /// Read a whitespace-delimited reference after a tag, skipping leading
    /// whitespace and line-leading `*`s.
    fn read_reference(&self, from: usize, limit: usize) -> (String, usize) {
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < limit && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        let start = i;
        while i < limit
            && !matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | b'}' | b'{')
        {
            i += 1;
        }
        (self.source[start..i].to_string(), i)
    }

    /// `@return` is empty when no non-whitespace, non-`*` text follows it
    /// before the next block tag or the end of the comment.
    fn return_is_empty(&self, from: usize, content_end: usize) -> bool {
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < content_end {
            match bytes[i] {
                b' ' | b'\t' | b'\n' | b'\r' | b'*' => i += 1,
                b'@' => return true,
                _ => return false,
            }
        }
        true
    }
}

fn read_word(source: &str, from: usize, limit: usize) -> (&str, usize) {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < limit && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    (&source[from..i], i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quasar_core::DiagnosticBag;

    fn parse_doc(source: &str) -> (DocComment, DiagnosticBag) {
        parse_doc_with(source, CompilerOptions::default())
    }

    fn parse_doc_with(source: &str, options: CompilerOptions) -> (DocComment, DiagnosticBag) {
        let mut bag = DiagnosticBag::new();
        let parser = JavadocParser::new(source, &options);
        let doc = parser.parse(0, source.len(), &mut bag);
        (doc, bag)
    }

    #[test]
    fn params_and_throws_keep_encounter_order() {
        let (doc, bag) = parse_doc("/** @param a x\n * @param b y\n * @throws E oops */");
        let names: Vec<_> = doc.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(doc.throws.len(), 1);
        assert_eq!(doc.throws[0].text, "E");
        assert!(doc.invalid_params.is_empty());
        assert!(bag.is_empty());
    }

    #[test]
    fn interleaved_tags_redistribute_without_losing_order() {
        let (doc, bag) = parse_doc(
            "/**\n * @param a one\n * @see Other\n * @param b two\n */",
        );
        let names: Vec<_> = doc.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(doc.sees.len(), 1);
        assert!(bag.is_empty());
    }

    #[test]
    fn param_after_throws_goes_to_the_invalid_list() {
        let (doc, bag) = parse_doc("/**\n * @throws E oops\n * @param a late\n */");
        assert!(doc.params.is_empty());
        assert_eq!(doc.invalid_params.len(), 1);
        assert_eq!(doc.invalid_params[0].name, "a");
        assert_eq!(
            bag.diagnostics()[0].kind,
            DiagnosticKind::JavadocMisplacedParam
        );
    }

    #[test]
    fn empty_return_is_detected() {
        let (doc, bag) = parse_doc("/**\n * @return\n */");
        assert!(doc.has_return);
        assert!(doc.return_empty);
        assert_eq!(bag.diagnostics()[0].kind, DiagnosticKind::JavadocEmptyReturn);

        let (doc, bag) = parse_doc("/** @return the result */");
        assert!(doc.has_return);
        assert!(!doc.return_empty);
        assert!(bag.is_empty());
    }

    #[test]
    fn duplicate_return_reports() {
        let (_, bag) = parse_doc("/**\n * @return a\n * @return b\n */");
        assert_eq!(
            bag.diagnostics()[0].kind,
            DiagnosticKind::JavadocDuplicateReturn
        );
    }

    #[test]
    fn link_is_inline_only() {
        let (doc, bag) = parse_doc("/** see {@link Other#method} for details */");
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].text, "Other#method");
        assert!(bag.is_empty());

        let (_, bag) = parse_doc("/**@return x @link Other */");
        assert!(bag
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::JavadocUnexpectedTag));
    }

    #[test]
    fn value_tag_is_level_gated() {
        let options = CompilerOptions::at_level(quasar_core::JavaLanguageLevel::JAVA_1_4);
        let (_, bag) = parse_doc_with("/** {@value} */", options);
        assert_eq!(bag.diagnostics()[0].kind, DiagnosticKind::JavadocInvalidTag);

        let (_, bag) = parse_doc("/** {@value} */");
        assert!(bag.is_empty());
    }

    #[test]
    fn deprecated_and_inherit_doc_flags() {
        let (doc, _) = parse_doc("/** @deprecated use other\n * {@inheritDoc} */");
        assert!(doc.deprecated);
        assert!(doc.inherit_doc);
    }

    #[test]
    fn missing_reference_reports_but_does_not_abort() {
        let (doc, bag) = parse_doc("/**\n * @param\n * @param b ok\n */");
        assert_eq!(
            bag.diagnostics()[0].kind,
            DiagnosticKind::JavadocMissingReference
        );
        assert_eq!(doc.params.len(), 1);
        assert_eq!(doc.params[0].name, "b");
    }
}
