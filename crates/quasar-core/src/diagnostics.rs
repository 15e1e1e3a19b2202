use std::fmt;

use crate::Span;

/// Effective severity of a reported condition.
///
/// `Ignore` means the condition is computed but not surfaced; callers use it
/// to make the same condition fatal in one compilation mode and silent in
/// another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Ignore,
}

/// Stable identity of every condition the front-end can report.
///
/// The variants double as the irritant codes named by diagnostics consumers;
/// `code()` is the stable string form. Default severities live in
/// `default_severity()` and can be overridden per [`crate::CompilerOptions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    // Lexical.
    UnterminatedString,
    UnterminatedCharacter,
    UnterminatedComment,
    UnterminatedTextBlock,
    InvalidEscape,
    InvalidUnicodeEscape,
    InvalidHexLiteral,
    InvalidBinaryLiteral,
    InvalidFloat,
    InvalidDigit,
    InvalidUnderscore,
    InvalidCharacterConstant,
    InvalidInput,
    ReservedWordUsedAsIdentifier,
    FeatureNotAvailable,
    TaskTag,

    // Syntax.
    SyntaxError,
    ExpectedToken,
    UnmatchedBracket,

    // Javadoc.
    JavadocUnexpectedTag,
    JavadocMisplacedParam,
    JavadocMissingReference,
    JavadocEmptyReturn,
    JavadocDuplicateReturn,
    JavadocInvalidTag,

    // Binding / resolution.
    DuplicateMethod,
    DuplicateMethodErasure,
    DuplicateField,
    DuplicateRecordComponent,
    DuplicateType,
    VoidFieldType,
    IllegalMemberType,
    RecordMemberCollision,
    PermitsOnNonSealedType,
    NonSealedWithoutSealedSupertype,
    PermittedClassNotDirectSubclass,
    PermittedInterfaceNotDirectSuperinterface,
    PermittedTypeInDifferentPackage,
    PermittedTypeInDifferentModule,
    HeapPollutionVarargs,
    IllegalNullAnnotation,
}

impl DiagnosticKind {
    pub const fn code(self) -> &'static str {
        match self {
            DiagnosticKind::UnterminatedString => "UNTERMINATED_STRING",
            DiagnosticKind::UnterminatedCharacter => "UNTERMINATED_CHARACTER",
            DiagnosticKind::UnterminatedComment => "UNTERMINATED_COMMENT",
            DiagnosticKind::UnterminatedTextBlock => "UNTERMINATED_TEXT_BLOCK",
            DiagnosticKind::InvalidEscape => "INVALID_ESCAPE",
            DiagnosticKind::InvalidUnicodeEscape => "INVALID_UNICODE_ESCAPE",
            DiagnosticKind::InvalidHexLiteral => "INVALID_HEX_LITERAL",
            DiagnosticKind::InvalidBinaryLiteral => "INVALID_BINARY_LITERAL",
            DiagnosticKind::InvalidFloat => "INVALID_FLOAT",
            DiagnosticKind::InvalidDigit => "INVALID_DIGIT",
            DiagnosticKind::InvalidUnderscore => "INVALID_UNDERSCORE",
            DiagnosticKind::InvalidCharacterConstant => "INVALID_CHARACTER_CONSTANT",
            DiagnosticKind::InvalidInput => "INVALID_INPUT",
            DiagnosticKind::ReservedWordUsedAsIdentifier => "RESERVED_WORD_AS_IDENTIFIER",
            DiagnosticKind::FeatureNotAvailable => "FEATURE_NOT_AVAILABLE",
            DiagnosticKind::TaskTag => "TASK_TAG",
            DiagnosticKind::SyntaxError => "SYNTAX_ERROR",
            DiagnosticKind::ExpectedToken => "EXPECTED_TOKEN",
            DiagnosticKind::UnmatchedBracket => "UNMATCHED_BRACKET",
            DiagnosticKind::JavadocUnexpectedTag => "JAVADOC_UNEXPECTED_TAG",
            DiagnosticKind::JavadocMisplacedParam => "JAVADOC_MISPLACED_PARAM",
            DiagnosticKind::JavadocMissingReference => "JAVADOC_MISSING_REFERENCE",
            DiagnosticKind::JavadocEmptyReturn => "JAVADOC_EMPTY_RETURN",
            DiagnosticKind::JavadocDuplicateReturn => "JAVADOC_DUPLICATE_RETURN",
            DiagnosticKind::JavadocInvalidTag => "JAVADOC_INVALID_TAG",
            DiagnosticKind::DuplicateMethod => "DUPLICATE_METHOD",
            DiagnosticKind::DuplicateMethodErasure => "DUPLICATE_METHOD_ERASURE",
            DiagnosticKind::DuplicateField => "DUPLICATE_FIELD",
            DiagnosticKind::DuplicateRecordComponent => "DUPLICATE_RECORD_COMPONENT",
            DiagnosticKind::DuplicateType => "DUPLICATE_TYPE",
            DiagnosticKind::VoidFieldType => "VOID_FIELD_TYPE",
            DiagnosticKind::IllegalMemberType => "ILLEGAL_MEMBER_TYPE",
            DiagnosticKind::RecordMemberCollision => "RECORD_MEMBER_COLLISION",
            DiagnosticKind::PermitsOnNonSealedType => "PERMITS_ON_NON_SEALED_TYPE",
            DiagnosticKind::NonSealedWithoutSealedSupertype => {
                "NON_SEALED_WITHOUT_SEALED_SUPERTYPE"
            }
            DiagnosticKind::PermittedClassNotDirectSubclass => {
                "PERMITTED_CLASS_NOT_DIRECT_SUBCLASS"
            }
            DiagnosticKind::PermittedInterfaceNotDirectSuperinterface => {
                "PERMITTED_INTERFACE_NOT_DIRECT_SUPERINTERFACE"
            }
            DiagnosticKind::PermittedTypeInDifferentPackage => {
                "PERMITTED_TYPE_IN_DIFFERENT_PACKAGE"
            }
            DiagnosticKind::PermittedTypeInDifferentModule => "PERMITTED_TYPE_IN_DIFFERENT_MODULE",
            DiagnosticKind::HeapPollutionVarargs => "HEAP_POLLUTION_VARARGS",
            DiagnosticKind::IllegalNullAnnotation => "ILLEGAL_NULL_ANNOTATION",
        }
    }

    pub const fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::ReservedWordUsedAsIdentifier
            | DiagnosticKind::TaskTag
            | DiagnosticKind::JavadocMisplacedParam
            | DiagnosticKind::JavadocMissingReference
            | DiagnosticKind::JavadocEmptyReturn
            | DiagnosticKind::JavadocInvalidTag
            | DiagnosticKind::DuplicateMethodErasure
            | DiagnosticKind::HeapPollutionVarargs => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// One reported condition with enough position and argument data to render a
/// squiggly underline and a human message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub span: Span,
    pub arguments: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            span,
            arguments: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} at {}..{}",
            self.severity,
            self.kind.code(),
            self.span.start,
            self.span.end
        )?;
        if !self.arguments.is_empty() {
            write!(f, " ({})", self.arguments.join(", "))?;
        }
        Ok(())
    }
}

/// Receives diagnostics as the pipeline produces them.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Plain vector collector; the default sink for tests and batch callers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Ignore {
            return;
        }
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_diagnostics_are_dropped_by_the_bag() {
        let mut bag = DiagnosticBag::new();
        bag.report(
            Diagnostic::new(DiagnosticKind::DuplicateMethod, Span::new(0, 4))
                .with_severity(Severity::Ignore),
        );
        bag.report(Diagnostic::new(DiagnosticKind::DuplicateMethod, Span::new(5, 9)));
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.diagnostics()[0].span, Span::new(5, 9));
    }

    #[test]
    fn default_severities() {
        assert_eq!(
            DiagnosticKind::UnterminatedString.default_severity(),
            Severity::Error
        );
        assert_eq!(
            DiagnosticKind::ReservedWordUsedAsIdentifier.default_severity(),
            Severity::Warning
        );
    }
}
