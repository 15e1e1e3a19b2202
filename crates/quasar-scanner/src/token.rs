use quasar_core::{JavaLanguageLevel, Span};

/// Token kind produced by the scanner.
///
/// This enum is intentionally "fat": a stable, closed set of kinds is a
/// prerequisite for the parser's dispatch tables and the assist layer's
/// cursor classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum TokenKind {
    // --- Trivia ---
    Whitespace,
    LineComment,
    BlockComment,
    DocComment,

    // --- Identifiers & literals ---
    Identifier,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,
    TextBlock,

    // --- Keywords (reserved) ---
    AbstractKw,
    AssertKw,
    BooleanKw,
    BreakKw,
    ByteKw,
    CaseKw,
    CatchKw,
    CharKw,
    ClassKw,
    ConstKw,
    ContinueKw,
    DefaultKw,
    DoKw,
    DoubleKw,
    ElseKw,
    EnumKw,
    ExtendsKw,
    FinalKw,
    FinallyKw,
    FloatKw,
    ForKw,
    GotoKw,
    IfKw,
    ImplementsKw,
    ImportKw,
    InstanceofKw,
    IntKw,
    InterfaceKw,
    LongKw,
    NativeKw,
    NewKw,
    PackageKw,
    PrivateKw,
    ProtectedKw,
    PublicKw,
    ReturnKw,
    ShortKw,
    StaticKw,
    StrictfpKw,
    SuperKw,
    SwitchKw,
    SynchronizedKw,
    ThisKw,
    ThrowKw,
    ThrowsKw,
    TransientKw,
    TryKw,
    VoidKw,
    VolatileKw,
    WhileKw,

    // Literal keywords.
    TrueKw,
    FalseKw,
    NullKw,

    // --- Contextual / restricted keywords ---
    VarKw,
    YieldKw,
    RecordKw,
    SealedKw,
    PermitsKw,
    NonSealedKw,

    // --- Separators ---
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Ellipsis,
    At,
    ColonColon,

    // --- Operators ---
    Eq,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    UShrEq,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Bang,
    Tilde,
    Question,
    Colon,
    Arrow,
    Shl,
    Shr,
    UShr,

    // --- Special ---
    Error,
    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::DocComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::DocComment
        )
    }

    pub fn is_keyword(self) -> bool {
        (self >= TokenKind::AbstractKw && self <= TokenKind::NullKw)
            || self.is_restricted_keyword()
    }

    pub fn is_restricted_keyword(self) -> bool {
        self >= TokenKind::VarKw && self <= TokenKind::NonSealedKw
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::LongLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
                | TokenKind::TextBlock
                | TokenKind::TrueKw
                | TokenKind::FalseKw
                | TokenKind::NullKw
        )
    }

    pub fn is_numeric_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::LongLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DoubleLiteral
        )
    }

    pub fn is_modifier_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::PublicKw
                | TokenKind::ProtectedKw
                | TokenKind::PrivateKw
                | TokenKind::StaticKw
                | TokenKind::AbstractKw
                | TokenKind::FinalKw
                | TokenKind::NativeKw
                | TokenKind::SynchronizedKw
                | TokenKind::TransientKw
                | TokenKind::VolatileKw
                | TokenKind::StrictfpKw
                | TokenKind::DefaultKw
                | TokenKind::SealedKw
                | TokenKind::NonSealedKw
        )
    }

    pub fn is_primitive_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::BooleanKw
                | TokenKind::ByteKw
                | TokenKind::ShortKw
                | TokenKind::IntKw
                | TokenKind::LongKw
                | TokenKind::CharKw
                | TokenKind::FloatKw
                | TokenKind::DoubleKw
        )
    }
}

/// A token: a kind plus its raw `[start, end)` span in the source buffer.
///
/// Tokens never carry text. Identifier/literal text is recovered from the
/// span via [`crate::Scanner::token_text`], which re-applies unicode-escape
/// decoding, so an escaped identifier and its plain spelling compare equal
/// while their raw spans differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}

/// Reserved-word lookup, gated by source level.
///
/// Returns `None` for words that are not reserved at `level`; `assert` and
/// `enum` fall back to identifiers below 1.4/5 respectively and the caller
/// records the reserved-word-as-identifier flag.
pub(crate) fn keyword_kind(text: &str, level: JavaLanguageLevel) -> KeywordLookup {
    let kind = match text {
        "abstract" => TokenKind::AbstractKw,
        "assert" => {
            return if level.supports_assert() {
                KeywordLookup::Keyword(TokenKind::AssertKw)
            } else {
                KeywordLookup::ReservedAtHigherLevel
            }
        }
        "boolean" => TokenKind::BooleanKw,
        "break" => TokenKind::BreakKw,
        "byte" => TokenKind::ByteKw,
        "case" => TokenKind::CaseKw,
        "catch" => TokenKind::CatchKw,
        "char" => TokenKind::CharKw,
        "class" => TokenKind::ClassKw,
        "const" => TokenKind::ConstKw,
        "continue" => TokenKind::ContinueKw,
        "default" => TokenKind::DefaultKw,
        "do" => TokenKind::DoKw,
        "double" => TokenKind::DoubleKw,
        "else" => TokenKind::ElseKw,
        "enum" => {
            return if level.supports_enums() {
                KeywordLookup::Keyword(TokenKind::EnumKw)
            } else {
                KeywordLookup::ReservedAtHigherLevel
            }
        }
        "extends" => TokenKind::ExtendsKw,
        "final" => TokenKind::FinalKw,
        "finally" => TokenKind::FinallyKw,
        "float" => TokenKind::FloatKw,
        "for" => TokenKind::ForKw,
        "goto" => TokenKind::GotoKw,
        "if" => TokenKind::IfKw,
        "implements" => TokenKind::ImplementsKw,
        "import" => TokenKind::ImportKw,
        "instanceof" => TokenKind::InstanceofKw,
        "int" => TokenKind::IntKw,
        "interface" => TokenKind::InterfaceKw,
        "long" => TokenKind::LongKw,
        "native" => TokenKind::NativeKw,
        "new" => TokenKind::NewKw,
        "package" => TokenKind::PackageKw,
        "private" => TokenKind::PrivateKw,
        "protected" => TokenKind::ProtectedKw,
        "public" => TokenKind::PublicKw,
        "return" => TokenKind::ReturnKw,
        "short" => TokenKind::ShortKw,
        "static" => TokenKind::StaticKw,
        "strictfp" => TokenKind::StrictfpKw,
        "super" => TokenKind::SuperKw,
        "switch" => TokenKind::SwitchKw,
        "synchronized" => TokenKind::SynchronizedKw,
        "this" => TokenKind::ThisKw,
        "throw" => TokenKind::ThrowKw,
        "throws" => TokenKind::ThrowsKw,
        "transient" => TokenKind::TransientKw,
        "try" => TokenKind::TryKw,
        "void" => TokenKind::VoidKw,
        "volatile" => TokenKind::VolatileKw,
        "while" => TokenKind::WhileKw,
        "true" => TokenKind::TrueKw,
        "false" => TokenKind::FalseKw,
        "null" => TokenKind::NullKw,
        _ => return KeywordLookup::NotKeyword,
    };
    KeywordLookup::Keyword(kind)
}

pub(crate) enum KeywordLookup {
    Keyword(TokenKind),
    /// The word is reserved at a higher source level than the current one;
    /// scan it as an identifier and flag the use.
    ReservedAtHigherLevel,
    NotKeyword,
}

/// Restricted keywords are never reserved by the scanner; the parser asks for
/// the contextual kind when grammar position allows one.
pub fn restricted_keyword(text: &str, level: JavaLanguageLevel) -> Option<TokenKind> {
    match text {
        "var" if level.supports_var_local_inference() => Some(TokenKind::VarKw),
        "yield" => Some(TokenKind::YieldKw),
        "record" if level.supports_records() => Some(TokenKind::RecordKw),
        "sealed" if level.supports_sealed() => Some(TokenKind::SealedKw),
        "permits" if level.supports_sealed() => Some(TokenKind::PermitsKw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_smoke_test() {
        assert!(TokenKind::ClassKw.is_keyword());
        assert!(TokenKind::SealedKw.is_keyword());
        assert!(TokenKind::PublicKw.is_modifier_keyword());
        assert!(TokenKind::IntLiteral.is_literal());
        assert!(TokenKind::IntKw.is_primitive_type_keyword());
        assert!(!TokenKind::Whitespace.is_keyword());
        assert!(TokenKind::DocComment.is_trivia());
    }

    #[test]
    fn restricted_keywords_are_level_gated() {
        assert_eq!(
            restricted_keyword("record", JavaLanguageLevel::JAVA_17),
            Some(TokenKind::RecordKw)
        );
        assert_eq!(restricted_keyword("record", JavaLanguageLevel::JAVA_8), None);
    }
}
