//! Java language level + feature availability model.
//!
//! Quasar scans and parses a *superset* Java grammar (modern Java) and gates
//! language features on the configured source level. This module is the
//! canonical source of truth for "which Java version enables which feature?",
//! used by scanner keyword/literal gating, javadoc tag gating, and the
//! binding layer's compliance rules.

/// The effective Java language mode for a compilation unit.
///
/// - `major`: the Java feature release number. Pre-5 releases use their
///   historical minor as the major (`1.3` -> 3, `1.4` -> 4).
/// - `preview`: whether `--enable-preview` is in effect for this major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct JavaLanguageLevel {
    pub major: u16,
    pub preview: bool,
}

impl JavaLanguageLevel {
    pub const JAVA_1_3: Self = Self {
        major: 3,
        preview: false,
    };
    pub const JAVA_1_4: Self = Self {
        major: 4,
        preview: false,
    };
    pub const JAVA_1_5: Self = Self {
        major: 5,
        preview: false,
    };
    pub const JAVA_6: Self = Self {
        major: 6,
        preview: false,
    };
    pub const JAVA_7: Self = Self {
        major: 7,
        preview: false,
    };
    pub const JAVA_8: Self = Self {
        major: 8,
        preview: false,
    };
    pub const JAVA_11: Self = Self {
        major: 11,
        preview: false,
    };
    pub const JAVA_17: Self = Self {
        major: 17,
        preview: false,
    };
    pub const JAVA_21: Self = Self {
        major: 21,
        preview: false,
    };

    #[inline]
    pub const fn with_preview(self, preview: bool) -> Self {
        Self { preview, ..self }
    }

    pub fn availability(self, feature: JavaFeature) -> FeatureAvailability {
        use FeatureAvailability::*;
        use JavaFeature::*;

        match feature {
            AssertStatement => {
                if self.major >= 4 {
                    Stable
                } else {
                    Unavailable
                }
            }

            Enums | Generics | Annotations | Varargs | HexFloatLiterals => {
                if self.major >= 5 {
                    Stable
                } else {
                    Unavailable
                }
            }

            BinaryLiterals | UnderscoresInLiterals => {
                if self.major >= 7 {
                    Stable
                } else {
                    Unavailable
                }
            }

            VarLocalInference => {
                if self.major >= 10 {
                    Stable
                } else {
                    Unavailable
                }
            }

            TextBlocks => {
                if self.major >= 15 {
                    Stable
                } else if self.major == 13 || self.major == 14 {
                    Preview
                } else {
                    Unavailable
                }
            }

            Records => {
                if self.major >= 16 {
                    Stable
                } else if self.major == 14 || self.major == 15 {
                    Preview
                } else {
                    Unavailable
                }
            }

            SealedClasses => {
                if self.major >= 17 {
                    Stable
                } else if self.major == 15 || self.major == 16 {
                    Preview
                } else {
                    Unavailable
                }
            }
        }
    }

    /// Is the feature usable in this configuration? (applies `preview` flag)
    pub fn is_enabled(self, feature: JavaFeature) -> bool {
        match self.availability(feature) {
            FeatureAvailability::Stable => true,
            FeatureAvailability::Preview => self.preview,
            FeatureAvailability::Unavailable => false,
        }
    }

    #[inline]
    pub fn supports_assert(self) -> bool {
        self.is_enabled(JavaFeature::AssertStatement)
    }

    #[inline]
    pub fn supports_enums(self) -> bool {
        self.is_enabled(JavaFeature::Enums)
    }

    #[inline]
    pub fn supports_hex_floats(self) -> bool {
        self.is_enabled(JavaFeature::HexFloatLiterals)
    }

    #[inline]
    pub fn supports_underscores_in_literals(self) -> bool {
        self.is_enabled(JavaFeature::UnderscoresInLiterals)
    }

    #[inline]
    pub fn supports_binary_literals(self) -> bool {
        self.is_enabled(JavaFeature::BinaryLiterals)
    }

    #[inline]
    pub fn supports_records(self) -> bool {
        self.is_enabled(JavaFeature::Records)
    }

    #[inline]
    pub fn supports_sealed(self) -> bool {
        self.is_enabled(JavaFeature::SealedClasses)
    }

    #[inline]
    pub fn supports_text_blocks(self) -> bool {
        self.is_enabled(JavaFeature::TextBlocks)
    }

    #[inline]
    pub fn supports_var_local_inference(self) -> bool {
        self.is_enabled(JavaFeature::VarLocalInference)
    }
}

impl Default for JavaLanguageLevel {
    fn default() -> Self {
        JavaLanguageLevel::JAVA_21
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JavaFeature {
    AssertStatement,       // Java 1.4+
    Enums,                 // Java 5+
    Generics,              // Java 5+
    Annotations,           // Java 5+
    Varargs,               // Java 5+
    HexFloatLiterals,      // Java 5+
    BinaryLiterals,        // Java 7+
    UnderscoresInLiterals, // Java 7+
    VarLocalInference,     // Java 10+
    TextBlocks,            // final Java 15 (preview 13/14)
    Records,               // final Java 16 (preview 14/15)
    SealedClasses,         // final Java 17 (preview 15/16)
}

impl JavaFeature {
    pub const fn diagnostic_code(self) -> &'static str {
        match self {
            JavaFeature::AssertStatement => "JAVA_FEATURE_ASSERT",
            JavaFeature::Enums => "JAVA_FEATURE_ENUMS",
            JavaFeature::Generics => "JAVA_FEATURE_GENERICS",
            JavaFeature::Annotations => "JAVA_FEATURE_ANNOTATIONS",
            JavaFeature::Varargs => "JAVA_FEATURE_VARARGS",
            JavaFeature::HexFloatLiterals => "JAVA_FEATURE_HEX_FLOAT_LITERALS",
            JavaFeature::BinaryLiterals => "JAVA_FEATURE_BINARY_LITERALS",
            JavaFeature::UnderscoresInLiterals => "JAVA_FEATURE_UNDERSCORES_IN_LITERALS",
            JavaFeature::VarLocalInference => "JAVA_FEATURE_VAR_LOCAL_INFERENCE",
            JavaFeature::TextBlocks => "JAVA_FEATURE_TEXT_BLOCKS",
            JavaFeature::Records => "JAVA_FEATURE_RECORDS",
            JavaFeature::SealedClasses => "JAVA_FEATURE_SEALED_CLASSES",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            JavaFeature::AssertStatement => "`assert` statements",
            JavaFeature::Enums => "enums",
            JavaFeature::Generics => "generics",
            JavaFeature::Annotations => "annotations",
            JavaFeature::Varargs => "varargs",
            JavaFeature::HexFloatLiterals => "hexadecimal floating-point literals",
            JavaFeature::BinaryLiterals => "binary literals",
            JavaFeature::UnderscoresInLiterals => "underscores in numeric literals",
            JavaFeature::VarLocalInference => "local variable type inference (`var`)",
            JavaFeature::TextBlocks => "text blocks",
            JavaFeature::Records => "records",
            JavaFeature::SealedClasses => "sealed classes",
        }
    }

    pub const fn stable_since(self) -> Option<u16> {
        match self {
            JavaFeature::AssertStatement => Some(4),
            JavaFeature::Enums
            | JavaFeature::Generics
            | JavaFeature::Annotations
            | JavaFeature::Varargs
            | JavaFeature::HexFloatLiterals => Some(5),
            JavaFeature::BinaryLiterals | JavaFeature::UnderscoresInLiterals => Some(7),
            JavaFeature::VarLocalInference => Some(10),
            JavaFeature::TextBlocks => Some(15),
            JavaFeature::Records => Some(16),
            JavaFeature::SealedClasses => Some(17),
        }
    }
}

/// Whether the *language* supports a feature in this major version,
/// independent of whether preview is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureAvailability {
    Unavailable,
    Preview,
    Stable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_is_gated_at_1_4() {
        assert!(!JavaLanguageLevel::JAVA_1_3.supports_assert());
        assert!(JavaLanguageLevel::JAVA_1_4.supports_assert());
    }

    #[test]
    fn enums_are_gated_at_5() {
        assert!(!JavaLanguageLevel::JAVA_1_4.supports_enums());
        assert!(JavaLanguageLevel::JAVA_1_5.supports_enums());
    }

    #[test]
    fn preview_gates_records() {
        let fifteen = JavaLanguageLevel {
            major: 15,
            preview: false,
        };
        assert!(!fifteen.supports_records());
        assert!(fifteen.with_preview(true).supports_records());
        assert!(JavaLanguageLevel::JAVA_17.supports_records());
    }
}
