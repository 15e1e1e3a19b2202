use std::fmt;

use quasar_core::Span;

use crate::flags::BindingFlags;
use crate::synthetic::SyntheticKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// A resolved member type. A member whose declared type does not resolve is
/// removed from its owning array, so `Unresolved` never appears on a binding
/// returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    Primitive(&'static str),
    Void,
    Reference(TypeId),
    /// `java.lang` and other always-visible library types, by simple name.
    Library(String),
    TypeVariable(String),
    Array {
        elem: Box<ResolvedType>,
        dimensions: u8,
    },
}

impl ResolvedType {
    /// Erasure key for signature comparison: type variables erase to their
    /// bound (`Object` here), arrays keep their dimensions.
    pub fn erasure_key(&self) -> String {
        match self {
            ResolvedType::Primitive(name) => (*name).to_string(),
            ResolvedType::Void => "void".to_string(),
            ResolvedType::Reference(id) => format!("#{id}"),
            ResolvedType::Library(name) => name.clone(),
            ResolvedType::TypeVariable(_) => "java.lang.Object".to_string(),
            ResolvedType::Array { elem, dimensions } => {
                let mut key = elem.erasure_key();
                for _ in 0..*dimensions {
                    key.push_str("[]");
                }
                key
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub name: String,
    pub ty: ResolvedType,
    pub flags: BindingFlags,
    /// Well-known annotation bits; see [`crate::tag_bits`].
    pub tag_bits: u32,
    /// Annotation names, retained only when `store_annotations` is set.
    pub annotations: Vec<String>,
    pub declaring: TypeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    pub selector: String,
    pub return_ty: ResolvedType,
    pub params: Vec<ResolvedType>,
    /// Parameter erasure key, cached for duplicate checks and lookup.
    pub param_erasure: String,
    /// The parameter list as spelled in source (generics intact).
    pub spelled_signature: String,
    pub flags: BindingFlags,
    /// Well-known annotation bits; see [`crate::tag_bits`].
    pub tag_bits: u32,
    /// Annotation names, retained only when `store_annotations` is set.
    pub annotations: Vec<String>,
    pub declaring: TypeId,
    pub span: Span,
    pub synthetic: Option<SyntheticKind>,
}

impl MethodBinding {
    pub fn is_constructor(&self) -> bool {
        self.selector == "<init>"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordComponentBinding {
    pub name: String,
    pub ty: ResolvedType,
    pub declaring: TypeId,
    pub span: Span,
}
