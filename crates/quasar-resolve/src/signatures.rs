//! The build-scope pass: lowering declaration AST nodes into the lightweight
//! signature records bindings resolve from.
//!
//! Everything the lazy resolution needs is copied out of the AST here, so
//! the binding table owns its data and the AST can be dropped independently.

use quasar_core::Span;
use quasar_parser::ast::{
    MemberDecl, Modifier, Modifiers, ParamDecl, TypeDecl, TypeRef,
};

use crate::flags::BindingFlags;
use crate::types::TypeKind;

/// A type reference as spelled in source, plus its erasure spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRefSig {
    pub spelled: String,
    pub erasure: String,
    pub dimensions: u8,
    pub has_type_args: bool,
    pub span: Span,
}

impl TypeRefSig {
    pub fn from_ast(ty: &TypeRef) -> Self {
        let mut spelled = ty.name.clone();
        if !ty.type_args.is_empty() {
            spelled.push('<');
            for (i, arg) in ty.type_args.iter().enumerate() {
                if i > 0 {
                    spelled.push(',');
                }
                spelled.push_str(&Self::from_ast(arg).spelled);
            }
            spelled.push('>');
        }
        for _ in 0..ty.dimensions {
            spelled.push_str("[]");
        }
        Self {
            spelled,
            erasure: ty.erasure(),
            dimensions: ty.dimensions,
            has_type_args: !ty.type_args.is_empty(),
            span: ty.range,
        }
    }

    pub fn is_void(&self) -> bool {
        self.erasure == "void"
    }

    /// Base name with generics and array suffixes stripped.
    pub fn base_name(&self) -> &str {
        let end = self
            .erasure
            .find("[]")
            .unwrap_or(self.erasure.len());
        &self.erasure[..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSig {
    pub name: String,
    pub name_span: Span,
    pub ty: TypeRefSig,
    pub flags: BindingFlags,
    pub annotations: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub selector: String,
    pub name_span: Span,
    pub return_ty: TypeRefSig,
    pub params: Vec<TypeRefSig>,
    pub param_names: Vec<String>,
    pub type_params: Vec<String>,
    pub flags: BindingFlags,
    pub annotations: Vec<String>,
    pub is_constructor: bool,
    pub span: Span,
}

impl MethodSig {
    /// Parameter-erasure key used by the duplicate policy.
    pub fn param_erasure(&self) -> String {
        self.params
            .iter()
            .map(|p| p.erasure.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parameter list exactly as spelled (generics intact).
    pub fn spelled_signature(&self) -> String {
        self.params
            .iter()
            .map(|p| p.spelled.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSig {
    pub name: String,
    pub ty: TypeRefSig,
    pub span: Span,
}

/// Everything remembered about one declared type for lazy resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSig {
    pub name: String,
    pub kind: TypeKind,
    pub flags: BindingFlags,
    pub type_params: Vec<String>,
    pub extends: Vec<TypeRefSig>,
    pub implements: Vec<TypeRefSig>,
    pub permits: Vec<TypeRefSig>,
    pub fields: Vec<FieldSig>,
    pub methods: Vec<MethodSig>,
    pub components: Vec<ComponentSig>,
    pub name_span: Span,
    pub span: Span,
}

pub(crate) fn binding_flags(modifiers: &Modifiers, deprecated: bool) -> BindingFlags {
    let mut flags = BindingFlags::default();
    let pairs = [
        (Modifier::Public, BindingFlags::PUBLIC),
        (Modifier::Protected, BindingFlags::PROTECTED),
        (Modifier::Private, BindingFlags::PRIVATE),
        (Modifier::Static, BindingFlags::STATIC),
        (Modifier::Abstract, BindingFlags::ABSTRACT),
        (Modifier::Final, BindingFlags::FINAL),
        (Modifier::Native, BindingFlags::NATIVE),
        (Modifier::Synchronized, BindingFlags::SYNCHRONIZED),
        (Modifier::Transient, BindingFlags::TRANSIENT),
        (Modifier::Volatile, BindingFlags::VOLATILE),
        (Modifier::Strictfp, BindingFlags::STRICTFP),
        (Modifier::Default, BindingFlags::DEFAULT),
        (Modifier::Sealed, BindingFlags::SEALED),
        (Modifier::NonSealed, BindingFlags::NON_SEALED),
    ];
    for (modifier, bit) in pairs {
        if modifiers.contains(modifier) {
            flags.insert(bit);
        }
    }
    if deprecated
        || modifiers
            .annotations
            .iter()
            .any(|a| a.name == "Deprecated" || a.name == "java.lang.Deprecated")
    {
        flags.insert(BindingFlags::DEPRECATED);
    }
    flags
}

/// Lower one declared type (not descending into nested types; the caller
/// walks those).
pub(crate) fn lower_type(decl: &TypeDecl) -> TypeSig {
    let (kind, flags) = match decl {
        TypeDecl::Class(class) => (
            TypeKind::Class,
            binding_flags(&class.modifiers, doc_deprecated(&class.doc)),
        ),
        TypeDecl::Interface(interface) => (
            TypeKind::Interface,
            binding_flags(&interface.modifiers, doc_deprecated(&interface.doc)),
        ),
        TypeDecl::Enum(decl) => (
            TypeKind::Enum,
            binding_flags(&decl.modifiers, doc_deprecated(&decl.doc)),
        ),
        TypeDecl::Record(record) => (
            TypeKind::Record,
            binding_flags(&record.modifiers, doc_deprecated(&record.doc)),
        ),
        TypeDecl::Annotation(annotation) => (
            TypeKind::Annotation,
            binding_flags(&annotation.modifiers, doc_deprecated(&annotation.doc)),
        ),
    };

    let mut sig = TypeSig {
        name: decl.name().to_string(),
        kind,
        flags,
        type_params: Vec::new(),
        extends: Vec::new(),
        implements: Vec::new(),
        permits: decl.permits().iter().map(TypeRefSig::from_ast).collect(),
        fields: Vec::new(),
        methods: Vec::new(),
        components: Vec::new(),
        name_span: decl.name_range(),
        span: decl.range(),
    };

    match decl {
        TypeDecl::Class(class) => {
            sig.type_params = class.type_parameters.iter().map(|p| p.name.clone()).collect();
            sig.extends = class.extends.iter().map(TypeRefSig::from_ast).collect();
            sig.implements = class.implements.iter().map(TypeRefSig::from_ast).collect();
        }
        TypeDecl::Interface(interface) => {
            sig.type_params = interface
                .type_parameters
                .iter()
                .map(|p| p.name.clone())
                .collect();
            sig.extends = interface.extends.iter().map(TypeRefSig::from_ast).collect();
        }
        TypeDecl::Enum(decl) => {
            sig.implements = decl.implements.iter().map(TypeRefSig::from_ast).collect();
            // Enum constants surface as static final fields of the enum type.
            for constant in &decl.constants {
                let mut flags = BindingFlags::default();
                flags.insert(BindingFlags::PUBLIC | BindingFlags::STATIC | BindingFlags::FINAL);
                sig.fields.push(FieldSig {
                    name: constant.name.clone(),
                    name_span: constant.name_range,
                    ty: TypeRefSig {
                        spelled: decl.name.clone(),
                        erasure: decl.name.clone(),
                        dimensions: 0,
                        has_type_args: false,
                        span: constant.name_range,
                    },
                    flags,
                    annotations: Vec::new(),
                    span: constant.range,
                });
            }
        }
        TypeDecl::Record(record) => {
            sig.type_params = record
                .type_parameters
                .iter()
                .map(|p| p.name.clone())
                .collect();
            sig.implements = record.implements.iter().map(TypeRefSig::from_ast).collect();
            sig.components = record
                .components
                .iter()
                .map(|c| ComponentSig {
                    name: c.name.clone(),
                    ty: TypeRefSig::from_ast(&c.ty),
                    span: c.range,
                })
                .collect();
        }
        TypeDecl::Annotation(_) => {}
    }

    for member in decl.members() {
        match member {
            MemberDecl::Field(field) => {
                sig.fields.push(FieldSig {
                    name: field.name.clone(),
                    name_span: field.name_range,
                    ty: TypeRefSig::from_ast(&field.ty),
                    flags: binding_flags(&field.modifiers, doc_deprecated(&field.doc)),
                    annotations: annotation_names(&field.modifiers),
                    span: field.range,
                });
            }
            MemberDecl::Method(method) => {
                let mut flags = binding_flags(&method.modifiers, doc_deprecated(&method.doc));
                if method.params.iter().any(|p| p.varargs) {
                    flags.insert(BindingFlags::VARARGS);
                }
                sig.methods.push(MethodSig {
                    selector: method.name.clone(),
                    name_span: method.name_range,
                    return_ty: TypeRefSig::from_ast(&method.return_ty),
                    params: param_sigs(&method.params),
                    param_names: method.params.iter().map(|p| p.name.clone()).collect(),
                    type_params: method
                        .type_parameters
                        .iter()
                        .map(|p| p.name.clone())
                        .collect(),
                    flags,
                    annotations: annotation_names(&method.modifiers),
                    is_constructor: false,
                    span: method.range,
                });
            }
            MemberDecl::Constructor(ctor) => {
                let mut flags = binding_flags(&ctor.modifiers, doc_deprecated(&ctor.doc));
                if ctor.params.iter().any(|p| p.varargs) {
                    flags.insert(BindingFlags::VARARGS);
                }
                sig.methods.push(MethodSig {
                    selector: "<init>".to_string(),
                    name_span: ctor.name_range,
                    return_ty: TypeRefSig {
                        spelled: "void".to_string(),
                        erasure: "void".to_string(),
                        dimensions: 0,
                        has_type_args: false,
                        span: ctor.name_range,
                    },
                    params: param_sigs(&ctor.params),
                    param_names: ctor.params.iter().map(|p| p.name.clone()).collect(),
                    type_params: ctor
                        .type_parameters
                        .iter()
                        .map(|p| p.name.clone())
                        .collect(),
                    flags,
                    annotations: annotation_names(&ctor.modifiers),
                    is_constructor: true,
                    span: ctor.range,
                });
            }
            MemberDecl::Initializer(_) | MemberDecl::Type(_) => {}
        }
    }

    sig
}

fn param_sigs(params: &[ParamDecl]) -> Vec<TypeRefSig> {
    params.iter().map(|p| TypeRefSig::from_ast(&p.ty)).collect()
}

fn annotation_names(modifiers: &Modifiers) -> Vec<String> {
    modifiers.annotations.iter().map(|a| a.name.clone()).collect()
}

fn doc_deprecated(doc: &Option<quasar_parser::DocComment>) -> bool {
    doc.as_ref().is_some_and(|d| d.deprecated)
}
