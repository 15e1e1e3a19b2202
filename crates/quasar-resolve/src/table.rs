//! The binding table: one per compilation unit, owning every type binding
//! and its lazily-resolved member tables.
//!
//! `fields()`, `methods()` and `components()` are idempotent: the first call
//! resolves and caches, later calls return the cached array. A reentrant
//! call that arrives while a facet is mid-resolution (member resolution can
//! recurse through supertypes, including cyclic hierarchies) sees the
//! best-known partial array instead of recursing forever; the guard bit is
//! the only thing consulted, so the outer resolution finishes against the
//! live array. Members whose declared types fail to resolve are removed from
//! the backing array, never nulled in place.

use std::collections::HashMap;

use quasar_core::{
    CompilerOptions, Diagnostic, DiagnosticKind, DiagnosticSink, Span,
};
use quasar_parser::ast::{CompilationUnit, MemberDecl, TypeDecl};

use crate::flags::{annotation_tag_bits, state, tag_bits as tag_bits_mod, BindingFlags};
use crate::prototypes::PrototypeRegistry;
use crate::sealed;
use crate::signatures::{lower_type, MethodSig, TypeRefSig, TypeSig};
use crate::synthetic::{SyntheticFactory, SyntheticKind, SyntheticSlot};
use crate::types::{
    FieldBinding, MethodBinding, RecordComponentBinding, ResolvedType, TypeId, TypeKind,
};
use crate::duplicates::{check_duplicate, DuplicateVerdict};

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "int", "long", "char", "float", "double",
];

const DEFAULT_EXTERNAL_TYPES: &[&str] = &[
    "Object",
    "String",
    "CharSequence",
    "StringBuilder",
    "Integer",
    "Long",
    "Short",
    "Byte",
    "Character",
    "Boolean",
    "Float",
    "Double",
    "Number",
    "Void",
    "Class",
    "Enum",
    "Record",
    "Iterable",
    "Comparable",
    "Cloneable",
    "Runnable",
    "Thread",
    "Throwable",
    "Exception",
    "RuntimeException",
    "Error",
    "IllegalArgumentException",
    "IllegalStateException",
    "UnsupportedOperationException",
    "NullPointerException",
    "Closeable",
    "AutoCloseable",
    "List",
    "Map",
    "Set",
    "Collection",
    "Optional",
    "Iterator",
    "ArrayList",
    "HashMap",
    "HashSet",
];

/// One declared (or variant) type.
#[derive(Debug, Clone)]
pub struct TypeBinding {
    pub name: String,
    pub qualified_name: String,
    pub compound_name: Vec<String>,
    pub package: String,
    /// `None` is the unnamed module.
    pub module: Option<String>,
    pub kind: TypeKind,
    pub flags: BindingFlags,
    pub enclosing: Option<TypeId>,
    pub span: Span,
    pub name_span: Span,
    pub(crate) sig: TypeSig,
    pub(crate) state: u16,
    pub(crate) fields: Vec<FieldBinding>,
    pub(crate) methods: Vec<MethodBinding>,
    pub(crate) components: Vec<RecordComponentBinding>,
    /// Selector-sorted index over `methods`, valid when `METHODS_SORTED`.
    method_order: Vec<usize>,
}

impl TypeBinding {
    pub(crate) fn is_complete(&self, facet: u16) -> bool {
        self.state & facet != 0
    }

    pub fn fields_complete(&self) -> bool {
        self.is_complete(state::FIELDS_COMPLETE)
    }

    pub fn methods_complete(&self) -> bool {
        self.is_complete(state::METHODS_COMPLETE)
    }

    pub fn components_complete(&self) -> bool {
        self.is_complete(state::COMPONENTS_COMPLETE)
    }

    pub fn methods_sorted(&self) -> bool {
        self.is_complete(state::METHODS_SORTED)
    }

    /// Members resolved so far; complete once the matching facet flag is set.
    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodBinding] {
        &self.methods
    }

    pub fn components(&self) -> &[RecordComponentBinding] {
        &self.components
    }
}

#[derive(Debug)]
pub struct BindingTable {
    options: CompilerOptions,
    types: Vec<TypeBinding>,
    by_qualified: HashMap<String, TypeId>,
    by_simple: HashMap<String, TypeId>,
    external_types: Vec<String>,
    synthetics: SyntheticFactory,
    prototypes: PrototypeRegistry,
}

/// Build the binding scope for one compilation unit: one binding per
/// declared type, members pending until first access. Further units (other
/// packages of the same build) can be entered with
/// [`BindingTable::add_unit`].
pub fn bind_unit(
    unit: &CompilationUnit,
    options: CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> BindingTable {
    let mut table = BindingTable {
        options,
        types: Vec::new(),
        by_qualified: HashMap::new(),
        by_simple: HashMap::new(),
        external_types: DEFAULT_EXTERNAL_TYPES
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        synthetics: SyntheticFactory::new(),
        prototypes: PrototypeRegistry::new(),
    };
    table.add_unit(unit, sink);
    table
}

impl BindingTable {
    /// Enter another compilation unit's declared types into this scope.
    pub fn add_unit(&mut self, unit: &CompilationUnit, sink: &mut dyn DiagnosticSink) {
        let package = unit
            .package
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        tracing::debug!(package = %package, types = unit.types.len(), "building binding scope");
        for decl in &unit.types {
            self.enter_type(decl, &package, None, sink);
        }
    }

    fn enter_type(
        &mut self,
        decl: &TypeDecl,
        package: &str,
        enclosing: Option<TypeId>,
        sink: &mut dyn DiagnosticSink,
    ) -> TypeId {
        let sig = lower_type(decl);
        let mut compound_name: Vec<String> = package
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(enclosing) = enclosing {
            let outer = &self.types[enclosing.index()];
            compound_name = outer.compound_name.clone();
        }
        compound_name.push(sig.name.clone());
        let qualified_name = compound_name.join(".");

        let id = TypeId(self.types.len() as u32);
        if let Some(&existing) = self.by_qualified.get(&qualified_name) {
            sink.report(
                Diagnostic::new(DiagnosticKind::DuplicateType, sig.name_span)
                    .with_arg(&qualified_name),
            );
            // The first declaration wins; nested members of the duplicate are
            // not entered.
            return existing;
        }

        let binding = TypeBinding {
            name: sig.name.clone(),
            qualified_name: qualified_name.clone(),
            compound_name,
            package: package.to_string(),
            module: None,
            kind: sig.kind,
            flags: sig.flags,
            enclosing,
            span: sig.span,
            name_span: sig.name_span,
            sig,
            state: 0,
            fields: Vec::new(),
            methods: Vec::new(),
            components: Vec::new(),
            method_order: Vec::new(),
        };
        self.types.push(binding);
        self.by_qualified.insert(qualified_name, id);
        self.by_simple
            .entry(self.types[id.index()].name.clone())
            .or_insert(id);

        for member in decl.members() {
            if let MemberDecl::Type(nested) = member {
                self.enter_type(nested, package, Some(id), sink);
            }
        }
        id
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len() as u32).map(TypeId)
    }

    pub fn get(&self, id: TypeId) -> &TypeBinding {
        &self.types[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_qualified
            .get(name)
            .or_else(|| self.by_simple.get(name))
            .copied()
    }

    /// Make `name` resolvable as an always-visible library type.
    pub fn add_external_type(&mut self, name: impl Into<String>) {
        self.external_types.push(name.into());
    }

    pub(crate) fn resolve_type_ref(
        &self,
        owner: TypeId,
        sig: &TypeRefSig,
        method_type_params: &[String],
    ) -> Option<ResolvedType> {
        let base = sig.base_name();
        let elem = self.resolve_base_name(owner, base, method_type_params)?;
        if sig.dimensions > 0 {
            return Some(ResolvedType::Array {
                elem: Box::new(elem),
                dimensions: sig.dimensions,
            });
        }
        Some(elem)
    }

    fn resolve_base_name(
        &self,
        owner: TypeId,
        base: &str,
        method_type_params: &[String],
    ) -> Option<ResolvedType> {
        if base == "void" {
            return Some(ResolvedType::Void);
        }
        if let Some(primitive) = PRIMITIVES.iter().find(|&&p| p == base) {
            return Some(ResolvedType::Primitive(primitive));
        }
        if method_type_params.iter().any(|p| p == base) {
            return Some(ResolvedType::TypeVariable(base.to_string()));
        }
        // Class type parameters, walking the enclosing chain.
        let mut scope = Some(owner);
        while let Some(id) = scope {
            let binding = &self.types[id.index()];
            if binding.sig.type_params.iter().any(|p| p == base) {
                return Some(ResolvedType::TypeVariable(base.to_string()));
            }
            scope = binding.enclosing;
        }
        if let Some(id) = self.lookup(base) {
            return Some(ResolvedType::Reference(id));
        }
        let simple = base.rsplit('.').next().unwrap_or(base);
        if self.external_types.iter().any(|t| t == simple) {
            return Some(ResolvedType::Library(simple.to_string()));
        }
        None
    }

    // --- fields -------------------------------------------------------------

    /// Resolved fields, computed on first access.
    pub fn fields(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) -> &[FieldBinding] {
        self.resolve_fields(id, sink);
        &self.types[id.index()].fields
    }

    fn resolve_fields(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) {
        let binding = &self.types[id.index()];
        if binding.state & (state::FIELDS_COMPLETE | state::FIELDS_RESOLVING) != 0 {
            return;
        }
        self.types[id.index()].state |= state::FIELDS_RESOLVING;

        let sigs = self.types[id.index()].sig.fields.clone();
        let kind = self.types[id.index()].kind;
        for sig in sigs {
            if sig.ty.is_void() {
                sink.report(
                    Diagnostic::new(DiagnosticKind::VoidFieldType, sig.ty.span).with_arg(&sig.name),
                );
                continue;
            }
            let Some(ty) = self.resolve_type_ref(id, &sig.ty, &[]) else {
                sink.report(
                    Diagnostic::new(DiagnosticKind::IllegalMemberType, sig.ty.span)
                        .with_args([sig.name.as_str(), sig.ty.spelled.as_str()]),
                );
                continue;
            };
            if self.types[id.index()]
                .fields
                .iter()
                .any(|f| f.name == sig.name)
            {
                sink.report(
                    Diagnostic::new(DiagnosticKind::DuplicateField, sig.name_span)
                        .with_arg(&sig.name),
                );
                continue;
            }
            if kind == TypeKind::Record && !sig.flags.is_static() {
                sink.report(
                    Diagnostic::new(DiagnosticKind::RecordMemberCollision, sig.name_span)
                        .with_arg(&sig.name),
                );
                continue;
            }
            let tag_bits = annotation_tag_bits(sig.annotations.iter().map(String::as_str));
            let mut flags = sig.flags;
            if tag_bits & tag_bits_mod::DEPRECATED != 0 {
                flags.insert(BindingFlags::DEPRECATED);
            }
            if self.options.annotation_based_null_analysis
                && tag_bits & (tag_bits_mod::NULLABLE | tag_bits_mod::NON_NULL) != 0
                && matches!(ty, ResolvedType::Primitive(_))
            {
                sink.report(
                    Diagnostic::new(DiagnosticKind::IllegalNullAnnotation, sig.name_span)
                        .with_arg(&sig.name),
                );
            }
            let annotations = if self.options.store_annotations {
                sig.annotations
            } else {
                Vec::new()
            };
            self.types[id.index()].fields.push(FieldBinding {
                name: sig.name,
                ty,
                flags,
                tag_bits,
                annotations,
                declaring: id,
                span: sig.span,
            });
        }

        self.synthesize_outer_this(id);

        self.types[id.index()].state |= state::FIELDS_COMPLETE;
        self.broadcast_members(id);
    }

    /// Inner (non-static nested) classes carry a synthetic `this$N` field for
    /// the enclosing instance.
    fn synthesize_outer_this(&mut self, id: TypeId) {
        let binding = &self.types[id.index()];
        let Some(enclosing) = binding.enclosing else { return };
        if binding.flags.is_static() || binding.kind != TypeKind::Class {
            return;
        }
        let mut depth = 0usize;
        let mut scope = Some(enclosing);
        while let Some(outer) = scope {
            scope = self.types[outer.index()].enclosing;
            depth += 1;
        }
        let selector = format!("this${}", depth.saturating_sub(1));
        let span = self.types[id.index()].name_span;
        let slot_needed = self
            .synthetics
            .lookup(id, SyntheticKind::OuterThisField, &selector)
            .is_none();
        if slot_needed {
            let index = self.types[id.index()].fields.len();
            self.synthetics
                .get_or_create(id, SyntheticKind::OuterThisField, &selector, || {
                    SyntheticSlot::Field(index)
                });
            let mut flags = BindingFlags::default();
            flags.insert(BindingFlags::FINAL | BindingFlags::SYNTHETIC);
            self.types[id.index()].fields.push(FieldBinding {
                name: selector,
                ty: ResolvedType::Reference(enclosing),
                flags,
                tag_bits: 0,
                annotations: Vec::new(),
                declaring: id,
                span,
            });
        }
    }

    // --- record components --------------------------------------------------

    pub fn components(
        &mut self,
        id: TypeId,
        sink: &mut dyn DiagnosticSink,
    ) -> &[RecordComponentBinding] {
        self.resolve_components(id, sink);
        &self.types[id.index()].components
    }

    fn resolve_components(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) {
        let binding = &self.types[id.index()];
        if binding.state & (state::COMPONENTS_COMPLETE | state::COMPONENTS_RESOLVING) != 0 {
            return;
        }
        self.types[id.index()].state |= state::COMPONENTS_RESOLVING;

        let sigs = self.types[id.index()].sig.components.clone();
        for sig in sigs {
            let Some(ty) = self.resolve_type_ref(id, &sig.ty, &[]) else {
                sink.report(
                    Diagnostic::new(DiagnosticKind::IllegalMemberType, sig.ty.span)
                        .with_args([sig.name.as_str(), sig.ty.spelled.as_str()]),
                );
                continue;
            };
            if self.types[id.index()]
                .components
                .iter()
                .any(|c| c.name == sig.name)
            {
                sink.report(
                    Diagnostic::new(DiagnosticKind::DuplicateRecordComponent, sig.span)
                        .with_arg(&sig.name),
                );
                continue;
            }
            self.types[id.index()].components.push(RecordComponentBinding {
                name: sig.name,
                ty,
                declaring: id,
                span: sig.span,
            });
        }

        self.types[id.index()].state |= state::COMPONENTS_COMPLETE;
        self.broadcast_members(id);
    }

    // --- methods ------------------------------------------------------------

    /// Resolved methods, computed on first access. During resolution a
    /// reentrant call returns the partial array built so far.
    pub fn methods(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) -> &[MethodBinding] {
        self.resolve_methods(id, sink);
        &self.types[id.index()].methods
    }

    fn resolve_methods(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) {
        let binding = &self.types[id.index()];
        if binding.state & (state::METHODS_COMPLETE | state::METHODS_RESOLVING) != 0 {
            return;
        }
        self.types[id.index()].state |= state::METHODS_RESOLVING;
        tracing::trace!(ty = %self.types[id.index()].qualified_name, "resolving methods");

        // Supertype members first; cycles bottom out on the resolving guard.
        let supers: Vec<TypeRefSig> = {
            let sig = &self.types[id.index()].sig;
            sig.extends.iter().chain(sig.implements.iter()).cloned().collect()
        };
        for super_ref in &supers {
            if let Some(ResolvedType::Reference(super_id)) =
                self.resolve_type_ref(id, super_ref, &[])
            {
                self.resolve_methods(super_id, sink);
            }
        }

        let sigs = self.types[id.index()].sig.methods.clone();
        let compliance = self.options.compliance_level;
        let mut kept: Vec<MethodSig> = Vec::new();

        'next_method: for sig in sigs {
            let Some(return_ty) = self.resolve_type_ref(id, &sig.return_ty, &sig.type_params)
            else {
                sink.report(
                    Diagnostic::new(DiagnosticKind::IllegalMemberType, sig.return_ty.span)
                        .with_args([sig.selector.as_str(), sig.return_ty.spelled.as_str()]),
                );
                continue;
            };
            let mut params = Vec::with_capacity(sig.params.len());
            for param in &sig.params {
                match self.resolve_type_ref(id, param, &sig.type_params) {
                    Some(ty) => params.push(ty),
                    None => {
                        sink.report(
                            Diagnostic::new(DiagnosticKind::IllegalMemberType, param.span)
                                .with_args([sig.selector.as_str(), param.spelled.as_str()]),
                        );
                        continue 'next_method;
                    }
                }
            }

            for prev in &kept {
                match check_duplicate(compliance, prev, &sig) {
                    DuplicateVerdict::NotDuplicate => {}
                    DuplicateVerdict::Error => {
                        // Deterministic: the first declaration is retained.
                        sink.report(
                            Diagnostic::new(DiagnosticKind::DuplicateMethod, sig.name_span)
                                .with_arg(&sig.selector),
                        );
                        continue 'next_method;
                    }
                    DuplicateVerdict::ErasureWarning => {
                        sink.report(
                            Diagnostic::new(
                                DiagnosticKind::DuplicateMethodErasure,
                                sig.name_span,
                            )
                            .with_arg(&sig.selector),
                        );
                        // Downgraded: both declarations survive.
                    }
                }
            }

            if sig.flags.contains(BindingFlags::VARARGS) {
                if let Some(last) = sig.params.last() {
                    if last.has_type_args {
                        sink.report(
                            Diagnostic::new(DiagnosticKind::HeapPollutionVarargs, last.span)
                                .with_arg(&sig.selector),
                        );
                    }
                }
            }

            let tag_bits = annotation_tag_bits(sig.annotations.iter().map(String::as_str));
            let mut flags = sig.flags;
            if tag_bits & tag_bits_mod::DEPRECATED != 0 {
                flags.insert(BindingFlags::DEPRECATED);
            }
            if self.options.annotation_based_null_analysis
                && tag_bits & (tag_bits_mod::NULLABLE | tag_bits_mod::NON_NULL) != 0
                && matches!(return_ty, ResolvedType::Primitive(_) | ResolvedType::Void)
            {
                sink.report(
                    Diagnostic::new(DiagnosticKind::IllegalNullAnnotation, sig.name_span)
                        .with_arg(&sig.selector),
                );
            }
            let annotations = if self.options.store_annotations {
                sig.annotations.clone()
            } else {
                Vec::new()
            };
            let method = MethodBinding {
                selector: sig.selector.clone(),
                return_ty,
                param_erasure: sig.param_erasure(),
                spelled_signature: sig.spelled_signature(),
                params,
                flags,
                tag_bits,
                annotations,
                declaring: id,
                span: sig.span,
                synthetic: None,
            };
            // Push immediately so reentrant readers see the partial table.
            self.types[id.index()].methods.push(method);
            kept.push(sig);
        }

        match self.types[id.index()].kind {
            TypeKind::Record => self.synthesize_record_members(id, sink),
            TypeKind::Enum => self.synthesize_enum_members(id),
            _ => {}
        }

        self.types[id.index()].state |= state::METHODS_COMPLETE;
        self.broadcast_members(id);
    }

    /// Implicit record members: canonical constructor, component accessors,
    /// and the `Object` trio. A user declaration with an erasure-compatible
    /// signature always wins; the synthetic is simply not created.
    fn synthesize_record_members(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) {
        self.resolve_components(id, sink);
        let components = self.types[id.index()].components.clone();
        let component_sigs = self.types[id.index()].sig.components.clone();
        let span = self.types[id.index()].name_span;

        // Erasure keys compare against user methods' spelled erasures, so
        // they come from the declaration signatures, not the resolved types.
        let canonical_erasure = component_sigs
            .iter()
            .map(|c| c.ty.erasure.as_str())
            .collect::<Vec<_>>()
            .join(",");
        if !self.has_user_method(id, "<init>", &canonical_erasure) {
            self.push_synthetic_method(
                id,
                SyntheticKind::RecordCanonicalConstructor,
                "<init>",
                ResolvedType::Void,
                components.iter().map(|c| c.ty.clone()).collect(),
                canonical_erasure,
                span,
            );
        }

        for component in &components {
            if self.has_user_method(id, &component.name, "") {
                continue;
            }
            self.push_synthetic_method(
                id,
                SyntheticKind::RecordAccessor,
                &component.name,
                component.ty.clone(),
                Vec::new(),
                String::new(),
                component.span,
            );
        }

        let object_methods: [(&str, ResolvedType, Vec<ResolvedType>, &str); 3] = [
            ("toString", ResolvedType::Library("String".into()), vec![], ""),
            ("hashCode", ResolvedType::Primitive("int"), vec![], ""),
            (
                "equals",
                ResolvedType::Primitive("boolean"),
                vec![ResolvedType::Library("Object".into())],
                "Object",
            ),
        ];
        for (selector, return_ty, params, erasure) in object_methods {
            if self.has_user_method(id, selector, erasure) {
                continue;
            }
            self.push_synthetic_method(
                id,
                SyntheticKind::RecordObjectMethod,
                selector,
                return_ty,
                params,
                erasure.to_string(),
                span,
            );
        }
    }

    fn synthesize_enum_members(&mut self, id: TypeId) {
        let span = self.types[id.index()].name_span;
        if !self.has_user_method(id, "values", "") {
            self.push_synthetic_method(
                id,
                SyntheticKind::EnumValues,
                "values",
                ResolvedType::Array {
                    elem: Box::new(ResolvedType::Reference(id)),
                    dimensions: 1,
                },
                Vec::new(),
                String::new(),
                span,
            );
        }
        if !self.has_user_method(id, "valueOf", "String") {
            self.push_synthetic_method(
                id,
                SyntheticKind::EnumValueOf,
                "valueOf",
                ResolvedType::Reference(id),
                vec![ResolvedType::Library("String".into())],
                "String".to_string(),
                span,
            );
        }
    }

    fn has_user_method(&self, id: TypeId, selector: &str, param_erasure: &str) -> bool {
        self.types[id.index()].methods.iter().any(|m| {
            m.synthetic.is_none() && m.selector == selector && m.param_erasure == param_erasure
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn push_synthetic_method(
        &mut self,
        id: TypeId,
        kind: SyntheticKind,
        selector: &str,
        return_ty: ResolvedType,
        params: Vec<ResolvedType>,
        param_erasure: String,
        span: Span,
    ) {
        if self.synthetics.lookup(id, kind, selector).is_some() {
            return;
        }
        let index = self.types[id.index()].methods.len();
        self.synthetics
            .get_or_create(id, kind, selector, || SyntheticSlot::Method(index));
        let mut flags = BindingFlags::default();
        flags.insert(BindingFlags::PUBLIC | BindingFlags::SYNTHETIC);
        self.types[id.index()].methods.push(MethodBinding {
            selector: selector.to_string(),
            return_ty,
            spelled_signature: param_erasure.clone(),
            param_erasure,
            params,
            flags,
            tag_bits: 0,
            annotations: Vec::new(),
            declaring: id,
            span,
            synthetic: Some(kind),
        });
    }

    /// Bridge method factory: memoized per `(owner, selector + erasure)`.
    pub fn bridge_method(
        &mut self,
        owner: TypeId,
        selector: &str,
        param_erasure: &str,
        return_ty: ResolvedType,
        params: Vec<ResolvedType>,
    ) -> usize {
        let key = format!("{selector}({param_erasure})");
        let span = self.types[owner.index()].name_span;
        let existing = self
            .synthetics
            .lookup(owner, SyntheticKind::BridgeMethod, &key);
        if let Some(SyntheticSlot::Method(index)) = existing {
            return index;
        }
        let index = self.types[owner.index()].methods.len();
        self.synthetics
            .get_or_create(owner, SyntheticKind::BridgeMethod, &key, || {
                SyntheticSlot::Method(index)
            });
        let mut flags = BindingFlags::default();
        flags.insert(BindingFlags::PUBLIC | BindingFlags::SYNTHETIC);
        self.types[owner.index()].methods.push(MethodBinding {
            selector: selector.to_string(),
            return_ty,
            param_erasure: param_erasure.to_string(),
            spelled_signature: param_erasure.to_string(),
            params,
            flags,
            tag_bits: 0,
            annotations: Vec::new(),
            declaring: owner,
            span,
            synthetic: Some(SyntheticKind::BridgeMethod),
        });
        self.broadcast_members(owner);
        index
    }

    /// Switch-on-enum lookup table field, one per `(owner, enum)` pair.
    pub fn switch_table_field(&mut self, owner: TypeId, enum_id: TypeId) -> usize {
        let selector = format!(
            "$SWITCH_TABLE${}",
            self.types[enum_id.index()].qualified_name.replace('.', "$")
        );
        if let Some(SyntheticSlot::Field(index)) =
            self.synthetics
                .lookup(owner, SyntheticKind::SwitchTable, &selector)
        {
            return index;
        }
        let index = self.types[owner.index()].fields.len();
        self.synthetics
            .get_or_create(owner, SyntheticKind::SwitchTable, &selector, || {
                SyntheticSlot::Field(index)
            });
        let span = self.types[owner.index()].name_span;
        let mut flags = BindingFlags::default();
        flags.insert(BindingFlags::STATIC | BindingFlags::SYNTHETIC);
        self.types[owner.index()].fields.push(FieldBinding {
            name: selector,
            ty: ResolvedType::Array {
                elem: Box::new(ResolvedType::Primitive("int")),
                dimensions: 1,
            },
            flags,
            tag_bits: 0,
            annotations: Vec::new(),
            declaring: owner,
            span,
        });
        self.broadcast_members(owner);
        index
    }

    /// `$deserializeLambda$` placeholder, one per owner.
    pub fn lambda_deserialize_placeholder(&mut self, owner: TypeId) -> usize {
        if let Some(SyntheticSlot::Method(index)) = self.synthetics.lookup(
            owner,
            SyntheticKind::LambdaDeserialize,
            "$deserializeLambda$",
        ) {
            return index;
        }
        let index = self.types[owner.index()].methods.len();
        self.synthetics.get_or_create(
            owner,
            SyntheticKind::LambdaDeserialize,
            "$deserializeLambda$",
            || SyntheticSlot::Method(index),
        );
        let span = self.types[owner.index()].name_span;
        let mut flags = BindingFlags::default();
        flags.insert(BindingFlags::PRIVATE | BindingFlags::STATIC | BindingFlags::SYNTHETIC);
        self.types[owner.index()].methods.push(MethodBinding {
            selector: "$deserializeLambda$".to_string(),
            return_ty: ResolvedType::Library("Object".into()),
            param_erasure: "SerializedLambda".to_string(),
            spelled_signature: "SerializedLambda".to_string(),
            params: vec![ResolvedType::Library("SerializedLambda".into())],
            flags,
            tag_bits: 0,
            annotations: Vec::new(),
            declaring: owner,
            span,
            synthetic: Some(SyntheticKind::LambdaDeserialize),
        });
        self.broadcast_members(owner);
        index
    }

    // --- sorted lookup ------------------------------------------------------

    /// Indices of methods named `selector`, via binary search over the
    /// selector-sorted order (built on first use, gated by the sorted flag).
    pub fn methods_named(
        &mut self,
        id: TypeId,
        selector: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<usize> {
        self.resolve_methods(id, sink);
        let binding = &mut self.types[id.index()];
        if binding.state & state::METHODS_SORTED == 0
            || binding.method_order.len() != binding.methods.len()
        {
            let mut order: Vec<usize> = (0..binding.methods.len()).collect();
            order.sort_by(|&a, &b| binding.methods[a].selector.cmp(&binding.methods[b].selector));
            binding.method_order = order;
            binding.state |= state::METHODS_SORTED;
        }
        let order = &binding.method_order;
        let methods = &binding.methods;
        let first = order.partition_point(|&i| methods[i].selector.as_str() < selector);
        let mut out = Vec::new();
        for &index in &order[first..] {
            if methods[index].selector != selector {
                break;
            }
            out.push(index);
        }
        out
    }

    // --- sealed constraints -------------------------------------------------

    /// Sealed/permits invariants, checked once per type.
    pub fn check_sealed_constraints(&mut self, id: TypeId, sink: &mut dyn DiagnosticSink) {
        if self.types[id.index()].state & state::SEALED_CHECKED != 0 {
            return;
        }
        self.types[id.index()].state |= state::SEALED_CHECKED;
        sealed::check(&*self, id, sink);
    }

    // --- prototypes / annotated variants ------------------------------------

    /// Create an annotated-type variant of `prototype`: a separate binding
    /// registered so that every later mutation of the prototype's member
    /// tables is copied over before the mutating call returns.
    pub fn annotated_variant(&mut self, prototype: TypeId) -> TypeId {
        let prototype = self
            .prototypes
            .prototype_of(prototype)
            .unwrap_or(prototype);
        let mut clone = self.types[prototype.index()].clone();
        let id = TypeId(self.types.len() as u32);
        clone.flags.insert(BindingFlags::ANNOTATED_VARIANT);
        self.types.push(clone);
        self.prototypes.register(prototype, id);
        id
    }

    /// Synchronous fan-out: copy the prototype's member tables and state to
    /// every registered variant. Called after every member-table mutation.
    fn broadcast_members(&mut self, id: TypeId) {
        let prototype = self.prototypes.prototype_of(id).unwrap_or(id);
        let variant_ids: Vec<TypeId> = self.prototypes.variants_of(prototype).to_vec();
        if variant_ids.is_empty() {
            return;
        }
        let fields = self.types[prototype.index()].fields.clone();
        let methods = self.types[prototype.index()].methods.clone();
        let components = self.types[prototype.index()].components.clone();
        let state = self.types[prototype.index()].state;
        for variant in variant_ids {
            let target = &mut self.types[variant.index()];
            target.fields = fields.clone();
            target.methods = methods.clone();
            target.components = components.clone();
            target.state = state;
            target.method_order.clear();
            target.state &= !state::METHODS_SORTED;
        }
    }
}
