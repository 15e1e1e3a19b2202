//! Sealed-hierarchy invariants.
//!
//! A type naming permitted subtypes must itself be sealed; a `non-sealed`
//! type must have a sealed direct supertype; and every permitted type must
//! directly extend/implement the sealed type and live in the same module (or
//! the same package, in the unnamed module). Each direction violates with
//! its own diagnostic; none of them aborts resolution of siblings.

use quasar_core::{Diagnostic, DiagnosticKind, DiagnosticSink};

use crate::table::BindingTable;
use crate::types::{TypeId, TypeKind};

pub(crate) fn check(table: &BindingTable, id: TypeId, sink: &mut dyn DiagnosticSink) {
    let binding = table.get(id);

    if !binding.sig.permits.is_empty() && !binding.flags.is_sealed() {
        sink.report(
            Diagnostic::new(DiagnosticKind::PermitsOnNonSealedType, binding.name_span)
                .with_arg(&binding.name),
        );
    }

    if binding.flags.is_non_sealed() && !has_sealed_direct_supertype(table, id) {
        sink.report(
            Diagnostic::new(
                DiagnosticKind::NonSealedWithoutSealedSupertype,
                binding.name_span,
            )
            .with_arg(&binding.name),
        );
    }

    for permitted_ref in &binding.sig.permits {
        let Some(permitted_id) = table.lookup(permitted_ref.base_name()) else {
            // The permitted type is not declared in this unit; nothing to
            // validate against.
            continue;
        };
        let permitted = table.get(permitted_id);

        if !directly_subtypes(table, permitted_id, id) {
            let kind = if permitted.kind == TypeKind::Interface {
                DiagnosticKind::PermittedInterfaceNotDirectSuperinterface
            } else {
                DiagnosticKind::PermittedClassNotDirectSubclass
            };
            sink.report(
                Diagnostic::new(kind, permitted_ref.span)
                    .with_args([permitted.name.as_str(), binding.name.as_str()]),
            );
        }

        match (&binding.module, &permitted.module) {
            (Some(a), Some(b)) if a != b => {
                sink.report(
                    Diagnostic::new(
                        DiagnosticKind::PermittedTypeInDifferentModule,
                        permitted_ref.span,
                    )
                    .with_args([permitted.name.as_str(), binding.name.as_str()]),
                );
            }
            (None, None) if binding.package != permitted.package => {
                sink.report(
                    Diagnostic::new(
                        DiagnosticKind::PermittedTypeInDifferentPackage,
                        permitted_ref.span,
                    )
                    .with_args([permitted.name.as_str(), binding.name.as_str()]),
                );
            }
            _ => {}
        }
    }
}

/// Does `sub` name `superty` in its direct `extends`/`implements` clauses?
fn directly_subtypes(table: &BindingTable, sub: TypeId, superty: TypeId) -> bool {
    let sub_binding = table.get(sub);
    let super_name = &table.get(superty).name;
    sub_binding
        .sig
        .extends
        .iter()
        .chain(sub_binding.sig.implements.iter())
        .any(|r| {
            let base = r.base_name();
            base == super_name || base.rsplit('.').next() == Some(super_name)
        })
}

fn has_sealed_direct_supertype(table: &BindingTable, id: TypeId) -> bool {
    let binding = table.get(id);
    binding
        .sig
        .extends
        .iter()
        .chain(binding.sig.implements.iter())
        .filter_map(|r| table.lookup(r.base_name()))
        .any(|super_id| table.get(super_id).flags.is_sealed())
}
