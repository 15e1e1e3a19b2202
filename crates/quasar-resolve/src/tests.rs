use pretty_assertions::assert_eq;

use quasar_core::{CompilerOptions, DiagnosticBag, DiagnosticKind, JavaLanguageLevel, Severity};
use quasar_parser::parse_java;

use crate::{bind_unit, BindingFlags, BindingTable, ResolvedType, SyntheticKind, TypeKind};

fn bind(source: &str) -> (BindingTable, DiagnosticBag) {
    bind_at(source, JavaLanguageLevel::JAVA_21)
}

fn bind_at(source: &str, level: JavaLanguageLevel) -> (BindingTable, DiagnosticBag) {
    let options = CompilerOptions::at_level(level);
    let parsed = parse_java(source, options.clone());
    let mut bag = DiagnosticBag::new();
    let table = bind_unit(&parsed.unit, options, &mut bag);
    (table, bag)
}

#[test]
fn build_scope_registers_nested_types() {
    let (table, bag) = bind(
        "package p;\nclass Outer { class Inner {} static class Nested {} }",
    );
    assert!(bag.is_empty());
    assert_eq!(table.len(), 3);
    let outer = table.lookup("p.Outer").unwrap();
    let inner = table.lookup("p.Outer.Inner").unwrap();
    assert_eq!(table.get(inner).enclosing, Some(outer));
    assert_eq!(table.get(outer).kind, TypeKind::Class);
}

#[test]
fn fields_resolve_lazily_and_idempotently() {
    let (mut table, _) = bind("class A { int x; String s; }");
    let id = table.lookup("A").unwrap();
    assert!(!table.get(id).fields_complete());

    let mut bag = DiagnosticBag::new();
    let first: Vec<String> = table
        .fields(id, &mut bag)
        .iter()
        .map(|f| f.name.clone())
        .collect();
    assert_eq!(first, vec!["x", "s"]);
    assert!(table.get(id).fields_complete());

    // Second call must not re-resolve (and must not re-report anything).
    let again: Vec<String> = table
        .fields(id, &mut bag)
        .iter()
        .map(|f| f.name.clone())
        .collect();
    assert_eq!(again, first);
    assert!(bag.is_empty());
}

#[test]
fn void_field_is_dropped_with_diagnostic() {
    let (mut table, _) = bind("class A { void broken; int ok; }");
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let names: Vec<&str> = table
        .fields(id, &mut bag)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["ok"]);
    assert_eq!(bag.diagnostics()[0].kind, DiagnosticKind::VoidFieldType);
}

#[test]
fn unresolvable_member_type_is_removed_not_nulled() {
    let (mut table, _) = bind("class A { Unknowable x; int ok; int bad(Bogus b) { return 0; } }");
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let field_names: Vec<&str> = table
        .fields(id, &mut bag)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(field_names, vec!["ok"]);
    let method_names: Vec<&str> = table
        .methods(id, &mut bag)
        .iter()
        .map(|m| m.selector.as_str())
        .collect();
    assert!(!method_names.contains(&"bad"));
    assert!(bag
        .diagnostics()
        .iter()
        .all(|d| d.kind == DiagnosticKind::IllegalMemberType));
}

#[test]
fn duplicate_method_keeps_first_and_reports_once() {
    let (mut table, _) = bind("class A { void m(int a) {} void m(int b) {} }");
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let methods = table.methods(id, &mut bag);
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].selector, "m");
    let duplicates: Vec<_> = bag
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DuplicateMethod)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].severity, Severity::Error);
}

#[test]
fn compliance_1_6_erasure_collision_is_a_warning_and_keeps_both() {
    let (mut table, _) = bind_at(
        "class A { String m(List<String> x) { return null; } Integer m(List<Integer> x) { return null; } }",
        JavaLanguageLevel::JAVA_6,
    );
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let methods = table.methods(id, &mut bag);
    assert_eq!(methods.iter().filter(|m| m.selector == "m").count(), 2);
    let warning = bag
        .diagnostics()
        .iter()
        .find(|d| d.kind == DiagnosticKind::DuplicateMethodErasure)
        .expect("erasure warning");
    assert_eq!(warning.severity, Severity::Warning);
}

#[test]
fn record_members_are_synthesized_unless_user_declared() {
    let (mut table, _) = bind(
        "record Pair(int left, int right) { public int left() { return left; } }",
    );
    let id = table.lookup("Pair").unwrap();
    let mut bag = DiagnosticBag::new();
    let components: Vec<&str> = table
        .components(id, &mut bag)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(components, vec!["left", "right"]);

    let methods = table.methods(id, &mut bag).to_vec();
    // User-declared `left()` wins; no synthetic accessor for it.
    let lefts: Vec<_> = methods.iter().filter(|m| m.selector == "left").collect();
    assert_eq!(lefts.len(), 1);
    assert!(lefts[0].synthetic.is_none());
    // `right()` accessor is synthesized.
    let right = methods.iter().find(|m| m.selector == "right").unwrap();
    assert_eq!(right.synthetic, Some(SyntheticKind::RecordAccessor));
    // Canonical constructor and the Object trio exist.
    assert!(methods.iter().any(|m| m.is_constructor()
        && m.synthetic == Some(SyntheticKind::RecordCanonicalConstructor)));
    for selector in ["toString", "hashCode", "equals"] {
        assert!(
            methods.iter().any(|m| m.selector == selector),
            "missing {selector}"
        );
    }
}

#[test]
fn user_equals_with_wrong_signature_does_not_suppress_synthetic() {
    let (mut table, _) = bind(
        "record Pair(int left, int right) { public boolean equals(Pair other) { return false; } }",
    );
    let id = table.lookup("Pair").unwrap();
    let mut bag = DiagnosticBag::new();
    let methods = table.methods(id, &mut bag).to_vec();
    let equals: Vec<_> = methods.iter().filter(|m| m.selector == "equals").collect();
    assert_eq!(equals.len(), 2);
    assert!(equals.iter().any(|m| m.synthetic.is_none()));
    assert!(equals
        .iter()
        .any(|m| m.synthetic == Some(SyntheticKind::RecordObjectMethod)));
}

#[test]
fn enum_values_and_value_of_are_synthesized_once() {
    let (mut table, _) = bind("enum Color { RED, GREEN }");
    let id = table.lookup("Color").unwrap();
    let mut bag = DiagnosticBag::new();

    let constants: Vec<&str> = table
        .fields(id, &mut bag)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(constants, vec!["RED", "GREEN"]);

    let methods = table.methods(id, &mut bag).to_vec();
    let values = methods.iter().find(|m| m.selector == "values").unwrap();
    assert_eq!(values.synthetic, Some(SyntheticKind::EnumValues));
    assert!(matches!(values.return_ty, ResolvedType::Array { .. }));
    assert!(methods.iter().any(|m| m.selector == "valueOf"));

    // Asking again must not create a second values().
    let methods_again = table.methods(id, &mut bag).to_vec();
    assert_eq!(
        methods_again.iter().filter(|m| m.selector == "values").count(),
        1
    );
}

#[test]
fn user_declared_values_suppresses_the_synthetic() {
    let (mut table, _) = bind("enum Color { RED; public Color[] values() { return null; } }");
    let id = table.lookup("Color").unwrap();
    let mut bag = DiagnosticBag::new();
    let methods = table.methods(id, &mut bag);
    let values: Vec<_> = methods.iter().filter(|m| m.selector == "values").collect();
    assert_eq!(values.len(), 1);
    assert!(values[0].synthetic.is_none());
}

#[test]
fn inner_class_gets_outer_this_field() {
    let (mut table, _) = bind("class Outer { class Inner { int x; } }");
    let inner = table.lookup("Outer.Inner").unwrap();
    let mut bag = DiagnosticBag::new();
    let fields = table.fields(inner, &mut bag);
    let outer_this = fields.iter().find(|f| f.name == "this$0").unwrap();
    assert!(outer_this.flags.is_synthetic());
    assert!(matches!(outer_this.ty, ResolvedType::Reference(_)));
}

#[test]
fn cyclic_hierarchy_resolves_without_recursing_forever() {
    let (mut table, _) = bind("class A extends B { void a() {} }\nclass B extends A { void b() {} }");
    let a = table.lookup("A").unwrap();
    let b = table.lookup("B").unwrap();
    let mut bag = DiagnosticBag::new();
    // The reentrant call sees the partial (possibly empty) table and returns;
    // both types still complete.
    assert!(table.methods(a, &mut bag).iter().any(|m| m.selector == "a"));
    assert!(table.methods(b, &mut bag).iter().any(|m| m.selector == "b"));
    assert!(table.get(a).methods_complete());
    assert!(table.get(b).methods_complete());
}

#[test]
fn sealed_permits_requires_direct_subtype() {
    let (mut table, _) = bind(
        "sealed interface S permits A, B {}\nfinal class A implements S {}\nfinal class B {}",
    );
    let s = table.lookup("S").unwrap();
    let mut bag = DiagnosticBag::new();
    table.check_sealed_constraints(s, &mut bag);
    let kinds: Vec<DiagnosticKind> = bag.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::PermittedClassNotDirectSubclass]
    );
}

#[test]
fn permits_on_non_sealed_type_reports() {
    let (mut table, _) = bind("interface S permits A {}\nfinal class A implements S {}");
    let s = table.lookup("S").unwrap();
    let mut bag = DiagnosticBag::new();
    table.check_sealed_constraints(s, &mut bag);
    assert!(bag
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::PermitsOnNonSealedType));
}

#[test]
fn non_sealed_requires_sealed_supertype() {
    let (mut table, _) = bind("non-sealed class A {}");
    let a = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    table.check_sealed_constraints(a, &mut bag);
    assert!(bag
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::NonSealedWithoutSealedSupertype));

    let (mut table, _) = bind(
        "sealed class S permits A {}\nnon-sealed class A extends S {}",
    );
    let a = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    table.check_sealed_constraints(a, &mut bag);
    assert!(bag.is_empty());
}

#[test]
fn permitted_type_in_a_different_package_reports() {
    let options = CompilerOptions::at_level(JavaLanguageLevel::JAVA_21);
    let first = parse_java("package a;\nsealed interface S permits A {}", options.clone());
    let second = parse_java(
        "package b;\npublic final class A implements S {}",
        options.clone(),
    );
    let mut bag = DiagnosticBag::new();
    let mut table = bind_unit(&first.unit, options, &mut bag);
    table.add_unit(&second.unit, &mut bag);

    let s = table.lookup("a.S").unwrap();
    table.check_sealed_constraints(s, &mut bag);
    assert!(bag
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::PermittedTypeInDifferentPackage));
    // The direct-subtype relation itself holds, so only the package check
    // fires.
    assert!(!bag
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::PermittedClassNotDirectSubclass));
}

#[test]
fn sealed_checks_run_once() {
    let (mut table, _) = bind("interface S permits A {}\nfinal class A implements S {}");
    let s = table.lookup("S").unwrap();
    let mut bag = DiagnosticBag::new();
    table.check_sealed_constraints(s, &mut bag);
    table.check_sealed_constraints(s, &mut bag);
    let count = bag
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::PermitsOnNonSealedType)
        .count();
    assert_eq!(count, 1);
}

#[test]
fn methods_named_uses_the_sorted_table() {
    let (mut table, _) = bind(
        "class A { void z() {} void a() {} void a(int x) {} void q() {} }",
    );
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let hits = table.methods_named(id, "a", &mut bag);
    assert_eq!(hits.len(), 2);
    assert!(table.get(id).methods_sorted());
    assert!(table.methods_named(id, "nope", &mut bag).is_empty());
}

#[test]
fn heap_pollution_varargs_warns() {
    let (mut table, _) = bind("class A { void m(List<String>... items) {} }");
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    table.methods(id, &mut bag);
    let warning = bag
        .diagnostics()
        .iter()
        .find(|d| d.kind == DiagnosticKind::HeapPollutionVarargs)
        .expect("heap pollution warning");
    assert_eq!(warning.severity, Severity::Warning);
}

#[test]
fn annotation_tag_bits_and_store_annotations_gate() {
    let (mut table, _) = bind("class A { @Override @NonNull String name() { return null; } }");
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let method = table.methods(id, &mut bag)[0].clone();
    assert!(method.tag_bits & crate::tag_bits::OVERRIDE != 0);
    assert!(method.tag_bits & crate::tag_bits::NON_NULL != 0);
    // Raw annotation names are only retained when asked for.
    assert!(method.annotations.is_empty());

    let options = CompilerOptions {
        store_annotations: true,
        ..CompilerOptions::at_level(JavaLanguageLevel::JAVA_21)
    };
    let parsed = parse_java(
        "class A { @Override @NonNull String name() { return null; } }",
        options.clone(),
    );
    let mut bag = DiagnosticBag::new();
    let mut table = bind_unit(&parsed.unit, options, &mut bag);
    let id = table.lookup("A").unwrap();
    let method = table.methods(id, &mut bag)[0].clone();
    assert_eq!(method.annotations, vec!["Override", "NonNull"]);
}

#[test]
fn null_annotation_on_primitive_reports_when_analysis_enabled() {
    let source = "class A { @Nullable int count() { return 0; } }";
    let options = CompilerOptions {
        annotation_based_null_analysis: true,
        ..CompilerOptions::at_level(JavaLanguageLevel::JAVA_21)
    };
    let parsed = parse_java(source, options.clone());
    let mut bag = DiagnosticBag::new();
    let mut table = bind_unit(&parsed.unit, options, &mut bag);
    let id = table.lookup("A").unwrap();
    table.methods(id, &mut bag);
    assert!(bag
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::IllegalNullAnnotation));

    // Disabled analysis stays silent.
    let (mut table, _) = bind(source);
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    table.methods(id, &mut bag);
    assert!(bag.is_empty());
}

#[test]
fn deprecated_javadoc_sets_the_flag() {
    let (mut table, _) = bind(
        "class A { /** @deprecated use other */ int old() { return 0; } }",
    );
    let id = table.lookup("A").unwrap();
    let mut bag = DiagnosticBag::new();
    let old = table
        .methods(id, &mut bag)
        .iter()
        .find(|m| m.selector == "old")
        .cloned()
        .unwrap();
    assert!(old.flags.is_deprecated());
}

#[test]
fn prototype_mutation_fans_out_to_variants_synchronously() {
    let (mut table, _) = bind("enum Color { RED }");
    let proto = table.lookup("Color").unwrap();
    let variant = table.annotated_variant(proto);
    assert!(table.get(variant).flags.contains(BindingFlags::ANNOTATED_VARIANT));

    // Variant created before resolution: resolving the prototype must update
    // the variant before the call returns.
    let mut bag = DiagnosticBag::new();
    table.methods(proto, &mut bag);
    let variant_methods: Vec<&str> = table
        .get(variant)
        .methods()
        .iter()
        .map(|m| m.selector.as_str())
        .collect();
    assert!(variant_methods.contains(&"values"));

    // A later synthetic on the prototype also propagates.
    table.lambda_deserialize_placeholder(proto);
    assert!(table
        .get(variant)
        .methods()
        .iter()
        .any(|m| m.selector == "$deserializeLambda$"));
}

#[test]
fn switch_table_and_bridge_factories_are_memoized() {
    let (mut table, _) = bind("class A {}\nenum E { X }");
    let a = table.lookup("A").unwrap();
    let e = table.lookup("E").unwrap();
    let first = table.switch_table_field(a, e);
    let second = table.switch_table_field(a, e);
    assert_eq!(first, second);

    let bridge_a = table.bridge_method(a, "run", "Object", ResolvedType::Void, vec![]);
    let bridge_b = table.bridge_method(a, "run", "Object", ResolvedType::Void, vec![]);
    assert_eq!(bridge_a, bridge_b);
    let bridges = table
        .get(a)
        .methods()
        .iter()
        .filter(|m| m.synthetic == Some(SyntheticKind::BridgeMethod))
        .count();
    assert_eq!(bridges, 1);
}

#[test]
fn duplicate_type_keeps_first() {
    let (table, bag) = bind("class A { int x; }\nclass A { int y; }");
    assert_eq!(table.len(), 1);
    assert!(bag
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::DuplicateType));
}
