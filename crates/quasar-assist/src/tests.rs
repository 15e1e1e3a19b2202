use pretty_assertions::assert_eq;

use quasar_core::CompilerOptions;

use crate::{complete, resolve_at, AssistNode, InvalidCursorLocation, ResolutionOutcome};

/// Build the source by replacing `$0` with nothing and returning its offset.
fn fixture(template: &str) -> (String, usize) {
    let offset = template.find("$0").expect("fixture needs a $0 marker");
    let mut source = String::with_capacity(template.len());
    source.push_str(&template[..offset]);
    source.push_str(&template[offset + 2..]);
    (source, offset)
}

fn complete_at(template: &str) -> Result<crate::Completion, InvalidCursorLocation> {
    let (source, offset) = fixture(template);
    complete(&source, &CompilerOptions::default(), offset)
}

#[test]
fn cursor_inside_number_is_not_a_completion() {
    let err = complete_at("class A { int x = 12$03; }").unwrap_err();
    assert_eq!(err, InvalidCursorLocation::InsideNumber);
}

#[test]
fn cursor_inside_string_comment_and_escape() {
    assert_eq!(
        complete_at("class A { String s = \"ab$0c\"; }").unwrap_err(),
        InvalidCursorLocation::InsideString
    );
    assert_eq!(
        complete_at("class A { /* com$0ment */ }").unwrap_err(),
        InvalidCursorLocation::InsideComment
    );
    assert_eq!(
        complete_at("class A { int \\u00$061; }").unwrap_err(),
        InvalidCursorLocation::InsideUnicode
    );
}

#[test]
fn member_access_after_dot() {
    let completion = complete_at("class A { void m() { foo.ba$0 } }").unwrap();
    let AssistNode::OnMemberAccess { receiver, partial, .. } = &completion.node else {
        panic!("expected member access, got {:?}", completion.node);
    };
    assert_eq!(receiver, "foo");
    assert_eq!(partial, "ba");
    assert!(completion.context.after_dot);
    assert_eq!(completion.context.enclosing_type.as_deref(), Some("A"));
    assert_eq!(completion.context.enclosing_method.as_deref(), Some("m"));
}

#[test]
fn empty_member_access_sets_empty_identifier_flag() {
    let completion = complete_at("class A { void m() { foo.$0 } }").unwrap();
    assert!(matches!(completion.node, AssistNode::OnMemberAccess { .. }));
    assert!(completion.context.empty_completion_identifier);
}

#[test]
fn allocation_before_bracket() {
    let completion = complete_at("class A { void m() { Object o = new Has$0 } }").unwrap();
    let AssistNode::OnAllocation { partial, .. } = &completion.node else {
        panic!("expected allocation, got {:?}", completion.node);
    };
    assert_eq!(partial, "Has");
    assert!(completion.context.between_new_and_left_bracket);
}

#[test]
fn allocation_argument_still_recognized_after_paren() {
    // `new Foo(<cursor>`: the paren reset the "between new and bracket"
    // flag, but the allocation is still the completion target.
    let completion = complete_at("class A { void m() { Object o = new Foo($0 } }").unwrap();
    let AssistNode::OnAllocationArgument { type_name, args_so_far, .. } = &completion.node
    else {
        panic!("expected allocation argument, got {:?}", completion.node);
    };
    assert_eq!(type_name, "Foo");
    assert!(args_so_far.is_empty());
    assert!(!completion.context.between_new_and_left_bracket);
}

#[test]
fn finished_allocation_does_not_leak_the_new_flag() {
    let completion = complete_at("class A { void m() { new Foo().ba$0 } }").unwrap();
    assert!(matches!(completion.node, AssistNode::OnMemberAccess { .. }));
    assert!(!completion.context.between_new_and_left_bracket);
}

#[test]
fn catch_type_position() {
    let completion =
        complete_at("class A { void m() { try { } catch (IOEx$0) { } } }").unwrap();
    let AssistNode::OnCatchType { partial, .. } = &completion.node else {
        panic!("expected catch type, got {:?}", completion.node);
    };
    assert_eq!(partial, "IOEx");
    assert!(completion.context.between_catch_and_right_paren);
}

#[test]
fn primitive_array_class_literal_vs_identifier_array() {
    let completion = complete_at("class A { Object o = int[].$0; }").unwrap();
    let AssistNode::OnClassLiteral { type_name, primitive, dimensions, .. } = &completion.node
    else {
        panic!("expected class literal, got {:?}", completion.node);
    };
    assert_eq!(type_name, "int");
    assert!(primitive);
    assert_eq!(*dimensions, 1);

    let completion = complete_at("class A { Object o = String[].$0; }").unwrap();
    let AssistNode::OnClassLiteral { type_name, primitive, .. } = &completion.node else {
        panic!("expected class literal, got {:?}", completion.node);
    };
    assert_eq!(type_name, "String");
    assert!(!primitive);
}

#[test]
fn explicit_constructor_call() {
    let completion = complete_at("class A { A() { super($0 } }").unwrap();
    let AssistNode::OnExplicitConstructorCall { is_super, .. } = completion.node else {
        panic!("expected explicit constructor call");
    };
    assert!(is_super);
}

#[test]
fn message_send_arguments_are_collected() {
    let completion = complete_at("class A { void m() { handle(first, se$0 } }").unwrap();
    match &completion.node {
        AssistNode::OnName { partial, .. } => {
            // Typing an argument name: plain name completion with the prefix.
            assert_eq!(partial, "se");
        }
        other => panic!("expected name completion, got {other:?}"),
    }

    let completion = complete_at("class A { void m() { handle(first, $0 } }").unwrap();
    let AssistNode::OnArgument { selector, args_so_far, .. } = &completion.node else {
        panic!("expected argument completion, got {:?}", completion.node);
    };
    assert_eq!(selector, "handle");
    assert_eq!(args_so_far, &vec!["first".to_string()]);
}

#[test]
fn selector_before_existing_arguments_is_a_message_send() {
    let completion = complete_at("class A { void m() { foo.ba$0(x, y); } }").unwrap();
    let AssistNode::OnMessageSend { receiver, selector, args_so_far, .. } = &completion.node
    else {
        panic!("expected message send, got {:?}", completion.node);
    };
    assert_eq!(receiver.as_deref(), Some("foo"));
    assert_eq!(selector, "ba");
    assert_eq!(args_so_far, &vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn parameter_name_position_in_a_declaration_header() {
    let completion = complete_at("class A { void m(String $0) { } }").unwrap();
    let AssistNode::OnParameterName { type_name, .. } = &completion.node else {
        panic!("expected parameter name, got {:?}", completion.node);
    };
    assert_eq!(type_name, "String");
}

#[test]
fn bare_name_at_member_level_is_a_field_type() {
    let completion = complete_at("class A { Str$0 }").unwrap();
    let AssistNode::OnFieldType { partial, .. } = &completion.node else {
        panic!("expected field type, got {:?}", completion.node);
    };
    assert_eq!(partial, "Str");
}

#[test]
fn import_and_package_completion() {
    let completion = complete_at("import java.ut$0").unwrap();
    let AssistNode::OnImport { prefix, is_static, .. } = &completion.node else {
        panic!("expected import completion, got {:?}", completion.node);
    };
    assert_eq!(prefix, "java");
    assert!(!is_static);

    let completion = complete_at("package com.exa$0").unwrap();
    assert!(matches!(completion.node, AssistNode::OnPackage { .. }));
}

#[test]
fn annotation_name_completion() {
    let completion = complete_at("class A { @Over$0 void m() { } }").unwrap();
    let AssistNode::OnAnnotationName { partial, .. } = &completion.node else {
        panic!("expected annotation name, got {:?}", completion.node);
    };
    assert_eq!(partial, "Over");
}

#[test]
fn type_reference_after_extends() {
    let completion = complete_at("class A extends Ba$0 { }").unwrap();
    assert!(matches!(completion.node, AssistNode::OnTypeReference { .. }));
}

#[test]
fn javadoc_tag_completion_offers_level_gated_tags_on_bare_at() {
    let completion = complete_at("/** @$0 */ class A { }").unwrap();
    let AssistNode::OnJavadocTagName { partial, candidates, .. } = &completion.node else {
        panic!("expected javadoc tag completion, got {:?}", completion.node);
    };
    assert_eq!(partial, "");
    assert!(candidates.contains(&"@param"));
    assert!(candidates.contains(&"@value"));
    assert!(completion.context.in_javadoc);
}

#[test]
fn javadoc_tag_completion_below_1_5_omits_value() {
    let (source, offset) = fixture("/** @$0 */ class A { }");
    let options = CompilerOptions::at_level(quasar_core::JavaLanguageLevel::JAVA_1_4);
    let completion = complete(&source, &options, offset).unwrap();
    let AssistNode::OnJavadocTagName { candidates, .. } = &completion.node else {
        panic!("expected javadoc tag completion");
    };
    assert!(!candidates.contains(&"@value"));
}

#[test]
fn javadoc_param_and_reference_completion() {
    let completion = complete_at("/** @param co$0 */ class A { }").unwrap();
    let AssistNode::OnJavadocParamName { partial, .. } = &completion.node else {
        panic!("expected javadoc param completion, got {:?}", completion.node);
    };
    assert_eq!(partial, "co");

    let completion = complete_at("/** {@link Str$0} */ class A { }").unwrap();
    let AssistNode::OnJavadocReference { partial, .. } = &completion.node else {
        panic!("expected javadoc reference completion, got {:?}", completion.node);
    };
    assert_eq!(partial, "Str");
}

#[test]
fn resolve_at_reports_completion_as_an_outcome_not_an_error() {
    let (source, offset) = fixture("class A { void m() { foo.$0 } }");
    match resolve_at(&source, &CompilerOptions::default(), Some(offset)) {
        ResolutionOutcome::CompletionFound(completion) => {
            assert!(matches!(completion.node, AssistNode::OnMemberAccess { .. }));
        }
        other => panic!("expected CompletionFound, got {other:?}"),
    }

    let (source, offset) = fixture("class A { int x = 4$02; }");
    match resolve_at(&source, &CompilerOptions::default(), Some(offset)) {
        ResolutionOutcome::InvalidCursor(InvalidCursorLocation::InsideNumber) => {}
        other => panic!("expected InvalidCursor, got {other:?}"),
    }
}

#[test]
fn resolve_at_without_cursor_resolves_bindings() {
    match resolve_at(
        "class A { int x; void m() { } }",
        &CompilerOptions::default(),
        None,
    ) {
        ResolutionOutcome::Resolved(table) => {
            let id = table.lookup("A").unwrap();
            assert!(table.get(id).fields_complete());
            assert!(table.get(id).methods_complete());
        }
        other => panic!("expected Resolved, got {other:?}"),
    }
}
