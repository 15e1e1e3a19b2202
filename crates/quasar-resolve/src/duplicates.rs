//! Duplicate-method policy.
//!
//! Two methods with the same selector are duplicates when their parameter
//! erasures are equal. At compliance level 1.6 exactly, a pair whose
//! return-type erasures also differ is downgraded from error to warning,
//! unless one method's parameter erasure is literally identical to the
//! other's parameter list as spelled in source (not merely
//! erasure-compatible). The rule is preserved as-is; its edge cases are
//! load-bearing for existing behavior.

use quasar_core::JavaLanguageLevel;

use crate::signatures::MethodSig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateVerdict {
    NotDuplicate,
    /// Plain duplicate: the first declaration is retained, the second
    /// reported as an error.
    Error,
    /// The 1.6 return-type-erasure case: retained, reported as a warning.
    ErasureWarning,
}

pub(crate) fn check_duplicate(
    compliance: JavaLanguageLevel,
    first: &MethodSig,
    second: &MethodSig,
) -> DuplicateVerdict {
    if first.selector != second.selector {
        return DuplicateVerdict::NotDuplicate;
    }
    let first_erasure = first.param_erasure();
    let second_erasure = second.param_erasure();
    if first_erasure != second_erasure {
        return DuplicateVerdict::NotDuplicate;
    }

    if compliance.major == 6 {
        let return_erasures_differ = first.return_ty.erasure != second.return_ty.erasure;
        let literally_identical = first_erasure == second.spelled_signature()
            || second_erasure == first.spelled_signature();
        if return_erasures_differ && !literally_identical {
            return DuplicateVerdict::ErasureWarning;
        }
    }

    DuplicateVerdict::Error
}

#[cfg(test)]
mod tests {
    use super::*;
    use quasar_core::Span;

    use crate::flags::BindingFlags;
    use crate::signatures::TypeRefSig;

    fn ty(spelled: &str, erasure: &str) -> TypeRefSig {
        TypeRefSig {
            spelled: spelled.to_string(),
            erasure: erasure.to_string(),
            dimensions: 0,
            has_type_args: spelled.contains('<'),
            span: Span::at(0),
        }
    }

    fn method(selector: &str, ret: TypeRefSig, params: Vec<TypeRefSig>) -> MethodSig {
        MethodSig {
            selector: selector.to_string(),
            name_span: Span::at(0),
            return_ty: ret,
            param_names: params.iter().map(|_| "p".to_string()).collect(),
            params,
            type_params: Vec::new(),
            flags: BindingFlags::default(),
            annotations: Vec::new(),
            is_constructor: false,
            span: Span::at(0),
        }
    }

    #[test]
    fn same_selector_same_erasure_is_error() {
        let a = method("m", ty("void", "void"), vec![ty("int", "int")]);
        let b = method("m", ty("void", "void"), vec![ty("int", "int")]);
        assert_eq!(
            check_duplicate(JavaLanguageLevel::JAVA_8, &a, &b),
            DuplicateVerdict::Error
        );
    }

    #[test]
    fn different_erasures_are_not_duplicates() {
        let a = method("m", ty("void", "void"), vec![ty("int", "int")]);
        let b = method("m", ty("void", "void"), vec![ty("long", "long")]);
        assert_eq!(
            check_duplicate(JavaLanguageLevel::JAVA_8, &a, &b),
            DuplicateVerdict::NotDuplicate
        );
    }

    #[test]
    fn compliance_1_6_downgrades_return_erasure_collision() {
        // Same parameter erasure via generics, different return erasures.
        let a = method(
            "m",
            ty("String", "String"),
            vec![ty("List<String>", "List")],
        );
        let b = method(
            "m",
            ty("Integer", "Integer"),
            vec![ty("List<Integer>", "List")],
        );
        assert_eq!(
            check_duplicate(JavaLanguageLevel::JAVA_6, &a, &b),
            DuplicateVerdict::ErasureWarning
        );
        // Outside 1.6 the same pair is a hard error.
        assert_eq!(
            check_duplicate(JavaLanguageLevel::JAVA_8, &a, &b),
            DuplicateVerdict::Error
        );
    }

    #[test]
    fn literal_spelling_match_keeps_the_error_at_1_6() {
        // One side spells exactly the raw erasure, so the downgrade does not
        // apply even though return erasures differ.
        let a = method("m", ty("String", "String"), vec![ty("List", "List")]);
        let b = method(
            "m",
            ty("Integer", "Integer"),
            vec![ty("List<Integer>", "List")],
        );
        assert_eq!(
            check_duplicate(JavaLanguageLevel::JAVA_6, &a, &b),
            DuplicateVerdict::Error
        );
    }
}
