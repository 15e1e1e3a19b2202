use quasar_core::{CompilerOptions, Diagnostic, DiagnosticBag, DiagnosticKind, Span};
use quasar_parser::parse_java;
use quasar_resolve::{bind_unit, BindingTable};

use crate::cursor::InvalidCursorLocation;
use crate::engine::{complete, Completion};

/// Outcome of a resolution pass that may carry an assist request.
///
/// Reaching the completion node terminates the pass early and is not a
/// failure; the outcome makes that control transfer explicit in the return
/// type rather than hiding it in an unwinding path.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// No cursor, or the cursor produced nothing: the unit's bindings.
    Resolved(Box<BindingTable>),
    /// The assist position was reached; resolution stopped there.
    CompletionFound(Box<Completion>),
    /// The cursor cannot host a completion (inside a literal, comment, or
    /// escape).
    InvalidCursor(InvalidCursorLocation),
    /// The unit was unusable: nothing bound, first error attached.
    Failed(Diagnostic),
}

/// Resolve a unit, biased toward `offset` when one is given.
///
/// With a cursor, the pass short-circuits into `CompletionFound` (or
/// `InvalidCursor`); without one it builds the full binding scope and
/// resolves every type's members.
pub fn resolve_at(
    source: &str,
    options: &CompilerOptions,
    offset: Option<usize>,
) -> ResolutionOutcome {
    if let Some(offset) = offset {
        return match complete(source, options, offset) {
            Ok(completion) => ResolutionOutcome::CompletionFound(Box::new(completion)),
            Err(invalid) => ResolutionOutcome::InvalidCursor(invalid),
        };
    }

    let parsed = parse_java(source, options.clone());
    let mut bag = DiagnosticBag::new();
    let mut table = bind_unit(&parsed.unit, options.clone(), &mut bag);
    if table.is_empty() {
        let diagnostic = parsed
            .diagnostics
            .into_iter()
            .next()
            .unwrap_or_else(|| Diagnostic::new(DiagnosticKind::SyntaxError, Span::at(0)));
        return ResolutionOutcome::Failed(diagnostic);
    }
    let ids: Vec<_> = table.ids().collect();
    for id in ids {
        table.fields(id, &mut bag);
        table.methods(id, &mut bag);
        table.components(id, &mut bag);
        table.check_sealed_constraints(id, &mut bag);
    }
    ResolutionOutcome::Resolved(Box::new(table))
}
