//! Completion ("assist") layer.
//!
//! Given a source buffer and a cursor offset, computes the specialized
//! assist node for that exact program point: member access after a dot,
//! allocation after `new`, catch-type position, javadoc tag/param/reference
//! positions, and the rest of the closed node set in [`AssistNode`]. A
//! cursor that lands inside a string, comment, unicode escape or numeric
//! literal is a distinguished [`InvalidCursorLocation`] instead.
//!
//! The layer sits on top of the scanner/parser the way an IDE front-end
//! does: token-stream classification first, the parsed tree for enclosing
//! context, bindings only when the caller asks for a full
//! [`ResolutionOutcome`].

mod cursor;
mod engine;
mod nodes;
mod outcome;

pub use cursor::InvalidCursorLocation;
pub use engine::{complete, AssistContext, Completion};
pub use nodes::AssistNode;
pub use outcome::{resolve_at, ResolutionOutcome};

#[cfg(test)]
mod tests;
