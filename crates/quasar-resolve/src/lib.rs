//! Binding and resolution layer.
//!
//! `bind_unit` runs the build-scope pass over a parsed compilation unit,
//! creating one [`TypeBinding`] per declared type. Member tables resolve
//! lazily on first access (`fields()`, `methods()`, `components()`), with
//! monotonic per-facet state flags, reentrancy tolerance, and the duplicate,
//! record, sealed-hierarchy and synthetic-member policies applied during
//! resolution. Diagnostics flow through the caller's sink; a bad member is
//! dropped or downgraded, never fatal for its siblings.

mod duplicates;
mod flags;
mod prototypes;
mod sealed;
mod signatures;
mod synthetic;
mod table;
mod types;

pub use duplicates::DuplicateVerdict;
pub use flags::{annotation_tag_bits, tag_bits, BindingFlags};
pub use signatures::{ComponentSig, FieldSig, MethodSig, TypeRefSig, TypeSig};
pub use synthetic::{SyntheticFactory, SyntheticKind, SyntheticSlot};
pub use table::{bind_unit, BindingTable, TypeBinding};
pub use types::{
    FieldBinding, MethodBinding, RecordComponentBinding, ResolvedType, TypeId, TypeKind,
};

#[cfg(test)]
mod tests;
