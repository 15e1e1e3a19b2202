//! Compiler-generated members.
//!
//! Every factory first probes a per-purpose table keyed by the originating
//! binding and selector; a second request for the same logical synthetic
//! returns the cached index instead of minting another member.

use std::collections::HashMap;

use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticKind {
    /// Visibility/erasure bridge method.
    BridgeMethod,
    /// `this$N` outer-instance field of an inner class.
    OuterThisField,
    /// Enum `values()`.
    EnumValues,
    /// Enum `valueOf(String)`.
    EnumValueOf,
    /// `$SWITCH_TABLE$...` lookup field for switch-on-enum.
    SwitchTable,
    /// `$deserializeLambda$` placeholder.
    LambdaDeserialize,
    /// Record canonical constructor.
    RecordCanonicalConstructor,
    /// Record component accessor.
    RecordAccessor,
    /// Record `toString`/`hashCode`/`equals`.
    RecordObjectMethod,
}

/// Where a synthetic landed: index into the owner's field or method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticSlot {
    Field(usize),
    Method(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Purpose {
    owner: TypeId,
    kind: SyntheticKind,
    selector: String,
}

/// The per-purpose memo table shared by all synthetic factories.
#[derive(Debug, Default)]
pub struct SyntheticFactory {
    created: HashMap<Purpose, SyntheticSlot>,
}

impl SyntheticFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the synthetic for `(owner, kind, selector)`, or create it via
    /// `create` and remember the slot. `create` runs at most once per
    /// purpose.
    pub fn get_or_create(
        &mut self,
        owner: TypeId,
        kind: SyntheticKind,
        selector: &str,
        create: impl FnOnce() -> SyntheticSlot,
    ) -> SyntheticSlot {
        let purpose = Purpose {
            owner,
            kind,
            selector: selector.to_string(),
        };
        if let Some(&slot) = self.created.get(&purpose) {
            return slot;
        }
        let slot = create();
        self.created.insert(purpose, slot);
        slot
    }

    pub fn lookup(&self, owner: TypeId, kind: SyntheticKind, selector: &str) -> Option<SyntheticSlot> {
        self.created
            .get(&Purpose {
                owner,
                kind,
                selector: selector.to_string(),
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_never_creates_twice_for_one_purpose() {
        let mut factory = SyntheticFactory::new();
        let owner = TypeId(0);
        let mut calls = 0;
        let first = factory.get_or_create(owner, SyntheticKind::EnumValues, "values", || {
            calls += 1;
            SyntheticSlot::Method(3)
        });
        let second = factory.get_or_create(owner, SyntheticKind::EnumValues, "values", || {
            calls += 1;
            SyntheticSlot::Method(99)
        });
        assert_eq!(first, second);
        assert_eq!(calls, 1);
    }

    #[test]
    fn purposes_are_keyed_by_owner_kind_and_selector() {
        let mut factory = SyntheticFactory::new();
        factory.get_or_create(TypeId(0), SyntheticKind::OuterThisField, "this$0", || {
            SyntheticSlot::Field(0)
        });
        assert!(factory
            .lookup(TypeId(0), SyntheticKind::OuterThisField, "this$0")
            .is_some());
        assert!(factory
            .lookup(TypeId(1), SyntheticKind::OuterThisField, "this$0")
            .is_none());
        assert!(factory
            .lookup(TypeId(0), SyntheticKind::OuterThisField, "this$1")
            .is_none());
    }
}
