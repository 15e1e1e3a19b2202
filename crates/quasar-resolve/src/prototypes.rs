//! Prototype/variant registry.
//!
//! An annotated-type variant of a binding must observe every mutation made
//! to its prototype's member tables, and must observe it before the mutating
//! call returns. Instead of sharing mutable arrays, the registry records
//! which variant ids depend on each prototype id; the binding table fans the
//! updated member tables out to every registered variant synchronously after
//! each mutation.

use std::collections::HashMap;

use crate::types::TypeId;

#[derive(Debug, Default)]
pub struct PrototypeRegistry {
    variants: HashMap<TypeId, Vec<TypeId>>,
    prototype_of: HashMap<TypeId, TypeId>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `variant` as a view over `prototype`.
    pub fn register(&mut self, prototype: TypeId, variant: TypeId) {
        debug_assert_ne!(prototype, variant);
        self.variants.entry(prototype).or_default().push(variant);
        self.prototype_of.insert(variant, prototype);
    }

    pub fn variants_of(&self, prototype: TypeId) -> &[TypeId] {
        self.variants
            .get(&prototype)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn prototype_of(&self, variant: TypeId) -> Option<TypeId> {
        self.prototype_of.get(&variant).copied()
    }

    pub fn is_variant(&self, id: TypeId) -> bool {
        self.prototype_of.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_both_directions() {
        let mut registry = PrototypeRegistry::new();
        registry.register(TypeId(0), TypeId(5));
        registry.register(TypeId(0), TypeId(6));
        assert_eq!(registry.variants_of(TypeId(0)), &[TypeId(5), TypeId(6)]);
        assert_eq!(registry.prototype_of(TypeId(5)), Some(TypeId(0)));
        assert!(registry.is_variant(TypeId(6)));
        assert!(!registry.is_variant(TypeId(0)));
    }
}
