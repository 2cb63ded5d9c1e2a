//! Identity key → output slot mapping.
//!
//! Built once by the reconciler and read-only afterwards; the engine only
//! ever calls `get`.

use std::collections::HashMap;

use eodflow_core::id::SlotId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityIndex {
    slots: HashMap<String, SlotId>,
}

impl IdentityIndex {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(cap),
        }
    }

    /// Register `id` at `slot`. Returns `false` if the id was already present;
    /// the existing entry is left untouched in that case.
    pub(crate) fn insert(&mut self, id: &str, slot: SlotId) -> bool {
        if self.slots.contains_key(id) {
            return false;
        }
        self.slots.insert(id.to_string(), slot);
        true
    }

    pub fn get(&self, id: &str) -> Option<SlotId> {
        self.slots.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_slot() {
        let mut idx = IdentityIndex::with_capacity(2);
        assert!(idx.insert("a", SlotId::new(0)));
        assert!(!idx.insert("a", SlotId::new(5)));
        assert_eq!(idx.get("a"), Some(SlotId::new(0)));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn lookup_is_exact_string_match() {
        let mut idx = IdentityIndex::with_capacity(1);
        idx.insert("01", SlotId::new(0));
        assert!(idx.contains("01"));
        assert!(!idx.contains("1"));
        assert!(!idx.contains("01 "));
    }
}
