use ahash::AHashMap as HashMap;
use std::hash::Hash;

/// Interns structural keys as dense positive ids.
///
/// Ids are handed out in first-encounter order starting at 1, so two
/// traversals that visit keys in the same order produce identical tables.
#[derive(Debug, Clone)]
pub struct SymbolTable<K> {
    ids: HashMap<K, u32>,
}

impl<K: Hash + Eq> SymbolTable<K> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::default(),
        }
    }

    /// Returns the id of `key`, assigning the next free one if it is new.
    pub fn intern(&mut self, key: K) -> u32 {
        let next = self.ids.len() as u32 + 1;
        *self.ids.entry(key).or_insert(next)
    }

    pub fn get(&self, key: &K) -> Option<u32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<K: Hash + Eq> Default for SymbolTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tag name plus the sorted attribute keys that take part in the signature.
pub type Signature = (String, Vec<String>);

/// The four independent per-document tables filled by one indexing pass.
#[derive(Debug, Clone, Default)]
pub struct SymbolTables {
    /// tag -> id
    pub tags: SymbolTable<String>,
    /// (tag, sorted attribute keys) -> id
    pub signatures: SymbolTable<Signature>,
    /// tag-id path from the root to the node -> id
    pub tag_paths: SymbolTable<Vec<u32>>,
    /// (children structure ids..., own signature id) -> id
    pub structures: SymbolTable<Vec<u32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_encounter_order() {
        let mut table = SymbolTable::new();
        assert_eq!(table.intern("div"), 1);
        assert_eq!(table.intern("span"), 2);
        assert_eq!(table.intern("div"), 1);
        assert_eq!(table.intern("a"), 3);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_get_does_not_assign() {
        let mut table = SymbolTable::new();
        assert_eq!(table.get(&vec![1u32, 2]), None);
        table.intern(vec![1u32, 2]);
        assert_eq!(table.get(&vec![1u32, 2]), Some(1));
        assert_eq!(table.get(&vec![2u32, 1]), None);
    }

    #[test]
    fn test_tables_are_independent() {
        let mut tables = SymbolTables::default();
        assert_eq!(tables.tags.intern("li".to_string()), 1);
        assert_eq!(
            tables.signatures.intern(("li".to_string(), vec!["class".to_string()])),
            1
        );
        assert_eq!(tables.tag_paths.intern(vec![1]), 1);
        assert_eq!(tables.structures.intern(vec![1]), 1);
        assert!(!tables.tags.is_empty());
    }
}
