use crate::suffix_tree::Pattern;
use indexmap::IndexMap;

/// Keeps one pattern per occurrence count.
///
/// Patterns with the same support are taken to describe the same group of
/// records, so a later pattern replaces the kept one only when it is strictly
/// longer. A replacement moves to the end of the output; everything else
/// keeps the input order.
pub fn select_patterns(patterns: Vec<Pattern>) -> Vec<Pattern> {
    let mut by_support: IndexMap<usize, Pattern> = IndexMap::new();
    for pattern in patterns {
        let support = pattern.support();
        match by_support.get(&support) {
            Some(kept) if kept.len() >= pattern.len() => {}
            Some(_) => {
                by_support.shift_remove(&support);
                by_support.insert(support, pattern);
            }
            None => {
                by_support.insert(support, pattern);
            }
        }
    }
    by_support.into_values().collect()
}
