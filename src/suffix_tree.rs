//! Suffix tree over an encoding sequence and frequent-pattern search.
//!
//! The tree is built with Ukkonen's algorithm over the sequence followed by
//! a unique terminator, so every suffix ends in its own leaf. After
//! construction each node knows its string depth and its leaf count, which
//! is the number of positions where the substring spelled by the node occurs.

use crate::tracing_macros::trace;
use indexmap::IndexMap;
use slotmap::{DefaultKey, SecondaryMap, SlotMap};

/// Appended to the text; wider than any input symbol so it can never collide.
const TERMINATOR: u64 = u64::MAX;

/// Half-open range `[start, end)` of positions in the encoding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A repeated substring of the encoding sequence and where it occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub symbols: Vec<u32>,
    /// Sorted by start; every span is exactly `symbols.len()` long.
    pub occurrences: Vec<Span>,
}

impl Pattern {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of occurrences.
    pub fn support(&self) -> usize {
        self.occurrences.len()
    }

    /// Whether every occurrence of `other` lies inside an occurrence of
    /// this pattern.
    pub fn covers(&self, other: &Pattern) -> bool {
        !other.occurrences.is_empty()
            && other.occurrences.iter().all(|inner| {
                // All our spans share one length, so the last span starting
                // at or before `inner` reaches furthest.
                let after = self
                    .occurrences
                    .partition_point(|outer| outer.start <= inner.start);
                after
                    .checked_sub(1)
                    .is_some_and(|i| self.occurrences[i].end >= inner.end)
            })
    }
}

#[derive(Debug)]
struct SuffixNode {
    /// Edge label is `text[start..end]`.
    start: usize,
    /// `None` marks a leaf, whose edge runs to the end of the text.
    end: Option<usize>,
    link: Option<DefaultKey>,
    /// Keyed by the first symbol of the child's edge, in creation order.
    children: IndexMap<u64, DefaultKey>,
    /// Length of the path from the root.
    depth: usize,
    /// Start of one suffix passing through this node.
    suffix: usize,
    leaf_count: usize,
}

impl SuffixNode {
    fn internal(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
            link: None,
            children: IndexMap::new(),
            depth: 0,
            suffix: 0,
            leaf_count: 0,
        }
    }

    fn leaf(start: usize) -> Self {
        Self {
            start,
            end: None,
            link: None,
            children: IndexMap::new(),
            depth: 0,
            suffix: 0,
            leaf_count: 1,
        }
    }

    fn is_leaf(&self) -> bool {
        self.end.is_none()
    }
}

/// Suffix tree of a single symbol sequence.
///
/// # Example
///
/// ```
/// use tree_records::SuffixTree;
///
/// let tree = SuffixTree::new(&[2, 3, 4, 2, 3, 4, 2, 3, 4, 5]);
/// let patterns = tree.frequent_patterns(3, 3, false);
/// assert_eq!(patterns.len(), 1);
/// assert_eq!(patterns[0].symbols, vec![2, 3, 4]);
/// ```
#[derive(Debug)]
pub struct SuffixTree {
    text: Vec<u64>,
    nodes: SlotMap<DefaultKey, SuffixNode>,
    root: DefaultKey,
}

impl SuffixTree {
    /// Builds the tree and annotates depths and leaf counts.
    pub fn new(sequence: &[u32]) -> Self {
        let mut text: Vec<u64> = Vec::with_capacity(sequence.len() + 1);
        text.extend(sequence.iter().map(|&s| u64::from(s)));
        text.push(TERMINATOR);

        let mut nodes = SlotMap::with_capacity(2 * text.len());
        let root = nodes.insert(SuffixNode::internal(0, 0));
        let mut tree = Self { text, nodes, root };
        tree.construct();
        tree.annotate();
        trace!(
            symbols = sequence.len(),
            nodes = tree.nodes.len(),
            "built suffix tree"
        );
        tree
    }

    /// Length of the indexed sequence, terminator excluded.
    pub fn len(&self) -> usize {
        self.text.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of positions where `pattern` occurs (overlaps included).
    pub fn occurrences(&self, pattern: &[u32]) -> usize {
        if pattern.is_empty() {
            return self.len();
        }
        let mut node = self.root;
        let mut matched = 0;
        while matched < pattern.len() {
            let symbol = u64::from(pattern[matched]);
            let Some(&child) = self.nodes[node].children.get(&symbol) else {
                return 0;
            };
            let entry = &self.nodes[child];
            let end = entry.end.unwrap_or(self.text.len());
            for &label in &self.text[entry.start..end] {
                if matched == pattern.len() {
                    break;
                }
                if label != u64::from(pattern[matched]) {
                    return 0;
                }
                matched += 1;
            }
            node = child;
        }
        self.nodes[node].leaf_count
    }

    /// Maximal repeated substrings at least `len_thresh` long occurring at
    /// least `freq_thresh` times, in search order.
    ///
    /// Without `greedy`, each emitted pattern's occurrences are discounted
    /// from the counts of shorter candidates, and a pattern whose every
    /// occurrence sits inside an occurrence of a longer one is dropped, so
    /// one recurrence is reported once, at its most specific length.
    pub fn frequent_patterns(
        &self,
        len_thresh: usize,
        freq_thresh: usize,
        greedy: bool,
    ) -> Vec<Pattern> {
        let mut search = PatternSearch::new(self, len_thresh.max(1), freq_thresh, greedy);
        search.run();
        if !greedy {
            search.drop_covered();
        }
        trace!(
            patterns = search.patterns.len(),
            len_thresh,
            freq_thresh,
            greedy,
            "frequent pattern search"
        );
        search.patterns
    }

    /// Ukkonen's online construction.
    fn construct(&mut self) {
        let root = self.root;
        let mut active_node = root;
        let mut active_edge = 0usize;
        let mut active_len = 0usize;
        let mut remaining = 0usize;

        for i in 0..self.text.len() {
            remaining += 1;
            let mut last_internal: Option<DefaultKey> = None;

            while remaining > 0 {
                if active_len == 0 {
                    active_edge = i;
                }
                let edge_symbol = self.text[active_edge];

                match self.nodes[active_node].children.get(&edge_symbol).copied() {
                    None => {
                        let leaf = self.nodes.insert(SuffixNode::leaf(i));
                        self.nodes[active_node].children.insert(edge_symbol, leaf);
                        if let Some(node) = last_internal.take() {
                            self.nodes[node].link = Some(active_node);
                        }
                    }
                    Some(next) => {
                        let next_start = self.nodes[next].start;
                        let edge_len = self.nodes[next].end.unwrap_or(i + 1) - next_start;
                        if active_len >= edge_len {
                            // Walk down.
                            active_edge += edge_len;
                            active_len -= edge_len;
                            active_node = next;
                            continue;
                        }

                        if self.text[next_start + active_len] == self.text[i] {
                            if let Some(node) = last_internal.take() {
                                if active_node != root {
                                    self.nodes[node].link = Some(active_node);
                                }
                            }
                            active_len += 1;
                            break;
                        }

                        // Split the edge; the new internal node keeps the
                        // position of `next` among its parent's children.
                        let split_at = next_start + active_len;
                        let split = self.nodes.insert(SuffixNode::internal(next_start, split_at));
                        self.nodes[active_node].children.insert(edge_symbol, split);
                        self.nodes[next].start = split_at;
                        let next_symbol = self.text[split_at];
                        let leaf = self.nodes.insert(SuffixNode::leaf(i));
                        self.nodes[split].children.insert(next_symbol, next);
                        self.nodes[split].children.insert(self.text[i], leaf);

                        if let Some(node) = last_internal {
                            self.nodes[node].link = Some(split);
                        }
                        last_internal = Some(split);
                    }
                }

                remaining -= 1;
                if active_node == root && active_len > 0 {
                    active_len -= 1;
                    active_edge = i + 1 - remaining;
                } else if active_node != root {
                    active_node = self.nodes[active_node].link.unwrap_or(root);
                }
            }
        }
    }

    /// Fills in string depth, a representative suffix and the leaf count.
    fn annotate(&mut self) {
        let text_len = self.text.len();
        let mut preorder = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, 0usize)];
        while let Some((node, parent_depth)) = stack.pop() {
            let depth = if node == self.root {
                0
            } else {
                let entry = &self.nodes[node];
                parent_depth + entry.end.unwrap_or(text_len) - entry.start
            };
            self.nodes[node].depth = depth;
            preorder.push(node);
            stack.extend(self.nodes[node].children.values().map(|&c| (c, depth)));
        }

        // Reverse pre-order visits children before their parent.
        for &node in preorder.iter().rev() {
            if self.nodes[node].is_leaf() {
                let depth = self.nodes[node].depth;
                self.nodes[node].suffix = text_len - depth;
                continue;
            }
            let entry = &self.nodes[node];
            let leaf_count: usize = entry
                .children
                .values()
                .map(|&c| self.nodes[c].leaf_count)
                .sum();
            let suffix = entry
                .children
                .values()
                .next()
                .map(|&c| self.nodes[c].suffix)
                .unwrap_or(0);
            let entry = &mut self.nodes[node];
            entry.leaf_count = leaf_count;
            entry.suffix = suffix;
        }
    }

    /// Path label of `node`.
    fn label(&self, node: DefaultKey) -> &[u64] {
        let entry = &self.nodes[node];
        &self.text[entry.suffix..entry.suffix + entry.depth]
    }

    /// Sorted start positions of every suffix below `node`.
    fn leaf_starts(&self, node: DefaultKey) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let entry = &self.nodes[current];
            if entry.is_leaf() {
                starts.push(entry.suffix);
            } else {
                stack.extend(entry.children.values().copied());
            }
        }
        starts.sort_unstable();
        starts
    }
}

/// State of one frequent-pattern search.
///
/// Leaf counts are copied out of the tree so the closure discount never
/// touches the tree itself and the same tree can be searched again.
struct PatternSearch<'a> {
    tree: &'a SuffixTree,
    counts: SecondaryMap<DefaultKey, isize>,
    len_thresh: usize,
    freq_thresh: isize,
    greedy: bool,
    patterns: Vec<Pattern>,
}

impl<'a> PatternSearch<'a> {
    fn new(tree: &'a SuffixTree, len_thresh: usize, freq_thresh: usize, greedy: bool) -> Self {
        let mut counts = SecondaryMap::with_capacity(tree.nodes.len());
        for (key, node) in &tree.nodes {
            counts.insert(key, node.leaf_count as isize);
        }
        Self {
            tree,
            counts,
            len_thresh,
            freq_thresh: freq_thresh as isize,
            greedy,
            patterns: Vec::new(),
        }
    }

    /// Top-down search; a qualifying node is emitted and its subtree is not
    /// explored further.
    fn run(&mut self) {
        let tree = self.tree;
        let mut stack = vec![tree.root];
        while let Some(node) = stack.pop() {
            let entry = &tree.nodes[node];
            // Counts are read when the node is reached, after earlier
            // siblings had their chance to discount them.
            if entry.is_leaf() || self.counts[node] < self.freq_thresh {
                continue;
            }
            if entry.depth >= self.len_thresh {
                self.emit(node);
                if !self.greedy {
                    self.close(node);
                }
            } else {
                stack.extend(entry.children.values().rev().copied());
            }
        }
    }

    fn emit(&mut self, node: DefaultKey) {
        let tree = self.tree;
        let depth = tree.nodes[node].depth;
        let symbols = tree.label(node).iter().map(|&s| s as u32).collect();
        let occurrences = tree
            .leaf_starts(node)
            .into_iter()
            .map(|start| Span::new(start, start + depth))
            .collect();
        self.patterns.push(Pattern {
            symbols,
            occurrences,
        });
    }

    /// Discounts the occurrences of an emitted node.
    ///
    /// Every descendant that is itself frequent is subtracted from its
    /// parent and closed recursively. Then, for each symbol on a node's
    /// path, the node's remaining count is subtracted from the root child
    /// starting with that symbol. The remaining count is taken once before
    /// the path is walked, so an emitted root child discounts its own
    /// suffixes too, and a node already drained by its descendants
    /// discounts nothing.
    fn close(&mut self, start: DefaultKey) {
        let tree = self.tree;
        let root_children = &tree.nodes[tree.root].children;
        let mut stack: Vec<(DefaultKey, usize)> = vec![(start, 0)];

        while let Some(top) = stack.last_mut() {
            let (node, position) = *top;
            if let Some((_, &child)) = tree.nodes[node].children.get_index(position) {
                top.1 += 1;
                let child_count = self.counts[child];
                if child_count >= self.freq_thresh {
                    self.counts[node] -= child_count;
                    stack.push((child, 0));
                }
                continue;
            }

            stack.pop();
            let remaining = self.counts[node].max(0);
            for symbol in tree.label(node) {
                if let Some(&first) = root_children.get(symbol) {
                    self.counts[first] -= remaining;
                }
            }
        }
    }

    /// Covering is transitive, so the outermost pattern of every chain
    /// survives and no survivor covers another.
    fn drop_covered(&mut self) {
        let covered: Vec<bool> = self
            .patterns
            .iter()
            .map(|inner| {
                self.patterns
                    .iter()
                    .any(|outer| outer.len() > inner.len() && outer.covers(inner))
            })
            .collect();
        let mut covered = covered.into_iter();
        self.patterns.retain(|_| !covered.next().unwrap_or(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_count(sequence: &[u32], pattern: &[u32]) -> usize {
        sequence
            .windows(pattern.len())
            .filter(|w| *w == pattern)
            .count()
    }

    #[test]
    fn test_three_symbol_scenario() {
        let tree = SuffixTree::new(&[2, 3, 4, 2, 3, 4, 2, 3, 4, 5]);
        let patterns = tree.frequent_patterns(3, 3, false);
        assert_eq!(
            patterns,
            vec![Pattern {
                symbols: vec![2, 3, 4],
                occurrences: vec![Span::new(0, 3), Span::new(3, 6), Span::new(6, 9)],
            }]
        );
    }

    #[test]
    fn test_occurrence_counts() {
        let sequence = [1, 2, 1, 2, 1, 3, 1, 2];
        let tree = SuffixTree::new(&sequence);
        assert_eq!(tree.len(), 8);
        for pattern in [
            &[1][..],
            &[2],
            &[1, 2],
            &[2, 1],
            &[1, 2, 1],
            &[1, 3],
            &[3, 3],
            &[1, 2, 1, 2, 1, 3, 1, 2],
        ] {
            assert_eq!(
                tree.occurrences(pattern),
                naive_count(&sequence, pattern),
                "pattern {pattern:?}"
            );
        }
    }

    #[test]
    fn test_empty_and_short_sequences() {
        let tree = SuffixTree::new(&[]);
        assert!(tree.is_empty());
        assert!(tree.frequent_patterns(1, 1, false).is_empty());

        let tree = SuffixTree::new(&[7]);
        assert!(tree.frequent_patterns(2, 2, false).is_empty());
    }

    #[test]
    fn test_single_symbol_run() {
        let tree = SuffixTree::new(&[5, 5, 5, 5]);
        assert_eq!(tree.occurrences(&[5, 5]), 3);
        let patterns = tree.frequent_patterns(2, 2, false);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].symbols, vec![5, 5]);
        assert_eq!(patterns[0].support(), 3);
    }

    #[test]
    fn test_greedy_reports_inner_patterns() {
        // (2, 3) occurs inside (1, 2, 3) and twice on its own.
        let sequence = [1, 2, 3, 9, 1, 2, 3, 8, 1, 2, 3, 7, 2, 3, 6, 2, 3];
        let tree = SuffixTree::new(&sequence);

        let greedy = tree.frequent_patterns(2, 3, true);
        let greedy_symbols: Vec<_> = greedy.iter().map(|p| p.symbols.clone()).collect();
        assert!(greedy_symbols.contains(&vec![1, 2, 3]));
        assert!(greedy_symbols.contains(&vec![2, 3]));

        let closed = tree.frequent_patterns(2, 3, false);
        for pattern in &closed {
            assert!(greedy.contains(pattern));
        }
    }

    #[test]
    fn test_nested_closure_discounts_inner_repeats() {
        // The trailing (1, 5) makes the repeated block a deep node rather
        // than a root child, so its occurrences are discounted from (3, 4).
        let sequence = [1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4, 3, 4, 1, 5];
        let tree = SuffixTree::new(&sequence);
        let greedy = tree.frequent_patterns(2, 3, true);
        assert!(greedy.iter().any(|p| p.symbols == vec![3, 4]));

        let closed = tree.frequent_patterns(2, 3, false);
        let symbols: Vec<_> = closed.iter().map(|p| p.symbols.clone()).collect();
        assert_eq!(symbols, vec![vec![1, 2, 3, 4]]);
    }

    #[test]
    fn test_suffixes_of_a_root_child_are_discounted() {
        for sequence in [&[2, 3, 4, 2, 3, 4, 2, 3, 4, 5][..], &[1, 2, 3, 1, 2, 3, 1, 2, 3]] {
            let tree = SuffixTree::new(sequence);
            assert!(tree.frequent_patterns(2, 3, true).len() > 1);

            let closed = tree.frequent_patterns(2, 3, false);
            assert_eq!(closed.len(), 1, "sequence {sequence:?}");
            assert_eq!(closed[0].symbols, sequence[..3].to_vec());
            assert_eq!(closed[0].support(), 3);
        }
    }

    #[test]
    fn test_suffix_found_before_its_pattern_is_dropped() {
        // Root child 3 is searched first and reaches (3, 4) before (2, 3, 4)
        // is emitted, yet every (3, 4) sits inside a (2, 3, 4).
        let tree = SuffixTree::new(&[3, 5, 3, 6, 2, 3, 4, 2, 3, 4, 2, 3, 4]);
        let closed = tree.frequent_patterns(2, 3, false);
        assert_eq!(
            closed,
            vec![Pattern {
                symbols: vec![2, 3, 4],
                occurrences: vec![Span::new(4, 7), Span::new(7, 10), Span::new(10, 13)],
            }]
        );
    }

    #[test]
    fn test_independent_inner_recurrence_survives() {
        // (3, 4) recurs on its own after the block, so it is a separate
        // family even though three of its occurrences are inside (2, 3, 4).
        let sequence = [2, 3, 4, 2, 3, 4, 2, 3, 4, 7, 3, 4, 8, 3, 4, 9, 3, 4];
        let closed = SuffixTree::new(&sequence).frequent_patterns(2, 3, false);
        let symbols: Vec<_> = closed.iter().map(|p| p.symbols.clone()).collect();
        assert!(symbols.contains(&vec![2, 3, 4]));
        assert!(symbols.contains(&vec![3, 4]));
        for (i, a) in closed.iter().enumerate() {
            for (j, b) in closed.iter().enumerate() {
                assert!(i == j || !a.covers(b));
            }
        }
    }

    #[test]
    fn test_covers() {
        let outer = Pattern {
            symbols: vec![2, 3, 4],
            occurrences: vec![Span::new(0, 3), Span::new(5, 8)],
        };
        let inner = Pattern {
            symbols: vec![3, 4],
            occurrences: vec![Span::new(1, 3), Span::new(6, 8)],
        };
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));

        let straddling = Pattern {
            symbols: vec![4, 1],
            occurrences: vec![Span::new(2, 4)],
        };
        assert!(!outer.covers(&straddling));
    }

    #[test]
    fn test_occurrences_match_symbols() {
        let sequence = [4, 1, 2, 4, 1, 2, 4, 1, 2, 3, 1, 2];
        let tree = SuffixTree::new(&sequence);
        for pattern in tree.frequent_patterns(2, 2, true) {
            assert_eq!(pattern.support(), naive_count(&sequence, &pattern.symbols));
            for span in &pattern.occurrences {
                assert_eq!(&sequence[span.start..span.end], pattern.symbols.as_slice());
            }
        }
    }

    #[test]
    fn test_search_is_repeatable() {
        let tree = SuffixTree::new(&[1, 2, 1, 2, 1, 2, 3]);
        assert_eq!(
            tree.frequent_patterns(2, 2, false),
            tree.frequent_patterns(2, 2, false)
        );
    }
}
