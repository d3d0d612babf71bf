//! Projection of pattern occurrences onto the tree.
//!
//! An occurrence is a run of consecutive post-order indexes, which rarely
//! lines up with whole subtrees. Occurrences are grouped under the ancestor
//! where they converge, then each one is cut down to the single child
//! subtree of that ancestor it overlaps most.

use crate::indexer::StructTree;
use crate::suffix_tree::{Pattern, Span};
use crate::tracing_macros::trace;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Node of the trie of ancestor chains, keyed by node index.
#[derive(Debug)]
struct Branch {
    /// `None` for the virtual root above the document root.
    index: Option<usize>,
    /// Occurrences whose chain passes through this node.
    count: usize,
    children: IndexMap<usize, usize>,
    /// Occurrences whose LCA is exactly this node.
    occurrences: Vec<Span>,
}

impl Branch {
    fn new(index: Option<usize>) -> Self {
        Self {
            index,
            count: 0,
            children: IndexMap::new(),
            occurrences: Vec::new(),
        }
    }
}

/// Reduced occurrences of `pattern` that are still at least `len_thresh` long.
pub fn reduce_pattern(tree: &StructTree, pattern: &Pattern, len_thresh: usize) -> Vec<Span> {
    let mut reduced = reduce_occurrences(tree, &pattern.occurrences);
    reduced.retain(|span| span.len() >= len_thresh);
    trace!(
        occurrences = pattern.support(),
        reduced = reduced.len(),
        "reduced pattern"
    );
    reduced
}

/// Cuts every occurrence down to the child subtree of its group anchor that
/// it overlaps most. Occurrences without a positive overlap are dropped.
pub fn reduce_occurrences(tree: &StructTree, occurrences: &[Span]) -> Vec<Span> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };
    let mut reduced = Vec::with_capacity(occurrences.len());
    for (anchor, group) in group_occurrences(tree, occurrences) {
        let anchor = anchor.unwrap_or(root);
        let ranges: Vec<(usize, usize)> = tree[anchor]
            .children
            .iter()
            .map(|&c| (tree[c].start, tree[c].end()))
            .collect();
        reduced.extend(group.into_iter().filter_map(|span| widest_overlap(&ranges, span)));
    }
    reduced
}

/// Sorted, distinct LCAs of the given spans.
pub fn anchor_nodes(tree: &StructTree, spans: &[Span]) -> Vec<usize> {
    spans
        .iter()
        .filter_map(|span| tree.lowest_common_ancestor(span.start..span.end))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Groups occurrences by the trie node where they converge.
///
/// A trie leaf keeps its occurrences when it has at least two. An inner
/// node collects what its children passed up (its own occurrences are not
/// considered) and keeps them when there are at least two, or exactly one
/// that is also the only occurrence through the node. The virtual root is
/// tested like an inner node over every occurrence, and a group formed there
/// is anchored at the document root by the caller. Whatever the virtual root
/// does not group is dropped.
fn group_occurrences(tree: &StructTree, occurrences: &[Span]) -> Vec<(Option<usize>, Vec<Span>)> {
    let mut branches = vec![Branch::new(None)];
    branches[0].count = occurrences.len();

    for &span in occurrences {
        let Some(lca) = tree.lowest_common_ancestor(span.start..span.end) else {
            continue;
        };
        let mut current = 0;
        for &ancestor in tree.ancestors(lca) {
            let next = match branches[current].children.get(&ancestor) {
                Some(&next) => next,
                None => {
                    let next = branches.len();
                    branches.push(Branch::new(Some(ancestor)));
                    branches[current].children.insert(ancestor, next);
                    next
                }
            };
            branches[next].count += 1;
            current = next;
        }
        branches[current].occurrences.push(span);
    }

    let mut groups = Vec::new();
    let mut carried: Vec<Vec<Span>> = vec![Vec::new(); branches.len()];
    let mut stack = vec![(0usize, 0usize)];
    while let Some(top) = stack.last_mut() {
        let (node, position) = *top;
        if let Some((_, &child)) = branches[node].children.get_index(position) {
            top.1 += 1;
            stack.push((child, 0));
            continue;
        }
        stack.pop();

        let branch = &branches[node];
        let converges;
        let pending = if branch.children.is_empty() {
            converges = branch.occurrences.len() >= 2;
            branch.occurrences.clone()
        } else {
            let mut pending = Vec::new();
            for &child in branch.children.values() {
                pending.append(&mut carried[child]);
            }
            converges = pending.len() >= 2 || (pending.len() == 1 && branch.count == 1);
            pending
        };

        if converges {
            groups.push((branch.index, pending));
        } else {
            carried[node] = pending;
        }
    }
    groups
}

/// Largest positive overlap between `span` and one of the sorted, disjoint
/// child `ranges`; the first one wins a tie.
fn widest_overlap(ranges: &[(usize, usize)], span: Span) -> Option<Span> {
    let mut lo = ranges.partition_point(|&r| r <= (span.start, span.start));
    if lo == ranges.len() || lo > 0 {
        // The range starting at or before `span.start` may still overlap.
        lo = lo.checked_sub(1)?;
    }
    let hi = ranges.partition_point(|&r| r <= (span.end, span.end));

    let mut best: Option<Span> = None;
    for &(start, end) in ranges.get(lo..hi)? {
        let overlap = Span::new(start.max(span.start), end.min(span.end));
        if overlap.len() > best.map_or(0, |b| b.len()) {
            best = Some(overlap);
        }
    }
    best
}
