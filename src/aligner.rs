use crate::indexer::StructTree;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Trie of anchor ancestries, grouped level by level on the parent's tag.
///
/// The root holds the anchors themselves. A child holds the parents of its
/// parent's indexes that share one tag, duplicates kept, along with the
/// indexes they came from.
#[derive(Debug)]
struct PathTrie {
    nodes: Vec<PathNode>,
}

#[derive(Debug)]
struct PathNode {
    /// Tag id of the parents -> child node.
    children: IndexMap<u32, usize>,
    indexes: Vec<usize>,
    /// The index in the level below that each entry of `indexes` came from.
    previous: Vec<usize>,
}

/// What `align` concludes for one trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Fewer indexes than the frequency threshold.
    Sparse,
    /// This level is the record boundary.
    Stop,
    /// Keep looking one level up.
    Descend,
}

impl PathTrie {
    fn build(tree: &StructTree, anchors: &[usize]) -> Self {
        let mut nodes = vec![PathNode {
            children: IndexMap::new(),
            indexes: anchors.to_vec(),
            previous: Vec::new(),
        }];
        let mut queue = vec![0];
        while let Some(node) = queue.pop() {
            let mut groups: IndexMap<u32, (Vec<usize>, Vec<usize>)> = IndexMap::new();
            for &index in &nodes[node].indexes {
                let Some(parent) = tree[index].parent else {
                    continue;
                };
                let (indexes, previous) = groups.entry(tree[parent].tag_id).or_default();
                indexes.push(parent);
                previous.push(index);
            }
            for (tag, (indexes, previous)) in groups {
                let child = nodes.len();
                nodes.push(PathNode {
                    children: IndexMap::new(),
                    indexes,
                    previous,
                });
                nodes[node].children.insert(tag, child);
                queue.push(child);
            }
        }
        Self { nodes }
    }

    fn decide(&self, tree: &StructTree, node: usize, freq_thresh: usize, max_merge: usize) -> Decision {
        let indexes = &self.nodes[node].indexes;
        if indexes.len() < freq_thresh {
            return Decision::Sparse;
        }
        let mut multiplicity: IndexMap<usize, usize> = IndexMap::new();
        for &index in indexes {
            *multiplicity.entry(index).or_default() += 1;
        }
        let nested = tree
            .lowest_common_ancestor(multiplicity.keys().copied())
            .is_some_and(|lca| multiplicity.contains_key(&lca));
        if nested || multiplicity.values().any(|&n| n > max_merge) {
            Decision::Stop
        } else {
            Decision::Descend
        }
    }
}

/// Chooses the record nodes for one set of anchors.
///
/// Walking up the path trie, a level stops alignment when one of its
/// parents contains the others or a single parent repeats more than
/// `max_merge` times. Whenever a child level stops, the indexes that led
/// into it become records, together with those of sibling levels too sparse
/// to be judged on their own. Without any such merge the anchors are
/// returned unchanged.
pub fn align_records(
    tree: &StructTree,
    anchors: &[usize],
    freq_thresh: usize,
    max_merge: usize,
) -> BTreeSet<usize> {
    let all = || anchors.iter().copied().collect::<BTreeSet<_>>();
    let trie = PathTrie::build(tree, anchors);
    if trie.decide(tree, 0, freq_thresh, max_merge) != Decision::Descend {
        return all();
    }

    let mut records = BTreeSet::new();
    let mut stack = vec![0];
    while let Some(node) = stack.pop() {
        let mut merged = false;
        let mut sparse = Vec::new();
        for &child in trie.nodes[node].children.values() {
            match trie.decide(tree, child, freq_thresh, max_merge) {
                Decision::Stop => {
                    merged = true;
                    records.extend(trie.nodes[child].previous.iter().copied());
                }
                Decision::Descend => stack.push(child),
                Decision::Sparse => sparse.push(child),
            }
        }
        if merged {
            for child in sparse {
                records.extend(trie.nodes[child].previous.iter().copied());
            }
        }
    }

    if records.is_empty() {
        return all();
    }
    records
}
