//! Structural indexing of a [`Document`].
//!
//! One traversal numbers every kept element in post-order (children before
//! their parent), records subtree size, height and depth, and interns four
//! alternative encodings per node. Post-order numbering makes every subtree
//! occupy the contiguous index range `start..=index`, with the node's own
//! index last, so containment is a range test.

use crate::config::Encoding;
use crate::document::{Document, NodeKey};
use crate::symbol::SymbolTables;
use crate::tracing_macros::debug;
use std::ops::{Index, Range};

/// Elements dropped before indexing, together with their whole subtree.
pub const TAG_DENYLIST: &[&str] = &["script", "noscript", "head", "meta", "style"];

/// Attribute keys ignored when building a node signature.
///
/// Includes the debug attributes written by [`StructTree::annotate`], so an
/// annotated document indexes exactly like an unannotated one.
pub const ATTRIBUTE_DENYLIST: &[&str] = &[
    "data-record-boundary",
    "userselected",
    "optionaluserselected",
    "data-height",
    "data-size",
    "data-index",
    "data-depth",
];

/// One indexed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructNode {
    /// The element this node describes.
    pub key: NodeKey,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Document-order (post-order) index.
    pub index: usize,
    /// First index of the subtree.
    pub start: usize,
    /// Number of kept elements in the subtree, self included.
    pub size: usize,
    /// 1 for a leaf, otherwise 1 + the tallest child.
    pub height: usize,
    /// Edges from the root.
    pub depth: usize,
    pub tag_id: u32,
    pub signature_id: u32,
    pub htp_id: u32,
    pub structure_id: u32,
}

impl StructNode {
    /// Half-open index range covered by the subtree.
    pub fn range(&self) -> Range<usize> {
        self.start..self.index + 1
    }

    pub fn end(&self) -> usize {
        self.index + 1
    }

    pub fn encoding(&self, encoding: Encoding) -> u32 {
        match encoding {
            Encoding::Tag => self.tag_id,
            Encoding::Signature => self.signature_id,
            Encoding::Htp => self.htp_id,
            Encoding::Structure => self.structure_id,
        }
    }
}

/// The indexed view of one document.
#[derive(Debug, Clone)]
pub struct StructTree {
    nodes: Vec<StructNode>,
    /// `ancestors[i]` is the index chain from the root down to `i`, inclusive.
    ancestors: Vec<Vec<usize>>,
    tables: SymbolTables,
}

/// Traversal state of an element whose children are still being visited.
struct Frame {
    key: NodeKey,
    depth: usize,
    start: usize,
    tag_id: u32,
    signature_id: u32,
    htp_id: u32,
    path: Vec<u32>,
    pending: std::vec::IntoIter<NodeKey>,
    children: Vec<usize>,
}

impl StructTree {
    /// Indexes `doc` starting at its root element.
    pub fn build(doc: &Document) -> Self {
        let mut tables = SymbolTables::default();
        let mut nodes: Vec<StructNode> = Vec::with_capacity(doc.len());
        let mut stack = vec![enter(doc, &mut tables, doc.root(), 0, &[], 0)];

        while let Some(top) = stack.last_mut() {
            if let Some(child) = top.pending.next() {
                let depth = top.depth + 1;
                let path = top.path.clone();
                let frame = enter(doc, &mut tables, child, depth, &path, nodes.len());
                stack.push(frame);
                continue;
            }

            let Some(frame) = stack.pop() else { break };
            let mut structure: Vec<u32> = frame
                .children
                .iter()
                .map(|&c| nodes[c].structure_id)
                .collect();
            structure.push(frame.signature_id);
            let structure_id = tables.structures.intern(structure);

            let size = 1 + frame.children.iter().map(|&c| nodes[c].size).sum::<usize>();
            let height = 1 + frame
                .children
                .iter()
                .map(|&c| nodes[c].height)
                .max()
                .unwrap_or(0);

            let index = nodes.len();
            for &c in &frame.children {
                nodes[c].parent = Some(index);
            }
            nodes.push(StructNode {
                key: frame.key,
                parent: None,
                children: frame.children,
                index,
                start: frame.start,
                size,
                height,
                depth: frame.depth,
                tag_id: frame.tag_id,
                signature_id: frame.signature_id,
                htp_id: frame.htp_id,
                structure_id,
            });

            if let Some(parent) = stack.last_mut() {
                parent.children.push(index);
            }
        }

        // Parents always carry a higher index than their children.
        let mut ancestors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for index in (0..nodes.len()).rev() {
            let mut chain = match nodes[index].parent {
                Some(parent) => ancestors[parent].clone(),
                None => Vec::new(),
            };
            chain.push(index);
            ancestors[index] = chain;
        }

        debug!(
            nodes = nodes.len(),
            tags = tables.tags.len(),
            structures = tables.structures.len(),
            "indexed document"
        );

        Self {
            nodes,
            ancestors,
            tables,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the root element (always the last one).
    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&StructNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[StructNode] {
        &self.nodes
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    /// Index chain from the root down to `index`, inclusive.
    pub fn ancestors(&self, index: usize) -> &[usize] {
        &self.ancestors[index]
    }

    /// The document-order sequence of one encoding id per node.
    pub fn encoding_sequence(&self, encoding: Encoding) -> Vec<u32> {
        self.nodes.iter().map(|n| n.encoding(encoding)).collect()
    }

    /// `(index, structure id)` of every node at least `height` tall and `size` big.
    pub fn structure_sequence(&self, height: usize, size: usize) -> Vec<(usize, u32)> {
        self.nodes
            .iter()
            .filter(|n| n.height >= height && n.size >= size)
            .map(|n| (n.index, n.structure_id))
            .collect()
    }

    /// True if `node` lies in the subtree of `ancestor` (or is `ancestor`).
    pub fn contains(&self, ancestor: usize, node: usize) -> bool {
        self.nodes[ancestor].range().contains(&node)
    }

    /// Deepest node whose subtree holds every index in `indexes`.
    ///
    /// Returns `None` for an empty input.
    pub fn lowest_common_ancestor<I>(&self, indexes: I) -> Option<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let paths: Vec<&[usize]> = indexes
            .into_iter()
            .map(|i| self.ancestors[i].as_slice())
            .collect();
        let first = *paths.first()?;
        let shortest = paths.iter().map(|p| p.len()).min()?;
        let mut depth = 0;
        while depth + 1 < shortest && paths.iter().all(|p| p[depth + 1] == first[depth + 1]) {
            depth += 1;
        }
        Some(first[depth])
    }

    /// True if the element's text splits into at least one whitespace token.
    pub fn has_text(&self, doc: &Document, index: usize) -> bool {
        doc.text_content(self.nodes[index].key)
            .split_whitespace()
            .next()
            .is_some()
    }

    /// Writes `data-height`, `data-size`, `data-index` and `data-depth` onto
    /// every indexed element. Nothing in this crate reads them back.
    pub fn annotate(&self, doc: &mut Document) {
        for node in &self.nodes {
            doc.set_attr(node.key, "data-height", node.height.to_string());
            doc.set_attr(node.key, "data-size", node.size.to_string());
            doc.set_attr(node.key, "data-index", node.index.to_string());
            doc.set_attr(node.key, "data-depth", node.depth.to_string());
        }
    }
}

impl Index<usize> for StructTree {
    type Output = StructNode;

    fn index(&self, index: usize) -> &StructNode {
        &self.nodes[index]
    }
}

fn enter(
    doc: &Document,
    tables: &mut SymbolTables,
    key: NodeKey,
    depth: usize,
    parent_path: &[u32],
    start: usize,
) -> Frame {
    let tag = doc.tag(key);
    let mut attr_keys: Vec<String> = doc
        .attrs(key)
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| !ATTRIBUTE_DENYLIST.contains(name))
        .map(str::to_string)
        .collect();
    attr_keys.sort();

    let signature_id = tables.signatures.intern((tag.to_string(), attr_keys));
    let tag_id = tables.tags.intern(tag.to_string());
    let mut path = Vec::with_capacity(parent_path.len() + 1);
    path.extend_from_slice(parent_path);
    path.push(tag_id);
    let htp_id = tables.tag_paths.intern(path.clone());

    let pending: Vec<NodeKey> = doc
        .child_elements(key)
        .filter(|&child| !TAG_DENYLIST.contains(&doc.tag(child)))
        .collect();

    Frame {
        key,
        depth,
        start,
        tag_id,
        signature_id,
        htp_id,
        path,
        pending: pending.into_iter(),
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ul > 3 × li > (span, a)
    fn list_doc() -> Document {
        let mut doc = Document::new("ul");
        for i in 0..3 {
            let li = doc.append_element(doc.root(), "li");
            let span = doc.append_element(li, "span");
            doc.append_text(span, format!("item {i}"));
            let a = doc.append_element(li, "a");
            doc.set_attr(a, "href", format!("/{i}"));
        }
        doc
    }

    #[test]
    fn test_post_order_numbering() {
        let doc = list_doc();
        let tree = StructTree::build(&doc);
        assert_eq!(tree.len(), 10);

        let tags: Vec<&str> = tree.nodes().iter().map(|n| doc.tag(n.key)).collect();
        assert_eq!(
            tags,
            vec!["span", "a", "li", "span", "a", "li", "span", "a", "li", "ul"]
        );
        assert_eq!(tree.root(), Some(9));
        assert_eq!(tree[9].range(), 0..10);
        assert_eq!(tree[5].range(), 3..6);
        assert_eq!(tree[5].children, vec![3, 4]);
        assert_eq!(tree[5].parent, Some(9));
    }

    #[test]
    fn test_size_height_depth() {
        let tree = StructTree::build(&list_doc());
        let li = &tree[2];
        assert_eq!((li.size, li.height, li.depth), (3, 2, 1));
        let span = &tree[0];
        assert_eq!((span.size, span.height, span.depth), (1, 1, 2));
        let ul = &tree[9];
        assert_eq!((ul.size, ul.height, ul.depth), (10, 3, 0));
    }

    #[test]
    fn test_denylisted_subtrees_are_pruned() {
        let mut doc = Document::new("div");
        let script = doc.append_element(doc.root(), "script");
        doc.append_element(script, "p");
        doc.append_element(doc.root(), "p");
        doc.append_element(doc.root(), "style");
        let tree = StructTree::build(&doc);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].size, 2);
        assert_eq!(tree[1].height, 2);
    }

    #[test]
    fn test_encodings() {
        let doc = list_doc();
        let tree = StructTree::build(&doc);
        // Same shape under every li.
        assert_eq!(tree[2].structure_id, tree[5].structure_id);
        assert_eq!(tree[2].structure_id, tree[8].structure_id);
        assert_ne!(tree[0].structure_id, tree[1].structure_id);
        // Attribute values do not take part in the signature.
        assert_eq!(tree[1].signature_id, tree[4].signature_id);
        assert_ne!(tree[1].signature_id, tree[0].signature_id);
        assert_eq!(tree[0].htp_id, tree[3].htp_id);
        assert_eq!(
            tree.encoding_sequence(Encoding::Tag),
            vec![3, 4, 2, 3, 4, 2, 3, 4, 2, 1]
        );
    }

    #[test]
    fn test_tag_path_ignores_attributes() {
        let mut doc = Document::new("div");
        doc.append_element(doc.root(), "p");
        let b = doc.append_element(doc.root(), "p");
        doc.set_attr(b, "class", "x");
        let tree = StructTree::build(&doc);
        assert_eq!(tree[0].htp_id, tree[1].htp_id);
        assert_ne!(tree[0].signature_id, tree[1].signature_id);
        assert_ne!(tree[0].structure_id, tree[1].structure_id);
    }

    #[test]
    fn test_lowest_common_ancestor() {
        let tree = StructTree::build(&list_doc());
        assert_eq!(tree.lowest_common_ancestor([0, 1]), Some(2));
        assert_eq!(tree.lowest_common_ancestor([0, 1, 2]), Some(2));
        assert_eq!(tree.lowest_common_ancestor([0, 4]), Some(9));
        assert_eq!(tree.lowest_common_ancestor([7]), Some(7));
        assert_eq!(tree.lowest_common_ancestor(std::iter::empty()), None);
    }

    #[test]
    fn test_contains() {
        let tree = StructTree::build(&list_doc());
        assert!(tree.contains(5, 3));
        assert!(tree.contains(5, 5));
        assert!(!tree.contains(5, 6));
        assert!(!tree.contains(5, 2));
    }

    #[test]
    fn test_annotation_does_not_change_reindexing() {
        let mut doc = list_doc();
        let before = StructTree::build(&doc);
        before.annotate(&mut doc);
        assert_eq!(doc.attr(before[9].key, "data-size"), Some("10"));
        assert_eq!(doc.attr(before[0].key, "data-depth"), Some("2"));

        let after = StructTree::build(&doc);
        assert_eq!(
            before.encoding_sequence(Encoding::Signature),
            after.encoding_sequence(Encoding::Signature)
        );
        assert_eq!(before.nodes(), after.nodes());
    }

    #[test]
    fn test_has_text() {
        let doc = list_doc();
        let tree = StructTree::build(&doc);
        assert!(tree.has_text(&doc, 2));
        assert!(!tree.has_text(&doc, 1));
    }

    #[test]
    fn test_structure_sequence_filters() {
        let tree = StructTree::build(&list_doc());
        let seq = tree.structure_sequence(2, 3);
        let indexes: Vec<usize> = seq.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![2, 5, 8, 9]);
    }
}
