//! Scoring detected records against a reference selection, and writing the
//! outcome back onto the document as presentation attributes.
//!
//! Records are compared by text: the text of a node is the trimmed leading
//! text of every indexed element in its subtree, in document order, joined
//! with single spaces. Only detected groups that share at least one text
//! with the reference are scored, so unrelated repeated regions on the same
//! page count neither for nor against the detector.

use crate::detect::RecordRegion;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::indexer::StructTree;
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use std::collections::BTreeSet;

const HIT_STYLE: &str = "border: dashed darkgreen;";
const MISTAKE_STYLE: &str = "border: dashed yellow;";
const MISS_STYLE: &str = "border: dashed red;";

/// Outcome of comparing detected records with a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Reference texts that were detected.
    pub hits: BTreeSet<String>,
    /// Reference texts that were not detected.
    pub misses: BTreeSet<String>,
    /// Detected texts that are not in the reference.
    pub mistakes: BTreeSet<String>,
    pub hit_nodes: Vec<usize>,
    pub miss_nodes: Vec<usize>,
    pub mistake_nodes: Vec<usize>,
}

impl Evaluation {
    /// `hits / (hits + misses)`, or 0 when nothing was expected.
    pub fn recall(&self) -> f64 {
        ratio(self.hits.len(), self.misses.len())
    }

    /// `hits / (hits + mistakes)`, or 0 when nothing was scored.
    pub fn precision(&self) -> f64 {
        ratio(self.hits.len(), self.mistakes.len())
    }
}

fn ratio(hits: usize, other: usize) -> f64 {
    if hits + other == 0 {
        0.0
    } else {
        hits as f64 / (hits + other) as f64
    }
}

/// Text used to match a record against the reference.
pub fn record_text(tree: &StructTree, doc: &Document, index: usize) -> String {
    let mut parts = Vec::new();
    let mut stack = vec![index];
    while let Some(current) = stack.pop() {
        if let Some(text) = doc.leading_text(tree[current].key) {
            parts.push(text.trim());
        }
        stack.extend(tree[current].children.iter().rev());
    }
    parts.join(" ").trim().to_string()
}

/// Indexed nodes that carry the attribute `name`, in index order.
pub fn reference_nodes(tree: &StructTree, doc: &Document, name: &str) -> Vec<usize> {
    tree.nodes()
        .iter()
        .filter(|node| doc.attr(node.key, name).is_some())
        .map(|node| node.index)
        .collect()
}

/// Scores `region` against the reference node indexes.
///
/// Fails with [`Error::EmptyReference`] when `reference` is empty.
pub fn evaluate(
    tree: &StructTree,
    doc: &Document,
    region: &RecordRegion,
    reference: &[usize],
) -> Result<Evaluation> {
    if reference.is_empty() {
        return Err(Error::EmptyReference);
    }

    let mut texts: HashMap<usize, String> = HashMap::default();
    let mut annotated: HashSet<String> = HashSet::default();
    for &index in reference {
        let text = record_text(tree, doc, index);
        annotated.insert(text.clone());
        texts.insert(index, text);
    }

    let mut detected: BTreeSet<usize> = BTreeSet::new();
    for group in region {
        let mut overlaps = false;
        for &index in group {
            let text = record_text(tree, doc, index);
            overlaps |= annotated.contains(&text);
            texts.insert(index, text);
        }
        if overlaps {
            detected.extend(group.iter().copied());
        }
    }

    let mut evaluation = Evaluation::default();
    let mut detected_texts: HashSet<&str> = HashSet::default();
    for &index in &detected {
        let text = texts[&index].as_str();
        detected_texts.insert(text);
        if text.is_empty() {
            continue;
        }
        if annotated.contains(text) {
            evaluation.hits.insert(text.to_string());
            evaluation.hit_nodes.push(index);
        } else {
            evaluation.mistakes.insert(text.to_string());
            evaluation.mistake_nodes.push(index);
        }
    }
    for &index in reference {
        let text = texts[&index].as_str();
        if !text.is_empty() && !detected_texts.contains(text) {
            evaluation.misses.insert(text.to_string());
            evaluation.miss_nodes.push(index);
        }
    }
    Ok(evaluation)
}

/// Marks every detected record with `data-record-{group}` and a border.
pub fn mark_records(doc: &mut Document, tree: &StructTree, region: &RecordRegion) {
    for (group_index, group) in region.iter().enumerate() {
        let name = format!("data-record-{group_index}");
        for &index in group {
            let key = tree[index].key;
            doc.set_attr(key, name.as_str(), "");
            doc.set_attr(key, "style", HIT_STYLE);
        }
    }
}

/// Marks hits, mistakes and misses of an evaluation.
pub fn mark_evaluation(doc: &mut Document, tree: &StructTree, evaluation: &Evaluation) {
    let marks = [
        (&evaluation.hit_nodes, HIT_STYLE, "data-record-hit"),
        (&evaluation.mistake_nodes, MISTAKE_STYLE, "data-record-mistake"),
        (&evaluation.miss_nodes, MISS_STYLE, "data-record-miss"),
    ];
    for (nodes, style, flag) in marks {
        for &index in nodes {
            let key = tree[index].key;
            doc.set_attr(key, "style", style);
            doc.set_attr(key, flag, "1");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ul > li(span text, a text) per entry; li at 2, 5, 8, ..
    fn list_doc(items: &[&str]) -> Document {
        let mut doc = Document::new("ul");
        for item in items {
            let li = doc.append_element(doc.root(), "li");
            let span = doc.append_element(li, "span");
            doc.append_text(span, format!("  {item} "));
            let a = doc.append_element(li, "a");
            doc.append_text(a, "more");
        }
        doc
    }

    fn region(groups: &[&[usize]]) -> RecordRegion {
        groups.iter().map(|g| g.to_vec()).collect()
    }

    #[test]
    fn test_record_text_is_in_document_order() {
        let mut doc = list_doc(&["first"]);
        let li = doc.child_elements(doc.root()).next().unwrap();
        doc.append_text(doc.root(), "ignored");
        let tree = StructTree::build(&doc);
        assert_eq!(record_text(&tree, &doc, 2), "first more");
        assert_eq!(tree[2].key, li);
    }

    #[test]
    fn test_perfect_detection() {
        let doc = list_doc(&["a", "b", "c", "d"]);
        let tree = StructTree::build(&doc);
        let records = [2, 5, 8, 11];
        let evaluation = evaluate(&tree, &doc, &region(&[&records]), &records).unwrap();
        assert_eq!(evaluation.hits.len(), 4);
        assert!(evaluation.misses.is_empty());
        assert!(evaluation.mistakes.is_empty());
        assert_eq!(evaluation.recall(), 1.0);
        assert_eq!(evaluation.precision(), 1.0);
    }

    #[test]
    fn test_partial_detection() {
        let doc = list_doc(&["a", "b", "c", "d"]);
        let tree = StructTree::build(&doc);
        // The span group shares no text with the reference and is not scored.
        let detected = region(&[&[2, 5, 8], &[0, 3]]);
        let evaluation = evaluate(&tree, &doc, &detected, &[2, 5, 8, 11]).unwrap();
        assert_eq!(evaluation.hit_nodes, vec![2, 5, 8]);
        assert_eq!(evaluation.miss_nodes, vec![11]);
        assert!(evaluation.mistakes.is_empty());
        assert_eq!(evaluation.recall(), 0.75);
    }

    #[test]
    fn test_mistakes_in_overlapping_group() {
        let doc = list_doc(&["a", "b", "c"]);
        let tree = StructTree::build(&doc);
        let detected = region(&[&[0, 2, 5]]);
        let evaluation = evaluate(&tree, &doc, &detected, &[2, 5, 8]).unwrap();
        assert_eq!(evaluation.mistake_nodes, vec![0]);
        assert_eq!(evaluation.hits.len(), 2);
        assert_eq!(evaluation.precision(), 2.0 / 3.0);
    }

    #[test]
    fn test_empty_reference() {
        let doc = list_doc(&["a"]);
        let tree = StructTree::build(&doc);
        assert_eq!(
            evaluate(&tree, &doc, &RecordRegion::new(), &[]),
            Err(Error::EmptyReference)
        );
        assert_eq!(Evaluation::default().recall(), 0.0);
    }

    #[test]
    fn test_reference_nodes_by_attribute() {
        let mut doc = list_doc(&["a", "b"]);
        let tree = StructTree::build(&doc);
        doc.set_attr(tree[5].key, "userselected", "");
        assert_eq!(reference_nodes(&tree, &doc, "userselected"), vec![5]);
    }

    #[test]
    fn test_marking() {
        let mut doc = list_doc(&["a", "b", "c"]);
        let tree = StructTree::build(&doc);
        let detected = region(&[&[2, 5]]);
        mark_records(&mut doc, &tree, &detected);
        assert_eq!(doc.attr(tree[2].key, "data-record-0"), Some(""));

        let evaluation = evaluate(&tree, &doc, &detected, &[5, 8]).unwrap();
        mark_evaluation(&mut doc, &tree, &evaluation);
        assert_eq!(doc.attr(tree[2].key, "data-record-mistake"), Some("1"));
        assert_eq!(doc.attr(tree[8].key, "data-record-miss"), Some("1"));
        assert_eq!(doc.attr(tree[8].key, "style"), Some(MISS_STYLE));
        assert_eq!(doc.attr(tree[5].key, "data-record-hit"), Some("1"));
    }
}
