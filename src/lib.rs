//! # Tree Records - Unsupervised Record Detection
//!
//! Finds repeated "record" regions in a document tree, such as the rows of a
//! search-results page or the items of a product grid, without any prior
//! knowledge of the page layout.
//!
//! The pipeline:
//! 1. **Indexing**: every element is numbered in post-order and given four
//!    structural encodings (tag, tag + attribute keys, tag path, canonical
//!    subtree structure).
//! 2. **Mining**: a suffix tree over one encoding sequence yields the
//!    frequent repeated substrings.
//! 3. **Reduction**: each occurrence is projected onto the tree and cut down
//!    to whole sibling subtrees.
//! 4. **Alignment**: a trie of ancestor tags decides at which level the
//!    repeated subtrees form the records.
//! 5. **Cleaning**: groups nested inside other groups are stripped.
//!
//! ## Example
//!
//! ```
//! use tree_records::{detect_records, parse_document, DetectConfig, StructTree};
//!
//! let rows: String = (0..4)
//!     .map(|i| format!("<div class='row'><h3>Title {i}</h3><p>Body {i}</p></div>"))
//!     .collect();
//! let doc = parse_document(&format!("<html><body>{rows}</body></html>"));
//!
//! let config = DetectConfig::default().with_len_thresh(2).with_record_height_thresh(1);
//! let region = detect_records(&doc, &config).unwrap();
//!
//! let tree = StructTree::build(&doc);
//! for group in &region {
//!     for &index in group {
//!         assert_eq!(doc.tag(tree[index].key), "div");
//!     }
//! }
//! ```
//!
//! ## Performance
//!
//! - Indexing and suffix-tree construction are linear in the number of elements
//! - All traversals are iterative, so deep documents cannot overflow the stack
//! - Independent documents can be processed in parallel with [`detect_records_batch`]
//! - Marked documents are written back out with [`Document::to_html`]

mod aligner;
mod cleaner;
mod config;
mod detect;
mod document;
mod error;
mod evaluate;
mod indexer;
mod parse;
mod reducer;
mod selector;
mod serialize;
mod suffix_tree;
mod symbol;
mod tracing_macros;


pub use aligner::align_records;
pub use cleaner::clean_record_groups;
pub use config::{DetectConfig, Encoding};
pub use detect::{
    detect_records, detect_records_batch, detect_records_with, RecordGroup, RecordRegion,
};
pub use document::{Child, Document, Element, NodeKey};
pub use error::{Error, Result};
pub use evaluate::{
    evaluate, mark_evaluation, mark_records, record_text, reference_nodes, Evaluation,
};
pub use indexer::{StructNode, StructTree, ATTRIBUTE_DENYLIST, TAG_DENYLIST};
pub use parse::{from_json_value, parse_document, parse_html, parse_json};
pub use reducer::{anchor_nodes, reduce_occurrences, reduce_pattern};
pub use selector::select_patterns;
pub use suffix_tree::{Pattern, Span, SuffixTree};
pub use symbol::{Signature, SymbolTable, SymbolTables};
