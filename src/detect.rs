//! The record detection pipeline.
//!
//! ```text
//! Document -> StructTree -> encoding sequence -> SuffixTree
//!          -> select -> reduce -> anchors -> align -> filter -> clean
//! ```

use crate::aligner::align_records;
use crate::cleaner::clean_record_groups;
use crate::config::{DetectConfig, Encoding};
use crate::document::Document;
use crate::error::Result;
use crate::indexer::StructTree;
use crate::reducer::{anchor_nodes, reduce_pattern};
use crate::selector::select_patterns;
use crate::suffix_tree::SuffixTree;
use crate::tracing_macros::{debug, trace};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Sorted indexes of nodes judged to be parallel instances of one record.
pub type RecordGroup = Vec<usize>;

/// Every record group found in one document.
pub type RecordRegion = BTreeSet<RecordGroup>;

/// Indexes `doc` and detects its record groups.
///
/// # Example
///
/// ```
/// use tree_records::{detect_records, parse_html, DetectConfig};
///
/// let items: String = (0..5)
///     .map(|i| format!("<li><span>item {i}</span><a href='/{i}'>more</a></li>"))
///     .collect();
/// let doc = parse_html(&format!("<html><body><ul>{items}</ul></body></html>"));
/// let config = DetectConfig::default()
///     .with_len_thresh(2)
///     .with_record_height_thresh(1);
///
/// let region = detect_records(&doc, &config).unwrap();
/// assert_eq!(region.len(), 1);
/// assert_eq!(region.iter().next().unwrap().len(), 5);
/// ```
pub fn detect_records(doc: &Document, config: &DetectConfig) -> Result<RecordRegion> {
    config.validate()?;
    let tree = StructTree::build(doc);
    tree.record_boundary(doc, config)
}

/// [`detect_records`] with the encoding scheme given by name.
pub fn detect_records_with(
    doc: &Document,
    encoding: &str,
    len_thresh: usize,
    freq_thresh: usize,
    record_height_thresh: usize,
    record_size_thresh: usize,
    greedy: bool,
) -> Result<RecordRegion> {
    let config = DetectConfig {
        encoding: encoding.parse::<Encoding>()?,
        len_thresh,
        freq_thresh,
        record_height_thresh,
        record_size_thresh,
        greedy,
        ..DetectConfig::default()
    };
    detect_records(doc, &config)
}

/// Runs [`detect_records`] over independent documents in parallel.
///
/// Results come back in input order and match sequential calls.
pub fn detect_records_batch(docs: &[Document], config: &DetectConfig) -> Vec<Result<RecordRegion>> {
    docs.par_iter()
        .map(|doc| detect_records(doc, config))
        .collect()
}

impl StructTree {
    /// Detects record groups in the document this tree was built from.
    pub fn record_boundary(&self, doc: &Document, config: &DetectConfig) -> Result<RecordRegion> {
        config.validate()?;
        let sequence = self.encoding_sequence(config.encoding);
        let suffix_tree = SuffixTree::new(&sequence);
        let patterns =
            suffix_tree.frequent_patterns(config.len_thresh, config.freq_thresh, config.greedy);
        debug!(
            encoding = %config.encoding,
            symbols = sequence.len(),
            patterns = patterns.len(),
            "mined frequent patterns"
        );
        let selected = select_patterns(patterns);
        debug!(selected = selected.len(), "selected patterns");

        let mut region = RecordRegion::new();
        for pattern in &selected {
            let reduced = reduce_pattern(self, pattern, config.len_thresh);
            if reduced.is_empty() {
                continue;
            }
            let anchors = anchor_nodes(self, &reduced);
            if anchors.len() < config.freq_thresh {
                continue;
            }
            let group: RecordGroup =
                align_records(self, &anchors, config.freq_thresh, config.max_merge)
                    .into_iter()
                    .filter(|&i| {
                        self[i].height >= config.record_height_thresh
                            && self[i].size >= config.record_size_thresh
                            && self.has_text(doc, i)
                    })
                    .collect();
            trace!(
                anchors = anchors.len(),
                records = group.len(),
                "aligned pattern"
            );
            if !group.is_empty() {
                region.insert(group);
            }
        }

        let cleaned =
            clean_record_groups(self, &region, config.freq_thresh, config.nesting_ratio);
        debug!(
            candidates = region.len(),
            groups = cleaned.len(),
            "record boundary"
        );
        Ok(cleaned)
    }
}
