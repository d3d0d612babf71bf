use crate::detect::{RecordGroup, RecordRegion};
use crate::indexer::StructTree;
use ahash::AHashSet as HashSet;

/// Strips sub-records and drops groups that end up too small.
///
/// A member is nested when one of its strict ancestors belongs to another
/// group; the first such ancestor is its parent record. When the distinct
/// parent records number at least `nesting_ratio` times the nested members
/// and at least `freq_thresh`, the nested members are removed. Groups that
/// do not keep more than `freq_thresh` members are discarded.
pub fn clean_record_groups(
    tree: &StructTree,
    region: &RecordRegion,
    freq_thresh: usize,
    nesting_ratio: f64,
) -> RecordRegion {
    let all: HashSet<usize> = region.iter().flatten().copied().collect();
    let mut cleaned = RecordRegion::new();

    for group in region {
        let members: HashSet<usize> = group.iter().copied().collect();
        let mut parents = HashSet::default();
        let mut nested = HashSet::default();
        for &member in group {
            let Some((_, strict)) = tree.ancestors(member).split_last() else {
                continue;
            };
            if let Some(&parent) = strict
                .iter()
                .find(|a| all.contains(*a) && !members.contains(*a))
            {
                parents.insert(parent);
                nested.insert(member);
            }
        }

        let strip = parents.len() as f64 >= nested.len() as f64 * nesting_ratio
            && parents.len() >= freq_thresh;
        let kept: RecordGroup = group
            .iter()
            .copied()
            .filter(|member| !(strip && nested.contains(member)))
            .collect();
        if kept.len() > freq_thresh {
            cleaned.insert(kept);
        }
    }
    cleaned
}
