//! Confidence propagation up the taxonomy.

use crate::taxonomy::TaxonomyIndex;

use super::ConfidenceMap;

/// Expand observations so that every ancestor of an observed concept carries
/// the highest confidence among the observations beneath it.
///
/// The input is left untouched. With an empty taxonomy the result is a plain
/// copy of the input. The outcome does not depend on the order in which
/// observations are visited, since each ancestor only ever takes a maximum.
pub fn expand(index: &TaxonomyIndex, observations: &ConfidenceMap) -> ConfidenceMap {
    let mut expanded = observations.clone();
    if index.is_empty() {
        return expanded;
    }

    for (concept, &confidence) in observations {
        for ancestor in index.ancestors(concept) {
            match expanded.get_mut(ancestor) {
                Some(current) => {
                    if confidence > *current {
                        *current = confidence;
                    }
                }
                None => {
                    expanded.insert(ancestor.to_string(), confidence.max(0.0));
                }
            }
        }
    }
    expanded
}
