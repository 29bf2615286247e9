use std::collections::HashSet;

use crate::models::posting::JobPosting;

/// Distinct location names across the corpus, for populating a location filter.
///
/// Names are deduplicated case-insensitively (the first spelling seen wins)
/// and sorted case-insensitively.
pub fn available_locations(corpus: &[JobPosting]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut locations: Vec<String> = Vec::new();

    for name in corpus.iter().flat_map(JobPosting::locations) {
        if seen.insert(name.to_lowercase()) {
            locations.push(name.to_string());
        }
    }

    locations.sort_by_cached_key(|l| l.to_lowercase());
    locations
}
