//! Identity and deduplication.
//!
//! The identity of an article is its canonical URL. These helpers work on
//! anything [`Identified`], so the pipeline can drop known articles while
//! they are still listing stubs, before paying for a fetch.

use itertools::Itertools;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{Identified, Record};

/// Project the ids of `records` into a set.
pub fn known_ids<T: Identified>(records: &[T]) -> HashSet<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

/// Keep the candidates whose id is not in `known`, in their original order.
///
/// Repeats *within* `candidates` are not removed here; see [`dedupe_batch`].
pub fn filter_new<T: Identified>(candidates: Vec<T>, known: &HashSet<String>) -> Vec<T> {
    candidates
        .into_iter()
        .filter(|c| !known.contains(c.id()))
        .collect()
}

/// Drop later occurrences of an id already seen in this batch.
pub fn dedupe_batch<T: Identified>(candidates: Vec<T>) -> Vec<T> {
    let before = candidates.len();
    let unique: Vec<T> = candidates
        .into_iter()
        .unique_by(|c| c.id().to_string())
        .collect();
    if unique.len() < before {
        debug!(dropped = before - unique.len(), "Dropped repeated ids within batch");
    }
    unique
}

/// Append `new` to `existing`, never admitting an id that is already present.
///
/// Existing records are left exactly as they were. Returns the merged
/// collection and the number of records actually appended.
pub fn merge(mut existing: Vec<Record>, new: Vec<Record>) -> (Vec<Record>, usize) {
    let mut seen = known_ids(&existing);
    let before = existing.len();
    for record in new {
        if seen.insert(record.id.clone()) {
            existing.push(record);
        } else {
            warn!(id = %record.id, "Refusing to append duplicate id");
        }
    }
    let added = existing.len() - before;
    (existing, added)
}
