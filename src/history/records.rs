//! Derived statistics over a filtered exercise history

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ExerciseHistoryEntry;

/// Highest reps logged at one exact weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepsAtWeight {
    pub weight: f64,
    pub reps: f64,
}

/// Best entry: highest weight, then highest reps.
///
/// Full ties keep the first entry seen, which is the earliest one when the
/// input comes chronologically ordered from the history index.
pub fn personal_record<'a, I>(entries: I) -> Option<&'a ExerciseHistoryEntry>
where
    I: IntoIterator<Item = &'a ExerciseHistoryEntry>,
{
    entries.into_iter().fold(None::<&ExerciseHistoryEntry>, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = candidate.weight > current.weight
                || (candidate.weight == current.weight && candidate.reps > current.reps);
            if better { Some(candidate) } else { Some(current) }
        }
    })
}

/// Max reps per distinct weight, ascending by weight
pub fn reps_max_by_weight<'a, I>(entries: I) -> Vec<RepsAtWeight>
where
    I: IntoIterator<Item = &'a ExerciseHistoryEntry>,
{
    let mut table: Vec<RepsAtWeight> = entries
        .into_iter()
        .filter(|e| e.weight > 0.0 && e.reps > 0.0)
        .map(|e| RepsAtWeight { weight: e.weight, reps: e.reps })
        .collect();

    table.sort_by(|a, b| a.weight.total_cmp(&b.weight));
    // Exact-weight runs are now adjacent; keep the max reps of each run
    table.dedup_by(|next, kept| {
        if next.weight == kept.weight {
            kept.reps = kept.reps.max(next.reps);
            true
        } else {
            false
        }
    });
    table
}

/// Chronological `(date, weight)` points for the progress chart
pub fn weight_progression<'a, I>(entries: I) -> Vec<(DateTime<Utc>, f64)>
where
    I: IntoIterator<Item = &'a ExerciseHistoryEntry>,
{
    entries
        .into_iter()
        .filter(|e| e.weight > 0.0)
        .map(|e| (e.date, e.weight))
        .collect()
}
