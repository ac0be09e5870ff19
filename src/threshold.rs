//! GLUE behavioral threshold search.
//!
//! Starts from a stringent acceptance threshold on the primary objective and
//! relaxes it in fixed decrements until enough runs qualify or the floor is
//! reached. Hitting the floor with too few runs is a reportable outcome, not
//! an error: an exploratory ensemble may simply contain few good runs.
//!
//! References:
//! - Beven & Binley (1992): GLUE behavioral/non-behavioral classification

use tracing::debug;

/// Threshold relaxation parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Minimum number of behavioral runs to search for
    pub min_accepted: usize,
    /// Initial (most stringent) threshold
    pub start: f64,
    /// Lowest threshold the search may relax to
    pub floor: f64,
    /// Relaxation decrement per iteration
    pub step: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            min_accepted: 30,
            start: 0.7,
            floor: -2.0,
            step: 0.05,
        }
    }
}

/// Outcome of a threshold search. Derived from the current table contents on
/// every analysis pass; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdState {
    /// Acceptance cutoff on the primary objective (inclusive lower bound)
    pub threshold: f64,
    /// Exact count of runs with objective >= threshold
    pub accepted_count: usize,
}

/// Find the most restrictive threshold that still admits at least
/// `params.min_accepted` runs.
///
/// The result depends only on the multiset of objective values, not on row
/// order; ties at the boundary are all accepted (`>=`). An empty column
/// yields `{ floor, 0 }`. The count is recomputed at the final threshold so
/// `accepted_count` always matches `threshold` exactly, even when the loop
/// exits through the floor guard with a stale count.
#[must_use]
pub fn search(objective: &[f64], params: &SearchParams) -> ThresholdState {
    let mut threshold = params.start;
    while count_accepted(objective, threshold) < params.min_accepted && threshold > params.floor {
        threshold -= params.step;
    }
    threshold = threshold.max(params.floor);

    let accepted_count = count_accepted(objective, threshold);
    debug!(threshold, accepted_count, total = objective.len(), "threshold search done");
    ThresholdState {
        threshold,
        accepted_count,
    }
}

/// Count of values meeting or exceeding `threshold`.
#[must_use]
pub fn count_accepted(objective: &[f64], threshold: f64) -> usize {
    objective.iter().filter(|&&v| v >= threshold).count()
}
