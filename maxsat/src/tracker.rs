use crate::cnf::{Assignment, Score};
use crate::sat::Solution;
use log::trace;
use std::sync::{Mutex, PoisonError};

/// The best assignment seen during a run.
///
/// The score never decreases: only strictly better candidates are accepted.
#[derive(Clone, Debug)]
pub struct OptimalTracker {
    assignment: Assignment,
    score: Score,
    max_score: Score,
    optimum_found: bool,
}

impl OptimalTracker {
    pub fn new(assignment: Assignment, score: Score, max_score: Score) -> Self {
        debug_assert!(score <= max_score);
        Self {
            assignment,
            score,
            max_score,
            optimum_found: score == max_score,
        }
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    #[inline]
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Returns `true` once the score equals the instance maximum.
    #[inline]
    pub fn is_optimal(&self) -> bool {
        self.optimum_found
    }

    /// Records `candidate` if it beats the current best. Returns `true` if it was recorded.
    pub fn offer(&mut self, candidate: &Assignment, score: Score) -> bool {
        self.offer_with(score, || candidate.clone())
    }

    /// Like [`OptimalTracker::offer`], but only materializes the assignment when it is kept.
    pub fn offer_with<F>(&mut self, score: Score, candidate: F) -> bool
    where
        F: FnOnce() -> Assignment,
    {
        if score <= self.score {
            return false;
        }

        debug_assert!(score <= self.max_score);
        trace!("New best score {score} (was {})", self.score);
        self.assignment = candidate();
        self.score = score;
        self.optimum_found = score == self.max_score;
        true
    }

    pub fn into_solution(self) -> Solution {
        Solution::new(self.assignment, self.score, self.optimum_found)
    }
}

/// An [`OptimalTracker`] shared between workers of a parallel batch.
pub struct SharedTracker(Mutex<OptimalTracker>);

impl SharedTracker {
    pub fn new(tracker: OptimalTracker) -> Self {
        Self(Mutex::new(tracker))
    }

    /// Compares against the best score held under the lock, never a cached copy.
    pub fn offer(&self, candidate: &Assignment, score: Score) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .offer(candidate, score)
    }

    pub fn is_optimal(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_optimal()
    }

    pub fn score(&self) -> Score {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).score()
    }

    pub fn into_inner(self) -> OptimalTracker {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn rejects_equal_and_worse_scores() {
        let mut tracker = OptimalTracker::new(Assignment::new(vec![false, false]), 3, 5);

        assert!(!tracker.offer(&Assignment::new(vec![true, false]), 3));
        assert!(!tracker.offer(&Assignment::new(vec![true, true]), 1));
        assert_eq!(tracker.assignment(), &Assignment::new(vec![false, false]));

        assert!(tracker.offer(&Assignment::new(vec![false, true]), 4));
        assert_eq!(tracker.score(), 4);
        assert!(!tracker.is_optimal());
    }

    #[test]
    fn certifies_only_at_maximum() {
        let mut tracker = OptimalTracker::new(Assignment::all_false(1), 0, 2);
        tracker.offer(&Assignment::new(vec![true]), 1);
        assert!(!tracker.is_optimal());
        tracker.offer(&Assignment::new(vec![false]), 2);
        assert!(tracker.is_optimal());
        assert!(tracker.into_solution().is_optimal());
    }

    #[test]
    fn empty_instance_starts_optimal() {
        let tracker = OptimalTracker::new(Assignment::all_false(0), 0, 0);
        assert!(tracker.is_optimal());
    }

    #[test]
    fn concurrent_offers_keep_the_maximum() {
        let shared = SharedTracker::new(OptimalTracker::new(Assignment::all_false(1), 0, 1000));

        (0..1000u64).into_par_iter().for_each(|score| {
            shared.offer(&Assignment::new(vec![score % 2 == 0]), score);
        });

        let tracker = shared.into_inner();
        assert_eq!(tracker.score(), 999);
        assert_eq!(tracker.assignment(), &Assignment::new(vec![false]));
        assert!(!tracker.is_optimal());
    }
}
