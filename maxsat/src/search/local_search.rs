//! Local search over the single-flip neighbourhood, starting from a random assignment.
use super::*;
use crate::random::search_rng;
use crate::tracker::OptimalTracker;

pub struct LocalSearch<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    tracker: OptimalTracker,
    state: SearchState,
    stats: TStats,
}

impl<'e, TStats: StatsStorage> LocalSearch<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, seed: u64) -> Self {
        let mut rng = search_rng(seed);
        let assignment = Assignment::random(evaluator.instance().variable_count(), &mut rng);
        Self::from_assignment(evaluator, assignment)
    }

    /// Starts the search from a given assignment instead of a random one.
    pub fn from_assignment(evaluator: &'e Evaluator, assignment: Assignment) -> Self {
        let mut stats = TStats::default();
        stats.increment_full_evaluations();
        let score = evaluator.score(&assignment);

        Self {
            evaluator,
            tracker: OptimalTracker::new(assignment, score, evaluator.max_score()),
            state: SearchState::Exploring,
            stats,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }
}

impl<'e, TStats: StatsStorage> Solver for LocalSearch<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        if self.state != SearchState::Exploring {
            return;
        }

        let mut assignment = self.tracker.assignment().clone();
        let (score, state) = hill_climb(
            self.evaluator,
            &mut assignment,
            self.tracker.score(),
            &mut self.stats,
        );
        self.stats.increment_iterations();

        self.tracker.offer_with(score, || assignment);
        self.state = state;
    }

    fn best_assignment(&self) -> &Assignment {
        self.tracker.assignment()
    }

    fn best_score(&self) -> Score {
        self.tracker.score()
    }

    fn is_optimal(&self) -> bool {
        self.tracker.is_optimal()
    }

    fn into_result(self) -> (Solution, TStats) {
        (self.tracker.into_solution(), self.stats)
    }
}
