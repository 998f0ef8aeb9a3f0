//! Guided local search (GLS).
//!
//! Local search runs on the augmented objective `score - λ·Σ penalty(c)` over the
//! violated clauses `c`. Whenever it gets stuck, the violated clauses of maximum
//! utility `weight(c) / (1 + penalty(c))` are penalized and the search resumes.
use super::*;
use crate::evaluator::ClauseChange;
use crate::random::search_rng;
use crate::tracker::OptimalTracker;
use log::debug;

/// Improvements of the augmented objective below this are treated as ties.
const AUGMENTED_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug)]
pub struct GuidedParams {
    /// Number of penalty updates before the search stops.
    pub max_trials: usize,
    /// The penalty multiplier λ.
    pub lambda: f64,
}

impl Default for GuidedParams {
    fn default() -> Self {
        Self {
            max_trials: 50,
            lambda: 0.45,
        }
    }
}

pub struct GuidedLocalSearch<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    params: GuidedParams,
    penalties: Vec<u64>,
    assignment: Assignment,
    score: Score,
    /// Sum of penalties over the clauses violated by `assignment`.
    violated_penalty: u64,
    trials: usize,
    tracker: OptimalTracker,
    stats: TStats,
}

impl<'e, TStats: StatsStorage> GuidedLocalSearch<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, params: GuidedParams, seed: u64) -> Self {
        let mut rng = search_rng(seed);
        let assignment = Assignment::random(evaluator.instance().variable_count(), &mut rng);
        Self::from_assignment(evaluator, params, assignment)
    }

    pub fn from_assignment(
        evaluator: &'e Evaluator,
        params: GuidedParams,
        assignment: Assignment,
    ) -> Self {
        let mut stats = TStats::default();
        stats.increment_full_evaluations();
        let score = evaluator.score(&assignment);

        Self {
            evaluator,
            params,
            penalties: vec![0; evaluator.instance().clause_count()],
            tracker: OptimalTracker::new(assignment.clone(), score, evaluator.max_score()),
            assignment,
            score,
            violated_penalty: 0,
            trials: 0,
            stats,
        }
    }

    /// The current penalty of every clause.
    pub fn penalties(&self) -> &[u64] {
        &self.penalties
    }

    /// Number of completed penalty updates.
    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }

    /// Runs local search on the augmented objective until no flip improves it.
    fn descend(&mut self) {
        loop {
            if self.tracker.is_optimal() {
                return;
            }

            match guided_flip(
                self.evaluator,
                &self.penalties,
                self.params.lambda,
                &mut self.assignment,
                &mut self.stats,
            ) {
                Some((score_delta, penalty_delta)) => {
                    self.score = (self.score as i64 + score_delta) as Score;
                    self.violated_penalty = (self.violated_penalty as i64 + penalty_delta) as u64;

                    let assignment = &self.assignment;
                    if self.tracker.offer_with(self.score, || assignment.clone()) {
                        self.stats.increment_improvements();
                    }
                }
                None => return,
            }
        }
    }

    /// Increments the penalty of every violated clause tied for maximum utility.
    fn penalize(&mut self) {
        let evaluator = self.evaluator;
        let instance = evaluator.instance();
        let utilities: Vec<(usize, f64)> = (0..instance.clause_count())
            .filter(|&i| !evaluator.is_clause_satisfied(i, &self.assignment))
            .map(|i| {
                let utility = instance.weight(i) as f64 / (1 + self.penalties[i]) as f64;
                (i, utility)
            })
            .collect();

        let max_utility = utilities
            .iter()
            .map(|&(_, utility)| utility)
            .fold(f64::NEG_INFINITY, f64::max);

        for &(i, utility) in &utilities {
            if utility == max_utility {
                self.penalties[i] += 1;
                self.violated_penalty += 1;
            }
        }
    }
}

/// Scans the variables in index order and keeps the first flip that improves the
/// augmented objective. Returns the change of the score and of the violated penalty.
fn guided_flip<TStats: StatsStorage>(
    evaluator: &Evaluator,
    penalties: &[u64],
    lambda: f64,
    assignment: &mut Assignment,
    stats: &mut TStats,
) -> Option<(i64, i64)> {
    let weights = evaluator.instance().weights();

    for variable in evaluator.instance().variables() {
        assignment.flip(variable);
        stats.increment_flips();

        let mut score_delta: i64 = 0;
        let mut penalty_delta: i64 = 0;
        evaluator.flip_changes(assignment, variable, |i, change| match change {
            ClauseChange::Satisfied => {
                score_delta += weights[i] as i64;
                penalty_delta -= penalties[i] as i64;
            }
            ClauseChange::Violated => {
                score_delta -= weights[i] as i64;
                penalty_delta += penalties[i] as i64;
            }
        });

        if score_delta as f64 - lambda * penalty_delta as f64 > AUGMENTED_EPSILON {
            return Some((score_delta, penalty_delta));
        }

        assignment.flip(variable);
    }

    None
}

impl<'e, TStats: StatsStorage> Solver for GuidedLocalSearch<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        while self.trials < self.params.max_trials {
            self.descend();
            if self.tracker.is_optimal() {
                break;
            }

            self.penalize();
            self.trials += 1;
            self.stats.increment_iterations();
            debug!(
                "GLS trial {}: score {}, violated penalty {}, best {}",
                self.trials,
                self.score,
                self.violated_penalty,
                self.tracker.score()
            );
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::{Clause, Instance, Literal};
    use crate::stats::NoStats;

    fn clause(raw: &[i64]) -> Clause {
        raw.iter().map(|&x| Literal::from_dimacs(x)).collect()
    }

    fn contradiction() -> Evaluator {
        let mut instance = Instance::new(1);
        instance.add_clause(clause(&[1]));
        instance.add_clause(clause(&[-1]));
        Evaluator::new(instance)
    }

    #[test]
    fn contradiction_exhausts_trials_with_growing_penalty() {
        let evaluator = contradiction();

        let mut previous_total = 0;
        for max_trials in 1..=6 {
            let params = GuidedParams {
                max_trials,
                ..Default::default()
            };
            let mut search = GuidedLocalSearch::<NoStats>::new(&evaluator, params, 5);
            search.solve();

            assert_eq!(search.best_score(), 1);
            assert!(!search.is_optimal());
            assert_eq!(search.trials(), max_trials);

            let total: u64 = search.penalties().iter().sum();
            assert!(total > previous_total);
            assert_eq!(total, max_trials as u64);
            previous_total = total;
        }
    }

    #[test]
    fn violated_penalty_tracks_recomputation() {
        let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/random3_50.cnf")).unwrap();
        let evaluator = Evaluator::new(instance);
        let params = GuidedParams {
            max_trials: 20,
            lambda: 0.45,
        };

        let mut search = GuidedLocalSearch::<NoStats>::new(&evaluator, params, 3);
        search.solve();

        let violated: u64 = evaluator
            .instance()
            .clauses()
            .iter()
            .zip(search.penalties())
            .filter(|(clause, _)| !clause.is_satisfied(&search.assignment))
            .map(|(_, &penalty)| penalty)
            .sum();
        assert_eq!(search.violated_penalty, violated);
        assert_eq!(search.score, evaluator.score(&search.assignment));
        assert_eq!(evaluator.score(search.best_assignment()), search.best_score());
    }

    #[test]
    fn penalizes_all_tied_clauses() {
        let mut instance = Instance::new(2);
        instance.add_weighted_clause(clause(&[1]), 2);
        instance.add_weighted_clause(clause(&[2]), 2);
        instance.add_weighted_clause(clause(&[-1, -2]), 1);
        let evaluator = Evaluator::new(instance);

        let mut search = GuidedLocalSearch::<NoStats>::from_assignment(
            &evaluator,
            GuidedParams::default(),
            Assignment::all_false(2),
        );
        search.penalize();

        assert_eq!(search.penalties(), &[1, 1, 0]);
        assert_eq!(search.violated_penalty, 2);
    }

    #[test]
    fn first_trial_is_plain_local_search() {
        let mut instance = Instance::new(3);
        instance.add_clause(clause(&[1, 2]));
        instance.add_clause(clause(&[-1, 3]));
        let evaluator = Evaluator::new(instance);

        let mut search = GuidedLocalSearch::<NoStats>::from_assignment(
            &evaluator,
            GuidedParams::default(),
            Assignment::new(vec![true, false, false]),
        );
        search.solve();

        assert!(search.is_optimal());
        assert_eq!(search.trials(), 0);
        assert_eq!(search.best_score(), 2);
    }
}
