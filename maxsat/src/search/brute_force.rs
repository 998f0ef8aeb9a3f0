//! Exhaustive enumeration of every assignment in Gray code order.
use super::*;
use crate::cnf::VariableType;
use crate::tracker::OptimalTracker;

/// Instances with more variables are refused by [`BruteForce::new`].
pub const MAX_BRUTE_FORCE_VARIABLES: usize = 30;

/// Visits all `2^n` assignments, each one flip away from the previous.
///
/// Once [`BruteForce::is_exhausted`] holds, the best score is the true maximum of the
/// instance, even when it is below the sum of all weights.
pub struct BruteForce<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    exhausted: bool,
    tracker: OptimalTracker,
    stats: TStats,
}

impl<'e, TStats: StatsStorage> BruteForce<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator) -> Result<Self, Error> {
        let variable_count = evaluator.instance().variable_count();
        if variable_count > MAX_BRUTE_FORCE_VARIABLES {
            return Err(Error::TooManyVariables {
                variables: variable_count,
                limit: MAX_BRUTE_FORCE_VARIABLES,
            });
        }

        let assignment = Assignment::all_false(variable_count);
        let mut stats = TStats::default();
        stats.increment_full_evaluations();
        let score = evaluator.score(&assignment);

        Ok(Self {
            evaluator,
            exhausted: false,
            tracker: OptimalTracker::new(assignment, score, evaluator.max_score()),
            stats,
        })
    }

    /// Returns `true` once every assignment has been scored.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }
}

impl<'e, TStats: StatsStorage> Solver for BruteForce<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        if self.exhausted {
            return;
        }

        let variable_count = self.evaluator.instance().variable_count();
        let mut assignment = self.tracker.assignment().clone();
        let mut score = self.tracker.score();

        // Step i of the reflected Gray code flips the lowest set bit of i.
        for step in 1..(1u64 << variable_count) {
            if self.tracker.is_optimal() {
                return;
            }

            let variable = Variable::new(step.trailing_zeros() as VariableType);
            assignment.flip(variable);
            self.stats.increment_flips();
            score = self.evaluator.rescore_flip(&assignment, variable, score);

            if self.tracker.offer_with(score, || assignment.clone()) {
                self.stats.increment_improvements();
            }
        }

        self.exhausted = true;
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
    use crate::stats::Stats;

    #[test]
    fn finds_weighted_optimum() {
        let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/weighted.wcnf")).unwrap();
        let evaluator = Evaluator::new(instance);

        let mut brute_force = BruteForce::<Stats>::new(&evaluator).unwrap();
        brute_force.solve();

        assert_eq!(brute_force.best_score(), 21);
        assert!(brute_force.is_optimal());
        assert_eq!(evaluator.score(brute_force.best_assignment()), 21);
    }

    #[test]
    fn visits_every_assignment_of_unsatisfiable_instance() {
        let mut instance = Instance::new(3);
        for signs in 0..8i64 {
            let clause: Clause = (1..=3)
                .map(|v| Literal::from_dimacs(if signs >> (v - 1) & 1 == 1 { -v } else { v }))
                .collect();
            instance.add_clause(clause);
        }
        let evaluator = Evaluator::new(instance);

        let mut brute_force = BruteForce::<Stats>::new(&evaluator).unwrap();
        brute_force.solve();

        assert!(brute_force.is_exhausted());
        assert!(!brute_force.is_optimal());
        assert_eq!(brute_force.best_score(), 7);
        assert_eq!(brute_force.stats().flips(), 7);
    }

    #[test]
    fn refuses_large_instances() {
        let evaluator = Evaluator::new(Instance::new(MAX_BRUTE_FORCE_VARIABLES + 1));
        assert!(matches!(
            BruteForce::<Stats>::new(&evaluator),
            Err(Error::TooManyVariables { variables, limit })
                if variables == MAX_BRUTE_FORCE_VARIABLES + 1 && limit == MAX_BRUTE_FORCE_VARIABLES
        ));
    }
}
