//! Stochastic solution tree search.
//!
//! Each grow roots a fresh tree at the best known assignment. Every node of a level
//! spawns `branching_factor` children that differ from it by one random flip. Children
//! that beat the best score are always kept, the rest survive with probability ½.
use super::*;
use crate::cnf::VariableType;
use crate::random::{search_rng, SearchRng};
use crate::tracker::OptimalTracker;
use log::debug;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct TreeParams {
    pub branching_factor: usize,
    pub max_depth: usize,
    pub max_grows: usize,
    /// Upper bound on the number of nodes of one level.
    pub max_width: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            branching_factor: 3,
            max_depth: 10,
            max_grows: 1000,
            max_width: 1024,
        }
    }
}

pub struct SolutionTree<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    params: TreeParams,
    rng: SearchRng,
    grows: usize,
    tracker: OptimalTracker,
    stats: TStats,
}

impl<'e, TStats: StatsStorage> SolutionTree<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, params: TreeParams, seed: u64) -> Self {
        let mut rng = search_rng(seed);
        let assignment = Assignment::random(evaluator.instance().variable_count(), &mut rng);

        let mut stats = TStats::default();
        stats.increment_full_evaluations();
        let score = evaluator.score(&assignment);

        Self {
            evaluator,
            params,
            rng,
            grows: 0,
            tracker: OptimalTracker::new(assignment, score, evaluator.max_score()),
            stats,
        }
    }

    pub fn grows(&self) -> usize {
        self.grows
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }

    /// Grows one tree level by level. Returns the widest level reached.
    fn grow(&mut self) -> usize {
        let variable_count = self.evaluator.instance().variable_count();
        let mut frontier = vec![(self.tracker.assignment().clone(), self.tracker.score())];
        let mut widest = frontier.len();

        for _ in 0..self.params.max_depth {
            let mut level = Vec::new();

            for (assignment, score) in &frontier {
                for _ in 0..self.params.branching_factor {
                    let variable = Variable::new(self.rng.gen_range(0..variable_count) as VariableType);
                    let mut child = assignment.clone();
                    child.flip(variable);
                    self.stats.increment_flips();
                    let child_score = self.evaluator.rescore_flip(&child, variable, *score);

                    let improved = self.tracker.offer_with(child_score, || child.clone());
                    if improved {
                        self.stats.increment_improvements();
                        if self.tracker.is_optimal() {
                            return widest;
                        }
                    }

                    if (improved || self.rng.gen::<bool>()) && level.len() < self.params.max_width {
                        level.push((child, child_score));
                    }
                }
            }

            if level.is_empty() {
                break;
            }
            widest = widest.max(level.len());
            frontier = level;
        }

        widest
    }
}

impl<'e, TStats: StatsStorage> Solver for SolutionTree<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        if self.evaluator.instance().variable_count() == 0 {
            return;
        }

        while self.grows < self.params.max_grows && !self.tracker.is_optimal() {
            let widest = self.grow();
            self.grows += 1;
            self.stats.increment_iterations();
            debug!(
                "Grow {}: widest level {}, best {}",
                self.grows,
                widest,
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
