mod annealing;
mod brute_force;
mod colony;
mod genetic;
mod guided;
mod local_search;
mod memetic;
mod tree;

#[cfg(test)]
mod tests;

pub use annealing::{acceptance_probability, AnnealingParams, Calibration, Cooling, SimulatedAnnealing};
pub use brute_force::{BruteForce, MAX_BRUTE_FORCE_VARIABLES};
pub use colony::{branch_probability, AntColony, ColonyParams};
pub use genetic::{Crossover, GeneticAlgorithm, GeneticParams, Individual, Mutation, Selection};
pub use guided::{GuidedLocalSearch, GuidedParams};
pub use local_search::LocalSearch;
pub use memetic::MemeticAlgorithm;
pub use tree::{SolutionTree, TreeParams};

use crate::cnf::{Assignment, Score, Variable};
use crate::evaluator::Evaluator;
use crate::sat::Solution;
use crate::stats::StatsStorage;
use crate::Error;
use log::info;
use rayon::prelude::*;

/// A search strategy over the assignments of one instance.
pub trait Solver {
    type Stats: StatsStorage;

    /// Runs the search until it converges, proves optimality or exhausts its budget.
    fn solve(&mut self);
    fn best_assignment(&self) -> &Assignment;
    fn best_score(&self) -> Score;
    /// Returns `true` if the best score equals the instance maximum.
    fn is_optimal(&self) -> bool;
    fn into_result(self) -> (Solution, Self::Stats);
}

/// Selects a strategy together with its parameters.
#[derive(Clone, Debug)]
pub enum Strategy {
    LocalSearch,
    GuidedLocalSearch(GuidedParams),
    SimulatedAnnealing(AnnealingParams),
    Genetic(GeneticParams),
    Memetic(GeneticParams),
    AntColony(ColonyParams),
    SolutionTree(TreeParams),
    BruteForce,
}

/// Progress of a single-trajectory search.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SearchState {
    Exploring,
    /// No single flip improves the score.
    Converged,
    /// Every clause is satisfied.
    OptimumFound,
}

pub fn solve<TStatistics: StatsStorage>(
    evaluator: &Evaluator,
    strategy: Strategy,
    seed: u64,
) -> Result<(Solution, TStatistics), Error> {
    let instance = evaluator.instance();
    info!(
        "Solving {} variables, {} clauses with {strategy:?} (seed {seed})",
        instance.variable_count(),
        instance.clause_count()
    );

    let result = match strategy {
        Strategy::LocalSearch => run(LocalSearch::new(evaluator, seed)),
        Strategy::GuidedLocalSearch(params) => {
            run(GuidedLocalSearch::new(evaluator, params, seed))
        }
        Strategy::SimulatedAnnealing(params) => {
            run(SimulatedAnnealing::new(evaluator, params, seed))
        }
        Strategy::Genetic(params) => run(GeneticAlgorithm::new(evaluator, params, seed)),
        Strategy::Memetic(params) => run(MemeticAlgorithm::new(evaluator, params, seed)),
        Strategy::AntColony(params) => run(AntColony::new(evaluator, params, seed)),
        Strategy::SolutionTree(params) => run(SolutionTree::new(evaluator, params, seed)),
        Strategy::BruteForce => run(BruteForce::new(evaluator)?),
    };

    info!(
        "Finished with score {} of {}",
        result.0.score(),
        evaluator.max_score()
    );
    Ok(result)
}

fn run<TSolver: Solver>(mut solver: TSolver) -> (Solution, TSolver::Stats) {
    solver.solve();
    solver.into_result()
}

/// Runs `work` for every index in `0..count`, on the rayon pool if `parallel` is set.
///
/// Results are returned in index order either way.
pub(crate) fn run_batch<T, F>(count: usize, parallel: bool, work: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if parallel {
        (0..count).into_par_iter().map(work).collect()
    } else {
        (0..count).map(work).collect()
    }
}

/// Flips `variable` and keeps the flip if `accept` approves the new score.
///
/// Returns the new score if the flip was kept; otherwise the assignment is restored.
#[inline]
pub(crate) fn try_flip<TStats, F>(
    evaluator: &Evaluator,
    assignment: &mut Assignment,
    variable: Variable,
    score: Score,
    stats: &mut TStats,
    accept: F,
) -> Option<Score>
where
    TStats: StatsStorage,
    F: FnOnce(Score) -> bool,
{
    assignment.flip(variable);
    stats.increment_flips();

    let new_score = evaluator.rescore_flip(assignment, variable, score);
    if accept(new_score) {
        Some(new_score)
    } else {
        assignment.flip(variable);
        None
    }
}

/// Scans the variables in index order and keeps the first flip that raises the score.
pub(crate) fn improving_flip<TStats: StatsStorage>(
    evaluator: &Evaluator,
    assignment: &mut Assignment,
    score: Score,
    stats: &mut TStats,
) -> Option<Score> {
    evaluator.instance().variables().find_map(|variable| {
        try_flip(evaluator, assignment, variable, score, stats, |x| x > score)
    })
}

/// First-improvement hill climbing: after every improving flip the scan restarts from
/// the first variable. Stops when no flip improves or every clause is satisfied.
pub(crate) fn hill_climb<TStats: StatsStorage>(
    evaluator: &Evaluator,
    assignment: &mut Assignment,
    mut score: Score,
    stats: &mut TStats,
) -> (Score, SearchState) {
    let max_score = evaluator.max_score();

    loop {
        if score == max_score {
            return (score, SearchState::OptimumFound);
        }

        match improving_flip(evaluator, assignment, score, stats) {
            Some(new_score) => {
                stats.increment_improvements();
                score = new_score;
            }
            None => return (score, SearchState::Converged),
        }
    }
}
