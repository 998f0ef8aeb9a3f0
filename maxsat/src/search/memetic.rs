//! Genetic algorithm whose individuals are all hill climbed before they are scored.
use super::genetic::Refinement;
use super::*;

pub struct MemeticAlgorithm<'e, TStats: StatsStorage>(GeneticAlgorithm<'e, TStats>);

impl<'e, TStats: StatsStorage> MemeticAlgorithm<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, params: GeneticParams, seed: u64) -> Self {
        Self(GeneticAlgorithm::with_refinement(
            evaluator,
            params,
            seed,
            Refinement::LocalSearch,
        ))
    }

    pub fn population(&self) -> &[Individual] {
        self.0.population()
    }

    pub fn generation(&self) -> usize {
        self.0.generation()
    }

    pub fn advance(&mut self) {
        self.0.advance()
    }

    pub fn stats(&self) -> &TStats {
        self.0.stats()
    }
}

impl<'e, TStats: StatsStorage> Solver for MemeticAlgorithm<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        self.0.solve()
    }

    fn best_assignment(&self) -> &Assignment {
        self.0.best_assignment()
    }

    fn best_score(&self) -> Score {
        self.0.best_score()
    }

    fn is_optimal(&self) -> bool {
        self.0.is_optimal()
    }

    fn into_result(self) -> (Solution, TStats) {
        self.0.into_result()
    }
}
