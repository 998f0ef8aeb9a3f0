//! Generational genetic algorithm with tournament or roulette-wheel selection and elitism.
use super::*;
use crate::random::worker_rng;
use crate::tracker::{OptimalTracker, SharedTracker};
use itertools::Itertools;
use log::debug;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    /// The fittest of `tournament_size` individuals sampled with replacement.
    Tournament,
    /// An individual drawn with probability proportional to its fitness.
    RouletteWheel,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Crossover {
    /// A single cut point; each child takes the prefix of one parent and the suffix of the other.
    OnePoint,
    /// Two cut points; the children exchange the middle segment.
    TwoPoint,
    /// Every variable comes from either parent with equal probability.
    Uniform,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mutation {
    /// Flips each variable independently with `mutation_rate`.
    Random,
    /// One pass over the variables keeping every flip that raises the score.
    Greedy,
}

#[derive(Clone, Debug)]
pub struct GeneticParams {
    pub population_size: usize,
    pub tournament_size: usize,
    pub selection: Selection,
    /// Probability that an offspring is mutated at all.
    pub mutation_probability: f64,
    /// Per-variable flip probability of [`Mutation::Random`].
    pub mutation_rate: f64,
    /// Share of the population copied unchanged into the next generation, in percent.
    /// At least one individual is always kept.
    pub elite_percent: usize,
    pub max_generations: usize,
    /// Stop after this many generations without a new best score.
    pub max_stagnation: Option<usize>,
    pub crossover: Crossover,
    /// Breed from pools of this many selected parents instead of pairs. Every variable of
    /// a child is copied from a random pool member, and each pool yields half its size in
    /// children. `crossover` is unused when set.
    pub recombination_pool: Option<usize>,
    pub mutation: Mutation,
    /// Breed offspring pairs on the rayon pool.
    pub parallel: bool,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 100,
            tournament_size: 5,
            selection: Selection::Tournament,
            mutation_probability: 0.6,
            mutation_rate: 0.01,
            elite_percent: 5,
            max_generations: 1000,
            max_stagnation: Some(100),
            crossover: Crossover::TwoPoint,
            recombination_pool: None,
            mutation: Mutation::Random,
            parallel: true,
        }
    }
}

impl GeneticParams {
    /// Defaults for the memetic variant, where each generation is far more expensive.
    pub fn memetic() -> Self {
        Self {
            max_generations: 100,
            max_stagnation: Some(20),
            crossover: Crossover::Uniform,
            recombination_pool: Some(5),
            ..Default::default()
        }
    }

    /// Number of children produced by one breeding step.
    fn brood_size(&self) -> usize {
        match self.recombination_pool {
            Some(pool) => (pool / 2).max(1),
            None => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Individual {
    assignment: Assignment,
    fitness: Score,
}

impl Individual {
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// The cached score of the assignment.
    pub fn fitness(&self) -> Score {
        self.fitness
    }
}

/// What happens to every new individual before its fitness is recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Refinement {
    None,
    LocalSearch,
}

pub struct GeneticAlgorithm<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    params: GeneticParams,
    seed: u64,
    refinement: Refinement,
    population: Vec<Individual>,
    generation: usize,
    stagnation: usize,
    tracker: OptimalTracker,
    stats: TStats,
}

impl<'e, TStats: StatsStorage> GeneticAlgorithm<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, params: GeneticParams, seed: u64) -> Self {
        Self::with_refinement(evaluator, params, seed, Refinement::None)
    }

    pub(crate) fn with_refinement(
        evaluator: &'e Evaluator,
        params: GeneticParams,
        seed: u64,
        refinement: Refinement,
    ) -> Self {
        let variable_count = evaluator.instance().variable_count();

        let spawned = run_batch(params.population_size, params.parallel, |index| {
            let mut rng = worker_rng(seed, 0, index as u64);
            let mut stats = TStats::default();
            let assignment = Assignment::random(variable_count, &mut rng);
            (refine(evaluator, assignment, refinement, &mut stats), stats)
        });

        let mut stats = TStats::default();
        let mut population = Vec::with_capacity(spawned.len());
        for (individual, worker_stats) in spawned {
            stats.merge(worker_stats);
            population.push(individual);
        }

        let tracker = match population.iter().max_by_key(|x| x.fitness) {
            Some(best) => {
                OptimalTracker::new(best.assignment.clone(), best.fitness, evaluator.max_score())
            }
            None => {
                let assignment = Assignment::all_false(variable_count);
                stats.increment_full_evaluations();
                let score = evaluator.score(&assignment);
                OptimalTracker::new(assignment, score, evaluator.max_score())
            }
        };

        Self {
            evaluator,
            params,
            seed,
            refinement,
            population,
            generation: 0,
            stagnation: 0,
            tracker,
            stats,
        }
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Number of completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }

    fn elite_count(&self) -> usize {
        let size = self.population.len();
        (size * self.params.elite_percent / 100).max(1).min(size)
    }

    /// Replaces the population with the next generation.
    pub fn advance(&mut self) {
        let size = self.population.len();
        if size == 0 {
            return;
        }

        self.generation += 1;
        let best_before = self.tracker.score();

        let elite_count = self.elite_count();
        let mut next: Vec<Individual> = self
            .population
            .iter()
            .sorted_by(|a, b| b.fitness.cmp(&a.fitness))
            .take(elite_count)
            .cloned()
            .collect();

        let shared = SharedTracker::new(self.tracker.clone());
        let breeding = Breeding {
            evaluator: self.evaluator,
            params: &self.params,
            population: &self.population,
            seed: self.seed,
            generation: self.generation as u64,
            refinement: self.refinement,
            tracker: &shared,
            roulette: match self.params.selection {
                Selection::RouletteWheel => roulette_wheel(&self.population),
                Selection::Tournament => None,
            },
        };

        let brood = self.params.brood_size();
        let broods = (size - elite_count + brood - 1) / brood;
        let offspring = run_batch(broods, self.params.parallel, |index| {
            breeding.breed::<TStats>(index as u64)
        });

        for (children, worker_stats) in offspring {
            self.stats.merge(worker_stats);
            next.extend(children);
        }
        next.truncate(size);

        self.population = next;
        self.tracker = shared.into_inner();
        self.stats.increment_iterations();

        if self.tracker.score() > best_before {
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }

        debug!(
            "Generation {}: best {}, stagnation {}",
            self.generation,
            self.tracker.score(),
            self.stagnation
        );
    }

    fn is_finished(&self) -> bool {
        self.tracker.is_optimal()
            || self.population.is_empty()
            || self.generation >= self.params.max_generations
            || matches!(self.params.max_stagnation, Some(limit) if self.stagnation >= limit)
    }
}

impl<'e, TStats: StatsStorage> Solver for GeneticAlgorithm<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        while !self.is_finished() {
            self.advance();
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

/// Read-only view of one generation handed to the breeding workers.
struct Breeding<'a> {
    evaluator: &'a Evaluator,
    params: &'a GeneticParams,
    population: &'a [Individual],
    seed: u64,
    generation: u64,
    refinement: Refinement,
    tracker: &'a SharedTracker,
    /// `None` when every individual has fitness 0; selection is then uniform.
    roulette: Option<WeightedIndex<f64>>,
}

impl<'a> Breeding<'a> {
    fn breed<TStats: StatsStorage>(&self, index: u64) -> (Vec<Individual>, TStats) {
        let mut rng = worker_rng(self.seed, self.generation, index);
        let mut stats = TStats::default();

        let children = match self.params.recombination_pool {
            Some(pool) => {
                let parents: Vec<&Assignment> = (0..pool.max(1))
                    .map(|_| &self.select(&mut rng).assignment)
                    .collect();
                pool_recombination(&parents, self.params.brood_size(), &mut rng)
            }
            None => {
                let first = self.select(&mut rng);
                let second = self.select(&mut rng);
                let (a, b) = crossover(
                    self.params.crossover,
                    &first.assignment,
                    &second.assignment,
                    &mut rng,
                );
                vec![a, b]
            }
        };

        let children: Vec<Individual> = children
            .into_iter()
            .map(|child| {
                let child = self.mutate(child, &mut rng, &mut stats);
                let individual = refine(self.evaluator, child, self.refinement, &mut stats);
                if self.tracker.offer(&individual.assignment, individual.fitness) {
                    stats.increment_improvements();
                }
                individual
            })
            .collect();

        (children, stats)
    }

    fn select<R: Rng>(&self, rng: &mut R) -> &'a Individual {
        match (self.params.selection, &self.roulette) {
            (Selection::Tournament, _) => self.tournament(rng),
            (Selection::RouletteWheel, Some(wheel)) => &self.population[wheel.sample(rng)],
            (Selection::RouletteWheel, None) => {
                &self.population[rng.gen_range(0..self.population.len())]
            }
        }
    }

    /// Samples `tournament_size` individuals with replacement and returns the fittest.
    fn tournament<R: Rng>(&self, rng: &mut R) -> &'a Individual {
        let population = self.population;
        let mut best = &population[rng.gen_range(0..population.len())];
        for _ in 1..self.params.tournament_size {
            let candidate = &population[rng.gen_range(0..population.len())];
            if candidate.fitness > best.fitness {
                best = candidate;
            }
        }
        best
    }

    fn mutate<R: Rng, TStats: StatsStorage>(
        &self,
        mut assignment: Assignment,
        rng: &mut R,
        stats: &mut TStats,
    ) -> Assignment {
        if rng.gen::<f64>() >= self.params.mutation_probability {
            return assignment;
        }

        match self.params.mutation {
            Mutation::Random => {
                for variable in self.evaluator.instance().variables() {
                    if rng.gen::<f64>() < self.params.mutation_rate {
                        assignment.flip(variable);
                    }
                }
            }
            Mutation::Greedy => {
                stats.increment_full_evaluations();
                let mut score = self.evaluator.score(&assignment);
                for variable in self.evaluator.instance().variables() {
                    if let Some(new_score) =
                        try_flip(self.evaluator, &mut assignment, variable, score, stats, |x| {
                            x > score
                        })
                    {
                        score = new_score;
                    }
                }
            }
        }

        assignment
    }
}

/// Fitness-proportional sampling over `population`, or `None` if no individual has
/// positive fitness.
fn roulette_wheel(population: &[Individual]) -> Option<WeightedIndex<f64>> {
    WeightedIndex::new(population.iter().map(|x| x.fitness as f64)).ok()
}

/// Builds `count` children, copying every variable from a parent drawn uniformly from `parents`.
fn pool_recombination<R: Rng>(
    parents: &[&Assignment],
    count: usize,
    rng: &mut R,
) -> Vec<Assignment> {
    let length = parents.first().map_or(0, |x| x.len());
    (0..count)
        .map(|_| {
            let values = (0..length)
                .map(|i| parents[rng.gen_range(0..parents.len())].as_slice()[i])
                .collect();
            Assignment::new(values)
        })
        .collect()
}

/// Scores `assignment`, hill climbing first when `refinement` asks for it.
fn refine<TStats: StatsStorage>(
    evaluator: &Evaluator,
    mut assignment: Assignment,
    refinement: Refinement,
    stats: &mut TStats,
) -> Individual {
    stats.increment_full_evaluations();
    let mut fitness = evaluator.score(&assignment);

    if refinement == Refinement::LocalSearch {
        fitness = hill_climb(evaluator, &mut assignment, fitness, stats).0;
    }

    Individual {
        assignment,
        fitness,
    }
}

fn crossover<R: Rng>(
    kind: Crossover,
    first: &Assignment,
    second: &Assignment,
    rng: &mut R,
) -> (Assignment, Assignment) {
    let length = first.len();

    match kind {
        Crossover::OnePoint => {
            let cut = rng.gen_range(0..=length);
            recombine(first, second, |i| i < cut)
        }
        Crossover::TwoPoint => {
            let a = rng.gen_range(0..=length);
            let b = rng.gen_range(0..=length);
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            recombine(first, second, |i| i < low || i >= high)
        }
        Crossover::Uniform => {
            let mask: Vec<bool> = (0..length).map(|_| rng.gen()).collect();
            recombine(first, second, |i| mask[i])
        }
    }
}

/// Builds two children: the first takes position `i` from `first` where `keep(i)` holds
/// and from `second` elsewhere; the second child is its complement.
fn recombine<F>(first: &Assignment, second: &Assignment, keep: F) -> (Assignment, Assignment)
where
    F: Fn(usize) -> bool,
{
    let (a, b): (Vec<bool>, Vec<bool>) = first
        .iter()
        .zip(second.iter())
        .enumerate()
        .map(|(i, (x, y))| if keep(i) { (x, y) } else { (y, x) })
        .unzip();

    (Assignment::new(a), Assignment::new(b))
}
