//! Ant colony optimization.
//!
//! Every variable has a true node and a false node. An ant walks from the source through
//! one node per variable, so the branch taken for variable `v` depends on the node chosen
//! for `v - 1`. Pheromone lives on those edges; the heuristic of a branch is one plus the
//! weight of the clauses it would newly satisfy.
use super::*;
use crate::cnf::{Literal, VariableType};
use crate::random::{search_rng, worker_rng};
use crate::tracker::{OptimalTracker, SharedTracker};
use log::debug;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct ColonyParams {
    pub ants: usize,
    /// Pheromone exponent.
    pub alpha: f64,
    /// Heuristic exponent.
    pub beta: f64,
    /// Evaporation rate.
    pub rho: f64,
    /// Pheromone deposited by a walk satisfying every clause.
    pub q0: f64,
    /// Initial pheromone on every edge.
    pub tau0: f64,
    pub max_generations: usize,
    /// Hill climb the best walk of every n-th generation.
    pub refine_every: Option<usize>,
    pub parallel: bool,
}

impl Default for ColonyParams {
    fn default() -> Self {
        Self {
            ants: 100,
            alpha: 0.7,
            beta: 0.3,
            rho: 0.25,
            q0: 15.0,
            tau0: 10.0,
            max_generations: 100,
            refine_every: Some(5),
            parallel: true,
        }
    }
}

/// The probability of taking the true branch given the pheromone `tau` and heuristic
/// `eta` of both branches. Always within `[0, 1]`; degenerate inputs give `0.5`.
pub fn branch_probability(
    tau_true: f64,
    eta_true: f64,
    tau_false: f64,
    eta_false: f64,
    alpha: f64,
    beta: f64,
) -> f64 {
    let attraction_true = tau_true.powf(alpha) * eta_true.powf(beta);
    let attraction_false = tau_false.powf(alpha) * eta_false.powf(beta);

    let p = attraction_true / (attraction_true + attraction_false);
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Index of the node reached by assigning `value` to `variable`. Node 0 is the source.
#[inline]
fn node(variable: Variable, value: bool) -> usize {
    1 + 2 * variable.index() + value as usize
}

/// The node the decision for `variable` starts from on the path of `assignment`.
#[inline]
fn origin(assignment: &Assignment, variable: Variable) -> usize {
    match variable.index() {
        0 => 0,
        i => {
            let previous = Variable::new((i - 1) as VariableType);
            node(previous, assignment.get(previous))
        }
    }
}

pub struct AntColony<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    params: ColonyParams,
    seed: u64,
    /// Clauses containing each literal, indexed by [`Literal::as_raw`].
    occurrences: Vec<Vec<usize>>,
    /// Pheromone on the false and true edge leaving each node.
    pheromone: Vec<[f64; 2]>,
    generation: usize,
    tracker: OptimalTracker,
    stats: TStats,
}

impl<'e, TStats: StatsStorage> AntColony<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, params: ColonyParams, seed: u64) -> Self {
        let instance = evaluator.instance();
        let variable_count = instance.variable_count();

        let mut occurrences = vec![Vec::new(); 2 * variable_count];
        for (clause_index, clause) in instance.clauses().iter().enumerate() {
            for literal in clause.literals() {
                let list = &mut occurrences[literal.as_raw() as usize];
                if list.last() != Some(&clause_index) {
                    list.push(clause_index);
                }
            }
        }

        let nodes = 1 + 2 * variable_count.saturating_sub(1);
        let pheromone = vec![[params.tau0; 2]; nodes];

        let mut rng = search_rng(seed);
        let assignment = Assignment::random(variable_count, &mut rng);
        let mut stats = TStats::default();
        stats.increment_full_evaluations();
        let score = evaluator.score(&assignment);

        Self {
            evaluator,
            params,
            seed,
            occurrences,
            pheromone,
            generation: 0,
            tracker: OptimalTracker::new(assignment, score, evaluator.max_score()),
            stats,
        }
    }

    /// Pheromone on the false and true edge leaving each node; node 0 is the source.
    pub fn pheromone(&self) -> &[[f64; 2]] {
        &self.pheromone
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }

    /// Sends out one generation of ants and updates the pheromone.
    pub fn advance(&mut self) {
        self.generation += 1;

        let shared = SharedTracker::new(self.tracker.clone());
        let walk = Walk {
            evaluator: self.evaluator,
            params: &self.params,
            occurrences: &self.occurrences,
            pheromone: &self.pheromone,
            tracker: &shared,
        };

        let (seed, generation) = (self.seed, self.generation as u64);
        let walks = run_batch(self.params.ants, self.params.parallel, |ant| {
            let mut rng = worker_rng(seed, generation, ant as u64);
            walk.construct::<_, TStats>(&mut rng)
        });
        self.tracker = shared.into_inner();

        let mut best: Option<(Assignment, Score)> = None;
        for (assignment, score, worker_stats) in walks {
            self.stats.merge(worker_stats);
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((assignment, score));
            }
        }

        let (mut assignment, mut score) = match best {
            Some(best) => best,
            None => return,
        };

        if let Some(every) = self.params.refine_every {
            if every > 0 && self.generation % every == 0 {
                score = hill_climb(self.evaluator, &mut assignment, score, &mut self.stats).0;
                if self.tracker.offer(&assignment, score) {
                    self.stats.increment_improvements();
                }
            }
        }

        for edges in &mut self.pheromone {
            for tau in edges.iter_mut() {
                *tau *= 1.0 - self.params.rho;
            }
        }

        let max_score = self.evaluator.max_score();
        let deposit = if max_score == 0 {
            self.params.q0
        } else {
            self.params.q0 * score as f64 / max_score as f64
        };
        for variable in self.evaluator.instance().variables() {
            let from = origin(&assignment, variable);
            self.pheromone[from][assignment.get(variable) as usize] += deposit;
        }

        self.stats.increment_iterations();
        debug!(
            "Colony generation {}: generation best {}, best {}",
            self.generation,
            score,
            self.tracker.score()
        );
    }
}

impl<'e, TStats: StatsStorage> Solver for AntColony<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        while self.generation < self.params.max_generations
            && self.params.ants > 0
            && !self.tracker.is_optimal()
        {
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

/// Read-only view of the colony handed to the ants of one generation.
struct Walk<'a> {
    evaluator: &'a Evaluator,
    params: &'a ColonyParams,
    occurrences: &'a [Vec<usize>],
    pheromone: &'a [[f64; 2]],
    tracker: &'a SharedTracker,
}

impl<'a> Walk<'a> {
    /// Builds one assignment variable by variable and offers it to the tracker.
    fn construct<R: Rng, TStats: StatsStorage>(&self, rng: &mut R) -> (Assignment, Score, TStats) {
        let instance = self.evaluator.instance();
        let weights = instance.weights();
        let mut stats = TStats::default();

        let mut assignment = Assignment::all_false(instance.variable_count());
        let mut satisfied = vec![false; instance.clause_count()];

        let mut from = 0;
        for variable in instance.variables() {
            let eta = |value: bool| {
                let literal = Literal::new(variable, value);
                let newly_satisfied: Score = self.occurrences[literal.as_raw() as usize]
                    .iter()
                    .filter(|&&clause| !satisfied[clause])
                    .map(|&clause| weights[clause])
                    .sum();
                1.0 + newly_satisfied as f64
            };

            let [tau_false, tau_true] = self.pheromone[from];
            let p = branch_probability(
                tau_true,
                eta(true),
                tau_false,
                eta(false),
                self.params.alpha,
                self.params.beta,
            );

            let value = rng.gen::<f64>() < p;
            assignment.set(variable, value);
            for &clause in &self.occurrences[Literal::new(variable, value).as_raw() as usize] {
                satisfied[clause] = true;
            }
            from = node(variable, value);
        }

        stats.increment_full_evaluations();
        let score = self.evaluator.score(&assignment);
        if self.tracker.offer(&assignment, score) {
            stats.increment_improvements();
        }

        (assignment, score, stats)
    }
}
