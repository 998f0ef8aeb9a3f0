//! Simulated annealing over random single flips with the Metropolis acceptance rule.
use super::*;
use crate::cnf::VariableType;
use crate::random::{search_rng, SearchRng};
use crate::tracker::OptimalTracker;
use log::debug;
use rand::Rng;

/// How the temperature decreases after each iteration.
#[derive(Copy, Clone, Debug)]
pub enum Cooling {
    /// `t *= factor`
    Geometric { factor: f64 },
    /// `t /= 1 + factor * ln(iteration + 1)`
    Logarithmic { factor: f64 },
}

impl Cooling {
    pub const GEOMETRIC: Cooling = Cooling::Geometric { factor: 0.999 };
    pub const LOGARITHMIC: Cooling = Cooling::Logarithmic { factor: 1.0 };

    /// The same schedule with another factor.
    pub fn with_factor(self, factor: f64) -> Self {
        match self {
            Cooling::Geometric { .. } => Cooling::Geometric { factor },
            Cooling::Logarithmic { .. } => Cooling::Logarithmic { factor },
        }
    }
}

/// Estimates the initial temperature from a short random walk.
#[derive(Copy, Clone, Debug)]
pub struct Calibration {
    /// Number of random flips performed before the main loop.
    pub flips: usize,
    /// The initial temperature is the mean absolute score change times this factor.
    pub scale: f64,
}

#[derive(Clone, Debug)]
pub struct AnnealingParams {
    pub initial_temperature: f64,
    pub cooling: Cooling,
    pub max_iterations: u64,
    /// The run stops once the temperature drops below this value.
    pub min_temperature: f64,
    pub calibration: Option<Calibration>,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            initial_temperature: 5.0,
            cooling: Cooling::GEOMETRIC,
            max_iterations: 100_000,
            min_temperature: 1e-6,
            calibration: None,
        }
    }
}

pub struct SimulatedAnnealing<'e, TStats: StatsStorage> {
    evaluator: &'e Evaluator,
    params: AnnealingParams,
    rng: SearchRng,
    temperature: f64,
    iteration: u64,
    tracker: OptimalTracker,
    stats: TStats,
}

/// The probability of accepting a move that changes the score by `delta` relative to
/// the reference score. Always within `[0, 1]`.
pub fn acceptance_probability(delta: f64, temperature: f64) -> f64 {
    if delta >= 0.0 {
        1.0
    } else if temperature > 0.0 {
        (delta / temperature).exp().clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl<'e, TStats: StatsStorage> SimulatedAnnealing<'e, TStats> {
    pub fn new(evaluator: &'e Evaluator, params: AnnealingParams, seed: u64) -> Self {
        let mut rng = search_rng(seed);
        let assignment = Assignment::random(evaluator.instance().variable_count(), &mut rng);

        let mut stats = TStats::default();
        stats.increment_full_evaluations();
        let score = evaluator.score(&assignment);

        Self {
            evaluator,
            temperature: params.initial_temperature,
            params,
            rng,
            iteration: 0,
            tracker: OptimalTracker::new(assignment, score, evaluator.max_score()),
            stats,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn stats(&self) -> &TStats {
        &self.stats
    }

    fn random_variable(&mut self) -> Variable {
        let count = self.evaluator.instance().variable_count();
        Variable::new(self.rng.gen_range(0..count) as VariableType)
    }

    /// Performs the calibration walk and returns the estimated temperature.
    fn calibrate(&mut self, calibration: Calibration, assignment: &mut Assignment, score: &mut Score) -> f64 {
        let mut total_change: u64 = 0;

        for _ in 0..calibration.flips {
            let variable = self.random_variable();
            let new_score = try_flip(
                self.evaluator,
                assignment,
                variable,
                *score,
                &mut self.stats,
                |_| true,
            )
            .unwrap_or(*score);

            total_change += new_score.abs_diff(*score);
            *score = new_score;
            if self.tracker.offer_with(*score, || assignment.clone()) {
                self.stats.increment_improvements();
            }
        }

        let mean_change = total_change as f64 / calibration.flips.max(1) as f64;
        if mean_change > 0.0 {
            calibration.scale * mean_change
        } else {
            self.params.initial_temperature
        }
    }

    fn cool(&mut self) {
        match self.params.cooling {
            Cooling::Geometric { factor } => self.temperature *= factor,
            Cooling::Logarithmic { factor } => {
                self.temperature /= 1.0 + factor * ((self.iteration + 1) as f64).ln()
            }
        }
    }
}

impl<'e, TStats: StatsStorage> Solver for SimulatedAnnealing<'e, TStats> {
    type Stats = TStats;

    fn solve(&mut self) {
        if self.evaluator.instance().variable_count() == 0 {
            return;
        }

        let mut assignment = self.tracker.assignment().clone();
        let mut score = self.tracker.score();

        if let Some(calibration) = self.params.calibration {
            if self.iteration == 0 {
                self.temperature = self.calibrate(calibration, &mut assignment, &mut score);
                debug!("Calibrated initial temperature {}", self.temperature);
            }
        }

        while self.iteration < self.params.max_iterations {
            if self.tracker.is_optimal() || !(self.temperature >= self.params.min_temperature) {
                break;
            }

            let variable = self.random_variable();
            let best = self.tracker.score();
            let temperature = self.temperature;
            let draw: f64 = self.rng.gen();

            let accepted = try_flip(
                self.evaluator,
                &mut assignment,
                variable,
                score,
                &mut self.stats,
                |new_score| {
                    new_score > score
                        || draw < acceptance_probability(new_score as f64 - best as f64, temperature)
                },
            );

            if let Some(new_score) = accepted {
                score = new_score;
                if self.tracker.offer_with(score, || assignment.clone()) {
                    self.stats.increment_improvements();
                }
            }

            self.cool();
            self.iteration += 1;
            self.stats.increment_iterations();
        }

        debug!(
            "Annealing stopped after {} iterations at temperature {}",
            self.iteration, self.temperature
        );
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
    use crate::stats::{NoStats, Stats};
    use rand::SeedableRng;

    fn contradiction() -> Evaluator {
        let mut instance = Instance::new(1);
        instance.add_clause([1].into_iter().map(Literal::from_dimacs).collect::<Clause>());
        instance.add_clause([-1].into_iter().map(Literal::from_dimacs).collect::<Clause>());
        Evaluator::new(instance)
    }

    #[test]
    fn acceptance_probability_is_well_formed() {
        let mut rng = SearchRng::seed_from_u64(1);
        for _ in 0..1000 {
            let delta: f64 = rng.gen_range(-1000.0..1000.0);
            let temperature: f64 = rng.gen_range(0.0..100.0);
            let p = acceptance_probability(delta, temperature);
            assert!((0.0..=1.0).contains(&p));
        }

        assert_eq!(acceptance_probability(3.0, 0.5), 1.0);
        assert_eq!(acceptance_probability(-1.0, 0.0), 0.0);
        assert!((acceptance_probability(-1.0, 1.0) - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn cooling_factor_keeps_schedule() {
        assert!(matches!(
            AnnealingParams::default().cooling,
            Cooling::Geometric { factor } if factor == 0.999
        ));
        assert!(matches!(
            Cooling::LOGARITHMIC.with_factor(2.5),
            Cooling::Logarithmic { factor } if factor == 2.5
        ));
        assert!(matches!(
            Cooling::GEOMETRIC.with_factor(0.9),
            Cooling::Geometric { factor } if factor == 0.9
        ));
    }

    #[test]
    fn geometric_cooling_stops_at_min_temperature() {
        let evaluator = contradiction();
        let params = AnnealingParams {
            initial_temperature: 1.0,
            cooling: Cooling::Geometric { factor: 0.5 },
            max_iterations: 1_000,
            min_temperature: 0.01,
            calibration: None,
        };

        let mut annealing = SimulatedAnnealing::<NoStats>::new(&evaluator, params, 9);
        annealing.solve();

        // 1 * 0.5^7 < 0.01 <= 1 * 0.5^6
        assert_eq!(annealing.iteration(), 7);
        assert!(annealing.temperature() < 0.01);
        assert_eq!(annealing.best_score(), 1);
        assert!(!annealing.is_optimal());
    }

    #[test]
    fn logarithmic_cooling_is_monotone() {
        let evaluator = contradiction();
        let params = AnnealingParams {
            initial_temperature: 10.0,
            cooling: Cooling::Logarithmic { factor: 0.1 },
            max_iterations: 50,
            min_temperature: 0.0,
            calibration: None,
        };

        let mut annealing = SimulatedAnnealing::<NoStats>::new(&evaluator, params, 9);
        let mut previous = annealing.temperature();
        for _ in 0..50 {
            annealing.cool();
            annealing.iteration += 1;
            assert!(annealing.temperature() <= previous);
            previous = annealing.temperature();
        }
        assert!(previous < 10.0);
    }

    #[test]
    fn calibration_sets_temperature_from_mean_change() {
        // Every flip of the single variable changes the score by exactly 3.
        let mut instance = Instance::new(1);
        instance.add_weighted_clause([1].into_iter().map(Literal::from_dimacs).collect(), 3);
        instance.add_weighted_clause([1, -1].into_iter().map(Literal::from_dimacs).collect(), 1);
        let evaluator = Evaluator::new(instance);

        let params = AnnealingParams {
            max_iterations: 0,
            calibration: Some(Calibration {
                flips: 10,
                scale: 2.0,
            }),
            ..Default::default()
        };

        let mut annealing = SimulatedAnnealing::<Stats>::new(&evaluator, params, 4);
        annealing.solve();

        assert!((annealing.temperature() - 6.0).abs() < 1e-12);
        assert_eq!(annealing.stats().flips(), 10);
    }

    #[test]
    fn tracked_score_matches_recomputation() {
        let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/random3_50.cnf")).unwrap();
        let evaluator = Evaluator::new(instance);
        let params = AnnealingParams {
            max_iterations: 20_000,
            calibration: Some(Calibration {
                flips: 200,
                scale: 1.5,
            }),
            ..Default::default()
        };

        let mut annealing = SimulatedAnnealing::<NoStats>::new(&evaluator, params, 21);
        annealing.solve();

        assert_eq!(evaluator.score(annealing.best_assignment()), annealing.best_score());
    }
}
