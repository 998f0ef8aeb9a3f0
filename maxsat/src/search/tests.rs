use super::*;
use crate::cnf::{Clause, Instance, Literal};
use crate::evaluator::Verification;
use crate::sat::Status;
use crate::stats::Stats;

/// Selects the strategy a generic test runs, with budgets small enough for tests.
trait StrategyCase {
    fn strategy() -> Strategy;
}

struct Local;
struct Guided;
struct Annealing;
struct Genetic;
struct Memetic;
struct Colony;
struct Tree;
struct Exhaustive;

impl StrategyCase for Local {
    fn strategy() -> Strategy {
        Strategy::LocalSearch
    }
}

impl StrategyCase for Guided {
    fn strategy() -> Strategy {
        Strategy::GuidedLocalSearch(GuidedParams {
            max_trials: 20,
            ..Default::default()
        })
    }
}

impl StrategyCase for Annealing {
    fn strategy() -> Strategy {
        Strategy::SimulatedAnnealing(AnnealingParams {
            max_iterations: 20_000,
            ..Default::default()
        })
    }
}

impl StrategyCase for Genetic {
    fn strategy() -> Strategy {
        Strategy::Genetic(GeneticParams {
            population_size: 30,
            mutation_rate: 0.1,
            max_generations: 100,
            max_stagnation: Some(30),
            ..Default::default()
        })
    }
}

impl StrategyCase for Memetic {
    fn strategy() -> Strategy {
        Strategy::Memetic(GeneticParams {
            population_size: 10,
            max_generations: 10,
            ..GeneticParams::memetic()
        })
    }
}

impl StrategyCase for Colony {
    fn strategy() -> Strategy {
        Strategy::AntColony(ColonyParams {
            ants: 20,
            max_generations: 20,
            ..Default::default()
        })
    }
}

impl StrategyCase for Tree {
    fn strategy() -> Strategy {
        Strategy::SolutionTree(TreeParams {
            max_grows: 100,
            ..Default::default()
        })
    }
}

impl StrategyCase for Exhaustive {
    fn strategy() -> Strategy {
        Strategy::BruteForce
    }
}

fn clause(raw: &[i64]) -> Clause {
    raw.iter().map(|&x| Literal::from_dimacs(x)).collect()
}

fn run<TCase: StrategyCase>(evaluator: &Evaluator, seed: u64) -> Solution {
    let (solution, _) = solve::<Stats>(evaluator, TCase::strategy(), seed).unwrap();
    assert_eq!(
        evaluator.verify(solution.assignment(), solution.score()),
        Verification::Consistent
    );
    assert_eq!(solution.is_optimal(), solution.score() == evaluator.max_score());
    solution
}

#[generic_tests::define]
mod strategies {
    use super::*;

    #[instantiate_tests(<Local>)]
    mod local_search {}

    #[instantiate_tests(<Guided>)]
    mod guided_local_search {}

    #[instantiate_tests(<Annealing>)]
    mod simulated_annealing {}

    #[instantiate_tests(<Genetic>)]
    mod genetic {}

    #[instantiate_tests(<Memetic>)]
    mod memetic {}

    #[instantiate_tests(<Colony>)]
    mod ant_colony {}

    #[instantiate_tests(<Tree>)]
    mod solution_tree {}

    #[instantiate_tests(<Exhaustive>)]
    mod brute_force {}

    #[test]
    fn example_is_solved<TCase: StrategyCase>() {
        let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/example.cnf")).unwrap();
        let evaluator = Evaluator::new(instance);

        for seed in 0..5 {
            let solution = run::<TCase>(&evaluator, seed);
            assert_eq!(solution.score(), 2);
            assert_eq!(solution.status(), Status::OptimumFound);
        }
    }

    #[test]
    fn weighted_unit_clauses_are_satisfied<TCase: StrategyCase>() {
        let mut instance = Instance::new(8);
        for v in 1..=8 {
            let literal = if v % 3 == 0 { -v } else { v };
            instance.add_weighted_clause(clause(&[literal]), v as u64);
        }
        let evaluator = Evaluator::new(instance);

        let solution = run::<TCase>(&evaluator, 42);
        assert!(solution.is_optimal());
        assert_eq!(solution.score(), 36);
    }

    #[test]
    fn contradiction_is_never_certified<TCase: StrategyCase>() {
        let mut instance = Instance::new(2);
        instance.add_clause(clause(&[1]));
        instance.add_clause(clause(&[-1]));
        instance.add_clause(clause(&[2]));
        let evaluator = Evaluator::new(instance);

        let solution = run::<TCase>(&evaluator, 7);
        assert_eq!(solution.score(), 2);
        assert_eq!(solution.status(), Status::Unknown);
    }

    #[test]
    fn empty_clause_is_never_satisfied<TCase: StrategyCase>() {
        let mut instance = Instance::new(2);
        instance.add_clause(Clause::new());
        instance.add_clause(clause(&[1, 2]));
        let evaluator = Evaluator::new(instance);

        let solution = run::<TCase>(&evaluator, 3);
        assert_eq!(solution.score(), 1);
        assert!(!solution.is_optimal());
    }

    #[test]
    fn empty_instance_is_optimal<TCase: StrategyCase>() {
        let evaluator = Evaluator::new(Instance::new(0));

        let solution = run::<TCase>(&evaluator, 0);
        assert!(solution.is_optimal());
        assert_eq!(solution.score(), 0);
        assert!(solution.assignment().is_empty());
    }

    #[test]
    fn random_instance_is_consistent<TCase: StrategyCase>() {
        let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/random3_50.cnf")).unwrap();
        let evaluator = Evaluator::new(instance);
        if matches!(TCase::strategy(), Strategy::BruteForce) {
            return;
        }

        let solution = run::<TCase>(&evaluator, 1234);
        // A random assignment satisfies 7/8 of the clauses on average.
        assert!(solution.score() >= 7 * evaluator.max_score() / 8);
    }

    #[test]
    fn weighted_fixture_is_consistent<TCase: StrategyCase>() {
        let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/weighted.wcnf")).unwrap();
        let evaluator = Evaluator::new(instance);

        let solution = run::<TCase>(&evaluator, 5);
        assert!(solution.score() <= 21);
    }
}

#[test]
fn brute_force_is_refused_above_the_limit() {
    let evaluator = Evaluator::new(Instance::new(MAX_BRUTE_FORCE_VARIABLES + 1));
    assert!(matches!(
        solve::<Stats>(&evaluator, Strategy::BruteForce, 0),
        Err(Error::TooManyVariables { .. })
    ));
}

#[test]
fn local_search_never_loses_to_its_start() {
    let instance = Instance::parse_dimacs(include_str!("../../tests/cnf/random3_50.cnf")).unwrap();
    let evaluator = Evaluator::new(instance);

    for seed in 0..10 {
        let mut rng = crate::random::search_rng(seed);
        let start = Assignment::random(evaluator.instance().variable_count(), &mut rng);
        let start_score = evaluator.score(&start);

        let (solution, _) = solve::<Stats>(&evaluator, Strategy::LocalSearch, seed).unwrap();
        assert!(solution.score() >= start_score);
    }
}
