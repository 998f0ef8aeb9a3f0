use clap::{ArgEnum, Parser};
use maxsat::cnf::*;
use maxsat::evaluator::{Evaluator, Verification};
use maxsat::sat::Solution;
use maxsat::search::{self, Strategy, MAX_BRUTE_FORCE_VARIABLES};
use maxsat::stats::NoStats;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;
use std::error::Error;

#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    #[clap(short, long, arg_enum, default_value_t = Implementation::LocalSearch)]
    implementation: Implementation,

    #[clap(short, long)]
    var_count: VariableType,

    #[clap(short, long)]
    clause_count: usize,

    #[clap(long)]
    min_clause_len: usize,

    #[clap(long)]
    max_clause_len: usize,

    /// Clause weights are drawn from `1..=max_weight`; 1 gives unweighted instances.
    #[clap(long, default_value_t = 1)]
    max_weight: Weight,

    #[clap(long)]
    iters: usize,

    #[clap(long)]
    recreate_seed: Option<String>,
}

#[derive(Debug, Eq, PartialEq, Clone, ArgEnum, Copy)]
enum Implementation {
    LocalSearch,
    Guided,
    Annealing,
    Genetic,
    Memetic,
    Colony,
    Tree,
}

impl Implementation {
    fn strategy(self) -> Strategy {
        match self {
            Implementation::LocalSearch => Strategy::LocalSearch,
            Implementation::Guided => Strategy::GuidedLocalSearch(Default::default()),
            Implementation::Annealing => Strategy::SimulatedAnnealing(Default::default()),
            Implementation::Genetic => Strategy::Genetic(Default::default()),
            Implementation::Memetic => Strategy::Memetic(search::GeneticParams::memetic()),
            Implementation::Colony => Strategy::AntColony(Default::default()),
            Implementation::Tree => Strategy::SolutionTree(Default::default()),
        }
    }
}

/// Rejects arguments for which no instance can be generated.
fn validate(args: &Args) -> Result<(), Box<dyn Error>> {
    if args.var_count == 0 {
        return Err("--var-count must be at least 1".into());
    }
    if args.var_count as usize > MAX_VARIABLE_COUNT {
        return Err(format!("--var-count may be at most {MAX_VARIABLE_COUNT}").into());
    }
    if args.min_clause_len > args.max_clause_len {
        return Err(format!(
            "--min-clause-len {} exceeds --max-clause-len {}",
            args.min_clause_len, args.max_clause_len
        )
        .into());
    }

    let max_total = (args.clause_count as Weight).checked_mul(args.max_weight.max(1));
    if !matches!(max_total, Some(total) if total <= MAX_TOTAL_WEIGHT) {
        return Err(format!("Clause weights may sum to more than {MAX_TOTAL_WEIGHT}").into());
    }
    Ok(())
}

fn gen_instance(args: &Args, seed: [u8; 16]) -> Instance {
    let mut rng: Pcg64Mcg = SeedableRng::from_seed(seed);
    let mut instance = Instance::new(args.var_count as usize);
    let clause_length = rng.gen_range(args.min_clause_len..=args.max_clause_len);
    for _ in 0..args.clause_count {
        let mut clause = Clause::new();
        for _ in 0..clause_length {
            let var = Variable::new(rng.gen_range(0..args.var_count));
            clause.add_variable(var, rng.gen());
        }
        let weight = rng.gen_range(1..=args.max_weight.max(1));
        instance.add_weighted_clause(clause, weight);
    }
    instance
}

fn parse_seed(seed_string: &str) -> Result<[u8; 16], Box<dyn Error>> {
    let bytes = seed_string
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|x| x.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()?;

    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| format!("Expected 16 seed bytes, got {}", bytes.len()).into())
}

/// Returns a description of the first violated property, if any.
fn check(evaluator: &Evaluator, solution: &Solution, reference: Option<Score>) -> Option<String> {
    if let Verification::Inconsistent { reported, actual } =
        evaluator.verify(solution.assignment(), solution.score())
    {
        return Some(format!("Reported score {reported}, actual score {actual}"));
    }

    if solution.is_optimal() != (solution.score() == evaluator.max_score()) {
        return Some(format!(
            "Optimum flag {} with score {} of {}",
            solution.is_optimal(),
            solution.score(),
            evaluator.max_score()
        ));
    }

    match reference {
        Some(optimum) if solution.score() > optimum => Some(format!(
            "Score {} exceeds the exhaustive optimum {optimum}",
            solution.score()
        )),
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    validate(&args)?;

    if let Some(ref seed_string) = args.recreate_seed {
        let seed = parse_seed(seed_string)?;
        println!("{}", gen_instance(&args, seed));
        return Ok(());
    }

    let mut seed_gen = thread_rng();
    for _ in 0..args.iters {
        let seed: [u8; 16] = seed_gen.gen();
        let instance = gen_instance(&args, seed);

        println!(
            "[{}]",
            seed.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        let evaluator = Evaluator::new(instance);
        let search_seed = u64::from_le_bytes([
            seed[0], seed[1], seed[2], seed[3], seed[4], seed[5], seed[6], seed[7],
        ]);
        let (solution, _) =
            search::solve::<NoStats>(&evaluator, args.implementation.strategy(), search_seed)?;

        let reference = if evaluator.instance().variable_count() <= MAX_BRUTE_FORCE_VARIABLES.min(20) {
            let (optimum, _) = search::solve::<NoStats>(&evaluator, Strategy::BruteForce, 0)?;
            Some(optimum.score())
        } else {
            None
        };

        match check(&evaluator, &solution, reference) {
            Some(problem) => {
                println!("{problem}");
                println!("{}", evaluator.instance());
                break;
            }
            None => println!("OK"),
        }
    }

    Ok(())
}
