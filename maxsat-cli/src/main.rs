use anyhow::Context;
use clap::{ArgEnum, Args, Parser, Subcommand};
use colored::Colorize;
use comfy_table::{CellAlignment, Table};
use log::info;
use maxsat::cnf::Instance;
use maxsat::evaluator::{Evaluator, Verification};
use maxsat::random::time_seed;
use maxsat::sat::Status;
use maxsat::search::{
    self, AnnealingParams, Calibration, ColonyParams, Cooling, Crossover, GeneticParams,
    GuidedParams, Mutation, Selection, Strategy, TreeParams,
};
use maxsat::stats::{NoStats, Stats};
use std::fs::File;
use std::io::{stdin, Read};
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(version)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// 64-bit unsigned integer seed; derived from the current time if not given.
    #[clap(short, long)]
    seed: Option<u64>,

    /// Do not calculate detailed stats; CPU time is still measured.
    #[clap(short, long)]
    no_stats: bool,

    /// The DIMACS (cnf or wcnf) input file.
    #[clap(group = "input")]
    input_file: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// First-improvement hill climbing from a random assignment.
    Local {
        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Guided local search with adaptive clause penalties.
    Guided {
        /// Number of penalty updates.
        #[clap(long)]
        max_trials: Option<usize>,

        /// Penalty multiplier.
        #[clap(long)]
        lambda: Option<f64>,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Simulated annealing over random flips.
    Annealing {
        #[clap(long)]
        initial_temperature: Option<f64>,

        #[clap(long, arg_enum)]
        cooling: Option<CoolingSchedule>,

        #[clap(long)]
        cooling_factor: Option<f64>,

        #[clap(long)]
        max_iterations: Option<u64>,

        #[clap(long)]
        min_temperature: Option<f64>,

        /// Estimate the initial temperature from this many random flips.
        #[clap(long)]
        calibration_flips: Option<usize>,

        /// Multiplier applied to the mean score change of the calibration walk.
        #[clap(long, default_value_t = 1.0)]
        calibration_scale: f64,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Genetic algorithm with tournament or roulette-wheel selection and elitism.
    Genetic {
        #[clap(flatten)]
        genetic: GeneticArgs,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Genetic algorithm that hill climbs every individual.
    Memetic {
        #[clap(flatten)]
        genetic: GeneticArgs,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Ant colony optimization.
    Colony {
        #[clap(long)]
        ants: Option<usize>,

        #[clap(long)]
        alpha: Option<f64>,

        #[clap(long)]
        beta: Option<f64>,

        /// Evaporation rate.
        #[clap(long)]
        rho: Option<f64>,

        #[clap(long)]
        q0: Option<f64>,

        /// Initial pheromone.
        #[clap(long)]
        tau0: Option<f64>,

        #[clap(long)]
        max_generations: Option<usize>,

        /// Hill climb the best walk of every n-th generation; 0 disables it.
        #[clap(long)]
        refine_every: Option<usize>,

        /// Construct the walks of a generation on a single thread.
        #[clap(long)]
        sequential: bool,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Stochastic solution tree search.
    Tree {
        #[clap(long)]
        branching_factor: Option<usize>,

        #[clap(long)]
        max_depth: Option<usize>,

        #[clap(long)]
        max_grows: Option<usize>,

        #[clap(long)]
        max_width: Option<usize>,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Exhaustive enumeration; only for small instances.
    BruteForce {
        #[clap(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct GeneticArgs {
    #[clap(long)]
    population_size: Option<usize>,

    #[clap(long)]
    tournament_size: Option<usize>,

    #[clap(long, arg_enum)]
    selection: Option<SelectionOperator>,

    /// Probability that an offspring is mutated.
    #[clap(long)]
    mutation_probability: Option<f64>,

    /// Per-variable flip probability of random mutation.
    #[clap(long)]
    mutation_rate: Option<f64>,

    #[clap(long)]
    elite_percent: Option<usize>,

    #[clap(long)]
    max_generations: Option<usize>,

    /// Generations without improvement before stopping; 0 disables the limit.
    #[clap(long)]
    max_stagnation: Option<usize>,

    #[clap(long, arg_enum)]
    crossover: Option<CrossoverOperator>,

    /// Breed from pools of this many parents, each variable copied from a random
    /// pool member; 0 pairs parents through the crossover operator.
    #[clap(long)]
    recombination_pool: Option<usize>,

    #[clap(long, arg_enum)]
    mutation: Option<MutationOperator>,

    /// Breed offspring on a single thread.
    #[clap(long)]
    sequential: bool,
}

#[derive(Debug, Eq, PartialEq, Clone, ArgEnum)]
enum CoolingSchedule {
    Geometric,
    Logarithmic,
}

#[derive(Debug, Eq, PartialEq, Clone, ArgEnum)]
enum SelectionOperator {
    Tournament,
    RouletteWheel,
}

#[derive(Debug, Eq, PartialEq, Clone, ArgEnum)]
enum CrossoverOperator {
    OnePoint,
    TwoPoint,
    Uniform,
}

#[derive(Debug, Eq, PartialEq, Clone, ArgEnum)]
enum MutationOperator {
    Random,
    Greedy,
}

impl GeneticArgs {
    fn apply(self, mut params: GeneticParams) -> GeneticParams {
        if let Some(x) = self.population_size {
            params.population_size = x;
        }
        if let Some(x) = self.tournament_size {
            params.tournament_size = x;
        }
        if let Some(x) = self.selection {
            params.selection = match x {
                SelectionOperator::Tournament => Selection::Tournament,
                SelectionOperator::RouletteWheel => Selection::RouletteWheel,
            };
        }
        if let Some(x) = self.mutation_probability {
            params.mutation_probability = x;
        }
        if let Some(x) = self.mutation_rate {
            params.mutation_rate = x;
        }
        if let Some(x) = self.elite_percent {
            params.elite_percent = x;
        }
        if let Some(x) = self.max_generations {
            params.max_generations = x;
        }
        if let Some(x) = self.max_stagnation {
            params.max_stagnation = (x > 0).then(|| x);
        }
        if let Some(x) = self.crossover {
            params.crossover = match x {
                CrossoverOperator::OnePoint => Crossover::OnePoint,
                CrossoverOperator::TwoPoint => Crossover::TwoPoint,
                CrossoverOperator::Uniform => Crossover::Uniform,
            };
        }
        if let Some(x) = self.recombination_pool {
            params.recombination_pool = (x > 0).then(|| x);
        }
        if let Some(x) = self.mutation {
            params.mutation = match x {
                MutationOperator::Random => Mutation::Random,
                MutationOperator::Greedy => Mutation::Greedy,
            };
        }
        params.parallel &= !self.sequential;
        params
    }
}

impl Commands {
    fn into_strategy(self) -> (Strategy, CommonArgs) {
        match self {
            Commands::Local { common } => (Strategy::LocalSearch, common),
            Commands::Guided {
                max_trials,
                lambda,
                common,
            } => {
                let defaults = GuidedParams::default();
                let params = GuidedParams {
                    max_trials: max_trials.unwrap_or(defaults.max_trials),
                    lambda: lambda.unwrap_or(defaults.lambda),
                };
                (Strategy::GuidedLocalSearch(params), common)
            }
            Commands::Annealing {
                initial_temperature,
                cooling,
                cooling_factor,
                max_iterations,
                min_temperature,
                calibration_flips,
                calibration_scale,
                common,
            } => {
                let defaults = AnnealingParams::default();
                let cooling = match cooling {
                    Some(CoolingSchedule::Geometric) => Cooling::GEOMETRIC,
                    Some(CoolingSchedule::Logarithmic) => Cooling::LOGARITHMIC,
                    None => defaults.cooling,
                };
                let cooling = match cooling_factor {
                    Some(factor) => cooling.with_factor(factor),
                    None => cooling,
                };
                let params = AnnealingParams {
                    initial_temperature: initial_temperature
                        .unwrap_or(defaults.initial_temperature),
                    cooling,
                    max_iterations: max_iterations.unwrap_or(defaults.max_iterations),
                    min_temperature: min_temperature.unwrap_or(defaults.min_temperature),
                    calibration: calibration_flips.map(|flips| Calibration {
                        flips,
                        scale: calibration_scale,
                    }),
                };
                (Strategy::SimulatedAnnealing(params), common)
            }
            Commands::Genetic { genetic, common } => (
                Strategy::Genetic(genetic.apply(GeneticParams::default())),
                common,
            ),
            Commands::Memetic { genetic, common } => (
                Strategy::Memetic(genetic.apply(GeneticParams::memetic())),
                common,
            ),
            Commands::Colony {
                ants,
                alpha,
                beta,
                rho,
                q0,
                tau0,
                max_generations,
                refine_every,
                sequential,
                common,
            } => {
                let defaults = ColonyParams::default();
                let params = ColonyParams {
                    ants: ants.unwrap_or(defaults.ants),
                    alpha: alpha.unwrap_or(defaults.alpha),
                    beta: beta.unwrap_or(defaults.beta),
                    rho: rho.unwrap_or(defaults.rho),
                    q0: q0.unwrap_or(defaults.q0),
                    tau0: tau0.unwrap_or(defaults.tau0),
                    max_generations: max_generations.unwrap_or(defaults.max_generations),
                    refine_every: match refine_every {
                        Some(0) => None,
                        Some(x) => Some(x),
                        None => defaults.refine_every,
                    },
                    parallel: defaults.parallel && !sequential,
                };
                (Strategy::AntColony(params), common)
            }
            Commands::Tree {
                branching_factor,
                max_depth,
                max_grows,
                max_width,
                common,
            } => {
                let defaults = TreeParams::default();
                let params = TreeParams {
                    branching_factor: branching_factor.unwrap_or(defaults.branching_factor),
                    max_depth: max_depth.unwrap_or(defaults.max_depth),
                    max_grows: max_grows.unwrap_or(defaults.max_grows),
                    max_width: max_width.unwrap_or(defaults.max_width),
                };
                (Strategy::SolutionTree(params), common)
            }
            Commands::BruteForce { common } => (Strategy::BruteForce, common),
        }
    }
}

fn read_input(input_file: Option<String>) -> anyhow::Result<Instance> {
    let mut input = String::new();
    if let Some(path) = input_file {
        let mut f = File::open(&path).with_context(|| format!("Failed to open {path}"))?;
        f.read_to_string(&mut input)
            .with_context(|| format!("Failed to read {path}"))?;
    } else {
        stdin()
            .read_to_string(&mut input)
            .context("Failed to read standard input")?;
    }

    Ok(Instance::parse_dimacs(&input)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!(
        "c {} {}",
        "maxsat".bright_yellow(),
        env!("CARGO_PKG_VERSION")
    );

    let (strategy, common) = cli.command.into_strategy();
    let instance = read_input(common.input_file)?;
    println!(
        "c {} variables, {} clauses, maximum score {}",
        instance.variable_count(),
        instance.clause_count(),
        instance.max_score()
    );

    let seed = match common.seed {
        Some(seed) => seed,
        None => {
            let seed = time_seed();
            println!("c Using random seed {seed}");
            seed
        }
    };

    let evaluator = Evaluator::new(instance);
    info!("Built the affected clause index");

    let start_time = Instant::now();
    let (solution, stats) = if !common.no_stats {
        let (solution, stats) = search::solve::<Stats>(&evaluator, strategy, seed)?;
        (solution, Some(stats))
    } else {
        let (solution, _) = search::solve::<NoStats>(&evaluator, strategy, seed)?;
        (solution, None)
    };
    let elapsed_time = start_time.elapsed();

    println!("c");
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED);
    table.set_header(vec!["Stat", "Total", "/s"]);
    for column in 1..=2 {
        if let Some(column) = table.get_column_mut(column) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table.add_row(vec![
        "Time spent",
        &format!("{:.4}s", elapsed_time.as_secs_f64()),
    ]);

    let per_sec = |value: u64| -> String {
        let stat = value as f64 / elapsed_time.as_secs_f64();
        format!("{:.1}", stat)
    };

    if let Some(stats) = stats {
        table.add_row(vec![
            "Flips evaluated",
            &stats.flips().to_string(),
            &per_sec(stats.flips()),
        ]);
        table.add_row(vec![
            "Improvements",
            &stats.improvements().to_string(),
            &per_sec(stats.improvements()),
        ]);
        table.add_row(vec![
            "Iterations",
            &stats.iterations().to_string(),
            &per_sec(stats.iterations()),
        ]);
        table.add_row(vec![
            "Full evaluations",
            &stats.full_evaluations().to_string(),
            &per_sec(stats.full_evaluations()),
        ]);
    } else {
        table.add_row(vec!["Flips evaluated", "not tracked"]);
        table.add_row(vec!["Improvements", "not tracked"]);
    }
    for line in table.lines() {
        println!("c {line}");
    }
    println!("c");

    if let Verification::Inconsistent { reported, actual } =
        evaluator.verify(solution.assignment(), solution.score())
    {
        println!(
            "c {} reported score is {reported}, actual score is {actual}",
            "Found solution is inconsistent:".red()
        );
    }

    match solution.status() {
        Status::OptimumFound => println!("s {}", solution.status().to_string().green()),
        Status::Unknown => println!("s {}", solution.status().to_string().yellow()),
    }
    println!(
        "c {} of {} clauses satisfied",
        evaluator.count_satisfied(solution.assignment()),
        evaluator.instance().clause_count()
    );
    println!("o {}", solution.score());
    println!("v {}", solution.assignment());

    Ok(())
}
