use std::fs::File;
use std::io::Read;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use maxsat::cnf::{Assignment, Instance};
use maxsat::evaluator::Evaluator;
use maxsat::random::search_rng;
use maxsat::search::{
    self, AnnealingParams, ColonyParams, GeneticParams, GuidedParams, Strategy, TreeParams,
};
use maxsat::stats::{NoStats, Stats};

/// Compares rescoring single flips incrementally against scoring from scratch.
fn rescore_random3_50(c: &mut Criterion) {
    let evaluator = Evaluator::new(load_instance("random3_50"));
    let mut rng = search_rng(0);
    let assignment = Assignment::random(evaluator.instance().variable_count(), &mut rng);
    let score = evaluator.score(&assignment);

    let mut group = c.benchmark_group("rescore");
    group.bench_with_input(BenchmarkId::new("incremental", "random3_50"), &assignment, |b, assignment| {
        let mut assignment = assignment.clone();
        b.iter(|| {
            let mut total = 0;
            for variable in evaluator.instance().variables() {
                assignment.flip(variable);
                total += evaluator.rescore_flip(&assignment, variable, score);
                assignment.flip(variable);
            }
            total
        })
    });

    group.bench_with_input(BenchmarkId::new("full", "random3_50"), &assignment, |b, assignment| {
        let mut assignment = assignment.clone();
        b.iter(|| {
            let mut total = 0;
            for variable in evaluator.instance().variables() {
                assignment.flip(variable);
                total += evaluator.score(&assignment);
                assignment.flip(variable);
            }
            total
        })
    });
    group.finish();
}

fn strategies_random3_50(c: &mut Criterion) {
    let evaluator = Evaluator::new(load_instance("random3_50"));
    let strategies = [
        ("local_search", Strategy::LocalSearch),
        (
            "guided",
            Strategy::GuidedLocalSearch(GuidedParams {
                max_trials: 20,
                ..Default::default()
            }),
        ),
        (
            "annealing",
            Strategy::SimulatedAnnealing(AnnealingParams {
                max_iterations: 10_000,
                ..Default::default()
            }),
        ),
        (
            "genetic",
            Strategy::Genetic(GeneticParams {
                max_generations: 20,
                ..Default::default()
            }),
        ),
        (
            "memetic",
            Strategy::Memetic(GeneticParams {
                population_size: 20,
                max_generations: 5,
                ..GeneticParams::memetic()
            }),
        ),
        (
            "colony",
            Strategy::AntColony(ColonyParams {
                max_generations: 5,
                ..Default::default()
            }),
        ),
        (
            "tree",
            Strategy::SolutionTree(TreeParams {
                max_grows: 20,
                ..Default::default()
            }),
        ),
    ];

    let mut group = c.benchmark_group("search");
    group.sample_size(10);
    for (name, strategy) in strategies {
        group.bench_with_input(BenchmarkId::new(format!("{name}-nostats"), "random3_50"), &strategy, |b, strategy| {
            b.iter(|| search::solve::<NoStats>(&evaluator, strategy.clone(), 7))
        });

        group.bench_with_input(BenchmarkId::new(format!("{name}-stats"), "random3_50"), &strategy, |b, strategy| {
            b.iter(|| search::solve::<Stats>(&evaluator, strategy.clone(), 7))
        });
    }
    group.finish();
}

fn load_instance(name: &str) -> Instance {
    let path = format!("{}/tests/cnf/{name}.cnf", env!("CARGO_MANIFEST_DIR"));
    let mut input = String::new();
    let mut f = File::open(path).expect("Failed to open provided file");
    f.read_to_string(&mut input).expect("Failed to read provided file");

    Instance::parse_dimacs(&input).expect("Failed to parse DIMACS")
}

criterion_group!(benches, rescore_random3_50, strategies_random3_50);

criterion_main!(benches);
