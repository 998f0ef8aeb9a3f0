//! Incremental local search and metaheuristics for (weighted) MaxSAT.
//!
//! An [`Instance`](cnf::Instance) is wrapped in an [`Evaluator`](evaluator::Evaluator),
//! which rescores single-variable flips by touching only the clauses that mention the
//! flipped variable. Every strategy in [`search`] is built on top of it.

pub mod cnf;
pub mod dimacs;
pub mod evaluator;
pub mod random;
pub mod sat;
pub mod search;
pub mod stats;
pub mod tracker;

/// Errors reported by the library outside of the search loops.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to parse DIMACS: {0}")]
    Parse(String),
    #[error("{variables} variables exceed the exhaustive search limit of {limit}")]
    TooManyVariables { variables: usize, limit: usize },
    #[error("Total clause weight exceeds the supported maximum of {limit}")]
    WeightOverflow { limit: cnf::Weight },
}
