use crate::cnf::{Assignment, Score};

/// Whether a run proved its assignment optimal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// Every clause is satisfied, so no better score exists.
    OptimumFound,
    /// The best assignment found; it may or may not be optimal.
    Unknown,
}

/// The outcome of a search run.
#[derive(Clone, Debug)]
pub struct Solution {
    status: Status,
    score: Score,
    assignment: Assignment,
}

impl Solution {
    pub(crate) fn new(assignment: Assignment, score: Score, optimal: bool) -> Self {
        Self {
            status: optimal.into(),
            score,
            assignment,
        }
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn is_optimal(&self) -> bool {
        self.status == Status::OptimumFound
    }

    /// The satisfied weight (or clause count) reported by the strategy.
    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    #[inline]
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }
}

impl From<bool> for Status {
    #[inline]
    fn from(optimal: bool) -> Self {
        if optimal {
            Status::OptimumFound
        } else {
            Status::Unknown
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::OptimumFound => write!(f, "OPTIMUM FOUND"),
            Status::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
