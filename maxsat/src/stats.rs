pub trait StatsStorage: Default + Send {
    fn increment_flips(&mut self);
    fn increment_improvements(&mut self);
    fn increment_iterations(&mut self);
    fn increment_full_evaluations(&mut self);
    /// Adds the counts of a worker that ran on its own storage.
    fn merge(&mut self, other: Self);
}

#[derive(Default)]
pub struct NoStats;

#[derive(Default, Debug, Clone)]
pub struct Stats {
    flips: u64,
    improvements: u64,
    iterations: u64,
    full_evaluations: u64,
}

impl Stats {
    /// Single-variable flips scored through the incremental evaluator.
    pub fn flips(&self) -> u64 {
        self.flips
    }

    /// Moves that raised the current or the best known score.
    pub fn improvements(&self) -> u64 {
        self.improvements
    }

    /// Outer loop rounds: trials, generations, grows or annealing steps.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Assignments scored from scratch.
    pub fn full_evaluations(&self) -> u64 {
        self.full_evaluations
    }
}

impl StatsStorage for NoStats {
    #[inline(always)]
    fn increment_flips(&mut self) {}
    #[inline(always)]
    fn increment_improvements(&mut self) {}
    #[inline(always)]
    fn increment_iterations(&mut self) {}
    #[inline(always)]
    fn increment_full_evaluations(&mut self) {}
    #[inline(always)]
    fn merge(&mut self, _: Self) {}
}

impl StatsStorage for Stats {
    #[inline]
    fn increment_flips(&mut self) {
        self.flips += 1;
    }

    #[inline]
    fn increment_improvements(&mut self) {
        self.improvements += 1;
    }

    #[inline]
    fn increment_iterations(&mut self) {
        self.iterations += 1;
    }

    #[inline]
    fn increment_full_evaluations(&mut self) {
        self.full_evaluations += 1;
    }

    fn merge(&mut self, other: Self) {
        self.flips += other.flips;
        self.improvements += other.improvements;
        self.iterations += other.iterations;
        self.full_evaluations += other.full_evaluations;
    }
}
