//! Incremental scoring of single-variable flips.
//!
//! - O(#clauses) full score
//! - O(#literals in clauses with var) rescore after flipping var
//!
//! All strategies flip a variable in place, ask the evaluator for the new score
//! given the score before the flip, and undo the flip if they reject it.
use crate::cnf::{Assignment, Instance, Literal, Score, Variable};
use log::warn;

/// How a flip changed the status of a single clause.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClauseChange {
    Satisfied,
    Violated,
}

/// Result of comparing a tracked score against a full recomputation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verification {
    Consistent,
    Inconsistent { reported: Score, actual: Score },
}

/// An instance together with the map from each variable to the clauses mentioning it.
pub struct Evaluator {
    instance: Instance,
    affected_clauses: Vec<Vec<usize>>,
}

impl Evaluator {
    pub fn new(instance: Instance) -> Self {
        let mut affected_clauses = vec![Vec::new(); instance.variable_count()];

        for (i, clause) in instance.clauses().iter().enumerate() {
            for literal in clause.literals() {
                let clauses: &mut Vec<usize> = &mut affected_clauses[literal.variable().index()];
                // Literals of one clause are visited together, so checking the tail dedups.
                if clauses.last() != Some(&i) {
                    clauses.push(i);
                }
            }
        }

        Self {
            instance,
            affected_clauses,
        }
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Indices of the clauses that contain a literal over `variable`.
    #[inline]
    pub fn affected_clauses(&self, variable: Variable) -> &[usize] {
        &self.affected_clauses[variable.index()]
    }

    #[inline]
    pub fn max_score(&self) -> Score {
        self.instance.max_score()
    }

    #[inline]
    pub fn is_clause_satisfied(&self, clause_index: usize, assignment: &Assignment) -> bool {
        self.instance.clauses()[clause_index].is_satisfied(assignment)
    }

    /// Computes the score of an assignment from scratch.
    pub fn score(&self, assignment: &Assignment) -> Score {
        debug_assert_eq!(assignment.len(), self.instance.variable_count());

        self.instance
            .clauses()
            .iter()
            .zip(self.instance.weights())
            .filter(|(clause, _)| clause.is_satisfied(assignment))
            .map(|(_, &weight)| weight)
            .sum()
    }

    /// Number of clauses satisfied by the assignment, ignoring weights.
    pub fn count_satisfied(&self, assignment: &Assignment) -> usize {
        self.instance
            .clauses()
            .iter()
            .filter(|clause| clause.is_satisfied(assignment))
            .count()
    }

    /// Reports every clause whose status changed because `flipped` was flipped.
    ///
    /// `assignment` must already contain the flipped value.
    pub fn flip_changes<F>(&self, assignment: &Assignment, flipped: Variable, mut visit: F)
    where
        F: FnMut(usize, ClauseChange),
    {
        for &clause_index in self.affected_clauses(flipped) {
            let mut flipped_literal: Option<Literal> = None;
            let mut already_satisfied = false;

            for &literal in self.instance.clauses()[clause_index].literals() {
                if literal.variable() == flipped {
                    match flipped_literal {
                        None => flipped_literal = Some(literal),
                        Some(seen) if seen != literal => {
                            // The clause contains both polarities and can never be violated.
                            already_satisfied = true;
                            break;
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                if literal.is_true(assignment) {
                    already_satisfied = true;
                    break;
                }
            }

            if already_satisfied {
                continue;
            }

            // The index only lists clauses that mention the variable.
            if let Some(literal) = flipped_literal {
                if literal.is_true(assignment) {
                    visit(clause_index, ClauseChange::Satisfied);
                } else {
                    visit(clause_index, ClauseChange::Violated);
                }
            }
        }
    }

    /// Returns the score after flipping `flipped`, given the score valid before the flip.
    ///
    /// `assignment` must already contain the flipped value.
    pub fn rescore_flip(&self, assignment: &Assignment, flipped: Variable, before: Score) -> Score {
        let weights = self.instance.weights();
        let mut gained: Score = 0;
        let mut lost: Score = 0;

        self.flip_changes(assignment, flipped, |clause_index, change| match change {
            ClauseChange::Satisfied => gained += weights[clause_index],
            ClauseChange::Violated => lost += weights[clause_index],
        });

        debug_assert!(before + gained >= lost);
        before + gained - lost
    }

    /// Recomputes the score of `assignment` and compares it to the tracked value.
    pub fn verify(&self, assignment: &Assignment, reported: Score) -> Verification {
        let actual = self.score(assignment);
        if actual == reported {
            Verification::Consistent
        } else {
            warn!("Found solution is inconsistent: reported score {reported}, actual score {actual}");
            Verification::Inconsistent { reported, actual }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::{Clause, VariableType};
    use rand::prelude::*;
    use rand_pcg::Pcg64Mcg;

    fn clause(raw: &[i64]) -> Clause {
        raw.iter().map(|&x| Literal::from_dimacs(x)).collect()
    }

    fn random_instance(rng: &mut Pcg64Mcg, variables: usize, clauses: usize) -> Instance {
        let mut instance = Instance::new(variables);
        for _ in 0..clauses {
            let len = rng.gen_range(0..=4);
            let clause = (0..len)
                .map(|_| {
                    let var = Variable::new(rng.gen_range(0..variables) as VariableType);
                    Literal::new(var, rng.gen())
                })
                .collect();
            instance.add_weighted_clause(clause, rng.gen_range(1..=5));
        }
        instance
    }

    #[test]
    fn flip_raises_score_without_rescanning_first_clause() {
        let instance = Instance::parse_dimacs(include_str!("../tests/cnf/example.cnf")).unwrap();
        let evaluator = Evaluator::new(instance);

        let mut assignment = Assignment::new(vec![true, false, false]);
        assert_eq!(evaluator.score(&assignment), 1);

        let x3 = Variable::new(2);
        assert_eq!(evaluator.affected_clauses(x3), &[1]);

        assignment.flip(x3);
        assert_eq!(evaluator.rescore_flip(&assignment, x3, 1), 2);
    }

    #[test]
    fn tautology_is_invariant_under_flips() {
        let mut instance = Instance::new(2);
        instance.add_clause(clause(&[1, -1]));
        instance.add_clause(clause(&[-1, 2, 1]));
        let evaluator = Evaluator::new(instance);

        for values in [[false, false], [false, true], [true, false], [true, true]] {
            let mut assignment = Assignment::new(values.to_vec());
            assert_eq!(evaluator.score(&assignment), 2);

            for var in [Variable::new(0), Variable::new(1)] {
                assignment.flip(var);
                let mut changes = 0;
                evaluator.flip_changes(&assignment, var, |_, _| changes += 1);
                assert_eq!(changes, 0);
                assert_eq!(evaluator.rescore_flip(&assignment, var, 2), 2);
                assignment.flip(var);
            }
        }
    }

    #[test]
    fn duplicate_literals_are_indexed_once() {
        let mut instance = Instance::new(2);
        instance.add_clause(clause(&[1, 1, 2]));
        instance.add_clause(clause(&[-2, 1, -2]));
        let evaluator = Evaluator::new(instance);

        assert_eq!(evaluator.affected_clauses(Variable::new(0)), &[0, 1]);
        assert_eq!(evaluator.affected_clauses(Variable::new(1)), &[0, 1]);

        let mut assignment = Assignment::new(vec![false, true]);
        let before = evaluator.score(&assignment);
        assert_eq!(before, 1);

        assignment.flip(Variable::new(0));
        assert_eq!(evaluator.rescore_flip(&assignment, Variable::new(0), before), 2);
    }

    #[test]
    fn isolated_variable_has_zero_delta() {
        let mut instance = Instance::new(3);
        instance.add_clause(clause(&[1, 2]));
        let evaluator = Evaluator::new(instance);

        let isolated = Variable::new(2);
        assert!(evaluator.affected_clauses(isolated).is_empty());

        let mut assignment = Assignment::all_false(3);
        assignment.flip(isolated);
        assert_eq!(evaluator.rescore_flip(&assignment, isolated, 0), 0);
    }

    #[test]
    fn empty_clause_is_never_satisfied() {
        let mut instance = Instance::new(1);
        instance.add_clause(Clause::new());
        instance.add_clause(clause(&[1]));
        let evaluator = Evaluator::new(instance);

        let mut assignment = Assignment::all_false(1);
        assert_eq!(evaluator.score(&assignment), 0);
        assignment.flip(Variable::new(0));
        assert_eq!(evaluator.rescore_flip(&assignment, Variable::new(0), 0), 1);
    }

    #[test]
    fn satisfied_count_ignores_weights() {
        let mut instance = Instance::new(2);
        instance.add_weighted_clause(clause(&[1]), 10);
        instance.add_weighted_clause(clause(&[-2]), 3);
        instance.add_weighted_clause(clause(&[2]), 4);
        let evaluator = Evaluator::new(instance);

        let assignment = Assignment::new(vec![true, false]);
        assert!(evaluator.is_clause_satisfied(0, &assignment));
        assert!(evaluator.is_clause_satisfied(1, &assignment));
        assert!(!evaluator.is_clause_satisfied(2, &assignment));
        assert_eq!(evaluator.count_satisfied(&assignment), 2);
        assert_eq!(evaluator.score(&assignment), 13);
    }

    #[test]
    fn incremental_matches_full_recomputation() {
        let mut rng = Pcg64Mcg::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let variables = rng.gen_range(1..=8);
            let clauses = rng.gen_range(0..=20);
            let evaluator = Evaluator::new(random_instance(&mut rng, variables, clauses));

            let mut assignment = Assignment::random(variables, &mut rng);
            let mut score = evaluator.score(&assignment);

            for _ in 0..30 {
                let var = Variable::new(rng.gen_range(0..variables) as VariableType);
                assignment.flip(var);
                score = evaluator.rescore_flip(&assignment, var, score);
                assert_eq!(score, evaluator.score(&assignment));
            }
        }
    }

    #[test]
    fn verification_reports_mismatch() {
        let instance = Instance::parse_dimacs(include_str!("../tests/cnf/example.cnf")).unwrap();
        let evaluator = Evaluator::new(instance);
        let assignment = Assignment::new(vec![true, false, false]);

        assert_eq!(evaluator.verify(&assignment, 1), Verification::Consistent);
        assert_eq!(
            evaluator.verify(&assignment, 2),
            Verification::Inconsistent {
                reported: 2,
                actual: 1
            }
        );
    }
}
