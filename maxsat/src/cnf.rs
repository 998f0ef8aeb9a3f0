use crate::dimacs;
use crate::dimacs::Dimacs;
use crate::Error;
use itertools::Itertools;
use nom::Finish;
use static_assertions::const_assert;
use std::fmt;

/// The underlying type that is used to handle variables and literals.
/// This is an unsigned integer type; literals use twice the range of variables.
pub type VariableType = u32;

/// Clause weights and satisfied-weight totals.
pub type Weight = u64;

/// The total weight of the clauses satisfied by an assignment.
/// For unweighted instances this is the number of satisfied clauses.
pub type Score = u64;

pub const MAX_VARIABLE_COUNT: usize = (VariableType::MAX / 2) as usize;

/// Upper bound on the summed clause weights of an instance.
/// Every score and every signed score change then fits in an `i64`.
pub const MAX_TOTAL_WEIGHT: Weight = i64::MAX as Weight;

// Both polarities of the highest variable must be representable.
const_assert!((MAX_VARIABLE_COUNT as u64) * 2 + 1 <= VariableType::MAX as u64);

/// Represents a boolean variable without a value. Variables are numbered from zero.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Variable(VariableType);

/// Represents a literal, i.e. a variable with a set value (true or false).
///
/// A non-negated variable `v` is stored as `2v`, a negated one as `2v + 1`,
/// so the polarity is the low bit and the variable is a right shift away.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Literal(VariableType);

/// Represents a CNF clause (a disjunction of literals).
///
/// Repeated literals and complementary pairs are allowed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Clause {
    pub(crate) literals: Vec<Literal>,
}

/// A (weighted) MaxSAT instance: a conjunction of clauses, each carrying a weight.
#[derive(Clone, Debug)]
pub struct Instance {
    variable_count: usize,
    pub(crate) clauses: Vec<Clause>,
    pub(crate) weights: Vec<Weight>,
    total_weight: Weight,
    weighted: bool,
}

/// A total assignment, one value per variable.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Assignment(Vec<bool>);

impl TryFrom<Dimacs> for Instance {
    type Error = Error;

    fn try_from(dimacs: Dimacs) -> Result<Self, Error> {
        let mut instance = Instance::new(dimacs.variable_count());

        for dimacs_clause in dimacs.clauses() {
            let clause = dimacs_clause
                .literals()
                .iter()
                .map(|literal| match *literal {
                    dimacs::Literal::Positive(number) => {
                        Literal::new(Variable::from_dimacs(number), true)
                    }
                    dimacs::Literal::Negative(number) => {
                        Literal::new(Variable::from_dimacs(number), false)
                    }
                })
                .collect();

            instance.try_add_weighted_clause(clause, dimacs_clause.weight())?;
        }

        instance.weighted |= dimacs.is_weighted();
        Ok(instance)
    }
}

impl Variable {
    /// Creates a new variable with a given zero-based index.
    ///
    /// # Panics
    /// Panics if `index > MAX_VARIABLE_COUNT` with a debug assert.
    /// The value is not checked when debug asserts are disabled.
    #[inline]
    pub const fn new(index: VariableType) -> Self {
        // For performance reasons, we only check this in debug mode.
        debug_assert!(index as usize <= MAX_VARIABLE_COUNT);
        Variable(index)
    }

    /// Creates a variable from its 1-based DIMACS number.
    #[inline]
    pub(crate) fn from_dimacs(number: u64) -> Self {
        debug_assert!(number > 0);
        Variable::new((number - 1) as VariableType)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The 1-based number used by DIMACS files and the output format.
    #[inline]
    pub fn dimacs_number(self) -> u64 {
        self.0 as u64 + 1
    }
}

impl Literal {
    /// Creates a new literal for a variable with a set value.
    #[inline]
    pub const fn new(variable: Variable, is_true: bool) -> Self {
        if is_true {
            Literal(variable.0 << 1)
        } else {
            Literal((variable.0 << 1) | 1)
        }
    }

    /// Creates a new literal from a signed DIMACS integer.
    ///
    /// # Panics
    /// Panics if `raw == 0`.
    #[inline]
    pub fn from_dimacs(raw: i64) -> Self {
        if raw > 0 {
            Literal::new(Variable::from_dimacs(raw as u64), true)
        } else if raw < 0 {
            Literal::new(Variable::from_dimacs(raw.unsigned_abs()), false)
        } else {
            panic!("Invalid raw value (0 is not permitted)")
        }
    }

    /// Returns `true` if the literal is the non-negated variable.
    #[inline]
    pub fn value(self) -> bool {
        self.0 & 1 == 0
    }

    /// Returns the variable of the literal.
    #[inline]
    pub fn variable(self) -> Variable {
        Variable(self.0 >> 1)
    }

    /// Returns `true` if the literal holds under the assignment.
    #[inline]
    pub fn is_true(self, assignment: &Assignment) -> bool {
        assignment.get(self.variable()) == self.value()
    }

    /// Returns the signed DIMACS form of the literal.
    #[inline]
    pub fn to_dimacs(self) -> i64 {
        let number = self.variable().dimacs_number() as i64;
        if self.value() {
            number
        } else {
            -number
        }
    }

    /// Returns the underlying value.
    #[inline]
    pub fn as_raw(self) -> VariableType {
        self.0
    }
}

impl std::ops::Not for Literal {
    type Output = Literal;

    /// Returns a negated version of this literal.
    #[inline]
    fn not(self) -> Self::Output {
        Literal(self.0 ^ 1)
    }
}

impl Clause {
    /// Creates a new empty clause.
    pub fn new() -> Self {
        Self {
            literals: Vec::new(),
        }
    }

    /// Adds a literal to the clause.
    pub fn add_variable(&mut self, variable: Variable, value: bool) {
        self.literals.push(Literal::new(variable, value))
    }

    /// Provides the literals contained within the clause.
    #[inline]
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Returns `true` if some literal of the clause holds under the assignment.
    #[inline]
    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        self.literals.iter().any(|literal| literal.is_true(assignment))
    }

    /// Returns `true` if the clause contains both polarities of some variable.
    pub fn is_tautology(&self) -> bool {
        self.literals
            .iter()
            .any(|&literal| self.literals.contains(&!literal))
    }

    /// Returns the number of literals contained within the clause.
    #[inline]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl FromIterator<Literal> for Clause {
    fn from_iter<T: IntoIterator<Item = Literal>>(iter: T) -> Self {
        Self {
            literals: iter.into_iter().collect(),
        }
    }
}

impl Instance {
    /// Creates a new instance over `variable_count` variables with zero clauses.
    pub fn new(variable_count: usize) -> Self {
        debug_assert!(variable_count <= MAX_VARIABLE_COUNT);
        Instance {
            variable_count,
            clauses: Vec::new(),
            weights: Vec::new(),
            total_weight: 0,
            weighted: false,
        }
    }

    /// Parses an instance from DIMACS `cnf` or `wcnf` text.
    pub fn parse_dimacs(input: &str) -> Result<Self, Error> {
        match dimacs::parse(input).finish() {
            Ok((_, dimacs)) => dimacs.try_into(),
            Err(err) => Err(Error::Parse(nom::error::convert_error(input, err))),
        }
    }

    /// Adds a clause with weight 1.
    pub fn add_clause(&mut self, clause: Clause) {
        self.add_weighted_clause(clause, 1)
    }

    /// Adds a clause with the given weight and marks the instance as weighted.
    ///
    /// # Panics
    /// Panics if the total weight would exceed [`MAX_TOTAL_WEIGHT`].
    pub fn add_weighted_clause(&mut self, clause: Clause, weight: Weight) {
        if let Err(err) = self.try_add_weighted_clause(clause, weight) {
            panic!("{err}");
        }
    }

    /// Adds a clause with the given weight, leaving the instance unchanged if the total
    /// weight would exceed [`MAX_TOTAL_WEIGHT`].
    pub fn try_add_weighted_clause(&mut self, clause: Clause, weight: Weight) -> Result<(), Error> {
        debug_assert!(clause
            .literals()
            .iter()
            .all(|x| x.variable().index() < self.variable_count));

        self.total_weight = self
            .total_weight
            .checked_add(weight)
            .filter(|&total| total <= MAX_TOTAL_WEIGHT)
            .ok_or(Error::WeightOverflow {
                limit: MAX_TOTAL_WEIGHT,
            })?;

        if weight != 1 {
            self.weighted = true;
        }
        self.clauses.push(clause);
        self.weights.push(weight);
        Ok(())
    }

    /// Provides the disjunctive clauses contained within the instance.
    #[inline]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Clause weights, parallel to [`Instance::clauses`].
    #[inline]
    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    #[inline]
    pub fn weight(&self, clause_index: usize) -> Weight {
        self.weights[clause_index]
    }

    #[inline]
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    #[inline]
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// The best achievable score, reached only when every clause is satisfied.
    pub fn max_score(&self) -> Score {
        self.total_weight
    }

    /// Iterates over all variables of the instance.
    pub fn variables(&self) -> impl Iterator<Item = Variable> {
        (0..self.variable_count as VariableType).map(Variable::new)
    }
}

/// Prints the instance in DIMACS `wcnf` form.
impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p wcnf {} {}", self.variable_count, self.clause_count())?;
        for (clause, weight) in self.clauses.iter().zip(&self.weights) {
            write!(f, "\n{weight} ")?;
            for literal in clause.literals() {
                write!(f, "{} ", literal.to_dimacs())?;
            }
            write!(f, "0")?;
        }
        Ok(())
    }
}

impl Assignment {
    pub fn new(values: Vec<bool>) -> Self {
        Self(values)
    }

    /// An assignment setting every variable to false.
    pub fn all_false(variable_count: usize) -> Self {
        Self(vec![false; variable_count])
    }

    /// Draws each value uniformly at random.
    pub fn random<R: rand::Rng + ?Sized>(variable_count: usize, rng: &mut R) -> Self {
        Self((0..variable_count).map(|_| rng.gen()).collect())
    }

    #[inline]
    pub fn get(&self, variable: Variable) -> bool {
        self.0[variable.index()]
    }

    #[inline]
    pub fn set(&mut self, variable: Variable, value: bool) {
        self.0[variable.index()] = value
    }

    #[inline]
    pub fn flip(&mut self, variable: Variable) {
        let value = &mut self.0[variable.index()];
        *value = !*value;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Literals that hold under this assignment, in variable order.
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &value)| Literal::new(Variable::new(i as VariableType), value))
    }
}

impl FromIterator<bool> for Assignment {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Formats the assignment as signed 1-based DIMACS numbers.
impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literals().map(Literal::to_dimacs).join(" "))
    }
}
