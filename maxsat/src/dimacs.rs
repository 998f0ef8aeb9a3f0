use crate::cnf::Weight;
use nom::error::VerboseError;
use nom::IResult;

pub enum Literal {
    Positive(u64),
    Negative(u64),
}

pub struct DimacsClause {
    weight: Weight,
    literals: Vec<Literal>,
}

struct DimacsHeader {
    weighted: bool,
    variable_count: usize,
    clause_count: usize,
}

pub struct Dimacs {
    variable_count: usize,
    weighted: bool,
    clauses: Vec<DimacsClause>,
}

impl Dimacs {
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// Returns `true` for `p wcnf` input.
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    pub fn clauses(&self) -> &Vec<DimacsClause> {
        &self.clauses
    }
}

impl DimacsClause {
    pub fn literals(&self) -> &Vec<Literal> {
        &self.literals
    }

    /// The clause weight; always 1 for unweighted input.
    pub fn weight(&self) -> Weight {
        self.weight
    }
}

pub fn parse(i: &str) -> IResult<&str, Dimacs, VerboseError<&str>> {
    parser::dimacs(i)
}

mod parser {
    use super::*;
    use crate::cnf::MAX_VARIABLE_COUNT;
    use nom::branch::alt;
    use nom::bytes::complete::tag;
    use nom::character::complete::u64 as text_u64;
    use nom::character::complete::{char, line_ending, not_line_ending, space1};
    use nom::character::complete::{i64 as text_i64, space0};
    use nom::combinator::{opt, value, verify};
    use nom::error::{context, VerboseError};
    use nom::multi::{count, many0, separated_list1};
    use nom::sequence::{preceded, terminated, tuple};
    use nom::IResult;

    pub(crate) fn dimacs(i: &str) -> IResult<&str, Dimacs, VerboseError<&str>> {
        let (i, (_, header)) = tuple((many0(alt((comment, blank_line))), header))(i)?;

        let (i, clauses) = count(
            preceded(separator, clause(header.weighted, header.variable_count)),
            header.clause_count,
        )(i)?;

        let dimacs = Dimacs {
            variable_count: header.variable_count,
            weighted: header.weighted,
            clauses,
        };

        Ok((i, dimacs))
    }

    fn comment(i: &str) -> IResult<&str, (), VerboseError<&str>> {
        context(
            "comment",
            value((), tuple((char('c'), not_line_ending, line_ending))),
        )(i)
    }

    fn blank_line(i: &str) -> IResult<&str, (), VerboseError<&str>> {
        value((), tuple((space0, line_ending)))(i)
    }

    /// The end of the previous line followed by any comments or empty lines.
    fn separator(i: &str) -> IResult<&str, (), VerboseError<&str>> {
        value((), tuple((line_ending, many0(alt((comment, blank_line))))))(i)
    }

    fn header(i: &str) -> IResult<&str, DimacsHeader, VerboseError<&str>> {
        let (i, (_, _, weighted, _, variable_count, _, clause_count, _top, _)) = context(
            "header",
            tuple((
                tag("p"),
                space1,
                alt((value(false, tag("cnf")), value(true, tag("wcnf")))),
                space1,
                verify(text_u64, |&count: &u64| {
                    count as usize <= MAX_VARIABLE_COUNT
                }),
                space1,
                text_u64,
                // The hard clause weight of newer wcnf headers is accepted and ignored.
                opt(preceded(space1, text_u64)),
                space0,
            )),
        )(i)?;
        Ok((
            i,
            DimacsHeader {
                weighted,
                variable_count: variable_count as usize,
                clause_count: clause_count as usize,
            },
        ))
    }

    fn clause(
        weighted: bool,
        max_variable: usize,
    ) -> impl Fn(&str) -> IResult<&str, DimacsClause, VerboseError<&str>> {
        move |i: &str| {
            let (i, _) = space0(i)?;
            let (i, weight) = if weighted {
                context("weight", terminated(text_u64, space1))(i)?
            } else {
                (i, 1)
            };

            // Ensure that the clauses do not contain variables with numbers too high.
            let literal = verify(text_i64, |&literal: &i64| {
                literal.unsigned_abs() as usize <= max_variable
            });

            // Clauses are terminated by a single 0, which may not appear anywhere else.
            let (i, (literals, _)) = context(
                "clause",
                tuple((
                    verify(separated_list1(space1, literal), |literals: &Vec<i64>| {
                        matches!(literals.split_last(), Some((0, rest)) if !rest.contains(&0))
                    }),
                    space0,
                )),
            )(i)?;

            let literals = literals
                .iter()
                .take(literals.len() - 1) // Skips the trailing 0.
                .map(|&var| {
                    if var < 0 {
                        Literal::Negative(var.unsigned_abs())
                    } else {
                        Literal::Positive(var as u64)
                    }
                })
                .collect();

            Ok((i, DimacsClause { weight, literals }))
        }
    }
}
