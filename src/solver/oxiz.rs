//! `OxiZ` SMT backend.
//!
//! Every operand of a check becomes an integer variable pinned to its
//! fixed-point value. The relation itself (differences, products with unit
//! constants, sums) is built as solver terms, and the negation of the check
//! is asserted as a disjunction over them. UNSAT means the check holds.

use async_trait::async_trait;
use oxiz::{
    TermManager,
    solver::{Solver, SolverConfig, SolverResult},
};

use crate::error::SolverError;
use crate::solver::encoding::LinearCheck;
use crate::solver::traits::{ConstraintSolver, SolverVerdict};

/// A term of the negated check. Children are indices of earlier nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    /// Operand `i`, pinned to its value.
    Operand(usize),
    Lit(i64),
    Add(usize, usize),
    Sub(usize, usize),
    /// `nodes[a] * k`
    Scale(usize, i64),
    Gt(usize, usize),
    Lt(usize, usize),
    Le(usize, usize),
    Ge(usize, usize),
}

/// The negation of a check: pinned operands, a term arena in dependency
/// order, and the disjuncts.
#[derive(Debug, Default)]
struct Negation {
    operands: Vec<i64>,
    nodes: Vec<Node>,
    disjuncts: Vec<usize>,
}

impl Negation {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn operand(&mut self, value: i128) -> Result<usize, SolverError> {
        self.operands.push(narrow(value)?);
        let index = self.operands.len() - 1;
        Ok(self.push(Node::Operand(index)))
    }

    fn operands(&mut self, values: &[i128]) -> Result<Vec<usize>, SolverError> {
        values.iter().map(|v| self.operand(*v)).collect()
    }

    fn either(&mut self, a: Node, b: Node) {
        let a = self.push(a);
        let b = self.push(b);
        self.disjuncts.extend([a, b]);
    }

    /// `|lhs - rhs| > tol`
    fn outside(&mut self, lhs: usize, rhs: usize, tol: usize) {
        let above = self.push(Node::Sub(lhs, rhs));
        let below = self.push(Node::Sub(rhs, lhs));
        self.either(Node::Gt(above, tol), Node::Gt(below, tol));
    }

    fn build(check: &LinearCheck) -> Result<Self, SolverError> {
        let mut neg = Self::default();
        match check {
            LinearCheck::Tolerance { lhs, rhs, tol } => {
                let lhs = neg.operand(*lhs)?;
                let rhs = neg.operand(*rhs)?;
                let tol = neg.operand(*tol)?;
                neg.outside(lhs, rhs, tol);
            }
            LinearCheck::Proportion {
                claimed,
                base,
                target,
                offset,
                weight,
                tol,
            } => {
                let claimed = neg.operand(*claimed)?;
                let target = neg.operand(*target)?;
                let offset = neg.operand(*offset)?;
                let tol = neg.operand(*tol)?;
                let lhs = neg.push(Node::Scale(claimed, narrow(*base)?));
                let delta = neg.push(Node::Sub(target, offset));
                let rhs = neg.push(Node::Scale(delta, narrow(*weight)?));
                neg.outside(lhs, rhs, tol);
            }
            LinearCheck::Sum { parts, total, tol } => {
                let parts = neg.operands(parts)?;
                let total = neg.operand(*total)?;
                let tol = neg.operand(*tol)?;
                let zero = neg.push(Node::Lit(0));
                let sum = parts
                    .into_iter()
                    .fold(zero, |acc, part| neg.push(Node::Add(acc, part)));
                neg.outside(sum, total, tol);
            }
            LinearCheck::Above { value, bound } => {
                let (value, bound) = (neg.operand(*value)?, neg.operand(*bound)?);
                let atom = neg.push(Node::Le(value, bound));
                neg.disjuncts.push(atom);
            }
            LinearCheck::Below { value, bound } => {
                let (value, bound) = (neg.operand(*value)?, neg.operand(*bound)?);
                let atom = neg.push(Node::Ge(value, bound));
                neg.disjuncts.push(atom);
            }
            LinearCheck::Between { value, lo, hi } => {
                let value = neg.operand(*value)?;
                let (lo, hi) = (neg.operand(*lo)?, neg.operand(*hi)?);
                neg.either(Node::Le(value, lo), Node::Ge(value, hi));
            }
            LinearCheck::AllAtMost { values, bound } => {
                let values = neg.operands(values)?;
                let bound = neg.operand(*bound)?;
                for value in values {
                    let atom = neg.push(Node::Gt(value, bound));
                    neg.disjuncts.push(atom);
                }
            }
            LinearCheck::NonDecreasing { values } => {
                let values = neg.operands(values)?;
                for pair in values.windows(2) {
                    let atom = neg.push(Node::Lt(pair[1], pair[0]));
                    neg.disjuncts.push(atom);
                }
            }
        }
        Ok(neg)
    }
}

fn narrow(value: i128) -> Result<i64, SolverError> {
    i64::try_from(value).map_err(|_| SolverError::Overflow(value.to_string()))
}

fn decide(check: &LinearCheck, timeout_ms: u64) -> Result<SolverVerdict, SolverError> {
    let neg = Negation::build(check)?;
    if neg.disjuncts.is_empty() {
        // An empty disjunction is false.
        return Ok(SolverVerdict::Unsat);
    }

    let config = if timeout_ms > 0 {
        SolverConfig::default().with_timeout(timeout_ms)
    } else {
        SolverConfig::default()
    };
    let mut solver = Solver::with_config(config);
    let mut tm = TermManager::new();

    let mut vars = Vec::with_capacity(neg.operands.len());
    for (i, value) in neg.operands.iter().enumerate() {
        let var = tm.mk_var(&format!("x{i}"), tm.sorts.int_sort);
        let literal = tm.mk_int(*value);
        let pin = tm.mk_eq(var, literal);
        solver.assert(pin, &mut tm);
        vars.push(var);
    }

    let mut terms = Vec::with_capacity(neg.nodes.len());
    for node in &neg.nodes {
        let term = match *node {
            Node::Operand(i) => vars[i],
            Node::Lit(k) => tm.mk_int(k),
            Node::Add(a, b) => tm.mk_add([terms[a], terms[b]]),
            Node::Sub(a, b) => tm.mk_sub(terms[a], terms[b]),
            Node::Scale(a, k) => {
                let k = tm.mk_int(k);
                tm.mk_mul([terms[a], k])
            }
            Node::Gt(a, b) => tm.mk_gt(terms[a], terms[b]),
            Node::Lt(a, b) => tm.mk_lt(terms[a], terms[b]),
            Node::Le(a, b) => tm.mk_le(terms[a], terms[b]),
            Node::Ge(a, b) => tm.mk_ge(terms[a], terms[b]),
        };
        terms.push(term);
    }

    let disjuncts: Vec<_> = neg.disjuncts.iter().map(|&i| terms[i]).collect();
    let negated = tm.mk_or(disjuncts);
    solver.assert(negated, &mut tm);

    Ok(match solver.check(&mut tm) {
        SolverResult::Unsat => SolverVerdict::Unsat,
        SolverResult::Sat => SolverVerdict::Sat,
        SolverResult::Unknown => SolverVerdict::Unknown,
    })
}

/// `OxiZ`-based constraint solver. Builds a fresh solver per call on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct OxizSolver {
    timeout_ms: u64,
}

impl OxizSolver {
    /// Create a solver with an internal per-check timeout.
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }
}

#[async_trait]
impl ConstraintSolver for OxizSolver {
    async fn refute(&self, check: &LinearCheck) -> Result<SolverVerdict, SolverError> {
        let check = check.clone();
        let timeout_ms = self.timeout_ms;
        tokio::task::spawn_blocking(move || decide(&check, timeout_ms))
            .await
            .map_err(|err| SolverError::Internal(err.to_string()))?
    }

    fn name(&self) -> &'static str {
        "oxiz"
    }
}
