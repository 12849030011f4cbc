use std::{fmt, str::FromStr};

use crate::{
    error::{PolytopeError, Result},
    math::vector_dot,
};

/// The comparison between the left and right hand side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl Relation {
    /// Check `lhs rel rhs`, allowing a violation of `tol`.
    pub fn holds(&self, lhs: f64, rhs: f64, tol: f64) -> bool {
        match self {
            Relation::LessEqual => lhs <= rhs + tol,
            Relation::Equal => (lhs - rhs).abs() <= tol,
            Relation::GreaterEqual => lhs >= rhs - tol,
        }
    }

    /// The amount by which `lhs rel rhs` is violated, zero if it holds exactly.
    pub fn violation(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Relation::LessEqual => (lhs - rhs).max(0.),
            Relation::Equal => (lhs - rhs).abs(),
            Relation::GreaterEqual => (rhs - lhs).max(0.),
        }
    }
}

impl FromStr for Relation {
    type Err = PolytopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "<=" | "≤" => Ok(Relation::LessEqual),
            "=" | "==" => Ok(Relation::Equal),
            ">=" | "≥" => Ok(Relation::GreaterEqual),
            other => Err(PolytopeError::InvalidRelation(other.to_string())),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Relation::LessEqual => "<=",
            Relation::Equal => "=",
            Relation::GreaterEqual => ">=",
        };
        f.write_str(symbol)
    }
}

/// A single linear constraint `a·x rel b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    coefficients: Box<[f64]>,
    relation: Relation,
    rhs: f64,
}

impl Constraint {
    pub fn new(coefficients: impl Into<Box<[f64]>>, relation: Relation, rhs: f64) -> Self {
        Self {
            coefficients: coefficients.into(),
            relation,
            rhs,
        }
    }

    /// Build a constraint from a textual relation such as `"<="`.
    pub fn parse(coefficients: impl Into<Box<[f64]>>, relation: &str, rhs: f64) -> Result<Self> {
        Ok(Self::new(coefficients, relation.parse()?, rhs))
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    pub fn dim(&self) -> usize {
        self.coefficients.len()
    }

    /// Evaluate the left hand side `a·x`.
    ///
    /// # Panics
    ///
    /// Panics if `point` does not have [`Constraint::dim`] coordinates.
    pub fn lhs(&self, point: &[f64]) -> f64 {
        vector_dot(&self.coefficients, point)
    }

    /// Whether `point` satisfies the constraint within a tolerance
    /// relative to the magnitude of the right hand side.
    ///
    /// # Panics
    ///
    /// Panics if `point` does not have [`Constraint::dim`] coordinates.
    pub fn is_satisfied(&self, point: &[f64], tol: f64) -> bool {
        self.relation
            .holds(self.lhs(point), self.rhs, tol * (1. + self.rhs.abs()))
    }

    /// The amount by which `point` violates the constraint.
    ///
    /// # Panics
    ///
    /// Panics if `point` does not have [`Constraint::dim`] coordinates.
    pub fn violation(&self, point: &[f64]) -> f64 {
        self.relation.violation(self.lhs(point), self.rhs)
    }
}

/// An immutable system of linear constraints over `dim` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintsSystem {
    dim: usize,
    constraints: Vec<Constraint>,
}

impl ConstraintsSystem {
    /// Build a system from parallel arrays of coefficient rows, relation
    /// symbols and right hand sides.
    ///
    /// Arrays of different lengths are reported as a `Dimension` error whose
    /// `row` is the first index missing from the shorter array.
    pub fn new<S: AsRef<str>>(lhs: &[Vec<f64>], relations: &[S], rhs: &[f64]) -> Result<Self> {
        let found = if relations.len() != lhs.len() {
            relations.len()
        } else {
            rhs.len()
        };
        if found != lhs.len() {
            return Err(PolytopeError::Dimension {
                row: found.min(lhs.len()),
                expected: lhs.len(),
                found,
            });
        }
        let constraints = lhs
            .iter()
            .zip(relations)
            .zip(rhs)
            .map(|((row, rel), &b)| Constraint::parse(row.as_slice(), rel.as_ref(), b))
            .collect::<Result<Vec<_>>>()?;
        Self::from_constraints(constraints)
    }

    /// Build a system from explicit constraints. All of them must share the
    /// same number of coefficients.
    pub fn from_constraints(constraints: Vec<Constraint>) -> Result<Self> {
        let Some(first) = constraints.first() else {
            return Err(PolytopeError::InvalidArgument(
                "a constraints system needs at least one constraint".to_string(),
            ));
        };
        let dim = first.dim();
        if dim == 0 {
            return Err(PolytopeError::Dimension {
                row: 0,
                expected: 1,
                found: 0,
            });
        }
        if let Some((row, bad)) = constraints
            .iter()
            .enumerate()
            .find(|(_, c)| c.dim() != dim)
        {
            return Err(PolytopeError::Dimension {
                row,
                expected: dim,
                found: bad.dim(),
            });
        }
        Ok(Self { dim, constraints })
    }

    /// The number of variables.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn is_satisfied(&self, point: &[f64], tol: f64) -> bool {
        point.len() == self.dim && self.constraints.iter().all(|c| c.is_satisfied(point, tol))
    }

    /// The largest violation over all constraints together with the index of
    /// the violated row. Returns `None` if the system is satisfied exactly.
    pub fn max_violation(&self, point: &[f64]) -> Result<Option<(usize, f64)>> {
        if point.len() != self.dim {
            return Err(PolytopeError::PointDimension {
                expected: self.dim,
                found: point.len(),
            });
        }
        Ok(self
            .constraints
            .iter()
            .map(|c| c.violation(point))
            .enumerate()
            .filter(|(_, v)| *v > 0.)
            .max_by(|a, b| a.1.total_cmp(&b.1)))
    }

    /// The first row not satisfied within `tol`, with its violation. The
    /// caller checks the length of `point`.
    pub(crate) fn first_violated(&self, point: &[f64], tol: f64) -> Option<(usize, f64)> {
        self.constraints
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_satisfied(point, tol))
            .map(|(row, c)| (row, c.violation(point)))
    }
}

impl<'a> IntoIterator for &'a ConstraintsSystem {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}
