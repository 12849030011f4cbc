use rand::Rng;

use crate::math::vector_dot;

/// A bounded convex region `{y : A·y ≤ b}` in the reduced space.
///
/// Rows are stored contiguously together with their Euclidean norms, which
/// the Chebyshev center and the reflection walk need.
#[derive(Debug, Clone)]
pub struct Polytope {
    dim: usize,
    coefficients: Vec<f64>,
    rhs: Vec<f64>,
    norms: Vec<f64>,
    source: Vec<usize>,
}

/// The feasible part `[lower, upper]` of a line `point + t·direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub lower: f64,
    pub upper: f64,
    /// Row that limits the segment from below, if any.
    pub lower_row: Option<usize>,
    /// Row that limits the segment from above, if any.
    pub upper_row: Option<usize>,
}

impl Segment {
    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    pub fn length(&self) -> f64 {
        self.upper - self.lower
    }

    /// Draw `t` uniformly from the segment.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        self.lower + u * self.length()
    }
}

impl Polytope {
    pub(crate) fn with_capacity(dim: usize, rows: usize) -> Self {
        Self {
            dim,
            coefficients: Vec::with_capacity(dim * rows),
            rhs: Vec::with_capacity(rows),
            norms: Vec::with_capacity(rows),
            source: Vec::with_capacity(rows),
        }
    }

    /// Add the halfspace `a·y ≤ b`, remembering the index of the constraint
    /// it was derived from.
    pub(crate) fn push(&mut self, a: &[f64], b: f64, source: usize) {
        assert!(a.len() == self.dim);
        self.coefficients.extend_from_slice(a);
        self.rhs.push(b);
        self.norms.push(vector_dot(a, a).sqrt());
        self.source.push(source);
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_rows(&self) -> usize {
        self.rhs.len()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.coefficients[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rhs(&self, i: usize) -> f64 {
        self.rhs[i]
    }

    pub fn row_norm(&self, i: usize) -> f64 {
        self.norms[i]
    }

    /// Index of the original constraint row `i` was derived from.
    pub fn source(&self, i: usize) -> usize {
        self.source[i]
    }

    /// `b_i − a_i·y`, non-negative for points satisfying row `i`.
    pub fn slack(&self, i: usize, point: &[f64]) -> f64 {
        self.rhs[i] - vector_dot(self.row(i), point)
    }

    pub fn contains(&self, point: &[f64], tol: f64) -> bool {
        point.len() == self.dim
            && (0..self.num_rows())
                .all(|i| self.slack(i, point) >= -tol * (1. + self.rhs[i].abs()))
    }

    /// Intersect the line `point + t·direction` with every halfspace.
    ///
    /// Slightly negative slacks caused by round-off are treated as zero, so the
    /// returned segment always contains `t = 0`. Rows parallel to the
    /// direction do not restrict `t`. Returns `None` for a zero direction or
    /// if the intersection is empty.
    pub fn segment(&self, point: &[f64], direction: &[f64]) -> Option<Segment> {
        assert!(point.len() == self.dim);
        assert!(direction.len() == self.dim);

        let dir_norm = vector_dot(direction, direction).sqrt();
        if !(dir_norm > 0.) {
            return None;
        }

        let mut segment = Segment {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            lower_row: None,
            upper_row: None,
        };

        for i in 0..self.num_rows() {
            let a = self.row(i);
            let denom = vector_dot(a, direction);
            if denom.abs() <= f64::EPSILON * self.norms[i] * dir_norm {
                continue;
            }
            let slack = self.slack(i, point).max(0.);
            let bound = slack / denom;
            if denom > 0. {
                if bound < segment.upper {
                    segment.upper = bound;
                    segment.upper_row = Some(i);
                }
            } else if bound > segment.lower {
                segment.lower = bound;
                segment.lower_row = Some(i);
            }
        }

        if segment.lower > segment.upper || segment.lower.is_nan() || segment.upper.is_nan() {
            return None;
        }
        Some(segment)
    }
}
