//! A small dense two-phase simplex solver.
//!
//! Solves `max c·x` subject to `A·x ≤ b`, `x ≥ 0`. The right hand side is
//! perturbed by a tiny amount so that degenerate vertices split apart, and
//! the tableau is rebuilt from the original data every few pivots. The final
//! basis is evaluated once more with the exact right hand side. Pricing uses
//! the largest reduced cost and falls back to Bland's rule when the solver
//! stalls.

use crate::{
    error::{PolytopeError, Result},
    math::axpy,
};

/// Entries of the entering column smaller than this fraction of the largest
/// entry are never used as pivots.
const PIVOT_TOL: f64 = 1e-9;
/// Pivots below this fraction of the largest coefficient of the problem are
/// round-off.
const ZERO_TOL: f64 = 1e-12;
/// Reduced costs below this fraction of the largest cost count as zero.
const COST_TOL: f64 = 1e-9;
/// Relative size of the right hand side perturbation.
const PERTURBATION: f64 = 1e-9;
/// Pivots between two rebuilds of the tableau.
const REFACTOR_INTERVAL: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpSolution {
    Optimal { x: Vec<f64>, value: f64 },
    Infeasible,
    Unbounded,
}

#[derive(Debug, Clone)]
struct Tableau {
    rows: Vec<Vec<f64>>,
    rhs: Vec<f64>,
    basis: Vec<usize>,
    is_basic: Vec<bool>,
}

impl Tableau {
    fn pivot(&mut self, row: usize, col: usize) {
        let inv = self.rows[row][col].recip();
        self.rows[row].iter_mut().for_each(|val| *val *= inv);
        self.rhs[row] *= inv;
        self.rows[row][col] = 1.;

        let (pivot_row, pivot_rhs) = (self.rows[row].clone(), self.rhs[row]);
        for (i, (other, rhs)) in self.rows.iter_mut().zip(self.rhs.iter_mut()).enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0. {
                continue;
            }
            axpy(&pivot_row, other, -factor);
            other[col] = 0.;
            *rhs -= factor * pivot_rhs;
        }
        self.is_basic[self.basis[row]] = false;
        self.is_basic[col] = true;
        self.basis[row] = col;
    }

    /// Reduced costs of the columns `0..allowed`.
    fn reduced_costs(&self, cost: &[f64], allowed: usize) -> Vec<f64> {
        let mut reduced = cost[..allowed].to_vec();
        for (row, &b) in self.rows.iter().zip(self.basis.iter()) {
            if cost[b] != 0. {
                axpy(&row[..allowed], &mut reduced, -cost[b]);
            }
        }
        reduced
    }

    fn objective(&self, cost: &[f64]) -> f64 {
        self.basis
            .iter()
            .zip(self.rhs.iter())
            .map(|(&b, rhs)| cost[b] * rhs)
            .sum()
    }
}

struct Solver {
    initial: Tableau,
    exact_rhs: Vec<f64>,
    perturbed_rhs: Vec<f64>,
    tableau: Tableau,
    scale: f64,
    since_refactor: usize,
    iterations: usize,
    max_iterations: usize,
}

impl Solver {
    /// Recompute the tableau of the current basis from the original data,
    /// using the exact or the perturbed right hand side. Keeps the old
    /// tableau and returns `false` if the basis is numerically singular.
    fn refactor(&mut self, exact: bool) -> bool {
        let mut fresh = self.initial.clone();
        fresh.rhs.copy_from_slice(if exact {
            &self.exact_rhs
        } else {
            &self.perturbed_rhs
        });

        let mut wanted = vec![false; fresh.is_basic.len()];
        self.tableau.basis.iter().for_each(|&b| wanted[b] = true);

        for &col in self.tableau.basis.iter() {
            if fresh.is_basic[col] {
                continue;
            }
            let row = (0..fresh.rows.len())
                .filter(|&i| !wanted[fresh.basis[i]])
                .max_by(|&i, &j| fresh.rows[i][col].abs().total_cmp(&fresh.rows[j][col].abs()));
            match row {
                Some(row) if fresh.rows[row][col].abs() > ZERO_TOL * self.scale => {
                    fresh.pivot(row, col)
                }
                _ => return false,
            }
        }

        self.tableau = fresh;
        self.since_refactor = 0;
        true
    }

    /// Maximize `cost` over the columns `0..allowed`. Returns `false` if the
    /// objective is unbounded.
    fn optimize(&mut self, cost: &[f64], allowed: usize) -> Result<bool> {
        let cost_tol = COST_TOL * cost.iter().fold(1f64, |acc, val| acc.max(val.abs()));
        let num_rows = self.tableau.rows.len();
        let mut degenerate = 0;

        loop {
            if self.since_refactor >= REFACTOR_INTERVAL {
                self.refactor(false);
            }

            let reduced = self.tableau.reduced_costs(cost, allowed);
            let mut candidates =
                (0..allowed).filter(|&j| !self.tableau.is_basic[j] && reduced[j] > cost_tol);
            let bland = degenerate > num_rows;
            let entering = if bland {
                candidates.next()
            } else {
                candidates.max_by(|&a, &b| reduced[a].total_cmp(&reduced[b]))
            };
            let Some(col) = entering else {
                return Ok(true);
            };

            let Some((row, step)) = self.leaving_row(col, bland) else {
                // Round-off can hide the leaving row, so check again on a
                // freshly computed tableau before giving up.
                if self.since_refactor > 0 && self.refactor(false) {
                    continue;
                }
                return Ok(false);
            };

            if self.iterations >= self.max_iterations {
                return Err(PolytopeError::LpIterationLimit(self.max_iterations));
            }
            self.tableau.pivot(row, col);
            self.iterations += 1;
            self.since_refactor += 1;
            if step <= ZERO_TOL * self.scale {
                degenerate += 1;
            } else {
                degenerate = 0;
            }
        }
    }

    /// Ratio test for the entering column `col`. Among the rows that reach
    /// their bound first, prefer the largest pivot, or the smallest basic
    /// index under Bland's rule.
    fn leaving_row(&self, col: usize, bland: bool) -> Option<(usize, f64)> {
        let tableau = &self.tableau;
        let col_max = tableau
            .rows
            .iter()
            .fold(0f64, |acc, row| acc.max(row[col].abs()));
        let threshold = (PIVOT_TOL * col_max).max(ZERO_TOL * self.scale);

        let ratio = |i: usize| tableau.rhs[i].max(0.) / tableau.rows[i][col];
        let eligible = (0..tableau.rows.len())
            .filter(|&i| tableau.rows[i][col] > threshold)
            .collect::<Vec<_>>();
        let min_ratio = eligible
            .iter()
            .map(|&i| ratio(i))
            .fold(f64::INFINITY, f64::min);
        if !min_ratio.is_finite() {
            return None;
        }

        let bound = min_ratio + PIVOT_TOL * (1. + min_ratio);
        let ties = eligible.into_iter().filter(|&i| ratio(i) <= bound);
        let row = if bland {
            ties.min_by_key(|&i| tableau.basis[i])
        } else {
            ties.max_by(|&i, &j| tableau.rows[i][col].total_cmp(&tableau.rows[j][col]))
        }?;
        Some((row, min_ratio))
    }
}

/// Maximize `c·x` subject to `A·x ≤ b` and `x ≥ 0`.
pub(crate) fn maximize(
    c: &[f64],
    a: &[Vec<f64>],
    b: &[f64],
    max_iterations: usize,
) -> Result<LpSolution> {
    let n = c.len();
    let m = a.len();
    assert!(b.len() == m);
    assert!(a.iter().all(|row| row.len() == n));

    let num_artificial = b.iter().filter(|&&val| val < 0.).count();
    let columns = n + m + num_artificial;

    let mut rows = Vec::with_capacity(m);
    let mut exact_rhs = Vec::with_capacity(m);
    let mut basis = Vec::with_capacity(m);
    let mut next_artificial = n + m;
    for (i, (row, &b)) in a.iter().zip(b).enumerate() {
        let mut tableau_row = vec![0f64; columns];
        if b >= 0. {
            tableau_row[..n].copy_from_slice(row);
            tableau_row[n + i] = 1.;
            exact_rhs.push(b);
            basis.push(n + i);
        } else {
            tableau_row[..n]
                .iter_mut()
                .zip(row)
                .for_each(|(val, a)| *val = -a);
            tableau_row[n + i] = -1.;
            tableau_row[next_artificial] = 1.;
            exact_rhs.push(-b);
            basis.push(next_artificial);
            next_artificial += 1;
        }
        rows.push(tableau_row);
    }

    // Distinct offsets per row, so that no two rows become tight together.
    let perturbed_rhs = exact_rhs
        .iter()
        .enumerate()
        .map(|(i, &val)| {
            let spread = 1. + ((i + 1) as f64 * 0.618_033_988_749_895).fract();
            val + PERTURBATION * (1. + val) * spread
        })
        .collect::<Vec<_>>();

    let mut is_basic = vec![false; columns];
    basis.iter().for_each(|&b| is_basic[b] = true);
    let initial = Tableau {
        rows,
        rhs: perturbed_rhs.clone(),
        basis,
        is_basic,
    };
    let scale = a
        .iter()
        .flatten()
        .fold(1f64, |acc, val| acc.max(val.abs()));

    let mut solver = Solver {
        tableau: initial.clone(),
        initial,
        exact_rhs,
        perturbed_rhs,
        scale,
        since_refactor: 0,
        iterations: 0,
        max_iterations,
    };

    if num_artificial > 0 {
        let mut cost = vec![0f64; columns];
        cost[n + m..].iter_mut().for_each(|val| *val = -1.);
        solver.optimize(&cost, columns)?;

        solver.refactor(true);
        let rhs_scale = 1. + b.iter().fold(0f64, |acc, val| acc.max(val.abs()));
        if solver.tableau.objective(&cost) < -1e-9 * rhs_scale {
            return Ok(LpSolution::Infeasible);
        }

        // Drive the remaining artificial variables out of the basis. Rows
        // where this is impossible are redundant and stay at zero.
        for i in 0..m {
            if solver.tableau.basis[i] < n + m {
                continue;
            }
            let row = &solver.tableau.rows[i];
            let col = (0..n + m)
                .filter(|&j| !solver.tableau.is_basic[j])
                .max_by(|&p, &q| row[p].abs().total_cmp(&row[q].abs()))
                .filter(|&j| row[j].abs() > PIVOT_TOL * scale);
            if let Some(col) = col {
                solver.tableau.pivot(i, col);
            }
        }
        solver.refactor(false);
    }

    let mut cost = vec![0f64; columns];
    cost[..n].copy_from_slice(c);
    if !solver.optimize(&cost, n + m)? {
        return Ok(LpSolution::Unbounded);
    }
    solver.refactor(true);

    let mut x = vec![0f64; n];
    for (&b, &val) in solver.tableau.basis.iter().zip(solver.tableau.rhs.iter()) {
        if b < n {
            x[b] = val.max(0.);
        }
    }
    let value = c.iter().zip(x.iter()).map(|(c, x)| c * x).sum();
    Ok(LpSolution::Optimal { x, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn textbook_problem() {
        // max 3x + 5y, x <= 4, 2y <= 12, 3x + 2y <= 18
        let solution = maximize(
            &[3., 5.],
            &[vec![1., 0.], vec![0., 2.], vec![3., 2.]],
            &[4., 12., 18.],
            100,
        )
        .unwrap();
        let LpSolution::Optimal { x, value } = solution.clone() else {
            panic!("expected an optimal solution, got {solution:?}");
        };
        assert_abs_diff_eq!(value, 36., epsilon = 1e-9);
        assert_abs_diff_eq!(x[0], 2., epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 6., epsilon = 1e-9);
    }

    #[test]
    fn needs_phase_one() {
        // max -x - y, x + y >= 2, x <= 3
        let solution = maximize(
            &[-1., -1.],
            &[vec![-1., -1.], vec![1., 0.]],
            &[-2., 3.],
            100,
        )
        .unwrap();
        let LpSolution::Optimal { x, value } = solution.clone() else {
            panic!("expected an optimal solution, got {solution:?}");
        };
        assert_abs_diff_eq!(value, -2., epsilon = 1e-9);
        assert_abs_diff_eq!(x[0] + x[1], 2., epsilon = 1e-9);
    }

    #[test]
    fn infeasible_problem() {
        // x <= 1, x >= 2
        let solution = maximize(&[1.], &[vec![1.], vec![-1.]], &[1., -2.], 100).unwrap();
        assert_eq!(solution, LpSolution::Infeasible);
    }

    #[test]
    fn unbounded_problem() {
        // max x + y, x - y <= 1
        let solution = maximize(&[1., 1.], &[vec![1., -1.]], &[1.], 100).unwrap();
        assert_eq!(solution, LpSolution::Unbounded);
    }

    #[test]
    fn degenerate_vertex() {
        // Several constraints meet at the optimum.
        let solution = maximize(
            &[1., 1.],
            &[
                vec![1., 0.],
                vec![0., 1.],
                vec![1., 1.],
                vec![2., 1.],
                vec![1., 2.],
            ],
            &[1., 1., 2., 3., 3.],
            100,
        )
        .unwrap();
        let LpSolution::Optimal { value, .. } = solution.clone() else {
            panic!("expected an optimal solution, got {solution:?}");
        };
        assert_abs_diff_eq!(value, 2., epsilon = 1e-9);
    }

    #[test]
    fn iteration_limit() {
        let err = maximize(
            &[3., 5.],
            &[vec![1., 0.], vec![0., 2.], vec![3., 2.]],
            &[4., 12., 18.],
            1,
        )
        .unwrap_err();
        assert_eq!(err, PolytopeError::LpIterationLimit(1));
    }
}
