use faer::Mat;
use itertools::Itertools;
use log::debug;

use crate::{
    constraints::{ConstraintsSystem, Relation},
    error::{PolytopeError, Result},
    math::{axpy, norm, vector_dot},
    polytope::Polytope,
};

/// The affine map `x = T·y + o` between the reduced space and the full space.
///
/// The columns of `T` are orthonormal, so `T⁺ = Tᵀ` and distances measured in
/// the reduced space equal distances in the full space.
#[derive(Debug, Clone)]
pub struct Subspace {
    /// Columns of `T`.
    basis: Vec<Box<[f64]>>,
    offset: Box<[f64]>,
}

impl Subspace {
    /// The identity map over `dim` variables.
    pub fn identity(dim: usize) -> Self {
        let basis = (0..dim)
            .map(|j| (0..dim).map(|i| if i == j { 1. } else { 0. }).collect())
            .collect();
        Self {
            basis,
            offset: vec![0f64; dim].into(),
        }
    }

    /// Number of variables in the full space.
    pub fn full_dim(&self) -> usize {
        self.offset.len()
    }

    /// Number of free variables in the reduced space.
    pub fn reduced_dim(&self) -> usize {
        self.basis.len()
    }

    pub fn offset(&self) -> &[f64] {
        &self.offset
    }

    /// Column `j` of `T`.
    pub fn direction(&self, j: usize) -> &[f64] {
        &self.basis[j]
    }

    /// Map a reduced point to the full space: `x = T·y + o`.
    pub fn expand(&self, reduced: &[f64]) -> Box<[f64]> {
        assert!(reduced.len() == self.reduced_dim());
        let mut full = self.offset.clone();
        for (j, &y) in reduced.iter().enumerate() {
            axpy(self.direction(j), &mut full, y);
        }
        full
    }

    /// Map a full point to the reduced space: `y = Tᵀ·(x − o)`.
    pub fn project(&self, full: &[f64]) -> Box<[f64]> {
        assert!(full.len() == self.full_dim());
        let shifted = full
            .iter()
            .zip(self.offset.iter())
            .map(|(x, o)| x - o)
            .collect_vec();
        (0..self.reduced_dim())
            .map(|j| vector_dot(self.direction(j), &shifted))
            .collect()
    }
}

/// A constraints system with its equalities eliminated.
#[derive(Debug, Clone)]
pub struct ReducedSystem {
    subspace: Subspace,
    polytope: Polytope,
}

impl ReducedSystem {
    /// Eliminate the equality constraints of `system`.
    ///
    /// The null space of the equality matrix `E` and a particular solution of
    /// `E·x = e` are obtained from the eigendecomposition of `EᵀE`. Every
    /// inequality is substituted with `x = T·y + o` and stored in `≤` form.
    pub fn new(system: &ConstraintsSystem, tol: f64) -> Result<Self> {
        let (equalities, inequalities): (Vec<_>, Vec<_>) = system
            .iter()
            .enumerate()
            .partition(|(_, c)| c.relation() == Relation::Equal);

        let subspace = if equalities.is_empty() {
            Subspace::identity(system.dim())
        } else {
            let rows = equalities
                .iter()
                .map(|(_, c)| c.coefficients())
                .collect_vec();
            let rhs = equalities.iter().map(|(_, c)| c.rhs()).collect_vec();
            let subspace = null_space(&rows, &rhs, system.dim())?;

            for (row, constraint) in equalities.iter() {
                let residual = constraint.violation(subspace.offset());
                if residual > tol * (1. + constraint.rhs().abs()) {
                    return Err(PolytopeError::InfeasibleSystem(format!(
                        "equality constraint {row} contradicts the other equalities (residual {residual:e})"
                    )));
                }
            }
            subspace
        };

        let k = subspace.reduced_dim();
        let mut polytope = Polytope::with_capacity(k, inequalities.len());
        let mut reduced = vec![0f64; k];
        for (row, constraint) in inequalities {
            let a = constraint.coefficients();
            reduced
                .iter_mut()
                .enumerate()
                .for_each(|(j, val)| *val = vector_dot(a, subspace.direction(j)));
            let mut b = constraint.rhs() - vector_dot(a, subspace.offset());
            if constraint.relation() == Relation::GreaterEqual {
                reduced.iter_mut().for_each(|val| *val = -*val);
                b = -b;
            }

            if norm(&reduced) <= 1e-12 * norm(a) {
                // The constraint is constant on the equality subspace.
                if b < -tol * (1. + constraint.rhs().abs()) {
                    return Err(PolytopeError::InfeasibleSystem(format!(
                        "constraint {row} cannot hold on the subspace defined by the equalities"
                    )));
                }
                continue;
            }
            polytope.push(&reduced, b, row);
        }

        debug!(
            "Reduced {} variables to {} free variables with {} inequalities",
            system.dim(),
            k,
            polytope.num_rows()
        );

        Ok(Self { subspace, polytope })
    }

    pub fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    pub fn polytope(&self) -> &Polytope {
        &self.polytope
    }

    pub fn full_dim(&self) -> usize {
        self.subspace.full_dim()
    }

    pub fn reduced_dim(&self) -> usize {
        self.subspace.reduced_dim()
    }
}

/// Orthonormal basis of `{x : E·x = 0}` and the minimum norm solution of
/// `E·x = e`.
///
/// Rows are scaled to unit length first so the rank decision does not depend
/// on the magnitude of the coefficients. Zero rows carry no direction and are
/// left to the residual check of the caller.
fn null_space(rows: &[&[f64]], rhs: &[f64], dim: usize) -> Result<Subspace> {
    let (rows, rhs): (Vec<_>, Vec<_>) = rows
        .iter()
        .zip(rhs)
        .filter_map(|(row, &e)| {
            let len = norm(row);
            (len > 0.).then(|| (row.iter().map(|a| a / len).collect_vec(), e / len))
        })
        .unzip();
    if rows.is_empty() {
        return Ok(Subspace::identity(dim));
    }

    let gram = Mat::from_fn(dim, dim, |i, j| {
        rows.iter().map(|row| row[i] * row[j]).sum::<f64>()
    });
    let eig = gram
        .self_adjoint_eigen(faer::Side::Lower)
        .map_err(|_| {
            PolytopeError::InfeasibleSystem(
                "eigendecomposition of the equality constraints did not converge".to_string(),
            )
        })?;

    let values = eig.S().column_vector().iter().copied().collect_vec();
    let vectors = eig
        .U()
        .col_iter()
        .map(|col| col.iter().copied().collect::<Box<[f64]>>())
        .collect_vec();

    let largest = values.iter().fold(0f64, |acc, &val| acc.max(val.abs()));
    let threshold = largest * (dim as f64) * 1e-12;

    // Eᵀe, projected on the row space below.
    let mut ete = vec![0f64; dim];
    for (row, &e) in rows.iter().zip(&rhs) {
        axpy(row, &mut ete, e);
    }

    let mut offset = vec![0f64; dim];
    let mut basis = Vec::new();
    for (val, v) in values.into_iter().zip(vectors) {
        if val > threshold {
            axpy(&v, &mut offset, vector_dot(&v, &ete) / val);
        } else {
            basis.push(v);
        }
    }

    Ok(Subspace {
        basis,
        offset: offset.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    fn simplex(dim: usize) -> ConstraintsSystem {
        let mut lhs = (0..dim)
            .map(|i| {
                let mut row = vec![0.; dim];
                row[i] = 1.;
                row
            })
            .collect_vec();
        lhs.push(vec![1.; dim]);
        let mut rel = vec![">="; dim];
        rel.push("=");
        let mut rhs = vec![0.; dim];
        rhs.push(1.);
        ConstraintsSystem::new(&lhs, &rel, &rhs).unwrap()
    }

    #[test]
    fn no_equalities_is_identity() {
        let system =
            ConstraintsSystem::new(&[vec![1., 0.], vec![0., 1.]], &["<=", ">="], &[1., -1.])
                .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 2);
        assert_eq!(reduced.subspace().offset(), &[0., 0.]);
        assert_eq!(&*reduced.subspace().expand(&[0.5, 2.]), &[0.5, 2.]);
        assert_eq!(reduced.polytope().num_rows(), 2);
        // y >= -1 is stored as -y <= 1
        assert_eq!(reduced.polytope().row(1), &[0., -1.]);
        assert_eq!(reduced.polytope().rhs(1), 1.);
    }

    #[test]
    fn simplex_reduction() {
        let system = simplex(4);
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.full_dim(), 4);
        assert_eq!(reduced.reduced_dim(), 3);
        assert_eq!(reduced.polytope().num_rows(), 4);

        let offset = reduced.subspace().offset();
        assert_abs_diff_eq!(offset.iter().sum::<f64>(), 1., epsilon = 1e-12);

        // Every basis vector is orthogonal to the normal of the equality.
        for j in 0..3 {
            let col = reduced.subspace().direction(j);
            assert_abs_diff_eq!(col.iter().sum::<f64>(), 0., epsilon = 1e-12);
            assert_abs_diff_eq!(norm(col), 1., epsilon = 1e-12);
        }

        let x = [0.1, 0.2, 0.3, 0.4];
        let y = reduced.subspace().project(&x);
        let back = reduced.subspace().expand(&y);
        for (a, b) in x.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn redundant_equalities() {
        let system = ConstraintsSystem::new(
            &[
                vec![1., 1., 0.],
                vec![2., 2., 0.],
                vec![1., 0., 0.],
                vec![0., 0., 1.],
                vec![0., 0., 1.],
            ],
            &["=", "=", ">=", ">=", "<="],
            &[1., 2., 0., 0., 1.],
        )
        .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 2);
    }

    #[test]
    fn contradicting_equalities() {
        let system = ConstraintsSystem::new(
            &[vec![1., 1.], vec![1., 1.], vec![1., 0.]],
            &["=", "=", ">="],
            &[1., 2., 0.],
        )
        .unwrap();
        let err = ReducedSystem::new(&system, 1e-9).unwrap_err();
        assert!(matches!(err, PolytopeError::InfeasibleSystem(_)));
    }

    #[test]
    fn constant_rows_are_checked() {
        // x = 1, y free in [0, 1], and x <= 2 becomes constant.
        let system = ConstraintsSystem::new(
            &[vec![1., 0.], vec![1., 0.], vec![0., 1.], vec![0., 1.]],
            &["=", "<=", ">=", "<="],
            &[1., 2., 0., 1.],
        )
        .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 1);
        assert_eq!(reduced.polytope().num_rows(), 2);

        let system = ConstraintsSystem::new(
            &[vec![1., 0.], vec![1., 0.], vec![0., 1.]],
            &["=", ">=", ">="],
            &[1., 2., 0.],
        )
        .unwrap();
        let err = ReducedSystem::new(&system, 1e-9).unwrap_err();
        assert!(matches!(err, PolytopeError::InfeasibleSystem(_)));
    }

    #[test]
    fn small_coefficients() {
        // 1e-7·(x + y + z) = 1e-7 describes the same simplex as x + y + z = 1.
        let system = ConstraintsSystem::new(
            &[
                vec![1., 0., 0.],
                vec![0., 1., 0.],
                vec![0., 0., 1.],
                vec![1e-7, 1e-7, 1e-7],
            ],
            &[">=", ">=", ">=", "="],
            &[0., 0., 0., 1e-7],
        )
        .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 2);
        assert_eq!(reduced.polytope().num_rows(), 3);
        let offset = reduced.subspace().offset();
        assert_abs_diff_eq!(offset.iter().sum::<f64>(), 1., epsilon = 1e-12);
        for val in offset.iter() {
            assert_abs_diff_eq!(*val, 1. / 3., epsilon = 1e-12);
        }

        let system = ConstraintsSystem::new(
            &[vec![1e-8, 0.], vec![0., 1e-8], vec![1e-8, 1e-8]],
            &["=", ">=", "<="],
            &[1e-8, 0., 3e-8],
        )
        .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 1);
        assert_abs_diff_eq!(reduced.subspace().offset()[0], 1., epsilon = 1e-12);
    }

    #[test]
    fn zero_equality_rows() {
        let system = ConstraintsSystem::new(
            &[vec![0., 0.], vec![1., 0.], vec![0., 1.]],
            &["=", ">=", ">="],
            &[0., 0., 0.],
        )
        .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 2);

        let system = ConstraintsSystem::new(&[vec![0., 0.], vec![1., 0.]], &["=", ">="], &[1., 0.]).unwrap();
        let err = ReducedSystem::new(&system, 1e-9).unwrap_err();
        assert!(matches!(err, PolytopeError::InfeasibleSystem(_)));
    }

    #[test]
    fn pinned_point() {
        let system = ConstraintsSystem::new(
            &[vec![1., 0.], vec![0., 1.], vec![1., 1.]],
            &["=", "=", "<="],
            &[0.25, 0.5, 1.],
        )
        .unwrap();
        let reduced = ReducedSystem::new(&system, 1e-9).unwrap();
        assert_eq!(reduced.reduced_dim(), 0);
        assert_eq!(reduced.polytope().num_rows(), 0);
        let x = reduced.subspace().expand(&[]);
        assert_abs_diff_eq!(x[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.5, epsilon = 1e-12);
    }
}
