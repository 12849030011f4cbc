use faer::Mat;
use itertools::Itertools;
use log::debug;

use crate::{
    constraints::ConstraintsSystem,
    error::{PolytopeError, Result},
    math::axpy,
    polytope::Polytope,
    simplex::{maximize, LpSolution},
    subspace::ReducedSystem,
};

/// The largest ball inscribed in a polytope.
#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevBall {
    pub center: Box<[f64]>,
    pub radius: f64,
}

/// Find the Chebyshev center of `polytope`.
///
/// Solves `max r` subject to `a_i·y / ‖a_i‖ + r ≤ b_i / ‖a_i‖` with the free
/// variables split as `y = y⁺ − y⁻`. The radius must exceed `tol`, otherwise
/// the polytope has no interior.
pub fn chebyshev_center(
    polytope: &Polytope,
    tol: f64,
    max_iterations: usize,
) -> Result<ChebyshevBall> {
    let k = polytope.dim();
    if k == 0 {
        return Err(PolytopeError::DegeneratePolytope { radius: 0. });
    }
    if polytope.num_rows() == 0 {
        return Err(PolytopeError::UnboundedPolytope);
    }

    let rows = (0..polytope.num_rows())
        .map(|i| {
            let a = polytope.row(i);
            let norm = polytope.row_norm(i);
            a.iter()
                .map(|val| val / norm)
                .chain(a.iter().map(|val| -val / norm))
                .chain(std::iter::once(1.))
                .collect_vec()
        })
        .collect_vec();
    let rhs = (0..polytope.num_rows())
        .map(|i| polytope.rhs(i) / polytope.row_norm(i))
        .collect_vec();
    let mut objective = vec![0f64; 2 * k + 1];
    objective[2 * k] = 1.;

    let (x, radius) = match maximize(&objective, &rows, &rhs, max_iterations)? {
        LpSolution::Optimal { x, value } => (x, value),
        LpSolution::Infeasible => {
            return Err(PolytopeError::InfeasibleSystem(
                "no point satisfies all inequality constraints".to_string(),
            ))
        }
        LpSolution::Unbounded => return Err(PolytopeError::UnboundedPolytope),
    };

    if !(radius > tol) {
        return Err(PolytopeError::DegeneratePolytope { radius });
    }

    let center: Box<[f64]> = (0..k).map(|j| x[j] - x[k + j]).collect();
    debug!("Chebyshev center found with radius {radius:e}");
    Ok(ChebyshevBall { center, radius })
}

/// Fail with `UnboundedPolytope` if the polytope contains a ray.
///
/// The recession cone `{d : A·d ≤ 0}` only contains zero if `A` has full
/// column rank and no direction in the cone makes any row strictly negative.
/// The second part is the linear program `max −Σ a_i·d` over the cone, cut
/// off by `−a_i·d ≤ 1`, which must have the value zero.
pub fn check_bounded(polytope: &Polytope, max_iterations: usize) -> Result<()> {
    let k = polytope.dim();
    let m = polytope.num_rows();
    if k == 0 {
        return Ok(());
    }
    if m < k + 1 {
        return Err(PolytopeError::UnboundedPolytope);
    }

    let normals = (0..m)
        .map(|i| {
            let norm = polytope.row_norm(i);
            polytope.row(i).iter().map(|val| val / norm).collect_vec()
        })
        .collect_vec();

    let gram = Mat::from_fn(k, k, |i, j| {
        normals.iter().map(|row| row[i] * row[j]).sum::<f64>()
    });
    let eig = gram.self_adjoint_eigen(faer::Side::Lower).map_err(|_| {
        PolytopeError::InfeasibleSystem(
            "eigendecomposition of the inequality constraints did not converge".to_string(),
        )
    })?;
    let values = eig.S().column_vector().iter().copied().collect_vec();
    let largest = values.iter().fold(0f64, |acc, &val| acc.max(val));
    let smallest = values.iter().fold(f64::INFINITY, |acc, &val| acc.min(val));
    if smallest <= largest * (k as f64) * 1e-12 {
        debug!("Inequality constraints leave a line free (smallest eigenvalue {smallest:e})");
        return Err(PolytopeError::UnboundedPolytope);
    }

    let rows = normals
        .iter()
        .map(|a| a.iter().copied().chain(a.iter().map(|val| -val)).collect_vec())
        .chain(
            normals
                .iter()
                .map(|a| a.iter().map(|val| -val).chain(a.iter().copied()).collect_vec()),
        )
        .collect_vec();
    let rhs = [vec![0f64; m], vec![1f64; m]].concat();
    let mut total = vec![0f64; k];
    normals.iter().for_each(|a| axpy(a, &mut total, -1.));
    let objective = total
        .iter()
        .copied()
        .chain(total.iter().map(|val| -val))
        .collect_vec();

    match maximize(&objective, &rows, &rhs, max_iterations)? {
        LpSolution::Optimal { value, .. } if value <= 1e-7 => Ok(()),
        solution => {
            debug!("Recession cone of the polytope is not trivial: {solution:?}");
            Err(PolytopeError::UnboundedPolytope)
        }
    }
}

/// Check a full-space start point against every original constraint and
/// return its reduced coordinates.
pub fn project_start_point(
    system: &ConstraintsSystem,
    reduced: &ReducedSystem,
    point: &[f64],
    tol: f64,
) -> Result<Box<[f64]>> {
    if point.len() != system.dim() {
        return Err(PolytopeError::PointDimension {
            expected: system.dim(),
            found: point.len(),
        });
    }
    if let Some((row, violation)) = system.first_violated(point, tol) {
        return Err(PolytopeError::InfeasibleStartPoint { row, violation });
    }
    Ok(reduced.subspace().project(point))
}
