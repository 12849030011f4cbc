use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolytopeError {
    #[error("Dimension mismatch at constraint {row}: expected {expected} entries, found {found}")]
    Dimension {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown relation symbol {0:?}, expected one of <=, =, >=")]
    InvalidRelation(String),
    #[error("Constraints are infeasible: {0}")]
    InfeasibleSystem(String),
    #[error("No interior point: constraints are infeasible or the polytope has an empty interior (inscribed radius {radius:e})")]
    DegeneratePolytope { radius: f64 },
    #[error("The polytope is unbounded, its inscribed ball can grow without limit")]
    UnboundedPolytope,
    #[error("Start point violates constraint {row} by {violation:e}")]
    InfeasibleStartPoint { row: usize, violation: f64 },
    #[error("Point has {found} coordinates, expected {expected}")]
    PointDimension { expected: usize, found: usize },
    #[error("No start point set, call set_start_point or set_any_start_point first")]
    NoStartPoint,
    #[error("Feasible segment along the sampled direction is empty or unbounded after {attempts} attempts")]
    UnboundedOrEmptySegment { attempts: usize },
    #[error("Could not draw a neighborhood sample inside the polytope after {attempts} attempts")]
    NeighborhoodSamplingExhausted { attempts: usize },
    #[error("Linear program did not converge within {0} pivots")]
    LpIterationLimit(usize),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, PolytopeError>;
