//! Uniform sampling from convex polytopes given by linear constraints.
//!
//! Equality constraints are eliminated once, and a Markov chain then moves
//! through the remaining full-dimensional polytope with hit-and-run steps.
//!
//! ```
//! use polysample::{ConstraintsSystem, CubicThinning, HitAndRun, PolytopeRunner, RunnerSettings};
//!
//! // The 2-simplex x + y + z = 1, x, y, z >= 0.
//! let system = ConstraintsSystem::new(
//!     &[vec![1., 0., 0.], vec![0., 1., 0.], vec![0., 0., 1.], vec![1., 1., 1.]],
//!     &[">=", ">=", ">=", "="],
//!     &[0., 0., 0., 1.],
//! )?;
//! let mut runner = PolytopeRunner::with_settings(system, RunnerSettings::with_seed(42))?;
//! runner.set_any_start_point()?;
//! let samples = runner.chain(&HitAndRun::default(), &CubicThinning::new(1.), 100)?;
//! assert_eq!(samples.len(), 100);
//! # Ok::<(), polysample::PolytopeError>(())
//! ```

pub(crate) mod constraints;
pub(crate) mod error;
pub(crate) mod hit_and_run;
pub(crate) mod math;
pub(crate) mod parallel;
pub(crate) mod polytope;
pub(crate) mod runner;
pub(crate) mod simplex;
pub(crate) mod sphere_walk;
pub(crate) mod start_point;
pub(crate) mod subspace;
pub(crate) mod thinning;

pub use constraints::{Constraint, ConstraintsSystem, Relation};
pub use error::{PolytopeError, Result};
pub use hit_and_run::{random_direction, HitAndRun, SamplingAlgorithm, StepInfo};
pub use parallel::sample_parallel;
pub use polytope::{Polytope, Segment};
pub use runner::{ChainStats, Draws, PolytopeRunner, RunnerSettings};
pub use sphere_walk::{OutOfBounds, SphereWalk};
pub use start_point::{check_bounded, chebyshev_center, project_start_point, ChebyshevBall};
pub use subspace::{ReducedSystem, Subspace};
pub use thinning::{CubicThinning, LinearThinning, NoThinning, Thinning};
