use log::warn;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    error::{PolytopeError, Result},
    math::{axpy, norm},
    polytope::Polytope,
};

/// Information about a single move of a sampling algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInfo {
    /// Number of directions that were discarded before the move succeeded.
    pub redrawn: usize,
}

/// Move a point inside a polytope.
///
/// Implementations draw a new point given the current one, using the
/// polytope to find out how far they can travel along a line. The point is
/// overwritten in place.
pub trait SamplingAlgorithm {
    fn advance<R: Rng + ?Sized>(
        &self,
        polytope: &Polytope,
        point: &mut [f64],
        rng: &mut R,
    ) -> Result<StepInfo>;
}

impl<A: SamplingAlgorithm + ?Sized> SamplingAlgorithm for &A {
    fn advance<R: Rng + ?Sized>(
        &self,
        polytope: &Polytope,
        point: &mut [f64],
        rng: &mut R,
    ) -> Result<StepInfo> {
        (**self).advance(polytope, point, rng)
    }
}

/// Fill `direction` with a vector distributed uniformly on the unit sphere.
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R, direction: &mut [f64]) {
    if direction.is_empty() {
        return;
    }
    loop {
        direction
            .iter_mut()
            .for_each(|val| *val = rng.sample(StandardNormal));
        let length = norm(direction);
        if length > 0. && length.is_finite() {
            direction.iter_mut().for_each(|val| *val /= length);
            return;
        }
    }
}

/// Settings for the hit-and-run walk
#[derive(Debug, Clone, Copy)]
pub struct HitAndRun {
    /// How often a direction with an empty or unbounded feasible segment is
    /// replaced before the step fails.
    pub max_retries: usize,
}

impl Default for HitAndRun {
    fn default() -> Self {
        Self { max_retries: 50 }
    }
}

impl HitAndRun {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SamplingAlgorithm for HitAndRun {
    fn advance<R: Rng + ?Sized>(
        &self,
        polytope: &Polytope,
        point: &mut [f64],
        rng: &mut R,
    ) -> Result<StepInfo> {
        let mut direction = vec![0f64; point.len()];
        let mut info = StepInfo::default();

        for _ in 0..self.max_retries.max(1) {
            random_direction(rng, &mut direction);
            match polytope.segment(point, &direction) {
                Some(segment) if segment.is_bounded() && segment.length() > 0. => {
                    let t = segment.sample(rng);
                    axpy(&direction, point, t);
                    return Ok(info);
                }
                segment => {
                    warn!("Redrawing hit-and-run direction, feasible segment was {segment:?}");
                    info.redrawn += 1;
                }
            }
        }
        Err(PolytopeError::UnboundedOrEmptySegment {
            attempts: self.max_retries.max(1),
        })
    }
}
