use log::warn;
use rand::Rng;

use crate::{
    error::{PolytopeError, Result},
    hit_and_run::{random_direction, SamplingAlgorithm, StepInfo},
    math::{axpy, vector_dot},
    polytope::Polytope,
};

/// What to do with a proposal that falls outside the polytope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfBounds {
    /// Pull the proposal back along its direction onto the boundary.
    #[default]
    Crop,
    /// Mirror the part of the move beyond the boundary back into the polytope.
    Reflect,
    /// Throw the proposal away and draw a new one.
    Discard,
}

/// Draw points uniformly from a ball around the current point.
#[derive(Debug, Clone, Copy)]
pub struct SphereWalk {
    /// Radius of the ball, in the metric of the full space.
    pub radius: f64,
    pub out_of_bounds: OutOfBounds,
    /// Maximum number of proposals per sample.
    pub max_retries: usize,
    /// Maximum number of boundary reflections per proposal.
    pub max_reflections: usize,
}

impl SphereWalk {
    pub fn new(radius: f64, out_of_bounds: OutOfBounds) -> Self {
        Self {
            radius,
            out_of_bounds,
            max_retries: 1000,
            max_reflections: 64,
        }
    }

    /// Follow `direction` for `distance`, bouncing off the boundary.
    fn reflect(&self, polytope: &Polytope, point: &mut [f64], direction: &mut [f64], distance: f64) {
        let mut remaining = distance;
        for _ in 0..self.max_reflections {
            let Some(segment) = polytope.segment(point, direction) else {
                return;
            };
            if remaining <= segment.upper {
                axpy(direction, point, remaining);
                return;
            }
            let Some(row) = segment.upper_row else {
                return;
            };
            axpy(direction, point, segment.upper);
            remaining -= segment.upper;

            let normal = polytope.row(row);
            let norm_sq = polytope.row_norm(row).powi(2);
            let factor = -2. * vector_dot(normal, direction) / norm_sq;
            axpy(normal, direction, factor);
        }
    }
}

impl SamplingAlgorithm for SphereWalk {
    fn advance<R: Rng + ?Sized>(
        &self,
        polytope: &Polytope,
        point: &mut [f64],
        rng: &mut R,
    ) -> Result<StepInfo> {
        if !(self.radius > 0. && self.radius.is_finite()) {
            return Err(PolytopeError::InvalidArgument(format!(
                "sphere walk radius must be positive and finite, got {}",
                self.radius
            )));
        }

        let dim = point.len();
        let mut direction = vec![0f64; dim];
        let mut info = StepInfo::default();
        let attempts = self.max_retries.max(1);

        for _ in 0..attempts {
            random_direction(rng, &mut direction);
            // Uniform in volume, not in radius.
            let u: f64 = rng.random();
            let distance = self.radius * u.powf(1. / dim as f64);

            let Some(segment) = polytope.segment(point, &direction) else {
                info.redrawn += 1;
                continue;
            };

            if distance <= segment.upper {
                axpy(&direction, point, distance);
                return Ok(info);
            }

            match self.out_of_bounds {
                OutOfBounds::Crop => {
                    axpy(&direction, point, segment.upper);
                    return Ok(info);
                }
                OutOfBounds::Reflect => {
                    self.reflect(polytope, point, &mut direction, distance);
                    return Ok(info);
                }
                OutOfBounds::Discard => {
                    info.redrawn += 1;
                }
            }
        }

        warn!("Sphere walk gave up after {attempts} proposals");
        Err(PolytopeError::NeighborhoodSamplingExhausted { attempts })
    }
}
