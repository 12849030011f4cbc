use std::ops::ControlFlow;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    constraints::ConstraintsSystem,
    error::{PolytopeError, Result},
    hit_and_run::SamplingAlgorithm,
    start_point::{check_bounded, chebyshev_center, project_start_point},
    subspace::ReducedSystem,
    thinning::Thinning,
};

/// Settings for a polytope runner
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// Relative tolerance used when checking constraints. A constraint
    /// `a·x ≤ b` counts as satisfied if `a·x ≤ b + tolerance·(1 + |b|)`.
    pub tolerance: f64,
    /// Seed of the random number generator. Without a seed the generator is
    /// seeded from the thread local generator and runs are not reproducible.
    pub seed: Option<u64>,
    /// Stream of the generator. Chains that share a seed but use different
    /// streams are statistically independent.
    pub chain: u64,
    /// Maximum number of simplex pivots when searching a start point.
    pub max_lp_iterations: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            seed: None,
            chain: 0,
            max_lp_iterations: 10_000,
        }
    }
}

impl RunnerSettings {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub(crate) fn new_rng(&self) -> ChaCha8Rng {
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        rng.set_stream(self.chain);
        rng
    }
}

/// Counters of the work the chain has done since its start point was set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ChainStats {
    /// Samples emitted by the chain.
    pub draws: u64,
    /// Moves of the chain, including the ones removed by thinning.
    pub steps: u64,
    /// Directions or proposals that were drawn again.
    pub redrawn: u64,
}

/// Samples a polytope given by linear constraints.
///
/// The runner eliminates the equality constraints once, keeps the current
/// point of a Markov chain in the reduced space and returns samples in the
/// coordinates of the original system. It is not meant to be shared between
/// threads; run several runners with different streams for parallel chains.
pub struct PolytopeRunner<R: Rng = ChaCha8Rng> {
    system: ConstraintsSystem,
    reduced: ReducedSystem,
    settings: RunnerSettings,
    rng: R,
    current: Option<Box<[f64]>>,
    bounded: bool,
    stats: ChainStats,
}

impl PolytopeRunner<ChaCha8Rng> {
    pub fn new(system: ConstraintsSystem) -> Result<Self> {
        Self::with_settings(system, RunnerSettings::default())
    }

    pub fn with_settings(system: ConstraintsSystem, settings: RunnerSettings) -> Result<Self> {
        let rng = settings.new_rng();
        Self::with_rng(system, settings, rng)
    }
}

impl<R: Rng> PolytopeRunner<R> {
    /// Create a runner that draws its randomness from `rng`.
    pub fn with_rng(system: ConstraintsSystem, settings: RunnerSettings, rng: R) -> Result<Self> {
        if !(settings.tolerance >= 0.) {
            return Err(PolytopeError::InvalidArgument(format!(
                "tolerance must be non-negative, got {}",
                settings.tolerance
            )));
        }
        let reduced = ReducedSystem::new(&system, settings.tolerance)?;
        Ok(Self {
            system,
            reduced,
            settings,
            rng,
            current: None,
            bounded: false,
            stats: ChainStats::default(),
        })
    }

    pub fn system(&self) -> &ConstraintsSystem {
        &self.system
    }

    pub fn reduced(&self) -> &ReducedSystem {
        &self.reduced
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// The number of variables of the constraints system.
    pub fn dim(&self) -> usize {
        self.reduced.full_dim()
    }

    /// The number of free variables left after removing the equalities.
    pub fn reduced_dim(&self) -> usize {
        self.reduced.reduced_dim()
    }

    /// The current point of the chain in the original coordinates.
    pub fn current_point(&self) -> Option<Box<[f64]>> {
        self.current
            .as_ref()
            .map(|point| self.reduced.subspace().expand(point))
    }

    /// Start the chain at `point`.
    ///
    /// Fails if the point violates a constraint by more than the tolerance,
    /// or if the polytope is unbounded.
    pub fn set_start_point(&mut self, point: &[f64]) -> Result<()> {
        if self.reduced_dim() == 0 {
            return Err(PolytopeError::DegeneratePolytope { radius: 0. });
        }
        let reduced = project_start_point(&self.system, &self.reduced, point, self.settings.tolerance)?;
        self.ensure_bounded()?;
        self.restart(reduced);
        Ok(())
    }

    /// Start the chain at the Chebyshev center of the polytope.
    pub fn set_any_start_point(&mut self) -> Result<()> {
        let ball = chebyshev_center(
            self.reduced.polytope(),
            self.settings.tolerance,
            self.settings.max_lp_iterations,
        )?;
        self.ensure_bounded()?;
        self.restart(ball.center);
        Ok(())
    }

    /// Runs the recession cone check once per runner.
    fn ensure_bounded(&mut self) -> Result<()> {
        if !self.bounded {
            check_bounded(self.reduced.polytope(), self.settings.max_lp_iterations)?;
            self.bounded = true;
        }
        Ok(())
    }

    fn restart(&mut self, point: Box<[f64]>) {
        debug!("Chain restarted at reduced point {point:?}");
        self.current = Some(point);
        self.stats = ChainStats::default();
    }

    /// Advance the chain by `skip + 1` moves and return the new point in the
    /// original coordinates.
    fn step<A: SamplingAlgorithm + ?Sized>(&mut self, algorithm: &A, skip: usize) -> Result<Box<[f64]>> {
        let point = self.current.as_mut().ok_or(PolytopeError::NoStartPoint)?;
        for _ in 0..=skip {
            let info = algorithm.advance(self.reduced.polytope(), point, &mut self.rng)?;
            self.stats.steps += 1;
            self.stats.redrawn += info.redrawn as u64;
        }
        self.stats.draws += 1;
        Ok(self.reduced.subspace().expand(point))
    }

    /// A lazy sequence of `count` chain samples.
    ///
    /// Every item advances the chain, so consuming `n` items and dropping the
    /// iterator leaves the runner in the state it would have after requesting
    /// exactly `n` samples.
    pub fn draws<'a, A, T>(
        &'a mut self,
        algorithm: &'a A,
        thinning: &T,
        count: usize,
    ) -> Result<Draws<'a, A, R>>
    where
        A: SamplingAlgorithm + ?Sized,
        T: Thinning + ?Sized,
    {
        if self.current.is_none() {
            return Err(PolytopeError::NoStartPoint);
        }
        let skip = thinning.skip(self.reduced_dim());
        Ok(Draws {
            runner: self,
            algorithm,
            skip,
            remaining: count,
        })
    }

    /// Draw `count` samples from the chain.
    pub fn chain<A, T>(&mut self, algorithm: &A, thinning: &T, count: usize) -> Result<Vec<Box<[f64]>>>
    where
        A: SamplingAlgorithm + ?Sized,
        T: Thinning + ?Sized,
    {
        self.draws(algorithm, thinning, count)?.collect()
    }

    /// Draw up to `count` samples and hand each one to `consumer` as soon as
    /// it is available. The consumer can stop the chain early by returning
    /// `ControlFlow::Break`. Returns the number of delivered samples.
    pub fn chain_with<A, T, F>(
        &mut self,
        algorithm: &A,
        thinning: &T,
        count: usize,
        mut consumer: F,
    ) -> Result<usize>
    where
        A: SamplingAlgorithm + ?Sized,
        T: Thinning + ?Sized,
        F: FnMut(&[f64]) -> ControlFlow<()>,
    {
        let mut delivered = 0;
        for sample in self.draws(algorithm, thinning, count)? {
            let sample = sample?;
            delivered += 1;
            if consumer(&sample[..]).is_break() {
                break;
            }
        }
        Ok(delivered)
    }

    /// Draw `count` samples around the current point without moving the
    /// chain. Each sample is one move of `walk` started at the current point.
    pub fn neighborhood<A>(&mut self, walk: &A, count: usize) -> Result<Vec<Box<[f64]>>>
    where
        A: SamplingAlgorithm + ?Sized,
    {
        let center = self.current.as_ref().ok_or(PolytopeError::NoStartPoint)?;
        let mut point = center.clone();
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            point.copy_from_slice(center);
            walk.advance(self.reduced.polytope(), &mut point, &mut self.rng)?;
            samples.push(self.reduced.subspace().expand(&point));
        }
        Ok(samples)
    }
}

/// Samples of a chain, produced on demand.
pub struct Draws<'a, A: ?Sized, R: Rng> {
    runner: &'a mut PolytopeRunner<R>,
    algorithm: &'a A,
    skip: usize,
    remaining: usize,
}

impl<A: SamplingAlgorithm + ?Sized, R: Rng> Iterator for Draws<'_, A, R> {
    type Item = Result<Box<[f64]>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let draw = self.runner.step(self.algorithm, self.skip);
        if draw.is_err() {
            self.remaining = 0;
        }
        Some(draw)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hit_and_run::HitAndRun,
        sphere_walk::{OutOfBounds, SphereWalk},
        thinning::{CubicThinning, LinearThinning, NoThinning},
    };
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    fn triangle() -> ConstraintsSystem {
        ConstraintsSystem::new(
            &[
                vec![1., 0., 0.],
                vec![0., 1., 0.],
                vec![0., 0., 1.],
                vec![1., 1., 1.],
            ],
            &[">=", ">=", ">=", "="],
            &[0., 0., 0., 1.],
        )
        .unwrap()
    }

    #[test]
    fn needs_start_point() {
        let mut runner = PolytopeRunner::with_settings(triangle(), RunnerSettings::with_seed(1)).unwrap();
        let err = runner
            .chain(&HitAndRun::default(), &NoThinning, 10)
            .unwrap_err();
        assert_eq!(err, PolytopeError::NoStartPoint);
        let err = runner
            .neighborhood(&SphereWalk::new(0.1, OutOfBounds::Crop), 3)
            .unwrap_err();
        assert_eq!(err, PolytopeError::NoStartPoint);
        assert!(runner.current_point().is_none());
    }

    #[test]
    fn chain_counts_steps() {
        let mut runner = PolytopeRunner::with_settings(triangle(), RunnerSettings::with_seed(1)).unwrap();
        runner.set_any_start_point().unwrap();
        let samples = runner
            .chain(&HitAndRun::default(), &LinearThinning::new(1.), 10)
            .unwrap();
        assert_eq!(samples.len(), 10);
        let stats = runner.stats();
        assert_eq!(stats.draws, 10);
        // Two free variables, so every sample costs three moves.
        assert_eq!(stats.steps, 30);

        for sample in samples {
            assert_eq!(sample.len(), 3);
            assert_abs_diff_eq!(sample.iter().sum::<f64>(), 1., epsilon = 1e-9);
        }
    }

    #[test]
    fn streaming_matches_batch() {
        let settings = RunnerSettings::with_seed(17);
        let mut batch = PolytopeRunner::with_settings(triangle(), settings).unwrap();
        batch.set_any_start_point().unwrap();
        let expected = batch
            .chain(&HitAndRun::default(), &CubicThinning::new(1.), 50)
            .unwrap();

        let mut streaming = PolytopeRunner::with_settings(triangle(), settings).unwrap();
        streaming.set_any_start_point().unwrap();
        let mut received = Vec::new();
        let delivered = streaming
            .chain_with(&HitAndRun::default(), &CubicThinning::new(1.), 50, |sample| {
                received.push(sample.to_vec().into_boxed_slice());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(delivered, 50);
        assert_eq!(received, expected);
    }

    #[test]
    fn early_stop_keeps_chain_consistent() {
        let settings = RunnerSettings::with_seed(3);
        let mut full = PolytopeRunner::with_settings(triangle(), settings).unwrap();
        full.set_any_start_point().unwrap();
        let mut expected = full
            .chain(&HitAndRun::default(), &NoThinning, 10)
            .unwrap();

        let mut stopped = PolytopeRunner::with_settings(triangle(), settings).unwrap();
        stopped.set_any_start_point().unwrap();
        let mut seen = 0;
        let delivered = stopped
            .chain_with(&HitAndRun::default(), &NoThinning, 10, |_| {
                seen += 1;
                if seen == 4 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(delivered, 4);
        assert_eq!(stopped.stats().draws, 4);

        // Continuing yields the rest of the uninterrupted chain.
        let rest = stopped.chain(&HitAndRun::default(), &NoThinning, 6).unwrap();
        assert_eq!(rest, expected.split_off(4));
    }

    #[test]
    fn neighborhood_keeps_center() {
        let mut runner = PolytopeRunner::with_settings(triangle(), RunnerSettings::with_seed(8)).unwrap();
        runner.set_start_point(&[0.3, 0.1, 0.6]).unwrap();
        let before = runner.current_point().unwrap();
        let samples = runner
            .neighborhood(&SphereWalk::new(0.15, OutOfBounds::Crop), 20)
            .unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(runner.current_point().unwrap(), before);
        assert_eq!(runner.stats().draws, 0);
        for sample in samples {
            assert!(runner.system().is_satisfied(&sample, 1e-9));
            let dist = crate::math::distance(&sample, &before);
            assert!(dist <= 0.15 + 1e-9);
        }
    }

    #[test]
    fn rejects_invalid_start_point() {
        let mut runner = PolytopeRunner::with_settings(triangle(), RunnerSettings::with_seed(8)).unwrap();
        let err = runner.set_start_point(&[0.5, 0.6, -0.1]).unwrap_err();
        assert!(matches!(err, PolytopeError::InfeasibleStartPoint { row: 2, .. }));
        assert!(runner.current_point().is_none());
    }

    #[test]
    fn pinned_system_is_degenerate() {
        let system = ConstraintsSystem::new(
            &[vec![1., 0.], vec![0., 1.]],
            &["=", "="],
            &[0.5, 0.5],
        )
        .unwrap();
        let mut runner = PolytopeRunner::new(system).unwrap();
        assert_eq!(runner.reduced_dim(), 0);
        assert!(matches!(
            runner.set_any_start_point(),
            Err(PolytopeError::DegeneratePolytope { .. })
        ));
        assert!(matches!(
            runner.set_start_point(&[0.5, 0.5]),
            Err(PolytopeError::DegeneratePolytope { .. })
        ));
    }

    #[test]
    fn unbounded_strip_is_rejected() {
        // 0 <= x <= 1 with y free has an inscribed ball of radius 1/2.
        let strip = ConstraintsSystem::new(&[vec![1., 0.], vec![1., 0.]], &[">=", "<="], &[0., 1.]).unwrap();
        let mut runner = PolytopeRunner::with_settings(strip, RunnerSettings::with_seed(4)).unwrap();
        assert_eq!(runner.set_any_start_point(), Err(PolytopeError::UnboundedPolytope));
        assert_eq!(runner.set_start_point(&[0.5, 0.]), Err(PolytopeError::UnboundedPolytope));
        assert!(runner.current_point().is_none());
    }
}
