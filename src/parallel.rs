use anyhow::{Context, Result};
use log::debug;
use rayon::{prelude::*, ThreadPoolBuilder};

use crate::{
    constraints::ConstraintsSystem,
    hit_and_run::SamplingAlgorithm,
    runner::{PolytopeRunner, RunnerSettings},
    thinning::Thinning,
};

/// Run `chains` independent chains over `system` and return their samples.
///
/// Every chain starts at the Chebyshev center and uses `settings` with its
/// own generator stream, so a seeded run gives the same samples for every
/// chain count and thread count. `settings.chain` is the stream of the first
/// chain.
pub fn sample_parallel<A, T>(
    system: &ConstraintsSystem,
    settings: RunnerSettings,
    algorithm: &A,
    thinning: &T,
    count: usize,
    chains: usize,
) -> Result<Vec<Vec<Box<[f64]>>>>
where
    A: SamplingAlgorithm + Sync + ?Sized,
    T: Thinning + Sync + ?Sized,
{
    let pool = ThreadPoolBuilder::new()
        .thread_name(|i| format!("polysample-worker-{}", i))
        .build()
        .context("Could not start thread pool")?;

    debug!("Sampling {chains} chains of {count} draws");
    pool.install(|| {
        (0..chains as u64)
            .into_par_iter()
            .map(|offset| {
                let chain = settings.chain + offset;
                let settings = RunnerSettings { chain, ..settings };
                let mut runner = PolytopeRunner::with_settings(system.clone(), settings)
                    .with_context(|| format!("Could not create runner for chain {chain}"))?;
                runner
                    .set_any_start_point()
                    .with_context(|| format!("Could not find a start point for chain {chain}"))?;
                runner
                    .chain(algorithm, thinning, count)
                    .with_context(|| format!("Chain {chain} failed"))
            })
            .collect()
    })
}
