//! Sampling a small polytope and the neighborhood of one of its points.
//!
//! The polytope is the part of the 2-simplex `x + y + z = 1, x, y, z >= 0`
//! that also satisfies `3x + 0.5y - 0.75z >= 0`.

use std::ops::ControlFlow;

use anyhow::Result;
use polysample::{ConstraintsSystem, CubicThinning, HitAndRun, OutOfBounds, PolytopeRunner, SphereWalk};

fn format_sample(sample: &[f64]) -> String {
    let values = sample.iter().map(|val| format!("{val:.4}")).collect::<Vec<_>>();
    format!("[{}]", values.join(", "))
}

fn main() -> Result<()> {
    let lhs = [
        vec![1., 0., 0.],
        vec![0., 1., 0.],
        vec![0., 0., 1.],
        vec![1., 1., 1.],
        vec![3., 0.5, -0.75],
    ];
    let relations = [">=", ">=", ">=", "=", ">="];
    let rhs = [0., 0., 0., 1., 0.];
    let system = ConstraintsSystem::new(&lhs, &relations, &rhs)?;

    let mut runner = PolytopeRunner::new(system)?;

    // Start at the center of the largest inscribed ball
    runner.set_any_start_point()?;
    let samples = runner.chain(&HitAndRun::default(), &CubicThinning::new(1.), 1000)?;
    println!("Drew {} samples, first one {}", samples.len(), format_sample(&samples[0]));

    runner.set_start_point(&[0.3, 0.1, 0.6])?;
    let neighborhood = runner.neighborhood(&SphereWalk::new(0.15, OutOfBounds::Crop), 20)?;
    println!("Samples from the neighborhood of [0.3, 0.1, 0.6]:");
    for sample in neighborhood.iter() {
        println!("{}", format_sample(sample));
    }

    println!("Samples uniformly picked from the polytope:");
    runner.chain_with(&HitAndRun::default(), &CubicThinning::new(1.), 1000, |sample| {
        println!("{}", format_sample(sample));
        ControlFlow::Continue(())
    })?;
    Ok(())
}
