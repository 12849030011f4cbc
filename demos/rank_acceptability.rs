//! Pairwise winning indices and rank acceptability indices for a decision
//! problem whose criteria weights are only known to lie between the weights
//! given by two decision makers.
//!
//! Actions are scored with an additive value function over fixed marginal
//! values. Sampling the weight space uniformly estimates how often each
//! action beats another and how often it reaches each rank.

use anyhow::Result;
use polysample::{
    Constraint, ConstraintsSystem, CubicThinning, HitAndRun, PolytopeRunner, Relation,
    RunnerSettings,
};

const ACTIONS: [&str; 5] = ["GREENWAY", "RAIL-BANKING", "TRANSPORT", "OLD STATION", "NO ACTION"];

const DM1_WEIGHTS: [f64; 9] = [
    0.11666667, 0.13333333, 0.08333333, 0.16666667, 0.16, 0.02, 0.08, 0.2, 0.04,
];
const DM2_WEIGHTS: [f64; 9] = [
    0.1724138, 0.0862069, 0.1379310, 0.1034483, 0.09375, 0.046875, 0.15625, 0.125, 0.078125,
];

const MARGINAL_VALUES: [[f64; 9]; 5] = [
    [1., 0.6, 0., 1., 0., 0.8, 1., 0.340909090909091, 1.],
    [0., 1., 0.916666666666667, 0.2, 0.590361445783133, 0., 0., 0., 0.],
    [0., 1., 0.916666666666667, 0.2, 0.590361445783133, 0.6, 0.7, 1., 0.608333333333333],
    [0.3125, 0., 0.5, 1., 0.460843373493976, 1., 1., 0.0881818181818182, 0.6],
    [0., 1., 1., 0., 1., 0., 0., 0., 0.],
];

fn weight_space() -> Result<ConstraintsSystem> {
    let criteria = DM1_WEIGHTS.len();
    let mut constraints = vec![Constraint::new(vec![1.; criteria], Relation::Equal, 1.)];
    for (i, (&a, &b)) in DM1_WEIGHTS.iter().zip(DM2_WEIGHTS.iter()).enumerate() {
        let mut row = vec![0.; criteria];
        row[i] = 1.;
        constraints.push(Constraint::new(row.clone(), Relation::GreaterEqual, a.min(b)));
        constraints.push(Constraint::new(row, Relation::LessEqual, a.max(b)));
    }
    Ok(ConstraintsSystem::from_constraints(constraints)?)
}

fn print_table(title: &str, columns: &[String], values: &[[f64; 5]; 5]) {
    let width = ACTIONS.iter().map(|name| name.len()).max().unwrap_or(0);
    println!("{title}");
    print!("{:>width$} ", "");
    for column in columns {
        print!("{column:>width$} ");
    }
    println!();
    for (name, row) in ACTIONS.iter().zip(values.iter()) {
        print!("{name:>width$} ");
        for val in row {
            print!("{val:>width$.2} ");
        }
        println!();
    }
}

fn main() -> Result<()> {
    let mut runner = PolytopeRunner::with_settings(weight_space()?, RunnerSettings::with_seed(11))?;
    runner.set_any_start_point()?;

    let num_samples = 1000;
    let weights = runner.chain(&HitAndRun::default(), &CubicThinning::new(1.), num_samples)?;

    let mut winning = [[0f64; 5]; 5];
    let mut acceptability = [[0f64; 5]; 5];
    for weights in weights.iter() {
        let values = MARGINAL_VALUES.map(|marginal| {
            marginal
                .iter()
                .zip(weights.iter())
                .map(|(value, weight)| value * weight)
                .sum::<f64>()
        });

        for i in 0..ACTIONS.len() {
            let mut rank = 0;
            for j in 0..ACTIONS.len() {
                if i != j && values[i] < values[j] {
                    winning[j][i] += 1. / num_samples as f64;
                    rank += 1;
                }
            }
            acceptability[i][rank] += 1. / num_samples as f64;
        }
    }

    let names = ACTIONS.iter().map(|name| name.to_string()).collect::<Vec<_>>();
    print_table("Pairwise winning indices:", &names, &winning);
    println!();
    let ranks = (1..=ACTIONS.len()).map(|rank| rank.to_string()).collect::<Vec<_>>();
    print_table("Rank acceptability indices:", &ranks, &acceptability);
    Ok(())
}
