//! Seeded synthetic datasets shared by the integration tests

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use svm_engine::{FeatureVector, Problem};

pub const SEED: u64 = 42;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(SEED)
}

/// Standard normal sample (Box-Muller)
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Two well separated 2D clusters labelled +1 and -1, interleaved
pub fn separable_2d(per_class: usize) -> Problem {
    let mut rng = rng();
    let mut problem = Problem::default();
    for _ in 0..per_class {
        problem.push(
            1.0,
            FeatureVector::from_dense(&[2.0 + 0.5 * gaussian(&mut rng), 2.0 + 0.5 * gaussian(&mut rng)]),
        );
        problem.push(
            -1.0,
            FeatureVector::from_dense(&[-2.0 + 0.5 * gaussian(&mut rng), -2.0 + 0.5 * gaussian(&mut rng)]),
        );
    }
    problem
}

/// Gaussian blobs around `centers`, class `k` labelled `labels[k]`
pub fn blobs(centers: &[[f64; 2]], labels: &[f64], per_class: usize, spread: f64) -> Problem {
    let mut rng = rng();
    let mut problem = Problem::default();
    for _ in 0..per_class {
        for (center, &label) in centers.iter().zip(labels) {
            let x = center[0] + spread * gaussian(&mut rng);
            let y = center[1] + spread * gaussian(&mut rng);
            problem.push(label, FeatureVector::from_dense(&[x, y]));
        }
    }
    problem
}

/// Four quadrants, label +1 where the coordinates share a sign
pub fn xor(per_quadrant: usize, noise: f64) -> Problem {
    let mut rng = rng();
    let mut problem = Problem::default();
    for _ in 0..per_quadrant {
        for (sx, sy) in [(1.0, 1.0), (-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0)] {
            let x = sx * rng.gen_range(0.2..1.0) + noise * gaussian(&mut rng);
            let y = sy * rng.gen_range(0.2..1.0) + noise * gaussian(&mut rng);
            let label = if sx * sy > 0.0 { 1.0 } else { -1.0 };
            problem.push(label, FeatureVector::from_dense(&[x, y]));
        }
    }
    problem
}

/// y = 2 x1 + 3 x2 + 1 + N(0, noise)
pub fn linear_regression(n: usize, noise: f64) -> Problem {
    let mut rng = rng();
    let mut problem = Problem::default();
    for _ in 0..n {
        let x1: f64 = rng.gen_range(-1.0..1.0);
        let x2: f64 = rng.gen_range(-1.0..1.0);
        let y = 2.0 * x1 + 3.0 * x2 + 1.0 + noise * gaussian(&mut rng);
        problem.push(y, FeatureVector::from_dense(&[x1, x2]));
    }
    problem
}

/// Fraction of samples whose prediction equals the label
pub fn accuracy(model: &svm_engine::Model, problem: &Problem) -> f64 {
    let correct = problem
        .vectors
        .iter()
        .zip(&problem.labels)
        .filter(|(x, &y)| model.predict(x) == y)
        .count();
    correct as f64 / problem.len() as f64
}

pub fn mse(model: &svm_engine::Model, problem: &Problem) -> f64 {
    let total: f64 = problem
        .vectors
        .iter()
        .zip(&problem.labels)
        .map(|(x, &y)| (model.predict(x) - y).powi(2))
        .sum();
    total / problem.len() as f64
}
