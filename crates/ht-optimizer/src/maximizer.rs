//! Cheap, many-restart maximization of an acquisition surface over the unit
//! cube.
//!
//! A batch of uniform warm-up candidates is scored first. The best of them,
//! together with a few fresh random seeds, are then refined by a bounded
//! compass search whose step halves whenever no axis move improves the
//! score. The result is a good local optimum, not a certified global one.
//!
//! All random draws happen on the caller's thread before any parallel work,
//! and parallel results are reduced in input order, so a seeded RNG gives the
//! same answer regardless of thread count.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use ht_types::ConfigurationError;

/// Settings of the inner acquisition maximizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerOptimizer {
    /// Uniform candidates scored before local refinement.
    pub n_warmup: usize,
    /// Number of compass-search refinements.
    pub n_restarts: usize,
    /// First step size, in unit-cube coordinates.
    pub initial_step: f64,
    /// Refinement stops once the step falls below this.
    pub min_step: f64,
    /// Upper bound on score evaluations per refinement.
    pub max_evaluations: usize,
}

impl Default for InnerOptimizer {
    fn default() -> Self {
        Self {
            n_warmup: 10_000,
            n_restarts: 10,
            initial_step: 0.1,
            min_step: 1e-6,
            max_evaluations: 500,
        }
    }
}

/// Best point found and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub unit: Vec<f64>,
    pub score: f64,
}

impl InnerOptimizer {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |message: String| -> Result<(), ConfigurationError> {
            Err(ConfigurationError::InvalidInnerOptimizer { message })
        };
        if self.n_warmup == 0 {
            return invalid("n_warmup must be at least 1".to_string());
        }
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return invalid(format!(
                "initial_step must be positive, got {}",
                self.initial_step
            ));
        }
        if !(self.min_step.is_finite() && self.min_step > 0.0 && self.min_step <= self.initial_step)
        {
            return invalid(format!(
                "min_step must be positive and at most initial_step, got {}",
                self.min_step
            ));
        }
        Ok(())
    }

    /// Maximize `score` over `[0, 1]^dims`.
    pub fn maximize<R, F>(&self, dims: usize, score: F, rng: &mut R) -> Candidate
    where
        R: Rng + ?Sized,
        F: Fn(&[f64]) -> f64 + Sync,
    {
        let warmup: Vec<Vec<f64>> = (0..self.n_warmup.max(1))
            .map(|_| random_unit(dims, rng))
            .collect();
        let warmup_scores: Vec<f64> = warmup.par_iter().map(|u| sanitize(score(u))).collect();

        let mut ranked: Vec<usize> = (0..warmup.len()).collect();
        ranked.sort_by(|&a, &b| compare_desc(warmup_scores[a], warmup_scores[b]).then(a.cmp(&b)));

        let n_top = ((self.n_restarts + 1) / 2).min(ranked.len());
        let mut seeds: Vec<(Vec<f64>, f64)> = ranked[..n_top]
            .iter()
            .map(|&i| (warmup[i].clone(), warmup_scores[i]))
            .collect();
        for _ in n_top..self.n_restarts {
            let unit = random_unit(dims, rng);
            let s = sanitize(score(&unit));
            seeds.push((unit, s));
        }

        let refined: Vec<Candidate> = seeds
            .into_par_iter()
            .map(|(unit, s)| self.compass_search(unit, s, &score))
            .collect();

        let first = ranked[0];
        let mut best = Candidate {
            unit: warmup[first].clone(),
            score: warmup_scores[first],
        };
        for candidate in refined {
            if candidate.score > best.score {
                best = candidate;
            }
        }
        best
    }

    fn compass_search<F>(&self, mut unit: Vec<f64>, mut best: f64, score: &F) -> Candidate
    where
        F: Fn(&[f64]) -> f64,
    {
        let mut step = self.initial_step;
        let mut evaluations = 0;

        'outer: while step >= self.min_step {
            let mut improved = false;
            for axis in 0..unit.len() {
                for direction in [1.0, -1.0] {
                    if evaluations >= self.max_evaluations {
                        break 'outer;
                    }
                    let moved = (unit[axis] + direction * step).clamp(0.0, 1.0);
                    if moved == unit[axis] {
                        continue;
                    }
                    let mut trial = unit.clone();
                    trial[axis] = moved;
                    let s = sanitize(score(&trial));
                    evaluations += 1;
                    if s > best {
                        unit = trial;
                        best = s;
                        improved = true;
                        break;
                    }
                }
            }
            if !improved {
                step *= 0.5;
            }
        }

        Candidate { unit, score: best }
    }
}

fn random_unit<R: Rng + ?Sized>(dims: usize, rng: &mut R) -> Vec<f64> {
    (0..dims).map(|_| rng.gen_range(0.0..=1.0)).collect()
}

/// NaN scores never win.
fn sanitize(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quadratic(center: &'static [f64]) -> impl Fn(&[f64]) -> f64 + Sync {
        move |u: &[f64]| -u.iter().zip(center).map(|(x, c)| (x - c).powi(2)).sum::<f64>()
    }

    #[test]
    fn finds_interior_maximum() {
        let optimizer = InnerOptimizer {
            n_warmup: 200,
            ..InnerOptimizer::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let best = optimizer.maximize(2, quadratic(&[0.3, 0.7]), &mut rng);
        assert!((best.unit[0] - 0.3).abs() < 1e-3, "{:?}", best.unit);
        assert!((best.unit[1] - 0.7).abs() < 1e-3, "{:?}", best.unit);
    }

    #[test]
    fn finds_boundary_maximum_without_leaving_cube() {
        let optimizer = InnerOptimizer {
            n_warmup: 100,
            ..InnerOptimizer::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let best = optimizer.maximize(1, |u: &[f64]| u[0], &mut rng);
        assert_eq!(best.unit[0], 1.0);
        assert!(best.unit.iter().all(|u| (0.0..=1.0).contains(u)));
    }

    #[test]
    fn same_seed_same_candidate() {
        let optimizer = InnerOptimizer {
            n_warmup: 500,
            ..InnerOptimizer::default()
        };
        let score = |u: &[f64]| (u[0] * 12.0).sin() * (u[1] * 7.0).cos();
        let a = optimizer.maximize(2, score, &mut ChaCha8Rng::seed_from_u64(42));
        let b = optimizer.maximize(2, score, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn nan_scores_are_ignored() {
        let optimizer = InnerOptimizer {
            n_warmup: 50,
            n_restarts: 2,
            ..InnerOptimizer::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let best = optimizer.maximize(
            1,
            |u: &[f64]| if u[0] < 0.5 { f64::NAN } else { u[0] },
            &mut rng,
        );
        assert!(best.score.is_finite());
        assert!(best.unit[0] >= 0.5);
    }

    #[test]
    fn validate_rejects_bad_steps() {
        let mut optimizer = InnerOptimizer::default();
        assert!(optimizer.validate().is_ok());
        optimizer.min_step = 1.0;
        assert!(optimizer.validate().is_err());
        optimizer = InnerOptimizer {
            n_warmup: 0,
            ..InnerOptimizer::default()
        };
        assert!(optimizer.validate().is_err());
    }
}
