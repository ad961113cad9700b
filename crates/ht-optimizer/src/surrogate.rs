//! Gaussian-process surrogate of the objective.
//!
//! Inputs are mapped into the unit cube and targets are standardized before
//! fitting, so one kernel parameterization works for any declared box and any
//! objective scale. The kernel is an isotropic Matérn 5/2 with unit signal
//! variance; its length scale is picked from [`LENGTH_SCALE_GRID`] by log
//! marginal likelihood on every refit.
//!
//! The model is rebuilt from scratch each iteration. Observation counts are
//! bounded by `init_points + n_iter`, so an exact O(n³) fit is negligible next
//! to a single objective evaluation.

use nalgebra::{linalg::Cholesky, DMatrix, DVector, Dyn};
use statrs::consts::LN_SQRT_2PI;
use tracing::{debug, warn};

use ht_types::{ConfigurationError, HtResult, Observation, ParameterVector, SurrogateError};

use crate::space::ParameterSpace;

/// Candidate length scales, in unit-cube coordinates.
pub const LENGTH_SCALE_GRID: [f64; 9] = [0.02, 0.05, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 2.0];

/// Diagonal jitter for a noiseless objective.
pub const BASE_JITTER: f64 = 1e-6;

/// Largest jitter tried before a fit is declared failed.
pub const MAX_JITTER: f64 = 1e-2;

const SQRT_5: f64 = 2.236_067_977_499_79;

/// Posterior predictive distribution at one point, in objective units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub mean: f64,
    /// Never negative; exactly zero is legal.
    pub std: f64,
}

/// A fitted Gaussian-process regressor.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    space: ParameterSpace,
    x_train: Vec<Vec<f64>>,
    cholesky: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    length_scale: f64,
    jitter: f64,
    y_mean: f64,
    y_std: f64,
    log_marginal_likelihood: f64,
}

impl GaussianProcess {
    /// Fit on every observation of a run.
    pub fn fit(space: &ParameterSpace, observations: &[Observation]) -> HtResult<Self> {
        let x_train = observations
            .iter()
            .map(|obs| space.to_unit(&obs.point))
            .collect::<Result<Vec<_>, ConfigurationError>>()?;
        let y_train: Vec<f64> = observations.iter().map(|obs| obs.value).collect();
        Ok(Self::fit_unit(space.clone(), x_train, &y_train)?)
    }

    /// Fit on unit-cube inputs directly.
    pub fn fit_unit(
        space: ParameterSpace,
        x_train: Vec<Vec<f64>>,
        y_train: &[f64],
    ) -> Result<Self, SurrogateError> {
        let n = y_train.len();
        if n == 0 {
            return Err(SurrogateError::NoObservations);
        }

        let y_mean = y_train.iter().map(|y| y / n as f64).sum::<f64>();
        // scaled before squaring so huge targets cannot overflow the variance
        let scale = y_train.iter().fold(0.0_f64, |m, y| m.max((y - y_mean).abs()));
        let y_std = if scale > 0.0 {
            let var = y_train
                .iter()
                .map(|y| ((y - y_mean) / scale).powi(2))
                .sum::<f64>()
                / n as f64;
            scale * var.sqrt()
        } else {
            0.0
        };
        let y_std = if y_std > 1e-12 { y_std } else { 1.0 };
        let y = DVector::from_iterator(n, y_train.iter().map(|v| (v - y_mean) / y_std));

        let mut best: Option<Fitted> = None;
        for &length_scale in &LENGTH_SCALE_GRID {
            let Some(fitted) = factorize(&x_train, &y, length_scale) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |b| fitted.log_marginal_likelihood > b.log_marginal_likelihood);
            if better {
                best = Some(fitted);
            }
        }

        let fitted = best.ok_or(SurrogateError::Factorization { jitter: MAX_JITTER })?;
        debug!(
            observations = n,
            length_scale = fitted.length_scale,
            jitter = fitted.jitter,
            lml = fitted.log_marginal_likelihood,
            "fitted gaussian process"
        );

        Ok(Self {
            space,
            x_train,
            cholesky: fitted.cholesky,
            alpha: fitted.alpha,
            length_scale: fitted.length_scale,
            jitter: fitted.jitter,
            y_mean,
            y_std,
            log_marginal_likelihood: fitted.log_marginal_likelihood,
        })
    }

    /// Predictive mean and standard deviation at a parameter vector.
    pub fn predict(&self, point: &ParameterVector) -> Result<Prediction, ConfigurationError> {
        let unit = self.space.to_unit(point)?;
        Ok(self.predict_unit(&unit))
    }

    /// Predictive mean and standard deviation at a unit-cube coordinate.
    pub fn predict_unit(&self, unit: &[f64]) -> Prediction {
        let k_star = DVector::from_iterator(
            self.x_train.len(),
            self.x_train
                .iter()
                .map(|x| matern52(unit, x, self.length_scale)),
        );

        let mean = k_star.dot(&self.alpha);
        let v = self.cholesky.solve(&k_star);
        let var = (1.0 - k_star.dot(&v)).max(0.0);

        Prediction {
            mean: self.y_mean + self.y_std * mean,
            std: self.y_std * var.sqrt(),
        }
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    pub fn n_observations(&self) -> usize {
        self.x_train.len()
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }
}

// ---------------------------------------------------------------------------
// Kernel and factorization
// ---------------------------------------------------------------------------

struct Fitted {
    cholesky: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    length_scale: f64,
    jitter: f64,
    log_marginal_likelihood: f64,
}

/// `k(a, b) = (1 + √5 r + 5/3 r²) exp(-√5 r)` with `r = |a - b| / l`.
fn matern52(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let r_sq = a
        .iter()
        .zip(b)
        .map(|(x, y)| ((x - y) / length_scale).powi(2))
        .sum::<f64>();
    let sqrt5_r = SQRT_5 * r_sq.sqrt();
    (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

/// Factorize `K + jitter·I`, escalating the jitter tenfold until the matrix
/// is positive definite or [`MAX_JITTER`] is exceeded.
fn factorize(x: &[Vec<f64>], y: &DVector<f64>, length_scale: f64) -> Option<Fitted> {
    let n = x.len();
    let kernel = DMatrix::from_fn(n, n, |i, j| matern52(&x[i], &x[j], length_scale));

    let mut jitter = BASE_JITTER;
    while jitter <= MAX_JITTER {
        let mut k = kernel.clone();
        for i in 0..n {
            k[(i, i)] += jitter;
        }

        if let Some(cholesky) = Cholesky::new(k) {
            let alpha = cholesky.solve(y);
            let log_det_half: f64 = cholesky.l_dirty().diagonal().iter().map(|d| d.ln()).sum();
            let log_marginal_likelihood =
                -0.5 * y.dot(&alpha) - log_det_half - n as f64 * LN_SQRT_2PI;
            return Some(Fitted {
                cholesky,
                alpha,
                length_scale,
                jitter,
                log_marginal_likelihood,
            });
        }

        warn!(length_scale, jitter, "kernel matrix not positive definite, raising jitter");
        jitter *= 10.0;
    }

    None
}
