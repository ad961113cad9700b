//! Acquisition functions scoring candidates from the surrogate posterior.

use serde::{Deserialize, Serialize};
use statrs::consts::SQRT_2PI;
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

use ht_types::ConfigurationError;

use crate::surrogate::Prediction;

/// Default UCB exploration weight (the 99% two-sided normal quantile).
pub const DEFAULT_KAPPA: f64 = 2.576;

/// Default EI improvement margin.
pub const DEFAULT_XI: f64 = 0.0;

/// Below this predictive std a candidate is treated as certain.
const MIN_STD: f64 = 1e-12;

/// How the next evaluation point is scored.
///
/// Both families are deterministic in `(prediction, best_value)`, increase
/// strictly with the predicted mean at fixed uncertainty, and increase
/// strictly with the uncertainty at fixed mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Acquisition {
    /// `mean + kappa * std`.
    UpperConfidenceBound { kappa: f64 },
    /// Expected improvement over `best_value + xi`.
    ExpectedImprovement { xi: f64 },
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::UpperConfidenceBound {
            kappa: DEFAULT_KAPPA,
        }
    }
}

impl Acquisition {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::UpperConfidenceBound { kappa } if !(kappa.is_finite() && kappa > 0.0) => {
                Err(ConfigurationError::InvalidAcquisition {
                    message: format!("kappa must be a positive finite number, got {kappa}"),
                })
            }
            Self::ExpectedImprovement { xi } if !(xi.is_finite() && xi >= 0.0) => {
                Err(ConfigurationError::InvalidAcquisition {
                    message: format!("xi must be a non-negative finite number, got {xi}"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Score a candidate. `best_value` is the incumbent observed maximum.
    pub fn score(&self, prediction: Prediction, best_value: f64) -> f64 {
        let Prediction { mean, std } = prediction;
        match *self {
            Self::UpperConfidenceBound { kappa } => mean + kappa * std,
            Self::ExpectedImprovement { xi } => {
                let improvement = mean - best_value - xi;
                if std < MIN_STD {
                    return improvement.max(0.0);
                }
                let z = improvement / std;
                improvement * norm_cdf(z) + std * norm_pdf(z)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UpperConfidenceBound { .. } => "ucb",
            Self::ExpectedImprovement { .. } => "ei",
        }
    }
}

fn norm_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / SQRT_2PI
}

fn norm_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / SQRT_2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(mean: f64, std: f64) -> Prediction {
        Prediction { mean, std }
    }

    #[test]
    fn ucb_prefers_mean_then_uncertainty() {
        let ucb = Acquisition::default();
        assert!(ucb.score(p(1.0, 0.5), 0.0) > ucb.score(p(0.9, 0.5), 0.0));
        assert!(ucb.score(p(1.0, 0.6), 0.0) > ucb.score(p(1.0, 0.5), 0.0));
        assert_eq!(ucb.score(p(1.0, 0.0), 0.0), 1.0);
    }

    #[test]
    fn ei_prefers_mean_then_uncertainty() {
        let ei = Acquisition::ExpectedImprovement { xi: 0.0 };
        let best = 1.0;
        for &(mean, std) in &[(0.5, 0.3), (1.0, 0.3), (1.5, 0.3), (0.8, 1.0)] {
            assert!(ei.score(p(mean + 0.1, std), best) > ei.score(p(mean, std), best));
            assert!(ei.score(p(mean, std + 0.1), best) > ei.score(p(mean, std), best));
        }
    }

    #[test]
    fn ei_handles_zero_std() {
        let ei = Acquisition::ExpectedImprovement { xi: 0.0 };
        assert_eq!(ei.score(p(2.0, 0.0), 1.5), 0.5);
        assert_eq!(ei.score(p(1.0, 0.0), 1.5), 0.0);
        assert!(ei.score(p(1.0, 0.0), 1.5).is_finite());
    }

    #[test]
    fn ei_matches_closed_form_at_incumbent() {
        // improvement = 0 gives std * phi(0)
        let ei = Acquisition::ExpectedImprovement { xi: 0.0 };
        let score = ei.score(p(1.0, 2.0), 1.0);
        assert!((score - 2.0 / SQRT_2PI).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(Acquisition::UpperConfidenceBound { kappa: 0.0 }.validate().is_err());
        assert!(Acquisition::UpperConfidenceBound { kappa: f64::NAN }.validate().is_err());
        assert!(Acquisition::ExpectedImprovement { xi: -0.1 }.validate().is_err());
        assert!(Acquisition::ExpectedImprovement { xi: 0.01 }.validate().is_ok());
        assert!(Acquisition::default().validate().is_ok());
    }

    #[test]
    fn serde_uses_kind_tag() {
        let json = serde_json::to_string(&Acquisition::default()).unwrap();
        assert_eq!(json, r#"{"kind":"upper_confidence_bound","kappa":2.576}"#);
        let back: Acquisition =
            serde_json::from_str(r#"{"kind":"expected_improvement","xi":0.01}"#).unwrap();
        assert_eq!(back, Acquisition::ExpectedImprovement { xi: 0.01 });
    }
}
