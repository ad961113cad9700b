//! Run configuration, lifecycle tracking, and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use ht_types::{
    BestResult, ConfigurationError, ConstantOverride, HtError, Observation, ParameterBound,
    StoreError,
};

use crate::acquisition::Acquisition;
use crate::maximizer::InnerOptimizer;
use crate::space::ParameterSpace;
use crate::store::ObservationStore;

/// Unique optimization run identifier.
pub type RunId = Uuid;

pub const DEFAULT_INIT_POINTS: usize = 5;
pub const DEFAULT_N_ITER: usize = 15;

fn default_init_points() -> usize {
    DEFAULT_INIT_POINTS
}

fn default_n_iter() -> usize {
    DEFAULT_N_ITER
}

/// Top-level configuration for an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// The searched box, in declaration order.
    #[serde(default)]
    pub bounds: Vec<ParameterBound>,

    /// Values passed to every evaluation unchanged.
    #[serde(default)]
    pub constants: Vec<ConstantOverride>,

    /// Random evaluations before the surrogate is consulted.
    #[serde(default = "default_init_points")]
    pub init_points: usize,

    /// Surrogate-guided evaluations after initialization.
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,

    /// RNG seed. A fresh seed is drawn and logged when unset.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub acquisition: Acquisition,

    #[serde(default)]
    pub inner_optimizer: InnerOptimizer,
}

impl RunConfig {
    pub fn new(bounds: Vec<ParameterBound>) -> Self {
        Self {
            bounds,
            constants: Vec::new(),
            init_points: DEFAULT_INIT_POINTS,
            n_iter: DEFAULT_N_ITER,
            seed: None,
            acquisition: Acquisition::default(),
            inner_optimizer: InnerOptimizer::default(),
        }
    }

    pub fn with_constants(mut self, constants: Vec<ConstantOverride>) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_init_points(mut self, n: usize) -> Self {
        self.init_points = n;
        self
    }

    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_acquisition(mut self, acquisition: Acquisition) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn with_inner_optimizer(mut self, inner: InnerOptimizer) -> Self {
        self.inner_optimizer = inner;
        self
    }

    /// Total number of objective evaluations the run will perform.
    pub fn total_evaluations(&self) -> usize {
        self.init_points + self.n_iter
    }

    /// Check everything that can be checked without evaluating the
    /// objective, returning the validated search space.
    pub fn validate(&self) -> Result<ParameterSpace, ConfigurationError> {
        let space = ParameterSpace::validate(self.bounds.clone())?;

        let mut constant_names = HashSet::with_capacity(self.constants.len());
        for constant in &self.constants {
            if constant.name.trim().is_empty() {
                return Err(ConfigurationError::EmptyName);
            }
            if space.bound(&constant.name).is_some() {
                return Err(ConfigurationError::ConstantShadowsParameter {
                    name: constant.name.clone(),
                });
            }
            if !constant_names.insert(constant.name.as_str()) {
                return Err(ConfigurationError::DuplicateName {
                    name: constant.name.clone(),
                });
            }
        }

        self.acquisition.validate()?;
        self.inner_optimizer.validate()?;
        Ok(space)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state for an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Initializing,
    Refining,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Aggregate status of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: RunId,
    pub state: RunState,
    pub seed: u64,
    pub init_points: usize,
    pub n_iter: usize,
    pub evaluations_completed: usize,
    pub best: Option<BestResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RunStatus {
    pub fn new(config: &RunConfig, seed: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RunState::Pending,
            seed,
            init_points: config.init_points,
            n_iter: config.n_iter,
            evaluations_completed: 0,
            best: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_initializing(&mut self) {
        self.state = RunState::Initializing;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_refining(&mut self) {
        self.state = RunState::Refining;
    }

    pub fn mark_done(&mut self) {
        self.state = RunState::Done;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RunState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Count a completed evaluation and keep the best result current. Ties
    /// keep the earlier observation.
    pub fn record_evaluation(&mut self, observation: &Observation) {
        self.evaluations_completed += 1;
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| observation.value > best.best_value);
        if improves {
            self.best = Some(BestResult::from(observation));
        }
    }

    /// Wall-clock run time so far, or of the whole run once finished.
    pub fn elapsed_seconds(&self) -> Option<f64> {
        let started = self.started_at?;
        let finished = self.finished_at.unwrap_or_else(Utc::now);
        Some((finished - started).num_milliseconds() as f64 / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub space: ParameterSpace,
    pub observations: ObservationStore,
}

impl RunReport {
    /// The best observation; fails only when the run evaluated nothing.
    pub fn best(&self) -> Result<BestResult, StoreError> {
        self.observations.best().map(BestResult::from)
    }
}

/// A run that stopped on an unrecoverable error. Whatever was observed
/// before the failure is kept.
#[derive(Debug)]
pub struct RunFailure {
    pub error: HtError,
    pub status: RunStatus,
    pub space: ParameterSpace,
    pub observations: ObservationStore,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run failed after {} evaluations: {}",
            self.observations.len(),
            self.error
        )
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_types::ParameterVector;

    fn sample_config() -> RunConfig {
        RunConfig::new(vec![
            ParameterBound::new("x", -5.0, 5.0),
            ParameterBound::new("y", -5.0, 5.0),
        ])
        .with_constants(vec![ConstantOverride::new("epochs", 10i64)])
        .with_init_points(3)
        .with_n_iter(4)
        .with_seed(9)
    }

    #[test]
    fn config_defaults_match_tool_defaults() {
        let config = RunConfig::new(vec![ParameterBound::new("x", 0.0, 1.0)]);
        assert_eq!(config.init_points, 5);
        assert_eq!(config.n_iter, 15);
        assert_eq!(config.acquisition, Acquisition::default());
        assert!(config.seed.is_none());
    }

    #[test]
    fn validate_returns_space() {
        let config = sample_config();
        let space = config.validate().unwrap();
        assert_eq!(space.dims(), 2);
        assert_eq!(config.total_evaluations(), 7);
    }

    #[test]
    fn validate_rejects_shadowing_constant() {
        let config = sample_config().with_constants(vec![ConstantOverride::new("x", 1.0)]);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ConstantShadowsParameter { name: "x".into() })
        );
    }

    #[test]
    fn validate_rejects_duplicate_constants() {
        let config = sample_config().with_constants(vec![
            ConstantOverride::new("epochs", 1i64),
            ConstantOverride::new("epochs", 2i64),
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn validate_checks_acquisition() {
        let config = sample_config()
            .with_acquisition(Acquisition::UpperConfidenceBound { kappa: -1.0 });
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidAcquisition { .. })
        ));
    }

    #[test]
    fn config_json_fills_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{"bounds": [{"name": "x", "lower": -5, "upper": 5}],
                "constants": [{"name": "optimizer", "value": "adam"}]}"#,
        )
        .unwrap();
        assert_eq!(config.init_points, DEFAULT_INIT_POINTS);
        assert_eq!(config.n_iter, DEFAULT_N_ITER);
        assert_eq!(config.inner_optimizer, InnerOptimizer::default());
        assert_eq!(config.bounds[0], ParameterBound::new("x", -5.0, 5.0));
    }

    #[test]
    fn status_lifecycle() {
        let config = sample_config();
        let mut status = RunStatus::new(&config, 9);
        assert_eq!(status.state, RunState::Pending);
        assert!(status.started_at.is_none());

        status.mark_initializing();
        assert_eq!(status.state, RunState::Initializing);
        assert!(status.started_at.is_some());

        status.mark_refining();
        assert!(!status.state.is_terminal());

        status.mark_done();
        assert_eq!(status.state, RunState::Done);
        assert!(status.finished_at.is_some());
        assert!(status.elapsed_seconds().unwrap() >= 0.0);
    }

    #[test]
    fn status_failure_keeps_message() {
        let mut status = RunStatus::new(&sample_config(), 1);
        status.mark_initializing();
        status.mark_failed("objective failed: out of memory".into());
        assert_eq!(status.state, RunState::Failed);
        assert!(status.state.is_terminal());
        assert_eq!(
            status.error.as_deref(),
            Some("objective failed: out of memory")
        );
    }

    #[test]
    fn status_best_tracking_keeps_earliest_tie() {
        let mut status = RunStatus::new(&sample_config(), 1);
        let first = Observation::new(ParameterVector::from_pairs([("x", 1.0)]), 0.5);
        let tie = Observation::new(ParameterVector::from_pairs([("x", 2.0)]), 0.5);
        let worse = Observation::new(ParameterVector::from_pairs([("x", 3.0)]), 0.1);

        status.record_evaluation(&first);
        status.record_evaluation(&tie);
        status.record_evaluation(&worse);

        assert_eq!(status.evaluations_completed, 3);
        let best = status.best.as_ref().unwrap();
        assert_eq!(best.best_value, 0.5);
        assert_eq!(best.best_params["x"], 1.0);
    }
}
