//! Sequential model-based optimization loop.
//!
//! A run moves through `Initializing -> Refining -> Done`, or to `Failed` if
//! the objective errors. Initialization evaluates uniform samples; each
//! refinement refits the Gaussian process on every observation so far,
//! maximizes the acquisition function over the box, and evaluates the
//! proposal. Exactly one evaluation is in flight at any time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use ht_types::{
    AdapterError, ConfigurationError, HtError, HtResult, ParameterAssignment, ParameterVector,
};

use crate::objective::Objective;
use crate::run::{RunConfig, RunFailure, RunReport, RunStatus};
use crate::space::ParameterSpace;
use crate::store::ObservationStore;
use crate::surrogate::GaussianProcess;

/// Proposals closer than this (in unit-cube distance) to an existing
/// observation count as repeats.
const DUPLICATE_TOLERANCE: f64 = 1e-9;

/// Which part of the run an evaluation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Refine,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Refine => "refine",
        }
    }
}

/// Gaussian-process Bayesian optimizer driving one run.
pub struct BayesianOptimizer {
    config: RunConfig,
    space: ParameterSpace,
    store: ObservationStore,
    status: RunStatus,
    rng: ChaCha8Rng,
}

impl BayesianOptimizer {
    /// Validate the configuration and prepare a run. Nothing is evaluated
    /// here, so a malformed config never costs an objective call.
    pub fn new(config: RunConfig) -> Result<Self, ConfigurationError> {
        let space = config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let status = RunStatus::new(&config, seed);

        info!(
            run_id = %status.id,
            seed,
            dims = space.dims(),
            init_points = config.init_points,
            n_iter = config.n_iter,
            acquisition = config.acquisition.name(),
            "prepared optimization run"
        );

        Ok(Self {
            config,
            space,
            store: ObservationStore::new(),
            status,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Run to completion. The optimizer is consumed; its observations come
    /// back in the report, or in the failure if the objective errored.
    pub fn run<O: Objective + ?Sized>(
        mut self,
        objective: &mut O,
    ) -> Result<RunReport, RunFailure> {
        let started = Instant::now();
        match self.drive(objective) {
            Ok(()) => {
                self.status.mark_done();
                match self.store.best() {
                    Ok(best) => info!(
                        best_value = best.value,
                        evaluations = self.store.len(),
                        elapsed_s = started.elapsed().as_secs_f64(),
                        "finished tuning"
                    ),
                    Err(_) => warn!("finished tuning without evaluating the objective"),
                }
                Ok(RunReport {
                    status: self.status,
                    space: self.space,
                    observations: self.store,
                })
            }
            Err(err) => {
                error!(
                    objective = objective.name(),
                    evaluations = self.store.len(),
                    error = %err,
                    "optimization run failed"
                );
                self.status.mark_failed(err.to_string());
                Err(RunFailure {
                    error: err,
                    status: self.status,
                    space: self.space,
                    observations: self.store,
                })
            }
        }
    }

    fn drive<O: Objective + ?Sized>(&mut self, objective: &mut O) -> HtResult<()> {
        self.status.mark_initializing();
        for i in 1..=self.config.init_points {
            let point = self.space.sample_uniform(&mut self.rng);
            self.evaluate(objective, point, Phase::Init, i)?;
        }

        self.status.mark_refining();
        for k in 1..=self.config.n_iter {
            let point = self.propose()?;
            self.evaluate(objective, point, Phase::Refine, k)?;
        }

        Ok(())
    }

    /// Choose the next point to evaluate from the current observations.
    fn propose(&mut self) -> HtResult<ParameterVector> {
        if self.store.is_empty() {
            debug!("no observations yet, proposing a uniform sample");
            return Ok(self.space.sample_uniform(&mut self.rng));
        }

        let gp = match GaussianProcess::fit(&self.space, self.store.all()) {
            Ok(gp) => gp,
            Err(HtError::Surrogate(err)) => {
                warn!(error = %err, "surrogate fit failed, proposing a uniform sample");
                return Ok(self.space.sample_uniform(&mut self.rng));
            }
            Err(err) => return Err(err),
        };

        let best_value = self.store.best()?.value;
        let acquisition = self.config.acquisition;
        let candidate = self.config.inner_optimizer.maximize(
            self.space.dims(),
            |unit: &[f64]| acquisition.score(gp.predict_unit(unit), best_value),
            &mut self.rng,
        );
        let point = self.space.clip(&self.space.from_unit(&candidate.unit))?;

        if self.is_duplicate(&point)? {
            warn!(?point, "proposal repeats an observed point, sampling uniformly instead");
            return Ok(self.space.sample_uniform(&mut self.rng));
        }

        debug!(
            acquisition = acquisition.name(),
            score = candidate.score,
            length_scale = gp.length_scale(),
            ?point,
            "proposed next point"
        );
        Ok(point)
    }

    fn is_duplicate(&self, point: &ParameterVector) -> HtResult<bool> {
        let unit = self.space.to_unit(point)?;
        for obs in self.store.all() {
            let seen = self.space.to_unit(&obs.point)?;
            let dist_sq: f64 = unit.iter().zip(&seen).map(|(a, b)| (a - b).powi(2)).sum();
            if dist_sq.sqrt() < DUPLICATE_TOLERANCE {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn evaluate<O: Objective + ?Sized>(
        &mut self,
        objective: &mut O,
        point: ParameterVector,
        phase: Phase,
        iteration: usize,
    ) -> HtResult<()> {
        let assignment = ParameterAssignment::merge(&point, &self.config.constants);
        let started = Instant::now();
        let value = objective.evaluate(&assignment)?;
        if !value.is_finite() {
            return Err(AdapterError::NonFiniteValue { value }.into());
        }

        let observation = self.store.record(point, value);
        self.status.record_evaluation(observation);
        info!(
            phase = phase.as_str(),
            iteration,
            value,
            params = ?observation.point,
            elapsed_s = started.elapsed().as_secs_f64(),
            "evaluated {}",
            objective.name()
        );
        Ok(())
    }
}
