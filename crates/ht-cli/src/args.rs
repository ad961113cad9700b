//! Command-line arguments and their translation into a run configuration.

use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;

use ht_optimizer::{Acquisition, RunConfig, DEFAULT_KAPPA, DEFAULT_XI};
use ht_types::{ConfigurationError, HtResult};

use crate::literal::{parse_bounds, parse_constants, BOUNDS_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AcquisitionKind {
    /// Upper confidence bound
    Ucb,
    /// Expected improvement
    Ei,
}

/// Tune the parameters of an expensive objective with Gaussian-process
/// Bayesian optimization.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "hypertune", version, about)]
pub struct Cli {
    /// Objective to maximize: gaussian_peak, branin or command
    #[arg(long, env = "HYPERTUNE_OBJECTIVE")]
    pub objective: Option<String>,

    /// Searched parameters, e.g. "[('x', -5, 5), ('y', 0, 1)]"
    #[arg(long, alias = "params_and_constraints", env = "HYPERTUNE_PARAMS_AND_CONSTRAINTS")]
    pub params_and_constraints: Option<String>,

    /// Values passed unchanged to every evaluation, e.g. "[('epochs', 10)]"
    #[arg(long, alias = "constant_flags", env = "HYPERTUNE_CONSTANT_FLAGS")]
    pub constant_flags: Option<String>,

    /// Random evaluations before the surrogate is used [default: 5]
    #[arg(long, alias = "init_points", env = "HYPERTUNE_INIT_POINTS")]
    pub init_points: Option<usize>,

    /// Surrogate-guided evaluations [default: 15]
    #[arg(long, alias = "n_iter", env = "HYPERTUNE_N_ITER")]
    pub n_iter: Option<usize>,

    /// CSV file receiving every observation
    #[arg(long, alias = "output_file_name", env = "HYPERTUNE_OUTPUT_FILE_NAME")]
    pub output_file_name: Option<PathBuf>,

    /// JSON run configuration; explicit flags take precedence
    #[arg(long, env = "HYPERTUNE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Random seed, for reproducible runs
    #[arg(long, env = "HYPERTUNE_SEED")]
    pub seed: Option<u64>,

    /// Acquisition function
    #[arg(long, value_enum, env = "HYPERTUNE_ACQUISITION")]
    pub acquisition: Option<AcquisitionKind>,

    /// Exploration weight for ucb
    #[arg(long, env = "HYPERTUNE_KAPPA")]
    pub kappa: Option<f64>,

    /// Improvement margin for ei
    #[arg(long, env = "HYPERTUNE_XI")]
    pub xi: Option<f64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    /// Program and arguments for the command objective, after `--`
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Build the run configuration: the `--config` file if given, then every
    /// explicit flag on top of it.
    pub fn run_config(&self) -> HtResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str::<RunConfig>(&fs::read_to_string(path)?)?,
            None => RunConfig::new(Vec::new()),
        };

        match &self.params_and_constraints {
            Some(raw) => config.bounds = parse_bounds(raw)?,
            None if config.bounds.is_empty() => {
                return Err(ConfigurationError::MissingInput {
                    field: BOUNDS_FIELD.to_string(),
                }
                .into())
            }
            None => {}
        }
        if let Some(raw) = &self.constant_flags {
            config.constants = parse_constants(raw)?;
        }
        if let Some(n) = self.init_points {
            config.init_points = n;
        }
        if let Some(n) = self.n_iter {
            config.n_iter = n;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config.acquisition = self.acquisition(config.acquisition)?;

        Ok(config)
    }

    fn acquisition(&self, current: Acquisition) -> Result<Acquisition, ConfigurationError> {
        let kind = match (self.acquisition, current) {
            (Some(kind), _) => kind,
            (None, Acquisition::UpperConfidenceBound { .. }) => AcquisitionKind::Ucb,
            (None, Acquisition::ExpectedImprovement { .. }) => AcquisitionKind::Ei,
        };

        match kind {
            AcquisitionKind::Ucb => {
                if self.xi.is_some() {
                    return Err(ConfigurationError::InvalidAcquisition {
                        message: "--xi only applies to ei".to_string(),
                    });
                }
                let kappa = match (self.kappa, current) {
                    (Some(kappa), _) => kappa,
                    (None, Acquisition::UpperConfidenceBound { kappa }) => kappa,
                    (None, _) => DEFAULT_KAPPA,
                };
                Ok(Acquisition::UpperConfidenceBound { kappa })
            }
            AcquisitionKind::Ei => {
                if self.kappa.is_some() {
                    return Err(ConfigurationError::InvalidAcquisition {
                        message: "--kappa only applies to ucb".to_string(),
                    });
                }
                let xi = match (self.xi, current) {
                    (Some(xi), _) => xi,
                    (None, Acquisition::ExpectedImprovement { xi }) => xi,
                    (None, _) => DEFAULT_XI,
                };
                Ok(Acquisition::ExpectedImprovement { xi })
            }
        }
    }
}
