//! # ht-optimizer
//!
//! Gaussian-process Bayesian optimization of expensive black-box objectives.
//!
//! Provides the search space, the observation store, a Matérn 5/2 surrogate,
//! UCB and expected-improvement acquisition, the sequential run controller,
//! and CSV export of run results.

mod acquisition;
mod export;
mod maximizer;
mod objective;
mod optimizer;
mod run;
mod space;
mod store;
mod surrogate;

pub use acquisition::{Acquisition, DEFAULT_KAPPA, DEFAULT_XI};
pub use export::{
    best_sidecar_path, export_run, prepare_output_path, read_observations, write_best,
    write_observations, ExportedArtifacts, TARGET_COLUMN,
};
pub use maximizer::{Candidate, InnerOptimizer};
pub use objective::{objective_fn, FnObjective, Objective};
pub use optimizer::BayesianOptimizer;
pub use run::{
    RunConfig, RunFailure, RunId, RunReport, RunState, RunStatus, DEFAULT_INIT_POINTS,
    DEFAULT_N_ITER,
};
pub use space::ParameterSpace;
pub use store::ObservationStore;
pub use surrogate::{GaussianProcess, Prediction, BASE_JITTER, LENGTH_SCALE_GRID, MAX_JITTER};
