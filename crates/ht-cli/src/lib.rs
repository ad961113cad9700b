//! # ht-cli
//!
//! Command-line front end for hypertune: argument and literal-list parsing,
//! the objective registry, and result reporting.

pub mod args;
pub mod literal;
pub mod objectives;

mod app;

pub use app::{format_result, run};
pub use args::{AcquisitionKind, Cli};
pub use objectives::{resolve_objective, Branin, CommandObjective, GaussianPeak};
