//! Glue between the parsed command line, the optimizer, and the result file.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use tracing::{error, info};

use ht_optimizer::{export_run, BayesianOptimizer, RunFailure, RunReport};
use ht_types::BestResult;

use crate::args::Cli;
use crate::objectives::resolve_objective;

/// The line printed once a run completes.
pub fn format_result(elapsed_secs: f64, best: Option<&BestResult>) -> anyhow::Result<String> {
    let json = serde_json::to_string(&best)?;
    Ok(format!(
        "Finished tuning! It took {elapsed_secs} seconds. The result is as follows: {json}"
    ))
}

/// Execute one tuning run and print its result. Returns the report so
/// callers can inspect it; an export failure still prints the result but
/// makes the whole call fail.
pub fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    let config = cli.run_config().context("invalid run configuration")?;
    let mut objective = resolve_objective(cli.objective.as_deref(), &cli.command)
        .context("could not set up the objective")?;
    let optimizer = BayesianOptimizer::new(config).context("invalid run configuration")?;

    info!(
        objective = objective.name(),
        run_id = %optimizer.status().id,
        "starting tuning"
    );
    let started = Instant::now();
    let report = match optimizer.run(&mut objective) {
        Ok(report) => report,
        Err(failure) => {
            if let Some(path) = &cli.output_file_name {
                export_partial(path, &failure);
            }
            return Err(failure.into());
        }
    };
    let elapsed = started.elapsed().as_secs_f64();

    let exported = match &cli.output_file_name {
        Some(path) => export_run(path, &report).map(Some),
        None => Ok(None),
    };
    if let Err(err) = &exported {
        error!(error = %err, "failed to export results");
    }

    let best = report.best().ok();
    println!("{}", format_result(elapsed, best.as_ref())?);

    exported.context("tuning finished but the results could not be saved")?;
    Ok(report)
}

fn export_partial(path: &Path, failure: &RunFailure) {
    let partial = RunReport {
        status: failure.status.clone(),
        space: failure.space.clone(),
        observations: failure.observations.clone(),
    };
    match export_run(path, &partial) {
        Ok(_) => info!(
            evaluations = partial.observations.len(),
            path = %path.display(),
            "saved observations gathered before the failure"
        ),
        Err(err) => error!(error = %err, "failed to export partial results"),
    }
}
