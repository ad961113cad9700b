//! Result artifacts: a CSV table of observations plus a JSON summary of the
//! best one.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use ht_types::{BestResult, ExportError, Observation, ParameterVector};

use crate::run::RunReport;
use crate::space::ParameterSpace;
use crate::store::ObservationStore;

/// Header of the observed-value column.
pub const TARGET_COLUMN: &str = "target";

/// Paths written by [`export_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArtifacts {
    pub observations: PathBuf,
    pub best: Option<PathBuf>,
}

/// Write a finished (or partial) run to `path` and its best-result sidecar.
pub fn export_run(path: &Path, report: &RunReport) -> Result<ExportedArtifacts, ExportError> {
    write_observations(path, &report.space, &report.observations)?;
    let best = match report.best() {
        Ok(best) => Some(write_best(path, &best)?),
        Err(_) => None,
    };
    Ok(ExportedArtifacts {
        observations: path.to_path_buf(),
        best,
    })
}

/// Location of the best-result summary next to a CSV artifact.
pub fn best_sidecar_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    path.with_file_name(format!("{stem}.best.json"))
}

/// Create the parent directories of `path`, refusing to replace anything
/// that already exists and is not a directory.
pub fn prepare_output_path(path: &Path) -> Result<(), ExportError> {
    if path.is_dir() {
        return Err(ExportError::PathIsDirectory {
            path: path.to_path_buf(),
        });
    }

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    for ancestor in parent.ancestors() {
        if ancestor.exists() && !ancestor.is_dir() {
            return Err(ExportError::NotADirectory {
                path: ancestor.to_path_buf(),
            });
        }
    }

    fs::create_dir_all(parent).map_err(|e| ExportError::Write {
        path: parent.to_path_buf(),
        message: e.to_string(),
    })
}

/// One row per observation: each parameter in space order, then the value.
pub fn write_observations(
    path: &Path,
    space: &ParameterSpace,
    store: &ObservationStore,
) -> Result<(), ExportError> {
    prepare_output_path(path)?;
    let write_err = |e: csv::Error| ExportError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut writer = WriterBuilder::new().from_path(path).map_err(write_err)?;

    let mut header: Vec<&str> = space.names().collect();
    header.push(TARGET_COLUMN);
    writer.write_record(&header).map_err(write_err)?;

    for obs in store.all() {
        let mut row = Vec::with_capacity(space.dims() + 1);
        for name in space.names() {
            let value = obs.point.get(name).ok_or_else(|| ExportError::Write {
                path: path.to_path_buf(),
                message: format!("observation is missing parameter {name}"),
            })?;
            row.push(value.to_string());
        }
        row.push(obs.value.to_string());
        writer.write_record(&row).map_err(write_err)?;
    }

    writer.flush().map_err(|e| ExportError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    info!("Wrote {} observations to {}", store.len(), path.display());
    Ok(())
}

/// Write the best result as pretty JSON next to `path`.
pub fn write_best(path: &Path, best: &BestResult) -> Result<PathBuf, ExportError> {
    let sidecar = best_sidecar_path(path);
    prepare_output_path(&sidecar)?;
    let write_err = |message: String| ExportError::Write {
        path: sidecar.clone(),
        message,
    };

    let json = serde_json::to_string_pretty(best).map_err(|e| write_err(e.to_string()))?;
    fs::write(&sidecar, json).map_err(|e| write_err(e.to_string()))?;
    Ok(sidecar)
}

/// Read observations back from a CSV artifact. Columns are matched by
/// header name, so column order does not matter.
pub fn read_observations(
    path: &Path,
    space: &ParameterSpace,
) -> Result<Vec<Observation>, ExportError> {
    let parse_err = |message: String| ExportError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| parse_err(e.to_string()))?;
    let headers = reader.headers().map_err(|e| parse_err(e.to_string()))?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| parse_err(format!("missing column {name}")))
    };
    let param_columns = space
        .names()
        .map(|name| Ok((name.to_string(), column(name)?)))
        .collect::<Result<Vec<_>, ExportError>>()?;
    let target_column = column(TARGET_COLUMN)?;

    let mut observations = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| parse_err(e.to_string()))?;
        let field = |idx: usize| -> Result<f64, ExportError> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>()
                .map_err(|e| parse_err(format!("line {}: {raw:?}: {e}", line + 2)))
        };

        let mut point = ParameterVector::new();
        for (name, idx) in &param_columns {
            point.insert(name.clone(), field(*idx)?);
        }
        observations.push(Observation::new(point, field(target_column)?));
    }

    Ok(observations)
}
