use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::params::ParameterVector;

/// One objective evaluation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub point: ParameterVector,
    pub value: f64,
}

impl Observation {
    pub fn new(point: ParameterVector, value: f64) -> Self {
        Self { point, value }
    }
}

/// The best observation of a run, in the shape reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub best_value: f64,
    pub best_params: BTreeMap<String, f64>,
}

impl From<&Observation> for BestResult {
    fn from(obs: &Observation) -> Self {
        Self {
            best_value: obs.value,
            best_params: obs.point.as_map().clone(),
        }
    }
}
