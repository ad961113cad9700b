//! Parameter declarations, concrete values, and the assignments handed to
//! objectives.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::AdapterError;

/// A single continuous dimension with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBound {
    /// Parameter name (e.g. "learning_rate").
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

impl ParameterBound {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    /// Width of the interval.
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// A concrete value handed to an objective.
///
/// Tuned parameters are always `Float`; constants keep whatever type the
/// caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A parameter held fixed for the whole run. Passed to the objective but
/// never modeled or proposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantOverride {
    pub name: String,
    pub value: ParameterValue,
}

impl ConstantOverride {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One value per searched dimension, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector(BTreeMap<String, f64>);

impl ParameterVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, f64> {
        self.0
    }
}

/// The full set of named values an objective is called with: the searched
/// vector plus every constant override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterAssignment(BTreeMap<String, ParameterValue>);

impl ParameterAssignment {
    /// Merge a searched vector with the run's constants. Constants never
    /// share a name with a searched dimension once the config is validated.
    pub fn merge(point: &ParameterVector, constants: &[ConstantOverride]) -> Self {
        let mut values: BTreeMap<String, ParameterValue> = point
            .iter()
            .map(|(name, v)| (name.to_string(), ParameterValue::Float(v)))
            .collect();
        for constant in constants {
            values.insert(constant.name.clone(), constant.value.clone());
        }
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    /// Look up a value, failing with [`AdapterError::Unbound`] if absent.
    pub fn require(&self, name: &str) -> Result<&ParameterValue, AdapterError> {
        self.0.get(name).ok_or_else(|| AdapterError::Unbound {
            name: name.to_string(),
        })
    }

    /// Look up a numeric value.
    pub fn require_f64(&self, name: &str) -> Result<f64, AdapterError> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| AdapterError::NotNumeric {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
