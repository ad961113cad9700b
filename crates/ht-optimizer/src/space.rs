//! Search space definition: validation, sampling, and projection.

use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

use ht_types::{ConfigurationError, ParameterBound, ParameterVector};

/// A validated box of named continuous dimensions.
///
/// Only constructible through [`ParameterSpace::validate`], so every
/// instance has unique, non-empty names and finite `lower < upper` bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpace {
    bounds: Vec<ParameterBound>,
}

impl ParameterSpace {
    /// Check a bound list and wrap it. Declaration order is preserved and
    /// determines sampling order and export column order.
    pub fn validate(bounds: Vec<ParameterBound>) -> Result<Self, ConfigurationError> {
        if bounds.is_empty() {
            return Err(ConfigurationError::NoParameters);
        }

        let mut seen = HashSet::with_capacity(bounds.len());
        for bound in &bounds {
            if bound.name.trim().is_empty() {
                return Err(ConfigurationError::EmptyName);
            }
            if !seen.insert(bound.name.as_str()) {
                return Err(ConfigurationError::DuplicateName {
                    name: bound.name.clone(),
                });
            }
            if !bound.lower.is_finite() || !bound.upper.is_finite() {
                return Err(ConfigurationError::NonFiniteBound {
                    name: bound.name.clone(),
                });
            }
            if bound.lower >= bound.upper {
                return Err(ConfigurationError::InvertedBound {
                    name: bound.name.clone(),
                    lower: bound.lower,
                    upper: bound.upper,
                });
            }
        }

        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> &[ParameterBound] {
        &self.bounds
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.bounds.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bounds.iter().map(|b| b.name.as_str())
    }

    pub fn bound(&self, name: &str) -> Option<&ParameterBound> {
        self.bounds.iter().find(|b| b.name == name)
    }

    /// Draw one point uniformly from the box.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterVector {
        let mut point = ParameterVector::new();
        for bound in &self.bounds {
            point.insert(bound.name.clone(), rng.gen_range(bound.lower..=bound.upper));
        }
        point
    }

    /// Project a vector back into the box. NaN coordinates map to the lower
    /// bound; names outside the space are dropped.
    pub fn clip(&self, vector: &ParameterVector) -> Result<ParameterVector, ConfigurationError> {
        let mut clipped = ParameterVector::new();
        for bound in &self.bounds {
            let value = vector
                .get(&bound.name)
                .ok_or_else(|| ConfigurationError::MissingValue {
                    name: bound.name.clone(),
                })?;
            let value = if value.is_nan() {
                bound.lower
            } else {
                value.clamp(bound.lower, bound.upper)
            };
            clipped.insert(bound.name.clone(), value);
        }
        Ok(clipped)
    }

    /// Whether every dimension is present and inside its bounds.
    pub fn contains(&self, vector: &ParameterVector) -> bool {
        self.bounds
            .iter()
            .all(|b| vector.get(&b.name).is_some_and(|v| b.contains(v)))
    }

    /// Map a vector into the unit cube, in declaration order.
    pub fn to_unit(&self, vector: &ParameterVector) -> Result<Vec<f64>, ConfigurationError> {
        self.bounds
            .iter()
            .map(|b| {
                vector
                    .get(&b.name)
                    .map(|v| (v - b.lower) / b.span())
                    .ok_or_else(|| ConfigurationError::MissingValue {
                        name: b.name.clone(),
                    })
            })
            .collect()
    }

    /// Map a unit-cube coordinate back into the box. Coordinates are clamped
    /// so rounding can never leave the declared bounds.
    pub fn from_unit(&self, unit: &[f64]) -> ParameterVector {
        let mut point = ParameterVector::new();
        for (bound, u) in self.bounds.iter().zip(unit) {
            let u = if u.is_nan() { 0.0 } else { u.clamp(0.0, 1.0) };
            let value = (bound.lower + u * bound.span()).clamp(bound.lower, bound.upper);
            point.insert(bound.name.clone(), value);
        }
        point
    }
}
