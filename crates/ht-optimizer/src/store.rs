//! Append-only log of objective evaluations.

use serde::Serialize;

use ht_types::{Observation, ParameterVector, StoreError};

/// Every evaluation of a run, in the order it happened.
///
/// There is no way to remove or edit an entry; the surrogate is always refit
/// from the full log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ObservationStore {
    observations: Vec<Observation>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation and return a reference to it.
    pub fn record(&mut self, point: ParameterVector, value: f64) -> &Observation {
        self.observations.push(Observation::new(point, value));
        &self.observations[self.observations.len() - 1]
    }

    /// All observations in insertion order.
    pub fn all(&self) -> &[Observation] {
        &self.observations
    }

    /// Highest-valued observation; the earliest one wins a tie.
    pub fn best(&self) -> Result<&Observation, StoreError> {
        let mut iter = self.observations.iter();
        let first = iter.next().ok_or(StoreError::Empty)?;
        Ok(iter.fold(first, |best, obs| if obs.value > best.value { obs } else { best }))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64) -> ParameterVector {
        ParameterVector::from_pairs([("x", x)])
    }

    #[test]
    fn best_on_empty_store_fails() {
        let store = ObservationStore::new();
        assert_eq!(store.best(), Err(StoreError::Empty));
    }

    #[test]
    fn record_preserves_insertion_order() {
        let mut store = ObservationStore::new();
        store.record(point(3.0), 0.1);
        store.record(point(1.0), 0.9);
        store.record(point(2.0), 0.5);

        let xs: Vec<f64> = store
            .all()
            .iter()
            .map(|o| o.point.get("x").unwrap())
            .collect();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn best_picks_maximum() {
        let mut store = ObservationStore::new();
        store.record(point(0.0), -1.0);
        store.record(point(1.0), 2.5);
        store.record(point(2.0), 0.3);

        let best = store.best().unwrap();
        assert_eq!(best.value, 2.5);
        assert_eq!(best.point.get("x"), Some(1.0));
    }

    #[test]
    fn best_tie_goes_to_earliest() {
        let mut store = ObservationStore::new();
        store.record(point(0.0), 0.2);
        store.record(point(1.0), 0.7);
        store.record(point(2.0), 0.7);
        store.record(point(3.0), 0.7);

        assert_eq!(store.best().unwrap().point.get("x"), Some(1.0));
    }
}
