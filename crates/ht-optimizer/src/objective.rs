//! The calling convention for expensive objectives.

use ht_types::{AdapterError, ParameterAssignment};

/// An expensive black-box function to maximize.
///
/// Implementations receive the searched point merged with every constant
/// override and are responsible for binding those names into whatever the
/// wrapped objective reads. A failed evaluation is reported once and never
/// retried.
pub trait Objective {
    fn evaluate(&mut self, assignment: &ParameterAssignment) -> Result<f64, AdapterError>;

    /// Human-readable objective name, used in logs.
    fn name(&self) -> &str {
        "objective"
    }
}

impl<O: Objective + ?Sized> Objective for Box<O> {
    fn evaluate(&mut self, assignment: &ParameterAssignment) -> Result<f64, AdapterError> {
        (**self).evaluate(assignment)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapter turning a closure into an [`Objective`].
pub struct FnObjective<F> {
    name: String,
    f: F,
}

/// Wrap a closure as an objective.
pub fn objective_fn<F>(name: impl Into<String>, f: F) -> FnObjective<F>
where
    F: FnMut(&ParameterAssignment) -> Result<f64, AdapterError>,
{
    FnObjective {
        name: name.into(),
        f,
    }
}

impl<F> Objective for FnObjective<F>
where
    F: FnMut(&ParameterAssignment) -> Result<f64, AdapterError>,
{
    fn evaluate(&mut self, assignment: &ParameterAssignment) -> Result<f64, AdapterError> {
        (self.f)(assignment)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_types::{ConstantOverride, ParameterVector};

    #[test]
    fn closure_objective_reads_assignment() {
        let mut calls = 0;
        let mut objective = objective_fn("square", |a: &ParameterAssignment| {
            calls += 1;
            Ok(a.require_f64("x")?.powi(2))
        });
        let assignment =
            ParameterAssignment::merge(&ParameterVector::from_pairs([("x", 3.0)]), &[]);

        assert_eq!(objective.evaluate(&assignment), Ok(9.0));
        assert_eq!(objective.name(), "square");
        drop(objective);
        assert_eq!(calls, 1);
    }

    #[test]
    fn boxed_objective_delegates() {
        let mut boxed: Box<dyn Objective> =
            Box::new(objective_fn("needs_y", |a: &ParameterAssignment| {
                a.require_f64("y")
            }));
        let assignment = ParameterAssignment::merge(
            &ParameterVector::from_pairs([("x", 1.0)]),
            &[ConstantOverride::new("z", 2.0)],
        );
        assert_eq!(
            boxed.evaluate(&assignment),
            Err(AdapterError::Unbound { name: "y".into() })
        );
        assert_eq!(boxed.name(), "needs_y");
    }
}
