//! Objectives selectable from the command line.

use std::env;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use ht_optimizer::Objective;
use ht_types::{AdapterError, ConfigurationError, HtResult, ParameterAssignment};

pub const GAUSSIAN_PEAK: &str = "gaussian_peak";
pub const BRANIN: &str = "branin";
pub const COMMAND: &str = "command";

/// `exp(-(x - 2)^2)`, maximized at `x = 2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GaussianPeak;

impl Objective for GaussianPeak {
    fn evaluate(&mut self, assignment: &ParameterAssignment) -> Result<f64, AdapterError> {
        let x = assignment.require_f64("x")?;
        Ok((-(x - 2.0).powi(2)).exp())
    }

    fn name(&self) -> &str {
        GAUSSIAN_PEAK
    }
}

/// Negated Branin function of `x` and `y`. Its three global maxima are
/// `-0.397887`, one of them at `(pi, 2.275)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Branin;

impl Objective for Branin {
    fn evaluate(&mut self, assignment: &ParameterAssignment) -> Result<f64, AdapterError> {
        let x = assignment.require_f64("x")?;
        let y = assignment.require_f64("y")?;

        let b = 5.1 / (4.0 * PI * PI);
        let c = 5.0 / PI;
        let t = 1.0 / (8.0 * PI);
        let value = (y - b * x * x + c * x - 6.0).powi(2) + 10.0 * (1.0 - t) * x.cos() + 10.0;
        Ok(-value)
    }

    fn name(&self) -> &str {
        BRANIN
    }
}

/// An external program evaluated once per point.
///
/// Every assigned name is passed as `--name=value` after the fixed
/// arguments. The last non-empty line the program writes to stdout is the
/// objective value.
#[derive(Debug, Clone)]
pub struct CommandObjective {
    program: PathBuf,
    args: Vec<String>,
    label: String,
}

impl CommandObjective {
    /// Resolve `program` now so a missing executable fails before any
    /// evaluation.
    pub fn new(program: &str, args: Vec<String>) -> Result<Self, AdapterError> {
        let resolved = resolve_program(program)?;
        debug!(program, resolved = %resolved.display(), "resolved objective command");
        Ok(Self {
            program: resolved,
            args,
            label: program.to_string(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Objective for CommandObjective {
    fn evaluate(&mut self, assignment: &ParameterAssignment) -> Result<f64, AdapterError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(assignment.iter().map(|(name, value)| format!("--{name}={value}")))
            .output()
            .map_err(|e| AdapterError::Failed {
                message: format!("could not run {}: {e}", self.label),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = last_line(&stderr).unwrap_or("no stderr output");
            return Err(AdapterError::Failed {
                message: format!("{} exited with {}: {detail}", self.label, output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = last_line(&stdout).ok_or_else(|| AdapterError::InvalidOutput {
            output: String::new(),
        })?;
        let value: f64 = line.parse().map_err(|_| AdapterError::InvalidOutput {
            output: line.to_string(),
        })?;
        if !value.is_finite() {
            return Err(AdapterError::NonFiniteValue { value });
        }
        Ok(value)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Find `program` either as a path or on `PATH`.
pub fn resolve_program(program: &str) -> Result<PathBuf, AdapterError> {
    let not_found = || AdapterError::NotFound {
        id: program.to_string(),
    };

    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return if candidate.is_file() {
            Ok(candidate.to_path_buf())
        } else {
            Err(not_found())
        };
    }

    let path = env::var_os("PATH").ok_or_else(not_found)?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
        .ok_or_else(not_found)
}

/// Build the objective named by `id`. `command` holds the program and its
/// fixed arguments for the `command` objective; given alone it implies it.
pub fn resolve_objective(id: Option<&str>, command: &[String]) -> HtResult<Box<dyn Objective>> {
    let id = match id {
        Some(id) => id,
        None if !command.is_empty() => COMMAND,
        None => {
            return Err(ConfigurationError::MissingInput {
                field: "objective".to_string(),
            }
            .into())
        }
    };

    match id {
        GAUSSIAN_PEAK => Ok(Box::new(GaussianPeak)),
        BRANIN => Ok(Box::new(Branin)),
        COMMAND => {
            let (program, args) = command.split_first().ok_or_else(|| {
                ConfigurationError::MissingInput {
                    field: "command".to_string(),
                }
            })?;
            Ok(Box::new(CommandObjective::new(program, args.to_vec())?))
        }
        other => Err(ConfigurationError::UnknownObjective {
            id: other.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_types::{ConstantOverride, HtError, ParameterVector};

    fn assignment(pairs: &[(&str, f64)]) -> ParameterAssignment {
        ParameterAssignment::merge(&ParameterVector::from_pairs(pairs.iter().copied()), &[])
    }

    #[test]
    fn gaussian_peak_is_one_at_two() {
        let mut peak = GaussianPeak;
        assert_eq!(peak.evaluate(&assignment(&[("x", 2.0)])), Ok(1.0));
        assert!(peak.evaluate(&assignment(&[("x", 0.0)])).unwrap() < 0.02);
        assert_eq!(
            peak.evaluate(&assignment(&[("y", 2.0)])),
            Err(AdapterError::Unbound { name: "x".into() })
        );
    }

    #[test]
    fn branin_maximum() {
        let mut branin = Branin;
        let at_max = branin.evaluate(&assignment(&[("x", PI), ("y", 2.275)])).unwrap();
        assert!((at_max + 0.397887).abs() < 1e-5, "{at_max}");
        let elsewhere = branin.evaluate(&assignment(&[("x", 0.0), ("y", 0.0)])).unwrap();
        assert!(elsewhere < at_max);
    }

    #[test]
    fn resolves_builtin_objectives() {
        let peak = resolve_objective(Some("gaussian_peak"), &[]).unwrap();
        assert_eq!(peak.name(), GAUSSIAN_PEAK);
        let branin = resolve_objective(Some("branin"), &[]).unwrap();
        assert_eq!(branin.name(), BRANIN);
    }

    #[test]
    fn unknown_or_missing_objective_is_a_configuration_error() {
        match resolve_objective(Some("resnet"), &[]) {
            Err(HtError::Config(ConfigurationError::UnknownObjective { id })) => {
                assert_eq!(id, "resnet")
            }
            other => panic!("unexpected {:?}", other.map(|o| o.name().to_string())),
        }
        assert!(matches!(
            resolve_objective(None, &[]),
            Err(HtError::Config(ConfigurationError::MissingInput { .. }))
        ));
        assert!(matches!(
            resolve_objective(Some("command"), &[]),
            Err(HtError::Config(ConfigurationError::MissingInput { .. }))
        ));
    }

    #[test]
    fn missing_program_fails_at_resolution() {
        let command = vec!["./definitely/not/here/train.sh".to_string()];
        assert!(matches!(
            resolve_objective(Some("command"), &command),
            Err(HtError::Adapter(AdapterError::NotFound { .. }))
        ));
        assert!(matches!(
            resolve_program("hypertune-no-such-program-on-path"),
            Err(AdapterError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandObjective {
        CommandObjective::new("sh", vec!["-c".into(), script.into(), "objective".into()]).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn command_receives_assignment_as_flags() {
        let mut objective = shell(
            r#"for arg in "$@"; do
                 case "$arg" in --epochs=10) epochs=ok ;; --x=3) x=ok ;; esac
               done
               echo "training..."
               if [ "$epochs$x" = okok ]; then echo 0.75; else echo -1; fi
               echo"#,
        );
        let assignment = ParameterAssignment::merge(
            &ParameterVector::from_pairs([("x", 3.0)]),
            &[ConstantOverride::new("epochs", 10i64)],
        );
        assert_eq!(objective.evaluate(&assignment), Ok(0.75));
    }

    #[cfg(unix)]
    #[test]
    fn command_failures_are_adapter_errors() {
        let point = assignment(&[("x", 1.0)]);

        let mut failing = shell("echo 'out of memory' >&2; exit 3");
        match failing.evaluate(&point) {
            Err(AdapterError::Failed { message }) => assert!(message.contains("out of memory")),
            other => panic!("unexpected {other:?}"),
        }

        let mut chatty = shell("echo accuracy: high");
        assert_eq!(
            chatty.evaluate(&point),
            Err(AdapterError::InvalidOutput {
                output: "accuracy: high".into()
            })
        );

        let mut infinite = shell("echo inf");
        assert!(matches!(
            infinite.evaluate(&point),
            Err(AdapterError::NonFiniteValue { .. })
        ));
    }
}
