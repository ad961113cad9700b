use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the hypertune system
#[derive(Error, Debug)]
pub enum HtError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("Objective error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Observation store error: {0}")]
    Store(#[from] StoreError),

    #[error("Surrogate error: {0}")]
    Surrogate(#[from] SurrogateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HtError {
    /// Whether the error was raised while checking inputs, before any
    /// objective evaluation took place.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Malformed run inputs. Always detected before the first evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("no parameters to tune were given")]
    NoParameters,

    #[error("parameter names must not be empty")]
    EmptyName,

    #[error("parameter {name} is declared more than once")]
    DuplicateName { name: String },

    #[error("bounds for {name} must be finite numbers")]
    NonFiniteBound { name: String },

    #[error("for {name}, lower limit {lower} is not below upper limit {upper}")]
    InvertedBound { name: String, lower: f64, upper: f64 },

    #[error("constant {name} shadows a tuned parameter of the same name")]
    ConstantShadowsParameter { name: String },

    #[error("invalid acquisition settings: {message}")]
    InvalidAcquisition { message: String },

    #[error("invalid inner optimizer settings: {message}")]
    InvalidInnerOptimizer { message: String },

    #[error("could not parse {field}: {message}")]
    InvalidLiteral { field: String, message: String },

    #[error("missing required input: {field}")]
    MissingInput { field: String },

    #[error("unknown objective: {id}")]
    UnknownObjective { id: String },

    #[error("parameter vector has no value for {name}")]
    MissingValue { name: String },
}

/// Failures raised by an objective adapter. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("required parameter {name} is not bound")]
    Unbound { name: String },

    #[error("parameter {name} is not numeric")]
    NotNumeric { name: String },

    #[error("objective failed: {message}")]
    Failed { message: String },

    #[error("objective not found: {id}")]
    NotFound { id: String },

    #[error("objective output is not a number: {output:?}")]
    InvalidOutput { output: String },

    #[error("objective returned a non-finite value: {value}")]
    NonFiniteValue { value: f64 },
}

/// Failures while writing or reading the result artifact.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error("{} exists and is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("{} is a directory, expected a file path", path.display())]
    PathIsDirectory { path: PathBuf },

    #[error("failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no observations have been recorded yet")]
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurrogateError {
    #[error("cannot fit a surrogate without observations")]
    NoObservations,

    #[error("kernel matrix is not positive definite even with jitter {jitter}")]
    Factorization { jitter: f64 },
}

/// Result type alias for hypertune operations
pub type HtResult<T> = Result<T, HtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigurationError::InvertedBound {
            name: "learning_rate".to_string(),
            lower: 0.5,
            upper: 0.1,
        };

        let message = error.to_string();
        assert!(message.contains("learning_rate"));
        assert!(message.contains("0.5"));
        assert!(message.contains("0.1"));
    }

    #[test]
    fn test_error_conversion() {
        let adapter_error = AdapterError::Unbound {
            name: "x".to_string(),
        };
        let ht_error: HtError = adapter_error.into();

        match ht_error {
            HtError::Adapter(AdapterError::Unbound { name }) => assert_eq!(name, "x"),
            _ => panic!("Expected Adapter error"),
        }
    }

    #[test]
    fn test_configuration_classification() {
        let config: HtError = ConfigurationError::NoParameters.into();
        let store: HtError = StoreError::Empty.into();
        assert!(config.is_configuration());
        assert!(!store.is_configuration());
    }

    #[test]
    fn test_export_error_names_path() {
        let error = ExportError::NotADirectory {
            path: PathBuf::from("/tmp/results.csv"),
        };
        assert!(error.to_string().contains("/tmp/results.csv"));
    }
}
