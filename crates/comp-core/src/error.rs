//! Error types

use thiserror::Error;

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or solving a decoding problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Matrix/vector dimensions do not line up
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// NaN or infinite entry in an input array
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Matrix could not be inverted
    #[error("Singular matrix in {0}")]
    SingularMatrix(&'static str),

    /// Filter name not recognised
    #[error("Filter {0} is not supported")]
    UnsupportedFilter(String),

    /// Modulation name not recognised
    #[error("Modulation {0} is not supported")]
    UnsupportedModulation(String),

    /// Sample value outside the model's variable domain
    #[error("Invalid sample value {value} for variable {variable}")]
    InvalidSample { variable: usize, value: i8 },

    /// Too many variables for exhaustive enumeration
    #[error("Problem has {variables} variables, exhaustive search supports at most {max}")]
    ProblemTooLarge { variables: usize, max: usize },

    /// Out-of-range parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a dimension error
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Error::ShapeMismatch { .. })
    }

    pub(crate) fn shape(context: &'static str, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }
}
