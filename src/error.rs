//! The error type shared by configuration, reporting and the command-line runner.
//!
//! Only recoverable conditions are represented here. Broken engine invariants (an illegal
//! health-state transition, stepping a simulation that has already finished) are programming
//! errors and panic instead.
use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpiError` and maps other errors to
/// convert to an `EpiError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// A configuration value is outside of its permitted range.
    InvalidParameter {
        parameter: &'static str,
        constraint: String,
    },
    ReportError(String),
    EpiError(String),
}

impl EpiError {
    pub fn invalid_parameter(parameter: &'static str, constraint: impl Into<String>) -> Self {
        EpiError::InvalidParameter {
            parameter,
            constraint: constraint.into(),
        }
    }
}

impl From<io::Error> for EpiError {
    fn from(error: io::Error) -> Self {
        EpiError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(error: serde_json::Error) -> Self {
        EpiError::JsonError(error)
    }
}

impl From<csv::Error> for EpiError {
    fn from(error: csv::Error) -> Self {
        EpiError::CsvError(error)
    }
}

impl From<String> for EpiError {
    fn from(error: String) -> Self {
        EpiError::EpiError(error)
    }
}

impl From<&str> for EpiError {
    fn from(error: &str) -> Self {
        EpiError::EpiError(error.to_string())
    }
}

impl std::error::Error for EpiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpiError::IoError(error) => Some(error),
            EpiError::JsonError(error) => Some(error),
            EpiError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiError::IoError(error) => write!(f, "I/O error: {error}"),
            EpiError::JsonError(error) => write!(f, "JSON error: {error}"),
            EpiError::CsvError(error) => write!(f, "CSV error: {error}"),
            EpiError::InvalidParameter {
                parameter,
                constraint,
            } => write!(f, "invalid parameter `{parameter}`: {constraint}"),
            EpiError::ReportError(message) => write!(f, "report error: {message}"),
            EpiError::EpiError(message) => write!(f, "error: {message}"),
        }
    }
}
