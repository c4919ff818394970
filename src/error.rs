//! Error handling for Aqua
//!
//! Runtime failures coming back from the equalizer host are carried as an
//! [`ErrorDescription`], a stable identity the UI can show and act on.
//! Caller contract violations (out-of-range arguments, unknown bands) are
//! separate variants and are raised before anything is sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::FilterId;

/// Result type alias for Aqua operations
pub type Result<T> = std::result::Result<T, AquaError>;

/// Failure classes reported by the equalizer host or the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The equalizer host is not installed
    NotInstalled,
    /// Installed but not running
    NotRunning,
    /// Running but not accepting commands yet
    NotReady,
    /// No reply within the deadline
    Timeout,
    /// A reply arrived but made no sense
    Unknown,
}

impl ErrorCode {
    /// Get the fixed description for this code
    pub fn description(self) -> ErrorDescription {
        let (short_error, action) = match self {
            ErrorCode::NotInstalled => (
                "Peace not installed.",
                "Please install and launch PeaceGUI before retrying.",
            ),
            ErrorCode::NotRunning => (
                "Peace not running.",
                "Please launch PeaceGUI before retrying.",
            ),
            ErrorCode::NotReady => (
                "Peace not ready yet.",
                "Please launch PeaceGUI before retrying.",
            ),
            ErrorCode::Timeout => (
                "Timeout waiting for a response.",
                "Please restart the application. If the error persists, try reaching out to the developers to resolve the issue.",
            ),
            ErrorCode::Unknown => (
                "Unexpected response from Peace.",
                "Please retry. If the error persists, restart PeaceGUI and the application.",
            ),
        };

        ErrorDescription {
            code: self,
            short_error,
            action,
        }
    }
}

/// User-facing and programmatic identity of a runtime failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescription {
    pub code: ErrorCode,
    pub short_error: &'static str,
    pub action: &'static str,
}

impl From<ErrorCode> for ErrorDescription {
    fn from(code: ErrorCode) -> Self {
        code.description()
    }
}

/// Main error type for Aqua operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AquaError {
    // Runtime failures (equalizer host / transport)
    #[error("{}", .0.short_error)]
    Equalizer(ErrorDescription),

    // Caller contract violations, raised before any message is sent
    #[error("Invalid {param}: {value} (expected {expected})")]
    InvalidArgument {
        param: &'static str,
        value: f64,
        expected: String,
    },

    #[error("No band with id {id}")]
    UnknownFilter { id: FilterId },

    #[error("Band id {id} appears more than once")]
    DuplicateFilter { id: FilterId },

    #[error("Band count {count} would leave the range {min}-{max}")]
    BandLimit { count: usize, min: usize, max: usize },
}

impl From<ErrorCode> for AquaError {
    fn from(code: ErrorCode) -> Self {
        AquaError::Equalizer(code.description())
    }
}

impl AquaError {
    /// Shorthand for an out-of-range argument
    pub(crate) fn out_of_range(param: &'static str, value: f64, min: f64, max: f64) -> Self {
        AquaError::InvalidArgument {
            param,
            value,
            expected: format!("{} to {}", min, max),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AquaError::Equalizer(desc) => match desc.code {
                ErrorCode::NotInstalled => "NOT_INSTALLED",
                ErrorCode::NotRunning => "NOT_RUNNING",
                ErrorCode::NotReady => "NOT_READY",
                ErrorCode::Timeout => "TIMEOUT",
                ErrorCode::Unknown => "UNKNOWN",
            },
            AquaError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            AquaError::UnknownFilter { .. } => "UNKNOWN_FILTER",
            AquaError::DuplicateFilter { .. } => "DUPLICATE_FILTER",
            AquaError::BandLimit { .. } => "BAND_LIMIT",
        }
    }

    /// The runtime description, if this came from the equalizer host
    pub fn description(&self) -> Option<&ErrorDescription> {
        match self {
            AquaError::Equalizer(desc) => Some(desc),
            _ => None,
        }
    }

    /// Check if a health check may clear this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AquaError::Equalizer(ErrorDescription {
                code: ErrorCode::NotReady | ErrorCode::Timeout | ErrorCode::Unknown,
                ..
            })
        )
    }

    /// Get a user-facing recovery suggestion
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            AquaError::Equalizer(desc) => Some(desc.action),
            AquaError::BandLimit { .. } => Some("Remove or add a band elsewhere first."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AquaError::from(ErrorCode::Timeout);
        assert_eq!(err.error_code(), "TIMEOUT");
        assert_eq!(err.to_string(), "Timeout waiting for a response.");

        let err = AquaError::out_of_range("gain", 45.0, -30.0, 30.0);
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert!(err.description().is_none());
    }

    #[test]
    fn test_description_keeps_code() {
        for code in [
            ErrorCode::NotInstalled,
            ErrorCode::NotRunning,
            ErrorCode::NotReady,
            ErrorCode::Timeout,
            ErrorCode::Unknown,
        ] {
            let desc = code.description();
            assert_eq!(desc.code, code);
            assert!(!desc.short_error.is_empty());
            assert!(!desc.action.is_empty());
        }
    }

    #[test]
    fn test_recovery() {
        assert!(AquaError::from(ErrorCode::NotReady).is_recoverable());
        assert!(!AquaError::from(ErrorCode::NotInstalled).is_recoverable());
        assert_eq!(
            AquaError::from(ErrorCode::NotRunning).recovery_suggestion(),
            Some("Please launch PeaceGUI before retrying.")
        );
    }

    #[test]
    fn test_error_code_wire_names() {
        let json = serde_json::to_string(&ErrorCode::NotReady).unwrap();
        assert_eq!(json, "\"NOT_READY\"");
        let code: ErrorCode = serde_json::from_str("\"TIMEOUT\"").unwrap();
        assert_eq!(code, ErrorCode::Timeout);
    }
}
