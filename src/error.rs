//! Error types for the interruption arbiter
//!
//! The decision path itself never fails; these errors come from setup
//! (configuration, scenario files) and from the session's channels.

use thiserror::Error;

/// Interject errors
#[derive(Error, Debug, Clone)]
pub enum InterjectError {
    /// Keyword sets or resume settings are invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Session channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),

    /// Scenario file could not be parsed or is malformed
    #[error("Scenario error: {0}")]
    ScenarioError(String),
}

impl From<std::io::Error> for InterjectError {
    fn from(e: std::io::Error) -> Self {
        InterjectError::IOError(e.to_string())
    }
}

impl InterjectError {
    /// Check if this error is recoverable
    ///
    /// Configuration problems are fatal at setup; a failed scenario file
    /// only affects that scenario.
    pub fn is_recoverable(&self) -> bool {
        match self {
            InterjectError::ConfigError(_) => false,
            // The worker is gone once its queue disconnects
            InterjectError::ChannelError(_) => false,
            InterjectError::IOError(_) => false,
            InterjectError::ScenarioError(_) => true,
        }
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            InterjectError::ConfigError(_) => {
                "Configuration error. Please check the keyword settings.".to_string()
            }
            InterjectError::ChannelError(_) => {
                "Internal communication error. Please restart the session.".to_string()
            }
            InterjectError::IOError(_) => "File system error occurred.".to_string(),
            InterjectError::ScenarioError(_) => {
                "Scenario file is invalid. Please check its steps.".to_string()
            }
        }
    }
}

/// Result type alias for interject operations
pub type Result<T> = std::result::Result<T, InterjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err: InterjectError = io.into();
        assert!(matches!(err, InterjectError::IOError(_)));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = InterjectError::ConfigError("'stop' is in both sets".into());
        assert!(err.user_message().contains("keyword settings"));
        assert!(!err.user_message().contains("stop"));
        assert!(InterjectError::ScenarioError("x".into())
            .user_message()
            .contains("Scenario"));
    }

    #[test]
    fn test_recoverability() {
        assert!(!InterjectError::ConfigError("overlap".into()).is_recoverable());
        assert!(InterjectError::ScenarioError("bad step".into()).is_recoverable());
    }
}
