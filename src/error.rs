use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CongregateError {
    ProbeError(String),
    StateTransitionError(String),
    BroadcastError(String),
    EventError(String),
    ValidationError(String),
    ConfigurationError(String),
}

impl fmt::Display for CongregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CongregateError::ProbeError(msg) => write!(f, "Probe error: {msg}"),
            CongregateError::StateTransitionError(msg) => {
                write!(f, "State transition error: {msg}")
            }
            CongregateError::BroadcastError(msg) => write!(f, "Broadcast error: {msg}"),
            CongregateError::EventError(msg) => write!(f, "Event error: {msg}"),
            CongregateError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            CongregateError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for CongregateError {}

impl From<crate::config::ConfigurationError> for CongregateError {
    fn from(err: crate::config::ConfigurationError) -> Self {
        CongregateError::ConfigurationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CongregateError>;
