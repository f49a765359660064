use thiserror::Error;

/// Failures produced while building or parsing value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Invalid numeric: {0}")]
    InvalidNumeric(String),
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}
