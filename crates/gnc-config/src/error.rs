use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("config at {path} is not valid JSON: {message}")]
    Serde { path: PathBuf, message: String },

    #[error("invalid config value for `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}
