use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nReason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Missing required configuration value {namespace}:{key}\nHint: add `config \"{namespace}\" {{ {key} \"...\" }}` to the stack file"
    )]
    MissingConfig { namespace: String, key: String },

    #[error("Invalid credential declaration: {0}")]
    InvalidCredential(String),

    #[error("Failed to encode resource inputs: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] pgstack_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, StackError>;
