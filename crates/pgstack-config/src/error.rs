use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "Stack file not found. Looked in:\n\
        - current directory: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl\n\
        - ./.pgstack/ directory\n\
        - ~/.config/pgstack/stack.kdl\n\
        Set PGSTACK_CONFIG_PATH to point at a file directly"
    )]
    StackFileNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
