use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid inflation target: {0}")]
    InvalidTarget(String),

    #[error("Line too large: {size} bytes exceeds maximum of {max_size} bytes")]
    LineTooLong { size: usize, max_size: usize },

    // Reference data errors
    #[error("Invalid DOT code: {0}")]
    InvalidDotCode(String),

    #[error("Unknown tire code: {0}")]
    UnknownTireCode(String),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
