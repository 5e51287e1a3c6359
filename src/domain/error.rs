//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected combinations of <number>d, <number>h, <number>m, <number>s or <number>ms (e.g., 500ms, 30s, 2m30s, 7d)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when a session id is malformed
#[derive(Debug, Clone, Error)]
#[error("Invalid session id: \"{input}\"")]
pub struct InvalidSessionId {
    pub input: String,
}

/// Error when an unknown capture source is requested
#[derive(Debug, Clone, Error)]
#[error("Invalid capture source: \"{input}\". Valid sources are: microphone, tab-audio")]
pub struct InvalidSourceError {
    pub input: String,
}

/// Error when an unknown or malformed MIME type is encountered
#[derive(Debug, Clone, Error)]
#[error("Unsupported audio MIME type: \"{input}\"")]
pub struct InvalidMimeType {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
