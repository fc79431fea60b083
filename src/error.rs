use std::io;

/// Custom error type for repo_bot operations
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("GitHub API {operation} failed with status {status}: {message}")]
    GitHubApi {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Changelog error: {0}")]
    Changelog(String),

    #[error("Invalid ISO-8601 duration '{0}'")]
    InvalidDuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use BotError
pub type Result<T> = std::result::Result<T, BotError>;
