//! Error types for Hamsafar.

use crate::session::DialogState;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid template {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ad storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Messaging gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway failed to start: {reason}")]
    StartupFailed { reason: String },

    #[error("Failed to send message to chat {chat_id}: {reason}")]
    SendFailed { chat_id: i64, reason: String },

    #[error("Failed to edit message {message_id} in chat {chat_id}: {reason}")]
    EditFailed {
        chat_id: i64,
        message_id: i64,
        reason: String,
    },
}

/// Channel publish errors.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Publish to {target} failed: {reason}")]
    SendFailed { target: String, reason: String },
}

/// Template loading/rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder {{{name}}} in template")]
    UnknownPlaceholder { name: String },

    #[error("Unterminated placeholder in template")]
    Unterminated,
}

/// Programmer-error class: the state machine reached a point its own
/// ordering should have made impossible.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Session in state {state} is missing required field '{field}'")]
    MissingField {
        state: DialogState,
        field: &'static str,
    },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
