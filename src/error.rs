//! Error types for the açaí order bot.

/// Top-level error type for a bot turn.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Storage backend errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Conversation/user state errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Activity is missing {field}, cannot derive a {scope} state key")]
    MissingIdentity { scope: String, field: String },

    #[error("Property {property} could not be (de)serialized: {reason}")]
    Serialization { property: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Waterfall dialog errors.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Step {step} expected a value for {field}, none was collected")]
    MissingValue { step: String, field: String },

    #[error("Step {step} received an unexpected input: {input}")]
    UnexpectedInput { step: String, input: String },

    #[error("Step {step} advanced past the end of the waterfall")]
    StepExhausted { step: String },
}

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, Error>;
