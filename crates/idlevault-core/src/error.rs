//! Core error types for idlevault-core.
//!
//! Every fallible operation in the library reports one of these. Game rule
//! rejections (`GameError`) never mutate state; storage and identity
//! failures at session start are fatal for the session.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for idlevault-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A game rule rejected the action
    #[error("{0}")]
    Game(#[from] GameError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The host environment supplied no user id
    #[error("Could not identify user: no user id supplied")]
    MissingIdentity,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// No record stored under this user id
    #[error("No player record for user '{0}'")]
    NotFound(String),

    /// Stored record could not be decoded
    #[error("Corrupt player record for user '{user_id}': {source}")]
    Corrupt {
        user_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Partial update payload was not a JSON object
    #[error("Invalid partial update for user '{user_id}': {message}")]
    InvalidUpdate { user_id: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Game rule rejections. None of these mutate the player record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),

    #[error("Unknown boost: {0}")]
    UnknownBoost(String),

    #[error("Vault holds {accumulated:.2}, below the minimum claim of {minimum}")]
    NothingToClaim { accumulated: f64, minimum: f64 },

    #[error("Daily reward not ready; claimable in {ready_in_secs} seconds")]
    DailyRewardNotReady { ready_in_secs: u64 },

    #[error("Boost '{id}' is already active for another {remaining_secs} seconds")]
    BoostAlreadyActive { id: String, remaining_secs: u64 },

    #[error("Out of energy")]
    EnergyDepleted,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid withdrawal: {0}")]
    InvalidWithdrawal(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
