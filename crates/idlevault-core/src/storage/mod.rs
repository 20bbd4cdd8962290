mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{Config, SessionConfig};
pub use database::{Database, LeaderboardEntry};
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};
use crate::player::{PlayerRecord, WithdrawalRequest};

/// Partial update payload: top-level record fields to overwrite.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Per-user record persistence.
///
/// `set` and `update` are plain overwrites, fine for fields only the owning
/// session writes. Anything another actor may write concurrently (a
/// referrer's balance) goes through `transaction`, and so do session actions.
pub trait PlayerStore {
    fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, StorageError>;

    fn set(&self, user_id: &str, record: &PlayerRecord) -> Result<(), StorageError>;

    /// Overwrite the named top-level fields of an existing record.
    fn update(&self, user_id: &str, fields: &Fields) -> Result<(), StorageError>;

    /// Read-modify-write under an exclusive lock.
    ///
    /// `f` sees the current record (if any) and returns the record to store,
    /// or `None` to abort without writing. Returns what was committed.
    fn transaction(
        &self,
        user_id: &str,
        f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
    ) -> Result<Option<PlayerRecord>, StorageError>;

    /// Players ordered by balance, richest first.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StorageError>;
}

/// Global queue of withdrawal requests awaiting manual processing.
pub trait WithdrawalSink {
    /// Commit the debited record and queue `request` as one atomic write.
    ///
    /// `f` behaves as in [`PlayerStore::transaction`]. When it returns `None`
    /// nothing is stored and nothing is queued.
    fn queue_withdrawal(
        &self,
        user_id: &str,
        request: &WithdrawalRequest,
        f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
    ) -> Result<Option<PlayerRecord>, StorageError>;

    fn pending_withdrawals(&self) -> Result<Vec<(String, WithdrawalRequest)>, StorageError>;
}

/// Apply a partial update to a record by way of its JSON form.
pub(crate) fn merge_fields(
    user_id: &str,
    record: &PlayerRecord,
    fields: &Fields,
) -> Result<PlayerRecord, StorageError> {
    let mut json = serde_json::to_value(record).map_err(|source| StorageError::Corrupt {
        user_id: user_id.to_string(),
        source,
    })?;
    let obj = json
        .as_object_mut()
        .ok_or_else(|| StorageError::InvalidUpdate {
            user_id: user_id.to_string(),
            message: "stored record is not an object".into(),
        })?;
    for (key, value) in fields {
        if key == "user_id" {
            return Err(StorageError::InvalidUpdate {
                user_id: user_id.to_string(),
                message: "user_id cannot be changed".into(),
            });
        }
        obj.insert(key.clone(), value.clone());
    }
    serde_json::from_value(json).map_err(|e| StorageError::InvalidUpdate {
        user_id: user_id.to_string(),
        message: e.to_string(),
    })
}

/// Returns `~/.config/idlevault[-dev]/` based on IDLEVAULT_ENV.
///
/// Set IDLEVAULT_ENV=dev to use the development data directory, or
/// IDLEVAULT_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("IDLEVAULT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("IDLEVAULT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("idlevault-dev")
            } else {
                base_dir.join("idlevault")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
