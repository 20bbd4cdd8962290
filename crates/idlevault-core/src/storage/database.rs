//! SQLite-backed player store.
//!
//! Provides persistent storage for:
//! - Player records (JSON documents keyed by user id)
//! - The global pending-withdrawals collection

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::{data_dir, merge_fields, migrations, Fields, PlayerStore, WithdrawalSink};
use crate::error::{CoreError, StorageError};
use crate::player::{PlayerRecord, WithdrawalRequest, WithdrawalStatus};

/// How long a writer waits for another process to release the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub balance: f64,
}

/// SQLite database for player storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/idlevault.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("idlevault.db");
        Ok(Self::open_at(path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Start a write transaction that takes the database lock up front, so
    /// two read-modify-write cycles can never interleave.
    fn begin_write(&self) -> Result<Transaction<'_>, StorageError> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

fn read_record(conn: &Connection, user_id: &str) -> Result<Option<PlayerRecord>, StorageError> {
    let mut stmt = conn.prepare_cached("SELECT record FROM players WHERE user_id = ?1")?;
    let json = match stmt.query_row(params![user_id], |row| row.get::<_, String>(0)) {
        Ok(v) => v,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            user_id: user_id.to_string(),
            source,
        })
}

fn write_record(conn: &Connection, user_id: &str, record: &PlayerRecord) -> Result<(), StorageError> {
    let json = serde_json::to_string(record).map_err(|source| StorageError::Corrupt {
        user_id: user_id.to_string(),
        source,
    })?;
    conn.execute(
        "INSERT INTO players (user_id, display_name, balance, record, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
            display_name = excluded.display_name,
            balance      = excluded.balance,
            record       = excluded.record,
            updated_at   = excluded.updated_at",
        params![
            user_id,
            record.display_name,
            record.balance,
            json,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_withdrawal(
    conn: &Connection,
    user_id: &str,
    request: &WithdrawalRequest,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO withdrawals (id, user_id, amount, destination, network, status, requested_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            request.id,
            user_id,
            request.amount,
            request.destination,
            request.network,
            request.status.as_str(),
            request.requested_at_ms as i64,
        ],
    )?;
    Ok(())
}

impl PlayerStore for Database {
    fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, StorageError> {
        read_record(&self.conn, user_id)
    }

    fn set(&self, user_id: &str, record: &PlayerRecord) -> Result<(), StorageError> {
        write_record(&self.conn, user_id, record)
    }

    fn update(&self, user_id: &str, fields: &Fields) -> Result<(), StorageError> {
        let tx = self.begin_write()?;
        let current =
            read_record(&tx, user_id)?.ok_or_else(|| StorageError::NotFound(user_id.to_string()))?;
        let next = merge_fields(user_id, &current, fields)?;
        write_record(&tx, user_id, &next)?;
        tx.commit()?;
        Ok(())
    }

    fn transaction(
        &self,
        user_id: &str,
        f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
    ) -> Result<Option<PlayerRecord>, StorageError> {
        let tx = self.begin_write()?;
        let current = read_record(&tx, user_id)?;
        match f(current) {
            Some(next) => {
                write_record(&tx, user_id, &next)?;
                tx.commit()?;
                Ok(Some(next))
            }
            None => {
                tx.rollback()?;
                Ok(None)
            }
        }
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, display_name, balance
             FROM players
             ORDER BY balance DESC, user_id ASC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for (i, row) in rows.enumerate() {
            let (user_id, display_name, balance) = row?;
            entries.push(LeaderboardEntry {
                rank: i + 1,
                user_id,
                display_name,
                balance,
            });
        }
        Ok(entries)
    }
}

impl WithdrawalSink for Database {
    fn queue_withdrawal(
        &self,
        user_id: &str,
        request: &WithdrawalRequest,
        f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
    ) -> Result<Option<PlayerRecord>, StorageError> {
        // Dropping `tx` on an early return rolls both writes back.
        let tx = self.begin_write()?;
        let current = read_record(&tx, user_id)?;
        match f(current) {
            Some(next) => {
                write_record(&tx, user_id, &next)?;
                insert_withdrawal(&tx, user_id, request)?;
                tx.commit()?;
                Ok(Some(next))
            }
            None => {
                tx.rollback()?;
                Ok(None)
            }
        }
    }

    fn pending_withdrawals(&self) -> Result<Vec<(String, WithdrawalRequest)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, amount, destination, network, status, requested_at_ms
             FROM withdrawals
             WHERE status = 'pending'
             ORDER BY requested_at_ms ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut pending = Vec::new();
        for row in rows {
            let (id, user_id, amount, destination, network, status, requested_at_ms) = row?;
            let status = WithdrawalStatus::parse(&status).ok_or_else(|| {
                StorageError::QueryFailed(format!("unknown withdrawal status '{status}' for {id}"))
            })?;
            pending.push((
                user_id,
                WithdrawalRequest {
                    id,
                    amount,
                    destination,
                    network,
                    status,
                    requested_at_ms: requested_at_ms.max(0) as u64,
                },
            ));
        }
        Ok(pending)
    }
}
