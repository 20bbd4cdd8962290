//! Database schema migrations for idlevault.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(tx: &Connection, version: i32) -> SqliteResult<()> {
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: players.
///
/// The record itself is a JSON document; `balance` and `display_name` are
/// copied out so the leaderboard can sort without decoding every row.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS players (
            user_id      TEXT PRIMARY KEY,
            display_name TEXT NOT NULL DEFAULT '',
            balance      REAL NOT NULL DEFAULT 0,
            record       TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_players_balance ON players(balance DESC);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: global pending-withdrawals collection.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS withdrawals (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            amount          REAL NOT NULL,
            destination     TEXT NOT NULL,
            network         TEXT NOT NULL,
            status          TEXT NOT NULL,
            requested_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_withdrawals_status ON withdrawals(status, requested_at_ms);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
