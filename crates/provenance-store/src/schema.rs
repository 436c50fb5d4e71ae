//! SQLite schema for provenance storage

use rusqlite::Connection;

use crate::error::PersistenceError;

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Current provenance per (org, kind, uid); absent row means no provenance
CREATE TABLE IF NOT EXISTS provenance_type (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id INTEGER NOT NULL,
    record_key TEXT NOT NULL,
    record_type TEXT NOT NULL,
    provenance TEXT NOT NULL,
    UNIQUE (record_type, record_key, org_id)
);

CREATE INDEX IF NOT EXISTS idx_provenance_org_type ON provenance_type(org_id, record_type);
"#
    }

    /// Bring `conn` up to [`SCHEMA_VERSION`].
    ///
    /// Creates the tables on a fresh database and rejects one written by a
    /// newer build. Returns the version found before any changes were made
    /// (0 for a fresh database).
    pub fn initialize(conn: &Connection) -> Result<u32, PersistenceError> {
        let current = Self::current_version(conn)?;

        if current > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current,
            });
        }

        if current == 0 {
            conn.execute_batch(Self::create_tables())?;
            Self::record_version(conn, SCHEMA_VERSION)?;
            tracing::info!("Created provenance schema v{}", SCHEMA_VERSION);
        }

        Ok(current)
    }

    /// Highest recorded schema version, or 0 if the database is empty.
    pub fn current_version(conn: &Connection) -> Result<u32, PersistenceError> {
        let has_table: bool = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get::<_, i64>(0),
        )? > 0;

        if !has_table {
            return Ok(0);
        }

        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })?;
        Ok(version.unwrap_or(0))
    }

    fn record_version(conn: &Connection, version: u32) -> Result<(), PersistenceError> {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }
}
