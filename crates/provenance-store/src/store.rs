//! SQLite-backed provenance store.
//!
//! Every read and write goes straight to the database; nothing is cached in
//! process. A [`SqliteProvenanceStore`] auto-commits each call, while
//! [`SqliteProvenanceStore::in_transaction`] hands out a [`TransactionScope`]
//! whose writes commit or roll back together.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::config::StoreConfig;
use crate::entity::{EntityKey, Provisionable};
use crate::error::{PersistenceError, Result, StoreError};
use crate::provenance::Provenance;
use crate::schema::Schema;

// MARK: - Store Trait

/// Get/set access to provenance records.
///
/// Implemented by the auto-committing [`SqliteProvenanceStore`] and by the
/// transaction-bound [`TransactionScope`], so callers pick transactional or
/// non-transactional behavior by which handle they hold.
pub trait ProvenanceStore {
    /// Provenance of the record at `key`, or [`Provenance::None`] if absent.
    fn get_provenance_by_key(&self, key: &EntityKey) -> Result<Provenance>;

    /// Create or overwrite the record at `key`.
    fn set_provenance_by_key(&self, key: &EntityKey, provenance: &Provenance) -> Result<()>;

    /// All stored provenances of one kind within an org, keyed by uid.
    ///
    /// Resources without a record are absent from the map.
    fn get_provenances(&self, org_id: i64, kind: &str) -> Result<HashMap<String, Provenance>>;

    /// Provenance of a provisionable resource.
    fn get_provenance(&self, entity: &dyn Provisionable) -> Result<Provenance> {
        self.get_provenance_by_key(&EntityKey::of(entity))
    }

    /// Record the provenance of a provisionable resource.
    fn set_provenance(&self, entity: &dyn Provisionable, provenance: Provenance) -> Result<()> {
        self.set_provenance_by_key(&EntityKey::of(entity), &provenance)
    }
}

// MARK: - Queries

fn select_provenance(conn: &Connection, key: &EntityKey) -> Result<Provenance> {
    key.validate()?;

    let stored: Option<String> = conn
        .query_row(
            "SELECT provenance FROM provenance_type
             WHERE org_id = ?1 AND record_key = ?2 AND record_type = ?3",
            params![key.org_id, key.uid, key.kind],
            |row| row.get(0),
        )
        .optional()?;

    let provenance = match stored {
        Some(tag) => Provenance::from_tag(&tag),
        None => Provenance::None,
    };
    tracing::debug!("get provenance {} -> {}", key, provenance);
    Ok(provenance)
}

fn upsert_provenance(conn: &Connection, key: &EntityKey, provenance: &Provenance) -> Result<()> {
    key.validate()?;
    if !provenance.is_canonical() {
        return Err(StoreError::InvalidProvenance(format!(
            "tag '{}' is reserved for a built-in provenance, use Provenance::other",
            provenance.as_str()
        )));
    }

    conn.execute(
        "INSERT INTO provenance_type (org_id, record_key, record_type, provenance)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (record_type, record_key, org_id)
         DO UPDATE SET provenance = excluded.provenance",
        params![key.org_id, key.uid, key.kind, provenance.as_str()],
    )?;
    tracing::debug!("set provenance {} = {}", key, provenance);
    Ok(())
}

fn select_provenances(
    conn: &Connection,
    org_id: i64,
    kind: &str,
) -> Result<HashMap<String, Provenance>> {
    let mut stmt = conn.prepare(
        "SELECT record_key, provenance FROM provenance_type
         WHERE org_id = ?1 AND record_type = ?2",
    )?;
    let rows = stmt
        .query_map(params![org_id, kind], |row| {
            let uid: String = row.get(0)?;
            let tag: String = row.get(1)?;
            Ok((uid, Provenance::from_tag(&tag)))
        })?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    tracing::debug!("list provenances {}/{}: {} records", org_id, kind, rows.len());
    Ok(rows)
}

// MARK: - SQLite Store

/// Provenance store over a single SQLite connection.
///
/// Safe to share between threads (e.g. behind an `Arc`); calls serialize on
/// the connection. A caller panicking inside [`Self::in_transaction`] does not
/// take the store down for everyone else: its transaction is rolled back and
/// the connection is reused.
pub struct SqliteProvenanceStore {
    conn: Mutex<Connection>,
}

impl SqliteProvenanceStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(&StoreConfig::at_path(path.as_ref()))
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_config(&StoreConfig::default())
    }

    /// Open the database described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let db = &config.database;

        let conn = match &db.path {
            Some(path) => {
                let conn = Connection::open(path).map_err(PersistenceError::from)?;
                if db.wal {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                tracing::info!("Opened provenance store at {:?}", path);
                conn
            }
            None => {
                let conn = Connection::open_in_memory().map_err(PersistenceError::from)?;
                tracing::info!("Opened in-memory provenance store");
                conn
            }
        };

        if db.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        Schema::initialize(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering it if a previous holder panicked.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => {
                let conn = poisoned.into_inner();
                if !conn.is_autocommit() {
                    if let Err(e) = conn.execute_batch("ROLLBACK") {
                        tracing::error!("Failed to roll back abandoned transaction: {}", e);
                    }
                }
                self.conn.clear_poison();
                tracing::warn!("Recovered provenance store connection after a panic");
                conn
            }
        }
    }

    /// Run `f` inside one database transaction.
    ///
    /// Commits when `f` returns `Ok`. When `f` returns `Err` (or panics) every
    /// write made through the scope is rolled back and the error is returned
    /// unchanged. Use only the given scope inside `f`; calling back into this
    /// store from `f` would block on the held connection.
    pub fn in_transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&TransactionScope<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let scope = TransactionScope { tx };

        match f(&scope) {
            Ok(value) => {
                scope.tx.commit().map_err(StoreError::from)?;
                tracing::debug!("Committed provenance transaction");
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = scope.tx.rollback() {
                    tracing::error!("Failed to roll back provenance transaction: {}", e);
                } else {
                    tracing::warn!("Rolled back provenance transaction");
                }
                Err(err)
            }
        }
    }
}

impl ProvenanceStore for SqliteProvenanceStore {
    fn get_provenance_by_key(&self, key: &EntityKey) -> Result<Provenance> {
        let conn = self.lock();
        select_provenance(&conn, key)
    }

    fn set_provenance_by_key(&self, key: &EntityKey, provenance: &Provenance) -> Result<()> {
        let conn = self.lock();
        upsert_provenance(&conn, key, provenance)
    }

    fn get_provenances(&self, org_id: i64, kind: &str) -> Result<HashMap<String, Provenance>> {
        let conn = self.lock();
        select_provenances(&conn, org_id, kind)
    }
}

// MARK: - Transaction Scope

/// Store handle bound to an open transaction.
///
/// Only obtainable through [`SqliteProvenanceStore::in_transaction`].
pub struct TransactionScope<'conn> {
    tx: Transaction<'conn>,
}

impl TransactionScope<'_> {
    /// The underlying connection, for collaborators that persist their own
    /// rows in the same transaction.
    pub fn connection(&self) -> &Connection {
        &self.tx
    }
}

impl ProvenanceStore for TransactionScope<'_> {
    fn get_provenance_by_key(&self, key: &EntityKey) -> Result<Provenance> {
        select_provenance(&self.tx, key)
    }

    fn set_provenance_by_key(&self, key: &EntityKey, provenance: &Provenance) -> Result<()> {
        upsert_provenance(&self.tx, key, provenance)
    }

    fn get_provenances(&self, org_id: i64, kind: &str) -> Result<HashMap<String, Provenance>> {
        select_provenances(&self.tx, org_id, kind)
    }
}

// MARK: - Tests
