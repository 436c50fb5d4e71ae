//! File-backed durability and concurrent access

mod common;

use std::sync::Arc;
use std::thread;

use common::setup::init_tracing;
use provenance_store::{
    AlertRule, EntityKey, MuteTiming, PersistenceError, Provenance, ProvenanceStore, Result,
    SqliteProvenanceStore, StoreConfig, StoreError, SCHEMA_VERSION,
};

fn is_database_error<T>(result: &Result<T>) -> bool {
    matches!(
        result,
        Err(StoreError::Persistence(PersistenceError::Database(_)))
    )
}

#[test]
fn test_committed_values_survive_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("provenance.db");
    let rule = AlertRule::new(4, "disk-full");
    let timing = MuteTiming {
        name: "weekends".into(),
        org_id: 4,
    };

    {
        let store = SqliteProvenanceStore::open(&path).unwrap();
        store.set_provenance(&rule, Provenance::File).unwrap();
        store
            .in_transaction(|scope| -> Result<()> { scope.set_provenance(&timing, Provenance::Api) })
            .unwrap();
        let _ = store.in_transaction(|scope| -> Result<()> {
            scope.set_provenance(&rule, Provenance::Api)?;
            Err(StoreError::InvalidEntity("abort".into()))
        });
    }

    let store = SqliteProvenanceStore::open(&path).unwrap();
    assert_eq!(store.get_provenance(&rule).unwrap(), Provenance::File);
    assert_eq!(store.get_provenance(&timing).unwrap(), Provenance::Api);
}

#[test]
fn test_open_from_toml_config() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from-config.db");
    let toml = format!(
        "[database]\npath = {:?}\nwal = false\n",
        path.to_string_lossy()
    );

    let config = StoreConfig::from_toml(&toml).unwrap();
    let store = SqliteProvenanceStore::from_config(&config).unwrap();
    store
        .set_provenance(&AlertRule::new(1, "x"), Provenance::File)
        .unwrap();

    assert!(path.exists());
}

#[test]
fn test_reopen_does_not_repeat_schema_setup() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("provenance.db");

    drop(SqliteProvenanceStore::open(&path).unwrap());
    drop(SqliteProvenanceStore::open(&path).unwrap());

    let conn = rusqlite::Connection::open(&path).unwrap();
    let versions: Vec<u32> = conn
        .prepare("SELECT version FROM schema_version")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(versions, vec![SCHEMA_VERSION]);
}

#[test]
fn test_concurrent_writers_on_distinct_orgs() {
    init_tracing();
    let store = Arc::new(SqliteProvenanceStore::open_in_memory().unwrap());

    let handles: Vec<_> = (0..8)
        .map(|org_id| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let rule = AlertRule::new(org_id, "shared-uid");
                let value = if org_id % 2 == 0 {
                    Provenance::File
                } else {
                    Provenance::Api
                };
                for _ in 0..25 {
                    store.set_provenance(&rule, value.clone()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for org_id in 0..8 {
        let expected = if org_id % 2 == 0 {
            Provenance::File
        } else {
            Provenance::Api
        };
        assert_eq!(
            store
                .get_provenance(&AlertRule::new(org_id, "shared-uid"))
                .unwrap(),
            expected
        );
        assert_eq!(store.get_provenances(org_id, "alertRule").unwrap().len(), 1);
    }
}

#[test]
fn test_concurrent_writers_on_one_key_leave_one_record() {
    init_tracing();
    let store = Arc::new(SqliteProvenanceStore::open_in_memory().unwrap());
    let key = EntityKey::new(1, "alertRule", "contended");

    let handles: Vec<_> = [Provenance::File, Provenance::Api]
        .into_iter()
        .map(|value| {
            let store = Arc::clone(&store);
            let key = key.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    store.set_provenance_by_key(&key, &value).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let all = store.get_provenances(1, "alertRule").unwrap();
    assert_eq!(all.len(), 1);
    let last = store.get_provenance_by_key(&key).unwrap();
    assert!(last == Provenance::File || last == Provenance::Api);
}

// === Storage failures ===

#[test]
fn test_missing_table_surfaces_database_error() {
    init_tracing();
    let store = SqliteProvenanceStore::open_in_memory().unwrap();
    let rule = AlertRule::new(1, "orphan");
    store.set_provenance(&rule, Provenance::File).unwrap();

    store
        .in_transaction(|scope| -> Result<()> {
            scope
                .connection()
                .execute_batch("DROP TABLE provenance_type")?;
            Ok(())
        })
        .unwrap();

    assert!(is_database_error(&store.get_provenance(&rule)));
    assert!(is_database_error(
        &store.set_provenance(&rule, Provenance::Api)
    ));
    assert!(is_database_error(&store.get_provenances(1, "alertRule")));
}

#[test]
fn test_failure_inside_scope_is_returned_and_rolled_back() {
    init_tracing();
    let store = SqliteProvenanceStore::open_in_memory().unwrap();
    let rule = AlertRule::new(1, "kept");
    store.set_provenance(&rule, Provenance::File).unwrap();

    let result = store.in_transaction(|scope| -> Result<()> {
        scope
            .connection()
            .execute_batch("DROP TABLE provenance_type")?;
        assert!(is_database_error(&scope.get_provenance(&rule)));
        assert!(is_database_error(&scope.get_provenances(1, "alertRule")));
        scope.set_provenance(&rule, Provenance::Api)
    });

    assert!(is_database_error(&result));
    assert_eq!(store.get_provenance(&rule).unwrap(), Provenance::File);
}

#[test]
fn test_undecodable_stored_value_is_an_error_not_a_default() {
    init_tracing();
    let store = SqliteProvenanceStore::open_in_memory().unwrap();
    let rule = AlertRule::new(1, "corrupt");

    store
        .in_transaction(|scope| -> Result<()> {
            scope.connection().execute(
                "INSERT INTO provenance_type (org_id, record_key, record_type, provenance)
                 VALUES (1, 'corrupt', 'alertRule', X'00FF')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

    assert!(is_database_error(&store.get_provenance(&rule)));
    assert!(is_database_error(&store.get_provenances(1, "alertRule")));
}
